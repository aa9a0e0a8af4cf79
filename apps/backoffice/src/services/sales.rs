//! # Sale Transaction Coordinator
//!
//! Records a sale and moves stock as one unit, and undoes both together.
//!
//! ## Create
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Validating        authorize(create_sale, store) ─► Forbidden           │
//! │      │             lines empty / qty ≤ 0 / price < 0 ─► BadRequest      │
//! │      │             price outside tolerance (if set) ─► BadRequest       │
//! │      ▼                                                                  │
//! │  ReservingStock    BEGIN                                                │
//! │      │             for each line: conditional decrement                 │
//! │      │             short ─► ROLLBACK, InsufficientStock { line, .. }    │
//! │      ▼                                                                  │
//! │  Persisting        INSERT sale (total = Σ qty × submitted price)        │
//! │      │             INSERT sale_items, work log                          │
//! │      ▼                                                                  │
//! │  Committed         COMMIT                                               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stock is decremented before the header is written. The first statement
//! of the transaction is a write, which takes the SQLite write lock and
//! serializes concurrent sales of the same stock; the conditional decrement
//! is the stock check.
//!
//! ## Delete
//! Lock the sale, authorize against its store and cashier, remove items and
//! header, then add each line's quantity back to the sale's store. The
//! restore is quantity-only: shelf prices are left as they are now.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};

use super::{authorize, FeatureGrant, DEFAULT_LIST_LIMIT};
use crate::error::{ServiceError, ServiceResult};
use crate::AppState;
use retail_core::pricing::price_for_store;
use retail_core::validation::validate_sale_lines;
use retail_core::{
    Action, Actor, CoreError, Feature, Money, PermissionOp, ResourceScope, Sale, SaleDetail,
    SaleLine,
};
use retail_db::{DbError, InventoryRepository, SaleRepository, WorkLogRepository};

pub struct SaleService {
    state: Arc<AppState>,
}

impl SaleService {
    pub fn new(state: Arc<AppState>) -> Self {
        SaleService { state }
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Records a sale at `store_id` priced at the submitted unit prices.
    pub async fn create_sale(
        &self,
        actor: &Actor,
        store_id: i64,
        lines: &[SaleLine],
    ) -> ServiceResult<SaleDetail> {
        authorize(actor, Action::CreateSale, &ResourceScope::store(store_id))?;
        validate_sale_lines(lines)?;
        let total = sale_total(lines)?;

        if let Some(tolerance) = self.state.config.sales.price_tolerance_cents {
            self.check_prices(store_id, lines, tolerance).await?;
        }

        debug!(store_id, lines = lines.len(), total = %total, "Creating sale");

        let now = self.state.clock.now();
        let mut tx = self.state.db.begin().await?;

        for (index, line) in lines.iter().enumerate() {
            InventoryRepository::adjust_in(&mut tx, line.product_id, store_id, -line.quantity, now)
                .await
                .map_err(|e| line_stock_error(e, index, line, store_id))?;
        }

        let (sale, items) =
            SaleRepository::insert_in(&mut tx, store_id, actor.user_id, now, total, lines).await?;

        let details = json!({
            "sale_id": sale.id,
            "total_cents": sale.total_cents,
            "items": items
                .iter()
                .map(|i| json!({ "product_id": i.product_id, "quantity": i.quantity }))
                .collect::<Vec<_>>(),
        });
        WorkLogRepository::insert_in(
            &mut tx,
            actor.user_id,
            Some(store_id),
            "create_sale",
            Some(&details),
            now,
        )
        .await?;

        tx.commit().await?;

        info!(
            sale_id = sale.id,
            store_id,
            cashier_id = actor.user_id,
            total = %sale.total(),
            "Sale committed"
        );

        Ok(SaleDetail { sale, items })
    }

    /// Rejects any line whose unit price is further than `tolerance` cents
    /// from the current promotion-adjusted price.
    async fn check_prices(
        &self,
        store_id: i64,
        lines: &[SaleLine],
        tolerance: i64,
    ) -> ServiceResult<()> {
        let today = self.state.clock.today();

        for (index, line) in lines.iter().enumerate() {
            let Some(record) = self.state.db.inventory().get(line.product_id, store_id).await? else {
                return Err(ServiceError::InsufficientStock {
                    line: Some(index),
                    product_id: line.product_id,
                    store_id,
                    available: 0,
                    requested: line.quantity,
                });
            };

            let promotions = self
                .state
                .db
                .promotions()
                .active_for_product(line.product_id, today)
                .await?;
            let expected = price_for_store(record.price(), &promotions, store_id, today).price;

            if (line.unit_price - expected).abs().cents() > tolerance {
                return Err(CoreError::PriceMismatch {
                    product_id: line.product_id,
                    submitted: line.unit_price,
                    expected,
                }
                .into());
            }
        }

        Ok(())
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Deletes a sale and puts its quantities back on the shelf. Needs the
    /// sales Delete grant in the permission matrix.
    pub async fn delete_sale(&self, actor: &Actor, sale_id: i64) -> ServiceResult<()> {
        let grant = FeatureGrant::load(&self.state.db, actor, Feature::SalesManagement).await?;

        let now = self.state.clock.now();
        let mut tx = self.state.db.begin().await?;

        let sale = SaleRepository::lock_in(&mut tx, sale_id).await?;
        authorize(actor, Action::DeleteSale, &sale_scope(&sale))?;
        grant.require(actor, PermissionOp::Delete)?;

        let items = SaleRepository::items_in(&mut tx, sale.id).await?;
        SaleRepository::delete_in(&mut tx, sale.id).await?;

        for item in &items {
            InventoryRepository::adjust_in(&mut tx, item.product_id, sale.store_id, item.quantity, now)
                .await?;
        }

        let details = json!({
            "sale_id": sale.id,
            "cashier_id": sale.cashier_id,
            "total_cents": sale.total_cents,
        });
        WorkLogRepository::insert_in(
            &mut tx,
            actor.user_id,
            Some(sale.store_id),
            "delete_sale",
            Some(&details),
            now,
        )
        .await?;

        tx.commit().await?;

        info!(sale_id, store_id = sale.store_id, items = items.len(), "Sale deleted, stock restored");
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Sales visible to `actor`, newest first.
    pub async fn list_sales(
        &self,
        actor: &Actor,
        store_id: Option<i64>,
        limit: Option<u32>,
    ) -> ServiceResult<Vec<Sale>> {
        let filter = authorize(actor, Action::ViewSales, &ResourceScope::optional_store(store_id))?
            .with_requested_store(store_id);

        let sales = self
            .state
            .db
            .sales()
            .list(filter, limit.unwrap_or(DEFAULT_LIST_LIMIT))
            .await?;
        Ok(sales)
    }

    pub async fn get_sale(&self, actor: &Actor, sale_id: i64) -> ServiceResult<SaleDetail> {
        let sale = self
            .state
            .db
            .sales()
            .get(sale_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Sale", sale_id))?;

        authorize(actor, Action::ViewSales, &sale_scope(&sale))?;

        let items = self.state.db.sales().items(sale.id).await?;
        Ok(SaleDetail { sale, items })
    }
}

fn sale_scope(sale: &Sale) -> ResourceScope {
    ResourceScope::store(sale.store_id).owned_by(sale.cashier_id)
}

/// Σ quantity × unit price, refusing to wrap.
fn sale_total(lines: &[SaleLine]) -> ServiceResult<Money> {
    lines.iter().try_fold(Money::zero(), |total, line| {
        line.unit_price
            .checked_mul_quantity(line.quantity)
            .and_then(|subtotal| total.checked_add(subtotal))
            .ok_or_else(|| ServiceError::bad_request("Sale total is out of range"))
    })
}

/// Attaches the failing line to a ledger rejection. A product the store
/// has never stocked has nothing available.
fn line_stock_error(err: DbError, index: usize, line: &SaleLine, store_id: i64) -> ServiceError {
    match err {
        DbError::InsufficientStock { available, .. } => ServiceError::InsufficientStock {
            line: Some(index),
            product_id: line.product_id,
            store_id,
            available,
            requested: line.quantity,
        },
        DbError::NotFound { .. } => ServiceError::InsufficientStock {
            line: Some(index),
            product_id: line.product_id,
            store_id,
            available: 0,
            requested: line.quantity,
        },
        other => other.into(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
