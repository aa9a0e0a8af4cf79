//! Inventory service: the priced stock view and manual stock changes.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;
use tracing::info;

use super::{authorize, require_feature};
use crate::error::{ServiceError, ServiceResult};
use crate::AppState;
use retail_core::pricing::price_for_store;
use retail_core::validation::validate_non_negative;
use retail_core::{
    Action, Actor, Feature, InventoryRecord, Money, PermissionOp, PricedInventory, Promotion,
    ResourceScope, ScopeFilter,
};
use retail_db::{InventoryListing, InventoryRepository, WorkLogRepository};

pub struct InventoryService {
    state: Arc<AppState>,
}

impl InventoryService {
    pub fn new(state: Arc<AppState>) -> Self {
        InventoryService { state }
    }

    /// Stock rows with the price after today's applicable promotion.
    ///
    /// Admins see every store unless `store_id` narrows it; everyone else
    /// sees their home store.
    pub async fn list_inventory(
        &self,
        actor: &Actor,
        store_id: Option<i64>,
    ) -> ServiceResult<Vec<PricedInventory>> {
        let filter = authorize(
            actor,
            Action::ViewInventory,
            &ResourceScope::optional_store(store_id),
        )?
        .with_requested_store(store_id);

        let store_filter = match filter {
            ScopeFilter::Unrestricted => None,
            ScopeFilter::Store(store_id) => Some(store_id),
            ScopeFilter::OwnRecords(_) => return Ok(Vec::new()),
        };

        let rows = self.state.db.inventory().list(store_filter).await?;

        let today = self.state.clock.today();
        let mut by_product: HashMap<i64, Vec<Promotion>> = HashMap::new();
        for (product_id, promotion) in self.state.db.promotions().active_links(today).await? {
            by_product.entry(product_id).or_default().push(promotion);
        }

        let priced = rows
            .into_iter()
            .map(|row| {
                let candidates = by_product.get(&row.product_id).map(Vec::as_slice).unwrap_or(&[]);
                price_row(row, candidates, today)
            })
            .collect();

        Ok(priced)
    }

    /// Creates the record or overwrites its quantity and price.
    pub async fn upsert_inventory(
        &self,
        actor: &Actor,
        product_id: i64,
        store_id: i64,
        quantity: i64,
        price: Money,
    ) -> ServiceResult<InventoryRecord> {
        authorize(actor, Action::UpsertInventory, &ResourceScope::store(store_id))?;
        validate_non_negative("quantity", quantity)?;
        validate_non_negative("price", price.cents())?;

        if self.state.db.products().get(product_id).await?.is_none() {
            return Err(ServiceError::not_found("Product", product_id));
        }
        if self.state.db.stores().get(store_id).await?.is_none() {
            return Err(ServiceError::not_found("Store", store_id));
        }

        let now = self.state.clock.now();
        let mut tx = self.state.db.begin().await?;

        let record = InventoryRepository::upsert_in(
            &mut tx,
            product_id,
            store_id,
            quantity,
            price.cents(),
            now,
        )
        .await?;

        WorkLogRepository::insert_in(
            &mut tx,
            actor.user_id,
            Some(store_id),
            "upsert_inventory",
            Some(&json!({
                "product_id": product_id,
                "quantity": quantity,
                "price_cents": price.cents(),
            })),
            now,
        )
        .await?;

        tx.commit().await?;

        info!(product_id, store_id, quantity, price = %price, "Inventory upserted");
        Ok(record)
    }

    /// Adds `delta` to the stock on hand and returns the new quantity.
    pub async fn adjust_inventory(
        &self,
        actor: &Actor,
        product_id: i64,
        store_id: i64,
        delta: i64,
    ) -> ServiceResult<i64> {
        authorize(actor, Action::AdjustInventory, &ResourceScope::store(store_id))?;
        if delta == 0 {
            return Err(ServiceError::bad_request("delta must not be zero"));
        }

        let now = self.state.clock.now();
        let mut tx = self.state.db.begin().await?;

        let quantity = InventoryRepository::adjust_in(&mut tx, product_id, store_id, delta, now).await?;

        WorkLogRepository::insert_in(
            &mut tx,
            actor.user_id,
            Some(store_id),
            "adjust_inventory",
            Some(&json!({ "product_id": product_id, "delta": delta, "quantity": quantity })),
            now,
        )
        .await?;

        tx.commit().await?;

        info!(product_id, store_id, delta, quantity, "Inventory adjusted");
        Ok(quantity)
    }

    /// Needs the inventory Delete grant on top of the store scope.
    pub async fn delete_inventory(
        &self,
        actor: &Actor,
        product_id: i64,
        store_id: i64,
    ) -> ServiceResult<()> {
        authorize(actor, Action::DeleteInventory, &ResourceScope::store(store_id))?;
        require_feature(&self.state.db, actor, Feature::InventoryManagement, PermissionOp::Delete)
            .await?;

        let now = self.state.clock.now();
        let mut tx = self.state.db.begin().await?;

        InventoryRepository::delete_in(&mut tx, product_id, store_id).await?;

        WorkLogRepository::insert_in(
            &mut tx,
            actor.user_id,
            Some(store_id),
            "delete_inventory",
            Some(&json!({ "product_id": product_id })),
            now,
        )
        .await?;

        tx.commit().await?;

        info!(product_id, store_id, "Inventory record deleted");
        Ok(())
    }
}

fn price_row(
    row: InventoryListing,
    candidates: &[Promotion],
    today: NaiveDate,
) -> PricedInventory {
    let original_price = Money::from_cents(row.price_cents);
    let priced = price_for_store(original_price, candidates, row.store_id, today);

    PricedInventory {
        product_id: row.product_id,
        store_id: row.store_id,
        sku: row.sku,
        product_name: row.product_name,
        quantity: row.quantity,
        original_price,
        price: priced.price,
        has_promotion: priced.has_promotion(),
        promotion_id: priced.promotion_id,
        updated_at: row.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{promotion, promotion_input, World};
    use retail_core::DiscountType;

    fn row_for(rows: &[PricedInventory], product_id: i64) -> &PricedInventory {
        rows.iter()
            .find(|r| r.product_id == product_id)
            .expect("row present")
    }

    #[tokio::test]
    async fn test_promotion_pricing() {
        let w = World::new().await;
        let percent = w.stocked("P-PERCENT", w.branch, 10, 10000).await;
        let fixed = w.stocked("P-FIXED", w.branch, 10, 10000).await;
        let expired = w.stocked("P-EXPIRED", w.branch, 10, 10000).await;
        let db = &w.state.db;

        promotion(
            db,
            w.admin.user_id,
            &promotion_input(DiscountType::Percentage, 2000, "2024-06-01", "2024-06-30", None, vec![percent]),
        )
        .await;
        let fixed_promo = promotion(
            db,
            w.admin.user_id,
            &promotion_input(DiscountType::Fixed, 1500, "2024-06-15", "2024-06-15", Some(w.branch), vec![fixed]),
        )
        .await;
        promotion(
            db,
            w.admin.user_id,
            &promotion_input(DiscountType::Percentage, 5000, "2024-05-01", "2024-06-14", None, vec![expired]),
        )
        .await;

        let service = InventoryService::new(w.state.clone());
        let rows = service.list_inventory(&w.cashier, None).await.unwrap();

        let p = row_for(&rows, percent);
        assert_eq!(p.original_price.cents(), 10000);
        assert_eq!(p.price.cents(), 8000);
        assert!(p.has_promotion);

        let f = row_for(&rows, fixed);
        assert_eq!(f.price.cents(), 8500);
        assert_eq!(f.promotion_id, Some(fixed_promo.id));

        let e = row_for(&rows, expired);
        assert_eq!(e.price.cents(), 10000);
        assert!(!e.has_promotion);

        // Same inputs, same answer
        let again = service.list_inventory(&w.cashier, None).await.unwrap();
        assert_eq!(rows, again);
    }

    #[tokio::test]
    async fn test_store_scoped_promotion_stays_in_its_store() {
        let w = World::new().await;
        let cola = w.stocked("BEV-COLA", w.branch, 10, 1000).await;
        w.stock(cola, w.other_branch, 10, 1000).await;
        promotion(
            &w.state.db,
            w.manager.user_id,
            &promotion_input(DiscountType::Fixed, 100, "2024-06-01", "2024-06-30", Some(w.branch), vec![cola]),
        )
        .await;

        let service = InventoryService::new(w.state.clone());
        let rows = service.list_inventory(&w.admin, None).await.unwrap();

        let north = rows.iter().find(|r| r.store_id == w.branch).unwrap();
        let south = rows.iter().find(|r| r.store_id == w.other_branch).unwrap();
        assert_eq!(north.price.cents(), 900);
        assert_eq!(south.price.cents(), 1000);
    }

    #[tokio::test]
    async fn test_listing_scoped_to_home_store() {
        let w = World::new().await;
        let cola = w.stocked("BEV-COLA", w.branch, 10, 400).await;
        w.stock(cola, w.other_branch, 3, 400).await;
        let service = InventoryService::new(w.state.clone());

        let rows = service.list_inventory(&w.cashier, None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].store_id, w.branch);

        let err = service
            .list_inventory(&w.cashier, Some(w.other_branch))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden { .. }));

        assert_eq!(service.list_inventory(&w.admin, None).await.unwrap().len(), 2);
        assert_eq!(
            service.list_inventory(&w.admin, Some(w.other_branch)).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_upsert_rules() {
        let w = World::new().await;
        let cola = w.stocked("BEV-COLA", w.other_branch, 1, 400).await;
        let service = InventoryService::new(w.state.clone());

        let record = service
            .upsert_inventory(&w.cashier, cola, w.branch, 12, Money::from_cents(450))
            .await
            .unwrap();
        assert_eq!(record.quantity, 12);
        assert_eq!(record.price_cents, 450);

        let err = service
            .upsert_inventory(&w.cashier, cola, w.other_branch, 12, Money::from_cents(450))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden { .. }));

        let err = service
            .upsert_inventory(&w.manager, cola, w.branch, -1, Money::from_cents(450))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));

        let err = service
            .upsert_inventory(&w.admin, 4242, w.branch, 1, Money::from_cents(450))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_adjust_and_delete() {
        let w = World::new().await;
        let cola = w.stocked("BEV-COLA", w.branch, 4, 400).await;
        let service = InventoryService::new(w.state.clone());

        assert_eq!(service.adjust_inventory(&w.manager, cola, w.branch, 6).await.unwrap(), 10);
        assert_eq!(service.adjust_inventory(&w.manager, cola, w.branch, -7).await.unwrap(), 3);

        let err = service
            .adjust_inventory(&w.manager, cola, w.branch, -4)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::InsufficientStock { line: None, available: 3, requested: 4, .. }
        ));

        let err = service
            .adjust_inventory(&w.cashier, cola, w.branch, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden { .. }));

        let err = service.delete_inventory(&w.cashier, cola, w.branch).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden { .. }));

        service.delete_inventory(&w.manager, cola, w.branch).await.unwrap();
        assert!(w.state.db.inventory().get(cola, w.branch).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_log_leaves_stock_untouched() {
        let w = World::new().await;
        let cola = w.stocked("BEV-COLA", w.branch, 4, 400).await;
        w.fail_work_log_writes().await;
        let service = InventoryService::new(w.state.clone());

        let err = service
            .upsert_inventory(&w.manager, cola, w.branch, 50, Money::from_cents(999))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::StorageFailure(_)));

        let record = w.state.db.inventory().get(cola, w.branch).await.unwrap().unwrap();
        assert_eq!(record.quantity, 4);
        assert_eq!(record.price_cents, 400);

        service.delete_inventory(&w.manager, cola, w.branch).await.unwrap_err();
        assert!(w.state.db.inventory().get(cola, w.branch).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_needs_inventory_grant() {
        let w = World::new().await;
        let cola = w.stocked("BEV-COLA", w.branch, 4, 400).await;
        let no_delete = retail_core::PermissionGrant {
            can_view: true,
            can_create: true,
            can_edit: true,
            can_delete: false,
        };
        w.set_grant(retail_core::Role::StoreManager, Feature::InventoryManagement, no_delete)
            .await;
        let service = InventoryService::new(w.state.clone());

        let err = service.delete_inventory(&w.manager, cola, w.branch).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden { rule: "feature-grant", .. }));
        assert!(w.state.db.inventory().get(cola, w.branch).await.unwrap().is_some());

        // Admin keeps the grant
        service.delete_inventory(&w.admin, cola, w.branch).await.unwrap();
    }
}
