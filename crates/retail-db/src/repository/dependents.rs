//! # Dependents Repository
//!
//! Storage half of the Deletion Guard: locks a guarded row, counts the rows
//! that reference it and deletes it, all on the caller's transaction.
//!
//! ## Dependency Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Entity     Blocking dependents                                         │
//! │  ────────   ─────────────────────────────────────────────────────────   │
//! │  Store      users.store_id, inventory.store_id, sales.store_id          │
//! │  Supplier   products.supplier_id                                        │
//! │  Category   products.category_id                                        │
//! │  Product    inventory.product_id, sale_items.product_id,                │
//! │             promotion_items.product_id                                  │
//! │  User       sales.cashier_id, work_logs.user_id                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Promotions scoped to a store are not blockers; they cascade with it.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use retail_core::{DependentCounts, DependentKind, EntityKind};

const fn table(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Store => "stores",
        EntityKind::Supplier => "suppliers",
        EntityKind::Category => "categories",
        EntityKind::Product => "products",
        EntityKind::User => "users",
    }
}

/// One kind of row that blocks deleting an entity: `(kind, table, column)`.
type Reference = (DependentKind, &'static str, &'static str);

/// Rows that must not exist for a delete to proceed.
const fn references(kind: EntityKind) -> &'static [Reference] {
    match kind {
        EntityKind::Store => &[
            (DependentKind::Users, "users", "store_id"),
            (DependentKind::Inventory, "inventory", "store_id"),
            (DependentKind::Sales, "sales", "store_id"),
        ],
        EntityKind::Supplier => &[(DependentKind::Products, "products", "supplier_id")],
        EntityKind::Category => &[(DependentKind::Products, "products", "category_id")],
        EntityKind::Product => &[
            (DependentKind::Inventory, "inventory", "product_id"),
            (DependentKind::SaleItems, "sale_items", "product_id"),
            (DependentKind::PromotionItems, "promotion_items", "product_id"),
        ],
        EntityKind::User => &[
            (DependentKind::Sales, "sales", "cashier_id"),
            (DependentKind::WorkLogs, "work_logs", "user_id"),
        ],
    }
}

/// Lock, count and delete for guarded entities. Every call runs on the
/// caller's transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct DependentsRepository;

impl DependentsRepository {
    /// Takes the write lock on the entity row. Fails with `NotFound` when the
    /// row does not exist.
    ///
    /// Holding the write lock before counting means no other writer can add
    /// a dependent between the count and the delete.
    pub async fn lock_in(conn: &mut SqliteConnection, kind: EntityKind, id: i64) -> DbResult<()> {
        let sql = format!(
            "UPDATE {} SET updated_at = updated_at WHERE id = ?1",
            table(kind)
        );
        let result = sqlx::query(&sql).bind(id).execute(&mut *conn).await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(kind.as_str(), id));
        }

        Ok(())
    }

    pub async fn count_in(
        conn: &mut SqliteConnection,
        kind: EntityKind,
        id: i64,
    ) -> DbResult<DependentCounts> {
        let mut counts = DependentCounts::default();

        for &(dependent, dep_table, column) in references(kind) {
            let count: i64 = sqlx::query_scalar(&format!(
                "SELECT COUNT(*) FROM {dep_table} WHERE {column} = ?1"
            ))
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;
            counts.push(dependent, count);
        }

        debug!(entity = %kind, id, total = counts.total(), "Counted dependents");
        Ok(counts)
    }

    pub async fn delete_in(conn: &mut SqliteConnection, kind: EntityKind, id: i64) -> DbResult<()> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", table(kind));
        let result = sqlx::query(&sql).bind(id).execute(&mut *conn).await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(kind.as_str(), id));
        }

        Ok(())
    }
}
