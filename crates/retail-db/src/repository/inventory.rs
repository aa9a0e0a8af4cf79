//! # Inventory Ledger
//!
//! Per-(product, store) stock and shelf price.
//!
//! ## Adjust Is One Conditional Statement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  adjust(product, store, delta)                                          │
//! │                                                                         │
//! │  UPDATE inventory                                                       │
//! │     SET quantity = quantity + delta                                     │
//! │   WHERE product_id = ? AND store_id = ?                                 │
//! │     AND quantity + delta >= 0          ← check and write are atomic     │
//! │  RETURNING quantity                                                     │
//! │       │                                                                 │
//! │       ├── 1 row  → new quantity                                         │
//! │       └── 0 rows → read the row to explain why:                         │
//! │              missing  → NotFound                                        │
//! │              present  → InsufficientStock (nothing written)             │
//! │                                                                         │
//! │  Two terminals selling the last unit: SQLite runs one UPDATE at a time, │
//! │  the second sees quantity 0 and matches no row.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Adjust never creates a record. Stock enters the ledger through
//! [`InventoryRepository::upsert`] only.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use retail_core::InventoryRecord;

const RECORD_COLUMNS: &str = "id, product_id, store_id, quantity, price_cents, updated_at";

/// An inventory record joined with its product, before promotion pricing.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct InventoryListing {
    pub product_id: i64,
    pub store_id: i64,
    pub sku: String,
    pub product_name: String,
    pub quantity: i64,
    pub price_cents: i64,
    pub updated_at: DateTime<Utc>,
}

/// Repository for the Inventory Ledger.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    // =========================================================================
    // Point Queries
    // =========================================================================

    pub async fn get(&self, product_id: i64, store_id: i64) -> DbResult<Option<InventoryRecord>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_in(&mut conn, product_id, store_id).await
    }

    pub async fn get_in(
        conn: &mut SqliteConnection,
        product_id: i64,
        store_id: i64,
    ) -> DbResult<Option<InventoryRecord>> {
        let record = sqlx::query_as::<_, InventoryRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM inventory WHERE product_id = ?1 AND store_id = ?2"
        ))
        .bind(product_id)
        .bind(store_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(record)
    }

    /// Quantity on hand, or `NotFound` when the store has no record.
    pub async fn quantity(&self, product_id: i64, store_id: i64) -> DbResult<i64> {
        self.get(product_id, store_id)
            .await?
            .map(|r| r.quantity)
            .ok_or_else(|| record_not_found(product_id, store_id))
    }

    // =========================================================================
    // Adjust
    // =========================================================================

    /// Applies `delta` as its own statement. See [`Self::adjust_in`].
    pub async fn adjust(
        &self,
        product_id: i64,
        store_id: i64,
        delta: i64,
        now: DateTime<Utc>,
    ) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        Self::adjust_in(&mut conn, product_id, store_id, delta, now).await
    }

    /// Adds `delta` to the quantity and returns the new quantity.
    ///
    /// ## Errors
    /// - [`DbError::InsufficientStock`] if the result would be negative
    /// - [`DbError::NotFound`] if no record exists for the pair
    ///
    /// On either error nothing was written.
    pub async fn adjust_in(
        conn: &mut SqliteConnection,
        product_id: i64,
        store_id: i64,
        delta: i64,
        now: DateTime<Utc>,
    ) -> DbResult<i64> {
        debug!(product_id, store_id, delta, "Adjusting inventory");

        let updated: Option<i64> = sqlx::query_scalar(
            "UPDATE inventory
             SET quantity = quantity + ?1, updated_at = ?2
             WHERE product_id = ?3 AND store_id = ?4 AND quantity + ?1 >= 0
             RETURNING quantity",
        )
        .bind(delta)
        .bind(now)
        .bind(product_id)
        .bind(store_id)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(quantity) = updated {
            return Ok(quantity);
        }

        match Self::get_in(conn, product_id, store_id).await? {
            None => Err(record_not_found(product_id, store_id)),
            Some(record) => Err(DbError::InsufficientStock {
                product_id,
                store_id,
                available: record.quantity,
                requested: -delta,
            }),
        }
    }

    // =========================================================================
    // Create / Replace / Delete
    // =========================================================================

    /// Creates the record, or overwrites quantity and price of the existing
    /// one and bumps `updated_at`.
    pub async fn upsert(
        &self,
        product_id: i64,
        store_id: i64,
        quantity: i64,
        price_cents: i64,
        now: DateTime<Utc>,
    ) -> DbResult<InventoryRecord> {
        let mut conn = self.pool.acquire().await?;
        Self::upsert_in(&mut conn, product_id, store_id, quantity, price_cents, now).await
    }

    pub async fn upsert_in(
        conn: &mut SqliteConnection,
        product_id: i64,
        store_id: i64,
        quantity: i64,
        price_cents: i64,
        now: DateTime<Utc>,
    ) -> DbResult<InventoryRecord> {
        debug!(product_id, store_id, quantity, price_cents, "Upserting inventory");

        let record = sqlx::query_as::<_, InventoryRecord>(&format!(
            "INSERT INTO inventory (product_id, store_id, quantity, price_cents, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (product_id, store_id) DO UPDATE
             SET quantity = excluded.quantity,
                 price_cents = excluded.price_cents,
                 updated_at = excluded.updated_at
             RETURNING {RECORD_COLUMNS}"
        ))
        .bind(product_id)
        .bind(store_id)
        .bind(quantity)
        .bind(price_cents)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        Ok(record)
    }

    pub async fn delete(&self, product_id: i64, store_id: i64) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        Self::delete_in(&mut conn, product_id, store_id).await
    }

    pub async fn delete_in(
        conn: &mut SqliteConnection,
        product_id: i64,
        store_id: i64,
    ) -> DbResult<()> {
        debug!(product_id, store_id, "Deleting inventory record");

        let result = sqlx::query("DELETE FROM inventory WHERE product_id = ?1 AND store_id = ?2")
            .bind(product_id)
            .bind(store_id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(record_not_found(product_id, store_id));
        }

        Ok(())
    }

    // =========================================================================
    // Listing
    // =========================================================================

    /// Inventory joined with product names, optionally for one store.
    pub async fn list(&self, store_id: Option<i64>) -> DbResult<Vec<InventoryListing>> {
        let rows = sqlx::query_as::<_, InventoryListing>(
            "SELECT i.product_id, i.store_id, p.sku, p.name AS product_name,
                    i.quantity, i.price_cents, i.updated_at
             FROM inventory i
             INNER JOIN products p ON p.id = i.product_id
             WHERE ?1 IS NULL OR i.store_id = ?1
             ORDER BY i.store_id, p.name, p.id",
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

fn record_not_found(product_id: i64, store_id: i64) -> DbError {
    DbError::not_found(
        "InventoryRecord",
        format!("product {} in store {}", product_id, store_id),
    )
}

// =============================================================================
// Unit Tests
// =============================================================================
