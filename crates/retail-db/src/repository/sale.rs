//! # Sale Repository
//!
//! Database operations for sales and sale items.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE (one transaction, driven by the sale coordinator)            │
//! │     ├── ledger adjust(-qty) per line                                    │
//! │     └── insert_in() → Sale header + SaleItem rows                       │
//! │                                                                         │
//! │  2. READ                                                                │
//! │     └── get() / items() / list(filter)                                  │
//! │                                                                         │
//! │  3. DELETE (one transaction)                                            │
//! │     ├── lock_in()   → write lock + header                               │
//! │     ├── items_in()  → lines to restore                                  │
//! │     ├── delete_in() → items, then header                                │
//! │     └── ledger adjust(+qty) per line                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `total_cents` and `unit_price_cents` are snapshots. Nothing here ever
//! recomputes them.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use super::filter_binds;
use crate::error::{DbError, DbResult};
use retail_core::{Money, Sale, SaleItem, SaleLine, ScopeFilter};

const SALE_COLUMNS: &str = "id, store_id, cashier_id, sold_at, total_cents";
const ITEM_COLUMNS: &str = "id, sale_id, product_id, quantity, unit_price_cents";

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get(&self, id: i64) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    pub async fn items(&self, sale_id: i64) -> DbResult<Vec<SaleItem>> {
        let mut conn = self.pool.acquire().await?;
        Self::items_in(&mut conn, sale_id).await
    }

    pub async fn items_in(conn: &mut SqliteConnection, sale_id: i64) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY id"
        ))
        .bind(sale_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(items)
    }

    /// Sales within a scope filter, newest first.
    ///
    /// `Store(id)` filters on the selling store, `OwnRecords(id)` on the
    /// cashier.
    pub async fn list(&self, filter: ScopeFilter, limit: u32) -> DbResult<Vec<Sale>> {
        let (store_id, cashier_id) = filter_binds(filter);

        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales
             WHERE (?1 IS NULL OR store_id = ?1) AND (?2 IS NULL OR cashier_id = ?2)
             ORDER BY sold_at DESC, id DESC
             LIMIT ?3"
        ))
        .bind(store_id)
        .bind(cashier_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    // =========================================================================
    // Transactional Writes
    // =========================================================================

    /// Inserts the header and one item per line.
    ///
    /// `total` must already be the sum of the line subtotals; it is stored
    /// as given.
    pub async fn insert_in(
        conn: &mut SqliteConnection,
        store_id: i64,
        cashier_id: i64,
        sold_at: DateTime<Utc>,
        total: Money,
        lines: &[SaleLine],
    ) -> DbResult<(Sale, Vec<SaleItem>)> {
        debug!(store_id, cashier_id, total = %total, lines = lines.len(), "Inserting sale");

        let sale = sqlx::query_as::<_, Sale>(&format!(
            "INSERT INTO sales (store_id, cashier_id, sold_at, total_cents)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING {SALE_COLUMNS}"
        ))
        .bind(store_id)
        .bind(cashier_id)
        .bind(sold_at)
        .bind(total.cents())
        .fetch_one(&mut *conn)
        .await?;

        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            let item = sqlx::query_as::<_, SaleItem>(&format!(
                "INSERT INTO sale_items (sale_id, product_id, quantity, unit_price_cents)
                 VALUES (?1, ?2, ?3, ?4)
                 RETURNING {ITEM_COLUMNS}"
            ))
            .bind(sale.id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.unit_price.cents())
            .fetch_one(&mut *conn)
            .await?;
            items.push(item);
        }

        Ok((sale, items))
    }

    /// Takes the write lock on a sale and returns its header.
    pub async fn lock_in(conn: &mut SqliteConnection, id: i64) -> DbResult<Sale> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "UPDATE sales SET id = id WHERE id = ?1 RETURNING {SALE_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        sale.ok_or_else(|| DbError::not_found("Sale", id))
    }

    /// Deletes the items, then the header.
    pub async fn delete_in(conn: &mut SqliteConnection, id: i64) -> DbResult<()> {
        sqlx::query("DELETE FROM sale_items WHERE sale_id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        let result = sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
