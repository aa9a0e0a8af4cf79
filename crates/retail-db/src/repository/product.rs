//! # Product Repository
//!
//! Database operations for the product catalog.
//!
//! ## Catalog Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products                                                               │
//! │  ├── sku          UNIQUE, the business identifier                       │
//! │  ├── category_id  → categories(id)   optional                           │
//! │  └── supplier_id  → suppliers(id)    optional                           │
//! │                                                                         │
//! │  Prices are NOT here: each store prices its own stock on the            │
//! │  inventory record.                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use retail_core::{Product, ProductInput};

const PRODUCT_COLUMNS: &str =
    "id, sku, name, description, category_id, supplier_id, created_at, updated_at";

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Searches products by SKU or name prefix/substring.
    ///
    /// An empty query lists the catalog sorted by name.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let products = repo.search("cola", 20).await?;
    /// ```
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = query.trim();

        debug!(query = %query, limit = %limit, "Searching products");

        let pattern = format!("%{}%", query.replace('%', "\\%").replace('_', "\\_"));

        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE ?1 = '' OR sku LIKE ?2 ESCAPE '\\' OR name LIKE ?2 ESCAPE '\\'
             ORDER BY name, id
             LIMIT ?3"
        ))
        .bind(query)
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    pub async fn get(&self, id: i64) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?1"
        ))
        .bind(sku.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Inserts a product.
    ///
    /// A missing category or supplier surfaces as
    /// [`DbError::ForeignKeyViolation`], a taken SKU as
    /// [`DbError::UniqueViolation`].
    pub async fn insert(&self, input: &ProductInput) -> DbResult<Product> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_in(&mut conn, input).await
    }

    pub async fn insert_in(conn: &mut SqliteConnection, input: &ProductInput) -> DbResult<Product> {
        debug!(sku = %input.sku, "Inserting product");

        let product = sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO products (sku, name, description, category_id, supplier_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(input.sku.trim())
        .bind(input.name.trim())
        .bind(input.description.as_deref())
        .bind(input.category_id)
        .bind(input.supplier_id)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;

        Ok(product)
    }

    /// Replaces every editable field of a product.
    pub async fn update(&self, id: i64, input: &ProductInput) -> DbResult<Product> {
        let mut conn = self.pool.acquire().await?;
        Self::update_in(&mut conn, id, input).await
    }

    pub async fn update_in(
        conn: &mut SqliteConnection,
        id: i64,
        input: &ProductInput,
    ) -> DbResult<Product> {
        debug!(id = id, sku = %input.sku, "Updating product");

        let product = sqlx::query_as::<_, Product>(&format!(
            "UPDATE products
             SET sku = ?1, name = ?2, description = ?3, category_id = ?4, supplier_id = ?5,
                 updated_at = ?6
             WHERE id = ?7
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(input.sku.trim())
        .bind(input.name.trim())
        .bind(input.description.as_deref())
        .bind(input.category_id)
        .bind(input.supplier_id)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        product.ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Counts products (for diagnostics and the seed binary).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::DbError;
    use crate::test_support::{fresh_db, product_input};

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = fresh_db().await;

        let product = db.products().insert(&product_input("COKE-330", "Coca-Cola 330ml")).await.unwrap();

        assert_eq!(db.products().get(product.id).await.unwrap().unwrap().sku, "COKE-330");
        assert_eq!(
            db.products().get_by_sku("COKE-330").await.unwrap().map(|p| p.id),
            Some(product.id)
        );
        assert_eq!(db.products().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_sku_is_rejected() {
        let db = fresh_db().await;
        db.products().insert(&product_input("SKU-1", "One")).await.unwrap();

        let err = db.products().insert(&product_input("SKU-1", "Other")).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_missing_category_is_a_foreign_key_violation() {
        let db = fresh_db().await;
        let mut input = product_input("SKU-2", "Two");
        input.category_id = Some(42);

        let err = db.products().insert(&input).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_search_matches_sku_and_name() {
        let db = fresh_db().await;
        db.products().insert(&product_input("BEV-001", "Coca-Cola")).await.unwrap();
        db.products().insert(&product_input("SNK-001", "Potato Chips")).await.unwrap();

        assert_eq!(db.products().search("cola", 10).await.unwrap().len(), 1);
        assert_eq!(db.products().search("SNK", 10).await.unwrap().len(), 1);
        assert_eq!(db.products().search("", 10).await.unwrap().len(), 2);
        assert_eq!(db.products().search("", 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_replaces_fields() {
        let db = fresh_db().await;
        let product = db.products().insert(&product_input("SKU-3", "Three")).await.unwrap();

        let mut input = product_input("SKU-3B", "Three B");
        input.description = Some("renamed".to_string());
        let updated = db.products().update(product.id, &input).await.unwrap();

        assert_eq!(updated.sku, "SKU-3B");
        assert_eq!(updated.description.as_deref(), Some("renamed"));
        assert!(db.products().update(999, &input).await.unwrap_err().is_not_found());
    }
}
