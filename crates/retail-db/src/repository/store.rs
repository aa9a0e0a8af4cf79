//! # Store Repository

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use retail_core::{Store, HEAD_OFFICE_STORE_ID};

const STORE_COLUMNS: &str = "id, name, address, created_at, updated_at";

/// Repository for store database operations.
#[derive(Debug, Clone)]
pub struct StoreRepository {
    pool: SqlitePool,
}

impl StoreRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StoreRepository { pool }
    }

    pub async fn get(&self, id: i64) -> DbResult<Option<Store>> {
        let store = sqlx::query_as::<_, Store>(&format!(
            "SELECT {STORE_COLUMNS} FROM stores WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(store)
    }

    pub async fn list(&self) -> DbResult<Vec<Store>> {
        let stores = sqlx::query_as::<_, Store>(&format!(
            "SELECT {STORE_COLUMNS} FROM stores ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(stores)
    }

    pub async fn insert(&self, name: &str, address: Option<&str>) -> DbResult<Store> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_in(&mut conn, name, address).await
    }

    pub async fn insert_in(
        conn: &mut SqliteConnection,
        name: &str,
        address: Option<&str>,
    ) -> DbResult<Store> {
        let now = Utc::now();
        debug!(name = %name, "Inserting store");

        let store = sqlx::query_as::<_, Store>(&format!(
            "INSERT INTO stores (name, address, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)
             RETURNING {STORE_COLUMNS}"
        ))
        .bind(name.trim())
        .bind(address)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        Ok(store)
    }

    pub async fn update(&self, id: i64, name: &str, address: Option<&str>) -> DbResult<Store> {
        let mut conn = self.pool.acquire().await?;
        Self::update_in(&mut conn, id, name, address).await
    }

    pub async fn update_in(
        conn: &mut SqliteConnection,
        id: i64,
        name: &str,
        address: Option<&str>,
    ) -> DbResult<Store> {
        let store = sqlx::query_as::<_, Store>(&format!(
            "UPDATE stores SET name = ?1, address = ?2, updated_at = ?3
             WHERE id = ?4
             RETURNING {STORE_COLUMNS}"
        ))
        .bind(name.trim())
        .bind(address)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        store.ok_or_else(|| DbError::not_found("Store", id))
    }

    /// Creates the head office store if it is missing. Returns it either way.
    pub async fn ensure_head_office(&self, name: &str) -> DbResult<Store> {
        let now = Utc::now();
        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO stores (id, name, address, created_at, updated_at)
             VALUES (?1, ?2, NULL, ?3, ?3)",
        )
        .bind(HEAD_OFFICE_STORE_ID)
        .bind(name)
        .bind(now)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted > 0 {
            info!(store_id = HEAD_OFFICE_STORE_ID, "Created head office store");
        }

        self.get(HEAD_OFFICE_STORE_ID)
            .await?
            .ok_or_else(|| DbError::not_found("Store", HEAD_OFFICE_STORE_ID))
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::fresh_db;
    use retail_core::HEAD_OFFICE_STORE_ID;

    #[tokio::test]
    async fn test_insert_update_list() {
        let db = fresh_db().await;

        let store = db.stores().insert("  Riverside ", Some("1 River Rd")).await.unwrap();
        assert_eq!(store.name, "Riverside");

        let updated = db.stores().update(store.id, "Riverside Mall", None).await.unwrap();
        assert_eq!(updated.name, "Riverside Mall");
        assert_eq!(updated.address, None);

        assert_eq!(db.stores().list().await.unwrap().len(), 1);
        assert!(db.stores().update(999, "Nowhere", None).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_ensure_head_office_is_idempotent() {
        let db = fresh_db().await;

        let first = db.stores().ensure_head_office("Head Office").await.unwrap();
        let second = db.stores().ensure_head_office("Renamed").await.unwrap();

        assert_eq!(first.id, HEAD_OFFICE_STORE_ID);
        assert_eq!(second.name, "Head Office");
        assert_eq!(db.stores().list().await.unwrap().len(), 1);
    }
}
