//! # Supplier Repository

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use retail_core::Supplier;

const SUPPLIER_COLUMNS: &str = "id, name, contact_info, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    pub async fn get(&self, id: i64) -> DbResult<Option<Supplier>> {
        let supplier = sqlx::query_as::<_, Supplier>(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(supplier)
    }

    pub async fn list(&self) -> DbResult<Vec<Supplier>> {
        let suppliers = sqlx::query_as::<_, Supplier>(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers ORDER BY name, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(suppliers)
    }

    pub async fn insert(&self, name: &str, contact_info: Option<&str>) -> DbResult<Supplier> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_in(&mut conn, name, contact_info).await
    }

    pub async fn insert_in(
        conn: &mut SqliteConnection,
        name: &str,
        contact_info: Option<&str>,
    ) -> DbResult<Supplier> {
        debug!(name = %name, "Inserting supplier");

        let supplier = sqlx::query_as::<_, Supplier>(&format!(
            "INSERT INTO suppliers (name, contact_info, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)
             RETURNING {SUPPLIER_COLUMNS}"
        ))
        .bind(name.trim())
        .bind(contact_info)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;

        Ok(supplier)
    }

    pub async fn update(
        &self,
        id: i64,
        name: &str,
        contact_info: Option<&str>,
    ) -> DbResult<Supplier> {
        let mut conn = self.pool.acquire().await?;
        Self::update_in(&mut conn, id, name, contact_info).await
    }

    pub async fn update_in(
        conn: &mut SqliteConnection,
        id: i64,
        name: &str,
        contact_info: Option<&str>,
    ) -> DbResult<Supplier> {
        let supplier = sqlx::query_as::<_, Supplier>(&format!(
            "UPDATE suppliers SET name = ?1, contact_info = ?2, updated_at = ?3
             WHERE id = ?4
             RETURNING {SUPPLIER_COLUMNS}"
        ))
        .bind(name.trim())
        .bind(contact_info)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        supplier.ok_or_else(|| DbError::not_found("Supplier", id))
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::fresh_db;

    #[tokio::test]
    async fn test_supplier_round_trip() {
        let db = fresh_db().await;

        let supplier = db
            .suppliers()
            .insert("Acme Foods", Some("orders@acme.test"))
            .await
            .unwrap();
        let fetched = db.suppliers().get(supplier.id).await.unwrap().unwrap();
        assert_eq!(fetched.contact_info.as_deref(), Some("orders@acme.test"));

        let updated = db.suppliers().update(supplier.id, "Acme", None).await.unwrap();
        assert_eq!(updated.name, "Acme");
        assert_eq!(updated.contact_info, None);
    }
}
