//! # Category Repository
//!
//! Product categories. Names are unique.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use retail_core::Category;

#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    pub async fn get(&self, id: i64) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, created_at, updated_at FROM categories WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    pub async fn list(&self) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, created_at, updated_at FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    pub async fn insert(&self, name: &str) -> DbResult<Category> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_in(&mut conn, name).await
    }

    pub async fn insert_in(conn: &mut SqliteConnection, name: &str) -> DbResult<Category> {
        debug!(name = %name, "Inserting category");

        let category = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, created_at, updated_at) VALUES (?1, ?2, ?2)
             RETURNING id, name, created_at, updated_at",
        )
        .bind(name.trim())
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;

        Ok(category)
    }

    pub async fn update(&self, id: i64, name: &str) -> DbResult<Category> {
        let mut conn = self.pool.acquire().await?;
        Self::update_in(&mut conn, id, name).await
    }

    pub async fn update_in(conn: &mut SqliteConnection, id: i64, name: &str) -> DbResult<Category> {
        let category = sqlx::query_as::<_, Category>(
            "UPDATE categories SET name = ?1, updated_at = ?2 WHERE id = ?3
             RETURNING id, name, created_at, updated_at",
        )
        .bind(name.trim())
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        category.ok_or_else(|| DbError::not_found("Category", id))
    }
}
