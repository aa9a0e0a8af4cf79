//! # Work Log Repository
//!
//! Append-only audit entries. There is no update or delete here; a work log
//! row lives as long as its user does.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use super::filter_binds;
use crate::error::DbResult;
use retail_core::{ScopeFilter, WorkLog};

const WORK_LOG_COLUMNS: &str = "id, user_id, store_id, action, details, logged_at";

#[derive(Debug, Clone)]
pub struct WorkLogRepository {
    pool: SqlitePool,
}

impl WorkLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        WorkLogRepository { pool }
    }

    /// Appends an entry inside the caller's transaction.
    ///
    /// The entry commits or rolls back together with the change it
    /// describes.
    pub async fn insert_in(
        conn: &mut SqliteConnection,
        user_id: i64,
        store_id: Option<i64>,
        action: &str,
        details: Option<&serde_json::Value>,
        now: DateTime<Utc>,
    ) -> DbResult<i64> {
        debug!(user_id, action = %action, "Appending work log");

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO work_logs (user_id, store_id, action, details, logged_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id",
        )
        .bind(user_id)
        .bind(store_id)
        .bind(action)
        .bind(details.map(|d| d.to_string()))
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        Ok(id)
    }

    pub async fn insert(
        &self,
        user_id: i64,
        store_id: Option<i64>,
        action: &str,
        details: Option<&serde_json::Value>,
        now: DateTime<Utc>,
    ) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_in(&mut conn, user_id, store_id, action, details, now).await
    }

    /// Entries within a scope filter, newest first. `OwnRecords(id)` matches
    /// the acting user.
    pub async fn list(&self, filter: ScopeFilter, limit: u32) -> DbResult<Vec<WorkLog>> {
        let (store_id, user_id) = filter_binds(filter);

        let logs = sqlx::query_as::<_, WorkLog>(&format!(
            "SELECT {WORK_LOG_COLUMNS} FROM work_logs
             WHERE (?1 IS NULL OR store_id = ?1) AND (?2 IS NULL OR user_id = ?2)
             ORDER BY logged_at DESC, id DESC
             LIMIT ?3"
        ))
        .bind(store_id)
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }
}
