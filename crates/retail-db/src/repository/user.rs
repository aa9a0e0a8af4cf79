//! # User Repository
//!
//! Accounts and credentials. The password hash is only ever returned by
//! [`UserRepository::find_credentials`]; every other query maps to
//! [`User`], which has no hash field.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use super::filter_binds;
use crate::error::{DbError, DbResult};
use retail_core::{Role, ScopeFilter, User};

const USER_COLUMNS: &str = "id, username, role, store_id, created_at, updated_at";

/// A user row together with its stored password hash.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: User,
    password_hash: String,
}

/// Column changes for [`UserRepository::update`]. `None` keeps the value.
#[derive(Debug, Clone, Default)]
pub struct UserChanges<'a> {
    pub username: Option<&'a str>,
    pub password_hash: Option<&'a str>,
    pub role: Option<Role>,
    pub store_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    pub async fn get(&self, id: i64) -> DbResult<Option<User>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_in(&mut conn, id).await
    }

    pub async fn get_in(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(user)
    }

    pub async fn find_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?1"
        ))
        .bind(username.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Loads a user with its password hash, for login only.
    pub async fn find_credentials(&self, username: &str) -> DbResult<Option<UserCredentials>> {
        let row = sqlx::query_as::<_, CredentialRow>(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE username = ?1"
        ))
        .bind(username.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| UserCredentials {
            user: r.user,
            password_hash: r.password_hash,
        }))
    }

    /// Lists accounts within a scope filter.
    ///
    /// `Store(id)` lists that store's accounts, `OwnRecords(id)` only the
    /// account itself.
    pub async fn list(&self, filter: ScopeFilter) -> DbResult<Vec<User>> {
        let (store_id, owner_id) = filter_binds(filter);

        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE (?1 IS NULL OR store_id = ?1) AND (?2 IS NULL OR id = ?2)
             ORDER BY id"
        ))
        .bind(store_id)
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    pub async fn insert(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
        store_id: Option<i64>,
    ) -> DbResult<User> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_in(&mut conn, username, password_hash, role, store_id).await
    }

    pub async fn insert_in(
        conn: &mut SqliteConnection,
        username: &str,
        password_hash: &str,
        role: Role,
        store_id: Option<i64>,
    ) -> DbResult<User> {
        debug!(username = %username, role = %role, "Inserting user");

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, password_hash, role, store_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(username.trim())
        .bind(password_hash)
        .bind(role)
        .bind(store_id)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;

        Ok(user)
    }

    pub async fn update(&self, id: i64, changes: &UserChanges<'_>) -> DbResult<User> {
        let mut conn = self.pool.acquire().await?;
        Self::update_in(&mut conn, id, changes).await
    }

    pub async fn update_in(
        conn: &mut SqliteConnection,
        id: i64,
        changes: &UserChanges<'_>,
    ) -> DbResult<User> {
        debug!(id, "Updating user");

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET username = COALESCE(?1, username),
                 password_hash = COALESCE(?2, password_hash),
                 role = COALESCE(?3, role),
                 store_id = COALESCE(?4, store_id),
                 updated_at = ?5
             WHERE id = ?6
             RETURNING {USER_COLUMNS}"
        ))
        .bind(changes.username.map(str::trim))
        .bind(changes.password_hash)
        .bind(changes.role)
        .bind(changes.store_id)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        user.ok_or_else(|| DbError::not_found("User", id))
    }

    pub async fn count_by_role(&self, role: Role) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = ?1")
            .bind(role)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
