//! # Permission Repository
//!
//! The role × feature grant matrix. Clients read it to decide which menus
//! to show; the services never consult it when deciding an operation.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use crate::error::{DbError, DbResult};
use retail_core::{Feature, PermissionGrant, Role, RolePermission};

const PERMISSION_COLUMNS: &str =
    "role, feature, can_view, can_create, can_edit, can_delete, updated_at";

#[derive(Debug, Clone)]
pub struct PermissionRepository {
    pool: SqlitePool,
}

impl PermissionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PermissionRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<RolePermission>> {
        let rows = sqlx::query_as::<_, RolePermission>(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM role_permissions ORDER BY role, feature"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn for_role(&self, role: Role) -> DbResult<Vec<RolePermission>> {
        let rows = sqlx::query_as::<_, RolePermission>(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM role_permissions WHERE role = ?1 ORDER BY feature"
        ))
        .bind(role)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn get(&self, role: Role, feature: Feature) -> DbResult<Option<RolePermission>> {
        let row = sqlx::query_as::<_, RolePermission>(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM role_permissions WHERE role = ?1 AND feature = ?2"
        ))
        .bind(role)
        .bind(feature)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Overwrites the four grant flags of one cell.
    pub async fn update(
        &self,
        role: Role,
        feature: Feature,
        grant: &PermissionGrant,
        now: DateTime<Utc>,
    ) -> DbResult<RolePermission> {
        let mut conn = self.pool.acquire().await?;
        Self::update_in(&mut conn, role, feature, grant, now).await
    }

    pub async fn update_in(
        conn: &mut SqliteConnection,
        role: Role,
        feature: Feature,
        grant: &PermissionGrant,
        now: DateTime<Utc>,
    ) -> DbResult<RolePermission> {
        info!(role = %role, feature = ?feature, "Updating role permission");

        let row = sqlx::query_as::<_, RolePermission>(&format!(
            "UPDATE role_permissions
             SET can_view = ?1, can_create = ?2, can_edit = ?3, can_delete = ?4, updated_at = ?5
             WHERE role = ?6 AND feature = ?7
             RETURNING {PERMISSION_COLUMNS}"
        ))
        .bind(grant.can_view)
        .bind(grant.can_create)
        .bind(grant.can_edit)
        .bind(grant.can_delete)
        .bind(now)
        .bind(role)
        .bind(feature)
        .fetch_optional(&mut *conn)
        .await?;

        row.ok_or_else(|| DbError::not_found("RolePermission", format!("{role}/{feature:?}")))
    }
}
