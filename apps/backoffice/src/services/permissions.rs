//! The role × feature permission matrix.
//!
//! The policy table in [`retail_core::authz`] decides first. For promotion
//! writes, sale deletion and inventory deletion the matching cell must also
//! grant the operation (see [`require_feature`](super::require_feature)).
//! Clients also read the matrix to build menus.

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use super::{authorize, FeatureGrant};
use crate::error::ServiceResult;
use crate::AppState;
use retail_core::{
    Action, Actor, Feature, PermissionGrant, PermissionOp, ResourceScope, Role, RolePermission,
};
use retail_db::{PermissionRepository, WorkLogRepository};

pub struct PermissionService {
    state: Arc<AppState>,
}

impl PermissionService {
    pub fn new(state: Arc<AppState>) -> Self {
        PermissionService { state }
    }

    pub async fn list_role_permissions(&self, actor: &Actor) -> ServiceResult<Vec<RolePermission>> {
        authorize(actor, Action::ManagePermissions, &ResourceScope::any())?;
        Ok(self.state.db.permissions().list().await?)
    }

    pub async fn update_role_permission(
        &self,
        actor: &Actor,
        role: Role,
        feature: Feature,
        grant: &PermissionGrant,
    ) -> ServiceResult<RolePermission> {
        authorize(
            actor,
            Action::ManagePermissions,
            &ResourceScope::any().targeting(role).feature(feature),
        )?;

        let now = self.state.clock.now();
        let mut tx = self.state.db.begin().await?;

        let row = PermissionRepository::update_in(&mut tx, role, feature, grant, now).await?;

        WorkLogRepository::insert_in(
            &mut tx,
            actor.user_id,
            actor.home_store_id,
            "update_role_permission",
            Some(&json!({ "role": role, "feature": feature, "grant": grant })),
            now,
        )
        .await?;

        tx.commit().await?;

        info!(role = %role, feature = ?feature, updated_by = actor.user_id, "Role permission updated");
        Ok(row)
    }

    /// The caller's own row of the matrix.
    pub async fn permissions_for(&self, actor: &Actor) -> ServiceResult<Vec<RolePermission>> {
        Ok(self.state.db.permissions().for_role(actor.role).await?)
    }

    /// A missing cell grants nothing.
    pub async fn check_permission(
        &self,
        actor: &Actor,
        feature: Feature,
        op: PermissionOp,
    ) -> ServiceResult<bool> {
        let grant = FeatureGrant::load(&self.state.db, actor, feature).await?;
        Ok(grant.allows(op))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::test_support::World;

    const NOTHING: PermissionGrant = PermissionGrant {
        can_view: false,
        can_create: false,
        can_edit: false,
        can_delete: false,
    };

    #[tokio::test]
    async fn test_admin_edits_matrix() {
        let w = World::new().await;
        let service = PermissionService::new(w.state.clone());

        assert!(
            service
                .check_permission(&w.cashier, Feature::PosSystem, PermissionOp::View)
                .await
                .unwrap()
        );

        let row = service
            .update_role_permission(&w.admin, Role::Cashier, Feature::PosSystem, &NOTHING)
            .await
            .unwrap();
        assert!(!row.can_view);
        assert!(
            !service
                .check_permission(&w.cashier, Feature::PosSystem, PermissionOp::View)
                .await
                .unwrap()
        );

        assert_eq!(service.list_role_permissions(&w.admin).await.unwrap().len(), 30);
        assert_eq!(service.permissions_for(&w.cashier).await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_admin_cannot_lock_themselves_out() {
        let w = World::new().await;
        let service = PermissionService::new(w.state.clone());

        let err = service
            .update_role_permission(
                &w.admin,
                Role::SystemAdmin,
                Feature::PermissionManagement,
                &NOTHING,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden { rule: "admin-lockout", .. }));

        // Other admin rows stay editable
        service
            .update_role_permission(&w.admin, Role::SystemAdmin, Feature::PosSystem, &NOTHING)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_only_admins_manage_matrix() {
        let w = World::new().await;
        let service = PermissionService::new(w.state.clone());

        let err = service.list_role_permissions(&w.manager).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden { rule: "no-grant", .. }));

        let err = service
            .update_role_permission(&w.manager, Role::Cashier, Feature::PosSystem, &NOTHING)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn test_failed_log_keeps_matrix_cell() {
        let w = World::new().await;
        w.fail_work_log_writes().await;
        let service = PermissionService::new(w.state.clone());

        let err = service
            .update_role_permission(&w.admin, Role::Cashier, Feature::PosSystem, &NOTHING)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::StorageFailure(_)));
        assert!(
            service
                .check_permission(&w.cashier, Feature::PosSystem, PermissionOp::View)
                .await
                .unwrap()
        );
    }
}
