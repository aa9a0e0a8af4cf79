//! Back office services.
//!
//! Each service holds the shared [`AppState`](crate::AppState) and takes
//! the calling [`Actor`] as its first argument.

pub mod auth;
pub mod catalog;
pub mod deletion;
pub mod inventory;
pub mod permissions;
pub mod promotions;
pub mod sales;
pub mod users;
pub mod work_logs;

pub use auth::{AuthService, Session};
pub use catalog::CatalogService;
pub use deletion::DeletionGuard;
pub use inventory::InventoryService;
pub use permissions::PermissionService;
pub use promotions::PromotionService;
pub use sales::SaleService;
pub use users::{NewUser, UserService};
pub use work_logs::WorkLogService;

use tracing::warn;

use crate::error::{ServiceError, ServiceResult};
use retail_core::{
    authorize as evaluate, Action, Actor, Decision, Feature, PermissionOp, ResourceScope,
    RolePermission, ScopeFilter,
};
use retail_db::Database;

/// Default page size for listings.
pub const DEFAULT_LIST_LIMIT: u32 = 100;

/// Runs the Authorization Evaluator and logs denials.
pub(crate) fn authorize(
    actor: &Actor,
    action: Action,
    scope: &ResourceScope,
) -> ServiceResult<ScopeFilter> {
    match evaluate(actor, action, scope) {
        Decision::Allow(filter) => Ok(filter),
        Decision::Deny(reason) => {
            warn!(
                user_id = actor.user_id,
                role = %actor.role,
                action = %action,
                rule = reason.rule,
                "Authorization denied"
            );
            Err(ServiceError::Forbidden {
                rule: reason.rule,
                message: reason.message,
            })
        }
    }
}

/// The caller's cell of the permission matrix for one feature.
///
/// Loaded through the pool before a transaction opens, then checked once
/// the policy table has allowed the action.
pub(crate) struct FeatureGrant {
    feature: Feature,
    row: Option<RolePermission>,
}

impl FeatureGrant {
    pub(crate) async fn load(
        db: &Database,
        actor: &Actor,
        feature: Feature,
    ) -> ServiceResult<Self> {
        let row = db.permissions().get(actor.role, feature).await?;
        Ok(FeatureGrant { feature, row })
    }

    /// A missing cell grants nothing.
    pub(crate) fn allows(&self, op: PermissionOp) -> bool {
        self.row.as_ref().is_some_and(|row| row.allows(op))
    }

    pub(crate) fn require(&self, actor: &Actor, op: PermissionOp) -> ServiceResult<()> {
        if self.allows(op) {
            return Ok(());
        }

        let feature = self.feature;
        warn!(
            user_id = actor.user_id,
            role = %actor.role,
            feature = ?feature,
            op = ?op,
            "Feature grant missing"
        );
        Err(ServiceError::Forbidden {
            rule: "feature-grant",
            message: format!("{} role has no {op:?} grant on {feature:?}", actor.role),
        })
    }
}

/// Second gate for operations the permission matrix controls. Runs after
/// [`authorize`]. Reads through the pool, so call it before opening a
/// transaction.
pub(crate) async fn require_feature(
    db: &Database,
    actor: &Actor,
    feature: Feature,
    op: PermissionOp,
) -> ServiceResult<()> {
    FeatureGrant::load(db, actor, feature).await?.require(actor, op)
}
