//! # Authorization Evaluator
//!
//! Decides whether an [`Actor`] may perform an [`Action`] on a resource, and
//! which rows the action is narrowed to.
//!
//! ## Policy Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  role × action × scope rule                                             │
//! │                                                                         │
//! │  system_admin   every action          Anywhere                          │
//! │                 (except: cannot revoke its own permission management)   │
//! │                                                                         │
//! │  store_manager  inventory, sales,     HomeStore                         │
//! │                 users/work logs view                                    │
//! │                 manage promotion      HomeStore | own system-wide       │
//! │                 catalog view/edit     Anywhere                          │
//! │                 create/delete user    cashiers of home store            │
//! │                 update user           self | cashiers of home store     │
//! │                                                                         │
//! │  cashier        view inventory,       HomeStore                         │
//! │                 restock, sell,                                          │
//! │                 view promotions                                         │
//! │                 own sales/profile/    OwnRecords                        │
//! │                 work logs                                               │
//! │                 catalog view          Anywhere                          │
//! │                                                                         │
//! │  anything not listed                  Deny                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use retail_core::authz::{authorize, Action, ResourceScope, ScopeFilter};
//! use retail_core::types::{Actor, Role};
//!
//! let manager = Actor::new(7, Role::StoreManager, Some(2));
//!
//! let decision = authorize(&manager, Action::CreateSale, &ResourceScope::store(1));
//! assert!(!decision.is_allowed());
//!
//! let decision = authorize(&manager, Action::CreateSale, &ResourceScope::store(2));
//! assert_eq!(decision.into_result().unwrap(), ScopeFilter::Store(2));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;
use crate::types::{Actor, Feature, Role};

// =============================================================================
// Actions
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ViewInventory,
    UpsertInventory,
    AdjustInventory,
    DeleteInventory,
    CreateSale,
    ViewSales,
    DeleteSale,
    ViewPromotions,
    ManagePromotion,
    ViewCatalog,
    ManageProduct,
    DeleteProduct,
    ManageCategory,
    ManageSupplier,
    ManageStore,
    ViewUsers,
    CreateUser,
    UpdateUser,
    /// Changing an account's role or store.
    AssignRole,
    DeleteUser,
    ViewWorkLogs,
    ManagePermissions,
}

impl Action {
    pub const ALL: &'static [Action] = &[
        Action::ViewInventory,
        Action::UpsertInventory,
        Action::AdjustInventory,
        Action::DeleteInventory,
        Action::CreateSale,
        Action::ViewSales,
        Action::DeleteSale,
        Action::ViewPromotions,
        Action::ManagePromotion,
        Action::ViewCatalog,
        Action::ManageProduct,
        Action::DeleteProduct,
        Action::ManageCategory,
        Action::ManageSupplier,
        Action::ManageStore,
        Action::ViewUsers,
        Action::CreateUser,
        Action::UpdateUser,
        Action::AssignRole,
        Action::DeleteUser,
        Action::ViewWorkLogs,
        Action::ManagePermissions,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Action::ViewInventory => "view_inventory",
            Action::UpsertInventory => "upsert_inventory",
            Action::AdjustInventory => "adjust_inventory",
            Action::DeleteInventory => "delete_inventory",
            Action::CreateSale => "create_sale",
            Action::ViewSales => "view_sales",
            Action::DeleteSale => "delete_sale",
            Action::ViewPromotions => "view_promotions",
            Action::ManagePromotion => "manage_promotion",
            Action::ViewCatalog => "view_catalog",
            Action::ManageProduct => "manage_product",
            Action::DeleteProduct => "delete_product",
            Action::ManageCategory => "manage_category",
            Action::ManageSupplier => "manage_supplier",
            Action::ManageStore => "manage_store",
            Action::ViewUsers => "view_users",
            Action::CreateUser => "create_user",
            Action::UpdateUser => "update_user",
            Action::AssignRole => "assign_role",
            Action::DeleteUser => "delete_user",
            Action::ViewWorkLogs => "view_work_logs",
            Action::ManagePermissions => "manage_permissions",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Resource Scope
// =============================================================================

/// What the action touches, as far as authorization cares.
///
/// `store_id == None` means either "no particular store" (a listing) or a
/// store-nullable resource such as a system-wide promotion; the scope rule
/// decides which reading applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceScope {
    pub store_id: Option<i64>,
    /// Owning user of the record: sale cashier, promotion creator, or the
    /// account itself for user operations.
    pub owner_id: Option<i64>,
    /// Role of the account being managed.
    pub target_role: Option<Role>,
    /// Feature row being edited, for permission management.
    pub feature: Option<Feature>,
}

impl ResourceScope {
    /// Nothing store- or owner-specific.
    pub fn any() -> Self {
        ResourceScope::default()
    }

    pub fn store(store_id: i64) -> Self {
        ResourceScope {
            store_id: Some(store_id),
            ..Default::default()
        }
    }

    pub fn optional_store(store_id: Option<i64>) -> Self {
        ResourceScope {
            store_id,
            ..Default::default()
        }
    }

    pub fn owned_by(mut self, user_id: i64) -> Self {
        self.owner_id = Some(user_id);
        self
    }

    pub fn targeting(mut self, role: Role) -> Self {
        self.target_role = Some(role);
        self
    }

    pub fn feature(mut self, feature: Feature) -> Self {
        self.feature = Some(feature);
        self
    }
}

// =============================================================================
// Decision
// =============================================================================

/// Rows an allowed action is narrowed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ScopeFilter {
    /// No restriction.
    Unrestricted,
    /// Rows belonging to one store.
    Store(i64),
    /// Rows owned by one user.
    OwnRecords(i64),
}

impl ScopeFilter {
    /// Narrows an unrestricted filter to a store the caller asked for.
    /// Restricted filters are already as narrow as authorization allows.
    ///
    /// ```rust
    /// use retail_core::authz::ScopeFilter;
    ///
    /// assert_eq!(ScopeFilter::Unrestricted.with_requested_store(Some(3)), ScopeFilter::Store(3));
    /// assert_eq!(ScopeFilter::Store(2).with_requested_store(None), ScopeFilter::Store(2));
    /// ```
    pub fn with_requested_store(self, requested: Option<i64>) -> ScopeFilter {
        match (self, requested) {
            (ScopeFilter::Unrestricted, Some(store_id)) => ScopeFilter::Store(store_id),
            (filter, _) => filter,
        }
    }
}

/// Why an action was denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenyReason {
    /// Short name of the rule that denied.
    pub rule: &'static str,
    pub message: String,
}

impl DenyReason {
    pub fn new(rule: &'static str, message: impl Into<String>) -> Self {
        DenyReason {
            rule,
            message: message.into(),
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow(ScopeFilter),
    Deny(DenyReason),
}

impl Decision {
    #[inline]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }

    pub fn into_result(self) -> Result<ScopeFilter, CoreError> {
        match self {
            Decision::Allow(filter) => Ok(filter),
            Decision::Deny(reason) => Err(CoreError::Forbidden(reason)),
        }
    }
}

// =============================================================================
// Policy Table
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeRule {
    Anywhere,
    HomeStore,
    HomeStoreOrOwnSystemWide,
    OwnRecords,
    StoreCashiers,
    SelfOrStoreCashiers,
}

struct Rule {
    role: Role,
    actions: &'static [Action],
    scope: ScopeRule,
}

const POLICY: &[Rule] = &[
    Rule {
        role: Role::SystemAdmin,
        actions: Action::ALL,
        scope: ScopeRule::Anywhere,
    },
    Rule {
        role: Role::StoreManager,
        actions: &[
            Action::ViewInventory,
            Action::UpsertInventory,
            Action::AdjustInventory,
            Action::DeleteInventory,
            Action::CreateSale,
            Action::ViewSales,
            Action::DeleteSale,
            Action::ViewPromotions,
            Action::ViewUsers,
            Action::ViewWorkLogs,
        ],
        scope: ScopeRule::HomeStore,
    },
    Rule {
        role: Role::StoreManager,
        actions: &[Action::ManagePromotion],
        scope: ScopeRule::HomeStoreOrOwnSystemWide,
    },
    Rule {
        role: Role::StoreManager,
        actions: &[Action::ViewCatalog, Action::ManageProduct],
        scope: ScopeRule::Anywhere,
    },
    Rule {
        role: Role::StoreManager,
        actions: &[Action::CreateUser, Action::AssignRole, Action::DeleteUser],
        scope: ScopeRule::StoreCashiers,
    },
    Rule {
        role: Role::StoreManager,
        actions: &[Action::UpdateUser],
        scope: ScopeRule::SelfOrStoreCashiers,
    },
    Rule {
        role: Role::Cashier,
        actions: &[
            Action::ViewInventory,
            Action::UpsertInventory,
            Action::CreateSale,
            Action::ViewPromotions,
        ],
        scope: ScopeRule::HomeStore,
    },
    Rule {
        role: Role::Cashier,
        actions: &[
            Action::ViewSales,
            Action::DeleteSale,
            Action::ViewUsers,
            Action::UpdateUser,
            Action::ViewWorkLogs,
        ],
        scope: ScopeRule::OwnRecords,
    },
    Rule {
        role: Role::Cashier,
        actions: &[Action::ViewCatalog],
        scope: ScopeRule::Anywhere,
    },
];

/// Evaluates the policy table.
pub fn authorize(actor: &Actor, action: Action, scope: &ResourceScope) -> Decision {
    if action == Action::ManagePermissions
        && scope.target_role == Some(Role::SystemAdmin)
        && scope.feature == Some(Feature::PermissionManagement)
    {
        return Decision::Deny(DenyReason::new(
            "admin-lockout",
            "system admins cannot change their own permission management rights",
        ));
    }

    let rule = POLICY
        .iter()
        .find(|r| r.role == actor.role && r.actions.contains(&action));

    match rule {
        Some(rule) => evaluate_scope(actor, rule.scope, scope),
        None => Decision::Deny(DenyReason::new(
            "no-grant",
            format!("{} may not {}", actor.role, action),
        )),
    }
}

fn evaluate_scope(actor: &Actor, rule: ScopeRule, scope: &ResourceScope) -> Decision {
    match rule {
        ScopeRule::Anywhere => Decision::Allow(ScopeFilter::Unrestricted),
        ScopeRule::HomeStore => home_store(actor, scope.store_id),
        ScopeRule::HomeStoreOrOwnSystemWide => match scope.store_id {
            Some(store_id) => home_store(actor, Some(store_id)),
            None if scope.owner_id == Some(actor.user_id) => match actor.home_store_id {
                Some(home) => Decision::Allow(ScopeFilter::Store(home)),
                None => unassigned(),
            },
            None => Decision::Deny(DenyReason::new(
                "system-wide-creator",
                "system-wide records can only be changed by their creator or a system admin",
            )),
        },
        ScopeRule::OwnRecords => match scope.owner_id {
            None => Decision::Allow(ScopeFilter::OwnRecords(actor.user_id)),
            Some(owner) if owner == actor.user_id => {
                Decision::Allow(ScopeFilter::OwnRecords(actor.user_id))
            }
            Some(_) => Decision::Deny(DenyReason::new(
                "own-records",
                format!("{} may only act on their own records", actor.role),
            )),
        },
        ScopeRule::StoreCashiers => store_cashiers(actor, scope),
        ScopeRule::SelfOrStoreCashiers => {
            if scope.owner_id == Some(actor.user_id) {
                Decision::Allow(ScopeFilter::OwnRecords(actor.user_id))
            } else {
                store_cashiers(actor, scope)
            }
        }
    }
}

fn home_store(actor: &Actor, store_id: Option<i64>) -> Decision {
    let Some(home) = actor.home_store_id else {
        return unassigned();
    };

    match store_id {
        None => Decision::Allow(ScopeFilter::Store(home)),
        Some(store_id) if store_id == home => Decision::Allow(ScopeFilter::Store(home)),
        Some(store_id) => Decision::Deny(DenyReason::new(
            "home-store",
            format!(
                "{} of store {} cannot act on store {}",
                actor.role, home, store_id
            ),
        )),
    }
}

fn store_cashiers(actor: &Actor, scope: &ResourceScope) -> Decision {
    let Some(home) = actor.home_store_id else {
        return unassigned();
    };

    if scope.target_role != Some(Role::Cashier) {
        return Decision::Deny(DenyReason::new(
            "store-cashiers",
            "store managers can only manage cashier accounts",
        ));
    }

    match scope.store_id {
        Some(store_id) if store_id == home => Decision::Allow(ScopeFilter::Store(home)),
        _ => Decision::Deny(DenyReason::new(
            "store-cashiers",
            format!("store managers can only manage cashiers of store {}", home),
        )),
    }
}

fn unassigned() -> Decision {
    Decision::Deny(DenyReason::new(
        "unassigned",
        "account is not assigned to a store",
    ))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> Actor {
        Actor::new(1, Role::SystemAdmin, None)
    }

    fn manager_of(store: i64) -> Actor {
        Actor::new(20 + store, Role::StoreManager, Some(store))
    }

    fn cashier_of(store: i64) -> Actor {
        Actor::new(30 + store, Role::Cashier, Some(store))
    }

    fn denied_by(decision: Decision) -> &'static str {
        match decision {
            Decision::Deny(reason) => reason.rule,
            Decision::Allow(filter) => panic!("expected deny, got {:?}", filter),
        }
    }

    #[test]
    fn test_admin_is_unrestricted() {
        for &action in Action::ALL {
            let decision = authorize(&admin(), action, &ResourceScope::store(5));
            assert_eq!(decision, Decision::Allow(ScopeFilter::Unrestricted), "{}", action);
        }
    }

    #[test]
    fn test_admin_cannot_revoke_own_permission_management() {
        let scope = ResourceScope::any()
            .targeting(Role::SystemAdmin)
            .feature(Feature::PermissionManagement);
        assert_eq!(denied_by(authorize(&admin(), Action::ManagePermissions, &scope)), "admin-lockout");

        let scope = ResourceScope::any()
            .targeting(Role::StoreManager)
            .feature(Feature::PermissionManagement);
        assert!(authorize(&admin(), Action::ManagePermissions, &scope).is_allowed());
    }

    #[test]
    fn test_manager_sale_scope() {
        let manager = manager_of(2);

        let decision = authorize(&manager, Action::CreateSale, &ResourceScope::store(1));
        assert_eq!(denied_by(decision), "home-store");

        let decision = authorize(&manager, Action::CreateSale, &ResourceScope::store(2));
        assert_eq!(decision, Decision::Allow(ScopeFilter::Store(2)));
    }

    #[test]
    fn test_manager_listing_is_narrowed_to_home_store() {
        let decision = authorize(&manager_of(3), Action::ViewSales, &ResourceScope::any());
        assert_eq!(decision, Decision::Allow(ScopeFilter::Store(3)));
    }

    #[test]
    fn test_manager_cannot_touch_stores_categories_or_permissions() {
        let manager = manager_of(2);
        for action in [
            Action::ManageStore,
            Action::ManageCategory,
            Action::ManageSupplier,
            Action::DeleteProduct,
            Action::ManagePermissions,
        ] {
            assert_eq!(
                denied_by(authorize(&manager, action, &ResourceScope::store(2))),
                "no-grant"
            );
        }
    }

    #[test]
    fn test_manager_promotion_scope() {
        let manager = manager_of(2);

        let own_store = ResourceScope::store(2);
        assert!(authorize(&manager, Action::ManagePromotion, &own_store).is_allowed());

        let other_store = ResourceScope::store(1);
        assert!(!authorize(&manager, Action::ManagePromotion, &other_store).is_allowed());

        let own_system_wide = ResourceScope::any().owned_by(manager.user_id);
        assert!(authorize(&manager, Action::ManagePromotion, &own_system_wide).is_allowed());

        let foreign_system_wide = ResourceScope::any().owned_by(1);
        assert_eq!(
            denied_by(authorize(&manager, Action::ManagePromotion, &foreign_system_wide)),
            "system-wide-creator"
        );
    }

    #[test]
    fn test_manager_user_management() {
        let manager = manager_of(2);

        let cashier_here = ResourceScope::store(2).targeting(Role::Cashier);
        assert!(authorize(&manager, Action::CreateUser, &cashier_here).is_allowed());
        assert!(authorize(&manager, Action::DeleteUser, &cashier_here).is_allowed());

        let manager_here = ResourceScope::store(2).targeting(Role::StoreManager);
        assert_eq!(
            denied_by(authorize(&manager, Action::CreateUser, &manager_here)),
            "store-cashiers"
        );

        let admin_account = ResourceScope::store(1).targeting(Role::SystemAdmin);
        assert!(!authorize(&manager, Action::DeleteUser, &admin_account).is_allowed());

        let cashier_elsewhere = ResourceScope::store(1).targeting(Role::Cashier);
        assert!(!authorize(&manager, Action::CreateUser, &cashier_elsewhere).is_allowed());
    }

    #[test]
    fn test_manager_may_update_self_but_not_peers() {
        let manager = manager_of(2);

        let self_scope = ResourceScope::store(2)
            .owned_by(manager.user_id)
            .targeting(Role::StoreManager);
        assert!(authorize(&manager, Action::UpdateUser, &self_scope).is_allowed());

        let peer = ResourceScope::store(2).owned_by(99).targeting(Role::StoreManager);
        assert!(!authorize(&manager, Action::UpdateUser, &peer).is_allowed());
    }

    #[test]
    fn test_cashier_own_records() {
        let cashier = cashier_of(2);

        let own_sale = ResourceScope::store(2).owned_by(cashier.user_id);
        assert_eq!(
            authorize(&cashier, Action::DeleteSale, &own_sale),
            Decision::Allow(ScopeFilter::OwnRecords(cashier.user_id))
        );

        let other_sale = ResourceScope::store(2).owned_by(cashier.user_id + 1);
        assert_eq!(
            denied_by(authorize(&cashier, Action::DeleteSale, &other_sale)),
            "own-records"
        );

        assert_eq!(
            authorize(&cashier, Action::ViewSales, &ResourceScope::any()),
            Decision::Allow(ScopeFilter::OwnRecords(cashier.user_id))
        );
    }

    #[test]
    fn test_cashier_operates_only_in_home_store() {
        let cashier = cashier_of(2);

        assert!(authorize(&cashier, Action::CreateSale, &ResourceScope::store(2)).is_allowed());
        assert!(!authorize(&cashier, Action::CreateSale, &ResourceScope::store(1)).is_allowed());
        assert!(authorize(&cashier, Action::ViewInventory, &ResourceScope::store(2)).is_allowed());
        assert_eq!(
            denied_by(authorize(&cashier, Action::DeleteInventory, &ResourceScope::store(2))),
            "no-grant"
        );
        assert_eq!(
            denied_by(authorize(
                &cashier,
                Action::CreateUser,
                &ResourceScope::store(2).targeting(Role::Cashier)
            )),
            "no-grant"
        );
        assert!(!authorize(&cashier, Action::ManagePromotion, &ResourceScope::store(2)).is_allowed());
    }

    #[test]
    fn test_unassigned_accounts_are_denied_store_actions() {
        let floating = Actor::new(50, Role::Cashier, None);

        assert_eq!(
            denied_by(authorize(&floating, Action::CreateSale, &ResourceScope::store(1))),
            "unassigned"
        );
        assert!(authorize(&floating, Action::ViewCatalog, &ResourceScope::any()).is_allowed());
    }

    #[test]
    fn test_deny_maps_to_forbidden() {
        let err = authorize(&cashier_of(1), Action::ManageStore, &ResourceScope::any())
            .into_result()
            .unwrap_err();
        assert_eq!(err.to_string(), "Forbidden: cashier may not manage_store");
    }

    #[test]
    fn test_requested_store_narrows_unrestricted_only() {
        assert_eq!(
            ScopeFilter::Unrestricted.with_requested_store(Some(2)),
            ScopeFilter::Store(2)
        );
        assert_eq!(
            ScopeFilter::OwnRecords(5).with_requested_store(Some(2)),
            ScopeFilter::OwnRecords(5)
        );
        assert_eq!(ScopeFilter::Unrestricted.with_requested_store(None), ScopeFilter::Unrestricted);
    }
}
