//! # Repository Module
//!
//! Database repository implementations.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Service                                                                │
//! │       │  db.inventory().get(product_id, store_id)                       │
//! │       │  InventoryRepository::adjust_in(&mut tx, ..)                    │
//! │       ▼                                                                 │
//! │  InventoryRepository                                                    │
//! │  ├── get / list / upsert / delete        (pool)                         │
//! │  └── adjust_in / get_in                  (transaction)                  │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`StoreRepository`], [`CategoryRepository`], [`SupplierRepository`],
//!   [`ProductRepository`] - catalog CRUD
//! - [`UserRepository`] - accounts and credentials
//! - [`InventoryRepository`] - the Inventory Ledger
//! - [`PromotionRepository`] - promotions and their product links
//! - [`SaleRepository`] - sale headers and line items
//! - [`WorkLogRepository`] - append-only audit entries
//! - [`PermissionRepository`] - feature permission matrix
//! - [`DependentsRepository`] - dependent-row counting for guarded deletes

pub mod category;
pub mod dependents;
pub mod inventory;
pub mod permission;
pub mod product;
pub mod promotion;
pub mod sale;
pub mod store;
pub mod supplier;
pub mod user;
pub mod work_log;

pub use category::CategoryRepository;
pub use dependents::DependentsRepository;
pub use inventory::{InventoryListing, InventoryRepository};
pub use permission::PermissionRepository;
pub use product::ProductRepository;
pub use promotion::PromotionRepository;
pub use sale::SaleRepository;
pub use store::StoreRepository;
pub use supplier::SupplierRepository;
pub use user::{UserChanges, UserCredentials, UserRepository};
pub use work_log::WorkLogRepository;

use retail_core::ScopeFilter;

/// Splits a scope filter into `(store_id, owner_id)` bind values for
/// `(?1 IS NULL OR store_col = ?1) AND (?2 IS NULL OR owner_col = ?2)`.
pub(crate) fn filter_binds(filter: ScopeFilter) -> (Option<i64>, Option<i64>) {
    match filter {
        ScopeFilter::Unrestricted => (None, None),
        ScopeFilter::Store(store_id) => (Some(store_id), None),
        ScopeFilter::OwnRecords(user_id) => (None, Some(user_id)),
    }
}
