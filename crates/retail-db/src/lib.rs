//! # retail-db: Database Layer for the Retail Back Office
//!
//! SQLite persistence with sqlx: connection pool, embedded migrations and one
//! repository per table group. The Inventory Ledger lives here because its
//! non-negative guarantee is a property of the storage statement itself.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Retail Back Office Data Flow                        │
//! │                                                                         │
//! │  backoffice service (SaleService::create_sale)                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                     retail-db (THIS CRATE)                      │    │
//! │  │                                                                 │    │
//! │  │   ┌───────────────┐    ┌───────────────────┐  ┌──────────────┐  │    │
//! │  │   │   Database    │    │   Repositories    │  │  Migrations  │  │    │
//! │  │   │   (pool.rs)   │    │                   │  │  (embedded)  │  │    │
//! │  │   │               │    │ InventoryRepo     │  │              │  │    │
//! │  │   │ SqlitePool    │◄───│ SaleRepo          │  │ 001_init.sql │  │    │
//! │  │   │ begin() → tx  │    │ DependentsRepo    │  │ 002_perms    │  │    │
//! │  │   └───────────────┘    │ ...               │  └──────────────┘  │    │
//! │  │                        └───────────────────┘                    │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database (WAL)                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Two Kinds of Repository Method
//!
//! - `&self` methods run one statement (or a read) on the pool.
//! - `*_in(conn, ..)` associated functions run on a caller-supplied
//!   connection, normally `&mut *tx` of an open transaction, so several of
//!   them commit or roll back together.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use retail_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./backoffice.db")).await?;
//! let on_hand = db.inventory().get(product_id, store_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::{
    CategoryRepository, DependentsRepository, InventoryListing, InventoryRepository,
    PermissionRepository, ProductRepository, PromotionRepository, SaleRepository,
    StoreRepository, SupplierRepository, UserChanges, UserCredentials, UserRepository,
    WorkLogRepository,
};

#[cfg(test)]
pub(crate) mod test_support;
