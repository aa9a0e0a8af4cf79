//! # Retail Back Office
//!
//! Application services for a multi-store retail chain: every operation
//! takes an authenticated [`Actor`], asks the Authorization Evaluator,
//! and runs its storage steps inside one transaction.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Back Office Services                             │
//! │                                                                         │
//! │  token ──► AuthService::authenticate ──► Actor                          │
//! │                                            │                            │
//! │  ┌────────────────┐  ┌────────────────┐  ┌─▼──────────────────────────┐ │
//! │  │  SaleService   │  │ InventoryServ. │  │  DeletionGuard             │ │
//! │  │ • create_sale  │  │ • list (priced)│  │ • lock ─► count ─► delete  │ │
//! │  │ • delete_sale  │  │ • upsert/adjust│  │   or Conflict              │ │
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘ │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐ │
//! │  │PromotionServ.  │  │ CatalogService │  │  UserService, Permission-  │ │
//! │  │                │  │                │  │  Service, WorkLogService   │ │
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘ │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐   │
//! │  │  AppState: Database (retail-db) • JwtManager • Clock • Config    │   │
//! │  └──────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! See [`config`]. The only required setting is `auth.jwt_secret`
//! (`RETAIL_AUTH__JWT_SECRET`).

pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod services;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

// Re-exports
pub use config::BackofficeConfig;
pub use error::{ErrorBody, ErrorKind, ServiceError, ServiceResult};
pub use retail_core::Actor;

use auth::JwtManager;
use retail_core::Clock;
use retail_db::Database;

/// Shared application state.
pub struct AppState {
    pub db: Database,
    pub jwt: JwtManager,
    pub clock: Arc<dyn Clock>,
    pub config: BackofficeConfig,
}

impl AppState {
    pub fn new(db: Database, config: BackofficeConfig, clock: Arc<dyn Clock>) -> Self {
        let jwt = JwtManager::new(
            config.auth.jwt_secret.clone(),
            config.auth.access_lifetime_secs,
        );

        AppState {
            db,
            jwt,
            clock,
            config,
        }
    }
}
