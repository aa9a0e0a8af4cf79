//! # retail-core: Pure Business Logic for the Retail Back Office
//!
//! This crate holds the rules of the multi-store back office as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Retail Back Office Architecture                     │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                apps/backoffice (services)                       │   │
//! │  │   SaleService, DeletionGuard, InventoryService, ...             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ retail-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   authz   │  │  pricing  │  │   money   │  │ validation│  │   │
//! │  │   │  policy   │  │ effective │  │   Money   │  │   rules   │  │   │
//! │  │   │  table    │  │   price   │  │  (cents)  │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  retail-db (Database Layer)                     │   │
//! │  │        SQLite queries, migrations, Inventory Ledger             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Store, User, Product, Sale, Promotion, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`authz`] - Authorization Evaluator: role × action × scope policy table
//! - [`pricing`] - Pricing Engine: promotion-adjusted prices
//! - [`clock`] - Injectable time source
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use retail_core::money::Money;
//! use retail_core::pricing::{effective_price, Discount};
//!
//! let base = Money::from_cents(10000); // 100.00
//! let priced = effective_price(base, &[(7, Discount::percentage_bps(2000))]);
//!
//! assert_eq!(priced.price.cents(), 8000); // 80.00
//! assert!(priced.has_promotion());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod authz;
pub mod clock;
pub mod error;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use authz::{authorize, Action, Decision, DenyReason, ResourceScope, ScopeFilter};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pricing::{effective_price, Discount, PricedAmount};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Store id of the head office.
///
/// System administrators are always attached to this store, whatever their
/// account row says.
pub const HEAD_OFFICE_STORE_ID: i64 = 1;
