//! # Error Types
//!
//! Domain-specific error types for retail-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  retail-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations, authorization denial │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  retail-db errors (separate crate)                                     │
//! │  └── DbError          - Storage failures, ledger rejections            │
//! │                                                                         │
//! │  backoffice errors (app)                                               │
//! │  └── ServiceError     - What callers see (kind + message)              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ─┐                                  │
//! │                         DbError ────┴─► ServiceError → caller          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::authz::DenyReason;
use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The Authorization Evaluator denied the action.
    ///
    /// ## When This Occurs
    /// - A store manager acts on another store
    /// - A cashier touches someone else's sale
    /// - Anyone but a system admin manages stores or permissions
    #[error("Forbidden: {0}")]
    Forbidden(DenyReason),

    /// A sale was submitted without lines.
    #[error("A sale must contain at least one item")]
    EmptySale,

    /// A submitted unit price is too far from the server-side price.
    ///
    /// ## When This Occurs
    /// Only when price re-validation is configured with a tolerance.
    /// ```text
    /// POS submits 4.00 for product 7
    ///      │
    ///      ▼
    /// Effective price (after promotions) = 5.99, tolerance 0.05
    ///      │
    ///      ▼
    /// PriceMismatch { product_id: 7, submitted: 4.00, expected: 5.99 }
    /// ```
    #[error("Price {submitted} for product {product_id} does not match current price {expected}")]
    PriceMismatch {
        product_id: i64,
        submitted: Money,
        expected: Money,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl From<DenyReason> for CoreError {
    fn from(reason: DenyReason) -> Self {
        CoreError::Forbidden(reason)
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before any storage is touched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or more.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., bad SKU characters, unparseable amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// A date range ends before it starts.
    #[error("start_date {start} is after end_date {end}")]
    InvalidDateRange { start: String, end: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::PriceMismatch {
            product_id: 7,
            submitted: Money::from_cents(400),
            expected: Money::from_cents(599),
        };
        assert_eq!(
            err.to_string(),
            "Price 4.00 for product 7 does not match current price 5.99"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "sku".to_string(),
        };
        assert_eq!(err.to_string(), "sku is required");

        let err = ValidationError::MustNotBeNegative {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must not be negative");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }

    #[test]
    fn test_deny_reason_converts_to_forbidden() {
        let core_err: CoreError = DenyReason::new("no-grant", "cashiers cannot delete inventory").into();
        assert_eq!(
            core_err.to_string(),
            "Forbidden: cashiers cannot delete inventory"
        );
    }
}
