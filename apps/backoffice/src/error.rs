//! # Service Error Type
//!
//! The fixed set of failures callers of the back office services see.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Decision::Deny ──► CoreError::Forbidden ──┐                            │
//! │  ValidationError ─► CoreError::Validation ─┤                            │
//! │                                            ├──► ServiceError ──► body() │
//! │  DbError::InsufficientStock ───────────────┤       kind + message       │
//! │  DbError::UniqueViolation ─────────────────┤                            │
//! │  DbError::QueryFailed (logged) ────────────┘                            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Storage failure detail is logged here and never returned to the caller.

use serde::Serialize;
use tracing::error;

use retail_core::{CoreError, DependentCounts, EntityKind, ValidationError};
use retail_db::DbError;

/// Back office service errors.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Missing, expired or garbled credential, or a failed login.
    #[error("Authentication failed: {0}")]
    Unauthenticated(String),

    /// The Authorization Evaluator denied the action. Nothing was applied.
    #[error("Forbidden: {message}")]
    Forbidden { rule: &'static str, message: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Malformed input, out-of-range values, or a reference to a row that
    /// does not exist.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// A sale line (or a manual adjustment) needs more stock than the store
    /// holds. Nothing was written.
    ///
    /// ## When This Occurs
    /// ```text
    /// Sale line 2: product 7 × 5 in store 3
    ///      │
    ///      ▼
    /// Ledger: quantity 4, 4 - 5 < 0 → rejected
    ///      │
    ///      ▼
    /// InsufficientStock { line: Some(2), product_id: 7, available: 4, requested: 5 }
    /// ```
    #[error("{}", insufficient_stock_message(*line, *product_id, *store_id, *available, *requested))]
    InsufficientStock {
        line: Option<usize>,
        product_id: i64,
        store_id: i64,
        available: i64,
        requested: i64,
    },

    /// A guarded delete found dependent rows. Nothing was deleted.
    #[error("Cannot delete {entity} {id}: still referenced by {counts}")]
    Conflict {
        entity: EntityKind,
        id: i64,
        counts: DependentCounts,
    },

    /// The database failed. The in-flight transaction was rolled back.
    #[error("Storage failure: {0}")]
    StorageFailure(String),
}

fn insufficient_stock_message(
    line: Option<usize>,
    product_id: i64,
    store_id: i64,
    available: i64,
    requested: i64,
) -> String {
    let prefix = match line {
        Some(index) => format!("Line {}: insufficient", index),
        None => "Insufficient".to_string(),
    };
    format!(
        "{} stock for product {} in store {}: {} available, {} requested",
        prefix, product_id, store_id, available, requested
    )
}

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Unauthenticated,
    Forbidden,
    NotFound,
    BadRequest,
    InsufficientStock,
    Conflict,
    StorageFailure,
}

/// What a transport layer sends back:
///
/// ```json
/// { "code": "INSUFFICIENT_STOCK", "message": "Line 0: insufficient stock ..." }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: ErrorKind,
    pub message: String,
}

impl ServiceError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        ServiceError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ServiceError::BadRequest(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Unauthenticated(_) => ErrorKind::Unauthenticated,
            ServiceError::Forbidden { .. } => ErrorKind::Forbidden,
            ServiceError::NotFound { .. } => ErrorKind::NotFound,
            ServiceError::BadRequest(_) => ErrorKind::BadRequest,
            ServiceError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            ServiceError::Conflict { .. } => ErrorKind::Conflict,
            ServiceError::StorageFailure(_) => ErrorKind::StorageFailure,
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            code: self.kind(),
            message: self.to_string(),
        }
    }
}

/// Converts database errors to service errors.
impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ServiceError::NotFound { entity, id },
            DbError::InsufficientStock {
                product_id,
                store_id,
                available,
                requested,
            } => ServiceError::InsufficientStock {
                line: None,
                product_id,
                store_id,
                available,
                requested,
            },
            DbError::UniqueViolation { field } => {
                ServiceError::BadRequest(format!("{} already exists", field))
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::warn!(%message, "Foreign key violation");
                ServiceError::BadRequest("Invalid reference".to_string())
            }
            DbError::CheckViolation { message } => {
                ServiceError::BadRequest(format!("Value out of range: {}", message))
            }
            other => {
                error!(error = %other, "Storage failure");
                ServiceError::StorageFailure("Database operation failed".to_string())
            }
        }
    }
}

/// Converts core errors to service errors.
impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Forbidden(reason) => ServiceError::Forbidden {
                rule: reason.rule,
                message: reason.message,
            },
            other => ServiceError::BadRequest(other.to_string()),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::BadRequest(err.to_string())
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        DbError::from(err).into()
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
