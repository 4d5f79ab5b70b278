//! # API Error Type
//!
//! Unified error type for commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Caja POS                               │
//! │                                                                         │
//! │  Command Function                                                       │
//! │  Result<T, ApiError>                                                    │
//! │         │                                                               │
//! │         ├── ValidationError ──► VALIDATION_ERROR  (nothing was read)   │
//! │         ├── CoreError        ──► INSUFFICIENT_STOCK, INSUFFICIENT_FUNDS │
//! │         │                        PAYMENT_ERROR, ALREADY_SETTLED, ...   │
//! │         ├── RetriesExhausted ──► CONFLICT          (try again)         │
//! │         └── store failure    ──► DATABASE_ERROR    (details logged)    │
//! │                   │                                                     │
//! │                   ▼                                                     │
//! │  Action::Failed(ApiError) ──► AppState.last_error                      │
//! │                                                                         │
//! │  Every failure leaves the ledger unchanged.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use caja_core::{CoreError, ValidationError};
use caja_db::DbError;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::config::ConfigError;

/// API error returned from commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "INSUFFICIENT_FUNDS",
///   "message": "Insufficient profit: available 1200 cents, requested 2000 cents"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Record not found
    NotFound,

    /// Input validation failed; rejected before any transaction
    ValidationError,

    /// Not enough units on hand
    InsufficientStock,

    /// Not enough capital, profit or initial capital
    InsufficientFunds,

    /// Payment amount rejected
    PaymentError,

    /// Payment on a settled record
    AlreadySettled,

    /// Any other ledger rule
    BusinessLogic,

    /// Gave up after repeated concurrent writes
    Conflict,

    /// Store operation failed
    DatabaseError,

    /// Cart operation failed
    CartError,

    /// Configuration could not be loaded
    ConfigError,

    /// Internal error
    Internal,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    /// Creates a cart error.
    pub fn cart(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::CartError, message)
    }
}

/// Converts store errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Rejected(core) => ApiError::from(core),
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::RetriesExhausted { attempts } => {
                tracing::warn!(attempts, "Transaction retries exhausted");
                ApiError::new(
                    ErrorCode::Conflict,
                    "The ledger is busy with other changes. Please try again.",
                )
            }
            DbError::Conflict(e) => {
                tracing::warn!("Unretried write conflict: {}", e);
                ApiError::new(
                    ErrorCode::Conflict,
                    "The ledger changed while saving. Please try again.",
                )
            }
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal store error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts ledger errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::NotFound { .. } => ErrorCode::NotFound,
            CoreError::InsufficientStock { .. } | CoreError::NegativeStock { .. } => {
                ErrorCode::InsufficientStock
            }
            CoreError::InsufficientFunds { .. } => ErrorCode::InsufficientFunds,
            CoreError::InvalidPaymentAmount { .. } => ErrorCode::PaymentError,
            CoreError::AlreadySettled { .. } => ErrorCode::AlreadySettled,
            CoreError::Validation(_) | CoreError::InvalidSaleRequest { .. } => {
                ErrorCode::ValidationError
            }
            CoreError::Duplicate { .. } | CoreError::AlreadyInitialized => ErrorCode::BusinessLogic,
            CoreError::Inconsistent { .. }
            | CoreError::NotInReadSet { .. }
            | CoreError::MalformedDocument { .. } => {
                tracing::error!(error = %err, "Ledger invariant violated");
                ErrorCode::Internal
            }
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::new(ErrorCode::ConfigError, err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
