//! # Error Types
//!
//! Domain-specific error types for caja-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  caja-core errors (this file)                                          │
//! │  ├── ValidationError  - malformed input, rejected before a transaction │
//! │  └── CoreError        - precondition violations inside a transaction   │
//! │                                                                         │
//! │  caja-db errors (separate crate)                                       │
//! │  └── DbError          - store failures, conflicts, exhausted retries   │
//! │                                                                         │
//! │  App errors                                                            │
//! │  └── ApiError         - what the UI sees (code + message)              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → UI           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Ledger rule violations and domain failures.
///
/// A plan function returning one of these aborts its transaction; nothing
/// is written.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// A record the operation depends on does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A record with the same key already exists.
    #[error("{entity} '{id}' already exists")]
    Duplicate { entity: String, id: String },

    /// A stock movement would leave the item below zero.
    #[error("Stock for {code} cannot go negative: on hand {on_hand}, change {delta}")]
    NegativeStock {
        code: String,
        on_hand: i64,
        delta: i64,
    },

    /// A sale line asks for more than is on hand.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout (qty: 5)
    ///      │
    ///      ▼
    /// Fresh read inside the transaction: on hand = 3
    ///      │
    ///      ▼
    /// InsufficientStock { code: "COKE", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// UI shows: "Only 3 COKE in stock", nothing was written
    /// ```
    #[error("Insufficient stock for {code}: available {available}, requested {requested}")]
    InsufficientStock {
        code: String,
        available: i64,
        requested: i64,
    },

    /// A withdrawal or payout exceeds the funds of its source.
    #[error("Insufficient {source_name}: available {available_cents} cents, requested {requested_cents} cents")]
    InsufficientFunds {
        source_name: String,
        available_cents: i64,
        requested_cents: i64,
    },

    /// Payment amount is zero, negative, or above the balance.
    #[error("Invalid payment amount: {reason}")]
    InvalidPaymentAmount { reason: String },

    /// The record is already settled and accepts no more payments.
    #[error("{entity} {id} is already settled")]
    AlreadySettled { entity: String, id: String },

    /// Cart empty, client missing, or otherwise unusable sale request.
    #[error("Invalid sale request: {reason}")]
    InvalidSaleRequest { reason: String },

    /// `set_initial` on an account that already holds money.
    #[error("Cash account is already initialized; use an explicit reset")]
    AlreadyInitialized,

    /// Stored records contradict each other.
    #[error("Inconsistent record: {reason}")]
    Inconsistent { reason: String },

    /// A plan touched a key that was not part of its read set.
    #[error("Key {key} was not part of the transaction read set")]
    NotInReadSet { key: String },

    /// A stored body could not be decoded or encoded.
    #[error("Document {key} is malformed: {reason}")]
    MalformedDocument { key: String, reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and id.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a Duplicate error.
    pub fn duplicate(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::Duplicate {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates an InvalidPaymentAmount error.
    pub fn invalid_payment(reason: impl Into<String>) -> Self {
        CoreError::InvalidPaymentAmount {
            reason: reason.into(),
        }
    }

    /// Creates an InvalidSaleRequest error.
    pub fn invalid_sale(reason: impl Into<String>) -> Self {
        CoreError::InvalidSaleRequest {
            reason: reason.into(),
        }
    }

    /// True for malformed input that never reaches the store.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CoreError::Validation(_) | CoreError::InvalidSaleRequest { .. }
        )
    }

    /// True for business rules checked against freshly read state.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            CoreError::NegativeStock { .. }
                | CoreError::InsufficientStock { .. }
                | CoreError::InsufficientFunds { .. }
                | CoreError::InvalidPaymentAmount { .. }
                | CoreError::AlreadySettled { .. }
                | CoreError::AlreadyInitialized
                | CoreError::NotFound { .. }
                | CoreError::Duplicate { .. }
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before a transaction starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, bad characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
