//! # Validation Module
//!
//! Input validation run before any transaction starts.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Command / UI                                                 │
//! │  └── THIS MODULE: shape of the input (empty, length, ranges)           │
//! │           │  ValidationError, no store access                           │
//! │           ▼                                                             │
//! │  Layer 2: Plan functions (ledger/*)                                    │
//! │  └── Preconditions against freshly read records                        │
//! │           │  CoreError, transaction aborted                             │
//! │           ▼                                                             │
//! │  Layer 3: Store commit                                                 │
//! │  └── Version check; Conflict on concurrent writes                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use caja_core::validation::{validate_item_code, validate_quantity};
//!
//! assert!(validate_item_code("COKE-330").is_ok());
//! assert!(validate_quantity(5).is_ok());
//! ```

use crate::error::ValidationError;
use crate::{MAX_CART_LINES, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Largest margin accepted (1000%).
pub const MAX_MARGIN_BPS: u32 = 100_000;

// =============================================================================
// String Validators
// =============================================================================

/// Validates an inventory item code.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, numbers, hyphens and underscores only
///
/// ## Example
/// ```rust
/// use caja_core::validation::validate_item_code;
///
/// assert!(validate_item_code("COKE-330").is_ok());
/// assert!(validate_item_code("").is_err());
/// assert!(validate_item_code("A/B").is_err());
/// ```
pub fn validate_item_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if code.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: 50,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates an item description (1-200 characters).
pub fn validate_description(description: &str) -> ValidationResult<()> {
    validate_text("description", description, 200)
}

/// Validates a client name (1-120 characters).
pub fn validate_client_name(name: &str) -> ValidationResult<()> {
    validate_text("name", name, 120)
}

/// Validates a payable's provider and concept.
pub fn validate_payable_text(provider: &str, concept: &str) -> ValidationResult<()> {
    validate_text("provider", provider, 120)?;
    validate_text("concept", concept, 200)
}

/// Validates a record id (UUID).
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|e| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: e.to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a cart line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates an amount that must be strictly positive.
///
/// ## Example
/// ```rust
/// use caja_core::validation::validate_amount_cents;
///
/// assert!(validate_amount_cents("amount", 1).is_ok());
/// assert!(validate_amount_cents("amount", 0).is_err());
/// ```
pub fn validate_amount_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates an amount that may be zero.
pub fn validate_non_negative_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a margin in basis points.
pub fn validate_margin_bps(bps: u32) -> ValidationResult<()> {
    if bps > MAX_MARGIN_BPS {
        return Err(ValidationError::OutOfRange {
            field: "margin_bps".to_string(),
            min: 0,
            max: MAX_MARGIN_BPS as i64,
        });
    }
    Ok(())
}

/// Validates the number of distinct lines in a cart.
pub fn validate_cart_size(lines: usize) -> ValidationResult<()> {
    if lines > MAX_CART_LINES {
        return Err(ValidationError::OutOfRange {
            field: "cart lines".to_string(),
            min: 1,
            max: MAX_CART_LINES as i64,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_code() {
        assert!(validate_item_code("ABC-123_x").is_ok());
        assert!(matches!(
            validate_item_code("   "),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            validate_item_code(&"A".repeat(51)),
            Err(ValidationError::TooLong { max: 50, .. })
        ));
        assert!(matches!(
            validate_item_code("a b"),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_text_fields() {
        assert!(validate_description("Coca-Cola 330ml").is_ok());
        assert!(validate_client_name("").is_err());
        assert!(validate_client_name(&"ñ".repeat(120)).is_ok());
        assert!(validate_payable_text("Acme", "").is_err());
        assert!(validate_payable_text("Acme", "Rent").is_ok());
    }

    #[test]
    fn test_id() {
        assert!(validate_id("sale_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_id("sale_id", "").is_err());
        assert!(matches!(
            validate_id("sale_id", "not-a-uuid"),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_numeric() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(1000).is_err());

        assert!(validate_amount_cents("amount", -5).is_err());
        assert!(validate_non_negative_cents("amount", 0).is_ok());
        assert!(validate_margin_bps(MAX_MARGIN_BPS).is_ok());
        assert!(validate_margin_bps(MAX_MARGIN_BPS + 1).is_err());
        assert!(validate_cart_size(MAX_CART_LINES + 1).is_err());
    }
}
