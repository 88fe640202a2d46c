//! # Validation Module
//!
//! Caller-level input checks for booking requests and ledger operations.
//!
//! These run before any lock is taken or row is touched. A failure here is
//! a caller error (`ValidationError`), never a ledger or inventory fault.
//!
//! ## Usage
//! ```rust
//! use marquee_core::money::Money;
//! use marquee_core::validation::validate_amount;
//!
//! let cap = Money::from_cents(10_000_000);
//! assert!(validate_amount("amount", Money::from_cents(500), cap).is_ok());
//! assert!(validate_amount("amount", Money::zero(), cap).is_err());
//! ```

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::money::Money;
use crate::pricing::TicketType;
use crate::VERIFICATION_CODE_LEN;

pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Identifiers
// =============================================================================

/// Rejects empty or whitespace-only identifiers.
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Amounts
// =============================================================================

/// Amount must be > 0 and <= `cap`.
pub fn validate_amount(field: &str, amount: Money, cap: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    if amount > cap {
        return Err(ValidationError::LimitExceeded {
            field: field.to_string(),
            limit: cap,
        });
    }
    Ok(())
}

/// Large-amount policy.
///
/// ## Rules
/// - `|amount| <= threshold`: no code needed, any supplied code is ignored
/// - `|amount| > threshold`: a code of exactly 6 ASCII letters/digits is required
///
/// ## Example
/// ```rust
/// use marquee_core::money::Money;
/// use marquee_core::validation::validate_verification;
///
/// let threshold = Money::from_cents(1_000_000);
/// assert!(validate_verification(Money::from_cents(500), threshold, None).is_ok());
/// assert!(validate_verification(Money::from_cents(2_000_000), threshold, None).is_err());
/// assert!(validate_verification(Money::from_cents(2_000_000), threshold, Some("A1B2C3")).is_ok());
/// ```
pub fn validate_verification(
    amount: Money,
    threshold: Money,
    code: Option<&str>,
) -> ValidationResult<()> {
    if amount.abs() <= threshold {
        return Ok(());
    }

    let code = code.map(str::trim).filter(|c| !c.is_empty()).ok_or_else(|| {
        ValidationError::Required {
            field: "verification_code".to_string(),
        }
    })?;

    if code.len() != VERIFICATION_CODE_LEN || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidFormat {
            field: "verification_code".to_string(),
            reason: format!("must be {VERIFICATION_CODE_LEN} letters or digits"),
        });
    }

    Ok(())
}

// =============================================================================
// Booking Requests
// =============================================================================

/// Checks the seat list and the parallel ticket-type list.
///
/// ## Rules
/// - between 1 and `max_seats` seats
/// - one ticket type per seat (1:1)
/// - no seat listed twice
pub fn validate_seat_selection(
    seat_ids: &[String],
    ticket_types: &[TicketType],
    max_seats: usize,
) -> ValidationResult<()> {
    if seat_ids.is_empty() || seat_ids.len() > max_seats {
        return Err(ValidationError::CountOutOfRange {
            field: "seat_ids".to_string(),
            min: 1,
            max: max_seats,
        });
    }

    if ticket_types.len() != seat_ids.len() {
        return Err(ValidationError::LengthMismatch {
            field: "ticket_types".to_string(),
            expected: seat_ids.len(),
            actual: ticket_types.len(),
        });
    }

    validate_seat_ids(seat_ids)
}

/// Every seat id well formed and listed once.
pub fn validate_seat_ids(seat_ids: &[String]) -> ValidationResult<()> {
    let mut seen = HashSet::with_capacity(seat_ids.len());
    for id in seat_ids {
        validate_id("seat_id", id)?;
        if !seen.insert(id.as_str()) {
            return Err(ValidationError::Duplicate {
                field: "seat_id".to_string(),
                value: id.clone(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
