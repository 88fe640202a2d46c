//! # Error Types
//!
//! Domain errors for marquee-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  marquee-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule violations (booking, wallet)     │
//! │  ├── ValidationError  - Caller input failures                          │
//! │  └── ErrorCode        - Stable machine-readable code per kind          │
//! │                                                                         │
//! │  marquee-db errors                                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  marquee-engine errors                                                 │
//! │  ├── EngineError      - Core + Db + Config                             │
//! │  └── ApiError         - { code, message } for callers                  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → ApiError            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::money::Money;
use crate::pricing::TicketType;
use crate::wallet::WalletStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the booking core.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Showing not found: {0}")]
    ShowingNotFound(String),

    /// Showing is FULL, CANCELLED or has already started.
    ///
    /// Raised before any mutation.
    #[error("Showing {showing_id} is not bookable: {reason}")]
    ShowingNotBookable { showing_id: String, reason: String },

    /// One or more requested seats are already booked, inactive or belong
    /// to another venue. Nothing was reserved.
    ///
    /// ## User Workflow
    /// ```text
    /// reserve(show-1, [F6, F7, F8])
    ///      │
    ///      ▼
    /// F7 already held by another booking
    ///      │
    ///      ▼
    /// SeatNotAvailable { seat_ids: ["F7"] } → caller picks other seats
    /// ```
    #[error("Seats not available for showing {showing_id}: {}", .seat_ids.join(", "))]
    SeatNotAvailable {
        showing_id: String,
        seat_ids: Vec<String>,
    },

    #[error("Member not found: {0}")]
    MemberNotFound(String),

    #[error("Member {0} is inactive")]
    MemberInactive(String),

    #[error("Member {member_id} is not eligible for {ticket_type:?} tickets")]
    TicketTypeNotEligible {
        member_id: String,
        ticket_type: TicketType,
    },

    /// The member already holds a non-cancelled booking for this showing.
    #[error("Member {member_id} already has a booking for showing {showing_id}")]
    DuplicateBooking {
        member_id: String,
        showing_id: String,
    },

    #[error("Booking not found: {0}")]
    BookingNotFound(String),

    /// Booking is not PENDING/CONFIRMED, or the showing has started.
    #[error("Booking {booking_id} cannot be cancelled: {reason}")]
    CannotCancel { booking_id: String, reason: String },

    #[error("Booking {booking_id} cannot be completed: {reason}")]
    CannotComplete { booking_id: String, reason: String },

    #[error("Wallet not found for member {0}")]
    WalletNotFound(String),

    #[error("Member {0} already has a wallet")]
    WalletAlreadyExists(String),

    #[error("Wallet of member {member_id} is {status:?}")]
    WalletInactive {
        member_id: String,
        status: WalletStatus,
    },

    #[error("Wallet status cannot change from {from:?} to {to:?}")]
    InvalidWalletTransition { from: WalletStatus, to: WalletStatus },

    /// A debit would take the balance below zero.
    #[error("Insufficient balance for member {member_id}: available {available}, requested {requested}")]
    InsufficientBalance {
        member_id: String,
        available: Money,
        requested: Money,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::ShowingNotFound(_) => ErrorCode::ShowingNotFound,
            CoreError::ShowingNotBookable { .. } => ErrorCode::ShowingNotBookable,
            CoreError::SeatNotAvailable { .. } => ErrorCode::SeatNotAvailable,
            CoreError::MemberNotFound(_) => ErrorCode::MemberNotFound,
            CoreError::MemberInactive(_) => ErrorCode::MemberInactive,
            CoreError::TicketTypeNotEligible { .. } => ErrorCode::TicketTypeNotEligible,
            CoreError::DuplicateBooking { .. } => ErrorCode::DuplicateBooking,
            CoreError::BookingNotFound(_) => ErrorCode::BookingNotFound,
            CoreError::CannotCancel { .. } => ErrorCode::CannotCancel,
            CoreError::CannotComplete { .. } => ErrorCode::CannotComplete,
            CoreError::WalletNotFound(_) => ErrorCode::WalletNotFound,
            CoreError::WalletAlreadyExists(_) => ErrorCode::WalletAlreadyExists,
            CoreError::WalletInactive { .. } => ErrorCode::WalletInactive,
            CoreError::InvalidWalletTransition { .. } => ErrorCode::InvalidWalletTransition,
            CoreError::InsufficientBalance { .. } => ErrorCode::InsufficientBalance,
            CoreError::Validation(_) => ErrorCode::ValidationError,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Caller input errors, detected before any business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} exceeds the limit of {limit}")]
    LimitExceeded { field: String, limit: Money },

    #[error("{field} must have between {min} and {max} entries")]
    CountOutOfRange { field: String, min: usize, max: usize },

    /// Two parallel lists differ in length (seat ids vs ticket types).
    #[error("{field} has {actual} entries, expected {expected}")]
    LengthMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("{field} '{value}' appears more than once")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Error Codes
// =============================================================================

/// Stable error codes, serialized SCREAMING_SNAKE_CASE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ShowingNotFound,
    ShowingNotBookable,
    SeatNotAvailable,
    MemberNotFound,
    MemberInactive,
    TicketTypeNotEligible,
    DuplicateBooking,
    BookingNotFound,
    CannotCancel,
    CannotComplete,
    WalletNotFound,
    WalletAlreadyExists,
    WalletInactive,
    InvalidWalletTransition,
    InsufficientBalance,
    ValidationError,
    DatabaseError,
    ConfigError,
    InternalError,
}

// =============================================================================
// Result Type Alias
// =============================================================================

pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
