//! # marquee-core: Pure Business Logic for Marquee
//!
//! Everything the booking engine decides without touching storage: prices,
//! lifecycle guards, wallet posting rules, showing status and journal views.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Marquee Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Callers (HTTP / CLI, out of tree)               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │  marquee-engine: SeatInventory, WalletLedger, Orchestrator      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ marquee-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  money  │ │ pricing │ │ booking │ │ wallet  │ │ journal │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │  marquee-db: SQLite repositories, migrations                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Venue, Seat, Showing and the `Multiplier` type
//! - [`money`] - Money type with integer arithmetic
//! - [`pricing`] - Ticket multipliers and seat surcharges
//! - [`booking`] - Booking aggregate and state machine
//! - [`wallet`] - Wallet and Transaction, posting rules
//! - [`journal`] - Statements, totals, balance-at-time, reconciliation
//! - [`member`] - Member attributes and ticket eligibility
//! - [`error`] - Domain error types and stable codes
//! - [`validation`] - Caller input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use marquee_core::money::Money;
//! use marquee_core::pricing::{price, total, TicketType};
//! use marquee_core::types::SeatType;
//!
//! let base = Money::from_cents(30000);
//! let lines = vec![
//!     price(base, TicketType::Adult, SeatType::Regular),
//!     price(base, TicketType::Adult, SeatType::Regular),
//! ];
//! assert_eq!(total(lines).to_string(), "600.00");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod booking;
pub mod error;
pub mod journal;
pub mod member;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;
pub mod wallet;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use booking::{Booking, BookingDetail, BookingLine, BookingStatus, BookingView, PaymentStatus};
pub use error::{CoreError, CoreResult, ErrorCode, ValidationError};
pub use member::{CardType, MemberProfile};
pub use money::Money;
pub use pricing::TicketType;
pub use types::*;
pub use wallet::{Transaction, TransactionStatus, TransactionType, Wallet, WalletStatus};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Remaining-capacity ratio at or below which a showing is ALMOST_FULL.
pub const DEFAULT_ALMOST_FULL_BPS: u32 = 2_000;

/// Default maximum seats in a single booking request.
pub const DEFAULT_MAX_SEATS_PER_BOOKING: usize = 10;

/// Length of a large-amount verification code.
pub const VERIFICATION_CODE_LEN: usize = 6;
