//! # Pricing
//!
//! Ticket pricing as a pure function of base price, ticket type and seat type.
//!
//! ## Formula
//! ```text
//! line = round_half_up( base × ticket_multiplier × seat_surcharge )
//!
//!   ticket_multiplier            seat_surcharge
//!   ─────────────────            ──────────────
//!   ADULT    ×1.0                VIP     ×1.2
//!   CHILD    ×0.5                others  ×1.0
//!   SENIOR   ×0.7
//!   STUDENT  ×0.8
//! ```
//! The surcharge applies after the ticket multiplier and rounding happens
//! once, on the final value.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Multiplier, SeatType};

// =============================================================================
// Ticket Type
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketType {
    Adult,
    Child,
    Senior,
    Student,
}

const TICKET_MULTIPLIERS: [(TicketType, Multiplier); 4] = [
    (TicketType::Adult, Multiplier::from_bps(10_000)),
    (TicketType::Child, Multiplier::from_bps(5_000)),
    (TicketType::Senior, Multiplier::from_bps(7_000)),
    (TicketType::Student, Multiplier::from_bps(8_000)),
];

const SEAT_SURCHARGES: [(SeatType, Multiplier); 1] = [(SeatType::Vip, Multiplier::from_bps(12_000))];

impl TicketType {
    pub const ALL: [TicketType; 4] = [
        TicketType::Adult,
        TicketType::Child,
        TicketType::Senior,
        TicketType::Student,
    ];

    pub fn multiplier(self) -> Multiplier {
        TICKET_MULTIPLIERS
            .iter()
            .find(|(t, _)| *t == self)
            .map(|(_, m)| *m)
            .unwrap_or(Multiplier::ONE)
    }
}

impl SeatType {
    pub fn surcharge(self) -> Multiplier {
        SEAT_SURCHARGES
            .iter()
            .find(|(s, _)| *s == self)
            .map(|(_, m)| *m)
            .unwrap_or(Multiplier::ONE)
    }
}

// =============================================================================
// Pricing Functions
// =============================================================================

/// Prices one seat.
///
/// ## Example
/// ```rust
/// use marquee_core::money::Money;
/// use marquee_core::pricing::{price, TicketType};
/// use marquee_core::types::SeatType;
///
/// let vip = price(Money::from_cents(30000), TicketType::Adult, SeatType::Vip);
/// assert_eq!(vip.to_string(), "360.00");
/// ```
pub fn price(base: Money, ticket_type: TicketType, seat_type: SeatType) -> Money {
    base.apply_multipliers(&[ticket_type.multiplier(), seat_type.surcharge()])
}

/// Prices one seat for a member whose eligibility was already decided
/// by the member directory. Ineligible combinations are refused.
pub fn price_for_member(
    member_id: &str,
    base: Money,
    ticket_type: TicketType,
    seat_type: SeatType,
    eligible: bool,
) -> CoreResult<Money> {
    if !eligible {
        return Err(CoreError::TicketTypeNotEligible {
            member_id: member_id.to_string(),
            ticket_type,
        });
    }
    Ok(price(base, ticket_type, seat_type))
}

/// Plain sum of line prices.
pub fn total<I>(lines: I) -> Money
where
    I: IntoIterator<Item = Money>,
{
    lines.into_iter().sum()
}

// =============================================================================
// Unit Tests
// =============================================================================
