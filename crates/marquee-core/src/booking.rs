//! # Booking Aggregate
//!
//! A booking is the purchase of one or more seats for one showing.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Booking State Machine                             │
//! │                                                                         │
//! │   PENDING ──(payment COMPLETED)──► CONFIRMED ──(ends_at passed,        │
//! │      │                                │         payment PAID)──►       │
//! │      │                                │                    COMPLETED    │
//! │      │  now < starts_at               │  now < starts_at                │
//! │      └──────────────► CANCELLED ◄─────┘                                 │
//! │                                                                         │
//! │   CANCELLED and COMPLETED are terminal.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Price Freezing
//! Each `BookingDetail` stores the price charged when the booking was made.
//! `total_cents` is computed once at creation and never recomputed from the
//! showing's current base price.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::pricing::TicketType;
use crate::types::SeatType;

// =============================================================================
// Status Enums
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    /// Allowed state transitions. Time and payment guards are checked by
    /// the `Booking` methods.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, Cancelled) | (Confirmed, Completed)
        )
    }

    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Completed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    Refunded,
}

// =============================================================================
// Booking
// =============================================================================

/// The aggregate root of a purchase.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Booking {
    pub id: String,
    /// Human-facing reference ("BK3F9A12C0").
    pub booking_number: String,
    pub member_id: String,
    pub showing_id: String,
    pub total_cents: i64,
    pub booking_status: BookingStatus,
    pub payment_status: PaymentStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Booking {
    /// Builds a confirmed, paid booking from its priced lines.
    ///
    /// Called once payment has posted, so the booking never exists in a
    /// PAID=false state with seats held.
    pub fn confirmed(
        id: String,
        member_id: &str,
        showing_id: &str,
        lines: &[BookingDetail],
        now: DateTime<Utc>,
    ) -> Self {
        let total: Money = lines.iter().map(BookingDetail::ticket_price).sum();
        Booking {
            booking_number: booking_number_for(&id),
            id,
            member_id: member_id.to_string(),
            showing_id: showing_id.to_string(),
            total_cents: total.cents(),
            booking_status: BookingStatus::Confirmed,
            payment_status: PaymentStatus::Paid,
            created_at: now,
            updated_at: now,
            cancelled_at: None,
        }
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Checks the cancellation guard.
    ///
    /// ## When This Fails
    /// - booking is already CANCELLED or COMPLETED
    /// - the showing has started (`now >= starts_at`)
    pub fn ensure_cancellable(&self, now: DateTime<Utc>, starts_at: DateTime<Utc>) -> CoreResult<()> {
        if !self.booking_status.can_transition_to(BookingStatus::Cancelled) {
            return Err(CoreError::CannotCancel {
                booking_id: self.id.clone(),
                reason: format!("booking is {:?}", self.booking_status),
            });
        }
        if now >= starts_at {
            return Err(CoreError::CannotCancel {
                booking_id: self.id.clone(),
                reason: "showing has already started".to_string(),
            });
        }
        Ok(())
    }

    /// A booking is refundable when it could be cancelled and was paid.
    pub fn is_refundable(&self, now: DateTime<Utc>, starts_at: DateTime<Utc>) -> bool {
        self.payment_status == PaymentStatus::Paid && self.ensure_cancellable(now, starts_at).is_ok()
    }

    /// Applies the cancellation. Payment moves to REFUNDED if it was PAID
    /// with a non-zero total.
    pub fn cancel(&mut self, now: DateTime<Utc>, starts_at: DateTime<Utc>) -> CoreResult<()> {
        self.ensure_cancellable(now, starts_at)?;
        self.mark_cancelled(now)
    }

    /// Moves the booking to CANCELLED checking only the status transition.
    ///
    /// Used once the time guard has been passed and a refund may already be
    /// on the ledger, so a showing that starts in between cannot strand it.
    pub fn mark_cancelled(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        if !self.booking_status.can_transition_to(BookingStatus::Cancelled) {
            return Err(CoreError::CannotCancel {
                booking_id: self.id.clone(),
                reason: format!("booking is {:?}", self.booking_status),
            });
        }
        self.booking_status = BookingStatus::Cancelled;
        if self.payment_status == PaymentStatus::Paid && self.total_cents > 0 {
            self.payment_status = PaymentStatus::Refunded;
        }
        self.cancelled_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Moves a CONFIRMED, PAID booking to COMPLETED once the showing ended.
    pub fn complete(&mut self, now: DateTime<Utc>, ends_at: DateTime<Utc>) -> CoreResult<()> {
        let reason = if !self.booking_status.can_transition_to(BookingStatus::Completed) {
            Some(format!("booking is {:?}", self.booking_status))
        } else if self.payment_status != PaymentStatus::Paid {
            Some(format!("payment is {:?}", self.payment_status))
        } else if now < ends_at {
            Some("showing has not ended".to_string())
        } else {
            None
        };

        if let Some(reason) = reason {
            return Err(CoreError::CannotComplete {
                booking_id: self.id.clone(),
                reason,
            });
        }

        self.booking_status = BookingStatus::Completed;
        self.updated_at = now;
        Ok(())
    }
}

/// Generates a new booking id (UUID v4).
pub fn generate_booking_id() -> String {
    Uuid::new_v4().to_string()
}

/// Derives the `BK` + 8 hex character booking number from a booking id.
pub fn booking_number_for(id: &str) -> String {
    let hex: String = id
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .take(8)
        .collect();
    format!("BK{}", hex.to_ascii_uppercase())
}

// =============================================================================
// Booking Detail
// =============================================================================

/// One seat, one ticket type, one frozen price.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct BookingDetail {
    pub id: String,
    pub booking_id: String,
    pub showing_id: String,
    pub seat_id: String,
    pub ticket_type: TicketType,
    pub ticket_price_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl BookingDetail {
    #[inline]
    pub fn ticket_price(&self) -> Money {
        Money::from_cents(self.ticket_price_cents)
    }
}

// =============================================================================
// Projections
// =============================================================================

/// A booking line as shown to the member.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BookingLine {
    pub seat_id: String,
    pub seat_label: String,
    pub seat_type: SeatType,
    pub ticket_type: TicketType,
    pub price: Money,
}

/// Booking plus its lines, returned by create/get operations.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BookingView {
    pub booking: Booking,
    pub lines: Vec<BookingLine>,
}

impl BookingView {
    pub fn total(&self) -> Money {
        self.booking.total()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
