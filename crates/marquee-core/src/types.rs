//! # Domain Types
//!
//! Venue, seat and showing types plus the basis-point `Multiplier`.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Screening Types                                 │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Venue       │   │      Seat       │   │    Showing      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  venue_id (FK)  │   │  venue_id (FK)  │       │
//! │  │  theater_number │   │  row_label      │   │  starts_at      │       │
//! │  │  seat_rows      │   │  column_number  │   │  base_price     │       │
//! │  │  seat_columns   │   │  seat_type      │   │  available_seats│       │
//! │  └─────────────────┘   │  status         │   │  status (derived│       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Relationships are id references resolved through the store. No entity
//! holds a pointer to another.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

// =============================================================================
// Multiplier
// =============================================================================

/// A price multiplier in basis points.
///
/// 10000 bps = ×1.0, 5000 = ×0.5, 12000 = ×1.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Multiplier(u32);

impl Multiplier {
    /// Basis points that represent ×1.0.
    pub const ONE_BPS: u32 = 10_000;

    /// The identity multiplier.
    pub const ONE: Multiplier = Multiplier(Self::ONE_BPS);

    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Multiplier(bps)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }
}

impl Default for Multiplier {
    fn default() -> Self {
        Multiplier::ONE
    }
}

// =============================================================================
// Venue
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VenueType {
    TwoD,
    ThreeD,
    Imax,
    FourDx,
}

/// Operational status shared by venues and seats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatStatus {
    Active,
    Maintenance,
    Inactive,
}

/// A physical screening room with a fixed rectangular seat layout.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Venue {
    pub id: String,
    pub name: String,
    /// Business identifier printed on tickets ("T3").
    pub theater_number: String,
    pub seat_rows: i64,
    pub seat_columns: i64,
    pub venue_type: VenueType,
    pub status: SeatStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Venue {
    /// Total seats in the layout.
    #[inline]
    pub fn capacity(&self) -> i64 {
        self.seat_rows * self.seat_columns
    }
}

// =============================================================================
// Seat
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatType {
    Regular,
    Vip,
    Couple,
    Disabled,
}

/// An addressable unit of venue capacity.
///
/// Whether a seat is booked is a per-showing fact held by the seat
/// inventory, never a field here.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Seat {
    pub id: String,
    pub venue_id: String,
    pub row_label: String,
    pub column_number: i64,
    pub seat_type: SeatType,
    pub status: SeatStatus,
}

impl Seat {
    /// Human label such as `F7`.
    pub fn label(&self) -> String {
        format!("{}{}", self.row_label, self.column_number)
    }

    /// Only ACTIVE seats can be sold.
    #[inline]
    pub fn is_sellable(&self) -> bool {
        self.status == SeatStatus::Active
    }
}

// =============================================================================
// Showing
// =============================================================================

/// Availability of a showing, derived from its seat counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShowingStatus {
    Available,
    AlmostFull,
    Full,
    Cancelled,
}

impl ShowingStatus {
    /// Derives the status from the remaining-seat counter.
    ///
    /// ## Rules
    /// ```text
    /// current == Cancelled              → Cancelled (sticky)
    /// available <= 0                    → Full
    /// available <= capacity × ratio     → AlmostFull
    /// otherwise                         → Available
    /// ```
    ///
    /// ## Example
    /// ```rust
    /// use marquee_core::types::ShowingStatus;
    ///
    /// let s = ShowingStatus::derive(20, 100, 2000, ShowingStatus::Available);
    /// assert_eq!(s, ShowingStatus::AlmostFull);
    /// ```
    pub fn derive(
        available: i64,
        capacity: i64,
        almost_full_bps: u32,
        current: ShowingStatus,
    ) -> ShowingStatus {
        if current == ShowingStatus::Cancelled {
            return ShowingStatus::Cancelled;
        }
        if available <= 0 {
            return ShowingStatus::Full;
        }
        // available / capacity <= bps / 10000, kept in integers
        if (available as i128) * (Multiplier::ONE_BPS as i128)
            <= (capacity as i128) * (almost_full_bps as i128)
        {
            return ShowingStatus::AlmostFull;
        }
        ShowingStatus::Available
    }
}

/// A scheduled screening of a movie in a venue.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Showing {
    pub id: String,
    /// Reference into the external movie catalog.
    pub movie_id: String,
    pub venue_id: String,
    #[ts(as = "String")]
    pub starts_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub ends_at: DateTime<Utc>,
    pub base_price_cents: i64,
    /// Venue capacity captured when the showing was scheduled.
    pub capacity: i64,
    pub available_seats: i64,
    pub status: ShowingStatus,
    /// Bumped by every seat-accounting write.
    pub version: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Showing {
    #[inline]
    pub fn base_price(&self) -> Money {
        Money::from_cents(self.base_price_cents)
    }

    #[inline]
    pub fn is_bookable(&self, now: DateTime<Utc>) -> bool {
        self.ensure_bookable(now).is_ok()
    }

    /// Fails with `ShowingNotBookable` when full, cancelled or already started.
    pub fn ensure_bookable(&self, now: DateTime<Utc>) -> CoreResult<()> {
        let reason = match self.status {
            ShowingStatus::Full => Some("showing is full"),
            ShowingStatus::Cancelled => Some("showing is cancelled"),
            _ if now >= self.starts_at => Some("showing has already started"),
            _ => None,
        };

        match reason {
            Some(reason) => Err(CoreError::ShowingNotBookable {
                showing_id: self.id.clone(),
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Moves the seat counter by `delta` and recomputes the status.
    ///
    /// Callers hold the showing's lock; counter and status change together.
    pub fn adjust_available(&mut self, delta: i64, almost_full_bps: u32, now: DateTime<Utc>) {
        self.available_seats = (self.available_seats + delta).clamp(0, self.capacity);
        self.status =
            ShowingStatus::derive(self.available_seats, self.capacity, almost_full_bps, self.status);
        self.version += 1;
        self.updated_at = now;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
