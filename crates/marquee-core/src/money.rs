//! # Money Module
//!
//! Provides the `Money` type for ticket prices, wallet balances and ledger
//! amounts.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  300.00 × 0.7 × 1.2 in f64 = 251.99999999999997                        │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units + basis-point multipliers           │
//! │    30000 × 7000 × 12000 / 10000² = 25200 (252.00)                      │
//! │    One rounding step, at the very end, half-up                         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use marquee_core::money::Money;
//!
//! let price = Money::from_major_minor(300, 0);
//! let pair = price * 2;
//! assert_eq!(pair.to_string(), "600.00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::types::Multiplier;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in minor units (two decimal places).
///
/// ## Where Money is Used
/// ```text
/// Showing.base_price ──► pricing::price_line ──► BookingDetail.ticket_price
///                                                      │
///                                   Σ lines ──► Booking.total_amount
///                                                      │
///                        WalletLedger.pay ──► Transaction.amount (signed)
///                                                      │
///                                          Wallet.balance / balance_after
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use marquee_core::money::Money;
    ///
    /// let price = Money::from_cents(36000); // 360.00
    /// assert_eq!(price.cents(), 36000);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Applies a chain of basis-point multipliers, rounding once at the end.
    ///
    /// ## Rounding
    /// Intermediate products are kept exact in `i128`. The final division
    /// rounds half away from zero, which is half-up for the non-negative
    /// prices this is used for.
    ///
    /// ## Example
    /// ```rust
    /// use marquee_core::money::Money;
    /// use marquee_core::types::Multiplier;
    ///
    /// let base = Money::from_cents(30000);
    /// let senior_vip = base.apply_multipliers(&[
    ///     Multiplier::from_bps(7000),
    ///     Multiplier::from_bps(12000),
    /// ]);
    /// assert_eq!(senior_vip.cents(), 25200);
    /// ```
    pub fn apply_multipliers(&self, multipliers: &[Multiplier]) -> Money {
        let mut numerator = self.0 as i128;
        let mut denominator: i128 = 1;
        for m in multipliers {
            numerator *= m.bps() as i128;
            denominator *= Multiplier::ONE_BPS as i128;
        }

        let half = denominator / 2;
        let rounded = if numerator >= 0 {
            (numerator + half) / denominator
        } else {
            (numerator - half) / denominator
        };
        Money::from_cents(rounded as i64)
    }

    /// Returns the negated value (used for debit ledger entries).
    #[inline]
    pub const fn negated(&self) -> Self {
        Money(-self.0)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Renders `1234.50` / `-5.50`. Currency symbols are a presentation concern.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_from_major_minor() {
        assert_eq!(Money::from_major_minor(600, 0).cents(), 60000);
        assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(60000).to_string(), "600.00");
        assert_eq!(Money::from_cents(505).to_string(), "5.05");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((-a).cents(), -1000);
        assert_eq!((a * 3).cents(), 3000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_multipliers_round_once_half_up() {
        // 0.25 × 50% = 0.125 → 0.13
        let m = Money::from_cents(25).apply_multipliers(&[Multiplier::from_bps(5000)]);
        assert_eq!(m.cents(), 13);

        // 0.05 × 50% × 120% = 0.03 exactly.
        // Rounding per step would give 0.025 → 0.03, then 0.036 → 0.04.
        let exact = Money::from_cents(5)
            .apply_multipliers(&[Multiplier::from_bps(5000), Multiplier::from_bps(12000)]);
        assert_eq!(exact.cents(), 3);
    }

    #[test]
    fn test_multipliers_identity() {
        let base = Money::from_cents(30000);
        assert_eq!(base.apply_multipliers(&[]), base);
        assert_eq!(base.apply_multipliers(&[Multiplier::ONE]), base);
    }

    #[test]
    fn test_zero_and_sign_checks() {
        assert!(Money::zero().is_zero());
        assert!(Money::from_cents(1).is_positive());
        assert!(Money::from_cents(-1).is_negative());
        assert_eq!(Money::from_cents(-700).abs().cents(), 700);
        assert_eq!(Money::from_cents(700).negated().cents(), -700);
    }
}
