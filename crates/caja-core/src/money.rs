//! # Money Module
//!
//! `Money` for every cash-side amount and `MarginRate` for pricing.
//!
//! ## Two Numeric Worlds
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  CASH SIDE (Money, i64 cents)        VALUATION SIDE (Decimal cents)     │
//! │  ────────────────────────────        ──────────────────────────────     │
//! │  capital, profit, balances,          unit cost, total cost value        │
//! │  subtotals, sale prices, debt                                           │
//! │                                                                         │
//! │  Exact integer arithmetic.           10 @ 200 + 5 @ 300 = 3500 / 15     │
//! │                                      = 233.33.. cents per unit, which   │
//! │                                      cents cannot hold. Decimal keeps   │
//! │                                      qty × unit == total within 1e-20.  │
//! │                                                                         │
//! │  The two meet only in `Money::from_decimal_cents`, which rounds half   │
//! │  to even.                                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use caja_core::money::Money;
//!
//! let price = Money::from_cents(1099); // $10.99
//! let doubled = price * 2;             // $21.98
//! assert_eq!(doubled.cents(), 2198);
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: intermediate results such as utility may be negative
/// - **Single field tuple struct**: zero-cost abstraction over i64
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use caja_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// ## Example
    /// ```rust
    /// use caja_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Rounds a decimal amount of cents to whole cents, half to even.
    ///
    /// ## Example
    /// ```rust
    /// use caja_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// assert_eq!(Money::from_decimal_cents(Decimal::new(2505, 1)).cents(), 250);
    /// assert_eq!(Money::from_decimal_cents(Decimal::new(2515, 1)).cents(), 252);
    /// ```
    pub fn from_decimal_cents(cents: Decimal) -> Self {
        let rounded = cents.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
        // i64 cents covers ±92 quadrillion dollars; saturate beyond that.
        let value = rounded.to_i64().unwrap_or(if rounded.is_sign_negative() {
            i64::MIN
        } else {
            i64::MAX
        });
        Money(value)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the value as a decimal number of cents.
    #[inline]
    pub fn to_decimal_cents(&self) -> Decimal {
        Decimal::from(self.0)
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is greater than zero.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is less than zero.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Returns the larger of `self` and zero.
    #[inline]
    pub const fn clamp_non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            Money(self.0)
        }
    }

    /// Multiplies money by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-oriented display. The UI formats with the configured symbol.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
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

// =============================================================================
// Margin Rate
// =============================================================================

/// Markup over unit cost in basis points.
///
/// ## Why Basis Points?
/// 1 basis point = 0.01%. 3000 bps = 30% markup, so an item costing 200
/// cents sells for 260.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MarginRate(u32);

impl MarginRate {
    /// Creates a margin from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        MarginRate(bps)
    }

    /// Creates a margin from a percentage (display convenience).
    pub fn from_percentage(pct: f64) -> Self {
        MarginRate((pct * 100.0).round().max(0.0) as u32)
    }

    /// Returns the margin in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the margin as a fraction (0.30 for 3000 bps).
    pub fn fraction(&self) -> Decimal {
        Decimal::from(self.0) / Decimal::from(10_000)
    }

    /// Computes `unit_cost × (1 + margin)` rounded to whole cents.
    ///
    /// ## Example
    /// ```rust
    /// use caja_core::money::{MarginRate, Money};
    /// use rust_decimal::Decimal;
    ///
    /// let margin = MarginRate::from_bps(2500); // 25%
    /// assert_eq!(margin.sale_price(Decimal::from(300)), Money::from_cents(375));
    /// ```
    pub fn sale_price(&self, unit_cost_cents: Decimal) -> Money {
        Money::from_decimal_cents(unit_cost_cents * (Decimal::ONE + self.fraction()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
