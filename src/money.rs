//! Exact decimal money type.
//!
//! Wraps `rust_decimal` so settlement arithmetic never touches floating point.
//! Values keep their full precision internally; rounding to cents only happens
//! when a value is displayed or serialized for a report.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;

/// An amount of money (or a money-per-chip rate) with exact decimal semantics.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
/// use poker_ledger::Money;
///
/// let share = Money::from_units(1000).split(3);
/// assert_eq!(share.to_string(), "333.33");
///
/// let rate = Money::from_str("0.5").unwrap();
/// assert_eq!(rate.times(-300).to_string(), "-150.00");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Money(Decimal);

impl Money {
    /// Decimal places used when rendering amounts.
    pub const DISPLAY_SCALE: u32 = 2;

    /// Zero value.
    pub const ZERO: Self = Money(Decimal::ZERO);

    pub fn new(value: Decimal) -> Self {
        Money(value)
    }

    /// Creates a value from a whole number of currency units.
    pub fn from_units(units: i64) -> Self {
        Money(Decimal::from(units))
    }

    /// Returns the underlying exact decimal.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Returns `true` if this value is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns `true` if this value is strictly below zero.
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Divides the amount into `parts` equal shares.
    ///
    /// Zero parts yields zero rather than failing.
    pub fn split(self, parts: usize) -> Self {
        if parts == 0 {
            return Money::ZERO;
        }
        Money(self.0 / Decimal::from(parts as u64))
    }

    /// Multiplies a per-chip rate by a (possibly negative) chip count.
    pub fn times(self, chips: i64) -> Self {
        Money(self.0 * Decimal::from(chips))
    }

    /// The value rounded half away from zero to [`Self::DISPLAY_SCALE`] places.
    pub fn rounded(&self) -> Decimal {
        let mut rounded = self
            .0
            .round_dp_with_strategy(Self::DISPLAY_SCALE, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(Self::DISPLAY_SCALE);
        rounded
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let decimal = Decimal::from_str(s.trim())?;
        Ok(Money(decimal))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rounded())
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
