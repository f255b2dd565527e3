//! Fixed-point decimal type
//!
//! `Fixed` wraps a `rust_decimal::Decimal` bounded to ±999,999,999,999.999999
//! and carries the scaling helpers used to move between human decimals and
//! venue integer base units.

use rust_decimal::{Decimal, prelude::*};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::ops::{Add, Sub};
use std::str::FromStr;

/// Largest exponent accepted by the base-unit helpers. `10^18` still fits in an `i64`.
pub const MAX_SCALE: u32 = 18;

/// Fixed-point decimal for prices, sizes and notional values.
///
/// Arithmetic is exact; there is no floating-point step anywhere between a
/// decimal string coming from a venue and the integer sent back to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fixed {
    value: Decimal,
}

impl Fixed {
    /// Maximum value: 999999999999.999999
    pub fn max() -> Self {
        Fixed {
            value: Decimal::new(999_999_999_999_999_999i64, 6),
        }
    }

    /// Minimum value: -999999999999.999999
    pub fn min() -> Self {
        Fixed {
            value: Decimal::new(-999_999_999_999_999_999i64, 6),
        }
    }

    pub const ZERO: Fixed = Fixed {
        value: Decimal::ZERO,
    };

    /// Create a new Fixed from a Decimal, rejecting values outside the supported range
    pub fn from_decimal(value: Decimal) -> Result<Self, FixedError> {
        let fixed = Fixed { value };

        if fixed > Self::max() || fixed < Self::min() {
            return Err(FixedError::OutOfRange);
        }

        Ok(fixed)
    }

    /// Parse a decimal string such as `"12.345"` without any rounding
    pub fn from_str_exact(s: &str) -> Result<Self, FixedError> {
        let decimal = Decimal::from_str(s.trim()).map_err(|_| FixedError::InvalidValue)?;
        Self::from_decimal(decimal)
    }

    pub fn is_positive(&self) -> bool {
        self.value.is_sign_positive() && !self.value.is_zero()
    }

    pub fn abs(&self) -> Self {
        Fixed {
            value: self.value.abs(),
        }
    }

    /// Encode into venue base units: `round(self × 10^decimals)`.
    ///
    /// Rounding is half away from zero, so `0.00005` at 4 decimals becomes `1`
    /// and `-0.00005` becomes `-1`.
    pub fn to_base_units(&self, decimals: u32) -> Result<i64, FixedError> {
        let scaled = self
            .value
            .checked_mul(pow10(decimals)?)
            .ok_or(FixedError::Overflow)?;

        scaled
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or(FixedError::Overflow)
    }

    /// Decode venue base units: `raw ÷ 10^decimals`. Exact inverse of [`Fixed::to_base_units`].
    pub fn from_base_units(raw: i64, decimals: u32) -> Result<Self, FixedError> {
        if decimals > MAX_SCALE {
            return Err(FixedError::Overflow);
        }
        let value = Decimal::try_new(raw, decimals).map_err(|_| FixedError::Overflow)?;
        Self::from_decimal(value.normalize())
    }

    /// Decode a base-unit amount delivered as a string (venues send integers as strings).
    pub fn from_base_str(raw: &str, decimals: u32) -> Result<Self, FixedError> {
        let value = Decimal::from_str(raw.trim()).map_err(|_| FixedError::InvalidValue)?;
        let value = value
            .checked_div(pow10(decimals)?)
            .ok_or(FixedError::Overflow)?;
        Self::from_decimal(value.normalize())
    }

    /// Add two values, rejecting results outside the supported range
    pub fn checked_add(&self, other: Fixed) -> Result<Fixed, FixedError> {
        let value = self
            .value
            .checked_add(other.value)
            .ok_or(FixedError::Overflow)?;
        Self::from_decimal(value)
    }

}

fn pow10(decimals: u32) -> Result<Decimal, FixedError> {
    if decimals > MAX_SCALE {
        return Err(FixedError::Overflow);
    }
    10i64
        .checked_pow(decimals)
        .map(Decimal::from)
        .ok_or(FixedError::Overflow)
}

/// Fixed-point arithmetic errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FixedError {
    #[error("Value out of range (max: 999999999999.999999)")]
    OutOfRange,
    #[error("Invalid value")]
    InvalidValue,
    #[error("Overflow in arithmetic operation")]
    Overflow,
}

impl Add for Fixed {
    type Output = Fixed;

    fn add(self, rhs: Self) -> Self::Output {
        Fixed {
            value: self.value + rhs.value,
        }
    }
}

impl Sub for Fixed {
    type Output = Fixed;

    fn sub(self, rhs: Self) -> Self::Output {
        Fixed {
            value: self.value - rhs.value,
        }
    }
}

impl Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl FromStr for Fixed {
    type Err = FixedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_exact(s)
    }
}

/// Convenience macro for creating Fixed values from literals
#[macro_export]
macro_rules! fixed {
    ($value:expr) => {
        $crate::fixed::Fixed::from_str_exact(stringify!($value)).unwrap()
    };
}
