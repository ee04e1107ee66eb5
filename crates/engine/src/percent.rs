//! Split percentages.
//!
//! Percentages are kept as integer thousandths of a percent so that summing
//! and comparing them against 100% is exact. API callers send floating point
//! values, which are rounded once at the boundary.

use std::{fmt, iter::Sum, ops::Add};

use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// A percentage in thousandths of a percent (`100% == 100_000`).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Percent(i64);

impl Percent {
    pub const ZERO: Percent = Percent(0);
    pub const HUNDRED: Percent = Percent(100_000);
    /// Accepted distance from 100% for a set of percentage splits (0.01%).
    pub const EPSILON: Percent = Percent(10);

    #[must_use]
    pub const fn from_milli(milli: i64) -> Self {
        Self(milli)
    }

    #[must_use]
    pub const fn milli(self) -> i64 {
        self.0
    }

    /// Converts a floating point percentage (e.g. `33.333`) rounding to the
    /// nearest thousandth.
    pub fn from_f64(value: f64) -> ResultEngine<Self> {
        if !value.is_finite() {
            return Err(EngineError::Validation(
                "percentage must be a finite number".to_string(),
            ));
        }
        if !(0.0..=100.01).contains(&value) {
            return Err(EngineError::Validation(format!(
                "percentage must be between 0 and 100, got {value}"
            )));
        }
        Ok(Self((value * 1000.0).round() as i64))
    }

    #[must_use]
    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Returns `true` if `self` is within [`Percent::EPSILON`] of 100%.
    #[must_use]
    pub fn is_whole(self) -> bool {
        (self.0 - Self::HUNDRED.0).abs() <= Self::EPSILON.0
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 1000;
        let frac = (self.0 % 1000).abs();
        if frac == 0 {
            write!(f, "{whole}%")
        } else {
            let frac = format!("{frac:03}");
            write!(f, "{whole}.{}%", frac.trim_end_matches('0'))
        }
    }
}

impl Add for Percent {
    type Output = Percent;

    fn add(self, rhs: Percent) -> Self::Output {
        Percent(self.0 + rhs.0)
    }
}

impl Sum for Percent {
    fn sum<I: Iterator<Item = Percent>>(iter: I) -> Self {
        iter.fold(Percent::ZERO, Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_f64_rounds_to_thousandths() {
        assert_eq!(Percent::from_f64(33.3333).unwrap().milli(), 33_333);
        assert_eq!(Percent::from_f64(12.5).unwrap().milli(), 12_500);
        assert_eq!(Percent::from_f64(100.0).unwrap(), Percent::HUNDRED);
    }

    #[test]
    fn from_f64_rejects_out_of_range() {
        assert!(Percent::from_f64(-1.0).is_err());
        assert!(Percent::from_f64(100.5).is_err());
        assert!(Percent::from_f64(f64::NAN).is_err());
    }

    #[test]
    fn whole_within_epsilon() {
        assert!(Percent::from_milli(100_000).is_whole());
        assert!(Percent::from_milli(99_995).is_whole());
        assert!(Percent::from_milli(100_005).is_whole());
        assert!(!Percent::from_milli(99_000).is_whole());
        assert!(!Percent::from_milli(101_000).is_whole());
    }

    #[test]
    fn display_trims_trailing_zeros() {
        assert_eq!(Percent::from_milli(50_000).to_string(), "50%");
        assert_eq!(Percent::from_milli(33_330).to_string(), "33.33%");
        assert_eq!(Percent::from_milli(12_500).to_string(), "12.5%");
    }
}
