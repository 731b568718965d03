//! Fixed-point currency amounts.
//!
//! Every amount is held as an integer count of the smallest currency unit
//! (`amount_unit_scale` units per currency unit, 100 for paise). Sums and
//! comparisons are exact integer arithmetic; there is no floating point on
//! any path from a parsed cell to a report total.

use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    pub fn minor(self) -> i64 {
        self.0
    }

    /// `None` on i64 overflow, same for the other `checked_*` methods.
    pub fn checked_add(self, rhs: Amount) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_sub(self, rhs: Amount) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    pub fn checked_abs(self) -> Option<Self> {
        self.0.checked_abs().map(Self)
    }

    pub fn checked_sum<I: IntoIterator<Item = Amount>>(amounts: I) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, |acc, a| acc.checked_add(a))
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Parse a decimal cell into minor units at `scale`.
    ///
    /// ASCII thousands separators are dropped, so both `1,000.50` and the
    /// Indian grouping `1,00,000.50` are accepted. Returns `None` when the
    /// text is not a decimal or carries precision finer than one minor unit.
    pub fn parse(raw: &str, scale: u32) -> Option<Self> {
        let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
        if cleaned.is_empty() {
            return None;
        }
        let value = Decimal::from_str(&cleaned)
            .or_else(|_| Decimal::from_scientific(&cleaned))
            .ok()?;
        let scaled = value.checked_mul(Decimal::from(scale))?;
        if !scaled.fract().is_zero() {
            return None;
        }
        scaled.to_i64().map(Self)
    }

    /// Value in currency units.
    pub fn to_decimal(self, scale: u32) -> Decimal {
        match decimal_places(scale) {
            Some(places) => Decimal::new(self.0, places),
            None => Decimal::from(self.0) / Decimal::from(scale),
        }
    }

    /// Currency-unit rendering with one digit per power of ten in `scale`.
    pub fn display(self, scale: u32) -> String {
        self.to_decimal(scale).to_string()
    }
}

/// `Some(n)` when `scale == 10^n`.
fn decimal_places(scale: u32) -> Option<u32> {
    let mut places = 0;
    let mut rest = scale;
    while rest > 1 {
        if rest % 10 != 0 {
            return None;
        }
        rest /= 10;
        places += 1;
    }
    (rest == 1).then_some(places)
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
