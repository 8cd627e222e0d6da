use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const MINOR_PER_MAJOR: i64 = 100;

/// Fixed-point monetary amount with two implied decimal places.
///
/// Stored as minor units so that pricing never touches floating point.
/// The type carries no currency: the ledger is single-currency and the
/// payment adapter decides which currency code to send.
///
/// Serialized as a decimal string (`"300.00"`); deserialized from a string or a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money {
    minor_units: i64,
}

/// Error returned when a decimal string is not a valid amount.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid amount '{input}': {reason}")]
pub struct ParseMoneyError {
    pub input: String,
    pub reason: &'static str,
}

impl Money {
    /// Creates an amount from minor units (e.g. 1050 = 10.50).
    pub fn from_minor_units(minor_units: i64) -> Self {
        Self { minor_units }
    }

    /// Creates an amount from a whole number of major units.
    pub fn from_major(major: i64) -> Self {
        Self {
            minor_units: major * MINOR_PER_MAJOR,
        }
    }

    pub fn zero() -> Self {
        Self { minor_units: 0 }
    }

    pub fn minor_units(&self) -> i64 {
        self.minor_units
    }

    pub fn is_positive(&self) -> bool {
        self.minor_units > 0
    }

    pub fn is_zero(&self) -> bool {
        self.minor_units == 0
    }

    pub fn is_negative(&self) -> bool {
        self.minor_units < 0
    }

    /// Multiplies by a count, returning `None` on overflow.
    pub fn checked_multiply(&self, count: u32) -> Option<Money> {
        self.minor_units
            .checked_mul(i64::from(count))
            .map(Money::from_minor_units)
    }

    /// Adds another amount, returning `None` on overflow.
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.minor_units
            .checked_add(other.minor_units)
            .map(Money::from_minor_units)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.minor_units < 0 { "-" } else { "" };
        let abs = self.minor_units.unsigned_abs();
        let per = MINOR_PER_MAJOR.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / per, abs % per)
    }
}

impl FromStr for Money {
    type Err = ParseMoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason| ParseMoneyError {
            input: s.to_string(),
            reason,
        };

        let trimmed = s.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let (whole, fraction) = match digits.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (digits, ""),
        };

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err("expected digits before the decimal point"));
        }
        if fraction.len() > 2 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err("at most two decimal places are allowed"));
        }

        let major: i64 = whole.parse().map_err(|_| err("amount is too large"))?;
        let minor: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| err("invalid fraction"))? * 10,
            _ => fraction.parse().map_err(|_| err("invalid fraction"))?,
        };

        let units = major
            .checked_mul(MINOR_PER_MAJOR)
            .and_then(|m| m.checked_add(minor))
            .ok_or_else(|| err("amount is too large"))?;

        Ok(Money::from_minor_units(if negative { -units } else { units }))
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Accepts a decimal string (`"300.00"`) or a JSON number (`300.00`).
/// Numbers go through the same exact parse via their textual form.
struct MoneyVisitor;

impl Visitor<'_> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("a decimal amount as a string or number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        self.visit_str(&v.to_string())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        self.visit_str(&v.to_string())
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        if !v.is_finite() {
            return Err(E::custom(format!("invalid amount: {v}")));
        }
        self.visit_str(&v.to_string())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}
