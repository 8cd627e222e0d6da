//! Stay date ranges.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The stay dates were rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid date range: {message}")]
pub struct InvalidDateRange {
    pub message: &'static str,
}

impl InvalidDateRange {
    const CHECK_IN_IN_PAST: Self = Self {
        message: "check-in date cannot be before today",
    };
    const CHECK_OUT_EQUALS_CHECK_IN: Self = Self {
        message: "check-out date cannot be equal to check-in date",
    };
    const CHECK_OUT_BEFORE_CHECK_IN: Self = Self {
        message: "check-out date cannot be before check-in date",
    };
}

/// A half-open night range `[check_in, check_out)`.
///
/// The guest occupies the room on the nights starting at `check_in` up to,
/// but not including, `check_out`, so a stay ending on the 4th does not
/// overlap one starting on the 4th.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StayDates {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

impl StayDates {
    /// Validates the ordering of the two dates.
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self, InvalidDateRange> {
        if check_out == check_in {
            return Err(InvalidDateRange::CHECK_OUT_EQUALS_CHECK_IN);
        }
        if check_out < check_in {
            return Err(InvalidDateRange::CHECK_OUT_BEFORE_CHECK_IN);
        }
        Ok(Self {
            check_in,
            check_out,
        })
    }

    /// Validates a stay being booked on `today`.
    pub fn for_new_booking(
        check_in: NaiveDate,
        check_out: NaiveDate,
        today: NaiveDate,
    ) -> Result<Self, InvalidDateRange> {
        if check_in < today {
            return Err(InvalidDateRange::CHECK_IN_IN_PAST);
        }
        Self::new(check_in, check_out)
    }

    pub fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    pub fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    /// Number of nights, always at least one.
    pub fn nights(&self) -> u32 {
        let days = (self.check_out - self.check_in).num_days();
        u32::try_from(days).unwrap_or(u32::MAX)
    }

    pub fn overlaps(&self, other: &StayDates) -> bool {
        self.check_in < other.check_out && other.check_in < self.check_out
    }
}

impl std::fmt::Display for StayDates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.check_in, self.check_out)
    }
}
