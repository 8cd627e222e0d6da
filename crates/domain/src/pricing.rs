//! Stay pricing.

use common::Money;

use crate::error::DomainError;
use crate::stay::StayDates;

/// Total price of a stay: the nightly rate times the number of nights.
///
/// Exact integer arithmetic on minor units; overflow is an error, never a wrap.
pub fn stay_price(nightly_rate: Money, stay: &StayDates) -> Result<Money, DomainError> {
    let nights = stay.nights();
    nightly_rate
        .checked_multiply(nights)
        .ok_or_else(|| DomainError::PriceOverflow {
            nightly_rate: nightly_rate.to_string(),
            nights,
        })
}
