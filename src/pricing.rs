//! Subtotals

use rusty_money::{Money, iso::Currency};
use thiserror::Error;

use crate::items::LineItem;

/// Errors that can occur while calculating a subtotal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TotalPriceError {
    /// A line is priced in a different currency (line index, line currency, expected currency).
    #[error("line {0} has currency {1}, expected {2}")]
    CurrencyMismatch(usize, &'static str, &'static str),

    /// The sum of price x quantity does not fit in minor units.
    #[error("subtotal overflowed")]
    Overflow,
}

/// Calculates the subtotal (`sum(unit_price * quantity)`) of a list of lines.
///
/// An empty list yields zero in `currency`.
///
/// # Errors
///
/// - [`TotalPriceError::CurrencyMismatch`]: a line is not priced in `currency`.
/// - [`TotalPriceError::Overflow`]: the sum does not fit in minor units.
pub fn subtotal<'a>(
    lines: &[LineItem<'a>],
    currency: &'a Currency,
) -> Result<Money<'a, Currency>, TotalPriceError> {
    let total = lines
        .iter()
        .enumerate()
        .try_fold(0_i64, |acc, (idx, line)| {
            let line_currency = line.unit_price().currency();

            if line_currency != currency {
                return Err(TotalPriceError::CurrencyMismatch(
                    idx,
                    line_currency.iso_alpha_code,
                    currency.iso_alpha_code,
                ));
            }

            line.line_total_minor()
                .and_then(|line_total| acc.checked_add(line_total))
                .ok_or(TotalPriceError::Overflow)
        })?;

    Ok(Money::from_minor(total, currency))
}
