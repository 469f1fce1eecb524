//! Money
//!
//! Canonical rounding for currency values. Every leg of the pricing pipeline works
//! in whole minor units (cents); decimal amounts coming from configuration or
//! fixtures are rounded to two places exactly once, here.

use decimal_percentage::Percentage;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use rusty_money::{Money, iso::Currency};

/// Half a minor unit, used for half-up rounding.
const HALF: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

/// Round a decimal currency amount to two places.
///
/// Midpoints round towards positive infinity (`floor(n * 100 + 0.5) / 100`) and a
/// negative zero result is normalised to `0`.
pub fn round2(amount: Decimal) -> Decimal {
    let cents = round_half_up(amount * Decimal::ONE_HUNDRED);

    normalize_zero(cents / Decimal::ONE_HUNDRED)
}

/// Convert a decimal major-unit amount into whole minor units after rounding.
///
/// Amounts that cannot be represented as `i64` minor units saturate.
pub fn minor_units(amount: Decimal) -> i64 {
    let cents = round_half_up(amount * Decimal::ONE_HUNDRED);

    cents.to_i64().unwrap_or(if cents.is_sign_negative() {
        i64::MIN
    } else {
        i64::MAX
    })
}

/// Build a money value from a decimal major-unit amount, rounded to the cent.
pub fn to_money(amount: Decimal, currency: &Currency) -> Money<'_, Currency> {
    Money::from_minor(minor_units(amount), currency)
}

/// Clamp a money value so it never drops below zero.
pub fn non_negative<'a>(money: Money<'a, Currency>) -> Money<'a, Currency> {
    if money.to_minor_units() < 0 {
        Money::from_minor(0, money.currency())
    } else {
        money
    }
}

/// `max(0, a - b)` in minor units.
pub fn saturating_sub<'a>(a: Money<'a, Currency>, b: Money<'a, Currency>) -> Money<'a, Currency> {
    let diff = a.to_minor_units().saturating_sub(b.to_minor_units());

    Money::from_minor(diff.max(0), a.currency())
}

/// The smaller of two money values.
pub fn min<'a>(a: Money<'a, Currency>, b: Money<'a, Currency>) -> Money<'a, Currency> {
    if b.to_minor_units() < a.to_minor_units() {
        b
    } else {
        a
    }
}

/// Apply a fractional percentage to a minor unit amount, rounding half-up to a
/// whole minor unit.
pub fn percent_of_minor(percent: Percentage, minor: i64) -> i64 {
    let applied = percent * Decimal::from(minor);

    round_half_up(applied).to_i64().unwrap_or_default()
}

/// Multiply a minor unit amount by a decimal rate, rounding half-up to a whole
/// minor unit.
pub fn rate_of_minor(rate: Decimal, minor: i64) -> i64 {
    Decimal::from(minor)
        .checked_mul(rate)
        .map(round_half_up)
        .and_then(|applied| applied.to_i64())
        .unwrap_or_default()
}

/// Convert a percentage expressed in points (`10` for 10%) into a fractional
/// [`Percentage`], clamped to `[0, 100]`.
pub fn percentage_from_points(points: Decimal) -> Percentage {
    let clamped = points.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);

    Percentage::from(clamped / Decimal::ONE_HUNDRED)
}

/// Express a fractional percentage in points (`0.1` becomes `10`).
pub fn percentage_points(percent: Percentage) -> Decimal {
    (percent * Decimal::ONE_HUNDRED).normalize()
}

fn round_half_up(value: Decimal) -> Decimal {
    normalize_zero((value + HALF).floor())
}

fn normalize_zero(value: Decimal) -> Decimal {
    if value.is_zero() { Decimal::ZERO } else { value }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rusty_money::iso::USD;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn round2_rounds_to_nearest_cent() -> TestResult {
        assert_eq!(round2(Decimal::from_str("1.234")?), Decimal::from_str("1.23")?);
        assert_eq!(round2(Decimal::from_str("1.235")?), Decimal::from_str("1.24")?);
        assert_eq!(round2(Decimal::from_str("2.999")?), Decimal::from_str("3.00")?);

        Ok(())
    }

    #[test]
    fn round2_never_returns_negative_zero() -> TestResult {
        let rounded = round2(Decimal::from_str("-0.001")?);

        assert_eq!(rounded, Decimal::ZERO);
        assert!(!rounded.is_sign_negative(), "expected positive zero");

        let midpoint = round2(Decimal::from_str("-0.005")?);

        assert!(!midpoint.is_sign_negative(), "expected positive zero");

        Ok(())
    }

    #[test]
    fn round2_midpoint_on_negative_rounds_up() -> TestResult {
        assert_eq!(round2(Decimal::from_str("-1.005")?), Decimal::from_str("-1.00")?);

        Ok(())
    }

    #[test]
    fn minor_units_rounds_before_converting() -> TestResult {
        assert_eq!(minor_units(Decimal::from_str("2.99")?), 299);
        assert_eq!(minor_units(Decimal::from_str("0.745")?), 75);

        Ok(())
    }

    #[test]
    fn to_money_uses_minor_units() -> TestResult {
        assert_eq!(
            to_money(Decimal::from_str("12.345")?, USD),
            Money::from_minor(1235, USD)
        );

        Ok(())
    }

    #[test]
    fn saturating_sub_never_goes_negative() {
        let a = Money::from_minor(300, USD);
        let b = Money::from_minor(500, USD);

        assert_eq!(saturating_sub(a, b), Money::from_minor(0, USD));
        assert_eq!(saturating_sub(b, a), Money::from_minor(200, USD));
    }

    #[test]
    fn non_negative_clamps() {
        assert_eq!(non_negative(Money::from_minor(-5, USD)), Money::from_minor(0, USD));
        assert_eq!(non_negative(Money::from_minor(5, USD)), Money::from_minor(5, USD));
    }

    #[test]
    fn percent_of_minor_rounds_half_up() {
        let percent = percentage_from_points(Decimal::from(10));

        assert_eq!(percent_of_minor(percent, 5000), 500);
        assert_eq!(percent_of_minor(percent, 2705), 271);
        assert_eq!(percent_of_minor(percent, 2704), 270);
    }

    #[test]
    fn rate_of_minor_applies_tax_rate() -> TestResult {
        let rate = Decimal::from_str("0.08")?;

        assert_eq!(rate_of_minor(rate, 4500), 360);
        assert_eq!(rate_of_minor(rate, 700), 56);

        Ok(())
    }

    #[test]
    fn percentage_from_points_clamps_to_range() {
        assert_eq!(
            percentage_points(percentage_from_points(Decimal::from(150))),
            Decimal::ONE_HUNDRED
        );
        assert_eq!(
            percentage_points(percentage_from_points(Decimal::from(-5))),
            Decimal::ZERO
        );
        assert_eq!(
            percentage_points(percentage_from_points(Decimal::from(15))),
            Decimal::from(15)
        );
    }
}
