//! Tax

use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};

use crate::money::{self, rate_of_minor};

/// Tax on `taxable`, rounded half-up to the cent.
///
/// Negative rates are treated as zero, as are negative taxable amounts.
pub fn compute_tax<'a>(taxable: Money<'a, Currency>, rate: Decimal) -> Money<'a, Currency> {
    let taxable = money::non_negative(taxable);
    let rate = rate.max(Decimal::ZERO);

    Money::from_minor(
        rate_of_minor(rate, taxable.to_minor_units()).max(0),
        taxable.currency(),
    )
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rusty_money::iso::USD;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn tax_applies_rate() -> TestResult {
        let rate = Decimal::from_str("0.08")?;

        assert_eq!(
            compute_tax(Money::from_minor(45_00, USD), rate),
            Money::from_minor(3_60, USD)
        );
        assert_eq!(
            compute_tax(Money::from_minor(7_00, USD), rate),
            Money::from_minor(56, USD)
        );

        Ok(())
    }

    #[test]
    fn tax_rounds_half_up() -> TestResult {
        let rate = Decimal::from_str("0.0825")?;

        // 12.34 * 0.0825 = 1.01805
        assert_eq!(
            compute_tax(Money::from_minor(12_34, USD), rate),
            Money::from_minor(1_02, USD)
        );

        Ok(())
    }

    #[test]
    fn negative_rate_is_zero() -> TestResult {
        let rate = Decimal::from_str("-0.08")?;

        assert_eq!(
            compute_tax(Money::from_minor(45_00, USD), rate),
            Money::from_minor(0, USD)
        );

        Ok(())
    }
}
