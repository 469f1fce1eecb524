//! Delivery
//!
//! Delivery fee policy: a base fee plus surcharges for rush hours and
//! weekends, evaluated in the customer's local time.

use jiff::{Zoned, civil::Weekday};
use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};
use tracing::{debug, warn};

use crate::{cart::Cart, money};

mod rush_hours;

pub use rush_hours::{MinuteRange, RushHours};

/// Default rush hour windows.
pub const DEFAULT_RUSH_HOURS: &str = "11:30-14:00,18:00-21:00";

/// Fee components for delivery pricing. All amounts are non-negative.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryPricingOptions<'a> {
    base_fee: Money<'a, Currency>,
    rush_surcharge: Money<'a, Currency>,
    weekend_surcharge: Money<'a, Currency>,
    rush_hours: RushHours,
}

impl<'a> DeliveryPricingOptions<'a> {
    /// Create options, clamping negative amounts to zero.
    pub fn new(
        base_fee: Money<'a, Currency>,
        rush_surcharge: Money<'a, Currency>,
        weekend_surcharge: Money<'a, Currency>,
        rush_hours: RushHours,
    ) -> Self {
        Self {
            base_fee: money::non_negative(base_fee),
            rush_surcharge: money::non_negative(rush_surcharge),
            weekend_surcharge: money::non_negative(weekend_surcharge),
            rush_hours,
        }
    }

    /// Options from decimal amounts in `currency`.
    pub fn from_amounts(
        base_fee: Decimal,
        rush_surcharge: Decimal,
        weekend_surcharge: Decimal,
        rush_hours: &str,
        currency: &'a Currency,
    ) -> Self {
        Self::new(
            money::to_money(base_fee, currency),
            money::to_money(rush_surcharge, currency),
            money::to_money(weekend_surcharge, currency),
            RushHours::parse(rush_hours),
        )
    }

    /// 2.99 base, 1.00 rush, 0.75 weekend, lunch and dinner rush.
    pub fn defaults(currency: &'a Currency) -> Self {
        Self::new(
            Money::from_minor(2_99, currency),
            Money::from_minor(1_00, currency),
            Money::from_minor(75, currency),
            RushHours::parse(DEFAULT_RUSH_HOURS),
        )
    }

    /// Fee charged on every delivery.
    pub fn base_fee(&self) -> Money<'a, Currency> {
        self.base_fee
    }

    /// Added during rush hours.
    pub fn rush_surcharge(&self) -> Money<'a, Currency> {
        self.rush_surcharge
    }

    /// Added on Saturdays and Sundays.
    pub fn weekend_surcharge(&self) -> Money<'a, Currency> {
        self.weekend_surcharge
    }

    /// Rush hour windows.
    pub fn rush_hours(&self) -> &RushHours {
        &self.rush_hours
    }

    /// Currency the fee amounts were configured in.
    pub fn currency(&self) -> &'a Currency {
        self.base_fee.currency()
    }
}

/// Whether `now` falls in a rush hour window.
pub fn is_rush_hour(now: &Zoned, rush_hours: &RushHours) -> bool {
    rush_hours.contains(minute_of_day(now))
}

/// Whether `now` is a Saturday or Sunday.
pub fn is_weekend(now: &Zoned) -> bool {
    matches!(now.weekday(), Weekday::Saturday | Weekday::Sunday)
}

/// Unwaived delivery fee for `cart` at local time `now`.
///
/// An empty cart costs nothing to deliver. Subscription waivers are applied by
/// the totals composer, not here.
///
/// The fee is always charged in the cart's currency. When the options were
/// configured in another currency their amounts are taken as-is in the cart's
/// currency and a warning is logged; no exchange rate is applied.
pub fn compute_delivery_fee<'a>(
    now: &Zoned,
    cart: &Cart<'a>,
    options: &DeliveryPricingOptions<'_>,
) -> Money<'a, Currency> {
    let currency = cart.currency();

    if cart.is_empty() {
        return Money::from_minor(0, currency);
    }

    if options.currency() != currency {
        warn!(
            configured = options.currency().iso_alpha_code,
            cart = currency.iso_alpha_code,
            "delivery fees configured in another currency, charging the same amounts in the cart currency"
        );
    }

    let rush = is_rush_hour(now, options.rush_hours());
    let weekend = is_weekend(now);

    let mut fee = options.base_fee().to_minor_units();

    if rush {
        fee = fee.saturating_add(options.rush_surcharge().to_minor_units());
    }

    if weekend {
        fee = fee.saturating_add(options.weekend_surcharge().to_minor_units());
    }

    debug!(rush, weekend, fee, "delivery fee computed");

    Money::from_minor(fee.max(0), currency)
}

fn minute_of_day(now: &Zoned) -> u16 {
    let minute = i16::from(now.hour()) * 60 + i16::from(now.minute());

    u16::try_from(minute).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use jiff::{civil::date, tz::TimeZone};
    use rusty_money::iso::{EUR, USD};
    use testresult::TestResult;

    use super::*;
    use crate::items::LineItem;

    fn usd(minor: i64) -> Money<'static, Currency> {
        Money::from_minor(minor, USD)
    }

    fn cart() -> TestResult<Cart<'static>> {
        Ok(Cart::with_lines(
            [LineItem::new("burger", "Burger", usd(12_50), NonZeroU32::MIN)],
            USD,
        )?)
    }

    fn lunch_options() -> DeliveryPricingOptions<'static> {
        DeliveryPricingOptions::new(usd(2_99), usd(1_00), usd(75), RushHours::parse("11:30-14:00"))
    }

    // 2025-03-05 is a Wednesday, 2025-03-08 a Saturday.
    fn at(day: i8, hour: i8, minute: i8) -> TestResult<Zoned> {
        Ok(date(2025, 3, day).at(hour, minute, 0, 0).to_zoned(TimeZone::UTC)?)
    }

    #[test]
    fn weekday_rush_adds_rush_surcharge() -> TestResult {
        let fee = compute_delivery_fee(&at(5, 12, 0)?, &cart()?, &lunch_options());

        assert_eq!(fee, usd(3_99));

        Ok(())
    }

    #[test]
    fn weekend_rush_adds_both_surcharges() -> TestResult {
        let fee = compute_delivery_fee(&at(8, 12, 0)?, &cart()?, &lunch_options());

        assert_eq!(fee, usd(4_74));

        Ok(())
    }

    #[test]
    fn off_peak_weekday_is_base_fee() -> TestResult {
        let fee = compute_delivery_fee(&at(5, 15, 0)?, &cart()?, &lunch_options());

        assert_eq!(fee, usd(2_99));

        Ok(())
    }

    #[test]
    fn rush_window_end_is_exclusive() -> TestResult {
        let fee = compute_delivery_fee(&at(5, 14, 0)?, &cart()?, &lunch_options());

        assert_eq!(fee, usd(2_99));

        Ok(())
    }

    #[test]
    fn sunday_counts_as_weekend() -> TestResult {
        let fee = compute_delivery_fee(&at(9, 9, 0)?, &cart()?, &lunch_options());

        assert_eq!(fee, usd(3_74));

        Ok(())
    }

    #[test]
    fn empty_cart_is_free() -> TestResult {
        let fee = compute_delivery_fee(&at(8, 12, 0)?, &Cart::new(USD), &lunch_options());

        assert_eq!(fee, usd(0));

        Ok(())
    }

    #[test]
    fn malformed_rush_hours_skip_surcharge() -> TestResult {
        let options =
            DeliveryPricingOptions::new(usd(2_99), usd(1_00), usd(75), RushHours::parse("noon"));

        let fee = compute_delivery_fee(&at(5, 12, 0)?, &cart()?, &options);

        assert_eq!(fee, usd(2_99));

        Ok(())
    }

    #[test]
    fn negative_components_are_clamped() -> TestResult {
        let options = DeliveryPricingOptions::new(
            usd(-2_99),
            usd(-1_00),
            usd(75),
            RushHours::parse(DEFAULT_RUSH_HOURS),
        );

        assert_eq!(options.base_fee(), usd(0));

        let fee = compute_delivery_fee(&at(8, 12, 0)?, &cart()?, &options);

        assert_eq!(fee, usd(75));

        Ok(())
    }

    #[test]
    fn defaults_match_documented_values() -> TestResult {
        let options = DeliveryPricingOptions::defaults(USD);

        assert_eq!(options.base_fee(), usd(2_99));
        assert_eq!(options.rush_surcharge(), usd(1_00));
        assert_eq!(options.weekend_surcharge(), usd(75));
        assert_eq!(options.rush_hours().ranges().len(), 2);

        // Dinner rush on a weekday.
        assert_eq!(compute_delivery_fee(&at(5, 19, 30)?, &cart()?, &options), usd(3_99));

        Ok(())
    }

    #[test]
    fn fee_is_charged_in_cart_currency() -> TestResult {
        let options = DeliveryPricingOptions::defaults(USD);
        let cart = Cart::with_lines(
            [LineItem::new(
                "crepe",
                "Crepe",
                Money::from_minor(7_25, EUR),
                NonZeroU32::MIN,
            )],
            EUR,
        )?;

        assert_eq!(options.currency(), USD);

        let fee = compute_delivery_fee(&at(8, 12, 0)?, &cart, &options);

        assert_eq!(fee.currency(), EUR);
        assert_eq!(fee, Money::from_minor(4_74, EUR));

        Ok(())
    }
}
