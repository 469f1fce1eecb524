//! Coupon Fixtures

use jiff::Timestamp;
use rust_decimal::Decimal;
use rusty_money::Money;
use serde::Deserialize;

use crate::{
    coupons::{Coupon, CouponKind},
    fixtures::{FixtureError, parse_price},
};

/// Wrapper for coupons in YAML
#[derive(Debug, Deserialize)]
pub struct CouponsFixture {
    /// Coupons in display order
    pub coupons: Vec<CouponFixture>,
}

/// Discount shape from YAML fixtures
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CouponKindFixture {
    /// Percent off, in points (e.g., 10 for 10%)
    Percent {
        /// Percent points, clamped to 0..=100
        value: f64,
    },

    /// Fixed amount off (e.g., "5.00 USD")
    Fixed {
        /// Price string
        value: String,
    },
}

/// Coupon Fixture
#[derive(Debug, Deserialize)]
pub struct CouponFixture {
    /// Coupon code
    pub code: String,

    /// Discount shape
    #[serde(flatten)]
    pub kind: CouponKindFixture,

    /// Whether the coupon can be used
    #[serde(default = "active_by_default")]
    pub active: bool,

    /// Minimum subtotal (e.g., "10.00 USD")
    #[serde(default)]
    pub min_subtotal: Option<String>,

    /// Expiry as an RFC 3339 timestamp
    #[serde(default)]
    pub expires_at: Option<Timestamp>,

    /// Total uses allowed; negative values mean no limit
    #[serde(default)]
    pub usage_limit: Option<i64>,

    /// Uses recorded so far
    #[serde(default)]
    pub used_count: Option<i64>,

    /// Uses allowed per restaurant; negative values mean no limit
    #[serde(default)]
    pub per_restaurant_limit: Option<i64>,

    /// Restaurant scope; empty means global
    #[serde(default)]
    pub restaurant_ids: Vec<String>,

    /// Customer facing description
    #[serde(default)]
    pub description: Option<String>,

    /// Admin note
    #[serde(default)]
    pub note: Option<String>,
}

fn active_by_default() -> bool {
    true
}

fn count(value: Option<i64>) -> Option<u32> {
    value.and_then(|value| u32::try_from(value).ok())
}

impl TryFrom<CouponKindFixture> for CouponKind<'_> {
    type Error = FixtureError;

    fn try_from(fixture: CouponKindFixture) -> Result<Self, Self::Error> {
        match fixture {
            CouponKindFixture::Percent { value } => {
                let points = Decimal::try_from(value)
                    .map_err(|_err| FixtureError::InvalidPercentage(value.to_string()))?;

                Ok(CouponKind::percent(points))
            }
            CouponKindFixture::Fixed { value } => {
                let (minor_units, currency) = parse_price(&value)?;

                Ok(CouponKind::fixed(Money::from_minor(minor_units, currency)))
            }
        }
    }
}

impl TryFrom<CouponFixture> for Coupon<'_> {
    type Error = FixtureError;

    fn try_from(fixture: CouponFixture) -> Result<Self, Self::Error> {
        let mut coupon = Coupon::new(fixture.code, fixture.kind.try_into()?)
            .with_active(fixture.active)
            .scoped_to(fixture.restaurant_ids);

        if let Some(min_subtotal) = fixture.min_subtotal {
            let (minor_units, currency) = parse_price(&min_subtotal)?;

            coupon = coupon.with_min_subtotal(Money::from_minor(minor_units, currency));
        }

        coupon.expires_at = fixture.expires_at;
        coupon.usage_limit = count(fixture.usage_limit);
        coupon.used_count = count(fixture.used_count).unwrap_or_default();
        coupon.per_restaurant_limit = count(fixture.per_restaurant_limit);
        coupon.description = fixture.description;
        coupon.note = fixture.note;

        Ok(coupon)
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::USD;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn parses_percent_coupon_with_defaults() -> TestResult {
        let yaml = "
code: welcome10
type: percent
value: 10
min_subtotal: 10.00 USD
";

        let fixture: CouponFixture = serde_norway::from_str(yaml)?;
        let coupon = Coupon::try_from(fixture)?;

        assert_eq!(coupon.code, "welcome10");
        assert_eq!(coupon.code_key(), "WELCOME10");
        assert_eq!(coupon.percent_points(), Some(Decimal::from(10)));
        assert_eq!(coupon.min_subtotal, Some(Money::from_minor(10_00, USD)));
        assert!(coupon.active);
        assert!(!coupon.is_scoped());

        Ok(())
    }

    #[test]
    fn normalises_out_of_range_values() -> TestResult {
        let yaml = "
code: BIG
type: percent
value: 150
usage_limit: -1
used_count: 3
restaurant_ids: ['', r1]
";

        let fixture: CouponFixture = serde_norway::from_str(yaml)?;
        let coupon = Coupon::try_from(fixture)?;

        assert_eq!(coupon.percent_points(), Some(Decimal::ONE_HUNDRED));
        assert_eq!(coupon.usage_limit, None);
        assert_eq!(coupon.used_count, 3);
        assert_eq!(coupon.restaurant_ids, ["r1"]);

        Ok(())
    }

    #[test]
    fn parses_fixed_coupon_with_expiry() -> TestResult {
        let yaml = "
code: SAVE5
type: fixed
value: 5.00 USD
expires_at: 2099-12-31T23:59:59Z
active: false
";

        let fixture: CouponFixture = serde_norway::from_str(yaml)?;
        let coupon = Coupon::try_from(fixture)?;

        assert_eq!(coupon.kind, CouponKind::Fixed(Money::from_minor(5_00, USD)));
        assert!(coupon.expires_at.is_some());
        assert!(!coupon.active);

        Ok(())
    }

    #[test]
    fn rejects_unknown_kind() {
        let yaml = "
code: ODD
type: bogo
value: 1
";

        assert!(serde_norway::from_str::<CouponFixture>(yaml).is_err());
    }
}
