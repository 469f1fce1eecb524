//! Subscription Fixtures

use rust_decimal::Decimal;
use rusty_money::Money;
use serde::Deserialize;

use crate::{
    fixtures::{FixtureError, parse_price},
    money::{self, percentage_from_points},
    subscriptions::{Subscription, SubscriptionStatus},
};

/// Subscription Fixture
#[derive(Debug, Deserialize)]
pub struct SubscriptionFixture {
    /// Subscribed plan
    #[serde(default)]
    pub plan_id: Option<String>,

    /// Lifecycle state
    #[serde(default)]
    pub status: SubscriptionStatus,

    /// VIP discount in percent points
    #[serde(default)]
    pub discount_percent: f64,

    /// Whether delivery is waived while active
    #[serde(default)]
    pub free_delivery_eligible: bool,

    /// Remaining meal-plan credits (e.g., "20.00 USD")
    pub meal_plan_credits_remaining: String,
}

impl TryFrom<SubscriptionFixture> for Subscription<'_> {
    type Error = FixtureError;

    fn try_from(fixture: SubscriptionFixture) -> Result<Self, Self::Error> {
        let points = Decimal::try_from(fixture.discount_percent)
            .map_err(|_err| FixtureError::InvalidPercentage(fixture.discount_percent.to_string()))?;

        let (minor_units, currency) = parse_price(&fixture.meal_plan_credits_remaining)?;

        Ok(Subscription {
            plan_id: fixture.plan_id,
            status: fixture.status,
            discount_percent: percentage_from_points(points),
            free_delivery_eligible: fixture.free_delivery_eligible,
            meal_plan_credits_remaining: money::non_negative(Money::from_minor(
                minor_units,
                currency,
            )),
        })
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::USD;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn parses_active_subscription() -> TestResult {
        let yaml = "
plan_id: vip
status: active
discount_percent: 10
free_delivery_eligible: true
meal_plan_credits_remaining: 20.00 USD
";

        let fixture: SubscriptionFixture = serde_norway::from_str(yaml)?;
        let subscription = Subscription::try_from(fixture)?;

        assert!(subscription.is_active());
        assert!(subscription.has_free_delivery());
        assert_eq!(
            subscription.vip_discount(Money::from_minor(30_00, USD)),
            Money::from_minor(3_00, USD)
        );
        assert_eq!(
            subscription.meal_plan_credits_remaining,
            Money::from_minor(20_00, USD)
        );

        Ok(())
    }

    #[test]
    fn past_due_and_negative_credits() -> TestResult {
        let yaml = "
status: past_due
meal_plan_credits_remaining: -5.00 USD
";

        let fixture: SubscriptionFixture = serde_norway::from_str(yaml)?;
        let subscription = Subscription::try_from(fixture)?;

        assert_eq!(subscription.status, SubscriptionStatus::PastDue);
        assert!(!subscription.is_active());
        assert_eq!(
            subscription.meal_plan_credits_remaining,
            Money::from_minor(0, USD)
        );

        Ok(())
    }
}
