//! Subscriptions
//!
//! VIP discounts, free delivery and meal-plan credits granted by an active
//! subscription.

use decimal_percentage::Percentage;
use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};
use serde::Deserialize;
use tracing::info;

use crate::money::{self, percent_of_minor, percentage_from_points};

/// Subscription lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Perks apply
    Active,

    /// Cancelled by the customer
    Canceled,

    /// Never subscribed
    #[default]
    None,

    /// Payment overdue; perks suspended
    PastDue,
}

/// A purchasable plan.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionPlan<'a> {
    /// Plan id
    pub id: String,

    /// Display name
    pub name: String,

    /// Price per billing cycle
    pub price: Money<'a, Currency>,

    /// VIP discount
    pub discount_percent: Percentage,

    /// Whether delivery is waived
    pub free_delivery_eligible: bool,

    /// Meal-plan credits granted per cycle
    pub meal_plan_credits: Money<'a, Currency>,
}

/// Snapshot of a customer's subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct Subscription<'a> {
    /// Subscribed plan
    pub plan_id: Option<String>,

    /// Lifecycle state
    pub status: SubscriptionStatus,

    /// VIP discount applied after coupons
    pub discount_percent: Percentage,

    /// Whether delivery is waived while active
    pub free_delivery_eligible: bool,

    /// Unspent meal-plan credits
    pub meal_plan_credits_remaining: Money<'a, Currency>,
}

impl<'a> Subscription<'a> {
    /// No subscription: no perks.
    pub fn none(currency: &'a Currency) -> Self {
        Self {
            plan_id: None,
            status: SubscriptionStatus::None,
            discount_percent: Percentage::from(Decimal::ZERO),
            free_delivery_eligible: false,
            meal_plan_credits_remaining: Money::from_minor(0, currency),
        }
    }

    /// Active subscription with the given perks.
    pub fn active(
        plan_id: impl Into<String>,
        discount_points: Decimal,
        free_delivery_eligible: bool,
        meal_plan_credits: Money<'a, Currency>,
    ) -> Self {
        Self {
            plan_id: Some(plan_id.into()),
            status: SubscriptionStatus::Active,
            discount_percent: percentage_from_points(discount_points),
            free_delivery_eligible,
            meal_plan_credits_remaining: money::non_negative(meal_plan_credits),
        }
    }

    /// Activate `plan`, granting its full credit allowance.
    pub fn from_plan(plan: &SubscriptionPlan<'a>) -> Self {
        Self {
            plan_id: Some(plan.id.clone()),
            status: SubscriptionStatus::Active,
            discount_percent: plan.discount_percent,
            free_delivery_eligible: plan.free_delivery_eligible,
            meal_plan_credits_remaining: money::non_negative(plan.meal_plan_credits),
        }
    }

    /// Whether perks apply.
    pub fn is_active(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }

    /// Whether delivery is waived.
    pub fn has_free_delivery(&self) -> bool {
        self.is_active() && self.free_delivery_eligible
    }

    /// VIP discount on the post-coupon balance, rounded half-up to the cent.
    ///
    /// Zero unless the subscription is active.
    pub fn vip_discount(&self, after_coupon: Money<'a, Currency>) -> Money<'a, Currency> {
        let after_coupon = money::non_negative(after_coupon);

        if !self.is_active() {
            return Money::from_minor(0, after_coupon.currency());
        }

        let discount = percent_of_minor(self.discount_percent, after_coupon.to_minor_units());

        money::min(
            after_coupon,
            Money::from_minor(discount.max(0), after_coupon.currency()),
        )
    }

    /// Credits that would be applied against `balance`, without consuming them.
    pub fn available_credits(&self, balance: Money<'a, Currency>) -> Money<'a, Currency> {
        let balance = money::non_negative(balance);

        if !self.is_active() || self.meal_plan_credits_remaining.to_minor_units() <= 0 {
            return Money::from_minor(0, balance.currency());
        }

        money::min(
            Money::from_minor(
                self.meal_plan_credits_remaining.to_minor_units(),
                balance.currency(),
            ),
            balance,
        )
    }

    /// Consume credits against `requested`, returning the amount applied.
    ///
    /// Not idempotent: every call spends credits.
    pub fn consume_meal_credits(&mut self, requested: Money<'a, Currency>) -> Money<'a, Currency> {
        let applied = self.available_credits(requested);

        self.meal_plan_credits_remaining =
            money::saturating_sub(self.meal_plan_credits_remaining, applied);

        applied
    }
}

/// Subscription state consumed by the pricing engine.
pub trait SubscriptionStore<'a> {
    /// Current subscription snapshot.
    fn subscription(&self) -> &Subscription<'a>;

    /// Spend meal-plan credits against `requested`, returning the amount applied.
    ///
    /// Not idempotent; only called when an order commits.
    fn consume_meal_credits(&mut self, requested: Money<'a, Currency>) -> Money<'a, Currency>;
}

/// In-memory subscription store for a single customer.
#[derive(Debug, Clone)]
pub struct InMemorySubscriptionStore<'a> {
    subscription: Subscription<'a>,
}

impl<'a> InMemorySubscriptionStore<'a> {
    /// Create a store holding `subscription`.
    pub fn new(subscription: Subscription<'a>) -> Self {
        Self { subscription }
    }

    /// Subscribe to `plan`, replacing the current subscription.
    pub fn subscribe(&mut self, plan: &SubscriptionPlan<'a>) -> &Subscription<'a> {
        self.subscription = Subscription::from_plan(plan);

        info!(plan = %plan.id, "subscribed");

        &self.subscription
    }

    /// Cancel the current subscription. Perks stop applying immediately.
    pub fn cancel(&mut self) -> &Subscription<'a> {
        if self.subscription.status != SubscriptionStatus::None {
            self.subscription.status = SubscriptionStatus::Canceled;
        }

        &self.subscription
    }
}

impl<'a> SubscriptionStore<'a> for InMemorySubscriptionStore<'a> {
    fn subscription(&self) -> &Subscription<'a> {
        &self.subscription
    }

    fn consume_meal_credits(&mut self, requested: Money<'a, Currency>) -> Money<'a, Currency> {
        let applied = self.subscription.consume_meal_credits(requested);

        info!(
            applied = %applied,
            remaining = %self.subscription.meal_plan_credits_remaining,
            "meal credits consumed"
        );

        applied
    }
}
