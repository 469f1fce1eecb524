//! Totals
//!
//! The pricing pipeline. Steps run in a fixed order:
//!
//! 1. subtotal
//! 2. coupon discount
//! 3. VIP discount on the post-coupon balance
//! 4. meal-plan credits on the post-VIP balance
//! 5. tax on the post-credit balance
//! 6. delivery fee, waived for free-delivery subscriptions
//!
//! `total = after_credits + tax + delivery_fee`.
//!
//! [`Pricer::preview`] is pure and may be called as often as the cart changes.
//! [`Quote::commit`] is the only step that mutates stores and takes the quote by
//! value, so a quote can be committed at most once.

use jiff::Zoned;
use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    cache::{PreviewCache, QuoteKey},
    cart::Cart,
    coupons::{
        self, AppliedCoupon, Coupon, CouponContext, CouponRejection,
        store::{CouponStore, CouponStoreError},
    },
    delivery::{DeliveryPricingOptions, compute_delivery_fee},
    money,
    pricing::TotalPriceError,
    subscriptions::{Subscription, SubscriptionStore},
    tax::compute_tax,
};

/// Errors that can occur when committing a quote.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommitError {
    /// Coupon usage could not be recorded.
    #[error(transparent)]
    CouponUsage(#[from] CouponStoreError),
}

/// Everything the pipeline reads for one computation.
#[derive(Debug, Clone, Copy)]
pub struct PricingInput<'a, 'b> {
    /// Cart snapshot
    pub cart: &'b Cart<'a>,

    /// Coupon code entered by the customer
    pub coupon_code: Option<&'b str>,

    /// Subscription snapshot
    pub subscription: &'b Subscription<'a>,

    /// Current local time
    pub now: &'b Zoned,
}

/// Price breakdown for an order. All amounts are non-negative whole cents.
#[derive(Debug, Clone, PartialEq)]
pub struct Totals<'a> {
    /// Sum of line prices
    pub subtotal: Money<'a, Currency>,

    /// Coupon discount plus VIP discount
    pub discount: Money<'a, Currency>,

    /// Tax on the post-credit balance
    pub tax: Money<'a, Currency>,

    /// Delivery fee after any waiver
    pub delivery_fee: Money<'a, Currency>,

    /// Amount charged
    pub total: Money<'a, Currency>,

    /// Coupon part of `discount`
    pub coupon_discount: Money<'a, Currency>,

    /// VIP part of `discount`
    pub vip_discount: Money<'a, Currency>,

    /// Meal-plan credits applied
    pub meal_credits_applied: Money<'a, Currency>,

    /// Why the entered coupon was not applied
    pub coupon_rejection: Option<CouponRejection>,

    /// Whether a subscription waived the delivery fee
    pub delivery_waived: bool,
}

/// Preview of an order's totals, ready to be committed.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote<'a> {
    totals: Totals<'a>,
    coupon: Option<Coupon<'a>>,
    context: CouponContext<'a>,
    after_vip: Money<'a, Currency>,
    tax_rate: Decimal,
}

impl<'a> Quote<'a> {
    /// Previewed totals. Meal credits shown are what would be applied.
    pub fn totals(&self) -> &Totals<'a> {
        &self.totals
    }

    /// Accepted coupon, if any.
    pub fn coupon(&self) -> Option<&Coupon<'a>> {
        self.coupon.as_ref()
    }

    /// Discard the commit capability and keep the totals.
    pub fn into_totals(self) -> Totals<'a> {
        self.totals
    }

    /// Finalise the order.
    ///
    /// Records the coupon's usage, then consumes meal credits against the
    /// post-VIP balance and recomputes tax and total from the amount actually
    /// applied. Credits are only touched once usage recording has succeeded.
    ///
    /// # Errors
    ///
    /// Returns a [`CommitError`] if the coupon store rejects the usage; no
    /// credits are consumed in that case.
    pub fn commit<S, C>(
        self,
        subscriptions: &mut S,
        coupon_store: &mut C,
    ) -> Result<CommittedOrder<'a>, CommitError>
    where
        S: SubscriptionStore<'a> + ?Sized,
        C: CouponStore<'a> + ?Sized,
    {
        if let Some(coupon) = &self.coupon {
            coupon_store.record_usage(coupon, &self.context)?;
        }

        let applied = subscriptions.consume_meal_credits(self.after_vip);
        let after_credits = money::saturating_sub(self.after_vip, applied);
        let tax = compute_tax(after_credits, self.tax_rate);
        let total = grand_total(after_credits, tax, self.totals.delivery_fee);

        let totals = Totals {
            tax,
            total,
            meal_credits_applied: applied,
            ..self.totals
        };

        let credits_remaining = subscriptions.subscription().meal_plan_credits_remaining;

        info!(
            total = %totals.total,
            credits_applied = %applied,
            credits_remaining = %credits_remaining,
            "order committed"
        );

        Ok(CommittedOrder {
            totals,
            coupon: self.coupon,
            credits_remaining,
        })
    }
}

impl<'a> Quote<'a> {
    /// Commit, then drop every quote in `cache` that names this quote's
    /// coupon, since its usage counters have moved.
    ///
    /// The coupon is invalidated even when the commit fails, so a coupon that
    /// ran out between preview and commit is re-evaluated on the next preview.
    ///
    /// # Errors
    ///
    /// Returns a [`CommitError`] under the same conditions as [`Quote::commit`].
    pub fn commit_cached<S, C>(
        self,
        cache: &mut PreviewCache<'a>,
        subscriptions: &mut S,
        coupon_store: &mut C,
    ) -> Result<CommittedOrder<'a>, CommitError>
    where
        S: SubscriptionStore<'a> + ?Sized,
        C: CouponStore<'a> + ?Sized,
    {
        let code = self.coupon.as_ref().map(|coupon| coupon.code.clone());
        let result = self.commit(subscriptions, coupon_store);

        if let Some(code) = code {
            cache.invalidate_coupon(&code);
        }

        result
    }
}

/// Result of a committed order.
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedOrder<'a> {
    /// Authoritative charge breakdown
    pub totals: Totals<'a>,

    /// Coupon whose usage was recorded
    pub coupon: Option<Coupon<'a>>,

    /// Meal-plan credits left after the order
    pub credits_remaining: Money<'a, Currency>,
}

/// Pricing configuration shared by every computation.
#[derive(Debug, Clone, PartialEq)]
pub struct Pricer<'a> {
    delivery: DeliveryPricingOptions<'a>,
    tax_rate: Decimal,
}

impl<'a> Pricer<'a> {
    /// Create a pricer. Negative tax rates are treated as zero.
    pub fn new(delivery: DeliveryPricingOptions<'a>, tax_rate: Decimal) -> Self {
        Self {
            delivery,
            tax_rate: tax_rate.max(Decimal::ZERO),
        }
    }

    /// Delivery fee policy.
    pub fn delivery(&self) -> &DeliveryPricingOptions<'a> {
        &self.delivery
    }

    /// Tax rate as a fraction (`0.08` for 8%).
    pub fn tax_rate(&self) -> Decimal {
        self.tax_rate
    }

    /// Price the order without side effects.
    ///
    /// Coupon problems never fail the preview: the coupon is dropped and the
    /// reason reported in [`Totals::coupon_rejection`].
    ///
    /// # Errors
    ///
    /// Returns a [`TotalPriceError`] if the cart subtotal cannot be computed.
    pub fn preview<C>(
        &self,
        input: &PricingInput<'a, '_>,
        coupon_store: &C,
    ) -> Result<Quote<'a>, TotalPriceError>
    where
        C: CouponStore<'a> + ?Sized,
    {
        let PricingInput {
            cart,
            coupon_code,
            subscription,
            now,
        } = *input;

        let context = cart.coupon_context()?;
        let subtotal = context.subtotal;

        let applied = resolve_coupon(coupon_code, &context, now, coupon_store);

        let after_coupon = money::saturating_sub(subtotal, applied.discount);
        let vip_discount = subscription.vip_discount(after_coupon);
        let after_vip = money::saturating_sub(after_coupon, vip_discount);
        let meal_credits_applied = subscription.available_credits(after_vip);
        let after_credits = money::saturating_sub(after_vip, meal_credits_applied);

        let tax = compute_tax(after_credits, self.tax_rate);

        let unwaived_fee = compute_delivery_fee(now, cart, &self.delivery);
        let delivery_waived = subscription.has_free_delivery() && !cart.is_empty();
        let delivery_fee = if delivery_waived {
            Money::from_minor(0, cart.currency())
        } else {
            unwaived_fee
        };

        let total = grand_total(after_credits, tax, delivery_fee);

        let discount = Money::from_minor(
            applied
                .discount
                .to_minor_units()
                .saturating_add(vip_discount.to_minor_units()),
            cart.currency(),
        );

        debug!(
            subtotal = %subtotal,
            discount = %discount,
            tax = %tax,
            delivery_fee = %delivery_fee,
            total = %total,
            "totals previewed"
        );

        Ok(Quote {
            totals: Totals {
                subtotal,
                discount,
                tax,
                delivery_fee,
                total,
                coupon_discount: applied.discount,
                vip_discount,
                meal_credits_applied,
                coupon_rejection: applied.rejection,
                delivery_waived,
            },
            coupon: applied.coupon,
            context,
            after_vip,
            tax_rate: self.tax_rate,
        })
    }

    /// Preview through `cache`, reusing an earlier quote for identical inputs.
    ///
    /// # Errors
    ///
    /// Returns a [`TotalPriceError`] if the cart subtotal cannot be computed.
    pub fn preview_cached<C>(
        &self,
        cache: &mut PreviewCache<'a>,
        input: &PricingInput<'a, '_>,
        coupon_store: &C,
    ) -> Result<Quote<'a>, TotalPriceError>
    where
        C: CouponStore<'a> + ?Sized,
    {
        cache.get_or_insert_with(QuoteKey::new(input), || self.preview(input, coupon_store))
    }
}

fn resolve_coupon<'a, C>(
    code: Option<&str>,
    context: &CouponContext<'a>,
    now: &Zoned,
    coupon_store: &C,
) -> AppliedCoupon<'a>
where
    C: CouponStore<'a> + ?Sized,
{
    let code = code.map(str::trim).filter(|code| !code.is_empty());

    let Some(code) = code else {
        return coupons::apply(None, context, now.timestamp(), coupon_store);
    };

    match coupon_store.find_by_code(code) {
        Some(coupon) => coupons::apply(Some(&coupon), context, now.timestamp(), coupon_store),
        None => {
            debug!(code, "unknown coupon code");

            AppliedCoupon {
                discount: Money::from_minor(0, context.subtotal.currency()),
                coupon: None,
                rejection: Some(CouponRejection::UnknownCode),
            }
        }
    }
}

fn grand_total<'a>(
    after_credits: Money<'a, Currency>,
    tax: Money<'a, Currency>,
    delivery_fee: Money<'a, Currency>,
) -> Money<'a, Currency> {
    let total = after_credits
        .to_minor_units()
        .saturating_add(tax.to_minor_units())
        .saturating_add(delivery_fee.to_minor_units());

    Money::from_minor(total.max(0), after_credits.currency())
}
