//! Preview cache
//!
//! Bounded memo of previewed quotes keyed by everything the pipeline reads.
//! Coupon records are looked up from a store, so entries naming a coupon must be
//! invalidated when that coupon changes.

use std::collections::VecDeque;

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::trace;

use crate::{
    coupons::code_key,
    money::percentage_points,
    subscriptions::SubscriptionStatus,
    totals::{PricingInput, Quote},
};

/// Default number of cached quotes.
pub const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LineKey {
    id: String,
    unit_price: i64,
    quantity: u32,
    restaurant_id: Option<String>,
}

/// Fingerprint of a pricing input.
///
/// Time is keyed to the local minute, which is the finest granularity the
/// delivery policy observes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuoteKey {
    currency: &'static str,
    lines: SmallVec<[LineKey; 8]>,
    coupon_code: Option<String>,
    status: SubscriptionStatus,
    vip_points: Decimal,
    free_delivery: bool,
    credits: i64,
    minute: i64,
    offset_seconds: i32,
}

impl QuoteKey {
    /// Fingerprint `input`.
    pub fn new(input: &PricingInput<'_, '_>) -> Self {
        let subscription = input.subscription;

        Self {
            currency: input.cart.currency().iso_alpha_code,
            lines: input
                .cart
                .lines()
                .iter()
                .map(|line| LineKey {
                    id: line.id().to_string(),
                    unit_price: line.unit_price().to_minor_units(),
                    quantity: line.quantity().get(),
                    restaurant_id: line.restaurant_id().map(str::to_string),
                })
                .collect(),
            coupon_code: input
                .coupon_code
                .map(code_key)
                .filter(|code| !code.is_empty()),
            status: subscription.status,
            vip_points: percentage_points(subscription.discount_percent),
            free_delivery: subscription.free_delivery_eligible,
            credits: subscription.meal_plan_credits_remaining.to_minor_units(),
            minute: input.now.timestamp().as_second().div_euclid(60),
            offset_seconds: input.now.offset().seconds(),
        }
    }

    /// Normalised coupon code in the key.
    pub fn coupon_code(&self) -> Option<&str> {
        self.coupon_code.as_deref()
    }
}

/// Bounded first-in first-out cache of previewed quotes.
///
/// A cache belongs to one pricer; clear it when the pricer's configuration
/// changes.
#[derive(Debug, Clone)]
pub struct PreviewCache<'a> {
    capacity: usize,
    entries: FxHashMap<QuoteKey, Quote<'a>>,
    order: VecDeque<QuoteKey>,
}

impl Default for PreviewCache<'_> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<'a> PreviewCache<'a> {
    /// Create a cache holding at most `capacity` quotes. Zero disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: FxHashMap::default(),
            order: VecDeque::with_capacity(capacity),
        }
    }

    /// Cached quote for `key`.
    pub fn get(&self, key: &QuoteKey) -> Option<&Quote<'a>> {
        self.entries.get(key)
    }

    /// Cache `quote`, evicting the oldest entry when full.
    pub fn insert(&mut self, key: QuoteKey, quote: Quote<'a>) {
        if self.capacity == 0 {
            return;
        }

        if self.entries.insert(key.clone(), quote).is_some() {
            return;
        }

        self.order.push_back(key);

        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    /// Cached quote for `key`, computing and caching it on a miss.
    ///
    /// # Errors
    ///
    /// Returns the error from `compute`; nothing is cached in that case.
    pub fn get_or_insert_with<E>(
        &mut self,
        key: QuoteKey,
        compute: impl FnOnce() -> Result<Quote<'a>, E>,
    ) -> Result<Quote<'a>, E> {
        if let Some(quote) = self.entries.get(&key) {
            trace!("preview cache hit");

            return Ok(quote.clone());
        }

        trace!("preview cache miss");

        let quote = compute()?;

        self.insert(key, quote.clone());

        Ok(quote)
    }

    /// Drop every quote that used `code`. Call after the coupon is edited or
    /// its usage recorded.
    pub fn invalidate_coupon(&mut self, code: &str) {
        let code = code_key(code);

        self.entries
            .retain(|key, _| key.coupon_code() != Some(code.as_str()));
        self.order
            .retain(|key| key.coupon_code() != Some(code.as_str()));
    }

    /// Drop every cached quote.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Number of cached quotes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, num::NonZeroU32};

    use jiff::{Zoned, civil::date, tz::TimeZone};
    use rusty_money::{Money, iso::USD};
    use testresult::TestResult;

    use super::*;
    use crate::{
        cart::Cart,
        coupons::{Coupon, CouponKind, store::InMemoryCouponStore},
        delivery::DeliveryPricingOptions,
        items::LineItem,
        subscriptions::Subscription,
        totals::Pricer,
    };

    fn cart(minor: i64) -> TestResult<Cart<'static>> {
        Ok(Cart::with_lines(
            [LineItem::new("combo", "Combo", Money::from_minor(minor, USD), NonZeroU32::MIN)],
            USD,
        )?)
    }

    fn at(hour: i8, minute: i8, second: i8) -> TestResult<Zoned> {
        Ok(date(2025, 3, 5)
            .at(hour, minute, second, 0)
            .to_zoned(TimeZone::UTC)?)
    }

    fn pricer() -> Pricer<'static> {
        Pricer::new(DeliveryPricingOptions::defaults(USD), Decimal::ZERO)
    }

    #[test]
    fn identical_inputs_hit_the_cache() -> TestResult {
        let cart = cart(20_00)?;
        let now = at(15, 0, 0)?;
        let subscription = Subscription::none(USD);
        let coupons = InMemoryCouponStore::new();
        let pricer = pricer();
        let mut cache = PreviewCache::default();

        let input = PricingInput {
            cart: &cart,
            coupon_code: None,
            subscription: &subscription,
            now: &now,
        };

        let computed = Cell::new(0);

        for _ in 0..3 {
            cache.get_or_insert_with(QuoteKey::new(&input), || {
                computed.set(computed.get() + 1);
                pricer.preview(&input, &coupons)
            })?;
        }

        assert_eq!(computed.get(), 1);
        assert_eq!(cache.len(), 1);

        Ok(())
    }

    #[test]
    fn key_ignores_seconds_but_not_minutes() -> TestResult {
        let cart = cart(20_00)?;
        let subscription = Subscription::none(USD);

        let first = at(11, 29, 5)?;
        let second = at(11, 29, 50)?;
        let third = at(11, 30, 0)?;

        let key = |now: &Zoned| {
            QuoteKey::new(&PricingInput {
                cart: &cart,
                coupon_code: None,
                subscription: &subscription,
                now,
            })
        };

        assert_eq!(key(&first), key(&second));
        assert_ne!(key(&second), key(&third));

        Ok(())
    }

    #[test]
    fn evicts_oldest_when_full() -> TestResult {
        let subscription = Subscription::none(USD);
        let now = at(15, 0, 0)?;
        let coupons = InMemoryCouponStore::new();
        let pricer = pricer();
        let mut cache = PreviewCache::new(2);

        let carts = [cart(1_00)?, cart(2_00)?, cart(3_00)?];

        let keys: Vec<_> = carts
            .iter()
            .map(|cart| {
                let input = PricingInput {
                    cart,
                    coupon_code: None,
                    subscription: &subscription,
                    now: &now,
                };

                cache
                    .get_or_insert_with(QuoteKey::new(&input), || pricer.preview(&input, &coupons))
                    .map(|_| QuoteKey::new(&input))
            })
            .collect::<Result<_, _>>()?;

        assert_eq!(cache.len(), 2);
        assert!(keys.first().is_some_and(|key| cache.get(key).is_none()));
        assert!(keys.last().is_some_and(|key| cache.get(key).is_some()));

        Ok(())
    }

    #[test]
    fn invalidate_coupon_drops_matching_entries() -> TestResult {
        let cart = cart(20_00)?;
        let now = at(15, 0, 0)?;
        let subscription = Subscription::none(USD);
        let coupons = InMemoryCouponStore::with_coupons([Coupon::new(
            "WELCOME10",
            CouponKind::percent(Decimal::from(10)),
        )])?;
        let pricer = pricer();
        let mut cache = PreviewCache::default();

        for code in [Some("welcome10"), None] {
            let input = PricingInput {
                cart: &cart,
                coupon_code: code,
                subscription: &subscription,
                now: &now,
            };

            cache.get_or_insert_with(QuoteKey::new(&input), || pricer.preview(&input, &coupons))?;
        }

        assert_eq!(cache.len(), 2);

        cache.invalidate_coupon("WELCOME10");

        assert_eq!(cache.len(), 1);

        cache.clear();

        assert!(cache.is_empty());

        Ok(())
    }

    #[test]
    fn zero_capacity_never_stores() -> TestResult {
        let cart = cart(20_00)?;
        let now = at(15, 0, 0)?;
        let subscription = Subscription::none(USD);
        let coupons = InMemoryCouponStore::new();
        let pricer = pricer();
        let mut cache = PreviewCache::new(0);

        let input = PricingInput {
            cart: &cart,
            coupon_code: None,
            subscription: &subscription,
            now: &now,
        };

        let quote =
            cache.get_or_insert_with(QuoteKey::new(&input), || pricer.preview(&input, &coupons))?;

        assert_eq!(quote.totals().subtotal, Money::from_minor(20_00, USD));
        assert!(cache.is_empty());

        Ok(())
    }
}
