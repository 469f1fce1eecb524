//! Coupons
//!
//! Coupon records, the validation rules that decide whether a coupon may be used
//! for a cart, and the discount a valid coupon grants.

use decimal_percentage::Percentage;
use jiff::Timestamp;
use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};
use smallvec::SmallVec;
use thiserror::Error;
use tracing::debug;

use crate::money::{self, percent_of_minor, percentage_from_points, percentage_points};

pub mod store;

/// How a coupon discounts the subtotal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CouponKind<'a> {
    /// Percentage off the subtotal, held as a fraction in `[0, 1]`.
    Percent(Percentage),

    /// Fixed amount off, never more than the subtotal.
    Fixed(Money<'a, Currency>),
}

impl<'a> CouponKind<'a> {
    /// Percent coupon from points (`10` for 10% off), clamped to `[0, 100]`.
    pub fn percent(points: Decimal) -> Self {
        CouponKind::Percent(percentage_from_points(points))
    }

    /// Fixed amount coupon; negative amounts are clamped to zero.
    pub fn fixed(amount: Money<'a, Currency>) -> Self {
        CouponKind::Fixed(money::non_negative(amount))
    }

    /// Discount granted on `subtotal`.
    ///
    /// Percent coupons round half-up to the cent; fixed coupons are capped at the
    /// subtotal so the post-discount balance never goes negative.
    pub fn discount_on(&self, subtotal: Money<'a, Currency>) -> Money<'a, Currency> {
        let subtotal = money::non_negative(subtotal);

        match self {
            CouponKind::Percent(percent) => Money::from_minor(
                percent_of_minor(*percent, subtotal.to_minor_units()).max(0),
                subtotal.currency(),
            ),
            CouponKind::Fixed(amount) => {
                let amount = Money::from_minor(amount.to_minor_units(), subtotal.currency());

                money::min(subtotal, amount)
            }
        }
    }
}

/// A coupon record.
#[derive(Debug, Clone, PartialEq)]
pub struct Coupon<'a> {
    /// Unique code, matched case-insensitively
    pub code: String,

    /// Discount type and value
    pub kind: CouponKind<'a>,

    /// Disabled coupons are always rejected
    pub active: bool,

    /// Minimum subtotal before tax and fees
    pub min_subtotal: Option<Money<'a, Currency>>,

    /// Last moment the coupon may be used
    pub expires_at: Option<Timestamp>,

    /// Total number of uses allowed across all customers
    pub usage_limit: Option<u32>,

    /// Number of recorded uses
    pub used_count: u32,

    /// Maximum uses per restaurant
    pub per_restaurant_limit: Option<u32>,

    /// Restaurants the coupon is restricted to; empty means global
    pub restaurant_ids: Vec<String>,

    /// Customer facing description
    pub description: Option<String>,

    /// Admin note
    pub note: Option<String>,
}

impl<'a> Coupon<'a> {
    /// Create an active, global, unlimited coupon.
    pub fn new(code: impl Into<String>, kind: CouponKind<'a>) -> Self {
        Self {
            code: code.into().trim().to_string(),
            kind,
            active: true,
            min_subtotal: None,
            expires_at: None,
            usage_limit: None,
            used_count: 0,
            per_restaurant_limit: None,
            restaurant_ids: Vec::new(),
            description: None,
            note: None,
        }
    }

    /// Require a minimum subtotal.
    #[must_use]
    pub fn with_min_subtotal(mut self, min_subtotal: Money<'a, Currency>) -> Self {
        self.min_subtotal = Some(min_subtotal);
        self
    }

    /// Expire the coupon at the given moment.
    #[must_use]
    pub fn expiring_at(mut self, expires_at: Timestamp) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Limit total uses.
    #[must_use]
    pub fn with_usage_limit(mut self, limit: u32) -> Self {
        self.usage_limit = Some(limit);
        self
    }

    /// Limit uses per restaurant.
    #[must_use]
    pub fn with_per_restaurant_limit(mut self, limit: u32) -> Self {
        self.per_restaurant_limit = Some(limit);
        self
    }

    /// Restrict to the given restaurants.
    #[must_use]
    pub fn scoped_to<I, S>(mut self, restaurant_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.restaurant_ids = restaurant_ids
            .into_iter()
            .map(Into::into)
            .filter(|id: &String| !id.is_empty())
            .collect();
        self
    }

    /// Set the active flag.
    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Normalised lookup key for the code.
    pub fn code_key(&self) -> String {
        code_key(&self.code)
    }

    /// Whether the coupon is restricted to specific restaurants.
    pub fn is_scoped(&self) -> bool {
        !self.restaurant_ids.is_empty()
    }

    /// Whether the coupon may be used for `restaurant_id`.
    pub fn covers(&self, restaurant_id: &str) -> bool {
        self.restaurant_ids.iter().any(|id| id == restaurant_id)
    }

    /// Whether the coupon expired before `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|expires_at| now > expires_at)
    }

    /// Discount the coupon grants on `subtotal`, ignoring eligibility.
    pub fn discount_on(&self, subtotal: Money<'a, Currency>) -> Money<'a, Currency> {
        self.kind.discount_on(subtotal)
    }

    /// Percent value in points for percent coupons.
    pub fn percent_points(&self) -> Option<Decimal> {
        match self.kind {
            CouponKind::Percent(percent) => Some(percentage_points(percent)),
            CouponKind::Fixed(_) => None,
        }
    }
}

/// Normalise a coupon code for case-insensitive comparison.
pub fn code_key(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Cart details a coupon is validated against.
#[derive(Debug, Clone, PartialEq)]
pub struct CouponContext<'a> {
    /// Subtotal before taxes and fees
    pub subtotal: Money<'a, Currency>,

    /// Restaurants present in the cart
    pub restaurant_ids: SmallVec<[String; 4]>,

    /// Convenience single restaurant, used when `restaurant_ids` is empty
    pub restaurant_id: Option<String>,
}

impl<'a> CouponContext<'a> {
    /// Context for a cart with no restaurant information.
    pub fn new(subtotal: Money<'a, Currency>) -> Self {
        Self {
            subtotal,
            restaurant_ids: SmallVec::new(),
            restaurant_id: None,
        }
    }

    /// Set the restaurants present in the cart.
    #[must_use]
    pub fn with_restaurants<I, S>(mut self, restaurant_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.restaurant_ids = restaurant_ids.into_iter().map(Into::into).collect();
        self
    }

    /// Set the single restaurant of the cart.
    #[must_use]
    pub fn with_restaurant(mut self, restaurant_id: impl Into<String>) -> Self {
        self.restaurant_id = Some(restaurant_id.into());
        self
    }

    /// Restaurants in the cart: the list when present, otherwise the single id.
    pub fn cart_restaurant_ids(&self) -> &[String] {
        if self.restaurant_ids.is_empty() {
            self.restaurant_id.as_slice()
        } else {
            &self.restaurant_ids
        }
    }
}

/// Why a coupon was rejected. The display text is shown to the customer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CouponRejection {
    /// No coupon exists for the entered code.
    #[error("Invalid coupon code.")]
    UnknownCode,

    /// Coupon is disabled.
    #[error("This coupon is not active.")]
    Inactive,

    /// Coupon expired.
    #[error("This coupon has expired.")]
    Expired,

    /// Subtotal below the coupon minimum.
    #[error("Minimum subtotal of {minimum} required.")]
    MinimumSubtotal {
        /// Formatted minimum subtotal
        minimum: String,
    },

    /// Global usage limit reached.
    #[error("This coupon has reached its usage limit.")]
    UsageLimitReached,

    /// Scoped coupon used on a cart spanning several restaurants.
    #[error(
        "This coupon applies to a specific restaurant and cannot be used for multiple restaurants in the same order."
    )]
    MultipleRestaurants,

    /// Scoped coupon used for a restaurant outside its scope.
    #[error("This coupon is not valid for the selected restaurant.")]
    RestaurantNotEligible,

    /// Per-restaurant usage limit reached.
    #[error("This coupon has reached its usage limit for this restaurant.")]
    RestaurantLimitReached,
}

/// Source of per-restaurant coupon usage counts.
pub trait RestaurantUsage {
    /// Number of recorded uses of `code` for `restaurant_id`.
    fn restaurant_usage(&self, code: &str, restaurant_id: &str) -> u32;
}

/// Usage source for callers that do not track per-restaurant usage.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRestaurantUsage;

impl RestaurantUsage for NoRestaurantUsage {
    fn restaurant_usage(&self, _code: &str, _restaurant_id: &str) -> u32 {
        0
    }
}

/// Check whether `coupon` may be used for the cart described by `context`.
///
/// Rules are checked in a fixed order and the first failure is returned:
/// active, not expired, minimum subtotal, usage limit, restaurant scope,
/// per-restaurant limit.
///
/// # Errors
///
/// Returns the [`CouponRejection`] for the first rule that fails.
pub fn evaluate(
    coupon: &Coupon<'_>,
    context: &CouponContext<'_>,
    now: Timestamp,
    usage: &(impl RestaurantUsage + ?Sized),
) -> Result<(), CouponRejection> {
    if !coupon.active {
        return Err(CouponRejection::Inactive);
    }

    if coupon.is_expired(now) {
        return Err(CouponRejection::Expired);
    }

    if let Some(minimum) = coupon.min_subtotal
        && context.subtotal.to_minor_units() < minimum.to_minor_units()
    {
        return Err(CouponRejection::MinimumSubtotal {
            minimum: minimum.to_string(),
        });
    }

    if let Some(limit) = coupon.usage_limit
        && coupon.used_count >= limit
    {
        return Err(CouponRejection::UsageLimitReached);
    }

    let cart_restaurants = context.cart_restaurant_ids();

    check_scope(coupon, cart_restaurants)?;

    if let Some(limit) = coupon.per_restaurant_limit.filter(|limit| *limit > 0)
        && let Some(restaurant_id) = cart_restaurants.first()
        && usage.restaurant_usage(&coupon.code_key(), restaurant_id) >= limit
    {
        return Err(CouponRejection::RestaurantLimitReached);
    }

    Ok(())
}

fn check_scope(coupon: &Coupon<'_>, cart_restaurants: &[String]) -> Result<(), CouponRejection> {
    if !coupon.is_scoped() {
        return Ok(());
    }

    if cart_restaurants.len() > 1 {
        if cart_restaurants.iter().all(|id| coupon.covers(id)) {
            return Ok(());
        }

        return Err(CouponRejection::MultipleRestaurants);
    }

    match cart_restaurants.first() {
        Some(id) if coupon.covers(id) => Ok(()),
        _ => Err(CouponRejection::RestaurantNotEligible),
    }
}

/// Outcome of applying an optional coupon to a subtotal.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedCoupon<'a> {
    /// Discount granted; zero when the coupon is absent or rejected
    pub discount: Money<'a, Currency>,

    /// The coupon when it was accepted
    pub coupon: Option<Coupon<'a>>,

    /// Reason the coupon was rejected
    pub rejection: Option<CouponRejection>,
}

/// Validate and apply an optional coupon. Rejections degrade to a zero discount.
pub fn apply<'a>(
    coupon: Option<&Coupon<'a>>,
    context: &CouponContext<'a>,
    now: Timestamp,
    usage: &(impl RestaurantUsage + ?Sized),
) -> AppliedCoupon<'a> {
    let zero = Money::from_minor(0, context.subtotal.currency());

    let Some(coupon) = coupon else {
        return AppliedCoupon {
            discount: zero,
            coupon: None,
            rejection: None,
        };
    };

    match evaluate(coupon, context, now, usage) {
        Ok(()) => AppliedCoupon {
            discount: coupon.discount_on(context.subtotal),
            coupon: Some(coupon.clone()),
            rejection: None,
        },
        Err(rejection) => {
            debug!(code = %coupon.code, %rejection, "coupon rejected");

            AppliedCoupon {
                discount: zero,
                coupon: None,
                rejection: Some(rejection),
            }
        }
    }
}
