//! Platter prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    cache::{PreviewCache, QuoteKey},
    cart::{Cart, CartError},
    clock::{Clock, FixedClock, SystemClock},
    coupons::{
        AppliedCoupon, Coupon, CouponContext, CouponKind, CouponRejection, NoRestaurantUsage,
        RestaurantUsage,
        store::{
            CouponPatch, CouponStore, CouponStoreError, InMemoryCouponStore, PendingUpdate,
            UpdateOutcome,
        },
    },
    delivery::{DeliveryPricingOptions, RushHours, compute_delivery_fee},
    fixtures::{Fixture, FixtureError},
    items::LineItem,
    money::round2,
    pricing::{TotalPriceError, subtotal},
    receipt::{Receipt, ReceiptError},
    subscriptions::{
        InMemorySubscriptionStore, Subscription, SubscriptionPlan, SubscriptionStatus,
        SubscriptionStore,
    },
    tax::compute_tax,
    totals::{CommitError, CommittedOrder, Pricer, PricingInput, Quote, Totals},
};
