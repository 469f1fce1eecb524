//! Coupon Store
//!
//! Coupon lookup and usage bookkeeping. The in-memory store doubles as the mock
//! backend used when no coupon service is configured.

use jiff::Timestamp;
use rustc_hash::FxHashMap;
use rusty_money::{Money, iso::Currency};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::coupons::{Coupon, CouponContext, CouponKind, RestaurantUsage, code_key};

/// Coupon store errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CouponStoreError {
    /// A coupon with the same code already exists.
    #[error("coupon code already exists: {0}")]
    DuplicateCode(String),

    /// No coupon exists for the code.
    #[error("coupon not found: {0}")]
    NotFound(String),

    /// The coupon's global usage limit is already reached.
    #[error("coupon usage limit reached: {0}")]
    LimitReached(String),

    /// The coupon's usage limit for the restaurant is already reached.
    #[error("coupon usage limit reached for restaurant {restaurant_id}: {code}")]
    RestaurantLimitReached {
        /// Coupon code
        code: String,

        /// Restaurant the order was placed with
        restaurant_id: String,
    },
}

/// Coupon store consumed by the pricing engine.
pub trait CouponStore<'a>: RestaurantUsage {
    /// Find a coupon by code, ignoring case and surrounding whitespace.
    fn find_by_code(&self, code: &str) -> Option<Coupon<'a>>;

    /// Record one use of `coupon` for the order described by `context`.
    ///
    /// Limits are checked against the stored counters, not the caller's
    /// snapshot, and nothing is recorded when a limit is already reached.
    /// Only called after an order commits; never while previewing totals.
    ///
    /// # Errors
    ///
    /// Returns an error if the coupon is unknown to the store or a usage limit
    /// is already reached.
    fn record_usage(
        &mut self,
        coupon: &Coupon<'a>,
        context: &CouponContext<'a>,
    ) -> Result<(), CouponStoreError>;
}

/// Partial update applied to a stored coupon. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct CouponPatch<'a> {
    /// New active flag
    pub active: Option<bool>,

    /// New discount type and value
    pub kind: Option<CouponKind<'a>>,

    /// New minimum subtotal (`Some(None)` clears it)
    pub min_subtotal: Option<Option<Money<'a, Currency>>>,

    /// New expiry (`Some(None)` clears it)
    pub expires_at: Option<Option<Timestamp>>,

    /// New global usage limit (`Some(None)` clears it)
    pub usage_limit: Option<Option<u32>>,

    /// New per-restaurant limit (`Some(None)` clears it)
    pub per_restaurant_limit: Option<Option<u32>>,

    /// New restaurant scope
    pub restaurant_ids: Option<Vec<String>>,

    /// New description
    pub description: Option<Option<String>>,
}

impl<'a> CouponPatch<'a> {
    fn apply_to(self, coupon: &mut Coupon<'a>) {
        if let Some(active) = self.active {
            coupon.active = active;
        }
        if let Some(kind) = self.kind {
            coupon.kind = match kind {
                CouponKind::Percent(percent) => CouponKind::Percent(percent),
                CouponKind::Fixed(amount) => CouponKind::fixed(amount),
            };
        }
        if let Some(min_subtotal) = self.min_subtotal {
            coupon.min_subtotal = min_subtotal;
        }
        if let Some(expires_at) = self.expires_at {
            coupon.expires_at = expires_at;
        }
        if let Some(usage_limit) = self.usage_limit {
            coupon.usage_limit = usage_limit;
        }
        if let Some(limit) = self.per_restaurant_limit {
            coupon.per_restaurant_limit = limit;
        }
        if let Some(restaurant_ids) = self.restaurant_ids {
            coupon.restaurant_ids = restaurant_ids
                .into_iter()
                .filter(|id| !id.is_empty())
                .collect();
        }
        if let Some(description) = self.description {
            coupon.description = description;
        }
    }
}

/// An optimistic update that has been applied locally but not yet confirmed.
///
/// Holds the snapshot taken before the change so it can be restored.
#[derive(Debug)]
#[must_use = "a pending update must be committed or rolled back"]
pub struct PendingUpdate<'a> {
    previous: Coupon<'a>,
    updated: Coupon<'a>,
}

/// Final state of an optimistic update.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome<'a> {
    /// The update was confirmed and remains applied.
    Committed(Coupon<'a>),

    /// The update was rejected and the previous snapshot restored.
    RolledBack(Coupon<'a>),
}

impl<'a> PendingUpdate<'a> {
    /// Coupon as it was before the update.
    pub fn previous(&self) -> &Coupon<'a> {
        &self.previous
    }

    /// Coupon as it is now, optimistically.
    pub fn updated(&self) -> &Coupon<'a> {
        &self.updated
    }

    /// Keep the update.
    pub fn commit(self) -> UpdateOutcome<'a> {
        UpdateOutcome::Committed(self.updated)
    }

    /// Restore the snapshot taken before the update.
    pub fn rollback(self, store: &mut InMemoryCouponStore<'a>) -> UpdateOutcome<'a> {
        let key = self.previous.code_key();

        if let Some(slot) = store.coupons.get_mut(&key) {
            *slot = self.previous.clone();
        } else {
            store.order.push(key.clone());
            store.coupons.insert(key, self.previous.clone());
        }

        debug!(code = %self.previous.code, "coupon update rolled back");

        UpdateOutcome::RolledBack(self.previous)
    }
}

/// In-memory coupon store keyed by normalised code.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCouponStore<'a> {
    coupons: FxHashMap<String, Coupon<'a>>,
    order: Vec<String>,
    restaurant_usage: FxHashMap<String, u32>,
}

impl<'a> InMemoryCouponStore<'a> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with `coupons`, keeping their usage counts.
    ///
    /// # Errors
    ///
    /// Returns [`CouponStoreError::DuplicateCode`] if two coupons share a code.
    pub fn with_coupons(
        coupons: impl IntoIterator<Item = Coupon<'a>>,
    ) -> Result<Self, CouponStoreError> {
        let mut store = Self::new();

        for coupon in coupons {
            store.insert(coupon)?;
        }

        Ok(store)
    }

    /// All coupons in insertion order.
    pub fn list(&self) -> Vec<&Coupon<'a>> {
        self.order
            .iter()
            .filter_map(|key| self.coupons.get(key))
            .collect()
    }

    /// Create a coupon. Usage starts at zero.
    ///
    /// # Errors
    ///
    /// Returns [`CouponStoreError::DuplicateCode`] if the code is taken.
    pub fn create(&mut self, mut coupon: Coupon<'a>) -> Result<&Coupon<'a>, CouponStoreError> {
        coupon.used_count = 0;

        let key = self.insert(coupon)?;

        self.coupons
            .get(&key)
            .ok_or(CouponStoreError::NotFound(key))
    }

    /// Apply `patch` to the coupon with `code`.
    ///
    /// # Errors
    ///
    /// Returns [`CouponStoreError::NotFound`] if no coupon has the code.
    pub fn update(
        &mut self,
        code: &str,
        patch: CouponPatch<'a>,
    ) -> Result<Coupon<'a>, CouponStoreError> {
        let coupon = self
            .coupons
            .get_mut(&code_key(code))
            .ok_or_else(|| CouponStoreError::NotFound(code.to_string()))?;

        patch.apply_to(coupon);

        Ok(coupon.clone())
    }

    /// Enable or disable a coupon.
    ///
    /// # Errors
    ///
    /// Returns [`CouponStoreError::NotFound`] if no coupon has the code.
    pub fn toggle(&mut self, code: &str, active: bool) -> Result<Coupon<'a>, CouponStoreError> {
        self.update(
            code,
            CouponPatch {
                active: Some(active),
                ..CouponPatch::default()
            },
        )
    }

    /// Apply `patch` optimistically, keeping a snapshot for rollback.
    ///
    /// # Errors
    ///
    /// Returns [`CouponStoreError::NotFound`] if no coupon has the code.
    pub fn begin_update(
        &mut self,
        code: &str,
        patch: CouponPatch<'a>,
    ) -> Result<PendingUpdate<'a>, CouponStoreError> {
        let previous = self
            .coupons
            .get(&code_key(code))
            .cloned()
            .ok_or_else(|| CouponStoreError::NotFound(code.to_string()))?;

        let updated = self.update(code, patch)?;

        Ok(PendingUpdate { previous, updated })
    }

    fn insert(&mut self, coupon: Coupon<'a>) -> Result<String, CouponStoreError> {
        let key = coupon.code_key();

        if self.coupons.contains_key(&key) {
            return Err(CouponStoreError::DuplicateCode(coupon.code));
        }

        self.order.push(key.clone());
        self.coupons.insert(key.clone(), coupon);

        Ok(key)
    }
}

impl RestaurantUsage for InMemoryCouponStore<'_> {
    fn restaurant_usage(&self, code: &str, restaurant_id: &str) -> u32 {
        self.restaurant_usage
            .get(&usage_key(code, restaurant_id))
            .copied()
            .unwrap_or_default()
    }
}

impl<'a> CouponStore<'a> for InMemoryCouponStore<'a> {
    fn find_by_code(&self, code: &str) -> Option<Coupon<'a>> {
        if code.trim().is_empty() {
            return None;
        }

        self.coupons.get(&code_key(code)).cloned()
    }

    fn record_usage(
        &mut self,
        coupon: &Coupon<'a>,
        context: &CouponContext<'a>,
    ) -> Result<(), CouponStoreError> {
        let key = coupon.code_key();
        let restaurant_id = context.cart_restaurant_ids().first();

        let stored = self
            .coupons
            .get_mut(&key)
            .ok_or_else(|| CouponStoreError::NotFound(coupon.code.clone()))?;

        if let Some(limit) = stored.usage_limit
            && stored.used_count >= limit
        {
            warn!(code = %stored.code, limit, "coupon usage limit reached at commit");

            return Err(CouponStoreError::LimitReached(stored.code.clone()));
        }

        if let Some(limit) = stored.per_restaurant_limit.filter(|limit| *limit > 0)
            && let Some(restaurant_id) = restaurant_id
            && self
                .restaurant_usage
                .get(&usage_key(&key, restaurant_id))
                .is_some_and(|used| *used >= limit)
        {
            warn!(
                code = %stored.code,
                restaurant_id,
                limit,
                "restaurant usage limit reached at commit"
            );

            return Err(CouponStoreError::RestaurantLimitReached {
                code: stored.code.clone(),
                restaurant_id: restaurant_id.clone(),
            });
        }

        stored.used_count = stored.used_count.saturating_add(1);

        if let Some(restaurant_id) = restaurant_id {
            let counter = self
                .restaurant_usage
                .entry(usage_key(&key, restaurant_id))
                .or_default();

            *counter = counter.saturating_add(1);
        }

        info!(code = %coupon.code, used_count = stored.used_count, "coupon usage recorded");

        Ok(())
    }
}

/// Per-restaurant usage key: `CODE|restaurant_id`.
fn usage_key(code: &str, restaurant_id: &str) -> String {
    format!("{}|{restaurant_id}", code_key(code))
}
