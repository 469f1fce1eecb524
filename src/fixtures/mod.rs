//! Fixtures
//!
//! YAML seed data for coupons, carts and subscriptions, used by the CLI and
//! tests in place of the ordering backend.

use std::{
    fs,
    path::{Path, PathBuf},
};

use rust_decimal::{Decimal, prelude::ToPrimitive};
use rusty_money::iso::{self, Currency};
use thiserror::Error;

use crate::{
    cart::{Cart, CartError},
    coupons::store::{CouponStoreError, InMemoryCouponStore},
    subscriptions::Subscription,
};

pub mod carts;
pub mod coupons;
pub mod subscriptions;

/// Fixture Parsing Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading fixture files
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Invalid price format
    #[error("Invalid price format: {0}")]
    InvalidPrice(String),

    /// Invalid percentage value
    #[error("Invalid percentage: {0}")]
    InvalidPercentage(String),

    /// Unknown currency code
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),

    /// Line quantity of zero
    #[error("Line {0} has a quantity of zero")]
    ZeroQuantity(String),

    /// Lines priced in more than one currency
    #[error("Currency mismatch: expected {0}, found {1}")]
    CurrencyMismatch(String, String),

    /// Cart construction error
    #[error("Failed to create cart: {0}")]
    Cart(#[from] CartError),

    /// Coupon seed error
    #[error("Failed to seed coupons: {0}")]
    Coupons(#[from] CouponStoreError),
}

/// Fixture loader rooted at a directory of YAML files.
#[derive(Debug, Clone)]
pub struct Fixture {
    /// Base path for fixture files
    base_path: PathBuf,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    /// Create a loader for `./fixtures`
    pub fn new() -> Self {
        Self::with_base_path("./fixtures")
    }

    /// Create a loader with custom base path
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Base path for fixture files
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Load a coupon set into a fresh store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, a coupon is
    /// malformed, or two coupons share a code.
    pub fn load_coupons(&self, set: &str) -> Result<InMemoryCouponStore<'static>, FixtureError> {
        let fixture: coupons::CouponsFixture = self.read("coupons", set)?;

        let coupons = fixture
            .coupons
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(InMemoryCouponStore::with_coupons(coupons)?)
    }

    /// Load a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or a line is
    /// malformed.
    pub fn load_cart(&self, name: &str) -> Result<Cart<'static>, FixtureError> {
        let fixture: carts::CartFixture = self.read("carts", name)?;

        fixture.try_into()
    }

    /// Load a subscription snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or an amount is
    /// malformed.
    pub fn load_subscription(&self, name: &str) -> Result<Subscription<'static>, FixtureError> {
        let fixture: subscriptions::SubscriptionFixture = self.read("subscriptions", name)?;

        fixture.try_into()
    }

    fn read<T: serde::de::DeserializeOwned>(
        &self,
        kind: &str,
        name: &str,
    ) -> Result<T, FixtureError> {
        let file_path = self.base_path.join(kind).join(format!("{name}.yml"));
        let contents = fs::read_to_string(&file_path)?;

        Ok(serde_norway::from_str(&contents)?)
    }
}

/// Look up an ISO currency by code, ignoring case.
pub fn find_currency(code: &str) -> Option<&'static Currency> {
    iso::find(&code.trim().to_uppercase())
}

/// Parse price string (e.g., "2.99 USD") into minor units and currency
///
/// # Errors
///
/// Returns an error if the string is not in the format "AMOUNT CURRENCY",
/// if the amount cannot be parsed as a decimal, or if the currency code
/// is not recognized.
pub fn parse_price(s: &str) -> Result<(i64, &'static Currency), FixtureError> {
    let parts: Vec<&str> = s.split_whitespace().collect();

    let [amount, currency_code] = parts.as_slice() else {
        return Err(FixtureError::InvalidPrice(format!(
            "Expected format 'AMOUNT CURRENCY', got: {s}"
        )));
    };

    let amount = amount
        .parse::<Decimal>()
        .map_err(|_err| FixtureError::InvalidPrice(s.to_string()))?;

    let minor_units = amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|value| value.round_dp(0).to_i64())
        .ok_or_else(|| FixtureError::InvalidPrice(s.to_string()))?;

    let currency = find_currency(currency_code)
        .ok_or_else(|| FixtureError::UnknownCurrency((*currency_code).to_string()))?;

    Ok((minor_units, currency))
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::{EUR, USD};
    use testresult::TestResult;

    use super::*;

    #[test]
    fn parse_price_reads_amount_and_currency() -> TestResult {
        assert_eq!(parse_price("2.99 USD")?, (2_99, USD));
        assert_eq!(parse_price("10 eur")?, (10_00, EUR));

        Ok(())
    }

    #[test]
    fn parse_price_rejects_bad_input() {
        assert!(matches!(
            parse_price("2.99"),
            Err(FixtureError::InvalidPrice(_))
        ));
        assert!(matches!(
            parse_price("abc USD"),
            Err(FixtureError::InvalidPrice(_))
        ));
        assert!(matches!(
            parse_price("1.00 XXQ"),
            Err(FixtureError::UnknownCurrency(_))
        ));
    }
}
