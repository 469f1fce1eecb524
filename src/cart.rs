//! Cart

use rusty_money::{Money, iso::Currency};
use smallvec::SmallVec;
use thiserror::Error;

use crate::{
    coupons::CouponContext,
    items::LineItem,
    pricing::{TotalPriceError, subtotal},
};

/// Errors related to cart construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    /// A line's currency differs from the cart currency (index, line currency, cart currency).
    #[error("Line {0} has currency {1}, but cart has currency {2}")]
    CurrencyMismatch(usize, &'static str, &'static str),
}

/// Immutable snapshot of a cart handed to the pricing engine.
#[derive(Debug, Clone)]
pub struct Cart<'a> {
    lines: Vec<LineItem<'a>>,
    currency: &'a Currency,
}

impl<'a> Cart<'a> {
    /// Create an empty cart.
    pub fn new(currency: &'a Currency) -> Self {
        Cart {
            lines: Vec::new(),
            currency,
        }
    }

    /// Create a cart with the given lines.
    ///
    /// # Errors
    ///
    /// Returns a `CartError` if any line is priced in another currency.
    pub fn with_lines(
        lines: impl Into<Vec<LineItem<'a>>>,
        currency: &'a Currency,
    ) -> Result<Self, CartError> {
        let lines = lines.into();

        lines.iter().enumerate().try_for_each(|(i, line)| {
            let line_currency = line.unit_price().currency();
            if line_currency == currency {
                Ok(())
            } else {
                Err(CartError::CurrencyMismatch(
                    i,
                    line_currency.iso_alpha_code,
                    currency.iso_alpha_code,
                ))
            }
        })?;

        Ok(Cart { lines, currency })
    }

    /// Calculate the subtotal of the cart.
    ///
    /// # Errors
    ///
    /// Returns a `TotalPriceError` if the subtotal overflows.
    pub fn subtotal(&self) -> Result<Money<'a, Currency>, TotalPriceError> {
        subtotal(&self.lines, self.currency)
    }

    /// Distinct restaurant ids across all lines, in first-seen order.
    pub fn restaurant_ids(&self) -> SmallVec<[String; 4]> {
        let mut ids: SmallVec<[String; 4]> = SmallVec::new();

        for id in self.lines.iter().filter_map(LineItem::restaurant_id) {
            if !ids.iter().any(|seen| seen == id) {
                ids.push(id.to_string());
            }
        }

        ids
    }

    /// Build the coupon validation context for this cart.
    ///
    /// # Errors
    ///
    /// Returns a `TotalPriceError` if the subtotal overflows.
    pub fn coupon_context(&self) -> Result<CouponContext<'a>, TotalPriceError> {
        Ok(CouponContext::new(self.subtotal()?).with_restaurants(self.restaurant_ids()))
    }

    /// Lines in the cart.
    pub fn lines(&self) -> &[LineItem<'a>] {
        &self.lines
    }

    /// Get the number of lines in the cart.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Check if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Get the currency of the cart.
    pub fn currency(&self) -> &'a Currency {
        self.currency
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use rusty_money::{Money, iso};
    use testresult::TestResult;

    use super::*;

    fn line(id: &str, minor: i64, restaurant: &str) -> LineItem<'static> {
        LineItem::new(id, id, Money::from_minor(minor, iso::USD), NonZeroU32::MIN)
            .at_restaurant(restaurant)
    }

    #[test]
    fn with_lines_currency_mismatch_errors() {
        let lines = [
            LineItem::new("a", "A", Money::from_minor(100, iso::USD), NonZeroU32::MIN),
            LineItem::new("b", "B", Money::from_minor(100, iso::EUR), NonZeroU32::MIN),
        ];

        let result = Cart::with_lines(lines, iso::USD);

        assert_eq!(
            result.map(|cart| cart.len()),
            Err(CartError::CurrencyMismatch(
                1,
                iso::EUR.iso_alpha_code,
                iso::USD.iso_alpha_code
            ))
        );
    }

    #[test]
    fn subtotal_with_lines() -> TestResult {
        let cart = Cart::with_lines([line("a", 100, "r1"), line("b", 250, "r1")], iso::USD)?;

        assert_eq!(cart.subtotal()?, Money::from_minor(350, iso::USD));

        Ok(())
    }

    #[test]
    fn subtotal_with_no_lines() -> TestResult {
        let cart = Cart::new(iso::USD);

        assert!(cart.is_empty());
        assert_eq!(cart.subtotal()?, Money::from_minor(0, iso::USD));

        Ok(())
    }

    #[test]
    fn restaurant_ids_are_unique_in_first_seen_order() -> TestResult {
        let cart = Cart::with_lines(
            [line("a", 100, "r2"), line("b", 100, "r1"), line("c", 100, "r2")],
            iso::USD,
        )?;

        assert_eq!(cart.restaurant_ids().as_slice(), ["r2", "r1"]);

        Ok(())
    }

    #[test]
    fn coupon_context_carries_subtotal_and_restaurants() -> TestResult {
        let cart = Cart::with_lines([line("a", 1000, "r1")], iso::USD)?;

        let context = cart.coupon_context()?;

        assert_eq!(context.subtotal, Money::from_minor(1000, iso::USD));
        assert_eq!(context.cart_restaurant_ids(), ["r1"]);

        Ok(())
    }
}
