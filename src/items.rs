//! Items

use std::num::NonZeroU32;

use rusty_money::{Money, iso::Currency};

/// A single cart line: one menu item ordered `quantity` times.
#[derive(Clone, Debug, PartialEq)]
pub struct LineItem<'a> {
    id: String,
    name: String,
    unit_price: Money<'a, Currency>,
    quantity: NonZeroU32,
    restaurant_id: Option<String>,
}

impl<'a> LineItem<'a> {
    /// Creates a new line item
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        unit_price: Money<'a, Currency>,
        quantity: NonZeroU32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit_price,
            quantity,
            restaurant_id: None,
        }
    }

    /// Attach the restaurant this line was ordered from
    #[must_use]
    pub fn at_restaurant(mut self, restaurant_id: impl Into<String>) -> Self {
        self.restaurant_id = Some(restaurant_id.into());
        self
    }

    /// Menu item id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Price of a single unit
    pub fn unit_price(&self) -> &Money<'a, Currency> {
        &self.unit_price
    }

    /// Number of units ordered
    pub fn quantity(&self) -> NonZeroU32 {
        self.quantity
    }

    /// Restaurant the line belongs to, if known
    pub fn restaurant_id(&self) -> Option<&str> {
        self.restaurant_id.as_deref()
    }

    /// Line total (`unit_price * quantity`) in minor units, or `None` on overflow.
    pub fn line_total_minor(&self) -> Option<i64> {
        self.unit_price
            .to_minor_units()
            .checked_mul(i64::from(self.quantity.get()))
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso;

    use super::*;

    #[test]
    fn line_total_multiplies_by_quantity() {
        let line = LineItem::new(
            "margherita",
            "Margherita",
            Money::from_minor(1250, iso::USD),
            NonZeroU32::MIN.saturating_add(1),
        );

        assert_eq!(line.line_total_minor(), Some(2500));
    }

    #[test]
    fn line_total_overflow_is_none() {
        let line = LineItem::new(
            "gold",
            "Gold Leaf Burger",
            Money::from_minor(i64::MAX, iso::USD),
            NonZeroU32::MIN.saturating_add(1),
        );

        assert_eq!(line.line_total_minor(), None);
    }

    #[test]
    fn restaurant_is_optional() {
        let line = LineItem::new("a", "A", Money::from_minor(100, iso::USD), NonZeroU32::MIN);

        assert_eq!(line.restaurant_id(), None);
        assert_eq!(line.at_restaurant("r1").restaurant_id(), Some("r1"));
    }
}
