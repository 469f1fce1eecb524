//! Cart Fixtures

use std::num::NonZeroU32;

use rusty_money::{Money, iso::Currency};
use serde::Deserialize;

use crate::{
    cart::Cart,
    fixtures::{FixtureError, find_currency, parse_price},
    items::LineItem,
};

/// Cart Fixture
#[derive(Debug, Deserialize)]
pub struct CartFixture {
    /// Cart currency; defaults to the currency of the first line
    #[serde(default)]
    pub currency: Option<String>,

    /// Cart lines
    #[serde(default)]
    pub lines: Vec<LineFixture>,
}

/// Line Fixture
#[derive(Debug, Deserialize)]
pub struct LineFixture {
    /// Menu item id
    pub id: String,

    /// Display name
    pub name: String,

    /// Unit price (e.g., "12.50 USD")
    pub price: String,

    /// Units ordered
    #[serde(default = "one")]
    pub quantity: u32,

    /// Restaurant the line was ordered from
    #[serde(default)]
    pub restaurant_id: Option<String>,
}

fn one() -> u32 {
    1
}

impl LineFixture {
    fn into_line(self) -> Result<LineItem<'static>, FixtureError> {
        let (minor_units, currency) = parse_price(&self.price)?;

        let quantity = NonZeroU32::new(self.quantity)
            .ok_or_else(|| FixtureError::ZeroQuantity(self.id.clone()))?;

        let line = LineItem::new(
            self.id,
            self.name,
            Money::from_minor(minor_units, currency),
            quantity,
        );

        Ok(match self.restaurant_id {
            Some(restaurant_id) => line.at_restaurant(restaurant_id),
            None => line,
        })
    }
}

impl TryFrom<CartFixture> for Cart<'static> {
    type Error = FixtureError;

    fn try_from(fixture: CartFixture) -> Result<Self, Self::Error> {
        let lines = fixture
            .lines
            .into_iter()
            .map(LineFixture::into_line)
            .collect::<Result<Vec<_>, _>>()?;

        let currency: &'static Currency = match fixture.currency.as_deref() {
            Some(code) => {
                find_currency(code).ok_or_else(|| FixtureError::UnknownCurrency(code.to_string()))?
            }
            None => lines
                .first()
                .map_or(rusty_money::iso::USD, |line| line.unit_price().currency()),
        };

        if let Some(line) = lines
            .iter()
            .find(|line| line.unit_price().currency() != currency)
        {
            return Err(FixtureError::CurrencyMismatch(
                currency.iso_alpha_code.to_string(),
                line.unit_price().currency().iso_alpha_code.to_string(),
            ));
        }

        Ok(Cart::with_lines(lines, currency)?)
    }
}
