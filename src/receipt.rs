//! Receipt

use std::io;

use rusty_money::{Money, iso::Currency};
use tabled::{
    builder::Builder,
    settings::{
        Alignment, Color, Style,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::{cart::Cart, items::LineItem, totals::Totals};

/// Errors that can occur when writing a receipt.
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// IO error
    #[error("IO error")]
    IO,
}

/// Printable breakdown of a priced cart.
#[derive(Debug, Clone)]
pub struct Receipt<'a> {
    lines: Vec<LineItem<'a>>,
    currency: &'a Currency,
    totals: Totals<'a>,
}

impl<'a> Receipt<'a> {
    /// Create a receipt for `cart` priced at `totals`.
    pub fn new(cart: &Cart<'a>, totals: Totals<'a>) -> Self {
        Self {
            lines: cart.lines().to_vec(),
            currency: cart.currency(),
            totals,
        }
    }

    /// Totals shown on the receipt.
    pub fn totals(&self) -> &Totals<'a> {
        &self.totals
    }

    /// Writes the receipt as a table followed by the totals summary.
    ///
    /// # Errors
    ///
    /// Returns [`ReceiptError::IO`] if writing to `out` fails.
    pub fn write_to(&self, mut out: impl io::Write) -> Result<(), ReceiptError> {
        let mut builder = Builder::default();

        builder.push_record(["Item", "Restaurant", "Qty", "Unit Price", "Line Total"]);

        for line in &self.lines {
            let line_total = line
                .line_total_minor()
                .map(|minor| Money::from_minor(minor, self.currency).to_string())
                .unwrap_or_default();

            builder.push_record([
                line.name().to_string(),
                line.restaurant_id().unwrap_or_default().to_string(),
                line.quantity().to_string(),
                line.unit_price().to_string(),
                line_total,
            ]);
        }

        let mut table = builder.build();

        table.with(Style::modern_rounded());
        table.modify(Rows::first(), Color::BOLD);
        table.modify(Columns::new(2..5), Alignment::right());

        writeln!(out, "\n{table}").map_err(|_err| ReceiptError::IO)?;

        self.write_summary(&mut out)
    }

    fn write_summary(&self, out: &mut impl io::Write) -> Result<(), ReceiptError> {
        let totals = &self.totals;

        let mut rows: Vec<(&str, String)> = vec![("Subtotal:", totals.subtotal.to_string())];

        if totals.coupon_discount.to_minor_units() > 0 {
            rows.push(("Coupon:", format!("-{}", totals.coupon_discount)));
        }

        if totals.vip_discount.to_minor_units() > 0 {
            rows.push(("VIP discount:", format!("-{}", totals.vip_discount)));
        }

        if totals.meal_credits_applied.to_minor_units() > 0 {
            rows.push(("Meal credits:", format!("-{}", totals.meal_credits_applied)));
        }

        rows.push(("Tax:", totals.tax.to_string()));

        let delivery = if totals.delivery_waived {
            format!("{} (waived)", totals.delivery_fee)
        } else {
            totals.delivery_fee.to_string()
        };

        rows.push(("Delivery:", delivery));
        rows.push(("Total:", totals.total.to_string()));

        let label_width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
        let value_width = rows.iter().map(|(_, value)| value.len()).max().unwrap_or(0);

        for (label, value) in &rows {
            writeln!(out, " {label:>label_width$}  {value:>value_width$}")
                .map_err(|_err| ReceiptError::IO)?;
        }

        if let Some(rejection) = &totals.coupon_rejection {
            writeln!(out, "\n Coupon not applied: {rejection}").map_err(|_err| ReceiptError::IO)?;
        }

        writeln!(out).map_err(|_err| ReceiptError::IO)
    }
}
