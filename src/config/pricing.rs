//! Pricing Config
//!
//! Amounts are accepted as strings and parsed leniently: a value that is not a
//! number falls back to its default with a warning instead of failing startup.

use std::str::FromStr;

use clap::Args;
use rust_decimal::Decimal;
use rusty_money::iso::{self, Currency};
use tracing::warn;

use crate::{
    delivery::{DEFAULT_RUSH_HOURS, DeliveryPricingOptions},
    fixtures::find_currency,
    totals::Pricer,
};

const DEFAULT_BASE_FEE: &str = "2.99";
const DEFAULT_RUSH_SURCHARGE: &str = "1.00";
const DEFAULT_WEEKEND_SURCHARGE: &str = "0.75";
const DEFAULT_TAX_RATE: &str = "0.08";
const DEFAULT_CURRENCY: &str = "USD";

/// Delivery fee settings.
#[derive(Debug, Clone, Args)]
pub struct DeliveryConfig {
    /// Fee charged on every delivery
    #[arg(long, env = "DELIVERY_BASE_FEE", default_value = DEFAULT_BASE_FEE)]
    pub base_fee: String,

    /// Surcharge during rush hours
    #[arg(long, env = "DELIVERY_RUSH_SURCHARGE", default_value = DEFAULT_RUSH_SURCHARGE)]
    pub rush_surcharge: String,

    /// Surcharge on Saturdays and Sundays
    #[arg(long, env = "DELIVERY_WEEKEND_SURCHARGE", default_value = DEFAULT_WEEKEND_SURCHARGE)]
    pub weekend_surcharge: String,

    /// Rush hour windows, e.g. "11:30-14:00,18:00-21:00"
    #[arg(long, env = "RUSH_HOURS", default_value = DEFAULT_RUSH_HOURS)]
    pub rush_hours: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            base_fee: DEFAULT_BASE_FEE.to_string(),
            rush_surcharge: DEFAULT_RUSH_SURCHARGE.to_string(),
            weekend_surcharge: DEFAULT_WEEKEND_SURCHARGE.to_string(),
            rush_hours: DEFAULT_RUSH_HOURS.to_string(),
        }
    }
}

impl DeliveryConfig {
    /// Delivery pricing options in `currency`.
    pub fn options(&self, currency: &'static Currency) -> DeliveryPricingOptions<'static> {
        DeliveryPricingOptions::from_amounts(
            lenient_decimal("base_fee", &self.base_fee, DEFAULT_BASE_FEE),
            lenient_decimal("rush_surcharge", &self.rush_surcharge, DEFAULT_RUSH_SURCHARGE),
            lenient_decimal(
                "weekend_surcharge",
                &self.weekend_surcharge,
                DEFAULT_WEEKEND_SURCHARGE,
            ),
            &self.rush_hours,
            currency,
        )
    }
}

/// Pricing settings.
#[derive(Debug, Clone, Args)]
pub struct PricingConfig {
    /// Tax rate as a fraction, e.g. 0.08 for 8%
    #[arg(long, env = "TAX_RATE", default_value = DEFAULT_TAX_RATE)]
    pub tax_rate: String,

    /// ISO currency code for configured amounts
    #[arg(long, env = "CURRENCY", default_value = DEFAULT_CURRENCY)]
    pub currency: String,

    /// Delivery fee settings.
    #[command(flatten)]
    pub delivery: DeliveryConfig,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            tax_rate: DEFAULT_TAX_RATE.to_string(),
            currency: DEFAULT_CURRENCY.to_string(),
            delivery: DeliveryConfig::default(),
        }
    }
}

impl PricingConfig {
    /// Configured currency; unknown codes fall back to USD.
    pub fn currency(&self) -> &'static Currency {
        find_currency(&self.currency).unwrap_or_else(|| {
            warn!(currency = %self.currency, "unknown currency, using USD");

            iso::USD
        })
    }

    /// Configured tax rate, never negative.
    pub fn tax_rate(&self) -> Decimal {
        lenient_decimal("tax_rate", &self.tax_rate, DEFAULT_TAX_RATE).max(Decimal::ZERO)
    }

    /// Build a pricer from the configured values.
    pub fn pricer(&self) -> Pricer<'static> {
        Pricer::new(self.delivery.options(self.currency()), self.tax_rate())
    }
}

fn lenient_decimal(name: &str, value: &str, default: &str) -> Decimal {
    Decimal::from_str(value.trim()).unwrap_or_else(|_| {
        warn!(setting = name, value, default, "invalid number, using default");

        Decimal::from_str(default).unwrap_or_default()
    })
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use rusty_money::{Money, iso::EUR};
    use testresult::TestResult;

    use super::*;

    #[derive(Debug, Parser)]
    struct TestCli {
        #[command(flatten)]
        pricing: PricingConfig,
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = PricingConfig::default();
        let options = config.delivery.options(config.currency());

        assert_eq!(config.currency(), iso::USD);
        assert_eq!(config.tax_rate(), Decimal::new(8, 2));
        assert_eq!(options.base_fee(), Money::from_minor(2_99, iso::USD));
        assert_eq!(options.rush_surcharge(), Money::from_minor(1_00, iso::USD));
        assert_eq!(options.weekend_surcharge(), Money::from_minor(75, iso::USD));
        assert_eq!(options.rush_hours().ranges().len(), 2);
    }

    #[test]
    fn parses_cli_flags() -> TestResult {
        let cli = TestCli::try_parse_from([
            "platter",
            "--tax-rate",
            "0.2",
            "--currency",
            "eur",
            "--base-fee",
            "3.50",
            "--rush-hours",
            "17:00-19:00",
        ])?;

        let pricer = cli.pricing.pricer();

        assert_eq!(pricer.tax_rate(), Decimal::new(2, 1));
        assert_eq!(pricer.delivery().base_fee(), Money::from_minor(3_50, EUR));
        assert_eq!(pricer.delivery().rush_hours().to_string(), "17:00-19:00");

        Ok(())
    }

    #[test]
    fn malformed_values_fall_back_to_defaults() {
        let config = PricingConfig {
            tax_rate: "eight percent".to_string(),
            currency: "ZZZ".to_string(),
            delivery: DeliveryConfig {
                base_fee: "free".to_string(),
                rush_surcharge: "-2".to_string(),
                ..DeliveryConfig::default()
            },
        };

        let pricer = config.pricer();

        assert_eq!(config.currency(), iso::USD);
        assert_eq!(pricer.tax_rate(), Decimal::new(8, 2));
        assert_eq!(pricer.delivery().base_fee(), Money::from_minor(2_99, iso::USD));
        assert_eq!(pricer.delivery().rush_surcharge(), Money::from_minor(0, iso::USD));
    }

    #[test]
    fn negative_tax_rate_is_clamped() {
        let config = PricingConfig {
            tax_rate: "-0.1".to_string(),
            ..PricingConfig::default()
        };

        assert_eq!(config.tax_rate(), Decimal::ZERO);
    }
}
