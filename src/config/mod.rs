//! Configuration
//!
//! Pricing and logging settings read from CLI arguments and the environment.
//! A `.env` file is loaded first when present.

use clap::Parser;

pub mod observability;
pub mod pricing;

pub use observability::{LogFormat, LoggingConfig};
pub use pricing::{DeliveryConfig, PricingConfig};

/// Load `.env` if present, then parse `T` from the process arguments.
///
/// # Errors
///
/// Returns a [`clap::Error`] if the arguments cannot be parsed.
pub fn load<T: Parser>() -> Result<T, clap::Error> {
    // Missing .env is fine
    _ = dotenvy::dotenv();

    T::try_parse()
}
