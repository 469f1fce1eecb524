//! Platter CLI
//!
//! Prices a cart fixture with an optional coupon and subscription and prints the
//! receipt. Use `--commit` to finalise the order, consuming meal credits and
//! recording coupon usage.

use std::{
    io::{self, Write},
    path::PathBuf,
};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use jiff::Zoned;

use platter::{
    clock::{Clock, FixedClock, SystemClock},
    config::{self, LoggingConfig, PricingConfig},
    coupons::store::CouponStore,
    fixtures::Fixture,
    observability,
    receipt::Receipt,
    subscriptions::{InMemorySubscriptionStore, Subscription, SubscriptionStore},
    totals::PricingInput,
};

#[derive(Debug, Parser)]
#[command(name = "platter", about = "Food order pricing", long_about = None)]
struct Cli {
    /// Logging output settings.
    #[command(flatten)]
    logging: LoggingConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Price a cart and print the receipt
    Quote(QuoteArgs),
}

#[derive(Debug, Args)]
struct QuoteArgs {
    /// Directory containing fixture files
    #[arg(short, long, env = "FIXTURES_PATH", default_value = "./fixtures")]
    fixtures: PathBuf,

    /// Cart fixture name
    #[arg(short, long)]
    cart: String,

    /// Coupon code to apply
    #[arg(long)]
    coupon: Option<String>,

    /// Coupon fixture set to seed the coupon store from
    #[arg(long, default_value = "default")]
    coupon_set: String,

    /// Subscription fixture name; no subscription when omitted
    #[arg(short, long)]
    subscription: Option<String>,

    /// Price as of this time, e.g. "2025-03-08T12:00[America/New_York]"
    #[arg(long)]
    at: Option<Zoned>,

    /// Commit the order after pricing it
    #[arg(long)]
    commit: bool,

    /// Pricing settings.
    #[command(flatten)]
    pricing: PricingConfig,
}

/// Platter CLI entry point
pub fn main() -> Result<()> {
    let cli: Cli = config::load().unwrap_or_else(|error| error.exit());

    observability::init_subscriber(&cli.logging)?;

    match cli.command {
        Commands::Quote(args) => quote(args),
    }
}

fn quote(args: QuoteArgs) -> Result<()> {
    let fixture = Fixture::with_base_path(&args.fixtures);

    let cart = fixture.load_cart(&args.cart)?;
    let mut coupons = fixture.load_coupons(&args.coupon_set)?;

    let subscription = match args.subscription.as_deref() {
        Some(name) => fixture.load_subscription(name)?,
        None => Subscription::none(cart.currency()),
    };

    let mut subscriptions = InMemorySubscriptionStore::new(subscription);

    let clock: Box<dyn Clock> = match args.at {
        Some(at) => Box::new(FixedClock::new(at)),
        None => Box::new(SystemClock),
    };

    let now = clock.now();
    let pricer = args.pricing.pricer();
    let snapshot = subscriptions.subscription().clone();

    let input = PricingInput {
        cart: &cart,
        coupon_code: args.coupon.as_deref(),
        subscription: &snapshot,
        now: &now,
    };

    let quote = pricer.preview(&input, &coupons)?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    if !args.commit {
        Receipt::new(&cart, quote.into_totals()).write_to(&mut handle)?;

        return Ok(());
    }

    let order = quote.commit(&mut subscriptions, &mut coupons)?;

    Receipt::new(&cart, order.totals).write_to(&mut handle)?;

    writeln!(handle, " Credits remaining: {}", order.credits_remaining)?;

    if let Some(coupon) = order.coupon {
        let used = coupons
            .find_by_code(&coupon.code)
            .map_or(0, |stored| stored.used_count);

        writeln!(handle, " Coupon {} used {used} time(s)", coupon.code)?;
    }

    Ok(())
}
