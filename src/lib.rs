//! Platter
//!
//! Platter is the pricing and discount composition engine for food ordering carts:
//! subtotals, coupons, VIP discounts, meal-plan credits, tax and delivery fees,
//! composed in a fixed order into an order total.

pub mod cache;
pub mod cart;
pub mod clock;
pub mod config;
pub mod coupons;
pub mod delivery;
pub mod fixtures;
pub mod items;
pub mod money;
pub mod observability;
pub mod prelude;
pub mod pricing;
pub mod receipt;
pub mod subscriptions;
pub mod tax;
pub mod totals;
