//! Checkout and order history commands.
//!
//! # Usage
//!
//! ```bash
//! shopmart checkout --method cash --details "12 Tahrir St" --phone 01012345678 --city Cairo
//! shopmart checkout --method online --details "12 Tahrir St" --phone 01012345678 --city Giza
//! shopmart orders
//! ```

#![allow(clippy::print_stdout)]

use shopmart_core::{CheckoutMethod, OrderProgress};
use shopmart_storefront::Storefront;
use shopmart_storefront::services::CheckoutOutcome;
use shopmart_storefront::services::checkout::shipping_address;

use super::CliError;

/// Order the cart.
pub async fn checkout(
    storefront: &Storefront,
    method: CheckoutMethod,
    details: &str,
    phone: &str,
    city: &str,
) -> Result<(), CliError> {
    let address = shipping_address(details, phone, city)?;

    // The synchronizer snapshot carries the cart id checkout needs
    storefront.cart().refresh().await?;

    match storefront.checkout().checkout(method, &address).await? {
        CheckoutOutcome::Placed(order) => {
            println!("Order {} placed, total {}.", order.id, order.total_price());
            println!("Pay {} on delivery.", order.payment_method_type);
        }
        CheckoutOutcome::Redirect(url) => {
            println!("Complete your payment at:");
            println!("{url}");
        }
    }
    Ok(())
}

/// List the shopper's orders, newest first.
pub async fn history(storefront: &Storefront) -> Result<(), CliError> {
    let orders = storefront.checkout().order_history().await?;
    if orders.is_empty() {
        println!("No orders yet.");
    }
    for order in &orders {
        let progress = OrderProgress::from_flags(order.is_paid, order.is_delivered);
        println!(
            "{}  {}  {}  {} item(s)  {:?}  ({})",
            order.id,
            order.created_at.format("%Y-%m-%d"),
            order.total_price(),
            order.cart_items.len(),
            progress,
            order.payment_method_type
        );
    }
    Ok(())
}
