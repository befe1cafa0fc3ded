//! Cart commands, all routed through the cart synchronizer.
//!
//! # Usage
//!
//! ```bash
//! shopmart cart show
//! shopmart cart add 6428ebc6dc1175abc65ca0b9
//! shopmart cart qty 6428ebc6dc1175abc65ca0b9 3
//! shopmart cart remove 6428ebc6dc1175abc65ca0b9
//! shopmart cart clear
//! ```

#![allow(clippy::print_stdout)]

use shopmart_core::ProductId;
use shopmart_storefront::Storefront;
use shopmart_storefront::api::CartSnapshot;

use super::CliError;

/// Print the current cart.
pub async fn show(storefront: &Storefront) -> Result<(), CliError> {
    if !storefront.session().is_present() {
        println!("Please login first");
        return Ok(());
    }
    let snapshot = storefront.cart().refresh().await?;
    print_cart(&snapshot);
    Ok(())
}

/// Add one unit of a product.
pub async fn add(storefront: &Storefront, product: &str) -> Result<(), CliError> {
    let snapshot = storefront.cart().add_item(&ProductId::new(product)).await?;
    print_summary(&snapshot);
    Ok(())
}

/// Remove a product's line.
pub async fn remove(storefront: &Storefront, product: &str) -> Result<(), CliError> {
    let snapshot = storefront
        .cart()
        .remove_item(&ProductId::new(product))
        .await?;
    print_summary(&snapshot);
    Ok(())
}

/// Set a product's quantity.
pub async fn quantity(storefront: &Storefront, product: &str, count: i64) -> Result<(), CliError> {
    let snapshot = storefront
        .cart()
        .set_quantity(&ProductId::new(product), count)
        .await?;
    if let Some(line) = snapshot.line(&ProductId::new(product)) {
        println!("{} × {}", line.product.title(), line.quantity);
    }
    print_summary(&snapshot);
    Ok(())
}

/// Empty the cart.
pub async fn clear(storefront: &Storefront) -> Result<(), CliError> {
    storefront.cart().clear().await?;
    println!("Cart cleared.");
    Ok(())
}

fn print_cart(snapshot: &CartSnapshot) {
    if snapshot.is_empty() {
        println!("Your cart is empty.");
        return;
    }
    for line in &snapshot.items {
        println!(
            "{}  {}  {} × {}  = {}",
            line.product_id(),
            line.product.title(),
            line.quantity,
            shopmart_core::Price::egp(line.unit_price),
            line.line_total()
        );
    }
    println!();
    print_summary(snapshot);
}

fn print_summary(snapshot: &CartSnapshot) {
    println!(
        "{} item(s), {} unit(s), total {}",
        snapshot.item_count(),
        snapshot.total_units(),
        snapshot.total_price()
    );
}
