//! Wishlist commands, routed through the wishlist synchronizer.

#![allow(clippy::print_stdout)]

use shopmart_core::ProductId;
use shopmart_storefront::Storefront;
use shopmart_storefront::sync::ToggleOutcome;

use super::{CliError, print_product_line};

/// Print the saved products.
pub async fn show(storefront: &Storefront) -> Result<(), CliError> {
    if !storefront.session().is_present() {
        println!("Please login first");
        return Ok(());
    }
    let records = storefront.wishlist().refresh().await?;
    if records.is_empty() {
        println!("Your wishlist is empty.");
    }
    for product in records.iter() {
        print_product_line(product);
    }
    Ok(())
}

/// Save or unsave a product.
pub async fn toggle(storefront: &Storefront, product: &str) -> Result<(), CliError> {
    let outcome = storefront.wishlist().toggle(&ProductId::new(product)).await?;
    let count = storefront.wishlist().count();
    match outcome {
        ToggleOutcome::Added => println!("Saved. {count} product(s) in your wishlist."),
        ToggleOutcome::Removed => println!("Removed. {count} product(s) in your wishlist."),
    }
    Ok(())
}
