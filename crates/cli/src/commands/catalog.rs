//! Catalog commands.
//!
//! # Usage
//!
//! ```bash
//! shopmart products --page 2
//! shopmart products --search shawl
//! shopmart product 6428ebc6dc1175abc65ca0b9
//! shopmart categories
//! shopmart brands 64089bbe24b25627a253158b
//! ```

#![allow(clippy::print_stdout)]

use shopmart_core::{BrandId, CategoryId, ProductId};
use shopmart_storefront::Storefront;
use shopmart_storefront::api::Pagination;

use super::{CliError, print_product_line};

/// List one page of products, optionally narrowed by title.
pub async fn products(
    storefront: &Storefront,
    page: u32,
    search: Option<&str>,
) -> Result<(), CliError> {
    let catalog = storefront.catalog();
    let listing = match search {
        Some(query) => catalog.search(page, query).await?,
        None => catalog.products(page).await?,
    };

    if listing.products.is_empty() {
        println!("No products found.");
    }
    for product in &listing.products {
        print_product_line(product);
    }
    print_pagination(&listing.pagination);
    Ok(())
}

/// Show one product in full.
pub async fn product(storefront: &Storefront, id: &str) -> Result<(), CliError> {
    let product = storefront.catalog().product(&ProductId::new(id)).await?;

    println!("{}", product.title);
    println!("  price:    {}", product.effective_price());
    if product.is_discounted() {
        println!("  was:      {}", shopmart_core::Price::egp(product.price));
    }
    if let Some(category) = &product.category {
        println!("  category: {}", category.name);
    }
    if let Some(brand) = &product.brand {
        println!("  brand:    {}", brand.name);
    }
    println!(
        "  rating:   {:.1} ({} reviews)",
        product.ratings_average, product.ratings_quantity
    );
    println!("  in stock: {}", product.quantity);
    if !product.description.is_empty() {
        println!();
        println!("{}", product.description);
    }
    Ok(())
}

/// List categories, or show one category with its products.
pub async fn categories(storefront: &Storefront, id: Option<&str>) -> Result<(), CliError> {
    let catalog = storefront.catalog();
    match id {
        Some(id) => {
            let detail = catalog.category(&CategoryId::new(id)).await?;
            println!("{}", detail.category.name);
            if detail.products.is_empty() {
                println!("No products in this category.");
            }
            for product in &detail.products {
                print_product_line(product);
            }
        }
        None => {
            for category in catalog.categories().await? {
                println!("{}  {}", category.id, category.name);
            }
        }
    }
    Ok(())
}

/// List brands, or show one brand with its products.
pub async fn brands(storefront: &Storefront, id: Option<&str>) -> Result<(), CliError> {
    let catalog = storefront.catalog();
    match id {
        Some(id) => {
            let detail = catalog.brand(&BrandId::new(id)).await?;
            println!("{}", detail.brand.name);
            if detail.products.is_empty() {
                println!("No products for this brand.");
            }
            for product in &detail.products {
                print_product_line(product);
            }
        }
        None => {
            for brand in catalog.brands().await? {
                println!("{}  {}", brand.id, brand.name);
            }
        }
    }
    Ok(())
}

fn print_pagination(pagination: &Pagination) {
    let pages: Vec<String> = pagination
        .pages()
        .map(|page| {
            if page == pagination.current_page {
                format!("[{page}]")
            } else {
                page.to_string()
            }
        })
        .collect();
    let previous = if pagination.has_previous() { "< " } else { "" };
    let next = if pagination.has_next() { " >" } else { "" };
    println!();
    println!("Page {previous}{}{next}", pages.join(" "));
}
