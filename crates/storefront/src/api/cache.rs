//! Cache types for catalog responses.

use crate::api::types::{Brand, Category, Product, ProductPage};

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(ProductPage),
    Category(Box<Category>),
    Categories(Vec<Category>),
    Brand(Box<Brand>),
    Brands(Vec<Brand>),
}

/// Cache key for one page of products.
pub fn products_key(page: u32, limit: u32) -> String {
    format!("products:{page}:{limit}")
}

/// Cache key for a single product.
pub fn product_key(id: &str) -> String {
    format!("product:{id}")
}

/// Cache key for a single category.
pub fn category_key(id: &str) -> String {
    format!("category:{id}")
}

/// Cache key for a single brand.
pub fn brand_key(id: &str) -> String {
    format!("brand:{id}")
}

pub const CATEGORIES_KEY: &str = "categories";
pub const BRANDS_KEY: &str = "brands";
