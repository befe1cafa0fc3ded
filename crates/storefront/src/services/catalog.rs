//! Catalog browsing: paged products, product detail, brands and categories.

use tracing::instrument;

use shopmart_core::{BrandId, CategoryId, ProductId};

use crate::api::{ApiError, Brand, Category, Product, ProductPage, ShopClient};

/// How many products a brand or category page scans.
pub const DETAIL_PRODUCT_LIMIT: u32 = 100;

/// A brand with the products that carry it.
#[derive(Debug, Clone)]
pub struct BrandDetail {
    pub brand: Brand,
    pub products: Vec<Product>,
}

/// A category with the products filed under it.
#[derive(Debug, Clone)]
pub struct CategoryDetail {
    pub category: Category,
    pub products: Vec<Product>,
}

/// Catalog service.
pub struct CatalogService<'a> {
    client: &'a ShopClient,
    page_size: u32,
}

impl<'a> CatalogService<'a> {
    /// Create a catalog service listing `page_size` products per page.
    #[must_use]
    pub const fn new(client: &'a ShopClient, page_size: u32) -> Self {
        Self { client, page_size }
    }

    /// One page of products. Page numbers start at 1; 0 is treated as 1.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn products(&self, page: u32) -> Result<ProductPage, ApiError> {
        self.client.get_products(page.max(1), self.page_size).await
    }

    /// One page of products narrowed to titles containing `query`.
    ///
    /// Filtering is local to the fetched page, so pagination still describes
    /// the full listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn search(&self, page: u32, query: &str) -> Result<ProductPage, ApiError> {
        let mut listing = self.products(page).await?;
        listing.products = filter_by_title(listing.products, query);
        Ok(listing)
    }

    /// A single product.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown IDs.
    pub async fn product(&self, id: &ProductId) -> Result<Product, ApiError> {
        self.client.get_product(id).await
    }

    /// All categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        self.client.get_categories().await
    }

    /// All brands.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn brands(&self) -> Result<Vec<Brand>, ApiError> {
        self.client.get_brands().await
    }

    /// A category and its products among the first [`DETAIL_PRODUCT_LIMIT`].
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown IDs.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn category(&self, id: &CategoryId) -> Result<CategoryDetail, ApiError> {
        let (category, listing) = tokio::try_join!(
            self.client.get_category(id),
            self.client.get_products(1, DETAIL_PRODUCT_LIMIT),
        )?;
        let products = listing
            .products
            .into_iter()
            .filter(|product| product.is_category(id))
            .collect();
        Ok(CategoryDetail { category, products })
    }

    /// A brand and its products among the first [`DETAIL_PRODUCT_LIMIT`].
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown IDs.
    #[instrument(skip(self), fields(brand_id = %id))]
    pub async fn brand(&self, id: &BrandId) -> Result<BrandDetail, ApiError> {
        let (brand, listing) = tokio::try_join!(
            self.client.get_brand(id),
            self.client.get_products(1, DETAIL_PRODUCT_LIMIT),
        )?;
        let products = listing
            .products
            .into_iter()
            .filter(|product| product.is_brand(id))
            .collect();
        Ok(BrandDetail { brand, products })
    }
}

/// Keep products whose title contains `query`, ignoring case. A blank query
/// keeps everything.
#[must_use]
pub fn filter_by_title(products: Vec<Product>, query: &str) -> Vec<Product> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return products;
    }
    products
        .into_iter()
        .filter(|product| product.title.to_lowercase().contains(&needle))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn titled(id: &str, title: &str) -> Product {
        serde_json::from_value(json!({ "_id": id, "title": title, "price": 10 })).unwrap()
    }

    fn titles(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.title.as_str()).collect()
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let products = vec![
            titled("1", "Woman Shawl"),
            titled("2", "Men's Sneakers"),
            titled("3", "SHAWL scarf"),
        ];
        let found = filter_by_title(products, "shawl");
        assert_eq!(titles(&found), vec!["Woman Shawl", "SHAWL scarf"]);
    }

    #[test]
    fn test_blank_query_keeps_everything() {
        let products = vec![titled("1", "A"), titled("2", "B")];
        assert_eq!(filter_by_title(products.clone(), "").len(), 2);
        assert_eq!(filter_by_title(products, "   ").len(), 2);
    }

    #[test]
    fn test_no_match() {
        let products = vec![titled("1", "A")];
        assert!(filter_by_title(products, "zzz").is_empty());
    }
}
