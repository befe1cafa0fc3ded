//! HTTP client for the ShopMart REST API.
//!
//! Catalog reads (products, categories, brands) are cached with `moka` for
//! the configured TTL. Everything scoped to the signed-in shopper is fetched
//! fresh on every call.

use std::sync::Arc;

use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, error, instrument};
use url::Url;

use shopmart_core::{BrandId, CartId, CategoryId, ProductId, UserId};

use super::ApiError;
use super::cache::{
    BRANDS_KEY, CATEGORIES_KEY, CacheValue, brand_key, category_key, product_key, products_key,
};
use super::types::{
    Brand, CartSnapshot, Category, ChangePasswordRequest, Order, Pagination, Product, ProductPage,
    ResetPasswordResponse, ShippingAddress, SignInResponse, SignUpRequest,
};
use super::wire::{
    CartResponse, CheckoutSessionResponse, DataResponse, ErrorBody, ListResponse, StatusResponse,
    WishlistAck,
};
use crate::config::StorefrontConfig;
use crate::session::AccessToken;

const CACHE_CAPACITY: u64 = 1000;

// =============================================================================
// ShopClient
// =============================================================================

/// Client for the ShopMart REST API.
///
/// Cheap to clone; clones share the connection pool and catalog cache.
#[derive(Clone)]
pub struct ShopClient {
    inner: Arc<ShopClientInner>,
}

struct ShopClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<String, CacheValue>,
}

impl std::fmt::Debug for ShopClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ShopClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &StorefrontConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .user_agent(concat!("shopmart/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(ShopClientInner {
                client,
                base_url: config.api_base_url.clone(),
                cache,
            }),
        })
    }

    /// Drop every cached catalog response.
    pub fn invalidate_cache(&self) {
        self.inner.cache.invalidate_all();
    }

    /// Build `{base}/api/v1/{segments...}`.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(self.inner.base_url.to_string()))?
            .pop_if_empty()
            .extend(["api", "v1"])
            .extend(segments);
        Ok(url)
    }

    fn request(
        &self,
        method: Method,
        segments: &[&str],
        token: Option<&AccessToken>,
    ) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(segments)?;
        let mut request = self.inner.client.request(method, url);
        if let Some(token) = token {
            request = request.header("token", token.expose());
        }
        Ok(request)
    }

    /// Send a request and decode a successful JSON body.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        // Check for rate limiting
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            let message = ErrorBody::from_text(&response_text);
            if status.is_server_error() {
                error!(
                    status = %status,
                    body = %response_text.chars().take(500).collect::<String>(),
                    "ShopMart API returned server error"
                );
            } else {
                debug!(status = %status, message = %message, "ShopMart API rejected request");
            }
            return Err(match status {
                StatusCode::UNAUTHORIZED => ApiError::Unauthorized(message),
                StatusCode::NOT_FOUND => ApiError::NotFound(message),
                _ => ApiError::Remote {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        serde_json::from_str(&response_text).map_err(|e| {
            error!(
                error = %e,
                body = %response_text.chars().take(500).collect::<String>(),
                "Failed to parse ShopMart API response"
            );
            ApiError::Parse(e)
        })
    }

    async fn send_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send(request.json(body)).await
    }

    // =========================================================================
    // Auth Methods
    // =========================================================================

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the account exists or the API request fails.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn sign_up(&self, request: &SignUpRequest) -> Result<SignInResponse, ApiError> {
        let req = self.request(Method::POST, &["auth", "signup"], None)?;
        self.send_json(req, request).await
    }

    /// Exchange email and password for a credential.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] on bad credentials.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignInResponse, ApiError> {
        let req = self.request(Method::POST, &["auth", "signin"], None)?;
        self.send_json(req, &json!({ "email": email, "password": password }))
            .await
    }

    /// Email a password reset code.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is unknown or the API request fails.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn forgot_password(&self, email: &str) -> Result<(), ApiError> {
        let req = self.request(Method::POST, &["auth", "forgotPasswords"], None)?;
        let response: StatusResponse = self.send_json(req, &json!({ "email": email })).await?;
        expect_success(response)
    }

    /// Check an emailed reset code.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is wrong or expired.
    #[instrument(skip(self, code))]
    pub async fn verify_reset_code(&self, code: &str) -> Result<(), ApiError> {
        let req = self.request(Method::POST, &["auth", "verifyResetCode"], None)?;
        let response: StatusResponse = self.send_json(req, &json!({ "resetCode": code })).await?;
        expect_success(response)
    }

    /// Set a new password after a verified reset code.
    ///
    /// # Errors
    ///
    /// Returns an error if no verified reset is pending for the address.
    #[instrument(skip(self, new_password), fields(email = %email))]
    pub async fn reset_password(
        &self,
        email: &str,
        new_password: &str,
    ) -> Result<ResetPasswordResponse, ApiError> {
        let req = self.request(Method::PUT, &["auth", "resetPassword"], None)?;
        self.send_json(
            req,
            &json!({ "email": email, "newPassword": new_password }),
        )
        .await
    }

    /// Change the signed-in shopper's password.
    ///
    /// # Errors
    ///
    /// Returns an error if the current password is wrong or the API request fails.
    #[instrument(skip(self, token, request))]
    pub async fn change_password(
        &self,
        token: &AccessToken,
        request: &ChangePasswordRequest,
    ) -> Result<SignInResponse, ApiError> {
        let req = self.request(Method::PUT, &["users", "changeMyPassword"], Some(token))?;
        self.send_json(req, request).await
    }

    // =========================================================================
    // Catalog Methods
    // =========================================================================

    /// Get one page of products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_products(&self, page: u32, limit: u32) -> Result<ProductPage, ApiError> {
        let cache_key = products_key(page, limit);

        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let mut url = self.endpoint(&["products"])?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("limit", &limit.to_string());
        let response: ListResponse<Product> =
            self.send(self.inner.client.get(url)).await?;

        let products = ProductPage {
            pagination: response.metadata.unwrap_or_else(Pagination::single),
            products: response.data,
        };

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown IDs.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: &ProductId) -> Result<Product, ApiError> {
        let cache_key = product_key(id.as_str());

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let req = self.request(Method::GET, &["products", id.as_str()], None)?;
        let response: DataResponse<Product> = self.send(req).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(response.data.clone())))
            .await;

        Ok(response.data)
    }

    /// List all categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_categories(&self) -> Result<Vec<Category>, ApiError> {
        if let Some(CacheValue::Categories(categories)) = self.inner.cache.get(CATEGORIES_KEY).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let req = self.request(Method::GET, &["categories"], None)?;
        let response: ListResponse<Category> = self.send(req).await?;

        self.inner
            .cache
            .insert(
                CATEGORIES_KEY.to_string(),
                CacheValue::Categories(response.data.clone()),
            )
            .await;

        Ok(response.data)
    }

    /// Get a category by ID.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown IDs.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn get_category(&self, id: &CategoryId) -> Result<Category, ApiError> {
        let cache_key = category_key(id.as_str());

        if let Some(CacheValue::Category(category)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for category");
            return Ok(*category);
        }

        let req = self.request(Method::GET, &["categories", id.as_str()], None)?;
        let response: DataResponse<Category> = self.send(req).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Category(Box::new(response.data.clone())))
            .await;

        Ok(response.data)
    }

    /// List all brands.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_brands(&self) -> Result<Vec<Brand>, ApiError> {
        if let Some(CacheValue::Brands(brands)) = self.inner.cache.get(BRANDS_KEY).await {
            debug!("Cache hit for brands");
            return Ok(brands);
        }

        let req = self.request(Method::GET, &["brands"], None)?;
        let response: ListResponse<Brand> = self.send(req).await?;

        self.inner
            .cache
            .insert(BRANDS_KEY.to_string(), CacheValue::Brands(response.data.clone()))
            .await;

        Ok(response.data)
    }

    /// Get a brand by ID.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown IDs.
    #[instrument(skip(self), fields(brand_id = %id))]
    pub async fn get_brand(&self, id: &BrandId) -> Result<Brand, ApiError> {
        let cache_key = brand_key(id.as_str());

        if let Some(CacheValue::Brand(brand)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for brand");
            return Ok(*brand);
        }

        let req = self.request(Method::GET, &["brands", id.as_str()], None)?;
        let response: DataResponse<Brand> = self.send(req).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Brand(Box::new(response.data.clone())))
            .await;

        Ok(response.data)
    }

    // =========================================================================
    // Cart Methods
    // =========================================================================

    /// Get the shopper's active cart. A shopper without a cart gets an empty
    /// snapshot rather than an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn get_cart(&self, token: &AccessToken) -> Result<CartSnapshot, ApiError> {
        let req = self.request(Method::GET, &["cart"], Some(token))?;
        match self.send::<CartResponse>(req).await {
            Ok(response) => Ok(cart_snapshot(response)),
            Err(ApiError::NotFound(message)) => {
                debug!(message = %message, "No active cart");
                Ok(CartSnapshot::empty())
            }
            Err(e) => Err(e),
        }
    }

    /// Add one unit of a product to the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(product_id = %product_id))]
    pub async fn add_to_cart(
        &self,
        token: &AccessToken,
        product_id: &ProductId,
    ) -> Result<CartSnapshot, ApiError> {
        let req = self.request(Method::POST, &["cart"], Some(token))?;
        let response: CartResponse = self
            .send_json(req, &json!({ "productId": product_id }))
            .await?;
        Ok(cart_snapshot(response))
    }

    /// Set the quantity of a product's line.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(product_id = %product_id))]
    pub async fn update_cart_item(
        &self,
        token: &AccessToken,
        product_id: &ProductId,
        count: u32,
    ) -> Result<CartSnapshot, ApiError> {
        let req = self.request(Method::PUT, &["cart", product_id.as_str()], Some(token))?;
        let response: CartResponse = self
            .send_json(req, &json!({ "count": count }))
            .await?;
        Ok(cart_snapshot(response))
    }

    /// Remove a product's line from the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(product_id = %product_id))]
    pub async fn remove_cart_item(
        &self,
        token: &AccessToken,
        product_id: &ProductId,
    ) -> Result<CartSnapshot, ApiError> {
        let req = self.request(Method::DELETE, &["cart", product_id.as_str()], Some(token))?;
        let response: CartResponse = self.send(req).await?;
        Ok(cart_snapshot(response))
    }

    /// Delete the whole cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn clear_cart(&self, token: &AccessToken) -> Result<(), ApiError> {
        let req = self.request(Method::DELETE, &["cart"], Some(token))?;
        let _: serde_json::Value = self.send(req).await?;
        Ok(())
    }

    // =========================================================================
    // Wishlist Methods
    // =========================================================================

    /// Get the shopper's saved products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn get_wishlist(&self, token: &AccessToken) -> Result<Vec<Product>, ApiError> {
        let req = self.request(Method::GET, &["wishlist"], Some(token))?;
        let response: ListResponse<Product> = self.send(req).await?;
        Ok(response.data)
    }

    /// Save a product. Returns the saved IDs only.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(product_id = %product_id))]
    pub async fn add_to_wishlist(
        &self,
        token: &AccessToken,
        product_id: &ProductId,
    ) -> Result<Vec<ProductId>, ApiError> {
        let req = self.request(Method::POST, &["wishlist"], Some(token))?;
        let ack: WishlistAck = self
            .send_json(req, &json!({ "productId": product_id }))
            .await?;
        Ok(ack.data)
    }

    /// Unsave a product. Returns the remaining IDs only.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(product_id = %product_id))]
    pub async fn remove_from_wishlist(
        &self,
        token: &AccessToken,
        product_id: &ProductId,
    ) -> Result<Vec<ProductId>, ApiError> {
        let req = self.request(
            Method::DELETE,
            &["wishlist", product_id.as_str()],
            Some(token),
        )?;
        let ack: WishlistAck = self.send(req).await?;
        Ok(ack.data)
    }

    // =========================================================================
    // Order Methods
    // =========================================================================

    /// Get every order a user has placed, in server order.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_user_orders(&self, user_id: &UserId) -> Result<Vec<Order>, ApiError> {
        let req = self.request(Method::GET, &["orders", "user", user_id.as_str()], None)?;
        self.send(req).await
    }

    /// Place a cash-on-delivery order for a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token, address), fields(cart_id = %cart_id))]
    pub async fn create_cash_order(
        &self,
        token: &AccessToken,
        cart_id: &CartId,
        address: &ShippingAddress,
    ) -> Result<Order, ApiError> {
        let req = self.request(Method::POST, &["orders", cart_id.as_str()], Some(token))?;
        let response: DataResponse<Order> = self
            .send_json(req, &json!({ "shippingAddress": address }))
            .await?;
        Ok(response.data)
    }

    /// Open a hosted card payment session for a cart.
    ///
    /// Returns the payment page URL, or `None` if the API did not supply one.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token, address), fields(cart_id = %cart_id))]
    pub async fn create_checkout_session(
        &self,
        token: &AccessToken,
        cart_id: &CartId,
        address: &ShippingAddress,
        return_origin: &str,
    ) -> Result<Option<String>, ApiError> {
        let mut url = self.endpoint(&["orders", "checkout-session", cart_id.as_str()])?;
        url.query_pairs_mut().append_pair("url", return_origin);
        let req = self
            .inner
            .client
            .post(url)
            .header("token", token.expose());
        let response: CheckoutSessionResponse = self
            .send_json(req, &json!({ "shippingAddress": address }))
            .await?;
        Ok(response.session.url.filter(|u| !u.is_empty()))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn cart_snapshot(response: CartResponse) -> CartSnapshot {
    let reported = response.reported_count();
    let snapshot = response.into_snapshot();
    if let Some(reported) = reported
        && usize::try_from(reported).ok() != Some(snapshot.item_count())
    {
        debug!(
            reported,
            lines = snapshot.item_count(),
            "Cart item count disagrees with line items"
        );
    }
    snapshot
}

fn expect_success(response: StatusResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    Err(ApiError::Remote {
        status: 200,
        message: response.message.unwrap_or_default(),
    })
}
