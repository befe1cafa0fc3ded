//! Domain types for the ShopMart remote API.
//!
//! Catalog records deserialize straight from the API's JSON (which uses
//! `_id` and camelCase keys). Response envelopes live in `wire` and are
//! converted into these types before leaving the client.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shopmart_core::{
    BrandId, CartId, CartItemId, CategoryId, OrderId, PaymentMethod, Price, ProductId, UserId,
    UserRole,
};

// =============================================================================
// Catalog Types
// =============================================================================

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Category ID.
    #[serde(rename = "_id")]
    pub id: CategoryId,
    /// Display name.
    pub name: String,
    /// URL slug.
    #[serde(default)]
    pub slug: String,
    /// Cover image URL.
    #[serde(default)]
    pub image: Option<String>,
}

/// A product brand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    /// Brand ID.
    #[serde(rename = "_id")]
    pub id: BrandId,
    /// Display name.
    pub name: String,
    /// URL slug.
    #[serde(default)]
    pub slug: String,
    /// Logo URL.
    #[serde(default)]
    pub image: Option<String>,
}

/// A product record as served by the catalog, wishlist and populated carts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Product ID.
    #[serde(rename = "_id")]
    pub id: ProductId,
    /// Product title.
    #[serde(default)]
    pub title: String,
    /// URL slug.
    #[serde(default)]
    pub slug: String,
    /// Long description.
    #[serde(default)]
    pub description: String,
    /// List price.
    #[serde(default)]
    pub price: Decimal,
    /// Discounted price, when a sale is running.
    #[serde(default)]
    pub price_after_discount: Option<Decimal>,
    /// Units in stock.
    #[serde(default)]
    pub quantity: u32,
    /// Units sold so far.
    #[serde(default)]
    pub sold: Option<u64>,
    /// Primary image URL.
    #[serde(default)]
    pub image_cover: String,
    /// Gallery image URLs.
    #[serde(default)]
    pub images: Vec<String>,
    /// Owning category.
    #[serde(default)]
    pub category: Option<Category>,
    /// Owning brand.
    #[serde(default)]
    pub brand: Option<Brand>,
    /// Average star rating.
    #[serde(default)]
    pub ratings_average: f64,
    /// Number of ratings.
    #[serde(default)]
    pub ratings_quantity: u32,
}

impl Product {
    /// The price a shopper pays today.
    #[must_use]
    pub fn effective_price(&self) -> Price {
        Price::egp(self.price_after_discount.unwrap_or(self.price))
    }

    /// Whether a sale price is in effect.
    #[must_use]
    pub fn is_discounted(&self) -> bool {
        self.price_after_discount
            .is_some_and(|discounted| discounted < self.price)
    }

    /// Whether the product belongs to the given brand.
    #[must_use]
    pub fn is_brand(&self, brand: &BrandId) -> bool {
        self.brand.as_ref().is_some_and(|b| &b.id == brand)
    }

    /// Whether the product belongs to the given category.
    #[must_use]
    pub fn is_category(&self, category: &CategoryId) -> bool {
        self.category.as_ref().is_some_and(|c| &c.id == category)
    }
}

/// Page position reported alongside list responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// 1-based page number.
    pub current_page: u32,
    /// Total number of pages (at least 1).
    pub number_of_pages: u32,
    /// Page size used for the request.
    #[serde(default)]
    pub limit: u32,
}

impl Pagination {
    /// A single page covering everything.
    #[must_use]
    pub const fn single() -> Self {
        Self {
            current_page: 1,
            number_of_pages: 1,
            limit: 0,
        }
    }

    /// Whether a previous page exists.
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    /// Whether a next page exists.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.current_page < self.number_of_pages
    }

    /// All page numbers, for rendering a page picker.
    pub fn pages(&self) -> impl Iterator<Item = u32> {
        1..=self.number_of_pages.max(1)
    }
}

/// One page of the product catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductPage {
    /// Products on this page.
    pub products: Vec<Product>,
    /// Position within the full listing.
    pub pagination: Pagination,
}

// =============================================================================
// Cart Types
// =============================================================================

/// The product a cart or order line refers to.
///
/// Read responses populate the full record; some mutation responses carry
/// only the product ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductRef {
    /// Populated product record.
    Full(Box<Product>),
    /// Bare product ID.
    Id(ProductId),
}

impl ProductRef {
    /// The referenced product ID.
    #[must_use]
    pub fn id(&self) -> &ProductId {
        match self {
            Self::Full(product) => &product.id,
            Self::Id(id) => id,
        }
    }

    /// The populated record, if the response carried one.
    #[must_use]
    pub fn details(&self) -> Option<&Product> {
        match self {
            Self::Full(product) => Some(product),
            Self::Id(_) => None,
        }
    }

    /// Title for display, falling back to the ID.
    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::Full(product) => &product.title,
            Self::Id(id) => id.as_str(),
        }
    }
}

/// One product-quantity-price entry of a cart or order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Line ID.
    #[serde(rename = "_id")]
    pub id: CartItemId,
    /// The product on this line.
    pub product: ProductRef,
    /// Unit price captured when the product was added.
    #[serde(rename = "price")]
    pub unit_price: Decimal,
    /// Quantity, always at least 1.
    #[serde(rename = "count")]
    pub quantity: u32,
}

impl LineItem {
    /// ID of the product on this line.
    #[must_use]
    pub fn product_id(&self) -> &ProductId {
        self.product.id()
    }

    /// `unit_price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Price {
        Price::egp(self.unit_price).times(self.quantity)
    }
}

/// The authoritative remote cart as of the last successful sync.
///
/// Replaced wholesale on every mutation; never patched in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CartSnapshot {
    /// Active cart ID, `None` when the shopper has no cart.
    pub id: Option<CartId>,
    /// Line items in server order.
    pub items: Vec<LineItem>,
    /// Cart total as computed by the server.
    pub total: Decimal,
}

impl CartSnapshot {
    /// The "no cart" snapshot.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of line items (the navigation badge count).
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Sum of quantities across all lines.
    #[must_use]
    pub fn total_units(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// The line holding a given product.
    #[must_use]
    pub fn line(&self, product: &ProductId) -> Option<&LineItem> {
        self.items.iter().find(|item| item.product_id() == product)
    }

    /// The server total as a price.
    #[must_use]
    pub fn total_price(&self) -> Price {
        Price::egp(self.total)
    }
}

// =============================================================================
// Order Types
// =============================================================================

/// Delivery address submitted at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    /// Street, building, floor.
    #[serde(default)]
    pub details: String,
    /// Contact phone.
    #[serde(default)]
    pub phone: String,
    /// City.
    #[serde(default)]
    pub city: String,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Order ID.
    #[serde(rename = "_id")]
    pub id: OrderId,
    /// Grand total.
    #[serde(default)]
    pub total_order_price: Decimal,
    /// Cash or card.
    #[serde(default)]
    pub payment_method_type: PaymentMethod,
    /// Whether payment has been collected.
    #[serde(default)]
    pub is_paid: bool,
    /// Whether the order has been delivered.
    #[serde(default)]
    pub is_delivered: bool,
    /// Delivery address.
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
    /// Ordered lines.
    #[serde(default)]
    pub cart_items: Vec<LineItem>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Grand total as a price.
    #[must_use]
    pub fn total_price(&self) -> Price {
        Price::egp(self.total_order_price)
    }

    /// Most recent change, falling back to creation time.
    #[must_use]
    pub fn last_updated(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.created_at)
    }
}

// =============================================================================
// Auth Types
// =============================================================================

/// Profile returned by sign-in and sign-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Account role.
    #[serde(default)]
    pub role: UserRole,
}

/// Successful sign-in (or sign-up, or password change) response.
#[derive(Debug, Clone, Deserialize)]
pub struct SignInResponse {
    /// Profile of the authenticated user.
    pub user: UserProfile,
    /// Bearer credential for subsequent requests.
    pub token: String,
}

/// New account details.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Password.
    pub password: String,
    /// Password confirmation.
    pub re_password: String,
    /// Mobile number.
    pub phone: String,
}

/// Password change request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    /// Current password.
    pub current_password: String,
    /// New password.
    pub password: String,
    /// New password confirmation.
    pub re_password: String,
}

/// Result of a password reset: a fresh credential.
#[derive(Debug, Clone, Deserialize)]
pub struct ResetPasswordResponse {
    /// Bearer credential for the account with the new password.
    pub token: String,
}

/// ID of the user an order list belongs to.
pub type OrderOwner = UserId;
