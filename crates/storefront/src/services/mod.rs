//! Storefront services built on the API client and the session signal.
//!
//! # Services
//!
//! - `auth` - Sign-in, sign-up, password change, password reset wizard
//! - `catalog` - Paged products, search, brand and category pages
//! - `checkout` - Shipping address, cash and online checkout, order history

pub mod auth;
pub mod catalog;
pub mod checkout;

pub use auth::{AuthError, AuthService, PasswordReset, Registration, ResetStep};
pub use catalog::{BrandDetail, CatalogService, CategoryDetail};
pub use checkout::{CheckoutError, CheckoutOutcome, CheckoutService};
