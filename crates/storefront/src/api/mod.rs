//! ShopMart remote API client.
//!
//! # Architecture
//!
//! - Plain JSON over HTTPS with `reqwest`; the signed-in credential travels in
//!   the `token` header and is passed explicitly to every call that needs it
//! - The remote API is the source of truth - cart and wishlist are never
//!   merged locally, every mutation response replaces the local snapshot
//! - In-memory caching via `moka` for catalog responses only (products,
//!   categories, brands); cart, wishlist and orders are never cached
//!
//! # Example
//!
//! ```rust,ignore
//! use shopmart_storefront::api::ShopClient;
//!
//! let client = ShopClient::new(&config)?;
//!
//! // Browse the catalog
//! let page = client.get_products(1, 40).await?;
//!
//! // Mutate the signed-in shopper's cart
//! let cart = client.add_to_cart(session.token(), &page.products[0].id).await?;
//! ```

mod cache;
mod client;
pub mod types;
mod wire;

pub use client::ShopClient;
pub use types::*;

use thiserror::Error;

/// Errors that can occur when talking to the remote API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configured base URL cannot carry a path.
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    /// The credential was missing, expired or rejected.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the remote API.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other non-success response.
    #[error("Remote error ({status}): {message}")]
    Remote {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },
}

impl ApiError {
    /// The message the remote API attached to a rejected request, if any.
    ///
    /// Suitable for showing to the shopper; transport and parse failures
    /// return `None` so callers fall back to a generic message.
    #[must_use]
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            Self::Unauthorized(message)
            | Self::NotFound(message)
            | Self::Remote { message, .. }
                if !message.is_empty() =>
            {
                Some(message)
            }
            _ => None,
        }
    }

    /// Whether this failure is worth reporting to error tracking.
    ///
    /// Rejections the shopper can fix (bad credentials, missing resources)
    /// are expected traffic; transport, parse and 5xx failures are not.
    #[must_use]
    pub const fn is_unexpected(&self) -> bool {
        match self {
            Self::Http(_) | Self::Parse(_) | Self::InvalidUrl(_) => true,
            Self::Remote { status, .. } => *status >= 500,
            Self::Unauthorized(_) | Self::NotFound(_) | Self::RateLimited(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ApiError::NotFound("product 123".to_string());
        assert_eq!(err.to_string(), "Not found: product 123");

        let err = ApiError::Remote {
            status: 400,
            message: "Invalid product id".to_string(),
        };
        assert_eq!(err.to_string(), "Remote error (400): Invalid product id");
    }

    #[test]
    fn test_remote_message() {
        let err = ApiError::Unauthorized("Incorrect email or password".to_string());
        assert_eq!(err.remote_message(), Some("Incorrect email or password"));

        let err = ApiError::Remote {
            status: 500,
            message: String::new(),
        };
        assert_eq!(err.remote_message(), None);

        assert_eq!(ApiError::RateLimited(5).remote_message(), None);
    }

    #[test]
    fn test_is_unexpected() {
        assert!(!ApiError::Unauthorized(String::new()).is_unexpected());
        assert!(
            ApiError::Remote {
                status: 502,
                message: String::new()
            }
            .is_unexpected()
        );
        assert!(
            !ApiError::Remote {
                status: 409,
                message: String::new()
            }
            .is_unexpected()
        );
    }

    #[test]
    fn test_rate_limited_error() {
        let err = ApiError::RateLimited(60);
        assert_eq!(err.to_string(), "Rate limited, retry after 60 seconds");
    }
}
