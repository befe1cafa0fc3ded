//! Unified error handling with Sentry integration.
//!
//! Provides a unified `Error` type over every failure the storefront can
//! report, plus helpers that attach the signed-in user and a trail of
//! breadcrumbs to Sentry events.

use thiserror::Error;

use shopmart_core::ValidationError;

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::services::{AuthError, CheckoutError};
use crate::session::SessionError;
use crate::sync::SyncError;

/// Storefront-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Remote API operation failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Stored or issued credential is unusable.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Cart or wishlist operation failed.
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Checkout failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Form input failed validation.
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),
}

impl Error {
    /// Whether this error points at a bug or outage rather than shopper input.
    #[must_use]
    pub fn is_unexpected(&self) -> bool {
        match self {
            Self::Api(e) | Self::Sync(SyncError::Remote(e)) | Self::Auth(AuthError::Api(e)) => {
                e.is_unexpected()
            }
            Self::Checkout(CheckoutError::Api(e)) => e.is_unexpected(),
            Self::Sync(SyncError::Closed) | Self::Checkout(CheckoutError::InvalidPaymentUrl(_)) => {
                true
            }
            _ => false,
        }
    }

    /// Capture the error to Sentry if it is unexpected.
    pub fn report(&self) {
        if self.is_unexpected() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Storefront error"
            );
        }
    }

    /// Short message fit for the shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Auth(e) => e.to_string(),
            Self::Checkout(CheckoutError::Api(e)) | Self::Api(e) => e
                .remote_message()
                .map_or_else(|| "Something went wrong, please try again".to_string(), String::from),
            Self::Validation(e) => e.to_string(),
            Self::Checkout(e) => e.to_string(),
            Self::Sync(SyncError::NotSignedIn) => "Please login first".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type alias for `Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for shopper actions.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "remove failed", Some(&[("product_id", "6428ebc6")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
