//! Command implementations.
//!
//! Every command prints to stdout; logs go to stderr.

#![allow(clippy::print_stdout)]

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod orders;
pub mod wishlist;

use thiserror::Error;
use tokio::sync::broadcast::{self, error::TryRecvError};

use shopmart_core::ValidationError;
use shopmart_storefront::api::{ApiError, Product};
use shopmart_storefront::config::ConfigError;
use shopmart_storefront::services::{AuthError, CheckoutError};
use shopmart_storefront::sync::{Notification, SyncError};

use crate::session_store::SessionStoreError;

/// Errors a command can end with.
#[derive(Debug, Error)]
pub enum CliError {
    /// Storefront operation failed.
    #[error(transparent)]
    Storefront(#[from] shopmart_storefront::Error),

    /// Session file could not be read or written.
    #[error(transparent)]
    Store(#[from] SessionStoreError),

    /// Interactive input failed.
    #[error("input error: {0}")]
    Input(#[from] std::io::Error),
}

macro_rules! storefront_error {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for CliError {
                fn from(e: $source) -> Self {
                    Self::Storefront(e.into())
                }
            }
        )*
    };
}

storefront_error!(
    ApiError,
    AuthError,
    CheckoutError,
    ConfigError,
    SyncError,
    ValidationError,
);

impl CliError {
    /// Send unexpected failures to Sentry.
    pub fn report(&self) {
        if let Self::Storefront(e) = self {
            e.report();
        }
    }

    /// Whether a synchronizer already told the shopper about this failure.
    #[must_use]
    pub const fn already_notified(&self) -> bool {
        matches!(
            self,
            Self::Storefront(shopmart_storefront::Error::Sync(
                SyncError::Remote(_) | SyncError::NotSignedIn
            ))
        )
    }

    /// Message to print before exiting.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Storefront(e) => e.user_message(),
            Self::Store(e) => e.to_string(),
            Self::Input(e) => format!("input error: {e}"),
        }
    }
}

/// Print every notification published so far.
pub fn print_notifications(notifications: &mut broadcast::Receiver<Notification>) {
    loop {
        match notifications.try_recv() {
            Ok(notification) => println!("{notification}"),
            Err(TryRecvError::Lagged(missed)) => {
                tracing::debug!(missed, "Notifications dropped");
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
}

/// One listing line: id, title, price and rating.
fn print_product_line(product: &Product) {
    let price = product.effective_price();
    let sale = if product.is_discounted() { " (sale)" } else { "" };
    println!(
        "{}  {}  {price}{sale}  ★ {:.1}",
        product.id, product.title, product.ratings_average
    );
}
