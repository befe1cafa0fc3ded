//! Storefront state shared across front ends.

use std::sync::Arc;

use crate::api::{ApiError, ShopClient};
use crate::config::StorefrontConfig;
use crate::services::{AuthService, CatalogService, CheckoutService};
use crate::session::SessionSignal;
use crate::sync::{CartSynchronizer, Notifier, WishlistSynchronizer};

/// Everything a front end needs to drive the storefront.
///
/// Cheaply cloneable via `Arc`. The cart and wishlist synchronizers are
/// spawned against the API client and follow the session signal for as
/// long as any clone is alive.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: StorefrontConfig,
    client: ShopClient,
    session: SessionSignal,
    notifier: Notifier,
    cart: CartSynchronizer,
    wishlist: WishlistSynchronizer,
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("api_base_url", &self.inner.config.api_base_url.as_str())
            .field("signed_in", &self.inner.session.is_present())
            .finish_non_exhaustive()
    }
}

impl Storefront {
    /// Build the client, an empty session and both synchronizers.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, ApiError> {
        let client = ShopClient::new(&config)?;
        Ok(Self::with_client(config, client))
    }

    /// Same as [`Storefront::new`] with a ready-made client.
    #[must_use]
    pub fn with_client(config: StorefrontConfig, client: ShopClient) -> Self {
        let session = SessionSignal::new();
        let notifier = Notifier::default();
        let cart = CartSynchronizer::spawn(client.clone(), &session, notifier.clone());
        let wishlist = WishlistSynchronizer::spawn(client.clone(), &session, notifier.clone());

        Self {
            inner: Arc::new(StorefrontInner {
                config,
                client,
                session,
                notifier,
                cart,
                wishlist,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the remote API client.
    #[must_use]
    pub fn client(&self) -> &ShopClient {
        &self.inner.client
    }

    /// Get a reference to the session signal.
    #[must_use]
    pub fn session(&self) -> &SessionSignal {
        &self.inner.session
    }

    /// Get a reference to the notification fan-out.
    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    /// Get a reference to the cart synchronizer.
    #[must_use]
    pub fn cart(&self) -> &CartSynchronizer {
        &self.inner.cart
    }

    /// Get a reference to the wishlist synchronizer.
    #[must_use]
    pub fn wishlist(&self) -> &WishlistSynchronizer {
        &self.inner.wishlist
    }

    /// Authentication bound to this storefront's session.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(&self.inner.client, &self.inner.session)
    }

    /// Catalog browsing with the configured page size.
    #[must_use]
    pub fn catalog(&self) -> CatalogService<'_> {
        CatalogService::new(&self.inner.client, self.inner.config.page_size)
    }

    /// Checkout of the synchronized cart.
    #[must_use]
    pub fn checkout(&self) -> CheckoutService<'_> {
        CheckoutService::new(
            &self.inner.client,
            &self.inner.session,
            &self.inner.cart,
            self.inner.config.return_origin(),
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_storefront_is_signed_out() {
        let config = StorefrontConfig::from_vars(|key| {
            (key == "SHOPMART_API_BASE_URL").then(|| "http://127.0.0.1:9".to_string())
        })
        .unwrap();
        let storefront = Storefront::new(config).unwrap();

        assert!(!storefront.session().is_present());
        assert_eq!(storefront.cart().item_count(), 0);
        assert_eq!(storefront.wishlist().count(), 0);
        assert!(format!("{storefront:?}").contains("signed_in: false"));
    }
}
