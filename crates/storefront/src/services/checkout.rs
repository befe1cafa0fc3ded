//! Checkout and order history.
//!
//! Cash orders are placed immediately and the cart is cleared afterwards.
//! Online orders open a hosted payment session; sending the shopper there
//! is left to the caller.

use thiserror::Error;
use tracing::{info, instrument};
use url::Url;

use shopmart_core::{CheckoutMethod, ValidationError, validation};

use crate::api::{ApiError, Order, ShippingAddress, ShopClient};
use crate::session::SessionSignal;
use crate::sync::{CartSynchronizer, SyncError};

/// Cities offered at checkout.
pub const CITIES: &[&str] = &[
    "Cairo",
    "Alexandria",
    "Giza",
    "Mansoura",
    "Tanta",
    "Aswan",
    "Luxor",
    "Suez",
    "Port Said",
    "Ismailia",
    "Fayyum",
    "Zagazig",
    "Damanhur",
    "Damietta",
];

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The address form is invalid.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// There is no active cart to order.
    #[error("Cart is empty!")]
    EmptyCart,

    /// Checkout needs a signed-in shopper.
    #[error("not signed in")]
    NotSignedIn,

    /// The payment session response had no URL.
    #[error("payment session did not include a URL")]
    MissingPaymentUrl,

    /// The payment session URL is not a valid URL.
    #[error("invalid payment URL: {0}")]
    InvalidPaymentUrl(String),

    /// Remote request failed.
    #[error("remote error: {0}")]
    Api(#[from] ApiError),

    /// The cart synchronizer is gone.
    #[error("cart error: {0}")]
    Sync(#[from] SyncError),
}

/// Result of a successful checkout.
#[derive(Debug, Clone)]
pub enum CheckoutOutcome {
    /// Cash order placed.
    Placed(Box<Order>),
    /// Card payment: send the shopper to this hosted page.
    Redirect(Url),
}

/// Build a shipping address from form input.
///
/// # Errors
///
/// Returns an error when details or city are blank or the phone is not an
/// Egyptian mobile number.
pub fn shipping_address(
    details: &str,
    phone: &str,
    city: &str,
) -> Result<ShippingAddress, ValidationError> {
    Ok(ShippingAddress {
        details: validation::required("details", details)?.to_string(),
        phone: validation::phone(phone)?,
        city: validation::required("city", city)?.to_string(),
    })
}

/// Checkout service.
pub struct CheckoutService<'a> {
    client: &'a ShopClient,
    session: &'a SessionSignal,
    cart: &'a CartSynchronizer,
    return_origin: String,
}

impl<'a> CheckoutService<'a> {
    /// Create a checkout service. `return_origin` is where the hosted payment
    /// page sends the shopper back to.
    #[must_use]
    pub const fn new(
        client: &'a ShopClient,
        session: &'a SessionSignal,
        cart: &'a CartSynchronizer,
        return_origin: String,
    ) -> Self {
        Self {
            client,
            session,
            cart,
            return_origin,
        }
    }

    /// Order the current cart.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::NotSignedIn` without a session,
    /// `CheckoutError::EmptyCart` without an active cart, and remote
    /// failures as `CheckoutError::Api`.
    #[instrument(skip(self, address))]
    pub async fn checkout(
        &self,
        method: CheckoutMethod,
        address: &ShippingAddress,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        let token = self.session.token().ok_or(CheckoutError::NotSignedIn)?;
        let snapshot = self.cart.snapshot();
        let cart_id = snapshot
            .id
            .as_ref()
            .filter(|_| !snapshot.is_empty())
            .ok_or(CheckoutError::EmptyCart)?;

        match method {
            CheckoutMethod::Cash => {
                let order = self
                    .client
                    .create_cash_order(&token, cart_id, address)
                    .await?;
                info!(order_id = %order.id, "Cash order placed");
                self.cart.clear().await?;
                Ok(CheckoutOutcome::Placed(Box::new(order)))
            }
            CheckoutMethod::Online => {
                let url = self
                    .client
                    .create_checkout_session(&token, cart_id, address, &self.return_origin)
                    .await?
                    .ok_or(CheckoutError::MissingPaymentUrl)?;
                let url =
                    Url::parse(&url).map_err(|_| CheckoutError::InvalidPaymentUrl(url.clone()))?;
                info!(cart_id = %cart_id, "Payment session opened");
                Ok(CheckoutOutcome::Redirect(url))
            }
        }
    }

    /// Orders of the signed-in shopper, newest first.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::NotSignedIn` without a session, or the remote
    /// failure.
    #[instrument(skip(self))]
    pub async fn order_history(&self) -> Result<Vec<Order>, CheckoutError> {
        let session = self.session.current().ok_or(CheckoutError::NotSignedIn)?;
        let mut orders = self.client.get_user_orders(&session.user().id).await?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }
}
