//! Cart and wishlist synchronizers.
//!
//! Each synchronizer mirrors one remote resource for the signed-in shopper.
//! It runs as a single tokio task that owns the snapshot outright:
//!
//! - Operations are messages on an `mpsc` queue, answered over `oneshot`,
//!   so mutations on one resource run one at a time in arrival order
//! - Readers get immutable views through a `watch` channel and can never
//!   mutate the snapshot
//! - The task follows the [`SessionSignal`](crate::session::SessionSignal):
//!   a new credential triggers one refresh, sign-out empties the snapshot
//!   without touching the network
//!
//! Remote failures never escape as panics. Operations return
//! `Result<_, SyncError>` and also publish a [`Notification`] for the
//! shopper on the shared [`Notifier`].

pub mod cart;
mod notify;
pub mod wishlist;

pub use cart::{CartState, CartSynchronizer};
pub use notify::{Notification, NotificationLevel, Notifier};
pub use wishlist::{ToggleOutcome, WishlistState, WishlistSynchronizer};

use std::future::Future;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use shopmart_core::ProductId;

use crate::api::{ApiError, CartSnapshot, Product, ShopClient};
use crate::session::{AccessToken, Session};

/// Depth of each synchronizer's command queue.
const COMMAND_QUEUE_DEPTH: usize = 32;

/// Shown when a mutation is attempted with no one signed in.
const SIGN_IN_REQUIRED: &str = "Please login first";

/// Errors returned by synchronizer operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The remote API rejected or failed the request.
    #[error("Remote request failed: {0}")]
    Remote(#[from] ApiError),

    /// Cart quantities must be at least 1.
    #[error("Invalid quantity {0}: must be at least 1")]
    InvalidQuantity(i64),

    /// No session is present.
    #[error("Not signed in")]
    NotSignedIn,

    /// The synchronizer task has stopped.
    #[error("Synchronizer stopped")]
    Closed,
}

// =============================================================================
// Remote Seams
// =============================================================================

/// Remote cart operations, scoped by an explicit credential.
pub trait CartRemote: Send + Sync + 'static {
    /// Fetch the active cart.
    fn fetch_cart(
        &self,
        token: &AccessToken,
    ) -> impl Future<Output = Result<CartSnapshot, ApiError>> + Send;

    /// Add one unit of a product.
    fn add_item(
        &self,
        token: &AccessToken,
        product: &ProductId,
    ) -> impl Future<Output = Result<CartSnapshot, ApiError>> + Send;

    /// Set a line's quantity.
    fn update_item(
        &self,
        token: &AccessToken,
        product: &ProductId,
        quantity: u32,
    ) -> impl Future<Output = Result<CartSnapshot, ApiError>> + Send;

    /// Remove a line.
    fn remove_item(
        &self,
        token: &AccessToken,
        product: &ProductId,
    ) -> impl Future<Output = Result<CartSnapshot, ApiError>> + Send;

    /// Delete the cart.
    fn clear(&self, token: &AccessToken) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// Remote wishlist operations, scoped by an explicit credential.
pub trait WishlistRemote: Send + Sync + 'static {
    /// Fetch the saved product records.
    fn fetch_wishlist(
        &self,
        token: &AccessToken,
    ) -> impl Future<Output = Result<Vec<Product>, ApiError>> + Send;

    /// Save a product. Acknowledges with IDs only.
    fn add(
        &self,
        token: &AccessToken,
        product: &ProductId,
    ) -> impl Future<Output = Result<Vec<ProductId>, ApiError>> + Send;

    /// Unsave a product. Acknowledges with IDs only.
    fn remove(
        &self,
        token: &AccessToken,
        product: &ProductId,
    ) -> impl Future<Output = Result<Vec<ProductId>, ApiError>> + Send;
}

impl CartRemote for ShopClient {
    fn fetch_cart(
        &self,
        token: &AccessToken,
    ) -> impl Future<Output = Result<CartSnapshot, ApiError>> + Send {
        self.get_cart(token)
    }

    fn add_item(
        &self,
        token: &AccessToken,
        product: &ProductId,
    ) -> impl Future<Output = Result<CartSnapshot, ApiError>> + Send {
        self.add_to_cart(token, product)
    }

    fn update_item(
        &self,
        token: &AccessToken,
        product: &ProductId,
        quantity: u32,
    ) -> impl Future<Output = Result<CartSnapshot, ApiError>> + Send {
        self.update_cart_item(token, product, quantity)
    }

    fn remove_item(
        &self,
        token: &AccessToken,
        product: &ProductId,
    ) -> impl Future<Output = Result<CartSnapshot, ApiError>> + Send {
        self.remove_cart_item(token, product)
    }

    fn clear(&self, token: &AccessToken) -> impl Future<Output = Result<(), ApiError>> + Send {
        self.clear_cart(token)
    }
}

impl WishlistRemote for ShopClient {
    fn fetch_wishlist(
        &self,
        token: &AccessToken,
    ) -> impl Future<Output = Result<Vec<Product>, ApiError>> + Send {
        self.get_wishlist(token)
    }

    fn add(
        &self,
        token: &AccessToken,
        product: &ProductId,
    ) -> impl Future<Output = Result<Vec<ProductId>, ApiError>> + Send {
        self.add_to_wishlist(token, product)
    }

    fn remove(
        &self,
        token: &AccessToken,
        product: &ProductId,
    ) -> impl Future<Output = Result<Vec<ProductId>, ApiError>> + Send {
        self.remove_from_wishlist(token, product)
    }
}

// =============================================================================
// Task Loop
// =============================================================================

/// A snapshot owner driven by [`run`].
trait Resource: Send {
    type Command: Send;

    /// Label used in logs.
    const NAME: &'static str;

    /// Act on one queued operation.
    fn handle(&mut self, command: Self::Command) -> impl Future<Output = ()> + Send;

    /// React to a new credential (`Some`) or to sign-out (`None`).
    fn session_changed(&mut self, token: Option<AccessToken>) -> impl Future<Output = ()> + Send;
}

/// Serve commands until every handle is dropped, following the session.
async fn run<A: Resource>(
    mut resource: A,
    mut commands: mpsc::Receiver<A::Command>,
    mut session: watch::Receiver<Option<Session>>,
) {
    let mut token = None;
    follow_session(&mut resource, &mut session, &mut token).await;
    let mut session_open = true;

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                // Apply a pending sign-in/out before acting on its behalf
                if session_open && session.has_changed().unwrap_or(false) {
                    follow_session(&mut resource, &mut session, &mut token).await;
                }
                resource.handle(command).await;
            }
            changed = session.changed(), if session_open => {
                if changed.is_err() {
                    session_open = false;
                    continue;
                }
                follow_session(&mut resource, &mut session, &mut token).await;
            }
        }
    }

    debug!(resource = A::NAME, "Synchronizer stopped");
}

async fn follow_session<A: Resource>(
    resource: &mut A,
    session: &mut watch::Receiver<Option<Session>>,
    current: &mut Option<AccessToken>,
) {
    let token = session
        .borrow_and_update()
        .as_ref()
        .map(|s| s.token().clone());
    if token == *current {
        return;
    }
    current.clone_from(&token);
    resource.session_changed(token).await;
}

/// Pick the shopper-facing text for a failed request.
fn failure_message(error: &ApiError, fallback: &str) -> String {
    error
        .remote_message()
        .map_or_else(|| fallback.to_string(), ToString::to_string)
}

/// Record a remote failure in logs and as a Sentry breadcrumb.
fn record_failure(category: &str, operation: &str, error: &ApiError) {
    if error.is_unexpected() {
        tracing::warn!(operation, error = %error, "{category} sync failed");
    } else {
        tracing::debug!(operation, error = %error, "{category} sync rejected");
    }
    let detail = error.to_string();
    crate::error::add_breadcrumb(
        category,
        &format!("{operation} failed"),
        Some(&[("error", detail.as_str())]),
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub(crate) mod testing {
    //! In-memory remotes with call counters and failure injection.

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use rust_decimal::Decimal;
    use tokio::sync::watch;

    use shopmart_core::{CartId, CartItemId};

    use super::*;
    use crate::api::{LineItem, ProductRef};
    use crate::session::{Session, SessionSignal, test_token};

    const FAR_FUTURE: i64 = 4_102_444_800;

    pub fn session(user: &str) -> Session {
        Session::from_token(test_token(user, FAR_FUTURE), None).unwrap()
    }

    pub fn signed_in(user: &str) -> SessionSignal {
        let signal = SessionSignal::new();
        signal.sign_in(session(user));
        signal
    }

    pub fn product(id: &str) -> Product {
        serde_json::from_value(serde_json::json!({
            "_id": id,
            "title": format!("Product {id}"),
            "price": 100,
        }))
        .unwrap()
    }

    /// Wait until a watched value satisfies a predicate, failing after a second.
    pub async fn settle<T>(rx: &mut watch::Receiver<T>, predicate: impl FnMut(&T) -> bool) {
        tokio::time::timeout(Duration::from_secs(1), rx.wait_for(predicate))
            .await
            .expect("timed out waiting for state")
            .unwrap();
    }

    /// A cart server holding `(product, quantity)` lines at 100 per unit.
    #[derive(Clone, Default)]
    pub struct FakeCart {
        pub lines: Arc<Mutex<Vec<(String, u32)>>>,
        pub calls: Arc<AtomicUsize>,
        pub fetches: Arc<AtomicUsize>,
        pub failures: Arc<Mutex<VecDeque<ApiError>>>,
    }

    impl FakeCart {
        pub fn with_lines(lines: &[(&str, u32)]) -> Self {
            let cart = Self::default();
            *cart.lines.lock().unwrap() = lines
                .iter()
                .map(|(id, qty)| ((*id).to_string(), *qty))
                .collect();
            cart
        }

        pub fn fail_next(&self, error: ApiError) {
            self.failures
                .lock()
                .unwrap()
                .push_back(error);
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }

        fn begin(&self) -> Result<(), ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.failures
                .lock()
                .unwrap()
                .pop_front()
                .map_or(Ok(()), Err)
        }

        fn snapshot(&self) -> CartSnapshot {
            let lines = self.lines.lock().unwrap();
            if lines.is_empty() {
                return CartSnapshot::empty();
            }
            let items: Vec<LineItem> = lines
                .iter()
                .map(|(id, qty)| LineItem {
                    id: CartItemId::new(format!("line-{id}")),
                    product: ProductRef::Full(Box::new(product(id))),
                    unit_price: Decimal::from(100),
                    quantity: *qty,
                })
                .collect();
            let total = items
                .iter()
                .map(|item| item.unit_price * Decimal::from(item.quantity))
                .sum();
            CartSnapshot {
                id: Some(CartId::new("cart-1")),
                items,
                total,
            }
        }

        fn edit(&self, f: impl FnOnce(&mut Vec<(String, u32)>)) -> CartSnapshot {
            f(&mut self.lines.lock().unwrap());
            self.snapshot()
        }
    }

    impl CartRemote for FakeCart {
        async fn fetch_cart(&self, _token: &AccessToken) -> Result<CartSnapshot, ApiError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.begin()?;
            Ok(self.snapshot())
        }

        async fn add_item(
            &self,
            _token: &AccessToken,
            product: &ProductId,
        ) -> Result<CartSnapshot, ApiError> {
            self.begin()?;
            Ok(self.edit(|lines| {
                match lines.iter_mut().find(|(id, _)| id == product.as_str()) {
                    Some((_, qty)) => *qty += 1,
                    None => lines.push((product.to_string(), 1)),
                }
            }))
        }

        async fn update_item(
            &self,
            _token: &AccessToken,
            product: &ProductId,
            quantity: u32,
        ) -> Result<CartSnapshot, ApiError> {
            self.begin()?;
            Ok(self.edit(|lines| {
                if let Some((_, qty)) = lines.iter_mut().find(|(id, _)| id == product.as_str()) {
                    *qty = quantity;
                }
            }))
        }

        async fn remove_item(
            &self,
            _token: &AccessToken,
            product: &ProductId,
        ) -> Result<CartSnapshot, ApiError> {
            self.begin()?;
            Ok(self.edit(|lines| lines.retain(|(id, _)| id != product.as_str())))
        }

        async fn clear(&self, _token: &AccessToken) -> Result<(), ApiError> {
            self.begin()?;
            self.lines.lock().unwrap().clear();
            Ok(())
        }
    }

    /// A wishlist server holding product IDs.
    #[derive(Clone, Default)]
    pub struct FakeWishlist {
        pub ids: Arc<Mutex<Vec<String>>>,
        pub calls: Arc<AtomicUsize>,
        pub fetches: Arc<AtomicUsize>,
        pub failures: Arc<Mutex<VecDeque<ApiError>>>,
    }

    impl FakeWishlist {
        pub fn with_ids(ids: &[&str]) -> Self {
            let wishlist = Self::default();
            *wishlist.ids.lock().unwrap() =
                ids.iter().map(|id| (*id).to_string()).collect();
            wishlist
        }

        pub fn fail_next(&self, error: ApiError) {
            self.failures
                .lock()
                .unwrap()
                .push_back(error);
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }

        fn begin(&self) -> Result<(), ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.failures
                .lock()
                .unwrap()
                .pop_front()
                .map_or(Ok(()), Err)
        }

        fn ack(&self) -> Vec<ProductId> {
            self.ids
                .lock()
                .unwrap()
                .iter()
                .map(ProductId::new)
                .collect()
        }
    }

    impl WishlistRemote for FakeWishlist {
        async fn fetch_wishlist(&self, _token: &AccessToken) -> Result<Vec<Product>, ApiError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.begin()?;
            Ok(self
                .ids
                .lock()
                .unwrap()
                .iter()
                .map(|id| product(id))
                .collect())
        }

        async fn add(
            &self,
            _token: &AccessToken,
            product: &ProductId,
        ) -> Result<Vec<ProductId>, ApiError> {
            self.begin()?;
            {
                let mut ids = self.ids.lock().unwrap();
                if !ids.iter().any(|id| id == product.as_str()) {
                    ids.push(product.to_string());
                }
            }
            Ok(self.ack())
        }

        async fn remove(
            &self,
            _token: &AccessToken,
            product: &ProductId,
        ) -> Result<Vec<ProductId>, ApiError> {
            self.begin()?;
            self.ids
                .lock()
                .unwrap()
                .retain(|id| id != product.as_str());
            Ok(self.ack())
        }
    }

    pub fn server_error() -> ApiError {
        ApiError::Remote {
            status: 500,
            message: String::new(),
        }
    }
}
