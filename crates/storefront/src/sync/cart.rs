//! Cart Synchronizer.
//!
//! Mirrors the shopper's remote cart. Every successful mutation replaces the
//! snapshot with the server's response; a failed refresh or any clear leaves
//! the cart empty; other failures leave it untouched.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, instrument};

use shopmart_core::ProductId;

use super::{
    COMMAND_QUEUE_DEPTH, CartRemote, Notifier, Resource, SIGN_IN_REQUIRED, SyncError,
    failure_message, record_failure, run,
};
use crate::api::CartSnapshot;
use crate::session::{AccessToken, SessionSignal};

/// Read-only view of the cart published after every change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartState {
    /// Authoritative cart as of the last successful sync.
    pub snapshot: Arc<CartSnapshot>,
    /// Number of line items, for the navigation badge.
    pub item_count: usize,
    /// An add request is in flight.
    pub adding: bool,
}

type Reply = oneshot::Sender<Result<Arc<CartSnapshot>, SyncError>>;

enum Command {
    Refresh(oneshot::Sender<Arc<CartSnapshot>>),
    Add(ProductId, Reply),
    Remove(ProductId, Reply),
    SetQuantity(ProductId, u32, Reply),
    Clear(oneshot::Sender<()>),
}

// =============================================================================
// CartSynchronizer
// =============================================================================

/// Handle to the cart task. Cheap to clone; all clones drive the same cart.
#[derive(Clone)]
pub struct CartSynchronizer {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<CartState>,
}

impl CartSynchronizer {
    /// Start the cart task.
    ///
    /// If a session is already present the task refreshes once on start.
    /// Must be called from within a tokio runtime.
    pub fn spawn<R: CartRemote>(remote: R, session: &SessionSignal, notifier: Notifier) -> Self {
        let (commands, receiver) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let (state_tx, state) = watch::channel(CartState::default());

        let actor = CartActor {
            remote,
            notifier,
            state: state_tx,
            snapshot: Arc::new(CartSnapshot::empty()),
            token: None,
            adding: false,
        };
        tokio::spawn(run(actor, receiver, session.subscribe()));

        Self { commands, state }
    }

    async fn call<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SyncError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| SyncError::Closed)?;
        response.await.map_err(|_| SyncError::Closed)
    }

    /// Re-fetch the cart. Failure leaves the cart empty and is not reported.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Closed`] if the task has stopped.
    pub async fn refresh(&self) -> Result<Arc<CartSnapshot>, SyncError> {
        self.call(Command::Refresh).await
    }

    /// Add one unit of a product.
    ///
    /// # Errors
    ///
    /// Returns an error if no one is signed in or the remote request fails;
    /// the cart is unchanged in either case.
    pub async fn add_item(&self, product: &ProductId) -> Result<Arc<CartSnapshot>, SyncError> {
        let product = product.clone();
        self.call(|reply| Command::Add(product, reply)).await?
    }

    /// Remove a product's line.
    ///
    /// # Errors
    ///
    /// Returns an error if no one is signed in or the remote request fails;
    /// the cart is unchanged in either case.
    pub async fn remove_item(&self, product: &ProductId) -> Result<Arc<CartSnapshot>, SyncError> {
        let product = product.clone();
        self.call(|reply| Command::Remove(product, reply)).await?
    }

    /// Set a product's quantity.
    ///
    /// Quantities below 1 are rejected here without contacting the remote
    /// API or publishing a notification.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidQuantity`] for quantities below 1, or an
    /// error if no one is signed in or the remote request fails.
    pub async fn set_quantity(
        &self,
        product: &ProductId,
        quantity: i64,
    ) -> Result<Arc<CartSnapshot>, SyncError> {
        let Ok(count @ 1..) = u32::try_from(quantity) else {
            return Err(SyncError::InvalidQuantity(quantity));
        };
        let product = product.clone();
        self.call(|reply| Command::SetQuantity(product, count, reply))
            .await?
    }

    /// Delete the cart. The local cart is emptied whether or not the remote
    /// request succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Closed`] if the task has stopped.
    pub async fn clear(&self) -> Result<(), SyncError> {
        self.call(Command::Clear).await
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> CartState {
        self.state.borrow().clone()
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<CartSnapshot> {
        Arc::clone(&self.state.borrow().snapshot)
    }

    /// Current number of line items.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.state.borrow().item_count
    }

    /// Whether an add request is in flight.
    #[must_use]
    pub fn is_adding(&self) -> bool {
        self.state.borrow().adding
    }

    /// Observe state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.state.clone()
    }
}

// =============================================================================
// Cart Task
// =============================================================================

struct CartActor<R> {
    remote: R,
    notifier: Notifier,
    state: watch::Sender<CartState>,
    snapshot: Arc<CartSnapshot>,
    token: Option<AccessToken>,
    adding: bool,
}

impl<R: CartRemote> Resource for CartActor<R> {
    type Command = Command;

    const NAME: &'static str = "cart";

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Refresh(reply) => {
                let _ = reply.send(self.refresh().await);
            }
            Command::Add(product, reply) => {
                let _ = reply.send(self.add_item(&product).await);
            }
            Command::Remove(product, reply) => {
                let _ = reply.send(self.remove_item(&product).await);
            }
            Command::SetQuantity(product, count, reply) => {
                let _ = reply.send(self.set_quantity(&product, count).await);
            }
            Command::Clear(reply) => {
                self.clear().await;
                let _ = reply.send(());
            }
        }
    }

    async fn session_changed(&mut self, token: Option<AccessToken>) {
        self.token = token;
        if self.token.is_some() {
            self.refresh().await;
        } else {
            debug!("Session ended, emptying cart");
            self.reset();
        }
    }
}

impl<R: CartRemote> CartActor<R> {
    #[instrument(skip(self))]
    async fn refresh(&mut self) -> Arc<CartSnapshot> {
        let Some(token) = self.token.clone() else {
            self.reset();
            return Arc::clone(&self.snapshot);
        };

        match self.remote.fetch_cart(&token).await {
            Ok(snapshot) => self.replace(snapshot),
            Err(e) => {
                record_failure("cart", "refresh", &e);
                self.reset();
            }
        }
        Arc::clone(&self.snapshot)
    }

    #[instrument(skip(self), fields(product_id = %product))]
    async fn add_item(&mut self, product: &ProductId) -> Result<Arc<CartSnapshot>, SyncError> {
        let token = self.require_token()?;

        self.adding = true;
        self.publish();
        let result = self.remote.add_item(&token, product).await;
        self.adding = false;

        match result {
            Ok(snapshot) => {
                self.replace(snapshot);
                self.notifier.success("Added to cart");
                Ok(Arc::clone(&self.snapshot))
            }
            Err(e) => {
                self.publish();
                record_failure("cart", "add", &e);
                self.notifier
                    .error(failure_message(&e, "Failed to add to cart"));
                Err(e.into())
            }
        }
    }

    #[instrument(skip(self), fields(product_id = %product))]
    async fn remove_item(&mut self, product: &ProductId) -> Result<Arc<CartSnapshot>, SyncError> {
        let token = self.require_token()?;

        match self.remote.remove_item(&token, product).await {
            Ok(snapshot) => {
                self.replace(snapshot);
                self.notifier.success("Removed from cart");
                Ok(Arc::clone(&self.snapshot))
            }
            Err(e) => {
                record_failure("cart", "remove", &e);
                self.notifier
                    .error(failure_message(&e, "Error removing item"));
                Err(e.into())
            }
        }
    }

    #[instrument(skip(self), fields(product_id = %product))]
    async fn set_quantity(
        &mut self,
        product: &ProductId,
        count: u32,
    ) -> Result<Arc<CartSnapshot>, SyncError> {
        let token = self.require_token()?;

        match self.remote.update_item(&token, product, count).await {
            Ok(snapshot) => {
                self.replace(snapshot);
                Ok(Arc::clone(&self.snapshot))
            }
            Err(e) => {
                record_failure("cart", "update quantity", &e);
                self.notifier
                    .error(failure_message(&e, "Error updating quantity"));
                Err(e.into())
            }
        }
    }

    #[instrument(skip(self))]
    async fn clear(&mut self) {
        if let Some(token) = self.token.clone()
            && let Err(e) = self.remote.clear(&token).await
        {
            record_failure("cart", "clear", &e);
        }
        self.reset();
    }

    fn require_token(&self) -> Result<AccessToken, SyncError> {
        self.token.clone().ok_or_else(|| {
            self.notifier.error(SIGN_IN_REQUIRED);
            SyncError::NotSignedIn
        })
    }

    fn replace(&mut self, snapshot: CartSnapshot) {
        self.snapshot = Arc::new(snapshot);
        self.publish();
    }

    fn reset(&mut self) {
        self.snapshot = Arc::new(CartSnapshot::empty());
        self.publish();
    }

    fn publish(&self) {
        self.state.send_replace(CartState {
            snapshot: Arc::clone(&self.snapshot),
            item_count: self.snapshot.item_count(),
            adding: self.adding,
        });
    }
}
