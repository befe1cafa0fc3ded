//! Wishlist Synchronizer.
//!
//! Holds the saved product records and the ID set projected from them. The
//! two are always replaced or reset together.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, instrument};

use shopmart_core::ProductId;

use super::{
    COMMAND_QUEUE_DEPTH, Notifier, Resource, SIGN_IN_REQUIRED, SyncError, WishlistRemote,
    failure_message, record_failure, run,
};
use crate::api::Product;
use crate::session::{AccessToken, SessionSignal};

/// Read-only view of the wishlist published after every change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WishlistState {
    /// Saved products as last fetched.
    pub records: Arc<Vec<Product>>,
    /// IDs of saved products, without duplicates.
    pub ids: Arc<Vec<ProductId>>,
    /// Number of saved records, for the navigation badge.
    pub count: usize,
}

impl WishlistState {
    /// Whether a product is saved.
    #[must_use]
    pub fn contains(&self, product: &ProductId) -> bool {
        self.ids.contains(product)
    }
}

/// What a toggle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
}

enum Command {
    Refresh(oneshot::Sender<Arc<Vec<Product>>>),
    Toggle(ProductId, oneshot::Sender<Result<ToggleOutcome, SyncError>>),
}

// =============================================================================
// WishlistSynchronizer
// =============================================================================

/// Handle to the wishlist task. Cheap to clone; all clones drive the same
/// wishlist.
#[derive(Clone)]
pub struct WishlistSynchronizer {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<WishlistState>,
}

impl WishlistSynchronizer {
    /// Start the wishlist task.
    ///
    /// If a session is already present the task refreshes once on start.
    /// Must be called from within a tokio runtime.
    pub fn spawn<R: WishlistRemote>(remote: R, session: &SessionSignal, notifier: Notifier) -> Self {
        let (commands, receiver) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let (state_tx, state) = watch::channel(WishlistState::default());

        let actor = WishlistActor {
            remote,
            notifier,
            state: state_tx,
            records: Vec::new(),
            ids: Vec::new(),
            token: None,
        };
        tokio::spawn(run(actor, receiver, session.subscribe()));

        Self { commands, state }
    }

    /// Re-fetch the wishlist. Failure leaves it empty and is not reported.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Closed`] if the task has stopped.
    pub async fn refresh(&self) -> Result<Arc<Vec<Product>>, SyncError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Refresh(reply)).await?;
        response.await.map_err(|_| SyncError::Closed)
    }

    /// Save the product if it is not saved, unsave it if it is.
    ///
    /// # Errors
    ///
    /// Returns an error if no one is signed in or the remote request fails;
    /// the wishlist is unchanged in either case.
    pub async fn toggle(&self, product: &ProductId) -> Result<ToggleOutcome, SyncError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Toggle(product.clone(), reply)).await?;
        response.await.map_err(|_| SyncError::Closed)?
    }

    async fn send(&self, command: Command) -> Result<(), SyncError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SyncError::Closed)
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> WishlistState {
        self.state.borrow().clone()
    }

    /// Whether a product is saved.
    #[must_use]
    pub fn contains(&self, product: &ProductId) -> bool {
        self.state.borrow().contains(product)
    }

    /// Number of saved products.
    #[must_use]
    pub fn count(&self) -> usize {
        self.state.borrow().count
    }

    /// Observe state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WishlistState> {
        self.state.clone()
    }
}

// =============================================================================
// Wishlist Task
// =============================================================================

struct WishlistActor<R> {
    remote: R,
    notifier: Notifier,
    state: watch::Sender<WishlistState>,
    records: Vec<Product>,
    ids: Vec<ProductId>,
    token: Option<AccessToken>,
}

impl<R: WishlistRemote> Resource for WishlistActor<R> {
    type Command = Command;

    const NAME: &'static str = "wishlist";

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Refresh(reply) => {
                self.refresh().await;
                let _ = reply.send(Arc::new(self.records.clone()));
            }
            Command::Toggle(product, reply) => {
                let _ = reply.send(self.toggle(&product).await);
            }
        }
    }

    async fn session_changed(&mut self, token: Option<AccessToken>) {
        self.token = token;
        if self.token.is_some() {
            self.refresh().await;
        } else {
            debug!("Session ended, emptying wishlist");
            self.reset();
        }
    }
}

impl<R: WishlistRemote> WishlistActor<R> {
    #[instrument(skip(self))]
    async fn refresh(&mut self) {
        let Some(token) = self.token.clone() else {
            self.reset();
            return;
        };

        match self.remote.fetch_wishlist(&token).await {
            Ok(records) => {
                self.ids = unique_ids(&records);
                self.records = records;
                self.publish();
            }
            Err(e) => {
                record_failure("wishlist", "refresh", &e);
                self.reset();
            }
        }
    }

    #[instrument(skip(self), fields(product_id = %product))]
    async fn toggle(&mut self, product: &ProductId) -> Result<ToggleOutcome, SyncError> {
        let Some(token) = self.token.clone() else {
            self.notifier.error(SIGN_IN_REQUIRED);
            return Err(SyncError::NotSignedIn);
        };

        if self.ids.contains(product) {
            match self.remote.remove(&token, product).await {
                Ok(_) => {
                    self.ids.retain(|id| id != product);
                    self.records.retain(|record| &record.id != product);
                    self.publish();
                    self.notifier.success("Removed from wishlist");
                    Ok(ToggleOutcome::Removed)
                }
                Err(e) => {
                    record_failure("wishlist", "remove", &e);
                    self.notifier
                        .error(failure_message(&e, "Failed to update wishlist"));
                    Err(e.into())
                }
            }
        } else {
            match self.remote.add(&token, product).await {
                Ok(_) => {
                    self.ids.push(product.clone());
                    self.publish();
                    self.notifier.success("Added to wishlist");
                    // The acknowledgment carries IDs only; fetch the records
                    self.refresh().await;
                    Ok(ToggleOutcome::Added)
                }
                Err(e) => {
                    record_failure("wishlist", "add", &e);
                    self.notifier
                        .error(failure_message(&e, "Failed to update wishlist"));
                    Err(e.into())
                }
            }
        }
    }

    fn reset(&mut self) {
        self.records.clear();
        self.ids.clear();
        self.publish();
    }

    fn publish(&self) {
        self.state.send_replace(WishlistState {
            records: Arc::new(self.records.clone()),
            ids: Arc::new(self.ids.clone()),
            count: self.records.len(),
        });
    }
}

/// Project record IDs, keeping first occurrences only.
fn unique_ids(records: &[Product]) -> Vec<ProductId> {
    let mut ids: Vec<ProductId> = Vec::with_capacity(records.len());
    for record in records {
        if !ids.contains(&record.id) {
            ids.push(record.id.clone());
        }
    }
    ids
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::sync::testing::{FakeWishlist, product, server_error, session, settle, signed_in};
    use crate::sync::{Notification, NotificationLevel};

    fn p(id: &str) -> ProductId {
        ProductId::new(id)
    }

    fn ids(state: &WishlistState) -> Vec<&str> {
        state.ids.iter().map(ProductId::as_str).collect()
    }

    async fn next_notification(
        rx: &mut tokio::sync::broadcast::Receiver<Notification>,
    ) -> Notification {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_toggle_removes_present_product() {
        let remote = FakeWishlist::with_ids(&["P1", "P2"]);
        let signal = signed_in("u1");
        let notifier = Notifier::default();
        let mut notes = notifier.subscribe();
        let wishlist = WishlistSynchronizer::spawn(remote.clone(), &signal, notifier);
        wishlist.refresh().await.unwrap();
        let fetches = remote.fetches();

        assert_eq!(wishlist.toggle(&p("P1")).await.unwrap(), ToggleOutcome::Removed);

        let state = wishlist.state();
        assert_eq!(ids(&state), vec!["P2"]);
        assert_eq!(state.records.len(), 1);
        assert_eq!(state.records[0].id, p("P2"));
        assert_eq!(state.count, 1);
        // Removal needs no refresh
        assert_eq!(remote.fetches(), fetches);
        assert_eq!(
            next_notification(&mut notes).await.message,
            "Removed from wishlist"
        );
    }

    #[tokio::test]
    async fn test_toggle_adds_then_refreshes_records() {
        let remote = FakeWishlist::default();
        let signal = signed_in("u1");
        let wishlist = WishlistSynchronizer::spawn(remote.clone(), &signal, Notifier::default());
        wishlist.refresh().await.unwrap();
        let fetches = remote.fetches();

        assert_eq!(wishlist.toggle(&p("P1")).await.unwrap(), ToggleOutcome::Added);

        let state = wishlist.state();
        assert_eq!(ids(&state), vec!["P1"]);
        assert_eq!(state.records.len(), 1);
        assert_eq!(state.records[0].title, "Product P1");
        assert_eq!(remote.fetches(), fetches + 1);
    }

    #[tokio::test]
    async fn test_even_toggles_restore_membership() {
        let remote = FakeWishlist::with_ids(&["P2"]);
        let signal = signed_in("u1");
        let wishlist = WishlistSynchronizer::spawn(remote, &signal, Notifier::default());
        wishlist.refresh().await.unwrap();

        for target in ["P1", "P2"] {
            let before = wishlist.contains(&p(target));
            for _ in 0..4 {
                wishlist.toggle(&p(target)).await.unwrap();
            }
            assert_eq!(wishlist.contains(&p(target)), before);
        }
        assert_eq!(ids(&wishlist.state()), vec!["P2"]);
    }

    #[tokio::test]
    async fn test_toggle_failure_leaves_state_untouched() {
        let remote = FakeWishlist::with_ids(&["P1"]);
        let signal = signed_in("u1");
        let notifier = Notifier::default();
        let mut notes = notifier.subscribe();
        let wishlist = WishlistSynchronizer::spawn(remote.clone(), &signal, notifier);
        wishlist.refresh().await.unwrap();
        let before = wishlist.state();

        remote.fail_next(server_error());
        assert!(matches!(
            wishlist.toggle(&p("P1")).await,
            Err(SyncError::Remote(_))
        ));
        remote.fail_next(server_error());
        assert!(wishlist.toggle(&p("P9")).await.is_err());

        assert_eq!(wishlist.state(), before);
        let note = next_notification(&mut notes).await;
        assert_eq!(note.level, NotificationLevel::Error);
        assert_eq!(note.message, "Failed to update wishlist");
    }

    #[tokio::test]
    async fn test_refresh_failure_resets_records_and_ids() {
        let remote = FakeWishlist::with_ids(&["P1", "P2"]);
        let signal = signed_in("u1");
        let wishlist = WishlistSynchronizer::spawn(remote.clone(), &signal, Notifier::default());
        assert_eq!(wishlist.refresh().await.unwrap().len(), 2);

        remote.fail_next(server_error());
        assert!(wishlist.refresh().await.unwrap().is_empty());

        let state = wishlist.state();
        assert!(state.records.is_empty());
        assert!(state.ids.is_empty());
        assert_eq!(state.count, 0);
    }

    #[tokio::test]
    async fn test_session_transitions() {
        let remote = FakeWishlist::with_ids(&["P1", "P2", "P3"]);
        let signal = SessionSignal::new();
        let wishlist = WishlistSynchronizer::spawn(remote.clone(), &signal, Notifier::default());
        let mut state = wishlist.subscribe();

        signal.sign_in(session("u1"));
        settle(&mut state, |s| s.count == 3).await;
        assert_eq!(remote.fetches(), 1);

        let calls = remote.calls();
        signal.sign_out();
        settle(&mut state, |s| s.count == 0 && s.ids.is_empty()).await;
        assert_eq!(remote.calls(), calls);
    }

    #[tokio::test]
    async fn test_toggle_requires_session() {
        let remote = FakeWishlist::default();
        let signal = SessionSignal::new();
        let wishlist = WishlistSynchronizer::spawn(remote.clone(), &signal, Notifier::default());

        assert!(matches!(
            wishlist.toggle(&p("P1")).await,
            Err(SyncError::NotSignedIn)
        ));
        assert_eq!(remote.calls(), 0);
    }

    #[test]
    fn test_unique_ids_drops_duplicates() {
        let records = vec![product("A"), product("B"), product("A")];
        let ids = unique_ids(&records);
        assert_eq!(ids, vec![p("A"), p("B")]);
    }
}
