//! Broadcast bus for transient shopper-facing notifications.

use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 64;

/// Whether a notification reports success or failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

/// A short message for the shopper ("Added to cart", "Error removing item").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.level {
            NotificationLevel::Success => write!(f, "✓ {}", self.message),
            NotificationLevel::Error => write!(f, "✗ {}", self.message),
        }
    }
}

/// Fan-out of notifications to every subscriber.
///
/// Publishing never blocks and never fails; with no subscribers the
/// notification is dropped.
#[derive(Clone, Debug)]
pub struct Notifier {
    sender: broadcast::Sender<Notification>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Notifier {
    /// Creates a notifier with the given buffer capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes a notification to all subscribers (best effort).
    pub fn publish(&self, notification: Notification) {
        tracing::debug!(
            level = ?notification.level,
            message = %notification.message,
            receivers = self.sender.receiver_count(),
            "Notification"
        );
        let _ = self.sender.send(notification);
    }

    /// Publishes a success message.
    pub fn success(&self, message: impl Into<String>) {
        self.publish(Notification {
            level: NotificationLevel::Success,
            message: message.into(),
        });
    }

    /// Publishes an error message.
    pub fn error(&self, message: impl Into<String>) {
        self.publish(Notification {
            level: NotificationLevel::Error,
            message: message.into(),
        });
    }

    /// Subscribes to notifications published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}
