//! User-facing notifications.
//!
//! The board reports every resolved or rolled-back operation through a
//! [`Notifier`]. Delivery is fire-and-forget: a notifier must never block
//! and its outcome never affects board state.

use tokio::sync::mpsc;

/// Kind of a notification, mapped to toast styling by a UI host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// An operation succeeded.
    Success,
    /// An operation failed.
    Error,
    /// Neutral information, e.g. a session notice.
    Info,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A notification as delivered by [`ChannelNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Kind.
    pub kind: NotificationKind,
    /// Human-readable message.
    pub message: String,
}

/// Receives user-facing feedback.
pub trait Notifier: Send + Sync {
    /// Delivers a notification. Must not block.
    fn notify(&self, kind: NotificationKind, message: &str);
}

/// Writes notifications to the `tracing` log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, kind: NotificationKind, message: &str) {
        match kind {
            NotificationKind::Error => tracing::warn!(%kind, "{message}"),
            NotificationKind::Success | NotificationKind::Info => tracing::info!(%kind, "{message}"),
        }
    }
}

/// Forwards notifications into a bounded channel.
///
/// When the channel is full or closed the notification is dropped.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::Sender<Notification>,
}

impl ChannelNotifier {
    /// Creates a notifier and the receiving end of its channel.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, kind: NotificationKind, message: &str) {
        let notification = Notification {
            kind,
            message: message.to_string(),
        };
        if let Err(e) = self.tx.try_send(notification) {
            tracing::debug!(error = %e, "notification dropped");
        }
    }
}

impl<T: Notifier + ?Sized> Notifier for std::sync::Arc<T> {
    fn notify(&self, kind: NotificationKind, message: &str) {
        (**self).notify(kind, message);
    }
}
