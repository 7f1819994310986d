// crates/hooks/src/notify.rs
//! Transient user notifications raised by mutating hooks.
//!
//! The contract is exactly one notification per mutation: success with a
//! count where the backend reports one, or a generic actionable failure.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }
}

/// Sink for user-visible notifications. The UI shell renders these as
/// transient toasts; tests capture them on a channel.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Channel-backed sink. The receiver side belongs to whoever renders.
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notice>,
}

impl ChannelNotifier {
    pub fn channel() -> (Arc<Self>, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notice: Notice) {
        // Receiver gone just means nothing is rendering notifications.
        let _ = self.tx.send(notice);
    }
}

/// Log-only sink for headless use.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        info!(kind = ?notice.kind, "{}", notice.message);
    }
}
