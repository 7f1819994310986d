// crates/gateway/src/session.rs
//! Single-writer session provider.
//!
//! The login/logout flow owns the [`SessionStore`]; everything else reads
//! through clonable [`SessionHandle`]s backed by a watch channel, so hooks
//! can both sample the current state and await transitions. Absence of a
//! token means "disabled", never an error.

use grantswipe_types::Session;
use tokio::sync::{mpsc, watch};
use tracing::info;

/// Emitted when the backend rejects the current token. The login flow
/// listens for these and forces a re-login; the gateway never retries
/// an unauthorized call on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnauthorizedEvent {
    /// Endpoint path that was rejected.
    pub endpoint: String,
}

/// Owner of the session state. Exactly one writer.
pub struct SessionStore {
    tx: watch::Sender<Option<Session>>,
    unauthorized_tx: mpsc::UnboundedSender<UnauthorizedEvent>,
    unauthorized_rx: Option<mpsc::UnboundedReceiver<UnauthorizedEvent>>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        let (unauthorized_tx, unauthorized_rx) = mpsc::unbounded_channel();
        Self {
            tx,
            unauthorized_tx,
            unauthorized_rx: Some(unauthorized_rx),
        }
    }

    pub fn sign_in(&self, session: Session) {
        info!(user_id = %session.user_id, "session signed in");
        self.tx.send_replace(Some(session));
    }

    pub fn sign_out(&self) {
        info!("session signed out");
        self.tx.send_replace(None);
    }

    /// A read-only handle for hooks and the gateway.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            rx: self.tx.subscribe(),
            unauthorized_tx: self.unauthorized_tx.clone(),
        }
    }

    /// Take the unauthorized-event stream. Yields at most once; the
    /// login flow is the only intended consumer.
    pub fn take_unauthorized_events(
        &mut self,
    ) -> Option<mpsc::UnboundedReceiver<UnauthorizedEvent>> {
        self.unauthorized_rx.take()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Clonable read-only view of the session.
#[derive(Clone)]
pub struct SessionHandle {
    rx: watch::Receiver<Option<Session>>,
    unauthorized_tx: mpsc::UnboundedSender<UnauthorizedEvent>,
}

impl SessionHandle {
    pub fn is_authenticated(&self) -> bool {
        self.rx.borrow().is_some()
    }

    pub fn current(&self) -> Option<Session> {
        self.rx.borrow().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.rx.borrow().as_ref().map(|s| s.access_token.clone())
    }

    /// A fresh receiver for awaiting sign-in/sign-out transitions.
    pub fn changes(&self) -> watch::Receiver<Option<Session>> {
        self.rx.clone()
    }

    /// Report a 401/403 from the backend to the session owner.
    pub fn report_unauthorized(&self, endpoint: impl Into<String>) {
        // Send failure just means the login flow dropped its receiver.
        let _ = self.unauthorized_tx.send(UnauthorizedEvent {
            endpoint: endpoint.into(),
        });
    }
}
