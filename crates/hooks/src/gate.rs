// crates/hooks/src/gate.rs
//! Session-scoped subscription supervisor.

use grantswipe_cache::QuerySubscription;
use grantswipe_gateway::SessionHandle;
use tokio::task::JoinHandle;
use tracing::debug;

/// Keeps a cache subscription alive exactly while the session is
/// authenticated.
///
/// On sign-in the gate calls `subscribe` and holds the result; on
/// sign-out it drops the subscription, which stops the entry's refetch
/// timer (an already in-flight request is allowed to finish and land in
/// the cache). Signing back in re-subscribes, resuming polling at the
/// configured interval. Dropping the gate itself tears everything down.
pub struct SessionGate {
    task: JoinHandle<()>,
}

impl SessionGate {
    pub fn spawn<F>(session: &SessionHandle, subscribe: F) -> Self
    where
        F: Fn() -> QuerySubscription + Send + 'static,
    {
        let mut rx = session.changes();
        let task = tokio::spawn(async move {
            loop {
                if rx.wait_for(|s| s.is_some()).await.is_err() {
                    // Session store dropped; nothing left to supervise.
                    return;
                }
                let subscription = subscribe();
                debug!(key = %subscription.key(), "session gate opened");
                if rx.wait_for(|s| s.is_none()).await.is_err() {
                    return;
                }
                debug!(key = %subscription.key(), "session gate closed");
                drop(subscription);
            }
        });
        Self { task }
    }
}

impl Drop for SessionGate {
    fn drop(&mut self) {
        self.task.abort();
    }
}
