// crates/cache/src/snapshot.rs
use std::sync::Arc;
use std::time::Duration;

use grantswipe_types::ApiError;
use serde_json::Value;
use tokio::time::Instant;

/// Default retry budget: one extra attempt after the first failure.
pub const DEFAULT_RETRY: u32 = 1;

/// Point-in-time view of one cache entry.
///
/// Snapshots are cheap to clone (payload and error are Arc'd) and renders
/// are pinned to the snapshot they read: a later invalidation or refetch
/// never mutates data already handed out.
#[derive(Debug, Clone, Default)]
pub struct QuerySnapshot {
    /// Last successfully fetched (or optimistically written) payload.
    /// Preserved across refetches and failures, so consumers never see a
    /// flash of empty state.
    pub data: Option<Arc<Value>>,
    /// Error from the most recent failed fetch. Cleared on success.
    pub error: Option<Arc<ApiError>>,
    /// True while a fetch for this key is in flight.
    pub is_loading: bool,
    /// When `data` was last written. Basis for the staleness window.
    pub last_fetched_at: Option<Instant>,
}

impl QuerySnapshot {
    /// Whether the snapshot is inside the staleness window at `now`.
    /// No window configured means never fresh.
    pub fn is_fresh(&self, stale_time: Option<Duration>, now: Instant) -> bool {
        match (self.last_fetched_at, stale_time) {
            (Some(at), Some(window)) => now.duration_since(at) < window,
            _ => false,
        }
    }
}

/// Per-entry fetch policy.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Window during which cached data is served without a network call.
    /// None = every access refetches (subject to in-flight coalescing).
    pub stale_time: Option<Duration>,
    /// Periodic forced refetch while the key has subscribers.
    pub refetch_interval: Option<Duration>,
    /// Extra attempts after a retryable failure.
    pub retry: u32,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            stale_time: None,
            refetch_interval: None,
            retry: DEFAULT_RETRY,
        }
    }
}

impl QueryOptions {
    pub fn stale_time(mut self, window: Duration) -> Self {
        self.stale_time = Some(window);
        self
    }

    pub fn refetch_interval(mut self, interval: Duration) -> Self {
        self.refetch_interval = Some(interval);
        self
    }

    pub fn retry(mut self, budget: u32) -> Self {
        self.retry = budget;
        self
    }
}
