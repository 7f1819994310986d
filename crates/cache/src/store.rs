// crates/cache/src/store.rs
//! The observable query store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::BoxFuture;
use grantswipe_types::ApiError;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

use crate::key::QueryKey;
use crate::snapshot::{QueryOptions, QuerySnapshot};

/// Async fetch bound to a cache entry. Pure call into the remote gateway;
/// the cache owns retries, coalescing, and result application.
pub type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, Result<Value, ApiError>> + Send + Sync>;

struct EntryState {
    snapshot_tx: watch::Sender<QuerySnapshot>,
    options: QueryOptions,
    /// Registered by the most recent fetch/subscribe; used by interval
    /// and invalidation refetches.
    fetcher: Option<Fetcher>,
    subscribers: usize,
    /// Marked by `invalidate`; forces the next access to refetch.
    invalidated: bool,
    /// `next_generation` at the time of the latest invalidation. Only a
    /// fetch started after that point may clear the mark.
    invalidated_generation: u64,
    /// At most one in-flight fetch per key.
    in_flight: bool,
    /// Generation assigned at fetch start. A settle applies only if its
    /// generation is newer than the last applied write, so an
    /// out-of-order completion never clobbers a newer result.
    next_generation: u64,
    applied_generation: u64,
    /// Interval refetch task; alive only while `subscribers > 0`.
    timer: Option<JoinHandle<()>>,
}

impl EntryState {
    fn new() -> Self {
        let (snapshot_tx, _) = watch::channel(QuerySnapshot::default());
        Self {
            snapshot_tx,
            options: QueryOptions::default(),
            fetcher: None,
            subscribers: 0,
            invalidated: false,
            invalidated_generation: 0,
            in_flight: false,
            next_generation: 0,
            applied_generation: 0,
            timer: None,
        }
    }
}

/// What `fetch` decided to do while holding the entries lock.
enum FetchPlan {
    /// Fresh (or nothing runnable): hand back the current snapshot.
    Cached(QuerySnapshot),
    /// Someone else is already fetching this key; await their settle.
    Join(watch::Receiver<QuerySnapshot>),
    /// We own the network call.
    Run {
        fetcher: Fetcher,
        generation: u64,
        retry: u32,
        rx: watch::Receiver<QuerySnapshot>,
    },
}

/// Shared, clonable handle to the query store.
///
/// Locking discipline: the entries mutex is only held for synchronous
/// bookkeeping, never across an await point.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    entries: Mutex<HashMap<QueryKey, EntryState>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CacheInner {
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<QueryKey, EntryState>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Current snapshot without triggering a fetch.
    pub fn get(&self, key: &QueryKey) -> Option<QuerySnapshot> {
        self.entries()
            .get(key)
            .map(|entry| entry.snapshot_tx.borrow().clone())
    }

    /// Read-through fetch honoring the staleness window.
    ///
    /// Registers `fetcher` and `options` on the entry, then either serves
    /// fresh cached data, joins an in-flight request, or performs the
    /// network call (with the configured retry budget) and settles the
    /// entry. Never panics on fetch failure: errors land in the snapshot.
    pub async fn fetch(
        &self,
        key: &QueryKey,
        fetcher: Fetcher,
        options: QueryOptions,
    ) -> QuerySnapshot {
        self.fetch_inner(key, Some(fetcher), Some(options), false)
            .await
    }

    /// Forced refetch using the entry's registered fetcher. No-op (returns
    /// the current snapshot) if no fetcher was ever registered.
    pub async fn refetch(&self, key: &QueryKey) -> QuerySnapshot {
        self.fetch_inner(key, None, None, true).await
    }

    async fn fetch_inner(
        &self,
        key: &QueryKey,
        fetcher: Option<Fetcher>,
        options: Option<QueryOptions>,
        force: bool,
    ) -> QuerySnapshot {
        let plan = {
            let mut entries = self.entries();
            let entry = entries.entry(key.clone()).or_insert_with(EntryState::new);
            if let Some(options) = options {
                entry.options = options;
            }
            if let Some(fetcher) = &fetcher {
                entry.fetcher = Some(fetcher.clone());
            }

            let snapshot = entry.snapshot_tx.borrow().clone();
            let fresh = !force
                && !entry.invalidated
                && snapshot.data.is_some()
                && snapshot.is_fresh(entry.options.stale_time, Instant::now());

            if fresh {
                trace!(%key, "serving fresh cached data");
                FetchPlan::Cached(snapshot)
            } else if entry.in_flight {
                trace!(%key, "joining in-flight fetch");
                FetchPlan::Join(entry.snapshot_tx.subscribe())
            } else if let Some(fetcher) = entry.fetcher.clone() {
                entry.in_flight = true;
                entry.next_generation += 1;
                // Preserve prior data while loading, so consumers never
                // see a flash of empty state on refetch.
                entry.snapshot_tx.send_modify(|snap| snap.is_loading = true);
                FetchPlan::Run {
                    fetcher,
                    generation: entry.next_generation,
                    retry: entry.options.retry,
                    rx: entry.snapshot_tx.subscribe(),
                }
            } else {
                FetchPlan::Cached(snapshot)
            }
        };

        match plan {
            FetchPlan::Cached(snapshot) => snapshot,
            FetchPlan::Join(rx) => Self::await_settle(rx).await,
            FetchPlan::Run {
                fetcher,
                generation,
                retry,
                rx,
            } => {
                // The network call and settle run detached: cancelling the
                // caller (or the interval timer) must not leave the entry
                // stuck in its loading state.
                let cache = self.clone();
                let run_key = key.clone();
                tokio::spawn(async move {
                    cache.run_fetch(&run_key, fetcher, generation, retry).await;
                });
                Self::await_settle(rx).await
            }
        }
    }

    /// Wait until the entry leaves its loading state.
    async fn await_settle(mut rx: watch::Receiver<QuerySnapshot>) -> QuerySnapshot {
        if let Ok(snapshot) = rx.wait_for(|snap| !snap.is_loading).await {
            return snapshot.clone();
        }
        // Entry dropped out from under us; last known value stands.
        let snapshot = rx.borrow().clone();
        snapshot
    }

    async fn run_fetch(&self, key: &QueryKey, fetcher: Fetcher, generation: u64, retry: u32) {
        let mut attempts = 0u32;
        let result = loop {
            attempts += 1;
            match fetcher().await {
                Ok(value) => break Ok(value),
                Err(err) if err.is_retryable() && attempts <= retry => {
                    debug!(%key, attempt = attempts, "retrying fetch: {err}");
                }
                Err(err) => break Err(err),
            }
        };
        self.settle(key, generation, result);
    }

    /// Apply a completed fetch, guarded by the generation counter. An
    /// invalidation that landed while the fetch was in flight survives it:
    /// the mark stays set, and a subscribed entry refetches right away.
    fn settle(&self, key: &QueryKey, generation: u64, result: Result<Value, ApiError>) {
        let refetch_now = {
            let mut entries = self.entries();
            let Some(entry) = entries.get_mut(key) else {
                return;
            };
            entry.in_flight = false;

            let refetch_now;
            if generation <= entry.applied_generation {
                trace!(%key, generation, "discarding result of superseded fetch");
                entry.snapshot_tx.send_modify(|snap| snap.is_loading = false);
                refetch_now = entry.invalidated;
            } else {
                entry.applied_generation = generation;
                match result {
                    Ok(value) => {
                        if generation > entry.invalidated_generation {
                            entry.invalidated = false;
                        }
                        refetch_now = entry.invalidated;
                        entry.snapshot_tx.send_modify(|snap| {
                            snap.is_loading = false;
                            snap.data = Some(Arc::new(value));
                            snap.error = None;
                            snap.last_fetched_at = Some(Instant::now());
                        });
                    }
                    Err(err) => {
                        // Prior data stays untouched; the entry stays
                        // invalidated (if it was) so the next access tries
                        // again.
                        warn!(%key, "fetch failed: {err}");
                        refetch_now = false;
                        entry.snapshot_tx.send_modify(|snap| {
                            snap.is_loading = false;
                            snap.error = Some(Arc::new(err));
                        });
                    }
                }
            }
            refetch_now && entry.subscribers > 0 && entry.fetcher.is_some()
        };

        if refetch_now {
            debug!(%key, "invalidation landed mid-flight, refetching");
            let cache = self.clone();
            let key = key.clone();
            tokio::spawn(async move {
                cache.refetch(&key).await;
            });
        }
    }

    /// Mark entries stale. Subscribed entries refetch immediately (unless
    /// a fetch is already in flight); unobserved entries refetch on next
    /// access.
    pub fn invalidate<I>(&self, keys: I)
    where
        I: IntoIterator<Item = QueryKey>,
    {
        let mut to_refetch = Vec::new();
        {
            let mut entries = self.entries();
            for key in keys {
                let Some(entry) = entries.get_mut(&key) else {
                    // Nothing cached under this key yet; nothing to mark.
                    continue;
                };
                entry.invalidated = true;
                entry.invalidated_generation = entry.next_generation;
                debug!(%key, subscribers = entry.subscribers, "invalidated");
                if entry.subscribers > 0 && !entry.in_flight && entry.fetcher.is_some() {
                    to_refetch.push(key);
                }
            }
        }
        for key in to_refetch {
            let cache = self.clone();
            tokio::spawn(async move {
                cache.refetch(&key).await;
            });
        }
    }

    /// Synchronous optimistic write. `updater` sees the current payload
    /// (if any) and returns the replacement. Counts as the newest write:
    /// an already-in-flight fetch that started earlier will not clobber
    /// it — the next scheduled refetch confirms against the server.
    pub fn set_data(
        &self,
        key: &QueryKey,
        updater: impl FnOnce(Option<&Value>) -> Value,
    ) {
        let mut entries = self.entries();
        let entry = entries.entry(key.clone()).or_insert_with(EntryState::new);
        let current = entry.snapshot_tx.borrow().data.clone();
        let value = updater(current.as_deref());

        entry.next_generation += 1;
        entry.applied_generation = entry.next_generation;
        entry.invalidated = false;
        entry.snapshot_tx.send_modify(|snap| {
            snap.data = Some(Arc::new(value));
            snap.error = None;
            snap.last_fetched_at = Some(Instant::now());
        });
        debug!(%key, "optimistic write applied");
    }

    /// Subscribe to a key. Registers the fetcher/options, kicks off an
    /// initial fetch if the entry is stale or empty, and — for the first
    /// subscriber — starts the refetch-interval timer. Dropping the
    /// returned subscription reverses all of that; the last drop cancels
    /// the timer so unobserved keys schedule no network calls.
    pub fn subscribe(
        &self,
        key: &QueryKey,
        fetcher: Fetcher,
        options: QueryOptions,
    ) -> QuerySubscription {
        let rx = {
            let mut entries = self.entries();
            let entry = entries.entry(key.clone()).or_insert_with(EntryState::new);
            entry.fetcher = Some(fetcher);
            entry.options = options;
            entry.subscribers += 1;
            if entry.subscribers == 1 {
                if let Some(interval) = entry.options.refetch_interval {
                    debug!(%key, ?interval, "starting refetch timer");
                    entry.timer = Some(self.spawn_timer(key.clone(), interval));
                }
            }
            entry.snapshot_tx.subscribe()
        };

        let cache = self.clone();
        let fetch_key = key.clone();
        tokio::spawn(async move {
            cache.fetch_inner(&fetch_key, None, None, false).await;
        });

        QuerySubscription {
            cache: self.clone(),
            key: key.clone(),
            rx,
        }
    }

    fn spawn_timer(&self, key: QueryKey, interval: Duration) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; the initial fetch is
            // the subscriber's, not the timer's.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                trace!(%key, "interval refetch");
                cache.refetch(&key).await;
            }
        })
    }

    fn unsubscribe(&self, key: &QueryKey) {
        let mut entries = self.entries();
        if let Some(entry) = entries.get_mut(key) {
            entry.subscribers = entry.subscribers.saturating_sub(1);
            if entry.subscribers == 0 {
                if let Some(timer) = entry.timer.take() {
                    debug!(%key, "last subscriber gone, stopping refetch timer");
                    timer.abort();
                }
            }
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Live subscription to one cache entry.
///
/// Holds the entry's subscriber count; drop to release. An in-flight
/// request is not aborted by unsubscribing — its response still lands in
/// the cache, it just wakes nobody.
pub struct QuerySubscription {
    cache: QueryCache,
    key: QueryKey,
    rx: watch::Receiver<QuerySnapshot>,
}

impl QuerySubscription {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Pinned view of the entry right now.
    pub fn snapshot(&self) -> QuerySnapshot {
        self.rx.borrow().clone()
    }

    /// Await the next change and return the new snapshot.
    pub async fn changed(&mut self) -> QuerySnapshot {
        let _ = self.rx.changed().await;
        self.rx.borrow_and_update().clone()
    }
}

impl Drop for QuerySubscription {
    fn drop(&mut self) {
        self.cache.unsubscribe(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_fetcher(counter: Arc<AtomicUsize>, value: Value) -> Fetcher {
        Arc::new(move || {
            let counter = counter.clone();
            let value = value.clone();
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(value)
            })
        })
    }

    #[tokio::test]
    async fn test_fetch_populates_entry() {
        let cache = QueryCache::new();
        let key = QueryKey::root("dashboard-stats");
        let calls = Arc::new(AtomicUsize::new(0));

        let snap = cache
            .fetch(
                &key,
                counting_fetcher(calls.clone(), serde_json::json!({"totalGrants": 5})),
                QueryOptions::default(),
            )
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!snap.is_loading);
        assert!(snap.error.is_none());
        assert_eq!(snap.data.unwrap()["totalGrants"], 5);
        assert!(snap.last_fetched_at.is_some());
    }

    #[tokio::test]
    async fn test_failure_preserves_prior_data() {
        let cache = QueryCache::new();
        let key = QueryKey::root("pipeline-stats");
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .fetch(
                &key,
                counting_fetcher(calls.clone(), serde_json::json!({"totalGrants": 9})),
                QueryOptions::default().retry(0),
            )
            .await;

        let failing: Fetcher = Arc::new(|| {
            Box::pin(async { Err(ApiError::Network("connection reset".into())) })
        });
        let snap = cache
            .fetch(&key, failing, QueryOptions::default().retry(0))
            .await;

        assert!(snap.error.is_some());
        assert_eq!(snap.data.unwrap()["totalGrants"], 9);
    }

    #[tokio::test]
    async fn test_retry_budget_spent_only_on_retryable_errors() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        // Fails once with a transient error, then succeeds.
        let flaky: Fetcher = {
            let calls = calls.clone();
            Arc::new(move || {
                let calls = calls.clone();
                Box::pin(async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(ApiError::Network("reset".into()))
                    } else {
                        Ok(serde_json::json!(1))
                    }
                })
            })
        };
        let snap = cache
            .fetch(
                &QueryKey::root("flaky"),
                flaky,
                QueryOptions::default().retry(1),
            )
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(snap.error.is_none());

        // Validation errors surface immediately, no retry.
        let validation_calls = Arc::new(AtomicUsize::new(0));
        let rejecting: Fetcher = {
            let calls = validation_calls.clone();
            Arc::new(move || {
                let calls = calls.clone();
                Box::pin(async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ApiError::Validation("bad payload".into()))
                })
            })
        };
        let snap = cache
            .fetch(
                &QueryKey::root("rejected"),
                rejecting,
                QueryOptions::default().retry(1),
            )
            .await;
        assert_eq!(validation_calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            snap.error.as_deref(),
            Some(ApiError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_set_data_wins_over_slower_earlier_fetch() {
        let cache = QueryCache::new();
        let key = QueryKey::root("dashboard-activity");

        // A slow fetch starts first...
        let slow: Fetcher = Arc::new(|| {
            Box::pin(async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(serde_json::json!(["server-list"]))
            })
        });
        let cache2 = cache.clone();
        let key2 = key.clone();
        let handle = tokio::spawn(async move {
            cache2
                .fetch(&key2, slow, QueryOptions::default())
                .await
        });
        tokio::task::yield_now().await;

        // ...then an optimistic write lands while it is in flight.
        cache.set_data(&key, |_| serde_json::json!(["optimistic"]));
        handle.await.unwrap();

        let snap = cache.get(&key).unwrap();
        assert_eq!(*snap.data.unwrap(), serde_json::json!(["optimistic"]));
    }

    #[tokio::test]
    async fn test_set_data_sees_current_payload() {
        let cache = QueryCache::new();
        let key = QueryKey::root("feed");
        cache.set_data(&key, |_| serde_json::json!([1, 2]));
        cache.set_data(&key, |current| {
            let mut items = current
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            items.insert(0, serde_json::json!(0));
            Value::Array(items)
        });
        let snap = cache.get(&key).unwrap();
        assert_eq!(*snap.data.unwrap(), serde_json::json!([0, 1, 2]));
    }

    #[tokio::test]
    async fn test_invalidate_unobserved_key_refetches_on_next_access() {
        let cache = QueryCache::new();
        let key = QueryKey::root("dashboard-stats");
        let calls = Arc::new(AtomicUsize::new(0));
        let options = QueryOptions::default().stale_time(Duration::from_secs(300));
        let fetcher = counting_fetcher(calls.clone(), serde_json::json!(1));

        cache.fetch(&key, fetcher.clone(), options.clone()).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Well inside the staleness window: cached.
        cache.fetch(&key, fetcher.clone(), options.clone()).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Invalidation overrides freshness on the next access.
        cache.invalidate([key.clone()]);
        cache.fetch(&key, fetcher, options).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
