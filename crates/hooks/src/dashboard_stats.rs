// crates/hooks/src/dashboard_stats.rs
//! Read-only aggregate counters for the dashboard header.

use std::sync::Arc;
use std::time::Duration;

use grantswipe_cache::{Fetcher, QueryCache, QueryOptions, QuerySubscription};
use grantswipe_gateway::{BackendApi, SessionHandle};
use grantswipe_types::{ApiError, DashboardStats};

use crate::gate::SessionGate;
use crate::keys;
use crate::view::HookView;

const REFETCH_INTERVAL: Duration = Duration::from_secs(5 * 60);
const STALE_TIME: Duration = Duration::from_secs(2 * 60);

pub struct DashboardStatsHook {
    cache: QueryCache,
    api: Arc<dyn BackendApi>,
    session: SessionHandle,
}

impl DashboardStatsHook {
    pub fn new(cache: QueryCache, api: Arc<dyn BackendApi>, session: SessionHandle) -> Self {
        Self {
            cache,
            api,
            session,
        }
    }

    fn options() -> QueryOptions {
        QueryOptions::default()
            .stale_time(STALE_TIME)
            .refetch_interval(REFETCH_INTERVAL)
            .retry(1)
    }

    fn fetcher(&self) -> Fetcher {
        let api = self.api.clone();
        Arc::new(move || {
            let api = api.clone();
            Box::pin(async move {
                let stats = api.dashboard_stats().await?;
                serde_json::to_value(stats).map_err(|e| ApiError::Decode(e.to_string()))
            })
        })
    }

    /// Current counters, served from cache inside the 2 minute window.
    pub async fn stats(&self) -> HookView<DashboardStats> {
        if !self.session.is_authenticated() {
            return HookView::disabled();
        }
        let snapshot = self
            .cache
            .fetch(&keys::dashboard_stats(), self.fetcher(), Self::options())
            .await;
        HookView::from_query(&snapshot)
    }

    pub fn subscribe(&self) -> Option<QuerySubscription> {
        if !self.session.is_authenticated() {
            return None;
        }
        Some(
            self.cache
                .subscribe(&keys::dashboard_stats(), self.fetcher(), Self::options()),
        )
    }

    /// Poll while authenticated: 5 minute cadence, paused on sign-out.
    pub fn spawn_polling(&self) -> SessionGate {
        let cache = self.cache.clone();
        let fetcher = self.fetcher();
        SessionGate::spawn(&self.session, move || {
            cache.subscribe(&keys::dashboard_stats(), fetcher.clone(), Self::options())
        })
    }
}
