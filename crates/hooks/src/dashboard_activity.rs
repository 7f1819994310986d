// crates/hooks/src/dashboard_activity.rs
//! Dashboard activity feed with optimistic prepends.

use std::sync::Arc;
use std::time::Duration;

use grantswipe_cache::{Fetcher, QueryCache, QueryOptions, QuerySubscription};
use grantswipe_gateway::{BackendApi, SessionHandle};
use grantswipe_types::{Activity, ApiError, NewActivity};
use serde_json::Value;
use tracing::warn;

use crate::gate::SessionGate;
use crate::keys;
use crate::notify::{Notice, Notifier};
use crate::view::HookView;

/// Display cap after a local prepend; the next confirmed fetch restores
/// the server's window.
const FEED_CAP: usize = 10;

const REFETCH_INTERVAL: Duration = Duration::from_secs(10 * 60);
const STALE_TIME: Duration = Duration::from_secs(5 * 60);

pub struct DashboardActivityHook {
    cache: QueryCache,
    api: Arc<dyn BackendApi>,
    session: SessionHandle,
    notifier: Arc<dyn Notifier>,
}

impl DashboardActivityHook {
    pub fn new(
        cache: QueryCache,
        api: Arc<dyn BackendApi>,
        session: SessionHandle,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            cache,
            api,
            session,
            notifier,
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
                let feed = api.dashboard_activity(FEED_CAP).await?;
                serde_json::to_value(feed).map_err(|e| ApiError::Decode(e.to_string()))
            })
        })
    }

    /// Current feed, respecting the 5 minute staleness window.
    pub async fn feed(&self) -> HookView<Vec<Activity>> {
        if !self.session.is_authenticated() {
            return HookView::disabled();
        }
        let snapshot = self
            .cache
            .fetch(&keys::dashboard_activity(), self.fetcher(), Self::options())
            .await;
        HookView::from_query(&snapshot)
    }

    pub fn subscribe(&self) -> Option<QuerySubscription> {
        if !self.session.is_authenticated() {
            return None;
        }
        Some(self.cache.subscribe(
            &keys::dashboard_activity(),
            self.fetcher(),
            Self::options(),
        ))
    }

    /// Poll while authenticated: 10 minute cadence, paused on sign-out.
    pub fn spawn_polling(&self) -> SessionGate {
        let cache = self.cache.clone();
        let fetcher = self.fetcher();
        SessionGate::spawn(&self.session, move || {
            cache.subscribe(&keys::dashboard_activity(), fetcher.clone(), Self::options())
        })
    }

    /// Record an activity with an optimistic prepend: the feed shows the
    /// new item immediately (capped at the 10 most recent) and the next
    /// scheduled refetch confirms it against the server. A failed insert
    /// invalidates the feed so the optimistic row is washed out.
    pub async fn add_activity(&self, new: NewActivity) -> Result<(), ApiError> {
        if !self.session.is_authenticated() {
            return Err(ApiError::Unauthorized("no active session".into()));
        }

        let local = Activity::local(new.action_type.clone(), new.message.clone())
            .with_metadata(new.metadata.clone());
        let value = serde_json::to_value(&local).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.cache.set_data(&keys::dashboard_activity(), move |current| {
            let mut items = current
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            items.insert(0, value);
            items.truncate(FEED_CAP);
            Value::Array(items)
        });

        match self.api.insert_activity(new).await {
            Ok(_) => {
                self.notifier.notify(Notice::success("Activity added"));
                Ok(())
            }
            Err(err) => {
                warn!("activity insert failed, rolling back optimistic prepend: {err}");
                self.cache.invalidate([keys::dashboard_activity()]);
                self.notifier
                    .notify(Notice::error("Could not add activity. Try again."));
                Err(err)
            }
        }
    }
}
