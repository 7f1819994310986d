// crates/hooks/src/activities.rs
//! On-demand activity log backed by the raw `activities` table query.
//!
//! Deliberately separate from the dashboard feed
//! ([`crate::DashboardActivityHook`]): the two read paths back distinct
//! cache namespaces and are never reconciled.

use std::sync::Arc;

use grantswipe_cache::{Fetcher, QueryCache, QueryOptions, QuerySubscription};
use grantswipe_gateway::{BackendApi, SessionHandle};
use grantswipe_types::{Activity, ApiError, NewActivity};
use tracing::warn;

use crate::keys;
use crate::notify::{Notice, Notifier};
use crate::view::HookView;

/// Backend query window: the 50 most recent rows.
const LIST_LIMIT: usize = 50;

pub struct ActivitiesHook {
    cache: QueryCache,
    api: Arc<dyn BackendApi>,
    session: SessionHandle,
    notifier: Arc<dyn Notifier>,
}

impl ActivitiesHook {
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

    /// No staleness window: every on-demand access refetches, subject to
    /// in-flight coalescing.
    fn options() -> QueryOptions {
        QueryOptions::default()
    }

    fn fetcher(&self) -> Fetcher {
        let api = self.api.clone();
        Arc::new(move || {
            let api = api.clone();
            Box::pin(async move {
                let rows = api.recent_activities(LIST_LIMIT).await?;
                serde_json::to_value(rows).map_err(|e| ApiError::Decode(e.to_string()))
            })
        })
    }

    /// Current activity list, fetching on demand.
    pub async fn list(&self) -> HookView<Vec<Activity>> {
        if !self.session.is_authenticated() {
            return HookView::disabled();
        }
        let snapshot = self
            .cache
            .fetch(&keys::activities(), self.fetcher(), Self::options())
            .await;
        HookView::from_query(&snapshot)
    }

    /// Observe the list without forcing a fetch cadence of its own.
    pub fn subscribe(&self) -> Option<QuerySubscription> {
        if !self.session.is_authenticated() {
            return None;
        }
        Some(
            self.cache
                .subscribe(&keys::activities(), self.fetcher(), Self::options()),
        )
    }

    /// Append an activity row. On success the `activities` namespace is
    /// invalidated so observers refetch the confirmed list.
    pub async fn log_activity(&self, new: NewActivity) -> Result<Activity, ApiError> {
        if !self.session.is_authenticated() {
            return Err(ApiError::Unauthorized("no active session".into()));
        }
        match self.api.insert_activity(new).await {
            Ok(row) => {
                self.cache.invalidate([keys::activities()]);
                self.notifier.notify(Notice::success("Activity logged"));
                Ok(row)
            }
            Err(err) => {
                warn!("activity insert failed: {err}");
                self.notifier
                    .notify(Notice::error("Could not log activity. Try again."));
                Err(err)
            }
        }
    }
}
