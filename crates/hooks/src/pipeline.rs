// crates/hooks/src/pipeline.rs
//! Ingestion pipeline status and manual sync trigger.

use std::sync::Arc;
use std::time::Duration;

use grantswipe_cache::{Fetcher, QueryCache, QueryOptions, QuerySubscription};
use grantswipe_gateway::{BackendApi, SessionHandle};
use grantswipe_types::{ApiError, PipelineStats, SyncOutcome};
use tracing::{info, warn};

use crate::gate::SessionGate;
use crate::keys;
use crate::notify::{Notice, Notifier};
use crate::view::HookView;

/// The pipeline screen watches a running sync, so it polls tight.
const REFETCH_INTERVAL: Duration = Duration::from_secs(30);

pub struct DataPipelineHook {
    cache: QueryCache,
    api: Arc<dyn BackendApi>,
    session: SessionHandle,
    notifier: Arc<dyn Notifier>,
}

impl DataPipelineHook {
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

    /// No staleness window: pipeline status is always worth refreshing.
    fn options() -> QueryOptions {
        QueryOptions::default().refetch_interval(REFETCH_INTERVAL)
    }

    fn fetcher(&self) -> Fetcher {
        let api = self.api.clone();
        Arc::new(move || {
            let api = api.clone();
            Box::pin(async move {
                let status = api.pipeline_status().await?;
                serde_json::to_value(status).map_err(|e| ApiError::Decode(e.to_string()))
            })
        })
    }

    pub async fn status(&self) -> HookView<PipelineStats> {
        if !self.session.is_authenticated() {
            return HookView::disabled();
        }
        let snapshot = self
            .cache
            .fetch(&keys::pipeline_stats(), self.fetcher(), Self::options())
            .await;
        HookView::from_query(&snapshot)
    }

    pub fn subscribe(&self) -> Option<QuerySubscription> {
        if !self.session.is_authenticated() {
            return None;
        }
        Some(
            self.cache
                .subscribe(&keys::pipeline_stats(), self.fetcher(), Self::options()),
        )
    }

    /// Poll while authenticated: 30 second cadence, paused on sign-out.
    pub fn spawn_polling(&self) -> SessionGate {
        let cache = self.cache.clone();
        let fetcher = self.fetcher();
        SessionGate::spawn(&self.session, move || {
            cache.subscribe(&keys::pipeline_stats(), fetcher.clone(), Self::options())
        })
    }

    /// Trigger a grant sync. Success invalidates both the pipeline status
    /// and the grant list; failure leaves every cache entry untouched.
    /// Either way, exactly one notification. Not retried: replaying a
    /// sync trigger could double-run the pipeline.
    pub async fn sync_now(&self) -> Result<SyncOutcome, ApiError> {
        if !self.session.is_authenticated() {
            return Err(ApiError::Unauthorized("no active session".into()));
        }
        match self.api.sync_grants().await {
            Ok(outcome) => {
                info!(records = outcome.records_processed, "grant sync finished");
                self.cache
                    .invalidate([keys::pipeline_stats(), keys::grants()]);
                self.notifier.notify(Notice::success(format!(
                    "Sync complete: {} records processed",
                    outcome.records_processed
                )));
                Ok(outcome)
            }
            Err(err) => {
                warn!("grant sync failed: {err}");
                self.notifier
                    .notify(Notice::error("Grant sync failed. Try again."));
                Err(err)
            }
        }
    }
}
