// crates/hooks/tests/support/mod.rs
//! Scriptable in-memory backend with per-endpoint call counters.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use grantswipe_gateway::BackendApi;
use grantswipe_types::{
    Activity, ApiError, DashboardStats, MatchOutcome, NewActivity, PipelineStats, SyncOutcome,
};

/// Route test logs through the captured test writer. RUST_LOG selects
/// what shows on failure.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Default)]
pub struct CallCounts {
    pub recent_activities: AtomicUsize,
    pub insert_activity: AtomicUsize,
    pub dashboard_activity: AtomicUsize,
    pub dashboard_stats: AtomicUsize,
    pub pipeline_status: AtomicUsize,
    pub sync_grants: AtomicUsize,
    pub run_matching: AtomicUsize,
}

#[derive(Default)]
pub struct MockBackend {
    pub calls: CallCounts,
    pub table: Mutex<Vec<Activity>>,
    pub feed: Mutex<Vec<Activity>>,
    pub stats: Mutex<DashboardStats>,
    pub pipeline: Mutex<PipelineStats>,
    pub sync_outcome: Mutex<SyncOutcome>,
    pub match_outcome: Mutex<MatchOutcome>,
    pub fail_insert: Mutex<Option<ApiError>>,
    pub fail_sync: Mutex<Option<ApiError>>,
    pub fail_matching: Mutex<Option<ApiError>>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn activity(n: usize) -> Activity {
        Activity::local(format!("type-{n}"), format!("message {n}"))
    }

    pub fn seed_feed(&self, count: usize) {
        *self.feed.lock().unwrap() = (0..count).map(Self::activity).collect();
    }
}

#[async_trait]
impl BackendApi for MockBackend {
    async fn recent_activities(&self, limit: usize) -> Result<Vec<Activity>, ApiError> {
        self.calls.recent_activities.fetch_add(1, Ordering::SeqCst);
        let rows = self.table.lock().unwrap();
        Ok(rows.iter().take(limit).cloned().collect())
    }

    async fn insert_activity(&self, new: NewActivity) -> Result<Activity, ApiError> {
        self.calls.insert_activity.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.fail_insert.lock().unwrap().take() {
            return Err(err);
        }
        let row = Activity::local(new.action_type, new.message).with_metadata(new.metadata);
        self.table.lock().unwrap().insert(0, row.clone());
        Ok(row)
    }

    async fn dashboard_activity(&self, limit: usize) -> Result<Vec<Activity>, ApiError> {
        self.calls.dashboard_activity.fetch_add(1, Ordering::SeqCst);
        let feed = self.feed.lock().unwrap();
        Ok(feed.iter().take(limit).cloned().collect())
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        self.calls.dashboard_stats.fetch_add(1, Ordering::SeqCst);
        Ok(self.stats.lock().unwrap().clone())
    }

    async fn pipeline_status(&self) -> Result<PipelineStats, ApiError> {
        self.calls.pipeline_status.fetch_add(1, Ordering::SeqCst);
        Ok(self.pipeline.lock().unwrap().clone())
    }

    async fn sync_grants(&self) -> Result<SyncOutcome, ApiError> {
        self.calls.sync_grants.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.fail_sync.lock().unwrap().take() {
            return Err(err);
        }
        Ok(self.sync_outcome.lock().unwrap().clone())
    }

    async fn run_matching(&self) -> Result<MatchOutcome, ApiError> {
        self.calls.run_matching.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.fail_matching.lock().unwrap().take() {
            return Err(err);
        }
        Ok(self.match_outcome.lock().unwrap().clone())
    }
}
