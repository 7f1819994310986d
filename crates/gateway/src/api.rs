// crates/gateway/src/api.rs
//! The trait seam between hooks and the hosted backend.

use async_trait::async_trait;
use grantswipe_types::{
    Activity, ApiError, DashboardStats, MatchOutcome, NewActivity, PipelineStats, SyncOutcome,
};

/// Typed call surface of the hosted backend.
///
/// Implementations:
/// - [`crate::HttpGateway`] — authenticated HTTP to tables and serverless
///   functions
/// - test doubles with scripted results and call counters
///
/// Note the two deliberately separate activity read paths: the raw
/// `activities` table query and the dedicated dashboard feed endpoint.
/// They back distinct cache namespaces and are not reconciled.
#[async_trait]
pub trait BackendApi: Send + Sync {
    /// Most recent rows of the `activities` table, `createdAt` descending.
    async fn recent_activities(&self, limit: usize) -> Result<Vec<Activity>, ApiError>;

    /// Append a row to the `activities` table. Returns the stored row.
    async fn insert_activity(&self, new: NewActivity) -> Result<Activity, ApiError>;

    /// Dashboard feed from the dedicated activity endpoint.
    async fn dashboard_activity(&self, limit: usize) -> Result<Vec<Activity>, ApiError>;

    /// Aggregate dashboard counters.
    async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError>;

    /// Ingestion pipeline snapshot (`pipeline-status` function).
    async fn pipeline_status(&self) -> Result<PipelineStats, ApiError>;

    /// Trigger a grant sync (`sync-grants` function).
    async fn sync_grants(&self) -> Result<SyncOutcome, ApiError>;

    /// Run the matching algorithm for the current user.
    async fn run_matching(&self) -> Result<MatchOutcome, ApiError>;
}
