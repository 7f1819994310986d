// crates/types/src/stats.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate dashboard snapshot. Refreshed on an interval and replaced
/// wholesale — there is no client-side merge logic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_grants: u64,
    pub new_matches: u64,
    pub saved_grants: u64,
    pub upcoming_deadlines: u64,
}

/// Snapshot returned by the `pipeline-status` serverless function.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStats {
    pub logs: Vec<PipelineLogEntry>,
    pub sources: Vec<PipelineSource>,
    pub total_grants: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineLogEntry {
    pub source: String,
    pub status: String,
    pub records_found: u64,
    pub ran_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSource {
    pub name: String,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Result of the `sync-grants` serverless function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub records_processed: u64,
}

/// Result of a matching run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchOutcome {
    pub new_matches: u64,
}
