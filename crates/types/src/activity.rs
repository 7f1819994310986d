// crates/types/src/activity.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// One row of the append-only per-user activity feed.
///
/// Ordering is always `createdAt` descending; the backend query caps the
/// window at the 50 most recent rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: Uuid,
    pub action_type: String,
    pub message: String,
    /// Opaque backend-defined payload (grant id, match score, etc.).
    #[serde(default)]
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

impl Activity {
    /// Build a locally-known activity ahead of server confirmation,
    /// for optimistic feed prepends.
    pub fn local(action_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            action_type: action_type.into(),
            message: message.into(),
            metadata: Value::Null,
            created_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Insert payload for the `activities` table. The backend assigns the id
/// and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewActivity {
    pub action_type: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
}

impl NewActivity {
    pub fn new(action_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            message: message.into(),
            metadata: Value::Null,
        }
    }
}
