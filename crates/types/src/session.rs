// crates/types/src/session.rs
use serde::{Deserialize, Serialize};

/// The authenticated identity. Created on login, destroyed on logout.
///
/// Read-only to every hook; the login/logout flow is the single writer
/// (through the gateway's `SessionStore`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub access_token: String,
}

impl Session {
    pub fn new(user_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            access_token: access_token.into(),
        }
    }
}
