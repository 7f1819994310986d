// crates/hooks/src/matching.rs
//! Mutation-only hook triggering a matching run.

use std::sync::Arc;

use grantswipe_cache::QueryCache;
use grantswipe_gateway::{BackendApi, SessionHandle};
use grantswipe_types::{ApiError, MatchOutcome};
use tracing::{info, warn};

use crate::keys;
use crate::notify::{Notice, Notifier};

/// Runs the matching algorithm for the current user. Owns no cache entry
/// of its own; a successful run dirties everything derived from matches.
pub struct GrantMatchingHook {
    cache: QueryCache,
    api: Arc<dyn BackendApi>,
    session: SessionHandle,
    notifier: Arc<dyn Notifier>,
}

impl GrantMatchingHook {
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

    /// Run matching. Success invalidates `matches`, `dashboard-stats`,
    /// and `dashboard-activity`; failure touches nothing. Exactly one
    /// notification either way.
    pub async fn run(&self) -> Result<MatchOutcome, ApiError> {
        if !self.session.is_authenticated() {
            return Err(ApiError::Unauthorized("no active session".into()));
        }
        match self.api.run_matching().await {
            Ok(outcome) => {
                info!(new_matches = outcome.new_matches, "matching run finished");
                self.cache.invalidate([
                    keys::matches(),
                    keys::dashboard_stats(),
                    keys::dashboard_activity(),
                ]);
                self.notifier.notify(Notice::success(format!(
                    "Found {} new matches",
                    outcome.new_matches
                )));
                Ok(outcome)
            }
            Err(err) => {
                warn!("matching run failed: {err}");
                self.notifier
                    .notify(Notice::error("Matching failed. Try again."));
                Err(err)
            }
        }
    }
}
