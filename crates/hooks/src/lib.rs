// crates/hooks/src/lib.rs
//! Data hooks binding cache entries to backend calls.
//!
//! Each hook declares a stable cache key, a fetch function, a staleness
//! window, a refetch interval, a retry budget, and (for mutating hooks)
//! the cache side effects and user notification to apply on settle. Every
//! user-scoped hook is gated on the session: no network call, no timer
//! until a token is present.

pub mod activities;
pub mod dashboard_activity;
pub mod dashboard_stats;
pub mod gate;
pub mod matching;
pub mod notify;
pub mod pipeline;
pub mod view;

pub use activities::ActivitiesHook;
pub use dashboard_activity::DashboardActivityHook;
pub use dashboard_stats::DashboardStatsHook;
pub use gate::SessionGate;
pub use matching::GrantMatchingHook;
pub use notify::{ChannelNotifier, LogNotifier, Notice, NoticeKind, Notifier};
pub use pipeline::DataPipelineHook;
pub use view::HookView;

/// Cache key namespaces. `grants` and `matches` are written by hooks here
/// only through invalidation; their read sides live with the grant list
/// screens.
pub mod keys {
    use grantswipe_cache::QueryKey;

    pub fn activities() -> QueryKey {
        QueryKey::root("activities")
    }

    pub fn dashboard_activity() -> QueryKey {
        QueryKey::root("dashboard-activity")
    }

    pub fn dashboard_stats() -> QueryKey {
        QueryKey::root("dashboard-stats")
    }

    pub fn pipeline_stats() -> QueryKey {
        QueryKey::root("pipeline-stats")
    }

    pub fn grants() -> QueryKey {
        QueryKey::root("grants")
    }

    pub fn matches() -> QueryKey {
        QueryKey::root("matches")
    }
}
