// crates/gateway/src/lib.rs
//! Remote call gateway and session provider for the GrantSwipe client.
//!
//! Everything the data layer knows about the hosted backend lives here:
//! the [`BackendApi`] trait seam, its [`HttpGateway`] implementation, and
//! the single-writer [`SessionStore`] whose read handles gate every hook.

pub mod api;
pub mod config;
pub mod http;
pub mod session;

pub use api::*;
pub use config::*;
pub use http::*;
pub use session::*;
