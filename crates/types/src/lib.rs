// crates/types/src/lib.rs
pub mod activity;
pub mod error;
pub mod session;
pub mod stats;

pub use activity::*;
pub use error::*;
pub use session::*;
pub use stats::*;
