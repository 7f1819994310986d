// crates/cache/src/lib.rs
//! Keyed, TTL-aware client-side query cache.
//!
//! Maps a [`QueryKey`] to a live entry holding the last fetched payload,
//! error, and loading state. On top of that it provides the guarantees the
//! data hooks rely on:
//!
//! - **Staleness windows** — a fetch inside the window returns cached data
//!   without touching the network.
//! - **In-flight coalescing** — concurrent fetches for one key produce
//!   exactly one network call; latecomers await the same settle.
//! - **Generation guarding** — a fetch that started earlier never
//!   overwrites a result applied by a later-started write.
//! - **Subscription-scoped timers** — refetch intervals run only while a
//!   key has at least one subscriber.
//! - **Optimistic writes** — [`QueryCache::set_data`] mutates an entry
//!   locally without a round trip.

pub mod key;
pub mod snapshot;
pub mod store;

pub use key::*;
pub use snapshot::*;
pub use store::*;
