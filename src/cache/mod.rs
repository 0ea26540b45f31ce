//! Process-wide query result cache.
//!
//! Results are kept per [`CacheKey`](crate::query::CacheKey) together with
//! their fetch time and the last error. A lookup with a fresh entry never
//! touches the network, and concurrent lookups for the same key share one
//! in-flight request.

mod entry;
mod layer;

pub use entry::{CacheEntry, CacheResult, CacheSource};
pub use layer::QueryCache;
