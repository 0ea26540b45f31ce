//! Cache entries and lookup results.

use std::time::Duration;

use tokio::time::Instant;

use crate::api::RequestError;

/// What the cache knows about one key.
///
/// A failed refetch records its error but keeps the last successful result.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
  /// Last successful result
  pub result: Option<T>,
  /// When `result` was fetched
  pub fetched_at: Option<Instant>,
  /// Error of the most recent attempt, cleared by the next success
  pub error: Option<RequestError>,
}

impl<T> Default for CacheEntry<T> {
  fn default() -> Self {
    Self {
      result: None,
      fetched_at: None,
      error: None,
    }
  }
}

impl<T> CacheEntry<T> {
  /// Whether the result is missing or older than `stale_after`
  pub fn is_stale(&self, stale_after: Duration) -> bool {
    match (&self.result, self.fetched_at) {
      (Some(_), Some(at)) => at.elapsed() > stale_after,
      _ => true,
    }
  }
}

/// Result of a cache lookup, including where the data came from
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  pub data: T,
  pub source: CacheSource,
  pub fetched_at: Instant,
}

impl<T> CacheResult<T> {
  pub fn from_network(data: T, fetched_at: Instant) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      fetched_at,
    }
  }

  pub fn from_cache(data: T, fetched_at: Instant) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
      fetched_at,
    }
  }
}

/// Indicates where a result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fetched by this call or by an in-flight request it joined
  Network,
  /// Served from a fresh cache entry
  Cache,
}
