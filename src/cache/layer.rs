//! Cache layer that orchestrates lookups with network fetching.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::api::{Endpoint, RequestError};
use crate::query::{CacheKey, QueryDescriptor};

use super::entry::{CacheEntry, CacheResult};

type SharedFetch<T> = Shared<BoxFuture<'static, Result<CacheResult<T>, RequestError>>>;

struct Inner<T> {
  entries: HashMap<CacheKey, CacheEntry<T>>,
  in_flight: HashMap<CacheKey, SharedFetch<T>>,
}

/// Shared map from cache key to the latest result of that query.
///
/// Cloning is cheap and every clone sees the same entries. Writes are
/// last-writer-wins per key.
pub struct QueryCache<T> {
  inner: Arc<Mutex<Inner<T>>>,
}

impl<T: Clone + Send + Sync + 'static> QueryCache<T> {
  pub fn new() -> Self {
    Self {
      inner: Arc::new(Mutex::new(Inner {
        entries: HashMap::new(),
        in_flight: HashMap::new(),
      })),
    }
  }

  fn lock(&self) -> MutexGuard<'_, Inner<T>> {
    // Entries stay consistent even if a holder panicked mid-update
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn entry(&self, key: &CacheKey) -> Option<CacheEntry<T>> {
    self.lock().entries.get(key).cloned()
  }

  /// Return the cached result if fresh, otherwise fetch it.
  ///
  /// A fetch already in flight for the same key is joined instead of
  /// starting a second request.
  pub async fn ensure(
    &self,
    descriptor: &QueryDescriptor<T>,
  ) -> Result<CacheResult<T>, RequestError> {
    let fetch = {
      let mut inner = self.lock();
      if let Some(entry) = inner.entries.get(descriptor.cache_key()) {
        if !entry.is_stale(descriptor.stale_after()) {
          if let (Some(data), Some(at)) = (&entry.result, entry.fetched_at) {
            debug!(key = %descriptor.cache_key(), "cache hit");
            return Ok(CacheResult::from_cache(data.clone(), at));
          }
        }
      }
      self.start_or_join(&mut inner, descriptor)
    };
    fetch.await
  }

  /// Fetch regardless of freshness, joining a request already in flight.
  pub async fn fetch(
    &self,
    descriptor: &QueryDescriptor<T>,
  ) -> Result<CacheResult<T>, RequestError> {
    let fetch = {
      let mut inner = self.lock();
      self.start_or_join(&mut inner, descriptor)
    };
    fetch.await
  }

  /// Mark every entry of an endpoint stale, keeping its data for
  /// placeholders. Returns how many were marked.
  pub fn invalidate_endpoint(&self, endpoint: Endpoint) -> usize {
    let mut inner = self.lock();
    let mut marked = 0;
    for (key, entry) in inner.entries.iter_mut() {
      if key.is_for(endpoint) {
        entry.fetched_at = None;
        marked += 1;
      }
    }
    marked
  }

  fn start_or_join(&self, inner: &mut Inner<T>, descriptor: &QueryDescriptor<T>) -> SharedFetch<T> {
    let key = descriptor.cache_key().clone();
    if let Some(fetch) = inner.in_flight.get(&key) {
      debug!(%key, "joining in-flight request");
      return fetch.clone();
    }

    debug!(%key, "fetching");
    let request = descriptor.execute();
    let cache = self.clone();
    let task_key = key.clone();
    // Spawned so the request completes and lands in the cache even when
    // every waiter goes away.
    let handle = tokio::spawn(async move {
      let result = request.await;
      cache.complete(&task_key, result)
    });

    let join_key = key.clone();
    let fetch = async move {
      handle
        .await
        .unwrap_or_else(|e| Err(RequestError::transport(join_key.to_string(), e.to_string())))
    }
    .boxed()
    .shared();

    inner.in_flight.insert(key, fetch.clone());
    fetch
  }

  fn complete(
    &self,
    key: &CacheKey,
    result: Result<T, RequestError>,
  ) -> Result<CacheResult<T>, RequestError> {
    let mut inner = self.lock();
    inner.in_flight.remove(key);
    let entry = inner.entries.entry(key.clone()).or_default();

    match result {
      Ok(data) => {
        let now = Instant::now();
        entry.result = Some(data.clone());
        entry.fetched_at = Some(now);
        entry.error = None;
        Ok(CacheResult::from_network(data, now))
      }
      Err(e) => {
        warn!(%key, error = %e, "query failed");
        entry.error = Some(e.clone());
        Err(e)
      }
    }
  }
}

impl<T: Clone + Send + Sync + 'static> Default for QueryCache<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> Clone for QueryCache<T> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::client::testing::FakeTransport;
  use crate::api::ApiClient;
  use crate::cache::CacheSource;
  use crate::query::QueryBinder;
  use crate::search::FilterPredicate;
  use std::time::Duration;

  fn setup(transport: &Arc<FakeTransport>) -> (QueryBinder, QueryCache<u64>) {
    let api = ApiClient::with_transport(transport.clone());
    (QueryBinder::new(api), QueryCache::new())
  }

  #[tokio::test(start_paused = true)]
  async fn test_ensure_serves_fresh_entry_from_cache() {
    let transport = Arc::new(FakeTransport::with_count(4));
    let (binder, cache) = setup(&transport);
    let descriptor = binder.bind_count(Endpoint::Variables, None);

    let first = cache.ensure(&descriptor).await.unwrap();
    let second = cache.ensure(&descriptor).await.unwrap();

    assert_eq!(first.source, CacheSource::Network);
    assert_eq!(second.source, CacheSource::Cache);
    assert_eq!(second.data, 4);
    assert_eq!(transport.calls().len(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_ensure_refetches_after_stale_time() {
    let transport = Arc::new(FakeTransport::with_count(4));
    let (binder, cache) = setup(&transport);
    let descriptor = binder.bind_count(Endpoint::Variables, None);

    cache.ensure(&descriptor).await.unwrap();
    tokio::time::advance(Duration::from_millis(500)).await;
    cache.ensure(&descriptor).await.unwrap();
    assert_eq!(transport.calls().len(), 1);

    tokio::time::advance(Duration::from_millis(600)).await;
    let entry = cache.entry(descriptor.cache_key()).unwrap();
    assert!(entry.is_stale(descriptor.stale_after()));
    cache.ensure(&descriptor).await.unwrap();
    assert_eq!(transport.calls().len(), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_concurrent_ensures_share_one_request() {
    let transport = Arc::new(FakeTransport::with_count(9).with_delay(Duration::from_millis(50)));
    let (binder, cache) = setup(&transport);
    let total = binder.bind_count(Endpoint::Variables, None);
    let current = binder.bind_count(Endpoint::Variables, Some(&FilterPredicate::name_like("")));

    let (a, b) = tokio::join!(cache.ensure(&total), cache.ensure(&current));

    assert_eq!(a.unwrap().data, 9);
    assert_eq!(b.unwrap().data, 9);
    assert_eq!(transport.calls().len(), 1);
    assert!(cache.lock().in_flight.is_empty());
  }

  #[tokio::test(start_paused = true)]
  async fn test_failed_refetch_keeps_previous_result() {
    let transport = Arc::new(FakeTransport::with_count(2));
    let (binder, cache) = setup(&transport);
    let descriptor = binder.bind_count(Endpoint::WorkPools, None);

    cache.ensure(&descriptor).await.unwrap();
    transport.enqueue(Err(RequestError::from_status("/work_pools/count", 502)));
    let err = cache.fetch(&descriptor).await.unwrap_err();

    let entry = cache.entry(descriptor.cache_key()).unwrap();
    assert_eq!(entry.result, Some(2));
    assert_eq!(entry.error, Some(err));

    cache.fetch(&descriptor).await.unwrap();
    assert_eq!(cache.entry(descriptor.cache_key()).unwrap().error, None);
  }

  #[tokio::test(start_paused = true)]
  async fn test_invalidate_endpoint_marks_only_that_endpoint() {
    let transport = Arc::new(FakeTransport::with_count(1));
    let (binder, cache) = setup(&transport);
    let variables = binder.bind_count(Endpoint::Variables, None);
    let pools = binder.bind_count(Endpoint::WorkPools, None);

    cache.ensure(&variables).await.unwrap();
    cache.ensure(&pools).await.unwrap();
    assert_eq!(cache.invalidate_endpoint(Endpoint::Variables), 1);

    let marked = cache.entry(variables.cache_key()).unwrap();
    assert!(marked.is_stale(variables.stale_after()));
    assert_eq!(marked.result, Some(1));
    let untouched = cache.entry(pools.cache_key()).unwrap();
    assert!(!untouched.is_stale(pools.stale_after()));
  }
}
