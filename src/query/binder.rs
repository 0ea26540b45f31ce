//! Turns view state into executable query descriptors.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::api::{ApiClient, Endpoint, Entity, RequestError};
use crate::search::{FilterPredicate, ViewState};

use super::key::{derive_count_key, derive_list_key, CacheKey};

/// Stale time applied when the binder is not configured otherwise
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(1);

/// Whether a previous result stays visible while a query for a new key loads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaceholderPolicy {
  #[default]
  None,
  KeepPrevious,
}

type ExecuteFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, RequestError>> + Send + Sync>;

/// An executable unit of work plus its cache policy.
///
/// Descriptors are cheap to clone and disposable; the cache keeps results by
/// [`CacheKey`], not by descriptor.
pub struct QueryDescriptor<T> {
  cache_key: CacheKey,
  execute: ExecuteFn<T>,
  stale_after: Duration,
  placeholder: PlaceholderPolicy,
}

impl<T: Send + 'static> QueryDescriptor<T> {
  /// Create a descriptor whose `execute` calls `fetcher` once per run.
  pub fn new<F, Fut>(cache_key: CacheKey, fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, RequestError>> + Send + 'static,
  {
    Self {
      cache_key,
      execute: Arc::new(move || fetcher().boxed()),
      stale_after: DEFAULT_STALE_TIME,
      placeholder: PlaceholderPolicy::None,
    }
  }

  pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
    self.stale_after = stale_after;
    self
  }

  pub fn with_placeholder(mut self, placeholder: PlaceholderPolicy) -> Self {
    self.placeholder = placeholder;
    self
  }
}

impl<T> QueryDescriptor<T> {
  pub fn cache_key(&self) -> &CacheKey {
    &self.cache_key
  }

  pub fn stale_after(&self) -> Duration {
    self.stale_after
  }

  pub fn placeholder(&self) -> PlaceholderPolicy {
    self.placeholder
  }

  /// Start one remote call. No retries happen here.
  pub fn execute(&self) -> BoxFuture<'static, Result<T, RequestError>> {
    (self.execute)()
  }
}

impl<T> Clone for QueryDescriptor<T> {
  fn clone(&self) -> Self {
    Self {
      cache_key: self.cache_key.clone(),
      execute: Arc::clone(&self.execute),
      stale_after: self.stale_after,
      placeholder: self.placeholder,
    }
  }
}

impl<T> std::fmt::Debug for QueryDescriptor<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("QueryDescriptor")
      .field("cache_key", &self.cache_key)
      .field("stale_after", &self.stale_after)
      .field("placeholder", &self.placeholder)
      .finish_non_exhaustive()
  }
}

/// Binds list and count queries to the API client
#[derive(Clone)]
pub struct QueryBinder {
  api: ApiClient,
  stale_after: Duration,
}

impl QueryBinder {
  pub fn new(api: ApiClient) -> Self {
    Self {
      api,
      stale_after: DEFAULT_STALE_TIME,
    }
  }

  pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
    self.stale_after = stale_after;
    self
  }

  /// Listing query for one page. Keeps the previous page visible while the
  /// next one loads.
  pub fn bind<E: Entity>(&self, state: &ViewState) -> QueryDescriptor<Vec<E>> {
    let api = self.api.clone();
    let state = state.clone();

    QueryDescriptor::new(derive_list_key(E::ENDPOINT, &state), move || {
      let api = api.clone();
      let state = state.clone();
      async move { api.filter::<E>(&state).await }
    })
    .with_stale_after(self.stale_after)
    .with_placeholder(PlaceholderPolicy::KeepPrevious)
  }

  /// Count query; `None` counts everything.
  pub fn bind_count(
    &self,
    endpoint: Endpoint,
    filter: Option<&FilterPredicate>,
  ) -> QueryDescriptor<u64> {
    let api = self.api.clone();
    let filter = filter.cloned().unwrap_or_default();

    QueryDescriptor::new(derive_count_key(endpoint, &filter), move || {
      let api = api.clone();
      let filter = filter.clone();
      async move { api.count(endpoint, &filter).await }
    })
    .with_stale_after(self.stale_after)
  }
}
