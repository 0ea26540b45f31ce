//! Async query abstraction for list views.
//!
//! Inspired by TanStack Query. A view derives a [`QueryDescriptor`] from its
//! current state and hands it to a [`Query`], which resolves it through the
//! shared [`QueryCache`] and exposes loading, data and error state to the
//! render loop.
//!
//! # Example
//!
//! ```ignore
//! let mut query = Query::new(cache.clone());
//! query.observe(binder.bind::<Variable>(&state));
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//!
//! // In render
//! match (query.data(), query.error()) {
//!     (None, Some(e)) => render_error(e),
//!     (None, None) if query.is_loading() => render_spinner(),
//!     (data, _) => render_data(data),
//! }
//! ```

mod binder;
mod client;
mod key;

pub use binder::{PlaceholderPolicy, QueryBinder, QueryDescriptor, DEFAULT_STALE_TIME};
pub use client::QueryClient;
pub use key::{derive_count_key, derive_list_key, CacheKey, KeyPart, QueryKey};

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::api::RequestError;
use crate::cache::{CacheResult, QueryCache};

/// The fetch status of a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryStatus {
  /// Nothing has been requested yet
  Idle,
  /// A request for the current key is in flight
  Loading,
  /// The current key resolved successfully
  Success,
  /// The last request for the current key failed
  Error(RequestError),
}

type Delivery<T> = (CacheKey, Result<CacheResult<T>, RequestError>);

/// Observes one query at a time, following the key its view currently needs.
///
/// Query<T> encapsulates:
/// - The descriptor for the view's current state
/// - Loading/success/error status
/// - The data to display, which may be a placeholder from the previous key
/// - Async result delivery via a channel, tagged with the originating key
pub struct Query<T> {
  cache: QueryCache<T>,
  current: Option<QueryDescriptor<T>>,
  status: QueryStatus,
  data: Option<T>,
  is_placeholder: bool,
  fetched_at: Option<Instant>,
  sender: mpsc::UnboundedSender<Delivery<T>>,
  receiver: mpsc::UnboundedReceiver<Delivery<T>>,
}

impl<T: Clone + Send + Sync + 'static> Query<T> {
  pub fn new(cache: QueryCache<T>) -> Self {
    let (sender, receiver) = mpsc::unbounded_channel();
    Self {
      cache,
      current: None,
      status: QueryStatus::Idle,
      data: None,
      is_placeholder: false,
      fetched_at: None,
      sender,
      receiver,
    }
  }

  /// Data to display: the current key's result, or the previous key's
  /// result while a keep-previous query loads
  pub fn data(&self) -> Option<&T> {
    self.data.as_ref()
  }

  pub fn is_loading(&self) -> bool {
    self.status == QueryStatus::Loading
  }

  pub fn is_success(&self) -> bool {
    self.status == QueryStatus::Success
  }

  pub fn error(&self) -> Option<&RequestError> {
    match &self.status {
      QueryStatus::Error(e) => Some(e),
      _ => None,
    }
  }

  /// Whether `data` belongs to a previous key
  pub fn is_placeholder(&self) -> bool {
    self.is_placeholder
  }

  pub fn current_key(&self) -> Option<&CacheKey> {
    self.current.as_ref().map(|d| d.cache_key())
  }

  /// Check if the data is older than the current descriptor's stale time.
  pub fn is_stale(&self) -> bool {
    match (&self.current, self.fetched_at) {
      (Some(descriptor), Some(at)) if !self.is_placeholder => {
        at.elapsed() > descriptor.stale_after()
      }
      _ => true,
    }
  }

  /// Follow a new descriptor.
  ///
  /// With the same key this only refreshes stale data. With a new key the
  /// cached result is shown right away when there is one; otherwise the
  /// previous data stays as placeholder under `KeepPrevious` and is cleared
  /// under `None`.
  pub fn observe(&mut self, descriptor: QueryDescriptor<T>) {
    if self.current_key() == Some(descriptor.cache_key()) {
      self.current = Some(descriptor);
      if self.is_stale() && !self.is_loading() {
        self.start_fetch(false);
      }
      return;
    }

    let cached = self.cache.entry(descriptor.cache_key());
    let fresh = cached
      .as_ref()
      .is_some_and(|e| !e.is_stale(descriptor.stale_after()));

    match cached.and_then(|e| e.result.zip(e.fetched_at)) {
      Some((data, at)) => {
        self.data = Some(data);
        self.fetched_at = Some(at);
        self.is_placeholder = false;
        self.status = QueryStatus::Success;
      }
      None => {
        match descriptor.placeholder() {
          PlaceholderPolicy::KeepPrevious => self.is_placeholder = self.data.is_some(),
          PlaceholderPolicy::None => {
            self.data = None;
            self.is_placeholder = false;
          }
        }
        self.fetched_at = None;
      }
    }

    self.current = Some(descriptor);
    if !fresh {
      self.start_fetch(false);
    }
  }

  /// Force a refetch of the current key, even if its data is fresh.
  pub fn refetch(&mut self) {
    if self.current.is_some() {
      self.start_fetch(true);
    }
  }

  /// Poll for results of pending fetches.
  ///
  /// Results whose key is no longer current are dropped. Returns `true` if
  /// the state changed. Call this in your event loop tick handler.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;

    while let Ok((key, result)) = self.receiver.try_recv() {
      if self.current_key() != Some(&key) {
        debug!(%key, "discarding result of superseded query");
        continue;
      }

      match result {
        Ok(result) => {
          self.data = Some(result.data);
          self.fetched_at = Some(result.fetched_at);
          self.is_placeholder = false;
          self.status = QueryStatus::Success;
        }
        Err(e) => {
          warn!(%key, error = %e, "query failed");
          // Previous data stays visible; with none the view shows the error
          self.status = QueryStatus::Error(e);
        }
      }
      changed = true;
    }

    changed
  }

  /// Internal: resolve the current descriptor through the cache
  fn start_fetch(&mut self, force: bool) {
    let Some(descriptor) = self.current.clone() else {
      return;
    };
    // Keep showing cached data while a background refresh runs
    if self.data.is_none() || self.is_placeholder || !self.is_success() {
      self.status = QueryStatus::Loading;
    }

    let cache = self.cache.clone();
    let sender = self.sender.clone();
    tokio::spawn(async move {
      let result = if force {
        cache.fetch(&descriptor).await
      } else {
        cache.ensure(&descriptor).await
      };
      // Ignore send errors - the query may have been dropped
      let _ = sender.send((descriptor.cache_key().clone(), result));
    });
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("current", &self.current)
      .field("status", &self.status)
      .field("data", &self.data)
      .field("is_placeholder", &self.is_placeholder)
      .finish_non_exhaustive()
  }
}
