//! Per-endpoint list controller.
//!
//! Each navigation binds three queries: the page listing, the count for the
//! active filter and the total count. Without a filter the two counts share a
//! cache key and resolve to a single request.

use tracing::info;

use crate::api::{Entity, RequestError};
use crate::cache::{CacheResult, QueryCache};
use crate::query::{Query, QueryBinder, QueryDescriptor};
use crate::search::{SortKey, ViewState};
use crate::sync::{LocationStore, PageChange, ViewStateSync};

/// What the presentation layer renders
#[derive(Debug)]
pub struct ListSnapshot<'a, E> {
  pub items: &'a [E],
  /// Rows on the displayed page
  pub row_count: usize,
  /// Entities matching the active filter
  pub current_count: Option<u64>,
  /// Entities regardless of filter
  pub total_count: Option<u64>,
  pub is_loading: bool,
  /// `items` belongs to the previous state while the new page loads
  pub is_placeholder: bool,
  pub error: Option<&'a RequestError>,
}

/// The three descriptors of one page load
pub struct PageQueries<E> {
  pub list: QueryDescriptor<Vec<E>>,
  pub current_count: QueryDescriptor<u64>,
  pub total_count: QueryDescriptor<u64>,
}

/// Results of a completed page load
#[derive(Debug)]
pub struct LoadedPage<E> {
  pub items: Vec<E>,
  pub current_count: u64,
  pub total_count: u64,
}

pub struct ListController<E: Entity, L: LocationStore> {
  sync: ViewStateSync<L>,
  binder: QueryBinder,
  list_cache: QueryCache<Vec<E>>,
  count_cache: QueryCache<u64>,
  items: Query<Vec<E>>,
  current_count: Query<u64>,
  total_count: Query<u64>,
  state: ViewState,
}

impl<E: Entity, L: LocationStore> ListController<E, L> {
  pub fn new(
    sync: ViewStateSync<L>,
    binder: QueryBinder,
    list_cache: QueryCache<Vec<E>>,
    count_cache: QueryCache<u64>,
  ) -> Self {
    let state = sync.current();
    Self {
      items: Query::new(list_cache.clone()),
      current_count: Query::new(count_cache.clone()),
      total_count: Query::new(count_cache.clone()),
      sync,
      binder,
      list_cache,
      count_cache,
      state,
    }
  }

  pub fn state(&self) -> &ViewState {
    &self.state
  }

  pub fn location(&self) -> &L {
    self.sync.location()
  }

  pub fn pagination(&self) -> PageChange {
    self.sync.pagination()
  }

  /// Bind the queries for a state
  pub fn queries(&self, state: &ViewState) -> PageQueries<E> {
    let filter = state.filter();
    PageQueries {
      list: self.binder.bind::<E>(state),
      current_count: self.binder.bind_count(E::ENDPOINT, Some(&filter)),
      total_count: self.binder.bind_count(E::ENDPOINT, None),
    }
  }

  /// Ensure all three queries of the current state, concurrently.
  ///
  /// Fresh cache entries are reused; each distinct key is requested at most
  /// once.
  pub async fn load(&self) -> Result<LoadedPage<E>, RequestError> {
    let state = self.sync.current();
    let queries = self.queries(&state);

    let (items, current, total): (CacheResult<Vec<E>>, CacheResult<u64>, CacheResult<u64>) =
      futures::try_join!(
        self.list_cache.ensure(&queries.list),
        self.count_cache.ensure(&queries.current_count),
        self.count_cache.ensure(&queries.total_count),
      )?;

    Ok(LoadedPage {
      items: items.data,
      current_count: current.data,
      total_count: total.data,
    })
  }

  /// Re-read the location and point the observers at its queries
  pub fn refresh(&mut self) {
    self.state = self.sync.current();
    let queries = self.queries(&self.state);
    self.items.observe(queries.list);
    self.current_count.observe(queries.current_count);
    self.total_count.observe(queries.total_count);
  }

  /// Poll all observers. Returns `true` if anything changed.
  pub fn poll(&mut self) -> bool {
    let items = self.items.poll();
    let current = self.current_count.poll();
    let total = self.total_count.poll();
    items || current || total
  }

  /// Mark every cached result of this endpoint stale and refetch the page
  pub fn refetch(&mut self) {
    let lists = self.list_cache.invalidate_endpoint(E::ENDPOINT);
    let counts = self.count_cache.invalidate_endpoint(E::ENDPOINT);
    info!(endpoint = E::ENDPOINT.name(), lists, counts, "refetch");
    self.items.refetch();
    self.current_count.refetch();
    self.total_count.refetch();
  }

  pub fn on_page_change(&mut self, page: PageChange) {
    self.sync.on_page_change(page);
    self.refresh();
  }

  pub fn on_filter_change(&mut self, filter_text: Option<String>) {
    self.sync.on_filter_change(filter_text);
    self.refresh();
  }

  pub fn on_sort_change(&mut self, sort: SortKey) {
    self.sync.on_sort_change(sort);
    self.refresh();
  }

  /// Change the page size, keeping the first visible row on screen
  pub fn set_page_size(&mut self, page_size: u32) {
    let page_size = page_size.max(1);
    self.on_page_change(PageChange {
      page_index: self.state.offset / u64::from(page_size),
      page_size,
    });
  }

  pub fn has_next_page(&self) -> bool {
    let end = self.state.offset.saturating_add(u64::from(self.state.limit));
    match self.current_count.data() {
      Some(count) => end < *count,
      None => self
        .items
        .data()
        .is_some_and(|items| items.len() as u64 >= u64::from(self.state.limit)),
    }
  }

  pub fn next_page(&mut self) {
    if self.has_next_page() {
      let page = self.pagination();
      self.on_page_change(PageChange {
        page_index: page.page_index.saturating_add(1),
        ..page
      });
    }
  }

  pub fn previous_page(&mut self) {
    let page = self.pagination();
    if page.page_index > 0 {
      self.on_page_change(PageChange {
        page_index: page.page_index - 1,
        ..page
      });
    }
  }

  pub fn snapshot(&self) -> ListSnapshot<'_, E> {
    let items = self.items.data().map(|v| v.as_slice()).unwrap_or(&[]);
    ListSnapshot {
      items,
      row_count: items.len(),
      current_count: self.current_count.data().copied(),
      total_count: self.total_count.data().copied(),
      is_loading: self.items.is_loading()
        || self.current_count.is_loading()
        || self.total_count.is_loading(),
      is_placeholder: self.items.is_placeholder(),
      error: self
        .items
        .error()
        .or_else(|| self.current_count.error())
        .or_else(|| self.total_count.error()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::client::testing::FakeTransport;
  use crate::api::{ApiClient, Variable};
  use crate::sync::MemoryLocation;
  use serde_json::{json, Value};
  use std::sync::Arc;
  use std::time::Duration;

  fn variables(names: &[&str]) -> Value {
    Value::Array(
      names
        .iter()
        .map(|name| json!({ "id": format!("id-{}", name), "name": name }))
        .collect(),
    )
  }

  fn transport() -> Arc<FakeTransport> {
    Arc::new(FakeTransport::new(|path, body| {
      let filtered = body.is_some_and(|b| b.get("variables").is_some());
      match (path, filtered) {
        ("/variables/count", true) => Ok(json!(2)),
        ("/variables/count", false) => Ok(json!(42)),
        _ => Ok(variables(&["foo_a", "foo_b"])),
      }
    }))
  }

  fn controller(
    transport: &Arc<FakeTransport>,
    query: &str,
  ) -> ListController<Variable, MemoryLocation> {
    let binder = QueryBinder::new(ApiClient::with_transport(transport.clone()));
    ListController::new(
      ViewStateSync::new(MemoryLocation::new("/variables", query)),
      binder,
      QueryCache::new(),
      QueryCache::new(),
    )
  }

  #[tokio::test(start_paused = true)]
  async fn test_filtered_load_issues_two_counts_and_one_listing() {
    let transport = transport();
    let controller = controller(&transport, "name=foo");

    let page = controller.load().await.unwrap();
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.current_count, 2);
    assert_eq!(page.total_count, 42);
    assert_eq!(transport.calls_to("/variables/count"), 2);
    assert_eq!(transport.calls_to("/variables/filter"), 1);

    // Reload with the same filter: everything comes from the cache
    controller.load().await.unwrap();
    assert_eq!(transport.calls().len(), 3);

    tokio::time::advance(Duration::from_millis(1100)).await;
    controller.load().await.unwrap();
    assert_eq!(transport.calls().len(), 6);
  }

  #[tokio::test(start_paused = true)]
  async fn test_unfiltered_load_issues_one_count() {
    let transport = transport();
    let controller = controller(&transport, "name=");

    let page = controller.load().await.unwrap();
    assert_eq!(page.current_count, 42);
    assert_eq!(page.total_count, 42);
    assert_eq!(transport.calls_to("/variables/count"), 1);
    assert_eq!(transport.calls_to("/variables/filter"), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_filter_change_reuses_total_count() {
    let transport = transport();
    let mut controller = controller(&transport, "");
    controller.load().await.unwrap();

    controller.on_filter_change(Some("foo".to_string()));
    controller.load().await.unwrap();

    // Only the filtered count and the new listing are requested
    assert_eq!(transport.calls_to("/variables/count"), 2);
    assert_eq!(transport.calls_to("/variables/filter"), 2);
    assert_eq!(controller.state().filter_text.as_deref(), Some("foo"));
  }

  #[tokio::test]
  async fn test_observers_produce_snapshot() {
    let transport = transport();
    let mut controller = controller(&transport, "name=foo&limit=2");
    controller.refresh();
    assert!(controller.snapshot().is_loading);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(controller.poll());

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.row_count, 2);
    assert_eq!(snapshot.current_count, Some(2));
    assert_eq!(snapshot.total_count, Some(42));
    assert!(!snapshot.is_loading);
    assert!(snapshot.error.is_none());
  }

  #[tokio::test]
  async fn test_next_page_bounded_by_current_count() {
    let transport = transport();
    let mut controller = controller(&transport, "name=foo&limit=2");
    controller.refresh();
    tokio::time::sleep(Duration::from_millis(20)).await;
    controller.poll();

    // Two matches at two per page: already on the last page
    assert!(!controller.has_next_page());
    controller.next_page();
    assert_eq!(controller.state().offset, 0);
  }

  #[tokio::test]
  async fn test_has_next_page_near_offset_limit() {
    let transport = transport();
    let mut controller = controller(&transport, "offset=18446744073709551610&limit=10");
    controller.refresh();
    tokio::time::sleep(Duration::from_millis(20)).await;
    controller.poll();

    assert_eq!(controller.state().offset, u64::MAX - 5);
    assert!(!controller.has_next_page());
    controller.next_page();
    assert_eq!(controller.state().offset, u64::MAX - 5);
  }

  #[tokio::test]
  async fn test_paging_keeps_placeholder_and_updates_location() {
    let transport = transport();
    let mut controller = controller(&transport, "limit=2");
    controller.refresh();
    tokio::time::sleep(Duration::from_millis(20)).await;
    controller.poll();

    controller.next_page();
    assert_eq!(controller.location().read(), "offset=2&limit=2");
    let snapshot = controller.snapshot();
    assert!(snapshot.is_placeholder);
    assert_eq!(snapshot.row_count, 2);

    controller.previous_page();
    assert_eq!(controller.location().read(), "limit=2");
  }

  #[tokio::test]
  async fn test_set_page_size_keeps_first_row() {
    let transport = transport();
    let mut controller = controller(&transport, "offset=50&limit=25");

    controller.set_page_size(10);
    assert_eq!(controller.state().offset, 50);
    assert_eq!(controller.state().limit, 10);

    controller.set_page_size(100);
    assert_eq!(controller.state().offset, 0);
  }

  #[tokio::test]
  async fn test_failed_listing_is_reported() {
    let transport = Arc::new(FakeTransport::new(|path, _| {
      if path == "/variables/filter" {
        Err(RequestError::from_status(path, 500))
      } else {
        Ok(json!(0))
      }
    }));
    let mut controller = controller(&transport, "");
    controller.refresh();
    tokio::time::sleep(Duration::from_millis(20)).await;
    controller.poll();

    let snapshot = controller.snapshot();
    assert!(snapshot.items.is_empty());
    assert_eq!(snapshot.error.map(|e| e.endpoint.as_str()), Some("/variables/filter"));
    assert_eq!(snapshot.total_count, Some(0));
  }
}
