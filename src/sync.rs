//! Reflects table interactions back into the location.
//!
//! Every operation reads the current location, merges its change over the
//! decoded state, encodes the result and writes it back. A change to one
//! field never drops the others.
//!
//! Filter and sort changes both reset pagination to the first page, because
//! the previous offset points into a differently shaped result set.

use tracing::info;

use crate::search::{self, SortKey, ViewState};

/// How a location write affects history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
  /// Overwrite the current history entry instead of pushing a new one
  pub replace_history_entry: bool,
}

/// Where the encoded view state lives (for example a URL's query string)
pub trait LocationStore {
  fn read(&self) -> String;

  fn write(&mut self, query: &str, options: WriteOptions);
}

/// In-memory location with a history stack.
#[derive(Debug, Clone)]
pub struct MemoryLocation {
  path: String,
  history: Vec<String>,
}

impl MemoryLocation {
  pub fn new(path: impl Into<String>, query: &str) -> Self {
    Self {
      path: path.into(),
      history: vec![query.strip_prefix('?').unwrap_or(query).to_string()],
    }
  }

  /// Path plus query string, as it would appear in a link
  pub fn href(&self) -> String {
    let query = self.read();
    if query.is_empty() {
      self.path.clone()
    } else {
      format!("{}?{}", self.path, query)
    }
  }

  pub fn history_len(&self) -> usize {
    self.history.len()
  }

  /// Go back one history entry. Returns false at the first entry.
  pub fn back(&mut self) -> bool {
    if self.history.len() > 1 {
      self.history.pop();
      true
    } else {
      false
    }
  }
}

impl LocationStore for MemoryLocation {
  fn read(&self) -> String {
    self.history.last().cloned().unwrap_or_default()
  }

  fn write(&mut self, query: &str, options: WriteOptions) {
    match self.history.last_mut() {
      Some(current) if options.replace_history_entry => *current = query.to_string(),
      _ => self.history.push(query.to_string()),
    }
  }
}

/// Page position as the table sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageChange {
  pub page_index: u64,
  pub page_size: u32,
}

/// Synchronizes table events with the location's view state
#[derive(Debug)]
pub struct ViewStateSync<L: LocationStore> {
  location: L,
}

impl<L: LocationStore> ViewStateSync<L> {
  pub fn new(location: L) -> Self {
    Self { location }
  }

  pub fn location(&self) -> &L {
    &self.location
  }

  pub fn location_mut(&mut self) -> &mut L {
    &mut self.location
  }

  /// Decode the current location; invalid parameters fall back to defaults
  pub fn current(&self) -> ViewState {
    search::decode_lossy(&self.location.read())
  }

  pub fn pagination(&self) -> PageChange {
    let state = self.current();
    PageChange {
      page_index: state.page_index(),
      page_size: state.limit,
    }
  }

  /// The table moved to another page or changed its page size
  pub fn on_page_change(&mut self, page: PageChange) -> ViewState {
    let limit = page.page_size.max(1);
    self.on_offset_change(page.page_index.saturating_mul(u64::from(limit)), limit)
  }

  pub fn on_offset_change(&mut self, offset: u64, limit: u32) -> ViewState {
    self.update(|state| {
      state.offset = offset;
      state.limit = limit.max(1);
    })
  }

  /// The name filter changed; a blank text clears it
  pub fn on_filter_change(&mut self, filter_text: Option<String>) -> ViewState {
    self.update(|state| {
      state.filter_text = filter_text.filter(|t| !t.trim().is_empty());
      state.offset = 0;
    })
  }

  pub fn on_sort_change(&mut self, sort: SortKey) -> ViewState {
    self.update(|state| {
      state.sort = sort;
      state.offset = 0;
    })
  }

  /// Open a state as a new history entry, e.g. from a deep link
  pub fn navigate(&mut self, state: &ViewState) {
    let query = search::encode(state);
    info!(%query, "navigate");
    self.location.write(
      &query,
      WriteOptions {
        replace_history_entry: false,
      },
    );
  }

  fn update(&mut self, apply: impl FnOnce(&mut ViewState)) -> ViewState {
    let mut state = self.current();
    apply(&mut state);

    let query = search::encode(&state);
    info!(%query, "view state changed");
    self.location.write(
      &query,
      WriteOptions {
        replace_history_entry: true,
      },
    );
    state
  }
}
