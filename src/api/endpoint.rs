//! List endpoints and their request bodies.

use serde_json::{json, Map, Value};

use crate::search::{FilterPredicate, ViewState};

/// A backend entity collection that supports `filter` and `count`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Endpoint {
  Variables,
  #[value(name = "work-pools", alias = "work_pools")]
  WorkPools,
}

impl Endpoint {
  /// Stable name used as the first cache key part
  pub fn name(&self) -> &'static str {
    match self {
      Endpoint::Variables => "variables",
      Endpoint::WorkPools => "work_pools",
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      Endpoint::Variables => "Variables",
      Endpoint::WorkPools => "Work Pools",
    }
  }

  /// Location path of the list view
  pub fn route(&self) -> &'static str {
    match self {
      Endpoint::Variables => "/variables",
      Endpoint::WorkPools => "/work-pools",
    }
  }

  /// Work pools have no server-side sort
  pub fn supports_sort(&self) -> bool {
    *self == Endpoint::Variables
  }

  pub fn filter_path(&self) -> String {
    format!("/{}/filter", self.name())
  }

  pub fn count_path(&self) -> String {
    format!("/{}/count", self.name())
  }

  /// Body of a `filter` request for one page of results
  pub fn filter_body(&self, state: &ViewState) -> Value {
    let mut body = Map::new();
    body.insert("offset".to_string(), json!(state.offset));
    body.insert("limit".to_string(), json!(state.limit));
    if self.supports_sort() {
      body.insert("sort".to_string(), json!(state.sort.as_str()));
    }
    if let Some(filter) = self.entity_filter(&state.filter()) {
      body.insert(self.name().to_string(), filter);
    }
    Value::Object(body)
  }

  /// Body of a `count` request; `None` counts everything
  pub fn count_body(&self, filter: &FilterPredicate) -> Option<Value> {
    self.entity_filter(filter).map(|f| {
      let mut body = Map::new();
      body.insert(self.name().to_string(), f);
      Value::Object(body)
    })
  }

  fn entity_filter(&self, filter: &FilterPredicate) -> Option<Value> {
    let name = filter.name()?;
    let condition = match self {
      Endpoint::Variables => json!({ "like_": name }),
      Endpoint::WorkPools => json!({ "any_": [name] }),
    };
    Some(json!({ "operator": "and_", "name": condition }))
  }
}
