//! Cache identities for list and count queries.

use std::fmt;

use crate::api::Endpoint;
use crate::search::{FilterPredicate, SortKey, ViewState};

/// One primitive component of a cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPart {
  Str(String),
  Int(u64),
}

impl fmt::Display for KeyPart {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      KeyPart::Str(s) => write!(f, "{:?}", s),
      KeyPart::Int(n) => write!(f, "{}", n),
    }
  }
}

impl From<&str> for KeyPart {
  fn from(s: &str) -> Self {
    KeyPart::Str(s.to_string())
  }
}

impl From<u64> for KeyPart {
  fn from(n: u64) -> Self {
    KeyPart::Int(n)
  }
}

/// Ordered sequence of primitives identifying a query's result.
///
/// Two keys are equal exactly when their queries return the same data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(Vec<KeyPart>);

impl CacheKey {
  /// Whether this key belongs to the given endpoint
  pub fn is_for(&self, endpoint: Endpoint) -> bool {
    matches!(self.0.first(), Some(KeyPart::Str(name)) if name == endpoint.name())
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("[")?;
    for (i, part) in self.0.iter().enumerate() {
      if i > 0 {
        f.write_str(", ")?;
      }
      write!(f, "{}", part)?;
    }
    f.write_str("]")
  }
}

/// The logical queries a list view issues
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryKey {
  /// One page of entities
  List {
    endpoint: Endpoint,
    offset: u64,
    limit: u32,
    sort: SortKey,
    filter: FilterPredicate,
  },
  /// Number of entities matching a filter, regardless of page or sort
  Count {
    endpoint: Endpoint,
    filter: FilterPredicate,
  },
}

impl QueryKey {
  pub fn cache_key(&self) -> CacheKey {
    let parts: Vec<KeyPart> = match self {
      Self::List {
        endpoint,
        offset,
        limit,
        sort,
        filter,
      } => vec![
        endpoint.name().into(),
        "filter".into(),
        (*offset).into(),
        u64::from(*limit).into(),
        sort.as_str().into(),
        filter.name().unwrap_or("").into(),
      ],
      // The filter part is only present when there is a filter, so the
      // total count and an unfiltered current count share one entry.
      Self::Count { endpoint, filter } => {
        let mut parts: Vec<KeyPart> = vec![endpoint.name().into(), "count".into()];
        if let Some(name) = filter.name() {
          parts.push(name.into());
        }
        parts
      }
    };
    CacheKey(parts)
  }
}

/// Key of a listing query; every field of the state participates
pub fn derive_list_key(endpoint: Endpoint, state: &ViewState) -> CacheKey {
  QueryKey::List {
    endpoint,
    offset: state.offset,
    limit: state.limit,
    sort: state.sort,
    filter: state.filter(),
  }
  .cache_key()
}

/// Key of a count query; only the filter participates
pub fn derive_count_key(endpoint: Endpoint, filter: &FilterPredicate) -> CacheKey {
  QueryKey::Count {
    endpoint,
    filter: filter.clone(),
  }
  .cache_key()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_filter_equals_no_filter() {
    assert_eq!(
      derive_count_key(Endpoint::Variables, &FilterPredicate::name_like("")),
      derive_count_key(Endpoint::Variables, &FilterPredicate::none())
    );
  }

  #[test]
  fn test_different_filters_diverge() {
    assert_ne!(
      derive_count_key(Endpoint::Variables, &FilterPredicate::name_like("a")),
      derive_count_key(Endpoint::Variables, &FilterPredicate::name_like("b"))
    );
  }

  #[test]
  fn test_count_key_ignores_pagination_and_sort() {
    let a = ViewState {
      offset: 40,
      limit: 20,
      sort: SortKey::NameDesc,
      filter_text: Some("x".to_string()),
    };
    let b = ViewState {
      filter_text: Some("x".to_string()),
      ..ViewState::default()
    };
    assert_eq!(
      derive_count_key(Endpoint::WorkPools, &a.filter()),
      derive_count_key(Endpoint::WorkPools, &b.filter())
    );
  }

  #[test]
  fn test_list_key_uses_every_field() {
    let base = ViewState::default();
    let key = derive_list_key(Endpoint::Variables, &base);

    let variants = [
      ViewState { offset: 10, ..base.clone() },
      ViewState { limit: 25, ..base.clone() },
      ViewState { sort: SortKey::NameAsc, ..base.clone() },
      ViewState { filter_text: Some("x".to_string()), ..base.clone() },
    ];
    for variant in variants {
      assert_ne!(derive_list_key(Endpoint::Variables, &variant), key);
    }

    let empty_filter = ViewState {
      filter_text: Some(String::new()),
      ..base
    };
    assert_eq!(derive_list_key(Endpoint::Variables, &empty_filter), key);
  }

  #[test]
  fn test_endpoints_do_not_collide() {
    let filter = FilterPredicate::none();
    let key = derive_count_key(Endpoint::Variables, &filter);
    assert_ne!(key, derive_count_key(Endpoint::WorkPools, &filter));
    assert!(key.is_for(Endpoint::Variables));
    assert!(!key.is_for(Endpoint::WorkPools));
  }

  #[test]
  fn test_display() {
    let key = derive_count_key(Endpoint::Variables, &FilterPredicate::name_like("foo"));
    assert_eq!(key.to_string(), r#"["variables", "count", "foo"]"#);
  }
}
