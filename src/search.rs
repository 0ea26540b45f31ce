//! Search-state codec for list views.
//!
//! A list view's pagination, sort and name filter live in the location's
//! query string so any view can be shared as a link. This module converts
//! between that string and a typed [`ViewState`].
//!
//! Encoding omits every field that equals its default, so the shortest
//! location always denotes the default view. The `name` parameter is written
//! whenever a filter text is present, even an empty one, which keeps
//! `decode(encode(v)) == v` for every state.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::warn;
use url::form_urlencoded;

/// Page size used when the location does not carry a `limit`.
pub const DEFAULT_LIMIT: u32 = 10;

const OFFSET: &str = "offset";
const LIMIT: &str = "limit";
const SORT: &str = "sort";
const NAME: &str = "name";

/// A search parameter that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("{field} must be an integer, got {value:?}")]
  NotAnInteger { field: &'static str, value: String },
  #[error("offset must be non-negative, got {0}")]
  NegativeOffset(i64),
  #[error("limit must be positive, got {0}")]
  NonPositiveLimit(i64),
  #[error("{field} is out of range: {value}")]
  OutOfRange { field: &'static str, value: i64 },
  #[error("unknown sort {0:?}")]
  UnknownSort(String),
}

/// Sort orders supported by the list endpoints
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortKey {
  #[default]
  CreatedDesc,
  UpdatedDesc,
  NameAsc,
  NameDesc,
}

impl SortKey {
  pub const ALL: [SortKey; 4] = [
    SortKey::CreatedDesc,
    SortKey::UpdatedDesc,
    SortKey::NameAsc,
    SortKey::NameDesc,
  ];

  /// Wire name, shared by the location and the API body
  pub fn as_str(&self) -> &'static str {
    match self {
      SortKey::CreatedDesc => "CREATED_DESC",
      SortKey::UpdatedDesc => "UPDATED_DESC",
      SortKey::NameAsc => "NAME_ASC",
      SortKey::NameDesc => "NAME_DESC",
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      SortKey::CreatedDesc => "created ↓",
      SortKey::UpdatedDesc => "updated ↓",
      SortKey::NameAsc => "name A-Z",
      SortKey::NameDesc => "name Z-A",
    }
  }

  /// The sort that follows this one, wrapping around
  pub fn next(self) -> Self {
    let idx = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
    Self::ALL[(idx + 1) % Self::ALL.len()]
  }
}

impl fmt::Display for SortKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for SortKey {
  type Err = ValidationError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|sort| sort.as_str() == s)
      .ok_or_else(|| ValidationError::UnknownSort(s.to_string()))
  }
}

/// Decoded pagination, sort and filter configuration of a list view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewState {
  pub offset: u64,
  pub limit: u32,
  pub sort: SortKey,
  /// Free-text name filter (`name` in the location)
  pub filter_text: Option<String>,
}

impl Default for ViewState {
  fn default() -> Self {
    Self {
      offset: 0,
      limit: DEFAULT_LIMIT,
      sort: SortKey::default(),
      filter_text: None,
    }
  }
}

impl ViewState {
  /// Zero-based page index shown by the table
  pub fn page_index(&self) -> u64 {
    if self.offset == 0 || self.limit == 0 {
      0
    } else {
      self.offset / u64::from(self.limit)
    }
  }

  /// The semantic filter of this state, independent of pagination and sort
  pub fn filter(&self) -> FilterPredicate {
    FilterPredicate::from_text(self.filter_text.as_deref())
  }
}

/// The condition that narrows a list or count query.
///
/// An empty or whitespace-only filter text and an absent one all mean "no
/// filter" and compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FilterPredicate {
  name: Option<String>,
}

impl FilterPredicate {
  pub fn none() -> Self {
    Self::default()
  }

  pub fn name_like(text: impl Into<String>) -> Self {
    let text = text.into();
    Self {
      name: (!text.trim().is_empty()).then_some(text),
    }
  }

  pub fn from_text(text: Option<&str>) -> Self {
    text.map(Self::name_like).unwrap_or_default()
  }

  pub fn name(&self) -> Option<&str> {
    self.name.as_deref()
  }
}

/// Decode a raw query string, failing on the first invalid parameter.
///
/// Missing parameters take their defaults and unknown ones are ignored. When
/// a parameter repeats, the last occurrence wins.
pub fn decode(raw: &str) -> Result<ViewState, ValidationError> {
  let mut state = ViewState::default();
  for (key, value) in params(raw) {
    apply(&mut state, &key, &value)?;
  }
  Ok(state)
}

/// Decode a raw query string, substituting the default for every parameter
/// that fails validation.
pub fn decode_lossy(raw: &str) -> ViewState {
  let mut state = ViewState::default();
  for (key, value) in params(raw) {
    if let Err(e) = apply(&mut state, &key, &value) {
      warn!(error = %e, param = %key, "ignoring invalid search parameter");
      reset(&mut state, &key);
    }
  }
  state
}

/// Encode a state as a query string (without the leading `?`).
pub fn encode(state: &ViewState) -> String {
  let defaults = ViewState::default();
  let mut serializer = form_urlencoded::Serializer::new(String::new());

  if state.offset != defaults.offset {
    serializer.append_pair(OFFSET, &state.offset.to_string());
  }
  if state.limit != defaults.limit {
    serializer.append_pair(LIMIT, &state.limit.to_string());
  }
  if state.sort != defaults.sort {
    serializer.append_pair(SORT, state.sort.as_str());
  }
  if let Some(name) = &state.filter_text {
    serializer.append_pair(NAME, name);
  }

  serializer.finish()
}

fn params(raw: &str) -> form_urlencoded::Parse<'_> {
  form_urlencoded::parse(raw.strip_prefix('?').unwrap_or(raw).as_bytes())
}

fn apply(state: &mut ViewState, key: &str, value: &str) -> Result<(), ValidationError> {
  match key {
    OFFSET => state.offset = parse_offset(value)?,
    LIMIT => {
      let n = parse_integer(LIMIT, value)?;
      if n <= 0 {
        return Err(ValidationError::NonPositiveLimit(n));
      }
      state.limit = u32::try_from(n).map_err(|_| ValidationError::OutOfRange {
        field: LIMIT,
        value: n,
      })?;
    }
    SORT => state.sort = value.parse()?,
    NAME => state.filter_text = Some(value.to_string()),
    _ => {}
  }
  Ok(())
}

fn reset(state: &mut ViewState, key: &str) {
  let defaults = ViewState::default();
  match key {
    OFFSET => state.offset = defaults.offset,
    LIMIT => state.limit = defaults.limit,
    SORT => state.sort = defaults.sort,
    NAME => state.filter_text = defaults.filter_text,
    _ => {}
  }
}

/// Offsets span the whole `u64` range; a leading `-` goes through the signed
/// parser so negatives still report their value.
fn parse_offset(value: &str) -> Result<u64, ValidationError> {
  if value.trim_start().starts_with('-') {
    let n = parse_integer(OFFSET, value)?;
    return match u64::try_from(n) {
      Ok(offset) => Ok(offset),
      Err(_) => Err(ValidationError::NegativeOffset(n)),
    };
  }
  value
    .trim()
    .parse::<u64>()
    .map_err(|_| ValidationError::NotAnInteger {
      field: OFFSET,
      value: value.to_string(),
    })
}

fn parse_integer(field: &'static str, value: &str) -> Result<i64, ValidationError> {
  value
    .trim()
    .parse::<i64>()
    .map_err(|_| ValidationError::NotAnInteger {
      field,
      value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn state(offset: u64, limit: u32, sort: SortKey, name: Option<&str>) -> ViewState {
    ViewState {
      offset,
      limit,
      sort,
      filter_text: name.map(String::from),
    }
  }

  #[test]
  fn test_decode_empty_uses_defaults() {
    let decoded = decode("").unwrap();
    assert_eq!(decoded, state(0, 10, SortKey::CreatedDesc, None));
    assert_eq!(decode("?").unwrap(), decoded);
  }

  #[test]
  fn test_decode_all_fields() {
    let decoded = decode("?offset=20&limit=25&sort=NAME_ASC&name=my+var").unwrap();
    assert_eq!(decoded, state(20, 25, SortKey::NameAsc, Some("my var")));
  }

  #[test]
  fn test_decode_rejects_negative_offset() {
    assert_eq!(decode("offset=-10"), Err(ValidationError::NegativeOffset(-10)));
  }

  #[test]
  fn test_decode_accepts_offsets_past_i64() {
    assert_eq!(decode("offset=18446744073709551615").unwrap().offset, u64::MAX);
    assert_eq!(decode("offset=-0").unwrap().offset, 0);
    assert!(matches!(
      decode("offset=18446744073709551616"),
      Err(ValidationError::NotAnInteger { field: "offset", .. })
    ));
  }

  #[test]
  fn test_decode_rejects_non_positive_limit() {
    assert_eq!(decode("limit=0"), Err(ValidationError::NonPositiveLimit(0)));
    assert_eq!(decode("limit=-3"), Err(ValidationError::NonPositiveLimit(-3)));
  }

  #[test]
  fn test_decode_rejects_fractional_and_text_numbers() {
    assert!(matches!(
      decode("limit=2.5"),
      Err(ValidationError::NotAnInteger { field: "limit", .. })
    ));
    assert!(matches!(
      decode("offset=ten"),
      Err(ValidationError::NotAnInteger { field: "offset", .. })
    ));
  }

  #[test]
  fn test_decode_rejects_unknown_sort() {
    assert_eq!(
      decode("sort=name_asc"),
      Err(ValidationError::UnknownSort("name_asc".to_string()))
    );
  }

  #[test]
  fn test_decode_ignores_unknown_params() {
    assert_eq!(decode("tab=details&limit=50").unwrap().limit, 50);
  }

  #[test]
  fn test_decode_lossy_substitutes_defaults_per_field() {
    let decoded = decode_lossy("offset=-1&limit=25&sort=BOGUS&name=abc");
    assert_eq!(decoded, state(0, 25, SortKey::CreatedDesc, Some("abc")));
  }

  #[test]
  fn test_encode_omits_defaults() {
    assert_eq!(encode(&ViewState::default()), "");
    assert_eq!(
      encode(&state(30, 10, SortKey::CreatedDesc, None)),
      "offset=30"
    );
  }

  #[test]
  fn test_encode_keeps_empty_filter_text() {
    assert_eq!(encode(&state(0, 10, SortKey::CreatedDesc, Some(""))), "name=");
  }

  #[test]
  fn test_round_trip() {
    let states = [
      ViewState::default(),
      state(50, 25, SortKey::UpdatedDesc, Some("")),
      state(0, 100, SortKey::NameDesc, Some("a&b=c d+é")),
      state(7, 1, SortKey::NameAsc, None),
      state(u64::MAX, 10, SortKey::CreatedDesc, None),
    ];
    for v in states {
      assert_eq!(decode(&encode(&v)).unwrap(), v);
    }
  }

  #[test]
  fn test_page_index() {
    assert_eq!(state(0, 10, SortKey::CreatedDesc, None).page_index(), 0);
    assert_eq!(state(50, 25, SortKey::CreatedDesc, None).page_index(), 2);
  }

  #[test]
  fn test_filter_predicate_blank_text_is_none() {
    assert_eq!(FilterPredicate::name_like(""), FilterPredicate::none());
    assert_eq!(FilterPredicate::name_like("   "), FilterPredicate::none());
    assert_eq!(FilterPredicate::from_text(Some(" \t")), FilterPredicate::none());
    assert_eq!(FilterPredicate::from_text(Some("")), FilterPredicate::from_text(None));
    assert_eq!(FilterPredicate::name_like("x").name(), Some("x"));
  }

  #[test]
  fn test_sort_cycles() {
    assert_eq!(SortKey::CreatedDesc.next(), SortKey::UpdatedDesc);
    assert_eq!(SortKey::NameDesc.next(), SortKey::CreatedDesc);
  }
}
