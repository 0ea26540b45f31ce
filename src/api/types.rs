//! Entities returned by the list endpoints.
//!
//! Fields mirror the API schema; anything the list views do not need is
//! dropped during deserialization.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::endpoint::Endpoint;

/// An entity that can be listed and counted through an [`Endpoint`]
pub trait Entity: DeserializeOwned + Serialize + Clone + Send + Sync + 'static {
  const ENDPOINT: Endpoint;
}

/// A named JSON value stored by the server
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Variable {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub value: serde_json::Value,
  #[serde(default)]
  pub tags: Vec<String>,
  pub created: Option<DateTime<Utc>>,
  pub updated: Option<DateTime<Utc>>,
}

impl Entity for Variable {
  const ENDPOINT: Endpoint = Endpoint::Variables;
}

/// Readiness reported for a work pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkPoolStatus {
  Ready,
  NotReady,
  Paused,
  Unknown,
}

impl WorkPoolStatus {
  pub fn label(&self) -> &'static str {
    match self {
      WorkPoolStatus::Ready => "Ready",
      WorkPoolStatus::NotReady => "Not Ready",
      WorkPoolStatus::Paused => "Paused",
      WorkPoolStatus::Unknown => "Unknown",
    }
  }
}

/// A pool of workers that deployments submit runs to
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WorkPool {
  pub id: String,
  pub name: String,
  #[serde(rename = "type")]
  pub pool_type: String,
  pub description: Option<String>,
  /// Raw status string; see [`WorkPool::status`]
  #[serde(rename = "status")]
  pub raw_status: Option<String>,
  #[serde(default)]
  pub is_paused: bool,
  pub concurrency_limit: Option<u64>,
  pub created: Option<DateTime<Utc>>,
  pub updated: Option<DateTime<Utc>>,
}

impl WorkPool {
  pub fn status(&self) -> WorkPoolStatus {
    match self.raw_status.as_deref() {
      Some("READY") => WorkPoolStatus::Ready,
      Some("NOT_READY") => WorkPoolStatus::NotReady,
      Some("PAUSED") => WorkPoolStatus::Paused,
      _ if self.is_paused => WorkPoolStatus::Paused,
      _ => WorkPoolStatus::Unknown,
    }
  }
}

impl Entity for WorkPool {
  const ENDPOINT: Endpoint = Endpoint::WorkPools;
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_work_pool_status() {
    let pool: WorkPool = serde_json::from_value(json!({
      "id": "1",
      "name": "default",
      "type": "process",
      "status": "NOT_READY",
      "created": null,
      "updated": null
    }))
    .unwrap();
    assert_eq!(pool.status(), WorkPoolStatus::NotReady);
    assert_eq!(pool.concurrency_limit, None);
  }

  #[test]
  fn test_paused_flag_without_status() {
    let pool: WorkPool = serde_json::from_value(json!({
      "id": "2",
      "name": "k8s",
      "type": "kubernetes",
      "is_paused": true,
      "concurrency_limit": 5
    }))
    .unwrap();
    assert_eq!(pool.status(), WorkPoolStatus::Paused);
  }

  #[test]
  fn test_unknown_status() {
    let pool: WorkPool = serde_json::from_value(json!({
      "id": "3",
      "name": "odd",
      "type": "docker",
      "status": "MAINTENANCE"
    }))
    .unwrap();
    assert_eq!(pool.status(), WorkPoolStatus::Unknown);
  }
}
