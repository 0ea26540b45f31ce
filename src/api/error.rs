//! Errors surfaced by remote calls.

use thiserror::Error;

/// Classification of a failed remote call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestErrorKind {
  /// The server rejected the request (HTTP 4xx)
  #[error("client error (HTTP {status})")]
  Client { status: u16 },
  /// The server failed to handle the request (HTTP 5xx)
  #[error("server error (HTTP {status})")]
  Server { status: u16 },
  /// The request never produced a response
  #[error("transport error: {0}")]
  Transport(String),
  /// The response body did not have the expected shape
  #[error("invalid response: {0}")]
  Decode(String),
}

/// A remote call failed.
///
/// Carries the endpoint path so the view layer can tell which of several
/// concurrent queries failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{endpoint}: {kind}")]
pub struct RequestError {
  pub endpoint: String,
  pub kind: RequestErrorKind,
}

impl RequestError {
  pub fn new(endpoint: impl Into<String>, kind: RequestErrorKind) -> Self {
    Self {
      endpoint: endpoint.into(),
      kind,
    }
  }

  /// Classify a non-success HTTP status
  pub fn from_status(endpoint: impl Into<String>, status: u16) -> Self {
    let kind = if (400..500).contains(&status) {
      RequestErrorKind::Client { status }
    } else {
      RequestErrorKind::Server { status }
    };
    Self::new(endpoint, kind)
  }

  pub fn transport(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
    Self::new(endpoint, RequestErrorKind::Transport(message.into()))
  }

  pub fn decode(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
    Self::new(endpoint, RequestErrorKind::Decode(message.into()))
  }

  /// Whether retrying the same request could succeed
  pub fn is_retryable(&self) -> bool {
    matches!(
      self.kind,
      RequestErrorKind::Server { .. } | RequestErrorKind::Transport(_)
    )
  }
}
