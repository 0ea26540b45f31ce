use std::sync::Arc;
use std::time::Duration;

use color_eyre::{eyre::eyre, Result};
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::endpoint::Endpoint;
use crate::api::error::RequestError;
use crate::api::types::Entity;
use crate::config::ApiConfig;
use crate::search::{FilterPredicate, ViewState};

/// Executes a POST-style request against the API.
///
/// Implementations perform exactly one attempt per call; retrying is left to
/// the caller.
pub trait Transport: Send + Sync {
  fn post<'a>(
    &'a self,
    path: &'a str,
    body: Option<Value>,
  ) -> BoxFuture<'a, Result<Value, RequestError>>;
}

/// HTTP transport backed by reqwest
pub struct HttpTransport {
  client: reqwest::Client,
  base_url: String,
}

impl HttpTransport {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    let base = url::Url::parse(&config.url)
      .map_err(|e| eyre!("Invalid API url {}: {}", config.url, e))?;

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      client,
      base_url: base.as_str().trim_end_matches('/').to_string(),
    })
  }

  fn url_for(&self, path: &str) -> String {
    format!("{}{}", self.base_url, path)
  }
}

impl Transport for HttpTransport {
  fn post<'a>(
    &'a self,
    path: &'a str,
    body: Option<Value>,
  ) -> BoxFuture<'a, Result<Value, RequestError>> {
    Box::pin(async move {
      let url = self.url_for(path);
      debug!(%url, "POST");

      let mut request = self.client.post(&url);
      if let Some(body) = body {
        request = request.json(&body);
      }

      let response = request
        .send()
        .await
        .map_err(|e| RequestError::transport(path, e.to_string()))?;

      let status = response.status();
      if !status.is_success() {
        warn!(%url, status = status.as_u16(), "request failed");
        return Err(RequestError::from_status(path, status.as_u16()));
      }

      response
        .json::<Value>()
        .await
        .map_err(|e| RequestError::decode(path, e.to_string()))
    })
  }
}

/// Typed client for the list endpoints
#[derive(Clone)]
pub struct ApiClient {
  transport: Arc<dyn Transport>,
}

impl ApiClient {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    Ok(Self::with_transport(Arc::new(HttpTransport::new(config)?)))
  }

  pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
    Self { transport }
  }

  /// Fetch one page of entities
  pub async fn filter<E: Entity>(&self, state: &ViewState) -> Result<Vec<E>, RequestError> {
    let path = E::ENDPOINT.filter_path();
    let body = E::ENDPOINT.filter_body(state);

    let value = self.transport.post(&path, Some(body)).await?;
    serde_json::from_value(value).map_err(|e| RequestError::decode(path, e.to_string()))
  }

  /// Count entities matching the filter
  pub async fn count(
    &self,
    endpoint: Endpoint,
    filter: &FilterPredicate,
  ) -> Result<u64, RequestError> {
    let path = endpoint.count_path();
    let body = endpoint.count_body(filter);

    let value = self.transport.post(&path, body).await?;
    value
      .as_u64()
      .ok_or_else(|| RequestError::decode(path, format!("expected a count, got {}", value)))
  }
}

#[cfg(test)]
pub mod testing {
  //! In-process transport for tests.

  use std::collections::VecDeque;
  use std::sync::Mutex;

  use super::*;

  /// A recorded request
  #[derive(Debug, Clone, PartialEq)]
  pub struct Call {
    pub path: String,
    pub body: Option<Value>,
  }

  type Responder = Box<dyn Fn(&str, Option<&Value>) -> Result<Value, RequestError> + Send + Sync>;

  /// Transport that answers from a closure and records every call
  pub struct FakeTransport {
    calls: Mutex<Vec<Call>>,
    queued: Mutex<VecDeque<Result<Value, RequestError>>>,
    responder: Responder,
    delay: Duration,
  }

  impl FakeTransport {
    pub fn new<F>(responder: F) -> Self
    where
      F: Fn(&str, Option<&Value>) -> Result<Value, RequestError> + Send + Sync + 'static,
    {
      Self {
        calls: Mutex::new(Vec::new()),
        queued: Mutex::new(VecDeque::new()),
        responder: Box::new(responder),
        delay: Duration::ZERO,
      }
    }

    /// Answers `filter` with an empty page and `count` with `count`
    pub fn with_count(count: u64) -> Self {
      Self::new(move |path, _| {
        if path.ends_with("/count") {
          Ok(Value::from(count))
        } else {
          Ok(Value::Array(Vec::new()))
        }
      })
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
      self.delay = delay;
      self
    }

    /// Answer the next call with `response` instead of the responder
    pub fn enqueue(&self, response: Result<Value, RequestError>) {
      self.queued.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> Vec<Call> {
      self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
      self.calls().iter().filter(|c| c.path == path).count()
    }
  }

  impl Transport for FakeTransport {
    fn post<'a>(
      &'a self,
      path: &'a str,
      body: Option<Value>,
    ) -> BoxFuture<'a, Result<Value, RequestError>> {
      Box::pin(async move {
        self.calls.lock().unwrap().push(Call {
          path: path.to_string(),
          body: body.clone(),
        });
        if !self.delay.is_zero() {
          tokio::time::sleep(self.delay).await;
        }
        let queued = self.queued.lock().unwrap().pop_front();
        match queued {
          Some(response) => response,
          None => (self.responder)(path, body.as_ref()),
        }
      })
    }
  }
}
