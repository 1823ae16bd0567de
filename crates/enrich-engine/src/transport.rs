//! Remote access for fragment fetches.
//!
//! [`Transport`] performs exactly one request and reports what came back;
//! classification and retries belong to the fetcher.

use std::{future::Future, time::Duration};

use enrich_core::{
  fragment::FragmentType,
  record::{Period, RecordKey},
};
use reqwest::Client;
use thiserror::Error;

use crate::Result;

// ─── Request ─────────────────────────────────────────────────────────────────

/// One fragment request: the fragment's endpoint plus its parameter set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FragmentRequest {
  pub kind:      FragmentType,
  pub record_id: i64,
  /// `None` for fragments whose endpoint takes no period.
  pub period:    Option<Period>,
}

impl FragmentRequest {
  pub fn new(kind: FragmentType, key: RecordKey) -> Self {
    Self {
      kind,
      record_id: key.record_id,
      period: kind.spec().takes_period.then_some(key.period),
    }
  }

  /// The same request against another period. Period-free requests are
  /// returned unchanged.
  pub fn at_period(&self, period: Period) -> Self {
    Self {
      period: self.period.map(|_| period),
      ..self.clone()
    }
  }

  pub fn endpoint(&self) -> &'static str { self.kind.spec().endpoint }

  /// Query-string pairs in the remote API's parameter names.
  pub fn query(&self) -> Vec<(&'static str, String)> {
    let spec = self.kind.spec();
    let mut query = vec![("schoolId", self.record_id.to_string())];
    if let Some(period) = self.period {
      query.push(("yearId", period.to_string()));
    }
    if let Some(action) = spec.action {
      query.push(("action", action.to_string()));
    }
    if let Some(flag) = spec.flag {
      query.push(("flag", flag.to_string()));
    }
    query
  }
}

// ─── Response ────────────────────────────────────────────────────────────────

/// What the remote side answered, before any interpretation.
#[derive(Debug, Clone)]
pub struct RawResponse {
  pub status: u16,
  /// Parsed JSON body; `None` if the body was absent or not JSON.
  pub body:   Option<serde_json::Value>,
}

/// A request that never produced an HTTP status.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
  #[error("request timed out")]
  Timeout,

  #[error("request failed: {0}")]
  Request(String),
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// One remote GET for one fragment request.
///
/// Implementations must be cheap to share across the concurrent fetch tasks
/// of a record; the fetcher holds them behind an `Arc`.
pub trait Transport: Send + Sync + 'static {
  fn get<'a>(
    &'a self,
    request: &'a FragmentRequest,
  ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send + 'a;
}

// ─── HTTP ────────────────────────────────────────────────────────────────────

/// Connection settings for the remote fragment API.
#[derive(Debug, Clone)]
pub struct HttpConfig {
  pub base_url:   String,
  /// Client identity sent as `User-Agent` on every request.
  pub user_agent: String,
  pub timeout:    Duration,
}

/// [`Transport`] over the remote JSON API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpTransport {
  client:   Client,
  base_url: String,
}

impl HttpTransport {
  pub fn new(config: HttpConfig) -> Result<Self> {
    let client = Client::builder()
      .user_agent(config.user_agent)
      .timeout(config.timeout)
      .build()?;
    Ok(Self {
      client,
      base_url: config.base_url.trim_end_matches('/').to_owned(),
    })
  }

  fn url(&self, endpoint: &str) -> String { format!("{}{}", self.base_url, endpoint) }
}

impl Transport for HttpTransport {
  async fn get(&self, request: &FragmentRequest) -> Result<RawResponse, TransportError> {
    let resp = self
      .client
      .get(self.url(request.endpoint()))
      .query(&request.query())
      .send()
      .await
      .map_err(|e| {
        if e.is_timeout() {
          TransportError::Timeout
        } else {
          TransportError::Request(e.to_string())
        }
      })?;

    let status = resp.status().as_u16();
    // Error bodies are never interpreted.
    let body = if status == 200 {
      resp.json::<serde_json::Value>().await.ok()
    } else {
      None
    };

    Ok(RawResponse { status, body })
  }
}
