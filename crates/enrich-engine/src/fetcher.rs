//! Bounded-retry fetch of a single fragment, with fallback-period
//! substitution.
//!
//! A fetch runs at most two retry cycles: the primary request, then (only
//! for period-carrying requests at the current period) the same request
//! against the fallback period. Each cycle makes up to
//! [`RetryPolicy::attempts`] calls. A response counts as captured only if the
//! call succeeded, the status is 200 and the body's own `status` flag is
//! `true`. A 503 buys a long cooldown instead of the ordinary backoff.

use std::{sync::Arc, time::Duration};

use enrich_core::{
  fragment::{CompletionCode, FragmentType},
  record::{Period, RecordKey},
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::transport::{FragmentRequest, RawResponse, Transport, TransportError};

// ─── Policy ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RetryPolicy {
  /// Calls per cycle. Values below 1 are treated as 1.
  pub attempts:          u32,
  /// Pause between ordinary failed attempts of a cycle.
  pub backoff:           Duration,
  /// Pause after a 503, before anything else is sent.
  pub throttle_cooldown: Duration,
  /// The period enrichment targets; only requests at this period fall back.
  pub current_period:    Period,
  pub fallback_period:   Option<Period>,
}

impl RetryPolicy {
  fn fallback_for(&self, request: &FragmentRequest) -> Option<FragmentRequest> {
    let fallback = self.fallback_period.filter(|p| *p != self.current_period)?;
    (request.period == Some(self.current_period)).then(|| request.at_period(fallback))
  }
}

// ─── Outcome ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum FragmentResult {
  Captured {
    /// Full response body.
    payload: Value,
    /// The period that served it; differs from the target after fallback.
    period:  Option<Period>,
  },
  Failed(CompletionCode),
}

impl FragmentResult {
  pub fn code(&self) -> CompletionCode {
    match self {
      Self::Captured { .. } => CompletionCode::Success,
      Self::Failed(code) => *code,
    }
  }
}

#[derive(Debug, Clone)]
pub struct FetchOutcome {
  pub kind:     FragmentType,
  pub result:   FragmentResult,
  /// Remote calls made, across both cycles.
  pub attempts: u32,
}

/// Classification of one remote call.
enum Attempt {
  Captured(Value),
  Throttled,
  Rejected(u16),
  Transport(TransportError),
}

fn classify(reply: Result<RawResponse, TransportError>) -> Attempt {
  match reply {
    Err(e) => Attempt::Transport(e),
    Ok(RawResponse { status: 503, .. }) => Attempt::Throttled,
    Ok(RawResponse { status: 200, body: Some(body) })
      if body.get("status").and_then(Value::as_bool) == Some(true) =>
    {
      Attempt::Captured(body)
    }
    Ok(RawResponse { status, .. }) => Attempt::Rejected(status),
  }
}

// ─── Fetcher ─────────────────────────────────────────────────────────────────

pub struct FragmentFetcher<T> {
  transport: Arc<T>,
  policy:    Arc<RetryPolicy>,
}

impl<T> Clone for FragmentFetcher<T> {
  fn clone(&self) -> Self {
    Self {
      transport: Arc::clone(&self.transport),
      policy:    Arc::clone(&self.policy),
    }
  }
}

impl<T: Transport> FragmentFetcher<T> {
  pub fn new(transport: Arc<T>, policy: RetryPolicy) -> Self {
    Self { transport, policy: Arc::new(policy) }
  }

  pub fn policy(&self) -> &RetryPolicy { &self.policy }

  /// Fetch `kind` for `key`. Never fails; exhaustion is a
  /// [`FragmentResult::Failed`] outcome.
  pub async fn fetch(&self, kind: FragmentType, key: RecordKey) -> FetchOutcome {
    let primary = FragmentRequest::new(kind, key);
    let fallback = self.policy.fallback_for(&primary);

    let mut attempts = 0;
    let mut last_code = CompletionCode::Unavailable;

    for request in std::iter::once(primary).chain(fallback) {
      if attempts > 0 {
        info!(fragment = %kind, period = ?request.period, "primary period exhausted, trying fallback");
      }
      match self.run_cycle(&request, &mut attempts).await {
        Ok(payload) => {
          return FetchOutcome {
            kind,
            result: FragmentResult::Captured { payload, period: request.period },
            attempts,
          };
        }
        Err(code) => last_code = code,
      }
    }

    warn!(fragment = %kind, attempts, code = last_code.as_i64(), "fragment exhausted retries");
    FetchOutcome { kind, result: FragmentResult::Failed(last_code), attempts }
  }

  /// Up to `attempts` calls for one request.
  async fn run_cycle(
    &self,
    request: &FragmentRequest,
    attempts: &mut u32,
  ) -> Result<Value, CompletionCode> {
    let budget = self.policy.attempts.max(1);
    let mut code = CompletionCode::Unavailable;

    for attempt in 1..=budget {
      *attempts += 1;
      match classify(self.transport.get(request).await) {
        Attempt::Captured(body) => return Ok(body),
        Attempt::Throttled => {
          warn!(
            fragment = %request.kind,
            cooldown = ?self.policy.throttle_cooldown,
            "503 from remote, cooling down"
          );
          code = CompletionCode::Throttled;
          tokio::time::sleep(self.policy.throttle_cooldown).await;
          continue;
        }
        Attempt::Rejected(status) => {
          debug!(fragment = %request.kind, attempt, status, "remote rejected request");
          code = CompletionCode::Unavailable;
        }
        Attempt::Transport(e) => {
          debug!(fragment = %request.kind, attempt, error = %e, "transport failure");
          code = CompletionCode::Unavailable;
        }
      }
      if attempt < budget {
        tokio::time::sleep(self.policy.backoff).await;
      }
    }

    Err(code)
  }
}
