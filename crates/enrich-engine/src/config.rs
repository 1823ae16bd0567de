//! Engine configuration.
//!
//! Deserialised by the binary from an optional TOML file layered under
//! `ENRICH_*` environment variables. Every field has a default, so an empty
//! source yields a working configuration.

use std::{path::PathBuf, time::Duration};

use enrich_core::record::Period;
use serde::{Deserialize, Serialize};

use crate::{batch::Pacing, fetcher::RetryPolicy, transport::HttpConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  pub base_url:               String,
  pub user_agent:             String,
  pub request_timeout_secs:   u64,
  pub database_path:          PathBuf,
  /// The period enrichment targets.
  pub current_period:         u32,
  /// Substituted for `current_period` once its retries are exhausted.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub fallback_period:        Option<u32>,
  pub attempts:               u32,
  pub backoff_ms:             u64,
  pub throttle_cooldown_secs: u64,
  pub pause_min_ms:           u64,
  pub pause_max_ms:           u64,
  pub error_cooldown_secs:    u64,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      base_url:               "https://kys.udiseplus.gov.in/webapp/api".to_string(),
      user_agent:             concat!("enrich/", env!("CARGO_PKG_VERSION")).to_string(),
      request_timeout_secs:   15,
      database_path:          PathBuf::from("enrich.db"),
      current_period:         12,
      fallback_period:        Some(11),
      attempts:               2,
      backoff_ms:             1000,
      throttle_cooldown_secs: 60,
      pause_min_ms:           1000,
      pause_max_ms:           4000,
      error_cooldown_secs:    10,
    }
  }
}

impl EngineConfig {
  pub fn period(&self) -> Period { Period(self.current_period) }

  /// Retarget at another period. A configured fallback moves along to the
  /// period immediately before the new target.
  pub fn at_period(mut self, period: Period) -> Self {
    if period != self.period() {
      self.current_period = period.0;
      self.fallback_period = self
        .fallback_period
        .and(period.previous())
        .map(|p| p.0);
    }
    self
  }

  pub fn retry_policy(&self) -> RetryPolicy {
    RetryPolicy {
      attempts:          self.attempts,
      backoff:           Duration::from_millis(self.backoff_ms),
      throttle_cooldown: Duration::from_secs(self.throttle_cooldown_secs),
      current_period:    self.period(),
      fallback_period:   self.fallback_period.map(Period),
    }
  }

  pub fn pacing(&self) -> Pacing {
    Pacing {
      pause_min:      Duration::from_millis(self.pause_min_ms),
      pause_max:      Duration::from_millis(self.pause_max_ms),
      error_cooldown: Duration::from_secs(self.error_cooldown_secs),
    }
  }

  pub fn http_config(&self) -> HttpConfig {
    HttpConfig {
      base_url:   self.base_url.clone(),
      user_agent: self.user_agent.clone(),
      timeout:    Duration::from_secs(self.request_timeout_secs),
    }
  }
}
