//! Error type for `enrich-engine`.
//!
//! Fetch failures are not errors: an exhausted fragment is a normal outcome
//! recorded in the manifest. What surfaces here is what aborts a record.

use enrich_core::record::RecordKey;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("record not found: {0}")]
  RecordNotFound(RecordKey),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("http client error: {0}")]
  Http(#[from] reqwest::Error),
}

impl Error {
  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
