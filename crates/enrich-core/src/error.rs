//! Error types for `enrich-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown fragment storage key: {0:?}")]
  UnknownFragmentType(String),

  #[error("unknown completion code: {0}")]
  UnknownCompletionCode(i64),

  #[error("unknown record status: {0:?}")]
  UnknownStatus(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
