//! Error type for `enrich-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] enrich_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("period out of range: {0}")]
  InvalidPeriod(i64),

  /// A fragment or summary write addressed a record that was never
  /// registered.
  #[error("record not found: {0}")]
  RecordNotFound(enrich_core::record::RecordKey),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
