//! Records: the institutions being enriched, keyed by id and period.
//!
//! A record is created by the discovery crawl (an external collaborator) and
//! only its status and timestamps are touched by the enrichment engine.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Period ──────────────────────────────────────────────────────────────────

/// A reporting-cycle identifier as used by the remote API (`yearId`).
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Period(pub u32);

impl Period {
  /// The immediately preceding reporting cycle, if there is one.
  pub fn previous(self) -> Option<Period> { self.0.checked_sub(1).map(Period) }
}

impl fmt::Display for Period {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

// ─── Key ─────────────────────────────────────────────────────────────────────

/// The storage address of everything the engine reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordKey {
  pub record_id: i64,
  pub period:    Period,
}

impl RecordKey {
  pub fn new(record_id: i64, period: Period) -> Self { Self { record_id, period } }
}

impl fmt::Display for RecordKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}@{}", self.record_id, self.period)
  }
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// Lifecycle status of a record's enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
  /// Never enriched, or nothing captured yet.
  #[default]
  Pending,
  /// Some fragments captured; the load-bearing pair is incomplete.
  Partial,
  Success,
  /// Administratively inactive. Never enters enrichment.
  Closed,
}

impl RecordStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Partial => "partial",
      Self::Success => "success",
      Self::Closed => "closed",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "pending" => Ok(Self::Pending),
      "partial" => Ok(Self::Partial),
      "success" => Ok(Self::Success),
      "closed" => Ok(Self::Closed),
      other => Err(Error::UnknownStatus(other.to_owned())),
    }
  }

  /// Whether the worklist may select a record in this status.
  pub fn is_eligible(self) -> bool { matches!(self, Self::Pending | Self::Partial) }
}

impl fmt::Display for RecordStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

// ─── Record ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
  pub key:              RecordKey,
  /// Public registry code (e.g. the 11-digit school code).
  pub external_code:    String,
  pub display_name:     String,
  /// The selection group the CLI targets (e.g. a state name).
  pub group:            String,
  pub status:           RecordStatus,
  pub created_at:       DateTime<Utc>,
  pub updated_at:       DateTime<Utc>,
  pub last_enriched_at: Option<DateTime<Utc>>,
}

/// Input to the discovery side of the store. Timestamps are store-assigned.
#[derive(Debug, Clone)]
pub struct NewRecord {
  pub key:           RecordKey,
  pub external_code: String,
  pub display_name:  String,
  pub group:         String,
  pub status:        RecordStatus,
}

impl NewRecord {
  /// Convenience constructor for a `pending` record.
  pub fn pending(
    key: RecordKey,
    external_code: impl Into<String>,
    group: impl Into<String>,
  ) -> Self {
    let external_code = external_code.into();
    Self {
      key,
      display_name: external_code.clone(),
      external_code,
      group: group.into(),
      status: RecordStatus::Pending,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn previous_period_stops_at_zero() {
    assert_eq!(Period(12).previous(), Some(Period(11)));
    assert_eq!(Period(0).previous(), None);
  }

  #[test]
  fn status_parse_matches_as_str() {
    for status in [
      RecordStatus::Pending,
      RecordStatus::Partial,
      RecordStatus::Success,
      RecordStatus::Closed,
    ] {
      assert_eq!(RecordStatus::parse(status.as_str()).unwrap(), status);
    }
    assert!(RecordStatus::parse("closed_registry").is_err());
  }

  #[test]
  fn only_pending_and_partial_are_eligible() {
    assert!(RecordStatus::Pending.is_eligible());
    assert!(RecordStatus::Partial.is_eligible());
    assert!(!RecordStatus::Success.is_eligible());
    assert!(!RecordStatus::Closed.is_eligible());
  }
}
