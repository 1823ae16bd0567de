//! Encoding and decoding helpers between Rust domain types and the plain
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Payloads are stored as
//! compact JSON. Fragment types are stored under their storage key and
//! completion codes as integers.

use chrono::{DateTime, Utc};
use enrich_core::{
  fragment::{CompletionCode, FragmentType},
  record::{Period, Record, RecordKey, RecordStatus},
  summary::Summary,
};

use crate::{Error, Result};

// ─── DateTime<Utc>
// ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Key ─────────────────────────────────────────────────────────────────────

pub fn encode_key(key: RecordKey) -> (i64, i64) { (key.record_id, i64::from(key.period.0)) }

pub fn decode_period(p: i64) -> Result<Period> {
  u32::try_from(p).map(Period).map_err(|_| Error::InvalidPeriod(p))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `records` row.
pub struct RawRecord {
  pub record_id:        i64,
  pub period:           i64,
  pub external_code:    String,
  pub display_name:     String,
  pub group:            String,
  pub status:           String,
  pub created_at:       String,
  pub updated_at:       String,
  pub last_enriched_at: Option<String>,
}

/// Column list matching [`RawRecord::from_row`].
pub const RECORD_COLUMNS: &str = "record_id, period, external_code, display_name, \
                                  record_group, status, created_at, updated_at, \
                                  last_enriched_at";

impl RawRecord {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:        row.get(0)?,
      period:           row.get(1)?,
      external_code:    row.get(2)?,
      display_name:     row.get(3)?,
      group:            row.get(4)?,
      status:           row.get(5)?,
      created_at:       row.get(6)?,
      updated_at:       row.get(7)?,
      last_enriched_at: row.get(8)?,
    })
  }

  pub fn into_record(self) -> Result<Record> {
    Ok(Record {
      key:              RecordKey::new(self.record_id, decode_period(self.period)?),
      external_code:    self.external_code,
      display_name:     self.display_name,
      group:            self.group,
      status:           RecordStatus::parse(&self.status)?,
      created_at:       decode_dt(&self.created_at)?,
      updated_at:       decode_dt(&self.updated_at)?,
      last_enriched_at: self.last_enriched_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// Raw values read from a `fragments` row.
pub struct RawFragment {
  pub fragment_type: String,
  pub code:          i64,
  pub payload_json:  Option<String>,
}

impl RawFragment {
  pub fn decode(
    self,
  ) -> Result<(FragmentType, CompletionCode, Option<serde_json::Value>)> {
    let kind = FragmentType::from_storage_key(&self.fragment_type)?;
    let code = CompletionCode::from_i64(self.code)?;
    let payload = self
      .payload_json
      .as_deref()
      .map(serde_json::from_str::<serde_json::Value>)
      .transpose()?;
    Ok((kind, code, payload))
  }
}

/// Raw values read from a `summaries` row.
pub struct RawSummary {
  pub total_students:      Option<i64>,
  pub total_boys:          Option<i64>,
  pub total_girls:         Option<i64>,
  pub total_teachers:      Option<i64>,
  pub has_internet:        bool,
  pub has_library:         bool,
  pub has_playground:      bool,
  pub has_electricity:     bool,
  pub lgd_urban_body_id:   Option<String>,
  pub lgd_urban_body_name: Option<String>,
  pub lgd_ward_id:         Option<String>,
  pub lgd_ward_name:       Option<String>,
}

impl From<RawSummary> for Summary {
  fn from(r: RawSummary) -> Self {
    Summary {
      total_students:      r.total_students,
      total_boys:          r.total_boys,
      total_girls:         r.total_girls,
      total_teachers:      r.total_teachers,
      has_internet:        r.has_internet,
      has_library:         r.has_library,
      has_playground:      r.has_playground,
      has_electricity:     r.has_electricity,
      lgd_urban_body_id:   r.lgd_urban_body_id,
      lgd_urban_body_name: r.lgd_urban_body_name,
      lgd_ward_id:         r.lgd_ward_id,
      lgd_ward_name:       r.lgd_ward_name,
    }
  }
}
