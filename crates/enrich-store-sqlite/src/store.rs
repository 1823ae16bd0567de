//! [`SqliteStore`]: the SQLite implementation of [`EntityStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use enrich_core::{
  fragment::{CompletionCode, FragmentPayloads, FragmentType},
  manifest::Manifest,
  record::{NewRecord, Record, RecordKey, RecordStatus},
  store::{EntityStore, WorklistQuery},
  summary::Summary,
};

use crate::{
  encode::{encode_dt, encode_key, RawFragment, RawRecord, RawSummary, RECORD_COLUMNS},
  schema::{SCHEMA, UPSERT_FRAGMENT},
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An entity store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Register or refresh a record, as the discovery crawl does.
  ///
  /// Identity fields are overwritten. Enrichment progress is kept unless the
  /// incoming status is `closed`, which always wins.
  pub async fn upsert_record(&self, input: NewRecord) -> Result<Record> {
    let (record_id, period) = encode_key(input.key);
    let now_str    = encode_dt(Utc::now());
    let status_str = input.status.as_str();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO records (
             record_id, period, external_code, display_name, record_group,
             status, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
           ON CONFLICT (record_id, period) DO UPDATE SET
             external_code = excluded.external_code,
             display_name  = excluded.display_name,
             record_group  = excluded.record_group,
             status        = CASE WHEN excluded.status = 'closed' THEN 'closed'
                                  ELSE records.status END,
             updated_at    = excluded.updated_at",
          rusqlite::params![
            record_id,
            period,
            input.external_code,
            input.display_name,
            input.group,
            status_str,
            now_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    self
      .get_record(input.key)
      .await?
      .ok_or(Error::RecordNotFound(input.key))
  }

  /// Upsert one `fragments` row and touch the owning record, in a single
  /// transaction. Leaves the database untouched if the record is unknown.
  async fn commit_fragment(
    &self,
    key: RecordKey,
    kind: FragmentType,
    code: CompletionCode,
    payload: Option<serde_json::Value>,
  ) -> Result<()> {
    let (record_id, period) = encode_key(key);
    let payload_str = payload.as_ref().map(serde_json::to_string).transpose()?;
    let now_str     = encode_dt(Utc::now());
    let storage_key = kind.storage_key();
    let code_val    = code.as_i64();

    let found: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let touched = tx.execute(
          "UPDATE records SET updated_at = ?3 WHERE record_id = ?1 AND period = ?2",
          rusqlite::params![record_id, period, now_str],
        )?;
        if touched == 0 {
          return Ok(false);
        }
        tx.execute(
          UPSERT_FRAGMENT,
          rusqlite::params![record_id, period, storage_key, code_val, payload_str, now_str],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if found { Ok(()) } else { Err(Error::RecordNotFound(key)) }
  }

  async fn read_fragments(&self, key: RecordKey, with_payload: bool) -> Result<Vec<RawFragment>> {
    let (record_id, period) = encode_key(key);
    let sql = if with_payload {
      "SELECT fragment_type, code, payload_json FROM fragments
       WHERE record_id = ?1 AND period = ?2 AND payload_json IS NOT NULL"
    } else {
      "SELECT fragment_type, code, NULL FROM fragments
       WHERE record_id = ?1 AND period = ?2"
    };

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
          .query_map(rusqlite::params![record_id, period], |row| {
            Ok(RawFragment {
              fragment_type: row.get(0)?,
              code:          row.get(1)?,
              payload_json:  row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(raws)
  }
}

// ─── EntityStore impl ────────────────────────────────────────────────────────

impl EntityStore for SqliteStore {
  type Error = Error;

  // ── Records ───────────────────────────────────────────────────────────────

  async fn get_record(&self, key: RecordKey) -> Result<Option<Record>> {
    let (record_id, period) = encode_key(key);

    let raw: Option<RawRecord> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {RECORD_COLUMNS} FROM records WHERE record_id = ?1 AND period = ?2"),
            rusqlite::params![record_id, period],
            RawRecord::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawRecord::into_record).transpose()
  }

  async fn worklist(&self, query: &WorklistQuery) -> Result<Vec<Record>> {
    let group     = query.group.clone();
    let period    = i64::from(query.period.0);
    // SQLite treats a negative LIMIT as "no limit".
    let limit_val = query
      .limit
      .filter(|&l| l > 0)
      .map_or(-1, |l| i64::try_from(l).unwrap_or(-1));

    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RECORD_COLUMNS} FROM records
           WHERE record_group = ?1
             AND period = ?2
             AND status IN ('pending', 'partial')
           ORDER BY CASE status WHEN 'pending' THEN 0 ELSE 1 END,
                    external_code ASC
           LIMIT ?3"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![group, period, limit_val], RawRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }

  // ── Manifest & payloads ───────────────────────────────────────────────────

  async fn read_manifest(&self, key: RecordKey) -> Result<Manifest> {
    self
      .read_fragments(key, false)
      .await?
      .into_iter()
      .map(|raw| raw.decode().map(|(kind, code, _)| (kind, code)))
      .collect()
  }

  async fn write_fragment(
    &self,
    key: RecordKey,
    kind: FragmentType,
    payload: serde_json::Value,
  ) -> Result<()> {
    self
      .commit_fragment(key, kind, CompletionCode::Success, Some(payload))
      .await
  }

  async fn write_manifest_only(
    &self,
    key: RecordKey,
    kind: FragmentType,
    code: CompletionCode,
  ) -> Result<()> {
    self.commit_fragment(key, kind, code, None).await
  }

  async fn read_payloads(&self, key: RecordKey) -> Result<FragmentPayloads> {
    let mut payloads = FragmentPayloads::new();
    for raw in self.read_fragments(key, true).await? {
      let (kind, _, payload) = raw.decode()?;
      if let Some(payload) = payload {
        payloads.insert(kind, payload);
      }
    }
    Ok(payloads)
  }

  // ── Summary ───────────────────────────────────────────────────────────────

  async fn write_summary(
    &self,
    key: RecordKey,
    summary: Summary,
    status: RecordStatus,
  ) -> Result<()> {
    let (record_id, period) = encode_key(key);
    let now_str    = encode_dt(Utc::now());
    let status_str = status.as_str();

    let found: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let touched = tx.execute(
          "UPDATE records
           SET status           = CASE WHEN status IN ('success', 'closed') THEN status
                                       ELSE ?3 END,
               last_enriched_at = ?4,
               updated_at       = ?4
           WHERE record_id = ?1 AND period = ?2",
          rusqlite::params![record_id, period, status_str, now_str],
        )?;
        if touched == 0 {
          return Ok(false);
        }
        tx.execute(
          "INSERT INTO summaries (
             record_id, period,
             total_students, total_boys, total_girls, total_teachers,
             has_internet, has_library, has_playground, has_electricity,
             lgd_urban_body_id, lgd_urban_body_name, lgd_ward_id, lgd_ward_name,
             computed_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
           ON CONFLICT (record_id, period) DO UPDATE SET
             total_students      = excluded.total_students,
             total_boys          = excluded.total_boys,
             total_girls         = excluded.total_girls,
             total_teachers      = excluded.total_teachers,
             has_internet        = excluded.has_internet,
             has_library         = excluded.has_library,
             has_playground      = excluded.has_playground,
             has_electricity     = excluded.has_electricity,
             lgd_urban_body_id   = excluded.lgd_urban_body_id,
             lgd_urban_body_name = excluded.lgd_urban_body_name,
             lgd_ward_id         = excluded.lgd_ward_id,
             lgd_ward_name       = excluded.lgd_ward_name,
             computed_at         = excluded.computed_at",
          rusqlite::params![
            record_id,
            period,
            summary.total_students,
            summary.total_boys,
            summary.total_girls,
            summary.total_teachers,
            summary.has_internet,
            summary.has_library,
            summary.has_playground,
            summary.has_electricity,
            summary.lgd_urban_body_id,
            summary.lgd_urban_body_name,
            summary.lgd_ward_id,
            summary.lgd_ward_name,
            now_str,
          ],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if found { Ok(()) } else { Err(Error::RecordNotFound(key)) }
  }

  async fn read_summary(&self, key: RecordKey) -> Result<Option<Summary>> {
    let (record_id, period) = encode_key(key);

    let raw: Option<RawSummary> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT total_students, total_boys, total_girls, total_teachers,
                    has_internet, has_library, has_playground, has_electricity,
                    lgd_urban_body_id, lgd_urban_body_name, lgd_ward_id, lgd_ward_name
             FROM summaries WHERE record_id = ?1 AND period = ?2",
            rusqlite::params![record_id, period],
            |row| {
              Ok(RawSummary {
                total_students:      row.get(0)?,
                total_boys:          row.get(1)?,
                total_girls:         row.get(2)?,
                total_teachers:      row.get(3)?,
                has_internet:        row.get(4)?,
                has_library:         row.get(5)?,
                has_playground:      row.get(6)?,
                has_electricity:     row.get(7)?,
                lgd_urban_body_id:   row.get(8)?,
                lgd_urban_body_name: row.get(9)?,
                lgd_ward_id:         row.get(10)?,
                lgd_ward_name:       row.get(11)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    Ok(raw.map(Summary::from))
  }
}
