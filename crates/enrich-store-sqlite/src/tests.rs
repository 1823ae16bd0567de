//! Integration tests for `SqliteStore` against an in-memory database.

use enrich_core::{
  fragment::{CompletionCode, FragmentType},
  record::{NewRecord, Period, RecordKey, RecordStatus},
  store::{EntityStore, WorklistQuery},
  summary::Summary,
};
use serde_json::json;

use crate::{Error, SqliteStore};

const PERIOD: Period = Period(12);

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn seeded(s: &SqliteStore, record_id: i64, code: &str, group: &str) -> RecordKey {
  let key = RecordKey::new(record_id, PERIOD);
  s.upsert_record(NewRecord::pending(key, code, group))
    .await
    .unwrap();
  key
}

fn worklist(group: &str, limit: Option<usize>) -> WorklistQuery {
  WorklistQuery { group: group.into(), period: PERIOD, limit }
}

// ─── Records ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_and_get_record() {
  let s = store().await;
  let key = seeded(&s, 1001, "29200100101", "KARNATAKA").await;

  let record = s.get_record(key).await.unwrap().unwrap();
  assert_eq!(record.key, key);
  assert_eq!(record.external_code, "29200100101");
  assert_eq!(record.group, "KARNATAKA");
  assert_eq!(record.status, RecordStatus::Pending);
  assert!(record.last_enriched_at.is_none());
}

#[tokio::test]
async fn get_record_missing_returns_none() {
  let s = store().await;
  let result = s.get_record(RecordKey::new(1, PERIOD)).await.unwrap();
  assert!(result.is_none());
}

#[tokio::test]
async fn rediscovery_keeps_progress_but_closed_wins() {
  let s = store().await;
  let key = seeded(&s, 7, "A", "GOA").await;
  s.write_summary(key, Summary::default(), RecordStatus::Partial)
    .await
    .unwrap();

  let again = s.upsert_record(NewRecord::pending(key, "A", "GOA")).await.unwrap();
  assert_eq!(again.status, RecordStatus::Partial);

  let mut closing = NewRecord::pending(key, "A", "GOA");
  closing.status = RecordStatus::Closed;
  let closed = s.upsert_record(closing).await.unwrap();
  assert_eq!(closed.status, RecordStatus::Closed);
}

// ─── Worklist ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn worklist_puts_pending_first_then_orders_by_code() {
  let s = store().await;
  let a = seeded(&s, 1, "300", "KERALA").await;
  seeded(&s, 2, "200", "KERALA").await;
  seeded(&s, 3, "100", "KERALA").await;
  s.write_summary(a, Summary::default(), RecordStatus::Partial)
    .await
    .unwrap();

  let codes: Vec<_> = s
    .worklist(&worklist("KERALA", None))
    .await
    .unwrap()
    .into_iter()
    .map(|r| r.external_code)
    .collect();
  assert_eq!(codes, ["100", "200", "300"]);

  // Partial record (code 300) is listed after every pending one.
  let b = seeded(&s, 4, "050", "KERALA").await;
  s.write_summary(b, Summary::default(), RecordStatus::Partial)
    .await
    .unwrap();
  let codes: Vec<_> = s
    .worklist(&worklist("KERALA", None))
    .await
    .unwrap()
    .into_iter()
    .map(|r| r.external_code)
    .collect();
  assert_eq!(codes, ["100", "200", "050", "300"]);
}

#[tokio::test]
async fn worklist_excludes_success_closed_and_other_groups() {
  let s = store().await;
  let done = seeded(&s, 1, "1", "KERALA").await;
  seeded(&s, 2, "2", "KERALA").await;
  seeded(&s, 3, "3", "GOA").await;
  s.write_summary(done, Summary::default(), RecordStatus::Success)
    .await
    .unwrap();
  let mut closed = NewRecord::pending(RecordKey::new(4, PERIOD), "4", "KERALA");
  closed.status = RecordStatus::Closed;
  s.upsert_record(closed).await.unwrap();

  let list = s.worklist(&worklist("KERALA", None)).await.unwrap();
  assert_eq!(list.len(), 1);
  assert_eq!(list[0].key.record_id, 2);
}

#[tokio::test]
async fn worklist_honours_limit_and_period() {
  let s = store().await;
  for id in 1..=5 {
    seeded(&s, id, &format!("{id:03}"), "TELANGANA").await;
  }
  s.upsert_record(NewRecord::pending(RecordKey::new(9, Period(11)), "009", "TELANGANA"))
    .await
    .unwrap();

  assert_eq!(s.worklist(&worklist("TELANGANA", Some(2))).await.unwrap().len(), 2);
  assert_eq!(s.worklist(&worklist("TELANGANA", None)).await.unwrap().len(), 5);
  // Zero means no limit.
  assert_eq!(s.worklist(&worklist("TELANGANA", Some(0))).await.unwrap().len(), 5);
}

// ─── Manifest ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn manifest_of_untouched_record_is_empty() {
  let s = store().await;
  let key = seeded(&s, 1, "1", "G").await;
  assert!(s.read_manifest(key).await.unwrap().is_empty());
  assert!(s.read_payloads(key).await.unwrap().is_empty());
}

#[tokio::test]
async fn fragment_write_records_payload_and_success() {
  let s = store().await;
  let key = seeded(&s, 1, "1", "G").await;
  let body = json!({ "status": true, "data": { "rowTotal": 40 } });

  s.write_fragment(key, FragmentType::ReportCard, body.clone())
    .await
    .unwrap();
  s.write_manifest_only(key, FragmentType::Facility, CompletionCode::Throttled)
    .await
    .unwrap();

  let manifest = s.read_manifest(key).await.unwrap();
  assert_eq!(manifest.len(), 2);
  assert_eq!(manifest.get(FragmentType::ReportCard), Some(CompletionCode::Success));
  assert_eq!(manifest.get(FragmentType::Facility), Some(CompletionCode::Throttled));

  let payloads = s.read_payloads(key).await.unwrap();
  assert_eq!(payloads.len(), 1);
  assert_eq!(payloads[&FragmentType::ReportCard], body);
}

#[tokio::test]
async fn success_is_never_regressed_by_a_later_failure() {
  let s = store().await;
  let key = seeded(&s, 1, "1", "G").await;
  let body = json!({ "status": true, "data": { "lgdwardId": 3 } });

  s.write_fragment(key, FragmentType::Profile, body.clone())
    .await
    .unwrap();
  s.write_manifest_only(key, FragmentType::Profile, CompletionCode::Unavailable)
    .await
    .unwrap();
  s.write_fragment(key, FragmentType::Profile, json!({ "status": true, "data": {} }))
    .await
    .unwrap();

  let manifest = s.read_manifest(key).await.unwrap();
  assert_eq!(manifest.get(FragmentType::Profile), Some(CompletionCode::Success));
  assert_eq!(s.read_payloads(key).await.unwrap()[&FragmentType::Profile], body);
}

#[tokio::test]
async fn failure_code_is_upgraded_by_later_success() {
  let s = store().await;
  let key = seeded(&s, 1, "1", "G").await;

  s.write_manifest_only(key, FragmentType::SocialEws, CompletionCode::Unavailable)
    .await
    .unwrap();
  s.write_fragment(key, FragmentType::SocialEws, json!({ "status": true, "data": {} }))
    .await
    .unwrap();

  let manifest = s.read_manifest(key).await.unwrap();
  assert_eq!(manifest.get(FragmentType::SocialEws), Some(CompletionCode::Success));
}

#[tokio::test]
async fn fragment_write_for_unknown_record_fails_cleanly() {
  let s = store().await;
  let key = RecordKey::new(404, PERIOD);

  let err = s
    .write_fragment(key, FragmentType::BasicInfo, json!({}))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::RecordNotFound(k) if k == key));
  assert!(s.read_manifest(key).await.unwrap().is_empty());
}

#[tokio::test]
async fn fragments_are_scoped_by_period() {
  let s = store().await;
  let current = seeded(&s, 1, "1", "G").await;
  let older = RecordKey::new(1, Period(11));
  s.upsert_record(NewRecord::pending(older, "1", "G")).await.unwrap();

  s.write_fragment(older, FragmentType::Facility, json!({ "status": true }))
    .await
    .unwrap();

  assert!(s.read_manifest(current).await.unwrap().is_empty());
  assert_eq!(s.read_manifest(older).await.unwrap().len(), 1);
}

// ─── Summary ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn summary_write_sets_status_and_overwrites() {
  let s = store().await;
  let key = seeded(&s, 1, "1", "G").await;
  assert!(s.read_summary(key).await.unwrap().is_none());

  let first = Summary {
    total_students: Some(120),
    has_library: true,
    lgd_ward_id: Some("12".into()),
    ..Summary::default()
  };
  s.write_summary(key, first.clone(), RecordStatus::Partial)
    .await
    .unwrap();
  assert_eq!(s.read_summary(key).await.unwrap(), Some(first));

  let record = s.get_record(key).await.unwrap().unwrap();
  assert_eq!(record.status, RecordStatus::Partial);
  assert!(record.last_enriched_at.is_some());

  let second = Summary { total_teachers: Some(0), ..Summary::default() };
  s.write_summary(key, second.clone(), RecordStatus::Success)
    .await
    .unwrap();
  assert_eq!(s.read_summary(key).await.unwrap(), Some(second));
}

#[tokio::test]
async fn summary_write_never_reopens_success_or_closed() {
  let s = store().await;
  let done = seeded(&s, 1, "1", "GOA").await;
  s.write_summary(done, Summary::default(), RecordStatus::Success)
    .await
    .unwrap();
  s.write_summary(done, Summary::default(), RecordStatus::Partial)
    .await
    .unwrap();
  assert_eq!(s.get_record(done).await.unwrap().unwrap().status, RecordStatus::Success);

  // Closed by discovery while a run was in flight.
  let key = seeded(&s, 2, "2", "GOA").await;
  let mut closing = NewRecord::pending(key, "2", "GOA");
  closing.status = RecordStatus::Closed;
  s.upsert_record(closing).await.unwrap();

  let summary = Summary { total_teachers: Some(4), ..Summary::default() };
  s.write_summary(key, summary.clone(), RecordStatus::Success)
    .await
    .unwrap();
  let record = s.get_record(key).await.unwrap().unwrap();
  assert_eq!(record.status, RecordStatus::Closed);
  assert_eq!(s.read_summary(key).await.unwrap(), Some(summary));
}

#[tokio::test]
async fn summary_write_for_unknown_record_fails() {
  let s = store().await;
  let err = s
    .write_summary(RecordKey::new(5, PERIOD), Summary::default(), RecordStatus::Success)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::RecordNotFound(_)));
}

// ─── Durability ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn committed_fragments_survive_reopen() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("enrich.db");

  let key = {
    let s = SqliteStore::open(&path).await.unwrap();
    let key = seeded(&s, 1, "1", "G").await;
    s.write_fragment(key, FragmentType::BasicInfo, json!({ "status": true }))
      .await
      .unwrap();
    key
  };

  let reopened = SqliteStore::open(&path).await.unwrap();
  let manifest = reopened.read_manifest(key).await.unwrap();
  assert!(manifest.is_success(FragmentType::BasicInfo));
  assert_eq!(manifest.outstanding().len(), 8);
}
