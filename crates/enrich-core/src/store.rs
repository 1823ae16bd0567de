//! The `EntityStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `enrich-store-sqlite`).
//! The engine depends on this abstraction, not on any concrete backend.

use std::future::Future;

use crate::{
  fragment::{CompletionCode, FragmentPayloads, FragmentType},
  manifest::Manifest,
  record::{Period, Record, RecordKey, RecordStatus},
  summary::Summary,
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`EntityStore::worklist`].
#[derive(Debug, Clone)]
pub struct WorklistQuery {
  /// The record group to select from (e.g. a state name).
  pub group:  String,
  pub period: Period,
  /// `None` or `Some(0)` selects every eligible record.
  pub limit:  Option<usize>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Durable storage for manifests, fragment payloads and summaries.
///
/// Every fragment write is its own atomic unit keyed by
/// `(record_id, period, fragment_type)`; implementations must not let one
/// fragment's write touch another fragment's entry. Implementations must also
/// keep success codes and captured payloads once written, even if asked to
/// overwrite them.
///
/// All methods return `Send` futures so the trait can be used from spawned
/// tasks on a multi-threaded runtime.
pub trait EntityStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Records ───────────────────────────────────────────────────────────

  /// Retrieve a record. Returns `None` if not found.
  fn get_record(
    &self,
    key: RecordKey,
  ) -> impl Future<Output = Result<Option<Record>, Self::Error>> + Send + '_;

  /// Records eligible for enrichment (`pending` or `partial`), never-attempted
  /// records first.
  fn worklist<'a>(
    &'a self,
    query: &'a WorklistQuery,
  ) -> impl Future<Output = Result<Vec<Record>, Self::Error>> + Send + 'a;

  // ── Manifest & payloads ───────────────────────────────────────────────

  /// The current manifest; empty if the record was never attempted.
  fn read_manifest(
    &self,
    key: RecordKey,
  ) -> impl Future<Output = Result<Manifest, Self::Error>> + Send + '_;

  /// Store a captured payload and mark the fragment successful, atomically.
  fn write_fragment(
    &self,
    key: RecordKey,
    kind: FragmentType,
    payload: serde_json::Value,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Record a completion code without touching the fragment's payload.
  fn write_manifest_only(
    &self,
    key: RecordKey,
    kind: FragmentType,
    code: CompletionCode,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// All stored payloads for a record.
  fn read_payloads(
    &self,
    key: RecordKey,
  ) -> impl Future<Output = Result<FragmentPayloads, Self::Error>> + Send + '_;

  // ── Summary ───────────────────────────────────────────────────────────

  /// Overwrite the summary and set the record's status. A stored `success`
  /// or `closed` status is kept.
  fn write_summary(
    &self,
    key: RecordKey,
    summary: Summary,
    status: RecordStatus,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn read_summary(
    &self,
    key: RecordKey,
  ) -> impl Future<Output = Result<Option<Summary>, Self::Error>> + Send + '_;
}
