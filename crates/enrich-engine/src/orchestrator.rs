//! [`Orchestrator`]: the per-record enrichment state machine.
//!
//! Load → plan → dispatch → fan-in → finalize:
//!
//! 1. load the stored manifest;
//! 2. plan: every fragment type not yet at success is outstanding;
//! 3. dispatch one fetch task per outstanding fragment (never more than the
//!    nine fragment types);
//! 4. commit each result the moment its task resolves, independently of its
//!    siblings;
//! 5. derive the summary from the payloads now in the store, resolve the
//!    status, and persist both.
//!
//! Completion order is irrelevant: the manifest merge keeps success codes
//! and the summary is derived from stored state only after every task is
//! done.

use std::sync::Arc;

use enrich_core::{
  fragment::{FRAGMENTS, FragmentType},
  record::{RecordKey, RecordStatus},
  status::resolve_status,
  store::EntityStore,
  summary::{Summary, extract_summary},
};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{Instrument as _, debug, error, info, info_span};

use crate::{
  Error, Result,
  fetcher::{FetchOutcome, FragmentFetcher},
  tracker::ManifestTracker,
  transport::Transport,
};

/// One task per fragment type at most.
const MAX_CONCURRENT_FETCHES: usize = FRAGMENTS.len();

// ─── Report ──────────────────────────────────────────────────────────────────

/// What one orchestration run did.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichmentReport {
  pub key:             RecordKey,
  pub previous_status: RecordStatus,
  pub status:          RecordStatus,
  /// Fragment types fetched in this run.
  pub dispatched:      Vec<FragmentType>,
  pub captured:        usize,
  pub failed:          usize,
  /// Results that were fetched but could not be committed; they stay
  /// outstanding for the next run.
  pub uncommitted:     usize,
  /// `None` when the record was skipped.
  pub summary:         Option<Summary>,
}

impl EnrichmentReport {
  fn skipped(key: RecordKey, status: RecordStatus) -> Self {
    Self {
      key,
      previous_status: status,
      status,
      dispatched: Vec::new(),
      captured: 0,
      failed: 0,
      uncommitted: 0,
      summary: None,
    }
  }

  pub fn is_skipped(&self) -> bool { self.summary.is_none() }
}

// ─── Orchestrator ────────────────────────────────────────────────────────────

pub struct Orchestrator<S, T> {
  store:   Arc<S>,
  tracker: ManifestTracker<S>,
  fetcher: FragmentFetcher<T>,
}

impl<S, T> Orchestrator<S, T>
where
  S: EntityStore + 'static,
  T: Transport,
{
  pub fn new(store: Arc<S>, fetcher: FragmentFetcher<T>) -> Self {
    Self {
      tracker: ManifestTracker::new(Arc::clone(&store)),
      store,
      fetcher,
    }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  /// Run the state machine for one record.
  ///
  /// Closed records are returned untouched. A failed commit is logged and
  /// leaves that fragment outstanding; only failures to load the record or
  /// persist the summary abort the run.
  pub async fn enrich(&self, key: RecordKey) -> Result<EnrichmentReport> {
    let span = info_span!("enrich", record_id = key.record_id, period = %key.period);
    self.enrich_inner(key).instrument(span).await
  }

  async fn enrich_inner(&self, key: RecordKey) -> Result<EnrichmentReport> {
    let record = self
      .store
      .get_record(key)
      .await
      .map_err(Error::store)?
      .ok_or(Error::RecordNotFound(key))?;

    if record.status == RecordStatus::Closed {
      debug!("record is closed, skipping");
      return Ok(EnrichmentReport::skipped(key, record.status));
    }

    // ── Load & plan ─────────────────────────────────────────────────────────
    let mut manifest = self.tracker.load(key).await?;
    let outstanding = manifest.outstanding();
    debug!(
      captured = manifest.success_count(),
      outstanding = outstanding.len(),
      "manifest loaded"
    );

    // ── Dispatch ────────────────────────────────────────────────────────────
    let mut tasks: JoinSet<FetchOutcome> = JoinSet::new();
    for kind in outstanding.iter().copied().take(MAX_CONCURRENT_FETCHES) {
      let fetcher = self.fetcher.clone();
      tasks.spawn(
        async move { fetcher.fetch(kind, key).await }
          .instrument(info_span!("fragment", fragment = %kind)),
      );
    }

    // ── Fan-in ──────────────────────────────────────────────────────────────
    let (mut captured, mut failed, mut uncommitted) = (0, 0, 0);
    while let Some(joined) = tasks.join_next().await {
      let outcome = match joined {
        Ok(outcome) => outcome,
        Err(e) => {
          error!(error = %e, "fetch task did not complete");
          uncommitted += 1;
          continue;
        }
      };

      let code = outcome.result.code();
      match self.tracker.commit(key, &outcome).await {
        Ok(()) => {
          manifest.record(outcome.kind, code);
          if code.is_success() {
            captured += 1;
          } else {
            failed += 1;
          }
        }
        Err(e) => {
          error!(fragment = %outcome.kind, error = %e, "commit failed, fragment stays outstanding");
          uncommitted += 1;
        }
      }
    }

    // ── Finalize ────────────────────────────────────────────────────────────
    let payloads = self.store.read_payloads(key).await.map_err(Error::store)?;
    let summary = extract_summary(&payloads);
    let status = resolve_status(record.status, &manifest);

    self
      .store
      .write_summary(key, summary.clone(), status)
      .await
      .map_err(Error::store)?;

    info!(
      previous = %record.status,
      status = %status,
      captured,
      failed,
      uncommitted,
      complete = manifest.is_complete(),
      "record enriched"
    );

    Ok(EnrichmentReport {
      key,
      previous_status: record.status,
      status,
      dispatched: outstanding,
      captured,
      failed,
      uncommitted,
      summary: Some(summary),
    })
  }
}
