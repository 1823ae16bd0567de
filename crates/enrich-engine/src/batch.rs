//! [`BatchRunner`]: sequential enrichment of a worklist.
//!
//! Records are processed strictly one after another with a randomised pause
//! in between, to keep the remote request rate down. A record that fails is
//! logged, followed by a longer cooldown, and the loop moves on. Dropping the
//! run future mid-record is safe: every fragment committed so far stays
//! committed and the next run resumes from the manifest.

use std::{sync::Arc, time::Duration};

use enrich_core::{
  record::RecordStatus,
  store::{EntityStore, WorklistQuery},
};
use rand::Rng as _;
use serde::Serialize;
use tracing::{Instrument as _, error, info, info_span};
use uuid::Uuid;

use crate::{Error, Result, orchestrator::Orchestrator, transport::Transport};

/// How many records between progress lines.
const PROGRESS_EVERY: usize = 10;

// ─── Pacing ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Pacing {
  /// Lower bound of the pause after each record.
  pub pause_min:      Duration,
  /// Upper bound; a value below `pause_min` pins the pause to `pause_min`.
  pub pause_max:      Duration,
  /// Pause after a record whose run failed.
  pub error_cooldown: Duration,
}

impl Pacing {
  /// No pauses at all.
  pub fn none() -> Self {
    Self {
      pause_min:      Duration::ZERO,
      pause_max:      Duration::ZERO,
      error_cooldown: Duration::ZERO,
    }
  }

  fn record_pause(&self) -> Duration {
    if self.pause_max <= self.pause_min {
      return self.pause_min;
    }
    rand::thread_rng().gen_range(self.pause_min..=self.pause_max)
  }
}

// ─── Report ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
  pub run_id:   Uuid,
  pub selected: usize,
  pub success:  usize,
  pub partial:  usize,
  pub pending:  usize,
  pub skipped:  usize,
  pub errors:   usize,
}

// ─── Runner ──────────────────────────────────────────────────────────────────

pub struct BatchRunner<S, T> {
  orchestrator: Orchestrator<S, T>,
  pacing:       Pacing,
}

impl<S, T> BatchRunner<S, T>
where
  S: EntityStore + 'static,
  T: Transport,
{
  pub fn new(orchestrator: Orchestrator<S, T>, pacing: Pacing) -> Self {
    Self { orchestrator, pacing }
  }

  pub fn orchestrator(&self) -> &Orchestrator<S, T> { &self.orchestrator }

  /// Enrich every record the worklist query selects.
  ///
  /// Only a failure to read the worklist itself is returned as an error.
  pub async fn run(&self, query: &WorklistQuery) -> Result<BatchReport> {
    let run_id = Uuid::new_v4();
    let span = info_span!("batch", %run_id, group = %query.group, period = %query.period);
    self.run_inner(run_id, query).instrument(span).await
  }

  async fn run_inner(&self, run_id: Uuid, query: &WorklistQuery) -> Result<BatchReport> {
    let store: &Arc<S> = self.orchestrator.store();
    let records = store.worklist(query).await.map_err(Error::store)?;
    let total = records.len();
    info!(total, limit = ?query.limit, "starting batch");

    let mut report = BatchReport { run_id, selected: total, ..BatchReport::default() };

    for (i, record) in records.into_iter().enumerate() {
      let pause = match self.orchestrator.enrich(record.key).await {
        Ok(done) => {
          match done.status {
            _ if done.is_skipped() => report.skipped += 1,
            RecordStatus::Success => report.success += 1,
            RecordStatus::Partial => report.partial += 1,
            RecordStatus::Pending | RecordStatus::Closed => report.pending += 1,
          }
          self.pacing.record_pause()
        }
        Err(e) => {
          error!(
            record_id = record.key.record_id,
            code = %record.external_code,
            error = %e,
            "record failed"
          );
          report.errors += 1;
          self.pacing.error_cooldown
        }
      };

      let done = i + 1;
      if done % PROGRESS_EVERY == 0 {
        info!(done, total, "progress");
      }
      if done < total && !pause.is_zero() {
        tokio::time::sleep(pause).await;
      }
    }

    info!(
      success = report.success,
      partial = report.partial,
      pending = report.pending,
      skipped = report.skipped,
      errors = report.errors,
      "batch complete"
    );
    Ok(report)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pause_stays_within_bounds() {
    let pacing = Pacing {
      pause_min:      Duration::from_millis(1000),
      pause_max:      Duration::from_millis(4000),
      error_cooldown: Duration::from_secs(10),
    };
    for _ in 0..100 {
      let p = pacing.record_pause();
      assert!(p >= pacing.pause_min && p <= pacing.pause_max);
    }
  }

  #[test]
  fn inverted_range_pins_to_minimum() {
    let pacing = Pacing {
      pause_min:      Duration::from_millis(500),
      pause_max:      Duration::from_millis(100),
      error_cooldown: Duration::ZERO,
    };
    assert_eq!(pacing.record_pause(), Duration::from_millis(500));
  }
}
