//! Status resolution: the record's overall enrichment status.
//!
//! Only the two load-bearing fragments (profile and report card) decide
//! between `success` and `partial`. A record already at `success` stays there
//! whatever a later run encounters.

use crate::{fragment::FragmentType, manifest::Manifest, record::RecordStatus};

pub fn resolve_status(stored: RecordStatus, manifest: &Manifest) -> RecordStatus {
  if matches!(stored, RecordStatus::Success | RecordStatus::Closed) {
    return stored;
  }

  let load_bearing_done = FragmentType::all()
    .filter(|k| k.is_load_bearing())
    .all(|k| manifest.is_success(k));

  if load_bearing_done {
    RecordStatus::Success
  } else if manifest.any_success() {
    RecordStatus::Partial
  } else {
    stored
  }
}
