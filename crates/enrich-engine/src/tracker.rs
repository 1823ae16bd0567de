//! [`ManifestTracker`]: loads and commits per-fragment manifest entries.

use std::sync::Arc;

use enrich_core::{manifest::Manifest, record::RecordKey, store::EntityStore};

use crate::{
  fetcher::{FetchOutcome, FragmentResult},
  Error, Result,
};

pub struct ManifestTracker<S> {
  store: Arc<S>,
}

impl<S> Clone for ManifestTracker<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: EntityStore> ManifestTracker<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// The stored manifest; empty (not an error) for a never-attempted record.
  pub async fn load(&self, key: RecordKey) -> Result<Manifest> {
    self.store.read_manifest(key).await.map_err(Error::store)
  }

  /// Commit one fragment's outcome as its own atomic write. A captured
  /// payload is written together with its success code; a failure writes
  /// the code alone and leaves any stored payload in place.
  pub async fn commit(&self, key: RecordKey, outcome: &FetchOutcome) -> Result<()> {
    match &outcome.result {
      FragmentResult::Captured { payload, .. } => self
        .store
        .write_fragment(key, outcome.kind, payload.clone())
        .await
        .map_err(Error::store),
      FragmentResult::Failed(code) => self
        .store
        .write_manifest_only(key, outcome.kind, *code)
        .await
        .map_err(Error::store),
    }
  }
}
