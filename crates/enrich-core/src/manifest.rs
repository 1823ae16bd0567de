//! The manifest: per-record ledger of fragment completion codes.
//!
//! Untouched fragment types are implicitly absent. A success code is sticky:
//! [`Manifest::record`] never moves an entry from success to failure, which
//! makes merging fetch results order-independent.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fragment::{CompletionCode, FragmentType};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
  entries: BTreeMap<FragmentType, CompletionCode>,
}

impl Manifest {
  pub fn new() -> Self { Self::default() }

  pub fn get(&self, kind: FragmentType) -> Option<CompletionCode> {
    self.entries.get(&kind).copied()
  }

  pub fn is_success(&self, kind: FragmentType) -> bool {
    self.get(kind).is_some_and(CompletionCode::is_success)
  }

  /// Merge one fetch outcome. Returns `false` if the entry was already a
  /// success and `code` was ignored.
  pub fn record(&mut self, kind: FragmentType, code: CompletionCode) -> bool {
    if self.is_success(kind) {
      return code.is_success();
    }
    self.entries.insert(kind, code);
    true
  }

  /// Fragment types that still need a fetch, in table order.
  pub fn outstanding(&self) -> Vec<FragmentType> {
    FragmentType::all().filter(|k| !self.is_success(*k)).collect()
  }

  pub fn success_count(&self) -> usize {
    self.entries.values().filter(|c| c.is_success()).count()
  }

  pub fn any_success(&self) -> bool { self.success_count() > 0 }

  pub fn is_complete(&self) -> bool { self.outstanding().is_empty() }

  pub fn iter(&self) -> impl Iterator<Item = (FragmentType, CompletionCode)> + '_ {
    self.entries.iter().map(|(k, c)| (*k, *c))
  }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

impl FromIterator<(FragmentType, CompletionCode)> for Manifest {
  fn from_iter<I: IntoIterator<Item = (FragmentType, CompletionCode)>>(iter: I) -> Self {
    let mut manifest = Manifest::new();
    for (kind, code) in iter {
      manifest.record(kind, code);
    }
    manifest
  }
}
