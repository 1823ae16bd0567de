//! Fragment types: the closed set of independently fetchable data slices.
//!
//! The set is fixed at nine. Everything the engine knows about a fragment
//! (where it is stored, which endpoint serves it, which parameters it takes)
//! lives in the [`FRAGMENTS`] table so the mapping stays auditable.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use strum::{EnumCount, EnumIter, IntoEnumIterator as _};

use crate::{Error, Result};

// ─── FragmentType ────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  EnumIter,
  EnumCount,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FragmentType {
  BasicInfo,
  ReportCard,
  Facility,
  Profile,
  /// Enrolment by caste category.
  SocialCaste,
  /// Enrolment by religion, BPL and CWSN.
  SocialReligion,
  SocialMainstreamed,
  SocialEws,
  SocialRte,
}

impl FragmentType {
  /// All nine fragment types in table order.
  pub fn all() -> impl Iterator<Item = FragmentType> { Self::iter() }

  pub fn spec(self) -> &'static FragmentSpec { &FRAGMENTS[self as usize] }

  pub fn storage_key(self) -> &'static str { self.spec().storage_key }

  pub fn from_storage_key(key: &str) -> Result<Self> {
    FRAGMENTS
      .iter()
      .find(|s| s.storage_key == key)
      .map(|s| s.kind)
      .ok_or_else(|| Error::UnknownFragmentType(key.to_owned()))
  }

  /// Whether this fragment decides between `success` and `partial`.
  pub fn is_load_bearing(self) -> bool { matches!(self, Self::Profile | Self::ReportCard) }
}

impl fmt::Display for FragmentType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.storage_key())
  }
}

// ─── Table ───────────────────────────────────────────────────────────────────

/// Static description of one fragment endpoint.
#[derive(Debug)]
pub struct FragmentSpec {
  pub kind:         FragmentType,
  /// Durable storage key (the column name in the flat legacy schema).
  pub storage_key:  &'static str,
  /// Path relative to the API base URL.
  pub endpoint:     &'static str,
  /// Whether the request carries the reporting period (`yearId`).
  pub takes_period: bool,
  pub action:       Option<u8>,
  /// Discriminator for the shared social-data endpoint.
  pub flag:         Option<u8>,
}

const SOCIAL_ENDPOINT: &str = "/getSocialData";

/// Indexed by `FragmentType as usize`.
pub const FRAGMENTS: [FragmentSpec; FragmentType::COUNT] = [
  FragmentSpec {
    kind:         FragmentType::BasicInfo,
    storage_key:  "basic_info",
    endpoint:     "/school/by-year",
    takes_period: false,
    action:       Some(2),
    flag:         None,
  },
  FragmentSpec {
    kind:         FragmentType::ReportCard,
    storage_key:  "report_card",
    endpoint:     "/school/report-card",
    takes_period: true,
    action:       None,
    flag:         None,
  },
  FragmentSpec {
    kind:         FragmentType::Facility,
    storage_key:  "facility_data",
    endpoint:     "/school/facility",
    takes_period: true,
    action:       None,
    flag:         None,
  },
  FragmentSpec {
    kind:         FragmentType::Profile,
    storage_key:  "profile_data",
    endpoint:     "/school/profile",
    takes_period: true,
    action:       None,
    flag:         None,
  },
  FragmentSpec {
    kind:         FragmentType::SocialCaste,
    storage_key:  "enrollment_social",
    endpoint:     SOCIAL_ENDPOINT,
    takes_period: true,
    action:       None,
    flag:         Some(1),
  },
  FragmentSpec {
    kind:         FragmentType::SocialReligion,
    storage_key:  "enrollment_religion",
    endpoint:     SOCIAL_ENDPOINT,
    takes_period: true,
    action:       None,
    flag:         Some(2),
  },
  FragmentSpec {
    kind:         FragmentType::SocialMainstreamed,
    storage_key:  "enrollment_mainstreamed",
    endpoint:     SOCIAL_ENDPOINT,
    takes_period: true,
    action:       None,
    flag:         Some(3),
  },
  FragmentSpec {
    kind:         FragmentType::SocialEws,
    storage_key:  "enrollment_ews",
    endpoint:     SOCIAL_ENDPOINT,
    takes_period: true,
    action:       None,
    flag:         Some(4),
  },
  FragmentSpec {
    kind:         FragmentType::SocialRte,
    storage_key:  "enrollment_rte",
    endpoint:     SOCIAL_ENDPOINT,
    takes_period: true,
    action:       None,
    flag:         Some(5),
  },
];

// ─── Completion code ─────────────────────────────────────────────────────────

/// The persisted outcome of the latest fetch cycle for one fragment.
///
/// An absent manifest entry means the fragment was never attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionCode {
  /// Captured; the payload is stored.
  Success,
  /// Retries (and the fallback cycle, if any) exhausted.
  Unavailable,
  /// Exhausted, and the last answer was a throttle signal.
  Throttled,
}

impl CompletionCode {
  pub fn is_success(self) -> bool { self == Self::Success }

  /// Integer form stored in the manifest; mirrors the HTTP status it stands
  /// for.
  pub fn as_i64(self) -> i64 {
    match self {
      Self::Success => 200,
      Self::Unavailable => 404,
      Self::Throttled => 503,
    }
  }

  pub fn from_i64(code: i64) -> Result<Self> {
    match code {
      200 => Ok(Self::Success),
      404 => Ok(Self::Unavailable),
      503 => Ok(Self::Throttled),
      other => Err(Error::UnknownCompletionCode(other)),
    }
  }
}

// ─── Payloads ────────────────────────────────────────────────────────────────

/// The stored fragment payloads of one record, as full JSON response bodies.
pub type FragmentPayloads = BTreeMap<FragmentType, serde_json::Value>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn table_is_indexed_by_discriminant() {
    for kind in FragmentType::all() {
      assert_eq!(kind.spec().kind, kind);
    }
    assert_eq!(FragmentType::all().count(), 9);
  }

  #[test]
  fn storage_keys_are_unique_and_parse_back() {
    let mut keys: Vec<_> = FRAGMENTS.iter().map(|s| s.storage_key).collect();
    keys.sort_unstable();
    keys.dedup();
    assert_eq!(keys.len(), FragmentType::COUNT);

    for kind in FragmentType::all() {
      assert_eq!(FragmentType::from_storage_key(kind.storage_key()).unwrap(), kind);
    }
    assert!(FragmentType::from_storage_key("photo").is_err());
  }

  #[test]
  fn only_basic_info_is_period_free() {
    let period_free: Vec<_> = FRAGMENTS
      .iter()
      .filter(|s| !s.takes_period)
      .map(|s| s.kind)
      .collect();
    assert_eq!(period_free, vec![FragmentType::BasicInfo]);
  }

  #[test]
  fn social_fragments_share_an_endpoint_with_distinct_flags() {
    let flags: Vec<_> = FRAGMENTS
      .iter()
      .filter(|s| s.endpoint == SOCIAL_ENDPOINT)
      .filter_map(|s| s.flag)
      .collect();
    assert_eq!(flags, vec![1, 2, 3, 4, 5]);
  }

  #[test]
  fn completion_codes_roundtrip_through_integers() {
    for code in [
      CompletionCode::Success,
      CompletionCode::Unavailable,
      CompletionCode::Throttled,
    ] {
      assert_eq!(CompletionCode::from_i64(code.as_i64()).unwrap(), code);
    }
    assert!(CompletionCode::from_i64(500).is_err());
  }
}
