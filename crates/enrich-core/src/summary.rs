//! Summary extraction: derived aggregate fields from stored payloads.
//!
//! [`extract_summary`] is pure: no I/O, no retries, deterministic. Each field
//! is derived independently. A field whose source payload (or source key) is
//! missing stays `None` / `false`; a real zero from the source stays `Some(0)`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::fragment::{FragmentPayloads, FragmentType};

/// The fixed set of derived columns written after every enrichment run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
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

/// Derive a [`Summary`] from whichever payloads are present.
pub fn extract_summary(payloads: &FragmentPayloads) -> Summary {
  let mut summary = Summary::default();

  if let Some(rc) = data_of(payloads, FragmentType::ReportCard) {
    let boys = first_int(rc, &["rowBoyTotal", "totMale"]);
    let girls = first_int(rc, &["rowGirlTotal", "totFemale"]);
    summary.total_students = int_field(rc, "rowTotal").or(match (boys, girls) {
      (Some(b), Some(g)) => b.checked_add(g),
      _ => None,
    });
    summary.total_boys = boys;
    summary.total_girls = girls;
    summary.total_teachers = int_field(rc, "totalTeacher");
  }

  if let Some(fd) = data_of(payloads, FragmentType::Facility) {
    summary.has_internet = is_yes(fd.get("internetYn"));
    summary.has_library = is_yes(fd.get("libraryYn"));
    summary.has_playground = is_yes(fd.get("playgroundYn"));
    summary.has_electricity = is_yes(fd.get("electricityYn"));
  }

  if let Some(pd) = data_of(payloads, FragmentType::Profile) {
    summary.lgd_urban_body_id = text_field(pd, "lgdurbanlocalbodyId");
    summary.lgd_urban_body_name = text_field(pd, "lgdurbanlocalbodyName");
    summary.lgd_ward_id = text_field(pd, "lgdwardId");
    summary.lgd_ward_name = text_field(pd, "lgdwardName");
  }

  summary
}

// ─── Field helpers ───────────────────────────────────────────────────────────

/// The nested `data` object of a stored response body.
fn data_of(payloads: &FragmentPayloads, kind: FragmentType) -> Option<&Map<String, Value>> {
  payloads.get(&kind)?.get("data")?.as_object()
}

fn int_field(obj: &Map<String, Value>, key: &str) -> Option<i64> {
  match obj.get(key)? {
    Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(whole_f64)),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }
}

/// A float counts only if it is integral and representable as `i64`.
fn whole_f64(f: f64) -> Option<i64> {
  (f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64).then_some(f as i64)
}

fn first_int(obj: &Map<String, Value>, keys: &[&str]) -> Option<i64> {
  keys.iter().find_map(|k| int_field(obj, k))
}

fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
  match obj.get(key)? {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

/// The source encodes yes/no flags as `1`/`2`; `"yes"` appears in older
/// exports.
fn is_yes(value: Option<&Value>) -> bool {
  match value {
    Some(Value::Number(n)) => n.as_i64() == Some(1),
    Some(Value::String(s)) => s == "1" || s.eq_ignore_ascii_case("yes"),
    _ => false,
  }
}
