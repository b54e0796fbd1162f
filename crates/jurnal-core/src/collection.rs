//! The eight named collections that make up the application state.
//!
//! Each collection is serialised independently: once per local-store key and
//! once per field of the aggregate document exchanged with the remote.

use std::fmt;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::state::AppState;

// ─── Keys ────────────────────────────────────────────────────────────────────

/// Identifies one collection across the local store and the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CollectionKey {
  Settings,
  Journal,
  Attendance,
  Roster,
  Classes,
  Periods,
  Mentoring,
  Grades,
}

impl CollectionKey {
  pub const ALL: [CollectionKey; 8] = [
    CollectionKey::Settings,
    CollectionKey::Journal,
    CollectionKey::Attendance,
    CollectionKey::Roster,
    CollectionKey::Classes,
    CollectionKey::Periods,
    CollectionKey::Mentoring,
    CollectionKey::Grades,
  ];

  /// The local-store key holding this collection's JSON.
  pub fn local_key(self) -> &'static str {
    match self {
      Self::Settings => "pengaturanData",
      Self::Journal => "jurnalData",
      Self::Attendance => "absensiData",
      Self::Roster => "siswaData",
      Self::Classes => "kelasData",
      Self::Periods => "jamData",
      Self::Mentoring => "waliData",
      Self::Grades => "nilaiData",
    }
  }

  /// The field name used inside the aggregate document.
  ///
  /// Identical to [`local_key`](Self::local_key) except for settings, which
  /// the remote has always called `pengaturan`.
  pub fn aggregate_field(self) -> &'static str {
    match self {
      Self::Settings => "pengaturan",
      other => other.local_key(),
    }
  }
}

impl fmt::Display for CollectionKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let label = match self {
      Self::Settings => "settings",
      Self::Journal => "journal",
      Self::Attendance => "attendance",
      Self::Roster => "roster",
      Self::Classes => "classes",
      Self::Periods => "periods",
      Self::Mentoring => "mentoring records",
      Self::Grades => "grade book",
    };
    f.write_str(label)
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// A collection type stored in one [`AppState`] slot.
///
/// The slot accessors let generic code (the sync controller, the local-store
/// loader) address a collection by type instead of by field name.
pub trait Collection:
  Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
  const KEY: CollectionKey;

  /// The built-in value used on first run or when the cache is unreadable.
  fn initial() -> Self;

  fn slot(state: &AppState) -> &Self;

  fn slot_mut(state: &mut AppState) -> &mut Self;
}

/// Whether a JSON value counts as "no data" when merging a remote snapshot.
///
/// `null`, `{}`, `[]` and `""` are blank; everything else, including `0` and
/// `false`, carries data.
pub fn is_blank(value: &Value) -> bool {
  match value {
    Value::Null => true,
    Value::Object(map) => map.is_empty(),
    Value::Array(items) => items.is_empty(),
    Value::String(s) => s.is_empty(),
    Value::Bool(_) | Value::Number(_) => false,
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn local_keys_are_distinct() {
    let mut keys: Vec<_> = CollectionKey::ALL.iter().map(|k| k.local_key()).collect();
    keys.sort_unstable();
    keys.dedup();
    assert_eq!(keys.len(), CollectionKey::ALL.len());
  }

  #[test]
  fn settings_uses_short_aggregate_field() {
    assert_eq!(CollectionKey::Settings.local_key(), "pengaturanData");
    assert_eq!(CollectionKey::Settings.aggregate_field(), "pengaturan");
    assert_eq!(CollectionKey::Journal.aggregate_field(), "jurnalData");
  }

  #[test]
  fn blank_values() {
    assert!(is_blank(&json!(null)));
    assert!(is_blank(&json!({})));
    assert!(is_blank(&json!([])));
    assert!(is_blank(&json!("")));
    assert!(!is_blank(&json!(0)));
    assert!(!is_blank(&json!(["1-2"])));
    assert!(!is_blank(&json!({ "X": [] })));
  }
}
