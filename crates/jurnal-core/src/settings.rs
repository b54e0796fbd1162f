//! Teacher and school identity, plus homeroom assignments.

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  collection::{Collection, CollectionKey},
  state::AppState,
};

/// A student under this teacher's mentorship (guru wali).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentoredStudent {
  #[serde(rename = "nama")]
  pub name:  String,
  #[serde(rename = "kelas")]
  pub class: String,
}

/// The single settings record.
///
/// Every field defaults when missing so that records written by older
/// revisions (which lacked e.g. `jabatanKepsek`) still decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
  #[serde(rename = "nama")]
  pub teacher_name:       String,
  #[serde(rename = "nip")]
  pub teacher_nip:        String,
  #[serde(rename = "jabatan")]
  pub teacher_position:   String,
  /// Subject taught; stamped onto every new journal entry.
  #[serde(rename = "mapel")]
  pub subject:            String,
  #[serde(rename = "waliKelas")]
  pub homeroom_classes:   Vec<String>,
  #[serde(rename = "siswaBinaan")]
  pub mentored_students:  Vec<MentoredStudent>,
  /// Profile picture, usually a data URL.
  #[serde(rename = "foto")]
  pub photo:              String,
  #[serde(rename = "namaSekolah")]
  pub school_name:        String,
  #[serde(rename = "namaKepsek")]
  pub principal_name:     String,
  #[serde(rename = "nipKepsek")]
  pub principal_nip:      String,
  #[serde(rename = "jabatanKepsek")]
  pub principal_position: String,
}

impl Settings {
  /// Add a homeroom class, keeping the list sorted. Returns `false` if the
  /// class was blank or already present.
  pub fn add_homeroom_class(&mut self, class: &str) -> bool {
    let class = class.trim();
    if class.is_empty() || self.homeroom_classes.iter().any(|c| c == class) {
      return false;
    }
    self.homeroom_classes.push(class.to_owned());
    self.homeroom_classes.sort();
    true
  }

  pub fn remove_homeroom_class(&mut self, class: &str) -> bool {
    let before = self.homeroom_classes.len();
    self.homeroom_classes.retain(|c| c != class);
    self.homeroom_classes.len() != before
  }

  /// Add a mentored student. Duplicates (same name and class) are ignored.
  pub fn add_mentored_student(&mut self, name: &str, class: &str) -> Result<bool> {
    let (name, class) = (name.trim(), class.trim());
    if name.is_empty() {
      return Err(Error::EmptyField("student name"));
    }
    if class.is_empty() {
      return Err(Error::EmptyField("class"));
    }
    if self
      .mentored_students
      .iter()
      .any(|s| s.name == name && s.class == class)
    {
      return Ok(false);
    }
    self.mentored_students.push(MentoredStudent {
      name:  name.to_owned(),
      class: class.to_owned(),
    });
    Ok(true)
  }

  pub fn remove_mentored_student(&mut self, name: &str, class: &str) -> bool {
    let before = self.mentored_students.len();
    self
      .mentored_students
      .retain(|s| !(s.name == name && s.class == class));
    self.mentored_students.len() != before
  }

  /// Mentored students belonging to `class`, in insertion order.
  pub fn mentored_in<'a>(
    &'a self,
    class: &'a str,
  ) -> impl Iterator<Item = &'a MentoredStudent> + 'a {
    self.mentored_students.iter().filter(move |s| s.class == class)
  }
}

impl Collection for Settings {
  const KEY: CollectionKey = CollectionKey::Settings;

  fn initial() -> Self { Self::default() }

  fn slot(state: &AppState) -> &Self { &state.settings }

  fn slot_mut(state: &mut AppState) -> &mut Self { &mut state.settings }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn decodes_partial_record() {
    let s: Settings = serde_json::from_value(json!({
      "nama": "Bu Sari",
      "mapel": "PJOK",
      "waliKelas": ["X AP 1"]
    }))
    .unwrap();
    assert_eq!(s.teacher_name, "Bu Sari");
    assert_eq!(s.subject, "PJOK");
    assert_eq!(s.homeroom_classes, vec!["X AP 1"]);
    assert!(s.principal_position.is_empty());
  }

  #[test]
  fn serialises_wire_names() {
    let value = serde_json::to_value(Settings::default()).unwrap();
    let obj = value.as_object().unwrap();
    for key in [
      "nama", "nip", "jabatan", "mapel", "waliKelas", "siswaBinaan", "foto",
      "namaSekolah", "namaKepsek", "nipKepsek", "jabatanKepsek",
    ] {
      assert!(obj.contains_key(key), "missing {key}");
    }
  }

  #[test]
  fn homeroom_classes_stay_sorted_and_unique() {
    let mut s = Settings::default();
    assert!(s.add_homeroom_class("XI TKJ 2"));
    assert!(s.add_homeroom_class("X AP 1"));
    assert!(!s.add_homeroom_class("X AP 1"));
    assert!(!s.add_homeroom_class("  "));
    assert_eq!(s.homeroom_classes, vec!["X AP 1", "XI TKJ 2"]);
    assert!(s.remove_homeroom_class("X AP 1"));
    assert!(!s.remove_homeroom_class("X AP 1"));
  }

  #[test]
  fn mentored_students_dedupe_on_name_and_class() {
    let mut s = Settings::default();
    assert!(s.add_mentored_student("Andi", "X AP 1").unwrap());
    assert!(!s.add_mentored_student("Andi", "X AP 1").unwrap());
    assert!(s.add_mentored_student("Andi", "X AP 2").unwrap());
    assert!(s.add_mentored_student("", "X AP 1").is_err());
    assert_eq!(s.mentored_in("X AP 1").count(), 1);
    assert!(s.remove_mentored_student("Andi", "X AP 2"));
    assert_eq!(s.mentored_students.len(), 1);
  }
}
