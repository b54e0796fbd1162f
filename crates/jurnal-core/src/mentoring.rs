//! Weekly mentoring notes kept by a homeroom mentor (guru wali).
//!
//! A note is identified by (student, class, ISO year, ISO week): saving a new
//! note for the same week replaces the previous one.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  calendar::iso_week,
  collection::{Collection, CollectionKey},
  state::AppState,
};

/// Focus area of a mentoring note.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
  #[serde(rename = "Akademik")]
  Academic,
  #[serde(rename = "Karakter")]
  Character,
  #[serde(rename = "Kompetensi")]
  Competence,
  #[serde(rename = "Sosial/Ekonomi")]
  SocioEconomic,
  #[default]
  #[serde(rename = "Lainnya")]
  Other,
}

impl Category {
  pub fn label(self) -> &'static str {
    match self {
      Self::Academic => "Akademik",
      Self::Character => "Karakter",
      Self::Competence => "Kompetensi",
      Self::SocioEconomic => "Sosial/Ekonomi",
      Self::Other => "Lainnya",
    }
  }
}

impl fmt::Display for Category {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.label()) }
}

impl FromStr for Category {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_lowercase().as_str() {
      "akademik" | "academic" => Ok(Self::Academic),
      "karakter" | "character" => Ok(Self::Character),
      "kompetensi" | "competence" => Ok(Self::Competence),
      "sosial/ekonomi" | "sosial" | "socio-economic" => Ok(Self::SocioEconomic),
      "lainnya" | "other" => Ok(Self::Other),
      _ => Err(Error::UnknownCategory(s.to_owned())),
    }
  }
}

/// One weekly note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentoringRecord {
  /// Absent from notes written before ids were introduced; those decode as 0.
  #[serde(default)]
  pub id:        u64,
  #[serde(rename = "siswa")]
  pub student:   String,
  #[serde(rename = "kelas")]
  pub class:     String,
  #[serde(rename = "tahun")]
  pub year:      i32,
  #[serde(rename = "minggu")]
  pub week:      u32,
  #[serde(rename = "kategori", default)]
  pub category:  Category,
  #[serde(rename = "hadir", with = "tally", default)]
  pub present:   u32,
  #[serde(rename = "sakit", with = "tally", default)]
  pub sick:      u32,
  #[serde(rename = "izin", with = "tally", default)]
  pub excused:   u32,
  #[serde(rename = "alfa", with = "tally", default)]
  pub absent:    u32,
  #[serde(rename = "uraian", default)]
  pub narrative: String,
  #[serde(rename = "tindakLanjut", default)]
  pub follow_up: String,
}

/// The form input for a note.
#[derive(Debug, Clone, Default)]
pub struct NoteDraft {
  pub student:   String,
  pub class:     String,
  pub category:  Category,
  pub present:   u32,
  pub sick:      u32,
  pub excused:   u32,
  pub absent:    u32,
  pub narrative: String,
  pub follow_up: String,
}

impl NoteDraft {
  /// Build the record for the ISO week containing `date`.
  pub fn into_record(self, id: u64, date: NaiveDate) -> Result<MentoringRecord> {
    if self.student.trim().is_empty() {
      return Err(Error::EmptyField("student name"));
    }
    if self.class.trim().is_empty() {
      return Err(Error::EmptyField("class"));
    }
    let (year, week) = iso_week(date);
    Ok(MentoringRecord {
      id,
      student: self.student,
      class: self.class,
      year,
      week,
      category: self.category,
      present: self.present,
      sick: self.sick,
      excused: self.excused,
      absent: self.absent,
      narrative: self.narrative,
      follow_up: self.follow_up,
    })
  }
}

/// All mentoring notes, in save order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MentoringRecords(pub Vec<MentoringRecord>);

impl MentoringRecords {
  /// Store `record`, replacing any note for the same student and week.
  /// Returns the replaced note.
  pub fn save(&mut self, record: MentoringRecord) -> Option<MentoringRecord> {
    let existing = self.0.iter().position(|r| {
      r.student == record.student
        && r.class == record.class
        && r.year == record.year
        && r.week == record.week
    });
    let replaced = existing.map(|pos| self.0.remove(pos));
    self.0.push(record);
    replaced
  }

  pub fn find(&self, student: &str, class: &str, year: i32, week: u32) -> Option<&MentoringRecord> {
    self
      .0
      .iter()
      .find(|r| r.student == student && r.class == class && r.year == year && r.week == week)
  }

  pub fn remove(&mut self, id: u64) -> Option<MentoringRecord> {
    let pos = self.0.iter().position(|r| r.id == id)?;
    Some(self.0.remove(pos))
  }

  /// Notes from `year`, ordered by week (stable within a week).
  pub fn for_year(&self, year: i32) -> Vec<&MentoringRecord> {
    let mut notes: Vec<_> = self.0.iter().filter(|r| r.year == year).collect();
    notes.sort_by_key(|r| r.week);
    notes
  }
}

impl Collection for MentoringRecords {
  const KEY: CollectionKey = CollectionKey::Mentoring;

  fn initial() -> Self { Self::default() }

  fn slot(state: &AppState) -> &Self { &state.mentoring }

  fn slot_mut(state: &mut AppState) -> &mut Self { &mut state.mentoring }
}

/// Attendance tallies travel as strings (they come from text inputs); accept
/// numbers, numeric strings and blanks when reading.
mod tally {
  use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

  pub fn serialize<S: Serializer>(value: &u32, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(value)
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
      Number(u32),
      Text(String),
    }

    match Option::<Raw>::deserialize(d)? {
      None => Ok(0),
      Some(Raw::Number(n)) => Ok(n),
      Some(Raw::Text(s)) if s.trim().is_empty() => Ok(0),
      Some(Raw::Text(s)) => s
        .trim()
        .parse()
        .map_err(|_| D::Error::custom(format!("invalid tally {s:?}"))),
    }
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::calendar::parse_date;

  fn draft(student: &str, narrative: &str) -> NoteDraft {
    NoteDraft {
      student: student.into(),
      class: "X AP 1".into(),
      category: Category::Character,
      present: 4,
      absent: 1,
      narrative: narrative.into(),
      ..NoteDraft::default()
    }
  }

  #[test]
  fn decodes_legacy_note_without_id_or_category() {
    let record: MentoringRecord = serde_json::from_value(json!({
      "siswa": "Andi", "kelas": "X AP 1", "tahun": 2025, "minggu": 11,
      "hadir": "4", "sakit": "", "izin": 0, "alfa": "1",
      "uraian": "Sering terlambat", "tindakLanjut": ""
    }))
    .unwrap();
    assert_eq!(record.id, 0);
    assert_eq!(record.category, Category::Other);
    assert_eq!((record.present, record.sick, record.excused, record.absent), (4, 0, 0, 1));
  }

  #[test]
  fn tallies_serialise_as_strings() {
    let record = draft("Andi", "x").into_record(9, parse_date("2025-03-10").unwrap()).unwrap();
    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value["hadir"], json!("4"));
    assert_eq!(value["alfa"], json!("1"));
    assert_eq!(value["kategori"], json!("Karakter"));
    assert_eq!(value["minggu"], json!(11));
  }

  #[test]
  fn rejects_non_numeric_tally() {
    let err = serde_json::from_value::<MentoringRecord>(json!({
      "siswa": "Andi", "kelas": "X", "tahun": 2025, "minggu": 1,
      "hadir": "four", "sakit": "0", "izin": "0", "alfa": "0"
    }));
    assert!(err.is_err());
  }

  #[test]
  fn saving_same_week_replaces_note() {
    let mut notes = MentoringRecords::default();
    let monday = parse_date("2025-03-10").unwrap();
    let friday = parse_date("2025-03-14").unwrap();
    assert!(notes.save(draft("Andi", "first").into_record(1, monday).unwrap()).is_none());
    notes.save(draft("Budi", "other").into_record(2, monday).unwrap());
    let replaced = notes.save(draft("Andi", "second").into_record(3, friday).unwrap());

    assert_eq!(replaced.map(|r| r.id), Some(1));
    assert_eq!(notes.0.len(), 2);
    let current = notes.find("Andi", "X AP 1", 2025, 11).unwrap();
    assert_eq!((current.id, current.narrative.as_str()), (3, "second"));
  }

  #[test]
  fn year_listing_sorted_by_week() {
    let mut notes = MentoringRecords::default();
    notes.save(draft("Andi", "").into_record(1, parse_date("2025-05-05").unwrap()).unwrap());
    notes.save(draft("Andi", "").into_record(2, parse_date("2025-01-06").unwrap()).unwrap());
    notes.save(draft("Andi", "").into_record(3, parse_date("2024-12-02").unwrap()).unwrap());
    let weeks: Vec<_> = notes.for_year(2025).iter().map(|r| r.week).collect();
    assert_eq!(weeks, vec![2, 19]);
    assert!(notes.remove(3).is_some());
    assert!(notes.remove(3).is_none());
  }

  #[test]
  fn category_parsing() {
    assert_eq!("sosial/ekonomi".parse::<Category>().unwrap(), Category::SocioEconomic);
    assert_eq!("Academic".parse::<Category>().unwrap(), Category::Academic);
    assert!("sports".parse::<Category>().is_err());
  }
}
