//! Daily attendance marks per class.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  collection::{Collection, CollectionKey},
  state::AppState,
};

/// The four attendance codes. Decoding accepts any letter case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum AttendanceStatus {
  /// Hadir.
  #[default]
  #[serde(rename = "H")]
  Present,
  /// Sakit.
  #[serde(rename = "S")]
  Sick,
  /// Izin.
  #[serde(rename = "I")]
  Excused,
  /// Alfa.
  #[serde(rename = "A")]
  Absent,
}

impl AttendanceStatus {
  pub fn code(self) -> &'static str {
    match self {
      Self::Present => "H",
      Self::Sick => "S",
      Self::Excused => "I",
      Self::Absent => "A",
    }
  }
}

impl fmt::Display for AttendanceStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.code()) }
}

impl FromStr for AttendanceStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_uppercase().as_str() {
      "H" => Ok(Self::Present),
      "S" => Ok(Self::Sick),
      "I" => Ok(Self::Excused),
      "A" => Ok(Self::Absent),
      _ => Err(Error::UnknownStatus(s.to_owned())),
    }
  }
}

impl TryFrom<String> for AttendanceStatus {
  type Error = Error;

  fn try_from(code: String) -> Result<Self> { code.parse() }
}

/// Marks for one class on one day, keyed by student name.
pub type AttendanceSheet = BTreeMap<String, AttendanceStatus>;

/// date → class → student → status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttendanceByDate(pub BTreeMap<NaiveDate, BTreeMap<String, AttendanceSheet>>);

impl AttendanceByDate {
  /// The sheet to edit for `class` on `date`: every rostered student, with
  /// their recorded mark or [`AttendanceStatus::Present`] when unmarked.
  pub fn sheet_for(&self, date: NaiveDate, class: &str, roster: &[String]) -> AttendanceSheet {
    let recorded = self.0.get(&date).and_then(|classes| classes.get(class));
    roster
      .iter()
      .map(|student| {
        let status = recorded
          .and_then(|sheet| sheet.get(student))
          .copied()
          .unwrap_or_default();
        (student.clone(), status)
      })
      .collect()
  }

  /// Replace the marks for `class` on `date`; other classes that day are kept.
  pub fn record(&mut self, date: NaiveDate, class: &str, sheet: AttendanceSheet) {
    self.0.entry(date).or_default().insert(class.to_owned(), sheet);
  }

  pub fn status(&self, date: NaiveDate, class: &str, student: &str) -> Option<AttendanceStatus> {
    self.0.get(&date)?.get(class)?.get(student).copied()
  }

  /// Count the marks of `student` in `class` across the dates accepted by
  /// `include`.
  pub fn tally(
    &self,
    class: &str,
    student: &str,
    mut include: impl FnMut(NaiveDate) -> bool,
  ) -> Tally {
    let mut tally = Tally::default();
    for (date, classes) in &self.0 {
      if !include(*date) {
        continue;
      }
      if let Some(status) = classes.get(class).and_then(|sheet| sheet.get(student)) {
        tally.add(*status);
      }
    }
    tally
  }
}

/// Per-status counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
  pub present: u32,
  pub sick:    u32,
  pub excused: u32,
  pub absent:  u32,
}

impl Tally {
  pub fn add(&mut self, status: AttendanceStatus) {
    match status {
      AttendanceStatus::Present => self.present += 1,
      AttendanceStatus::Sick => self.sick += 1,
      AttendanceStatus::Excused => self.excused += 1,
      AttendanceStatus::Absent => self.absent += 1,
    }
  }

  pub fn marked(&self) -> u32 { self.present + self.sick + self.excused + self.absent }

  /// Share of marked days the student was present, in percent.
  pub fn presence_percent(&self) -> Option<f64> {
    match self.marked() {
      0 => None,
      n => Some(f64::from(self.present) * 100.0 / f64::from(n)),
    }
  }
}

impl Collection for AttendanceByDate {
  const KEY: CollectionKey = CollectionKey::Attendance;

  fn initial() -> Self { Self::default() }

  fn slot(state: &AppState) -> &Self { &state.attendance }

  fn slot_mut(state: &mut AppState) -> &mut Self { &mut state.attendance }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::calendar::parse_date;

  fn roster() -> Vec<String> { vec!["Andi".into(), "Budi".into(), "Citra".into()] }

  #[test]
  fn sheet_defaults_unmarked_students_to_present() {
    let date = parse_date("2025-03-10").unwrap();
    let mut attendance = AttendanceByDate::default();
    attendance.record(
      date,
      "X AP 1",
      [("Budi".to_string(), AttendanceStatus::Sick)].into(),
    );

    let sheet = attendance.sheet_for(date, "X AP 1", &roster());
    assert_eq!(sheet.len(), 3);
    assert_eq!(sheet["Andi"], AttendanceStatus::Present);
    assert_eq!(sheet["Budi"], AttendanceStatus::Sick);
  }

  #[test]
  fn record_keeps_other_classes() {
    let date = parse_date("2025-03-10").unwrap();
    let mut attendance = AttendanceByDate::default();
    attendance.record(date, "X AP 1", [("Andi".to_string(), AttendanceStatus::Absent)].into());
    attendance.record(date, "X AP 2", [("Dina".to_string(), AttendanceStatus::Present)].into());
    attendance.record(date, "X AP 1", [("Andi".to_string(), AttendanceStatus::Excused)].into());

    assert_eq!(attendance.status(date, "X AP 1", "Andi"), Some(AttendanceStatus::Excused));
    assert_eq!(attendance.status(date, "X AP 2", "Dina"), Some(AttendanceStatus::Present));
    assert_eq!(
      serde_json::to_value(&attendance).unwrap(),
      json!({ "2025-03-10": { "X AP 1": { "Andi": "I" }, "X AP 2": { "Dina": "H" } } })
    );
  }

  #[test]
  fn tally_and_percentage() {
    let mut attendance = AttendanceByDate::default();
    for (day, status) in [("2025-03-10", "H"), ("2025-03-11", "A"), ("2025-04-01", "S")] {
      attendance.record(
        parse_date(day).unwrap(),
        "X AP 1",
        [("Andi".to_string(), status.parse::<AttendanceStatus>().unwrap())].into(),
      );
    }
    let march = attendance.tally("X AP 1", "Andi", |d| d < parse_date("2025-04-01").unwrap());
    assert_eq!(march, Tally { present: 1, sick: 0, excused: 0, absent: 1 });
    assert_eq!(march.presence_percent(), Some(50.0));
    assert_eq!(Tally::default().presence_percent(), None);
  }

  #[test]
  fn parses_codes_case_insensitively() {
    assert_eq!("s".parse::<AttendanceStatus>().unwrap(), AttendanceStatus::Sick);
    assert!(matches!("X".parse::<AttendanceStatus>(), Err(Error::UnknownStatus(_))));
  }

  #[test]
  fn stored_codes_decode_case_insensitively() {
    let attendance: AttendanceByDate =
      serde_json::from_str(r#"{"2025-03-10":{"X AP 1":{"Andi":"H","Budi":"s"}}}"#).unwrap();
    let date = parse_date("2025-03-10").unwrap();
    assert_eq!(attendance.status(date, "X AP 1", "Budi"), Some(AttendanceStatus::Sick));
    // Written back in the canonical upper-case form.
    assert_eq!(
      serde_json::to_value(&attendance).unwrap(),
      json!({ "2025-03-10": { "X AP 1": { "Andi": "H", "Budi": "S" } } })
    );
    assert!(serde_json::from_str::<AttendanceStatus>(r#""X""#).is_err());
  }
}
