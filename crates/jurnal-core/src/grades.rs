//! Grade book: one fixed-shape record per student per class.
//!
//! Scores are free text as typed by the teacher. The report score (`nilRap`)
//! is derived: the rounded mean of every score that reads as a number.

use std::{collections::BTreeMap, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  collection::{Collection, CollectionKey},
  state::AppState,
};

/// Scores for one student: nine learning-objective scores over three modules
/// (`tp_mX_Y`), three module summatives, one end-of-semester assessment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradeRecord {
  pub tp_m1_1: String,
  pub tp_m1_2: String,
  pub tp_m1_3: String,
  pub tp_m2_1: String,
  pub tp_m2_2: String,
  pub tp_m2_3: String,
  pub tp_m3_1: String,
  pub tp_m3_2: String,
  pub tp_m3_3: String,
  pub lm1:     String,
  pub lm2:     String,
  pub lm3:     String,
  pub akse:    String,
  #[serde(rename = "nilRap")]
  pub final_score: String,
}

/// Wire names of the editable scores, in display order.
pub const SCORE_COLUMNS: [&str; 13] = [
  "tp_m1_1", "tp_m1_2", "tp_m1_3",
  "tp_m2_1", "tp_m2_2", "tp_m2_3",
  "tp_m3_1", "tp_m3_2", "tp_m3_3",
  "lm1", "lm2", "lm3",
  "akse",
];

/// The editable score columns of a [`GradeRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeField {
  Objective { module: u8, index: u8 },
  ModuleSummative(u8),
  Semester,
}

impl FromStr for GradeField {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let unknown = || Error::UnknownGradeField(s.to_owned());
    let digit = |c: u8| match c {
      b'1'..=b'3' => Some(c - b'0'),
      _ => None,
    };
    match s.trim().as_bytes() {
      b"akse" => Ok(Self::Semester),
      [b'l', b'm', m] => digit(*m).map(Self::ModuleSummative).ok_or_else(unknown),
      [b't', b'p', b'_', b'm', m, b'_', i] => match (digit(*m), digit(*i)) {
        (Some(module), Some(index)) => Ok(Self::Objective { module, index }),
        _ => Err(unknown()),
      },
      _ => Err(unknown()),
    }
  }
}

impl GradeRecord {
  fn field_mut(&mut self, field: GradeField) -> &mut String {
    match field {
      GradeField::Objective { module: 1, index: 1 } => &mut self.tp_m1_1,
      GradeField::Objective { module: 1, index: 2 } => &mut self.tp_m1_2,
      GradeField::Objective { module: 1, .. } => &mut self.tp_m1_3,
      GradeField::Objective { module: 2, index: 1 } => &mut self.tp_m2_1,
      GradeField::Objective { module: 2, index: 2 } => &mut self.tp_m2_2,
      GradeField::Objective { module: 2, .. } => &mut self.tp_m2_3,
      GradeField::Objective { index: 1, .. } => &mut self.tp_m3_1,
      GradeField::Objective { index: 2, .. } => &mut self.tp_m3_2,
      GradeField::Objective { .. } => &mut self.tp_m3_3,
      GradeField::ModuleSummative(1) => &mut self.lm1,
      GradeField::ModuleSummative(2) => &mut self.lm2,
      GradeField::ModuleSummative(_) => &mut self.lm3,
      GradeField::Semester => &mut self.akse,
    }
  }

  /// The raw scores, in [`SCORE_COLUMNS`] order.
  pub fn scores(&self) -> [&str; 13] {
    [
      &self.tp_m1_1, &self.tp_m1_2, &self.tp_m1_3,
      &self.tp_m2_1, &self.tp_m2_2, &self.tp_m2_3,
      &self.tp_m3_1, &self.tp_m3_2, &self.tp_m3_3,
      &self.lm1, &self.lm2, &self.lm3,
      &self.akse,
    ]
  }

  /// Set one score and recompute the report score.
  pub fn set(&mut self, field: GradeField, value: &str) {
    *self.field_mut(field) = value.trim().to_owned();
    self.final_score = self.compute_final();
  }

  /// Rounded mean of the numeric scores, or empty when there are none.
  pub fn compute_final(&self) -> String {
    let values: Vec<f64> = self.scores().into_iter().filter_map(leading_number).collect();
    if values.is_empty() {
      return String::new();
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    format!("{}", (mean + 0.5).floor())
  }
}

/// Read the numeric prefix of a score (`"85"`, `"85.5"`, `"85 (remedial)"`).
fn leading_number(s: &str) -> Option<f64> {
  let s = s.trim_start();
  let mut end = 0;
  for (i, c) in s.char_indices() {
    let sign = (c == '-' || c == '+') && i == 0;
    if !(c.is_ascii_digit() || c == '.' || sign) {
      break;
    }
    end = i + c.len_utf8();
  }
  (1..=end)
    .rev()
    .find_map(|len| s[..len].parse::<f64>().ok())
    .filter(|v| v.is_finite())
}

/// Grade sheets per class.
pub type GradeSheet = BTreeMap<String, GradeRecord>;

/// class → student → record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GradeBook(pub BTreeMap<String, GradeSheet>);

impl GradeBook {
  /// The sheet to edit for `class`: one record per rostered student, blank
  /// where none is stored. Students no longer on the roster are left out.
  pub fn sheet_for(&self, class: &str, roster: &[String]) -> GradeSheet {
    let stored = self.0.get(class);
    roster
      .iter()
      .map(|student| {
        let record = stored
          .and_then(|sheet| sheet.get(student))
          .cloned()
          .unwrap_or_default();
        (student.clone(), record)
      })
      .collect()
  }

  /// Replace the whole sheet for `class`.
  pub fn save_class(&mut self, class: &str, sheet: GradeSheet) {
    self.0.insert(class.to_owned(), sheet);
  }

  /// Set one score for one student, creating the record if needed.
  pub fn set_score(&mut self, class: &str, student: &str, field: GradeField, value: &str) -> &GradeRecord {
    let record = self
      .0
      .entry(class.to_owned())
      .or_default()
      .entry(student.to_owned())
      .or_default();
    record.set(field, value);
    record
  }
}

impl Collection for GradeBook {
  const KEY: CollectionKey = CollectionKey::Grades;

  fn initial() -> Self { Self::default() }

  fn slot(state: &AppState) -> &Self { &state.grades }

  fn slot_mut(state: &mut AppState) -> &mut Self { &mut state.grades }
}
