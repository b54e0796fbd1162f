//! Student rosters, the class list, and the period list.

use std::{cmp::Ordering, collections::BTreeMap};

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  collection::{Collection, CollectionKey},
  state::AppState,
};

// ─── Roster ──────────────────────────────────────────────────────────────────

/// Student names per class, in insertion order. Class keys are stored the
/// way [`ClassList`] stores them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster(pub BTreeMap<String, Vec<String>>);

impl Roster {
  pub fn add_student(&mut self, class: &str, student: &str) -> Result<()> {
    let (class, student) = (normalize_class(class), student.trim());
    if class.is_empty() {
      return Err(Error::EmptyField("class"));
    }
    if student.is_empty() {
      return Err(Error::EmptyField("student name"));
    }
    let students = self.0.entry(class.clone()).or_default();
    if students.iter().any(|s| s == student) {
      return Err(Error::DuplicateStudent { class, student: student.to_owned() });
    }
    students.push(student.to_owned());
    Ok(())
  }

  /// Remove a student; the class disappears once its roster is empty.
  pub fn remove_student(&mut self, class: &str, student: &str) -> Result<()> {
    let class = normalize_class(class);
    let students = self
      .0
      .get_mut(&class)
      .ok_or_else(|| Error::ClassNotFound(class.clone()))?;
    let pos = students.iter().position(|s| s == student).ok_or_else(|| {
      Error::StudentNotFound { class: class.clone(), student: student.to_owned() }
    })?;
    students.remove(pos);
    if students.is_empty() {
      self.0.remove(&class);
    }
    Ok(())
  }

  /// Rename a student in place, keeping their position on the roster.
  ///
  /// Attendance, grades and mentoring notes keep the old name; those
  /// references are allowed to dangle.
  pub fn rename_student(&mut self, class: &str, from: &str, to: &str) -> Result<()> {
    let to = to.trim();
    if to.is_empty() {
      return Err(Error::EmptyField("student name"));
    }
    let class = normalize_class(class);
    let students = self
      .0
      .get_mut(&class)
      .ok_or_else(|| Error::ClassNotFound(class.clone()))?;
    if from != to && students.iter().any(|s| s == to) {
      return Err(Error::DuplicateStudent { class, student: to.to_owned() });
    }
    let slot = students.iter_mut().find(|s| *s == from).ok_or_else(|| {
      Error::StudentNotFound { class: class.clone(), student: from.to_owned() }
    })?;
    *slot = to.to_owned();
    Ok(())
  }

  /// The roster of `class`, sorted by name. Empty for unknown classes.
  pub fn students_sorted(&self, class: &str) -> Vec<String> {
    let mut students = self.students(class).to_vec();
    students.sort();
    students
  }

  pub fn students(&self, class: &str) -> &[String] {
    self.0.get(&normalize_class(class)).map(Vec::as_slice).unwrap_or_default()
  }
}

impl Collection for Roster {
  const KEY: CollectionKey = CollectionKey::Roster;

  fn initial() -> Self { Self::default() }

  fn slot(state: &AppState) -> &Self { &state.roster }

  fn slot_mut(state: &mut AppState) -> &mut Self { &mut state.roster }
}

// ─── Class list ──────────────────────────────────────────────────────────────

/// Known class names, upper-cased and sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassList(pub Vec<String>);

impl ClassList {
  /// Returns `false` when the name is blank or already listed.
  pub fn add(&mut self, class: &str) -> bool {
    let class = normalize_class(class);
    if class.is_empty() || self.0.contains(&class) {
      return false;
    }
    self.0.push(class);
    self.0.sort();
    true
  }

  pub fn remove(&mut self, class: &str) -> bool {
    let before = self.0.len();
    self.0.retain(|c| c != class);
    self.0.len() != before
  }

  pub fn contains(&self, class: &str) -> bool { self.0.iter().any(|c| c == class) }
}

pub fn normalize_class(class: &str) -> String { class.trim().to_uppercase() }

impl Collection for ClassList {
  const KEY: CollectionKey = CollectionKey::Classes;

  fn initial() -> Self { Self::default() }

  fn slot(state: &AppState) -> &Self { &state.classes }

  fn slot_mut(state: &mut AppState) -> &mut Self { &mut state.classes }
}

// ─── Period list ─────────────────────────────────────────────────────────────

/// Lesson period labels such as `"1-2"`, in natural order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodList(pub Vec<String>);

impl Default for PeriodList {
  fn default() -> Self { Self(vec!["1-2".into(), "3-4".into(), "5-6".into()]) }
}

impl PeriodList {
  /// Returns `false` when the label is blank or already listed.
  pub fn add(&mut self, period: &str) -> bool {
    let period = period.trim();
    if period.is_empty() || self.0.iter().any(|p| p == period) {
      return false;
    }
    self.0.push(period.to_owned());
    self.0.sort_by(|a, b| natural_cmp(a, b));
    true
  }

  pub fn remove(&mut self, period: &str) -> bool {
    let before = self.0.len();
    self.0.retain(|p| p != period);
    self.0.len() != before
  }
}

impl Collection for PeriodList {
  const KEY: CollectionKey = CollectionKey::Periods;

  fn initial() -> Self { Self::default() }

  fn slot(state: &AppState) -> &Self { &state.periods }

  fn slot_mut(state: &mut AppState) -> &mut Self { &mut state.periods }
}

/// Compare strings treating runs of ASCII digits as numbers, so that
/// `"9-10"` sorts after `"7-8"`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
  let (mut a, mut b) = (a, b);
  loop {
    match (a.chars().next(), b.chars().next()) {
      (None, None) => return Ordering::Equal,
      (None, Some(_)) => return Ordering::Less,
      (Some(_), None) => return Ordering::Greater,
      (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
        let (num_a, rest_a) = split_digits(a);
        let (num_b, rest_b) = split_digits(b);
        let ord = num_a
          .trim_start_matches('0')
          .len()
          .cmp(&num_b.trim_start_matches('0').len())
          .then_with(|| num_a.trim_start_matches('0').cmp(num_b.trim_start_matches('0')));
        if ord != Ordering::Equal {
          return ord;
        }
        (a, b) = (rest_a, rest_b);
      }
      (Some(x), Some(y)) => {
        let ord = x.to_lowercase().cmp(y.to_lowercase());
        if ord != Ordering::Equal {
          return ord;
        }
        (a, b) = (&a[x.len_utf8()..], &b[y.len_utf8()..]);
      }
    }
  }
}

fn split_digits(s: &str) -> (&str, &str) {
  let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
  s.split_at(end)
}
