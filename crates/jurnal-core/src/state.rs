//! [`AppState`]: the in-memory owner of all eight collections.
//!
//! Collections are independent slots. Callers read through getters and
//! write through setters that take either a replacement value or a function
//! of the old value ([`Update`]). Nothing here touches storage; mirroring is
//! the sync controller's job.

use crate::{
  Result,
  attendance::AttendanceByDate,
  collection::{Collection, CollectionKey},
  grades::GradeBook,
  journal::JournalByDate,
  mentoring::MentoringRecords,
  roster::{ClassList, PeriodList, Roster},
  settings::Settings,
};

/// A setter argument: a new value, or a function from the old value to the
/// new one.
pub enum Update<C> {
  Replace(C),
  Apply(Box<dyn FnOnce(C) -> C + Send>),
}

impl<C> Update<C> {
  pub fn with(f: impl FnOnce(C) -> C + Send + 'static) -> Self { Self::Apply(Box::new(f)) }
}

impl<C: Collection> From<C> for Update<C> {
  fn from(value: C) -> Self { Self::Replace(value) }
}

/// All application data held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
  pub(crate) settings:   Settings,
  pub(crate) journal:    JournalByDate,
  pub(crate) attendance: AttendanceByDate,
  pub(crate) roster:     Roster,
  pub(crate) classes:    ClassList,
  pub(crate) periods:    PeriodList,
  pub(crate) mentoring:  MentoringRecords,
  pub(crate) grades:     GradeBook,
}

impl Default for AppState {
  fn default() -> Self {
    Self {
      settings:   Settings::initial(),
      journal:    JournalByDate::initial(),
      attendance: AttendanceByDate::initial(),
      roster:     Roster::initial(),
      classes:    ClassList::initial(),
      periods:    PeriodList::initial(),
      mentoring:  MentoringRecords::initial(),
      grades:     GradeBook::initial(),
    }
  }
}

impl AppState {
  // ── Generic access ────────────────────────────────────────────────────

  pub fn get<C: Collection>(&self) -> &C { C::slot(self) }

  /// Apply `update` to the slot for `C`. Returns whether the value changed.
  pub fn set<C: Collection>(&mut self, update: impl Into<Update<C>>) -> bool {
    let next = match update.into() {
      Update::Replace(value) => value,
      Update::Apply(f) => f(C::slot(self).clone()),
    };
    let slot = C::slot_mut(self);
    if *slot == next {
      return false;
    }
    *slot = next;
    true
  }

  /// Run `f` against the slot for `C` in place. Returns `f`'s result and
  /// whether the value changed.
  pub fn modify<C: Collection, T>(&mut self, f: impl FnOnce(&mut C) -> T) -> (T, bool) {
    let before = C::slot(self).clone();
    let slot = C::slot_mut(self);
    let out = f(slot);
    let changed = *slot != before;
    (out, changed)
  }

  /// Serialise one slot to the JSON text stored under its local key.
  pub fn slot_json(&self, key: CollectionKey) -> Result<String> {
    let json = match key {
      CollectionKey::Settings => serde_json::to_string(&self.settings)?,
      CollectionKey::Journal => serde_json::to_string(&self.journal)?,
      CollectionKey::Attendance => serde_json::to_string(&self.attendance)?,
      CollectionKey::Roster => serde_json::to_string(&self.roster)?,
      CollectionKey::Classes => serde_json::to_string(&self.classes)?,
      CollectionKey::Periods => serde_json::to_string(&self.periods)?,
      CollectionKey::Mentoring => serde_json::to_string(&self.mentoring)?,
      CollectionKey::Grades => serde_json::to_string(&self.grades)?,
    };
    Ok(json)
  }

  // ── Named getter/setter pairs ─────────────────────────────────────────

  pub fn settings(&self) -> &Settings { &self.settings }

  pub fn set_settings(&mut self, update: impl Into<Update<Settings>>) -> bool {
    self.set::<Settings>(update)
  }

  pub fn journal(&self) -> &JournalByDate { &self.journal }

  pub fn set_journal(&mut self, update: impl Into<Update<JournalByDate>>) -> bool {
    self.set::<JournalByDate>(update)
  }

  pub fn attendance(&self) -> &AttendanceByDate { &self.attendance }

  pub fn set_attendance(&mut self, update: impl Into<Update<AttendanceByDate>>) -> bool {
    self.set::<AttendanceByDate>(update)
  }

  pub fn roster(&self) -> &Roster { &self.roster }

  pub fn set_roster(&mut self, update: impl Into<Update<Roster>>) -> bool {
    self.set::<Roster>(update)
  }

  pub fn classes(&self) -> &ClassList { &self.classes }

  pub fn set_classes(&mut self, update: impl Into<Update<ClassList>>) -> bool {
    self.set::<ClassList>(update)
  }

  pub fn periods(&self) -> &PeriodList { &self.periods }

  pub fn set_periods(&mut self, update: impl Into<Update<PeriodList>>) -> bool {
    self.set::<PeriodList>(update)
  }

  pub fn mentoring(&self) -> &MentoringRecords { &self.mentoring }

  pub fn set_mentoring(&mut self, update: impl Into<Update<MentoringRecords>>) -> bool {
    self.set::<MentoringRecords>(update)
  }

  pub fn grades(&self) -> &GradeBook { &self.grades }

  pub fn set_grades(&mut self, update: impl Into<Update<GradeBook>>) -> bool {
    self.set::<GradeBook>(update)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_per_collection() {
    let state = AppState::default();
    assert_eq!(state.periods().0, vec!["1-2", "3-4", "5-6"]);
    assert!(state.journal().is_empty());
    assert_eq!(state.slot_json(CollectionKey::Journal).unwrap(), "{}");
    assert_eq!(state.slot_json(CollectionKey::Classes).unwrap(), "[]");
  }

  #[test]
  fn replace_and_functional_update() {
    let mut state = AppState::default();
    assert!(state.set_classes(ClassList(vec!["X AP 1".into()])));
    assert!(!state.set_classes(ClassList(vec!["X AP 1".into()])));

    let changed = state.set_classes(Update::with(|mut classes: ClassList| {
      classes.add("X AP 2");
      classes
    }));
    assert!(changed);
    assert_eq!(state.classes().0, vec!["X AP 1", "X AP 2"]);
  }

  #[test]
  fn modify_reports_change_and_result() {
    let mut state = AppState::default();
    let (added, changed) = state.modify(|periods: &mut PeriodList| periods.add("7-8"));
    assert!(added && changed);
    let (added, changed) = state.modify(|periods: &mut PeriodList| periods.add("7-8"));
    assert!(!added && !changed);
  }
}
