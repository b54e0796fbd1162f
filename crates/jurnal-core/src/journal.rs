//! Teaching journal: lesson entries grouped by calendar date.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  collection::{Collection, CollectionKey},
  state::AppState,
};

/// One taught lesson. Fields missing from older records decode as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalEntry {
  pub id:       u64,
  /// Period label, e.g. `"1-2"`.
  #[serde(rename = "jam")]
  pub period:   String,
  #[serde(rename = "kelas")]
  pub class:    String,
  #[serde(rename = "mapel")]
  pub subject:  String,
  #[serde(rename = "materi")]
  pub material: String,
  #[serde(rename = "kegiatan")]
  pub activity: String,
}

/// The form input for a new entry; the id and subject are filled in on save.
#[derive(Debug, Clone, Default)]
pub struct EntryDraft {
  pub period:   String,
  pub class:    String,
  pub material: String,
  pub activity: String,
}

impl EntryDraft {
  /// Complete the draft. Period and class are required.
  pub fn into_entry(self, id: u64, subject: &str) -> Result<JournalEntry> {
    if self.period.trim().is_empty() {
      return Err(Error::EmptyField("period"));
    }
    if self.class.trim().is_empty() {
      return Err(Error::EmptyField("class"));
    }
    Ok(JournalEntry {
      id,
      period: self.period,
      class: self.class,
      subject: subject.to_owned(),
      material: self.material,
      activity: self.activity,
    })
  }
}

/// Lesson entries keyed by date, in entry order per date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JournalByDate(pub BTreeMap<NaiveDate, Vec<JournalEntry>>);

impl JournalByDate {
  pub fn add_entry(&mut self, date: NaiveDate, entry: JournalEntry) {
    self.0.entry(date).or_default().push(entry);
  }

  /// Remove an entry by id; the date disappears once it has no entries.
  pub fn remove_entry(&mut self, date: NaiveDate, id: u64) -> Result<JournalEntry> {
    let not_found = || Error::EntryNotFound { date: date.to_string(), id };
    let entries = self.0.get_mut(&date).ok_or_else(not_found)?;
    let pos = entries.iter().position(|e| e.id == id).ok_or_else(not_found)?;
    let removed = entries.remove(pos);
    if entries.is_empty() {
      self.0.remove(&date);
    }
    Ok(removed)
  }

  /// Entries for `date`, ordered by period label.
  pub fn entries_on(&self, date: NaiveDate) -> Vec<&JournalEntry> {
    let mut entries: Vec<_> = self.0.get(&date).into_iter().flatten().collect();
    entries.sort_by(|a, b| a.period.cmp(&b.period));
    entries
  }

  pub fn len(&self) -> usize { self.0.values().map(Vec::len).sum() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl Collection for JournalByDate {
  const KEY: CollectionKey = CollectionKey::Journal;

  fn initial() -> Self { Self::default() }

  fn slot(state: &AppState) -> &Self { &state.journal }

  fn slot_mut(state: &mut AppState) -> &mut Self { &mut state.journal }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::calendar::parse_date;

  fn draft(period: &str) -> EntryDraft {
    EntryDraft {
      period:   period.into(),
      class:    "X AP 1".into(),
      material: "Intro".into(),
      activity: "Discussion".into(),
    }
  }

  #[test]
  fn entry_serialises_in_wire_shape() {
    let date = parse_date("2025-03-10").unwrap();
    let mut journal = JournalByDate::default();
    journal.add_entry(date, draft("1-2").into_entry(1741564800000, "PJOK").unwrap());
    assert_eq!(
      serde_json::to_string(&journal).unwrap(),
      r#"{"2025-03-10":[{"id":1741564800000,"jam":"1-2","kelas":"X AP 1","mapel":"PJOK","materi":"Intro","kegiatan":"Discussion"}]}"#
    );
  }

  #[test]
  fn older_entries_without_activity_still_decode() {
    let journal: JournalByDate = serde_json::from_str(
      r#"{"2025-03-10":[{"id":1,"jam":"1-2","kelas":"X AP 1","mapel":"PJOK","materi":"Intro"}]}"#,
    )
    .unwrap();
    let entries = journal.entries_on(parse_date("2025-03-10").unwrap());
    let entry = entries[0];
    assert_eq!(entry.material, "Intro");
    assert_eq!(entry.activity, "");
  }

  #[test]
  fn draft_requires_period_and_class() {
    assert!(matches!(
      draft(" ").into_entry(1, "PJOK"),
      Err(Error::EmptyField("period"))
    ));
    let mut d = draft("1-2");
    d.class.clear();
    assert!(matches!(d.into_entry(1, "PJOK"), Err(Error::EmptyField("class"))));
  }

  #[test]
  fn removing_last_entry_drops_the_date() {
    let date = parse_date("2025-03-10").unwrap();
    let mut journal = JournalByDate::default();
    journal.add_entry(date, draft("3-4").into_entry(1, "PJOK").unwrap());
    journal.add_entry(date, draft("1-2").into_entry(2, "PJOK").unwrap());

    let ordered: Vec<_> = journal.entries_on(date).iter().map(|e| e.id).collect();
    assert_eq!(ordered, vec![2, 1]);

    journal.remove_entry(date, 1).unwrap();
    assert_eq!(journal.len(), 1);
    journal.remove_entry(date, 2).unwrap();
    assert!(journal.is_empty());
    assert!(matches!(
      journal.remove_entry(date, 2),
      Err(Error::EntryNotFound { id: 2, .. })
    ));
  }
}
