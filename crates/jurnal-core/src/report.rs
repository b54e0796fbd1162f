//! Row builders for the monthly and yearly reports.
//!
//! These produce plain data; rendering (tables, documents) is the caller's
//! business. Every builder returns an empty `Vec` when the period has no
//! data, which callers surface as [`NO_DATA`].

use std::collections::BTreeSet;

use crate::{
  attendance::Tally,
  calendar::{format_long, in_month},
  mentoring::Category,
  settings::Settings,
  state::AppState,
};

pub const NO_DATA: &str = "No data for this period.";

/// Identity block printed above every report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportHeader {
  pub school:        String,
  pub teacher:       String,
  pub teacher_nip:   String,
  pub subject:       String,
  pub principal:     String,
  pub principal_nip: String,
}

impl From<&Settings> for ReportHeader {
  fn from(s: &Settings) -> Self {
    Self {
      school:        s.school_name.clone(),
      teacher:       s.teacher_name.clone(),
      teacher_nip:   s.teacher_nip.clone(),
      subject:       s.subject.clone(),
      principal:     s.principal_name.clone(),
      principal_nip: s.principal_nip.clone(),
    }
  }
}

// ─── Journal ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalRow {
  pub number:   usize,
  pub date:     String,
  pub period:   String,
  pub class:    String,
  pub material: String,
  pub activity: String,
}

/// Every journal entry of the month, dates ascending, then by period.
pub fn journal_report(state: &AppState, year: i32, month: u32) -> Vec<JournalRow> {
  let journal = state.journal();
  journal
    .0
    .keys()
    .filter(|date| in_month(**date, year, month))
    .flat_map(|&date| {
      journal
        .entries_on(date)
        .into_iter()
        .map(move |entry| (date, entry))
    })
    .enumerate()
    .map(|(i, (date, entry))| JournalRow {
      number:   i + 1,
      date:     format_long(date),
      period:   entry.period.clone(),
      class:    entry.class.clone(),
      material: entry.material.clone(),
      activity: entry.activity.clone(),
    })
    .collect()
}

// ─── Attendance ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct RecapRow {
  pub class:   String,
  pub student: String,
  pub tally:   Tally,
}

impl RecapRow {
  /// Presence percentage with one decimal, or `-` with no marks.
  pub fn presence(&self) -> String {
    match self.tally.presence_percent() {
      Some(pct) => format!("{pct:.1}%"),
      None => "-".to_owned(),
    }
  }
}

/// Per-student counts for every class with at least one attendance sheet in
/// the month. Classes and students are listed in sorted order; rostered
/// students with no marks still get a row.
pub fn attendance_recap(state: &AppState, year: i32, month: u32) -> Vec<RecapRow> {
  let attendance = state.attendance();
  let classes: BTreeSet<&str> = attendance
    .0
    .iter()
    .filter(|(date, _)| in_month(**date, year, month))
    .flat_map(|(_, sheets)| sheets.keys().map(String::as_str))
    .collect();

  let mut rows = Vec::new();
  for class in classes {
    for student in state.roster().students_sorted(class) {
      let tally = attendance.tally(class, &student, |d| in_month(d, year, month));
      rows.push(RecapRow { class: class.to_owned(), student, tally });
    }
  }
  rows
}

// ─── Mentoring ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentoringRow {
  pub number:    usize,
  pub week:      u32,
  pub student:   String,
  pub class:     String,
  pub category:  Category,
  pub tally:     Tally,
  pub narrative: String,
  pub follow_up: String,
}

/// Mentoring notes of the ISO year, ordered by week.
pub fn mentoring_report(state: &AppState, year: i32) -> Vec<MentoringRow> {
  state
    .mentoring()
    .for_year(year)
    .into_iter()
    .enumerate()
    .map(|(i, note)| MentoringRow {
      number:    i + 1,
      week:      note.week,
      student:   note.student.clone(),
      class:     note.class.clone(),
      category:  note.category,
      tally:     Tally {
        present: note.present,
        sick:    note.sick,
        excused: note.excused,
        absent:  note.absent,
      },
      narrative: note.narrative.clone(),
      follow_up: note.follow_up.clone(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;

  use super::*;
  use crate::{
    attendance::AttendanceStatus,
    calendar::parse_date,
    journal::EntryDraft,
    mentoring::NoteDraft,
  };

  fn state() -> AppState {
    let mut state = AppState::default();
    state.modify(|roster: &mut crate::roster::Roster| {
      for name in ["Citra", "Andi", "Budi"] {
        roster.add_student("X AP 1", name).unwrap();
      }
    });

    state.modify(|journal: &mut crate::journal::JournalByDate| {
      let entry = |id: u64, period: &str| {
        EntryDraft {
          period:   period.into(),
          class:    "X AP 1".into(),
          material: format!("Materi {id}"),
          activity: "Praktik".into(),
        }
        .into_entry(id, "PJOK")
        .unwrap()
      };
      journal.add_entry(parse_date("2025-03-11").unwrap(), entry(1, "3-4"));
      journal.add_entry(parse_date("2025-03-10").unwrap(), entry(2, "5-6"));
      journal.add_entry(parse_date("2025-03-10").unwrap(), entry(3, "1-2"));
      journal.add_entry(parse_date("2025-04-01").unwrap(), entry(4, "1-2"));
    });

    state.modify(|attendance: &mut crate::attendance::AttendanceByDate| {
      let mark = |pairs: &[(&str, AttendanceStatus)]| -> BTreeMap<String, AttendanceStatus> {
        pairs.iter().map(|(n, s)| (n.to_string(), *s)).collect()
      };
      attendance.record(
        parse_date("2025-03-10").unwrap(),
        "X AP 1",
        mark(&[("Andi", AttendanceStatus::Present), ("Budi", AttendanceStatus::Sick)]),
      );
      attendance.record(
        parse_date("2025-03-11").unwrap(),
        "X AP 1",
        mark(&[("Andi", AttendanceStatus::Absent), ("Budi", AttendanceStatus::Present)]),
      );
      attendance.record(
        parse_date("2025-04-01").unwrap(),
        "X AP 1",
        mark(&[("Andi", AttendanceStatus::Present)]),
      );
    });

    state.modify(|notes: &mut crate::mentoring::MentoringRecords| {
      let note = |student: &str| NoteDraft {
        student: student.into(),
        class: "X AP 1".into(),
        category: Category::Character,
        narrative: "Terlambat".into(),
        ..NoteDraft::default()
      };
      notes.save(note("Budi").into_record(1, parse_date("2025-03-20").unwrap()).unwrap());
      notes.save(note("Andi").into_record(2, parse_date("2025-01-08").unwrap()).unwrap());
      notes.save(note("Citra").into_record(3, parse_date("2024-06-03").unwrap()).unwrap());
    });
    state
  }

  #[test]
  fn journal_rows_are_numbered_by_date_then_period() {
    let rows = journal_report(&state(), 2025, 3);
    let got: Vec<_> = rows
      .iter()
      .map(|r| (r.number, r.date.as_str(), r.period.as_str()))
      .collect();
    assert_eq!(got, vec![
      (1, "Senin, 10 Maret 2025", "1-2"),
      (2, "Senin, 10 Maret 2025", "5-6"),
      (3, "Selasa, 11 Maret 2025", "3-4"),
    ]);
    assert!(journal_report(&state(), 2025, 5).is_empty());
  }

  #[test]
  fn recap_counts_only_the_month() {
    let rows = attendance_recap(&state(), 2025, 3);
    let students: Vec<_> = rows.iter().map(|r| r.student.as_str()).collect();
    assert_eq!(students, ["Andi", "Budi", "Citra"]);

    assert_eq!(rows[0].tally, Tally { present: 1, absent: 1, ..Tally::default() });
    assert_eq!(rows[0].presence(), "50.0%");
    assert_eq!(rows[1].tally, Tally { present: 1, sick: 1, ..Tally::default() });
    assert_eq!(rows[2].presence(), "-");

    assert!(attendance_recap(&state(), 2025, 2).is_empty());
  }

  #[test]
  fn mentoring_rows_follow_week_order() {
    let rows = mentoring_report(&state(), 2025);
    let got: Vec<_> = rows
      .iter()
      .map(|r| (r.number, r.week, r.student.as_str()))
      .collect();
    assert_eq!(got, vec![(1, 2, "Andi"), (2, 12, "Budi")]);
    assert_eq!(rows[0].category, Category::Character);
    assert!(mentoring_report(&state(), 2023).is_empty());
  }
}
