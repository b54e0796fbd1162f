//! Command dispatch on top of the sync controller.

use anyhow::{Context, Result, anyhow};
use chrono::{Datelike, Local as LocalTime};
use jurnal_core::{
  attendance::{AttendanceByDate, AttendanceStatus},
  calendar::{format_short, parse_date},
  grades::{GradeBook, GradeField, SCORE_COLUMNS},
  journal::{EntryDraft, JournalByDate},
  mentoring::{Category, MentoringRecords, NoteDraft},
  report::{self, NO_DATA, ReportHeader},
  roster::{ClassList, PeriodList, Roster},
  settings::Settings,
  sync::SyncController,
};

use crate::{
  AttendanceCmd, Command, GradesCmd, JournalCmd, ListCmd, MentoringCmd, ReportCmd, RosterCmd,
  SettingsCmd,
  client::{Local, Remote},
  ui,
};

pub struct App {
  ctrl:     SyncController<Local, Remote>,
  /// Where the local cache lives, for `status`.
  location: String,
}

impl App {
  pub fn new(ctrl: SyncController<Local, Remote>, location: String) -> Self { Self { ctrl, location } }

  /// Boot the controller, then run `command`.
  pub async fn run(&self, command: Command) -> Result<()> {
    let boot = self.ctrl.boot().await?;
    match command {
      Command::Pull => ui::notice(&boot),
      Command::Push => {
        ui::boot_notice(&boot);
        ui::notice(&self.ctrl.push().await?)
      }
      Command::Status => {
        ui::boot_notice(&boot);
        self.status().await
      }
      Command::Settings(cmd) => {
        ui::boot_notice(&boot);
        self.settings(cmd).await
      }
      Command::Classes(cmd) => {
        ui::boot_notice(&boot);
        self.classes(cmd).await
      }
      Command::Periods(cmd) => {
        ui::boot_notice(&boot);
        self.periods(cmd).await
      }
      Command::Roster(cmd) => {
        ui::boot_notice(&boot);
        self.roster(cmd).await
      }
      Command::Journal(cmd) => {
        ui::boot_notice(&boot);
        self.journal(cmd).await
      }
      Command::Attendance(cmd) => {
        ui::boot_notice(&boot);
        self.attendance(cmd).await
      }
      Command::Mentoring(cmd) => {
        ui::boot_notice(&boot);
        self.mentoring(cmd).await
      }
      Command::Grades(cmd) => {
        ui::boot_notice(&boot);
        self.grades(cmd).await
      }
      Command::Report(cmd) => {
        ui::boot_notice(&boot);
        self.report(cmd);
        Ok(())
      }
    }
  }

  // ── Status ────────────────────────────────────────────────────────────────

  async fn status(&self) -> Result<()> {
    let state = self.ctrl.snapshot();
    println!("Store:  {}", self.location);
    println!("Remote: {}", self.ctrl.remote().describe());
    println!();

    let students: usize = state.roster().0.values().map(Vec::len).sum();
    ui::print_table(&["Collection", "Items"], &[
      vec!["classes".into(), state.classes().0.len().to_string()],
      vec!["periods".into(), state.periods().0.len().to_string()],
      vec!["students".into(), students.to_string()],
      vec!["journal entries".into(), state.journal().len().to_string()],
      vec!["attendance days".into(), state.attendance().0.len().to_string()],
      vec!["mentoring notes".into(), state.mentoring().0.len().to_string()],
      vec!["graded classes".into(), state.grades().0.len().to_string()],
    ]);

    if let Local::Sqlite(store) = self.ctrl.local() {
      let rows: Vec<Vec<String>> = store
        .entries()
        .await?
        .into_iter()
        .map(|e| vec![e.key, e.bytes.to_string(), e.updated_at.to_rfc3339()])
        .collect();
      println!();
      ui::print_table(&["Key", "Bytes", "Updated"], &rows);
    }
    Ok(())
  }

  // ── Settings ──────────────────────────────────────────────────────────────

  async fn settings(&self, cmd: SettingsCmd) -> Result<()> {
    match cmd {
      SettingsCmd::Show => {
        let s = self.ctrl.read(|s: &Settings| s.clone());
        let mentees: Vec<String> = s
          .mentored_students
          .iter()
          .map(|m| format!("{} ({})", m.name, m.class))
          .collect();
        ui::print_table(&["Field", "Value"], &[
          vec!["name".into(), s.teacher_name],
          vec!["nip".into(), s.teacher_nip],
          vec!["position".into(), s.teacher_position],
          vec!["subject".into(), s.subject],
          vec!["homeroom".into(), s.homeroom_classes.join(", ")],
          vec!["mentees".into(), mentees.join(", ")],
          vec!["school".into(), s.school_name],
          vec!["principal".into(), s.principal_name],
          vec!["principal nip".into(), s.principal_nip],
          vec!["principal position".into(), s.principal_position],
        ]);
      }
      SettingsCmd::Set {
        name,
        nip,
        position,
        subject,
        school,
        principal,
        principal_nip,
        principal_position,
      } => {
        let changed = self
          .ctrl
          .set::<Settings>(jurnal_core::state::Update::with(move |mut s: Settings| {
            let fields = [
              (&mut s.teacher_name, name),
              (&mut s.teacher_nip, nip),
              (&mut s.teacher_position, position),
              (&mut s.subject, subject),
              (&mut s.school_name, school),
              (&mut s.principal_name, principal),
              (&mut s.principal_nip, principal_nip),
              (&mut s.principal_position, principal_position),
            ];
            for (slot, value) in fields {
              if let Some(v) = value {
                *slot = v.trim().to_owned();
              }
            }
            s
          }))
          .await;
        println!("{}", if changed { "Settings saved." } else { "Nothing changed." });
      }
      SettingsCmd::AddHomeroom { class } => {
        let added = self.ctrl.modify(|s: &mut Settings| s.add_homeroom_class(&class)).await;
        report_added(added, &class);
      }
      SettingsCmd::RemoveHomeroom { class } => {
        let removed = self.ctrl.modify(|s: &mut Settings| s.remove_homeroom_class(&class)).await;
        report_removed(removed, &class);
      }
      SettingsCmd::AddMentee { name, class } => {
        let added = self
          .ctrl
          .modify(|s: &mut Settings| s.add_mentored_student(&name, &class))
          .await?;
        report_added(added, &name);
      }
      SettingsCmd::RemoveMentee { name, class } => {
        let removed = self
          .ctrl
          .modify(|s: &mut Settings| s.remove_mentored_student(&name, &class))
          .await;
        report_removed(removed, &name);
      }
    }
    Ok(())
  }

  // ── Classes & periods ─────────────────────────────────────────────────────

  async fn classes(&self, cmd: ListCmd) -> Result<()> {
    match cmd {
      ListCmd::List => self.ctrl.read(|c: &ClassList| c.0.iter().for_each(|c| println!("{c}"))),
      ListCmd::Add { value } => {
        let added = self.ctrl.modify(|c: &mut ClassList| c.add(&value)).await;
        report_added(added, &value);
      }
      ListCmd::Remove { value } => {
        let removed = self.ctrl.modify(|c: &mut ClassList| c.remove(&value)).await;
        report_removed(removed, &value);
      }
    }
    Ok(())
  }

  async fn periods(&self, cmd: ListCmd) -> Result<()> {
    match cmd {
      ListCmd::List => self.ctrl.read(|p: &PeriodList| p.0.iter().for_each(|p| println!("{p}"))),
      ListCmd::Add { value } => {
        let added = self.ctrl.modify(|p: &mut PeriodList| p.add(&value)).await;
        report_added(added, &value);
      }
      ListCmd::Remove { value } => {
        let removed = self.ctrl.modify(|p: &mut PeriodList| p.remove(&value)).await;
        report_removed(removed, &value);
      }
    }
    Ok(())
  }

  // ── Roster ────────────────────────────────────────────────────────────────

  async fn roster(&self, cmd: RosterCmd) -> Result<()> {
    match cmd {
      RosterCmd::List { class: Some(class) } => {
        let students = self.ctrl.read(|r: &Roster| r.students_sorted(&class));
        let rows: Vec<Vec<String>> = students
          .into_iter()
          .enumerate()
          .map(|(i, s)| vec![(i + 1).to_string(), s])
          .collect();
        ui::print_table(&["No", "Student"], &rows);
      }
      RosterCmd::List { class: None } => {
        let rows: Vec<Vec<String>> = self.ctrl.read(|r: &Roster| {
          r.0
            .iter()
            .map(|(class, students)| vec![class.clone(), students.len().to_string()])
            .collect()
        });
        ui::print_table(&["Class", "Students"], &rows);
      }
      RosterCmd::Add { class, students } => {
        // All or nothing: a duplicate leaves the roster untouched.
        self
          .ctrl
          .modify(|r: &mut Roster| {
            let mut next = r.clone();
            for student in &students {
              next.add_student(&class, student)?;
            }
            *r = next;
            Ok::<_, jurnal_core::Error>(())
          })
          .await?;
        println!("Added {} student(s) to {class}.", students.len());
      }
      RosterCmd::Remove { class, student } => {
        self
          .ctrl
          .modify(|r: &mut Roster| r.remove_student(&class, &student))
          .await?;
        println!("Removed {student} from {class}.");
      }
      RosterCmd::Rename { class, from, to } => {
        self
          .ctrl
          .modify(|r: &mut Roster| r.rename_student(&class, &from, &to))
          .await?;
        println!("Renamed {from} to {to} in {class}.");
      }
    }
    Ok(())
  }

  // ── Journal ───────────────────────────────────────────────────────────────

  async fn journal(&self, cmd: JournalCmd) -> Result<()> {
    match cmd {
      JournalCmd::List { date } => {
        let date = date.as_deref().map(parse_date).transpose()?;
        let rows: Vec<Vec<String>> = self.ctrl.read(|j: &JournalByDate| {
          j.0
            .keys()
            .filter(|d| date.is_none_or(|only| only == **d))
            .flat_map(|&d| {
              j.entries_on(d).into_iter().map(move |e| {
                vec![
                  e.id.to_string(),
                  format_short(d),
                  e.period.clone(),
                  e.class.clone(),
                  e.material.clone(),
                  e.activity.clone(),
                ]
              })
            })
            .collect()
        });
        if rows.is_empty() {
          println!("No journal entries.");
        } else {
          ui::print_table(&["Id", "Date", "Period", "Class", "Material", "Activity"], &rows);
        }
      }
      JournalCmd::Add { date, period, class, material, activity } => {
        let date = parse_date(&date)?;
        let subject = self.ctrl.read(|s: &Settings| s.subject.clone());
        let entry = EntryDraft { period, class, material, activity }
          .into_entry(self.ctrl.next_id(), &subject)?;
        let id = entry.id;
        self
          .ctrl
          .modify(|j: &mut JournalByDate| j.add_entry(date, entry))
          .await;
        println!("Added journal entry {id}.");
      }
      JournalCmd::Remove { date, id } => {
        let date = parse_date(&date)?;
        self
          .ctrl
          .modify(|j: &mut JournalByDate| j.remove_entry(date, id))
          .await?;
        println!("Removed journal entry {id}.");
      }
    }
    Ok(())
  }

  // ── Attendance ────────────────────────────────────────────────────────────

  async fn attendance(&self, cmd: AttendanceCmd) -> Result<()> {
    match cmd {
      AttendanceCmd::Show { date, class } => {
        let date = parse_date(&date)?;
        let roster = self.ctrl.read(|r: &Roster| r.students_sorted(&class));
        if roster.is_empty() {
          return Err(jurnal_core::Error::ClassNotFound(class).into());
        }
        let sheet = self.ctrl.read(|a: &AttendanceByDate| a.sheet_for(date, &class, &roster));
        let rows: Vec<Vec<String>> = sheet
          .into_iter()
          .map(|(student, status)| vec![student, status.code().to_owned()])
          .collect();
        ui::print_table(&["Student", "Status"], &rows);
      }
      AttendanceCmd::Mark { date, class, marks } => {
        let date = parse_date(&date)?;
        let roster = self.ctrl.read(|r: &Roster| r.students_sorted(&class));
        if roster.is_empty() {
          return Err(jurnal_core::Error::ClassNotFound(class).into());
        }
        let mut sheet = self.ctrl.read(|a: &AttendanceByDate| a.sheet_for(date, &class, &roster));
        for mark in &marks {
          let (student, code) = mark
            .split_once('=')
            .ok_or_else(|| anyhow!("expected NAME=CODE, got {mark:?}"))?;
          let status: AttendanceStatus = code.parse()?;
          let slot = sheet.get_mut(student.trim()).ok_or_else(|| {
            jurnal_core::Error::StudentNotFound {
              class:   class.clone(),
              student: student.trim().to_owned(),
            }
          })?;
          *slot = status;
        }
        let absent = sheet.values().filter(|s| **s != AttendanceStatus::Present).count();
        self
          .ctrl
          .modify(|a: &mut AttendanceByDate| a.record(date, &class, sheet))
          .await;
        println!("Recorded attendance for {class} on {}: {absent} not present.", format_short(date));
      }
    }
    Ok(())
  }

  // ── Mentoring ─────────────────────────────────────────────────────────────

  async fn mentoring(&self, cmd: MentoringCmd) -> Result<()> {
    match cmd {
      MentoringCmd::List { year } => {
        let year = year.unwrap_or_else(|| LocalTime::now().year());
        let rows: Vec<Vec<String>> = self.ctrl.read(|m: &MentoringRecords| {
          m.for_year(year)
            .into_iter()
            .map(|r| {
              vec![
                r.id.to_string(),
                r.week.to_string(),
                r.student.clone(),
                r.class.clone(),
                r.category.to_string(),
                r.narrative.clone(),
              ]
            })
            .collect()
        });
        if rows.is_empty() {
          println!("No mentoring notes in {year}.");
        } else {
          ui::print_table(&["Id", "Week", "Student", "Class", "Category", "Narrative"], &rows);
        }
      }
      MentoringCmd::Save {
        date,
        student,
        class,
        category,
        present,
        sick,
        excused,
        absent,
        narrative,
        follow_up,
      } => {
        let date = parse_date(&date)?;
        let category: Category = category.parse()?;
        let record = NoteDraft {
          student,
          class,
          category,
          present,
          sick,
          excused,
          absent,
          narrative,
          follow_up,
        }
        .into_record(self.ctrl.next_id(), date)?;
        let (id, week) = (record.id, record.week);
        let replaced = self
          .ctrl
          .modify(|m: &mut MentoringRecords| m.save(record))
          .await;
        match replaced {
          Some(old) => println!("Saved note {id} for week {week}, replacing note {}.", old.id),
          None => println!("Saved note {id} for week {week}."),
        }
      }
      MentoringCmd::Remove { id } => {
        let removed = self.ctrl.modify(|m: &mut MentoringRecords| m.remove(id)).await;
        removed.with_context(|| format!("no mentoring note with id {id}"))?;
        println!("Removed note {id}.");
      }
    }
    Ok(())
  }

  // ── Grades ────────────────────────────────────────────────────────────────

  async fn grades(&self, cmd: GradesCmd) -> Result<()> {
    match cmd {
      GradesCmd::Show { class } => {
        let roster = self.ctrl.read(|r: &Roster| r.students_sorted(&class));
        let sheet = self.ctrl.read(|g: &GradeBook| g.sheet_for(&class, &roster));
        let rows: Vec<Vec<String>> = sheet
          .into_iter()
          .map(|(student, record)| {
            let mut row = vec![student];
            row.extend(record.scores().iter().map(|s| s.to_string()));
            row.push(record.final_score);
            row
          })
          .collect();
        let mut headers = vec!["Student"];
        headers.extend(SCORE_COLUMNS);
        headers.push("nilRap");
        ui::print_table(&headers, &rows);
      }
      GradesCmd::Set { class, student, field, value } => {
        let field: GradeField = field.parse()?;
        let on_roster = self
          .ctrl
          .read(|r: &Roster| r.students(&class).iter().any(|s| *s == student));
        if !on_roster {
          return Err(jurnal_core::Error::StudentNotFound { class, student }.into());
        }
        let final_score = self
          .ctrl
          .modify(|g: &mut GradeBook| g.set_score(&class, &student, field, &value).final_score.clone())
          .await;
        println!("{student}: report score {}", if final_score.is_empty() { "-" } else { final_score.as_str() });
      }
    }
    Ok(())
  }

  // ── Reports ───────────────────────────────────────────────────────────────

  fn report(&self, cmd: ReportCmd) {
    let state = self.ctrl.snapshot();
    let (title, headers, rows): (String, Vec<&str>, Vec<Vec<String>>) = match cmd {
      ReportCmd::Journal { year, month } => (
        format!("Teaching journal {month:02}/{year}"),
        vec!["No", "Date", "Period", "Class", "Material", "Activity"],
        report::journal_report(&state, year, month)
          .into_iter()
          .map(|r| vec![r.number.to_string(), r.date, r.period, r.class, r.material, r.activity])
          .collect(),
      ),
      ReportCmd::Attendance { year, month } => (
        format!("Attendance recap {month:02}/{year}"),
        vec!["Class", "Student", "H", "S", "I", "A", "Presence"],
        report::attendance_recap(&state, year, month)
          .into_iter()
          .map(|r| {
            let presence = r.presence();
            vec![
              r.class,
              r.student,
              r.tally.present.to_string(),
              r.tally.sick.to_string(),
              r.tally.excused.to_string(),
              r.tally.absent.to_string(),
              presence,
            ]
          })
          .collect(),
      ),
      ReportCmd::Mentoring { year } => (
        format!("Mentoring notes {year}"),
        vec!["No", "Week", "Student", "Class", "Category", "H/S/I/A", "Narrative", "Follow-up"],
        report::mentoring_report(&state, year)
          .into_iter()
          .map(|r| {
            vec![
              r.number.to_string(),
              r.week.to_string(),
              r.student,
              r.class,
              r.category.to_string(),
              format!("{}/{}/{}/{}", r.tally.present, r.tally.sick, r.tally.excused, r.tally.absent),
              r.narrative,
              r.follow_up,
            ]
          })
          .collect(),
      ),
    };

    print!("{}", ui::header(&ReportHeader::from(state.settings())));
    println!("{title}");
    println!();
    if rows.is_empty() {
      println!("{NO_DATA}");
    } else {
      ui::print_table(&headers, &rows);
    }
  }
}

fn report_added(added: bool, what: &str) {
  if added {
    println!("Added {what}.");
  } else {
    println!("{what} is already present (or empty); nothing changed.");
  }
}

fn report_removed(removed: bool, what: &str) {
  if removed {
    println!("Removed {what}.");
  } else {
    println!("{what} was not found; nothing changed.");
  }
}
