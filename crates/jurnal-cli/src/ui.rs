//! Plain-text rendering for command output.

use jurnal_core::{report::ReportHeader, sync::Notice};

/// Left-aligned columns separated by two spaces, with a rule under the
/// header. Widths are measured in characters.
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
  let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
  for row in rows {
    for (i, cell) in row.iter().enumerate() {
      if let Some(w) = widths.get_mut(i) {
        *w = (*w).max(cell.chars().count());
      }
    }
  }

  let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
  let mut out = String::new();
  for cells in [headers.iter().map(|h| h.to_string()).collect(), rule].iter().chain(rows) {
    out.push_str(&line(cells, &widths));
    out.push('\n');
  }
  out
}

fn line(cells: &[String], widths: &[usize]) -> String {
  let padded: Vec<String> = cells
    .iter()
    .zip(widths)
    .map(|(cell, &w)| format!("{cell:<w$}"))
    .collect();
  padded.join("  ").trim_end().to_owned()
}

pub fn print_table(headers: &[&str], rows: &[Vec<String>]) { print!("{}", table(headers, rows)); }

/// Identity lines printed above a report. Blank fields are skipped.
pub fn header(h: &ReportHeader) -> String {
  let fields = [
    ("School", &h.school),
    ("Teacher", &h.teacher),
    ("NIP", &h.teacher_nip),
    ("Subject", &h.subject),
    ("Principal", &h.principal),
    ("Principal NIP", &h.principal_nip),
  ];
  fields
    .iter()
    .filter(|(_, v)| !v.is_empty())
    .map(|(k, v)| format!("{k}: {v}\n"))
    .collect()
}

/// Print a sync outcome. Failures go to stderr and become an error exit.
pub fn notice(n: &Notice) -> anyhow::Result<()> {
  if n.is_error() {
    anyhow::bail!("{n}");
  }
  println!("{n}");
  Ok(())
}

/// Report a boot outcome without failing the command that follows.
pub fn boot_notice(n: &Notice) {
  match n {
    Notice::RemoteEmpty => {}
    n if n.is_error() => eprintln!("warning: {n}"),
    n => eprintln!("{n}"),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn columns_align_to_widest_cell() {
    let out = table(&["No", "Kelas"], &[
      vec!["1".into(), "X AP 1".into()],
      vec!["10".into(), "XI".into()],
    ]);
    assert_eq!(out, "No  Kelas\n--  ------\n1   X AP 1\n10  XI\n");
  }

  #[test]
  fn width_counts_characters_not_bytes() {
    let out = table(&["Name"], &[vec!["Zoë".into()]]);
    assert_eq!(out, "Name\n----\nZoë\n");
  }

  #[test]
  fn header_skips_blank_fields() {
    let h = ReportHeader {
      school:        "SMK 1".into(),
      teacher:       "Bu Sari".into(),
      teacher_nip:   String::new(),
      subject:       "PJOK".into(),
      principal:     String::new(),
      principal_nip: String::new(),
    };
    assert_eq!(header(&h), "School: SMK 1\nTeacher: Bu Sari\nSubject: PJOK\n");
  }
}
