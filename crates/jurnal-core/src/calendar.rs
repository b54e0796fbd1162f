//! Date helpers: parsing form input, ISO weeks, and Indonesian display
//! formats used in reports.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::{Error, Result};

/// Parse a `YYYY-MM-DD` date as typed into a form or used as a map key.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
    .map_err(|_| Error::InvalidDate(s.to_owned()))
}

/// The ISO-8601 week-numbering year and week of `date`.
///
/// Late-December dates can belong to week 1 of the following year and
/// early-January dates to week 52/53 of the previous one.
pub fn iso_week(date: NaiveDate) -> (i32, u32) {
  let week = date.iso_week();
  (week.year(), week.week())
}

/// `dd/mm/yyyy`.
pub fn format_short(date: NaiveDate) -> String { date.format("%d/%m/%Y").to_string() }

/// Long Indonesian form, e.g. `Senin, 10 Maret 2025`.
pub fn format_long(date: NaiveDate) -> String {
  format!(
    "{}, {} {} {}",
    weekday_name(date.weekday()),
    date.day(),
    month_name(date.month()),
    date.year()
  )
}

/// Whether `date` falls in the given calendar month.
pub fn in_month(date: NaiveDate, year: i32, month: u32) -> bool {
  date.year() == year && date.month() == month
}

fn weekday_name(day: Weekday) -> &'static str {
  match day {
    Weekday::Mon => "Senin",
    Weekday::Tue => "Selasa",
    Weekday::Wed => "Rabu",
    Weekday::Thu => "Kamis",
    Weekday::Fri => "Jumat",
    Weekday::Sat => "Sabtu",
    Weekday::Sun => "Minggu",
  }
}

fn month_name(month: u32) -> &'static str {
  const NAMES: [&str; 12] = [
    "Januari", "Februari", "Maret", "April", "Mei", "Juni", "Juli", "Agustus",
    "September", "Oktober", "November", "Desember",
  ];
  NAMES
    .get(month.saturating_sub(1) as usize)
    .copied()
    .unwrap_or("")
}
