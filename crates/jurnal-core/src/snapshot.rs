//! The aggregate document exchanged wholesale with the remote.
//!
//! A snapshot carries every collection plus a timestamp and a schema
//! version. Decoding is tolerant in one direction only: bodies that carry no
//! data (blank text, `{}`, an HTML error page) read as *empty*, while bodies
//! that look like JSON but do not decode are errors.

use std::mem;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
  Error, Result,
  attendance::AttendanceByDate,
  collection::{Collection, CollectionKey, is_blank},
  grades::GradeBook,
  journal::JournalByDate,
  mentoring::MentoringRecords,
  roster::{ClassList, PeriodList, Roster, natural_cmp, normalize_class},
  settings::Settings,
  state::AppState,
};

/// Version written into every pushed snapshot.
pub const SCHEMA_VERSION: u64 = 1;

const VERSION_FIELD: &str = "schemaVersion";

// ─── Aggregate ───────────────────────────────────────────────────────────────

/// All collections at one point in time. `None` marks a collection the
/// remote did not provide (missing or blank); it is left alone on apply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateDocument {
  #[serde(rename = "schemaVersion")]
  pub schema_version: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timestamp:      Option<DateTime<Utc>>,
  #[serde(rename = "pengaturan", skip_serializing_if = "Option::is_none")]
  pub settings:       Option<Settings>,
  #[serde(rename = "jurnalData", skip_serializing_if = "Option::is_none")]
  pub journal:        Option<JournalByDate>,
  #[serde(rename = "absensiData", skip_serializing_if = "Option::is_none")]
  pub attendance:     Option<AttendanceByDate>,
  #[serde(rename = "siswaData", skip_serializing_if = "Option::is_none")]
  pub roster:         Option<Roster>,
  #[serde(rename = "kelasData", skip_serializing_if = "Option::is_none")]
  pub classes:        Option<ClassList>,
  #[serde(rename = "jamData", skip_serializing_if = "Option::is_none")]
  pub periods:        Option<PeriodList>,
  #[serde(rename = "waliData", skip_serializing_if = "Option::is_none")]
  pub mentoring:      Option<MentoringRecords>,
  #[serde(rename = "nilaiData", skip_serializing_if = "Option::is_none")]
  pub grades:         Option<GradeBook>,
}

impl AggregateDocument {
  /// Snapshot every collection of `state`.
  pub fn capture(state: &AppState, at: DateTime<Utc>) -> Self {
    Self {
      schema_version: SCHEMA_VERSION,
      timestamp:      Some(at),
      settings:       Some(state.settings().clone()),
      journal:        Some(state.journal().clone()),
      attendance:     Some(state.attendance().clone()),
      roster:         Some(state.roster().clone()),
      classes:        Some(state.classes().clone()),
      periods:        Some(state.periods().clone()),
      mentoring:      Some(state.mentoring().clone()),
      grades:         Some(state.grades().clone()),
    }
  }

  /// Decode an aggregate object, migrating older schema versions first.
  ///
  /// Returns `Ok(None)` when no collection carries data.
  pub fn from_value(value: Value) -> Result<Option<Self>> {
    let mut map = match value {
      Value::Object(map) => map,
      other => {
        return Err(Error::MalformedSnapshot(format!(
          "expected an object, got {}",
          json_kind(&other)
        )));
      }
    };
    migrate(&mut map)?;

    let timestamp = map
      .remove("timestamp")
      .and_then(|v| serde_json::from_value(v).ok());

    let doc = Self {
      schema_version: SCHEMA_VERSION,
      timestamp,
      settings: take(&mut map)?,
      journal: take(&mut map)?,
      attendance: take(&mut map)?,
      roster: take(&mut map)?,
      classes: take(&mut map)?,
      periods: take(&mut map)?,
      mentoring: take(&mut map)?,
      grades: take(&mut map)?,
    };
    Ok((!doc.is_empty()).then_some(doc))
  }

  /// Keys of the collections this snapshot carries.
  pub fn collections(&self) -> Vec<CollectionKey> {
    let present = [
      (CollectionKey::Settings, self.settings.is_some()),
      (CollectionKey::Journal, self.journal.is_some()),
      (CollectionKey::Attendance, self.attendance.is_some()),
      (CollectionKey::Roster, self.roster.is_some()),
      (CollectionKey::Classes, self.classes.is_some()),
      (CollectionKey::Periods, self.periods.is_some()),
      (CollectionKey::Mentoring, self.mentoring.is_some()),
      (CollectionKey::Grades, self.grades.is_some()),
    ];
    present.into_iter().filter_map(|(k, p)| p.then_some(k)).collect()
  }

  pub fn is_empty(&self) -> bool { self.collections().is_empty() }

  /// Overwrite every slot this snapshot carries, whole-collection. Slots it
  /// omits keep their current value. Returns the keys that were applied.
  pub fn apply_to(self, state: &mut AppState) -> Vec<CollectionKey> {
    let applied = self.collections();
    if let Some(v) = self.settings {
      state.set_settings(v);
    }
    if let Some(v) = self.journal {
      state.set_journal(v);
    }
    if let Some(v) = self.attendance {
      state.set_attendance(v);
    }
    if let Some(v) = self.roster {
      state.set_roster(v);
    }
    if let Some(v) = self.classes {
      state.set_classes(v);
    }
    if let Some(v) = self.periods {
      state.set_periods(v);
    }
    if let Some(v) = self.mentoring {
      state.set_mentoring(v);
    }
    if let Some(v) = self.grades {
      state.set_grades(v);
    }
    applied
  }
}

fn take<C: Collection>(map: &mut Map<String, Value>) -> Result<Option<C>> {
  let field = C::KEY.aggregate_field();
  match map.remove(field) {
    None => Ok(None),
    Some(v) if is_blank(&v) => Ok(None),
    Some(v) => serde_json::from_value(v)
      .map(Some)
      .map_err(|e| Error::MalformedSnapshot(format!("{field}: {e}"))),
  }
}

fn json_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}

// ─── Wire envelopes ──────────────────────────────────────────────────────────

/// Request body of a push.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEnvelope {
  pub action:    String,
  pub payload:   Value,
  pub timestamp: DateTime<Utc>,
}

impl PushEnvelope {
  pub const SAVE_ALL: &'static str = "save_all";

  pub fn save_all(doc: &AggregateDocument, at: DateTime<Utc>) -> Result<Self> {
    Ok(Self {
      action:    Self::SAVE_ALL.to_owned(),
      payload:   serde_json::to_value(doc)?,
      timestamp: at,
    })
  }
}

/// Response body of a pull.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullEnvelope {
  pub status:  String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data:    Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
}

impl PullEnvelope {
  pub const SUCCESS: &'static str = "success";

  pub fn success(data: Value) -> Self {
    Self { status: Self::SUCCESS.to_owned(), data: Some(data), message: None }
  }
}

/// Classify a pull response body.
///
/// - blank text, `null`, `{}`, or a success envelope without data → `Ok(None)`
/// - text that is not JSON and does not look like it (an HTML error page) →
///   `Ok(None)`
/// - a success envelope or bare aggregate with data → `Ok(Some(doc))`
/// - an envelope with any other status → [`Error::RemoteRejected`]
/// - anything else → [`Error::MalformedSnapshot`]
pub fn classify_pull_body(body: &str) -> Result<Option<AggregateDocument>> {
  let trimmed = body.trim();
  if trimmed.is_empty() {
    return Ok(None);
  }

  let value: Value = match serde_json::from_str(trimmed) {
    Ok(value) => value,
    Err(e) if trimmed.starts_with('{') || trimmed.starts_with('[') => {
      return Err(Error::MalformedSnapshot(e.to_string()));
    }
    Err(_) => {
      tracing::debug!("pull body is not JSON; treating as empty");
      return Ok(None);
    }
  };

  match value {
    Value::Null => Ok(None),
    Value::Object(map) if map.is_empty() => Ok(None),
    Value::Object(map) if map.contains_key("status") => {
      let envelope: PullEnvelope = serde_json::from_value(Value::Object(map))
        .map_err(|e| Error::MalformedSnapshot(e.to_string()))?;
      if envelope.status != PullEnvelope::SUCCESS {
        return Err(Error::RemoteRejected(
          envelope.message.unwrap_or(envelope.status),
        ));
      }
      match envelope.data {
        None => Ok(None),
        Some(data) if is_blank(&data) => Ok(None),
        Some(data) => AggregateDocument::from_value(data),
      }
    }
    other => AggregateDocument::from_value(other),
  }
}

// ─── Migrations ──────────────────────────────────────────────────────────────

type Migration = fn(&mut Map<String, Value>);

/// `MIGRATIONS[n]` upgrades a version-`n` document to version `n + 1`.
const MIGRATIONS: [Migration; SCHEMA_VERSION as usize] = [v0_normalize_lists];

fn migrate(map: &mut Map<String, Value>) -> Result<()> {
  let version = match map.get(VERSION_FIELD) {
    None | Some(Value::Null) => 0,
    Some(v) => v.as_u64().ok_or_else(|| {
      Error::MalformedSnapshot(format!("{VERSION_FIELD} must be a non-negative integer"))
    })?,
  };
  if version > SCHEMA_VERSION {
    return Err(Error::UnsupportedSchemaVersion(version));
  }
  for step in &MIGRATIONS[version as usize..] {
    step(map);
  }
  map.insert(VERSION_FIELD.to_owned(), Value::from(SCHEMA_VERSION));
  Ok(())
}

/// Unversioned documents were written by clients that did not normalise
/// list input: upper-case and sort classes, key rosters the same way,
/// naturally sort periods, and drop journal dates with no entries.
fn v0_normalize_lists(map: &mut Map<String, Value>) {
  if let Some(Value::Array(items)) = map.get_mut(CollectionKey::Classes.aggregate_field()) {
    let mut classes: Vec<String> = items
      .iter()
      .filter_map(Value::as_str)
      .map(normalize_class)
      .filter(|c| !c.is_empty())
      .collect();
    classes.sort();
    classes.dedup();
    *items = classes.into_iter().map(Value::from).collect();
  }

  if let Some(Value::Array(items)) = map.get_mut(CollectionKey::Periods.aggregate_field()) {
    let mut periods: Vec<String> = items
      .iter()
      .filter_map(Value::as_str)
      .map(|p| p.trim().to_owned())
      .filter(|p| !p.is_empty())
      .collect();
    periods.sort_by(|a, b| natural_cmp(a, b));
    periods.dedup();
    *items = periods.into_iter().map(Value::from).collect();
  }

  if let Some(Value::Object(rosters)) = map.get_mut(CollectionKey::Roster.aggregate_field()) {
    let mut merged = Map::new();
    for (class, students) in mem::take(rosters) {
      let Value::Array(students) = students else { continue };
      let slot = merged
        .entry(normalize_class(&class))
        .or_insert_with(|| Value::Array(Vec::new()));
      if let Value::Array(all) = slot {
        for student in students {
          if !all.contains(&student) {
            all.push(student);
          }
        }
      }
    }
    *rosters = merged;
  }

  if let Some(Value::Object(days)) = map.get_mut(CollectionKey::Journal.aggregate_field()) {
    days.retain(|_, entries| !is_blank(entries));
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::{calendar::parse_date, journal::EntryDraft, state::Update};

  #[test]
  fn empty_shapes_classify_as_empty() {
    for body in [
      "",
      "   \n",
      "{}",
      "null",
      r#"{"status":"success","data":{}}"#,
      r#"{"status":"success","data":null}"#,
      r#"{"status":"success"}"#,
      "<!DOCTYPE html><html><body>Script function not found</body></html>",
      r#"{"schemaVersion":1,"jurnalData":{},"kelasData":[]}"#,
    ] {
      assert!(classify_pull_body(body).unwrap().is_none(), "{body:?}");
    }
  }

  #[test]
  fn truncated_json_is_an_error() {
    assert!(matches!(
      classify_pull_body(r#"{"status":"success","data":{"#),
      Err(Error::MalformedSnapshot(_))
    ));
    assert!(matches!(classify_pull_body("[1, 2"), Err(Error::MalformedSnapshot(_))));
    assert!(matches!(classify_pull_body("42"), Err(Error::MalformedSnapshot(_))));
  }

  #[test]
  fn mistyped_collection_is_an_error() {
    let body = r#"{"kelasData": "X AP 1"}"#;
    match classify_pull_body(body) {
      Err(Error::MalformedSnapshot(msg)) => assert!(msg.starts_with("kelasData"), "{msg}"),
      other => panic!("unexpected: {other:?}"),
    }
  }

  #[test]
  fn rejected_envelope_carries_message() {
    let body = r#"{"status":"error","message":"sheet locked"}"#;
    match classify_pull_body(body) {
      Err(Error::RemoteRejected(msg)) => assert_eq!(msg, "sheet locked"),
      other => panic!("unexpected: {other:?}"),
    }
  }

  #[test]
  fn envelope_and_bare_aggregate_decode_the_same() {
    let data = json!({ "schemaVersion": 1, "kelasData": ["X AP 1"], "jamData": [] });
    let wrapped = json!({ "status": "success", "data": data }).to_string();
    let a = classify_pull_body(&wrapped).unwrap().unwrap();
    let b = classify_pull_body(&data.to_string()).unwrap().unwrap();
    assert_eq!(a, b);
    assert_eq!(a.collections(), vec![CollectionKey::Classes]);
  }

  #[test]
  fn newer_schema_is_rejected() {
    let body = json!({ "schemaVersion": 99, "kelasData": ["X"] }).to_string();
    assert!(matches!(
      classify_pull_body(&body),
      Err(Error::UnsupportedSchemaVersion(99))
    ));
  }

  #[test]
  fn unversioned_documents_are_normalised() {
    let doc = AggregateDocument::from_value(json!({
      "kelasData": ["xi tkj 2", " X AP 1", "X AP 1", ""],
      "jamData": ["9-10", "1-2", " 7-8 "],
      "siswaData": { "x ap 1": ["Andi"], "X AP 1": ["Budi", "Andi"] },
      "jurnalData": { "2025-03-10": [], "2025-03-11": [
        { "id": 1, "jam": "1-2", "kelas": "X AP 1", "mapel": "PJOK", "materi": "", "kegiatan": "" }
      ] }
    }))
    .unwrap()
    .unwrap();

    assert_eq!(doc.classes.unwrap().0, vec!["X AP 1", "XI TKJ 2"]);
    assert_eq!(doc.periods.unwrap().0, vec!["1-2", "7-8", "9-10"]);
    assert_eq!(doc.roster.unwrap().students("X AP 1"), ["Budi", "Andi"]);
    let journal = doc.journal.unwrap();
    assert_eq!(journal.0.len(), 1);
    assert!(journal.0.contains_key(&parse_date("2025-03-11").unwrap()));
  }

  #[test]
  fn apply_overwrites_present_collections_only() {
    let mut state = AppState::default();
    state.set_classes(ClassList(vec!["LOCAL".into()]));
    state.set_roster(Update::with(|mut r: Roster| {
      r.add_student("LOCAL", "Andi").unwrap();
      r
    }));
    let roster_before = state.roster().clone();

    let remote = classify_pull_body(
      &json!({ "kelasData": ["REMOTE"], "siswaData": {} }).to_string(),
    )
    .unwrap()
    .unwrap();
    let applied = remote.apply_to(&mut state);

    assert_eq!(applied, vec![CollectionKey::Classes]);
    assert_eq!(state.classes().0, vec!["REMOTE"]);
    assert_eq!(state.roster(), &roster_before);
  }

  #[test]
  fn capture_serialises_every_collection() {
    let mut state = AppState::default();
    let date = parse_date("2025-03-10").unwrap();
    state.set_journal(Update::with(move |mut j: JournalByDate| {
      let draft = EntryDraft {
        period: "1-2".into(),
        class: "X AP 1".into(),
        ..EntryDraft::default()
      };
      j.add_entry(date, draft.into_entry(1, "PJOK").unwrap());
      j
    }));
    let at = DateTime::parse_from_rfc3339("2025-03-10T08:00:00Z").unwrap().with_timezone(&Utc);
    let value = serde_json::to_value(AggregateDocument::capture(&state, at)).unwrap();

    assert_eq!(value["schemaVersion"], json!(1));
    assert_eq!(value["timestamp"], json!("2025-03-10T08:00:00Z"));
    for key in CollectionKey::ALL {
      assert!(value.get(key.aggregate_field()).is_some(), "{key}");
    }
  }

  #[test]
  fn push_envelope_shape() {
    let at = Utc::now();
    let doc = AggregateDocument::capture(&AppState::default(), at);
    let envelope = PushEnvelope::save_all(&doc, at).unwrap();
    let value = serde_json::to_value(&envelope).unwrap();
    assert_eq!(value["action"], json!("save_all"));
    assert_eq!(value["payload"]["jamData"], json!(["1-2", "3-4", "5-6"]));
  }
}
