//! Error types for `jurnal-core`.

use thiserror::Error;

use crate::sync::{SyncEvent, SyncPhase};

#[derive(Debug, Error)]
pub enum Error {
  #[error("student {student:?} is already on the roster of {class:?}")]
  DuplicateStudent { class: String, student: String },

  #[error("student {student:?} is not on the roster of {class:?}")]
  StudentNotFound { class: String, student: String },

  #[error("class {0:?} has no roster")]
  ClassNotFound(String),

  #[error("{0} must not be empty")]
  EmptyField(&'static str),

  #[error("journal entry {id} not found on {date}")]
  EntryNotFound { date: String, id: u64 },

  #[error("invalid date {0:?}, expected YYYY-MM-DD")]
  InvalidDate(String),

  #[error("unknown attendance code {0:?}")]
  UnknownStatus(String),

  #[error("unknown mentoring category {0:?}")]
  UnknownCategory(String),

  #[error("unknown grade field {0:?}")]
  UnknownGradeField(String),

  #[error("sync is busy ({0})")]
  Busy(SyncPhase),

  #[error("cannot apply {event:?} while {from}")]
  InvalidTransition { from: SyncPhase, event: SyncEvent },

  #[error("malformed snapshot: {0}")]
  MalformedSnapshot(String),

  #[error("remote rejected the request: {0}")]
  RemoteRejected(String),

  #[error("unsupported snapshot schema version {0}")]
  UnsupportedSchemaVersion(u64),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
