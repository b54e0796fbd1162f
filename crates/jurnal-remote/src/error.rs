//! Error type for `jurnal-remote`.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("failed to build HTTP client: {0}")]
  Client(#[source] reqwest::Error),

  #[error("request failed: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("remote answered {0}")]
  Status(StatusCode),

  #[error(transparent)]
  Snapshot(#[from] jurnal_core::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
