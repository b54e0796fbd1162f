//! Error types and axum `IntoResponse` implementation.
//!
//! Failures are reported in the same envelope shape as successful pulls, so
//! clients can surface `message` directly.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use jurnal_core::snapshot::PullEnvelope;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("bad request: {0}")]
  BadRequest(String),
  #[error("store error: {0}")]
  Store(#[from] jurnal_store_sqlite::Error),
  #[error("stored snapshot is corrupt: {0}")]
  Corrupt(#[from] serde_json::Error),
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = match self {
      Error::BadRequest(_) => StatusCode::BAD_REQUEST,
      Error::Store(_) | Error::Corrupt(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }
    let body = PullEnvelope {
      status:  "error".to_owned(),
      data:    None,
      message: Some(self.to_string()),
    };
    (status, Json(body)).into_response()
  }
}
