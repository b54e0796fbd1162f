//! Self-hostable snapshot relay for Jurnal.
//!
//! Speaks the same protocol as the spreadsheet macro the desktop client was
//! built against: `POST` stores a `save_all` envelope, `GET` returns the last
//! stored aggregate in a success envelope, or `{}` when nothing was pushed.
//! Both are served at `/` and `/exec`, and query parameters are ignored.

pub mod error;
pub mod etag;

pub use error::Error;

use std::path::PathBuf;

use axum::{
  Json, Router,
  extract::{DefaultBodyLimit, State},
  http::header,
  response::{IntoResponse, Response},
  routing::get,
};
use bytes::Bytes;
use jurnal_core::snapshot::{PullEnvelope, PushEnvelope};
use jurnal_store_sqlite::SqliteStore;
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use etag::compute_etag;

/// Store key under which the last pushed aggregate is kept.
pub const SNAPSHOT_KEY: &str = "aggregate";

/// Aggregates can carry an embedded profile photo.
const BODY_LIMIT: usize = 16 * 1024 * 1024;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime relay configuration, deserialised from `relay.toml` and
/// `JURNAL_RELAY_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct RelayConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState {
  pub store: SqliteStore,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build an axum [`Router`] for the relay.
pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/",     get(load).post(save))
    .route("/exec", get(load).post(save))
    .layer(DefaultBodyLimit::max(BODY_LIMIT))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Handlers ────────────────────────────────────────────────────────────────

async fn load(State(state): State<AppState>) -> Result<Response, Error> {
  let Some(text) = state.store.get(SNAPSHOT_KEY).await? else {
    return Ok(Json(json!({})).into_response());
  };
  let data: Value = serde_json::from_str(&text)?;
  let tag = compute_etag(&text);
  Ok(([(header::ETAG, tag)], Json(PullEnvelope::success(data))).into_response())
}

/// Accepts a `save_all` envelope, or a bare aggregate object. The body is
/// parsed regardless of its declared content type; clients send
/// `text/plain` to avoid CORS preflight.
async fn save(State(state): State<AppState>, body: Bytes) -> Result<Response, Error> {
  let value: Value =
    serde_json::from_slice(&body).map_err(|e| Error::BadRequest(format!("body is not JSON: {e}")))?;

  let payload = if value.get("action").is_some() {
    let envelope: PushEnvelope = serde_json::from_value(value)
      .map_err(|e| Error::BadRequest(format!("invalid envelope: {e}")))?;
    if envelope.action != PushEnvelope::SAVE_ALL {
      return Err(Error::BadRequest(format!("unknown action {:?}", envelope.action)));
    }
    envelope.payload
  } else {
    value
  };
  if !payload.is_object() {
    return Err(Error::BadRequest("payload must be an object".to_owned()));
  }

  let text = payload.to_string();
  let tag = compute_etag(&text);
  let bytes = text.len();
  state.store.put(SNAPSHOT_KEY, text).await?;
  tracing::info!(bytes, etag = %tag, "snapshot stored");

  Ok(([(header::ETAG, tag)], Json(json!({ "status": PullEnvelope::SUCCESS }))).into_response())
}

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use jurnal_core::snapshot::classify_pull_body;
  use tower::ServiceExt as _;

  async fn make_state() -> AppState {
    AppState { store: SqliteStore::open_in_memory().await.unwrap() }
  }

  async fn oneshot_raw(state: AppState, method: &str, uri: &str, body: &str) -> Response {
    let req = Request::builder()
      .method(method)
      .uri(uri)
      .header(header::CONTENT_TYPE, "text/plain;charset=utf-8")
      .body(Body::from(body.to_string()))
      .unwrap();
    router(state).oneshot(req).await.unwrap()
  }

  async fn body_string(resp: Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
  }

  const ENVELOPE: &str = r#"{"action":"save_all","payload":{"schemaVersion":1,"kelasData":["X AP 1"],"jamData":["1-2"]},"timestamp":"2025-03-10T01:00:00Z"}"#;

  #[tokio::test]
  async fn empty_relay_answers_empty_object() {
    let resp = oneshot_raw(make_state().await, "GET", "/exec?action=load_all&t=1", "").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get(header::ETAG).is_none());
    let body = body_string(resp).await;
    assert_eq!(body, "{}");
    assert!(classify_pull_body(&body).unwrap().is_none());
  }

  #[tokio::test]
  async fn push_then_pull_returns_payload_in_envelope() {
    let state = make_state().await;

    let resp = oneshot_raw(state.clone(), "POST", "/exec", ENVELOPE).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let pushed_tag = resp.headers()[header::ETAG].to_str().unwrap().to_owned();
    assert_eq!(body_string(resp).await, r#"{"status":"success"}"#);

    let resp = oneshot_raw(state, "GET", "/?action=load_all&t=2", "").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::ETAG].to_str().unwrap(), pushed_tag);

    let body: Value = serde_json::from_str(&body_string(resp).await).unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["kelasData"], json!(["X AP 1"]));
    assert_eq!(body["data"]["jamData"], json!(["1-2"]));
  }

  #[tokio::test]
  async fn bare_aggregate_is_accepted() {
    let state = make_state().await;
    let resp = oneshot_raw(state.clone(), "POST", "/", r#"{"siswaData":{"X AP 1":["Andi"]}}"#).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let text = state.store.get(SNAPSHOT_KEY).await.unwrap().unwrap();
    assert_eq!(text, r#"{"siswaData":{"X AP 1":["Andi"]}}"#);
  }

  #[tokio::test]
  async fn later_push_replaces_earlier() {
    let state = make_state().await;
    oneshot_raw(state.clone(), "POST", "/", ENVELOPE).await;
    oneshot_raw(state.clone(), "POST", "/", r#"{"kelasData":["XI AP 2"]}"#).await;

    let body = body_string(oneshot_raw(state, "GET", "/", "").await).await;
    let doc = classify_pull_body(&body).unwrap().unwrap();
    assert_eq!(doc.classes.unwrap().0, vec!["XI AP 2".to_string()]);
    assert!(doc.periods.is_none());
  }

  #[tokio::test]
  async fn non_json_body_is_rejected() {
    let state = make_state().await;
    let resp = oneshot_raw(state.clone(), "POST", "/exec", "<html>nope</html>").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_str(&body_string(resp).await).unwrap();
    assert_eq!(body["status"], "error");

    assert!(state.store.get(SNAPSHOT_KEY).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn unknown_action_is_rejected() {
    let resp = oneshot_raw(
      make_state().await,
      "POST",
      "/exec",
      r#"{"action":"delete_all","payload":{},"timestamp":"2025-03-10T01:00:00Z"}"#,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn non_object_payload_is_rejected() {
    let resp = oneshot_raw(make_state().await, "POST", "/", "[1,2,3]").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }
}
