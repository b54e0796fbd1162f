//! [`HttpSnapshotClient`]: the reqwest implementation of [`SnapshotRemote`].

use std::time::Duration;

use chrono::Utc;
use reqwest::{
  Client,
  header::{CONTENT_TYPE, ETAG},
};

use jurnal_core::{
  remote::{Acknowledged, SnapshotRemote},
  snapshot::{AggregateDocument, PushEnvelope, classify_pull_body},
};

use crate::{Error, Result};

/// The macro endpoint reads the raw body; `text/plain` keeps browsers and
/// proxies from requiring a CORS preflight.
const PUSH_CONTENT_TYPE: &str = "text/plain;charset=utf-8";

/// Connection settings for the snapshot endpoint.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
  pub endpoint: String,
  pub timeout:  Duration,
}

impl RemoteConfig {
  pub fn new(endpoint: impl Into<String>) -> Self {
    Self { endpoint: endpoint.into(), timeout: Duration::from_secs(30) }
  }
}

/// Async HTTP client for one snapshot endpoint.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based. Redirects
/// are followed, since script hosts answer from a different origin.
#[derive(Clone)]
pub struct HttpSnapshotClient {
  client: Client,
  config: RemoteConfig,
}

impl HttpSnapshotClient {
  pub fn new(config: RemoteConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(config.timeout)
      .build()
      .map_err(Error::Client)?;
    Ok(Self { client, config })
  }

  pub fn endpoint(&self) -> &str { &self.config.endpoint }
}

impl SnapshotRemote for HttpSnapshotClient {
  type Error = Error;

  /// `POST <endpoint>` with a `save_all` envelope.
  async fn push(&self, doc: AggregateDocument) -> Result<Acknowledged> {
    let envelope = PushEnvelope::save_all(&doc, Utc::now())?;
    let body = serde_json::to_string(&envelope).map_err(jurnal_core::Error::from)?;
    tracing::debug!(bytes = body.len(), endpoint = %self.config.endpoint, "pushing snapshot");

    let resp = self
      .client
      .post(&self.config.endpoint)
      .header(CONTENT_TYPE, PUSH_CONTENT_TYPE)
      .body(body)
      .send()
      .await?;

    let status = resp.status();
    if !status.is_success() {
      return Err(Error::Status(status));
    }
    let etag = resp
      .headers()
      .get(ETAG)
      .and_then(|v| v.to_str().ok())
      .map(|v| v.trim_matches('"').to_owned());
    Ok(Acknowledged { status: status.as_u16(), etag })
  }

  /// `GET <endpoint>?action=load_all&t=<unix millis>`. The timestamp defeats
  /// intermediate caches.
  async fn pull(&self) -> Result<Option<AggregateDocument>> {
    let millis = Utc::now().timestamp_millis().to_string();
    let resp = self
      .client
      .get(&self.config.endpoint)
      .query(&[("action", "load_all"), ("t", millis.as_str())])
      .send()
      .await?;

    let status = resp.status();
    if !status.is_success() {
      return Err(Error::Status(status));
    }
    let body = resp.text().await?;
    tracing::debug!(bytes = body.len(), "pull body received");
    Ok(classify_pull_body(&body)?)
  }
}
