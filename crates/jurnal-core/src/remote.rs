//! The `SnapshotRemote` trait: push and pull one aggregate document.

use std::future::Future;

use crate::snapshot::AggregateDocument;

/// What a successful push tells us.
///
/// A push is acknowledged once the transport reports success. That proves
/// the bytes arrived, not that the remote processed or persisted them; the
/// spreadsheet macro gives no stronger confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acknowledged {
  /// HTTP status (or transport equivalent) of the push response.
  pub status: u16,
  /// Content tag of the stored snapshot, when the remote reports one.
  pub etag:   Option<String>,
}

/// A store holding the last pushed [`AggregateDocument`].
///
/// Implementations perform no retries; the caller decides whether to try
/// again.
pub trait SnapshotRemote: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Send the whole aggregate.
  fn push(
    &self,
    doc: AggregateDocument,
  ) -> impl Future<Output = Result<Acknowledged, Self::Error>> + Send + '_;

  /// Fetch the last pushed aggregate. `Ok(None)` means the remote has
  /// nothing to offer, which is not a failure.
  fn pull(&self) -> impl Future<Output = Result<Option<AggregateDocument>, Self::Error>> + Send + '_;
}

/// A remote that is not there: pulls find nothing, pushes fail.
///
/// Used when no endpoint is configured or the user asked to stay offline.
#[derive(Debug, Clone, Copy, Default)]
pub struct Detached;

#[derive(Debug, thiserror::Error)]
#[error("no remote endpoint is configured")]
pub struct NotConfigured;

impl SnapshotRemote for Detached {
  type Error = NotConfigured;

  async fn push(&self, _doc: AggregateDocument) -> Result<Acknowledged, NotConfigured> {
    Err(NotConfigured)
  }

  async fn pull(&self) -> Result<Option<AggregateDocument>, NotConfigured> { Ok(None) }
}
