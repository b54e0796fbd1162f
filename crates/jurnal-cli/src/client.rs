//! Concrete store and remote choices for one invocation.
//!
//! The controller is generic; the binary picks a backend at runtime, so both
//! seams get a small enum that forwards to the chosen implementation.

use std::convert::Infallible;

use jurnal_core::{
  CollectionKey,
  remote::{Acknowledged, Detached, NotConfigured, SnapshotRemote},
  snapshot::AggregateDocument,
  store::{LocalStore, MemoryStore},
};
use jurnal_remote::HttpSnapshotClient;
use jurnal_store_sqlite::SqliteStore;

// ─── Local ───────────────────────────────────────────────────────────────────

pub enum Local {
  Sqlite(SqliteStore),
  /// `--ephemeral`: nothing survives the process.
  Memory(MemoryStore),
}

impl LocalStore for Local {
  type Error = jurnal_store_sqlite::Error;

  async fn read(&self, key: CollectionKey) -> Result<Option<String>, Self::Error> {
    match self {
      Local::Sqlite(s) => s.read(key).await,
      Local::Memory(m) => m.read(key).await.map_err(absurd),
    }
  }

  async fn write(&self, key: CollectionKey, json: String) -> Result<(), Self::Error> {
    match self {
      Local::Sqlite(s) => s.write(key, json).await,
      Local::Memory(m) => m.write(key, json).await.map_err(absurd),
    }
  }
}

fn absurd<T>(never: Infallible) -> T { match never {} }

// ─── Remote ──────────────────────────────────────────────────────────────────

pub enum Remote {
  Http(HttpSnapshotClient),
  /// Pushes go to the endpoint; the boot pull finds nothing, so the local
  /// cache stands. Used when the command should not start from the cloud.
  PushOnly(HttpSnapshotClient),
  Detached(Detached),
}

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
  #[error(transparent)]
  Http(#[from] jurnal_remote::Error),
  #[error(transparent)]
  Detached(#[from] NotConfigured),
}

impl SnapshotRemote for Remote {
  type Error = RemoteError;

  async fn push(&self, doc: AggregateDocument) -> Result<Acknowledged, RemoteError> {
    match self {
      Remote::Http(c) | Remote::PushOnly(c) => Ok(c.push(doc).await?),
      Remote::Detached(d) => Ok(d.push(doc).await?),
    }
  }

  async fn pull(&self) -> Result<Option<AggregateDocument>, RemoteError> {
    match self {
      Remote::Http(c) => Ok(c.pull().await?),
      Remote::PushOnly(_) => Ok(None),
      Remote::Detached(d) => Ok(d.pull().await?),
    }
  }
}

impl Remote {
  pub fn describe(&self) -> String {
    match self {
      Remote::Http(c) => c.endpoint().to_owned(),
      Remote::PushOnly(c) => format!("{} (push only)", c.endpoint()),
      Remote::Detached(_) => "none".to_owned(),
    }
  }
}
