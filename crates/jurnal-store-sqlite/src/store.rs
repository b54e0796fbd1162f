//! [`SqliteStore`]: the SQLite implementation of [`LocalStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;

use jurnal_core::{CollectionKey, store::LocalStore};

use crate::{
  Error, Result,
  schema::{MIGRATIONS, PRAGMAS, SCHEMA_VERSION},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Jurnal local store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// One stored collection, as listed by [`SqliteStore::entries`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
  pub key:        String,
  pub bytes:      usize,
  pub updated_at: DateTime<Utc>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and bring its schema up to date.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    let found: i64 = self
      .conn
      .call(|conn| {
        conn.execute_batch(PRAGMAS)?;
        let version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
        if version > SCHEMA_VERSION {
          return Ok(version);
        }
        let tx = conn.transaction()?;
        for step in &MIGRATIONS[version as usize..] {
          tx.execute_batch(step)?;
        }
        tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        tx.commit()?;
        Ok(version)
      })
      .await?;

    if found > SCHEMA_VERSION {
      return Err(Error::SchemaTooNew { found, supported: SCHEMA_VERSION });
    }
    if found < SCHEMA_VERSION {
      tracing::debug!(from = found, to = SCHEMA_VERSION, "store schema migrated");
    }
    Ok(())
  }

  /// The JSON text stored under `key`, if any.
  pub async fn get(&self, key: &str) -> Result<Option<String>> {
    let key = key.to_owned();
    let value = self
      .conn
      .call(move |conn| {
        let value = conn
          .query_row(
            "SELECT value FROM collections WHERE key = ?1",
            rusqlite::params![key],
            |r| r.get(0),
          )
          .optional()?;
        Ok(value)
      })
      .await?;
    Ok(value)
  }

  /// Insert or replace the JSON text stored under `key`.
  pub async fn put(&self, key: &str, value: String) -> Result<()> {
    let key = key.to_owned();
    let at = Utc::now().to_rfc3339();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO collections (key, value, updated_at) VALUES (?1, ?2, ?3)
           ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                          updated_at = excluded.updated_at",
          rusqlite::params![key, value, at],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Every stored collection, ordered by key.
  pub async fn entries(&self) -> Result<Vec<StoredEntry>> {
    let raw: Vec<(String, i64, String)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT key, length(CAST(value AS BLOB)), updated_at FROM collections ORDER BY key",
        )?;
        let rows = stmt
          .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raw
      .into_iter()
      .map(|(key, bytes, at)| {
        let updated_at = DateTime::parse_from_rfc3339(&at)
          .map_err(|e| Error::DateParse(format!("{at}: {e}")))?
          .with_timezone(&Utc);
        let bytes = usize::try_from(bytes).unwrap_or_default();
        Ok(StoredEntry { key, bytes, updated_at })
      })
      .collect()
  }
}

// ─── LocalStore impl ─────────────────────────────────────────────────────────

impl LocalStore for SqliteStore {
  type Error = Error;

  async fn read(&self, key: CollectionKey) -> Result<Option<String>> {
    self.get(key.local_key()).await
  }

  async fn write(&self, key: CollectionKey, json: String) -> Result<()> {
    self.put(key.local_key(), json).await
  }
}
