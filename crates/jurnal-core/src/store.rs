//! The `LocalStore` trait: whole-document JSON text per collection key.
//!
//! Implemented by storage backends (e.g. `jurnal-store-sqlite`). Writes are
//! fire-and-forget from the controller's point of view: failures are logged
//! and never retried. There is no transaction spanning several keys.

use std::{
  collections::{BTreeMap, BTreeSet},
  convert::Infallible,
  future::Future,
  sync::{Mutex, PoisonError},
};

use crate::{
  collection::{Collection, CollectionKey},
  state::AppState,
};

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Key-value storage of collection JSON, one entry per [`CollectionKey`].
pub trait LocalStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// The stored JSON text for `key`, or `None` if never written.
  fn read(
    &self,
    key: CollectionKey,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + '_;

  /// Replace the stored JSON text for `key`.
  fn write(
    &self,
    key: CollectionKey,
    json: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

// ─── Loading ─────────────────────────────────────────────────────────────────

/// Cached state as loaded at startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CachedState {
  pub state:     AppState,
  /// Keys whose stored text could not be read or decoded. Their slots hold
  /// defaults, and the stored text must stay untouched until the collection
  /// is really replaced.
  pub undecoded: BTreeSet<CollectionKey>,
}

/// Read one collection. `Some(C::initial())` when the key was never
/// written; `None` when a stored value exists but cannot be used.
pub async fn load_collection<C: Collection, S: LocalStore>(store: &S) -> Option<C> {
  let key = C::KEY;
  match store.read(key).await {
    Ok(None) => Some(C::initial()),
    Ok(Some(json)) => serde_json::from_str(&json)
      .inspect_err(|e| {
        tracing::warn!(key = key.local_key(), error = %e, "cached collection does not decode; using default");
      })
      .ok(),
    Err(e) => {
      tracing::warn!(key = key.local_key(), error = %e, "failed to read cached collection; using default");
      None
    }
  }
}

async fn load_tracked<C: Collection, S: LocalStore>(
  store: &S,
  undecoded: &mut BTreeSet<CollectionKey>,
) -> C {
  load_collection(store).await.unwrap_or_else(|| {
    undecoded.insert(C::KEY);
    C::initial()
  })
}

/// Load every collection from `store`, noting which ones fell back.
pub async fn load_state<S: LocalStore>(store: &S) -> CachedState {
  let mut undecoded = BTreeSet::new();
  let state = AppState {
    settings:   load_tracked(store, &mut undecoded).await,
    journal:    load_tracked(store, &mut undecoded).await,
    attendance: load_tracked(store, &mut undecoded).await,
    roster:     load_tracked(store, &mut undecoded).await,
    classes:    load_tracked(store, &mut undecoded).await,
    periods:    load_tracked(store, &mut undecoded).await,
    mentoring:  load_tracked(store, &mut undecoded).await,
    grades:     load_tracked(store, &mut undecoded).await,
  };
  CachedState { state, undecoded }
}

// ─── In-memory store ─────────────────────────────────────────────────────────

/// A [`LocalStore`] held in process memory. Used in tests and for
/// `--ephemeral` runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
  entries: Mutex<BTreeMap<&'static str, String>>,
  writes:  Mutex<Vec<CollectionKey>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  /// Seed a raw value, bypassing the write log.
  pub fn with_raw(self, key: CollectionKey, json: impl Into<String>) -> Self {
    self.lock_entries().insert(key.local_key(), json.into());
    self
  }

  /// A copy of everything stored, keyed by local key.
  pub fn dump(&self) -> BTreeMap<&'static str, String> { self.lock_entries().clone() }

  pub fn get(&self, key: CollectionKey) -> Option<String> {
    self.lock_entries().get(key.local_key()).cloned()
  }

  /// Every key written through [`LocalStore::write`], in order.
  pub fn write_log(&self) -> Vec<CollectionKey> {
    self.writes.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }

  fn lock_entries(&self) -> std::sync::MutexGuard<'_, BTreeMap<&'static str, String>> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl LocalStore for MemoryStore {
  type Error = Infallible;

  async fn read(&self, key: CollectionKey) -> Result<Option<String>, Infallible> {
    Ok(self.get(key))
  }

  async fn write(&self, key: CollectionKey, json: String) -> Result<(), Infallible> {
    self.lock_entries().insert(key.local_key(), json);
    self
      .writes
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(key);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::roster::{ClassList, PeriodList};

  #[tokio::test]
  async fn missing_keys_load_defaults() {
    let cached = load_state(&MemoryStore::new()).await;
    assert_eq!(cached.state, AppState::default());
    assert!(cached.undecoded.is_empty());
  }

  #[tokio::test]
  async fn malformed_cache_falls_back_to_default() {
    let store = MemoryStore::new()
      .with_raw(CollectionKey::Periods, "[\"1-2\",")
      .with_raw(CollectionKey::Journal, r#"{"2025-03-10":"not a list"}"#)
      .with_raw(CollectionKey::Classes, r#"["X AP 1"]"#);
    let cached = load_state(&store).await;
    assert_eq!(cached.state.periods(), &PeriodList::default());
    assert!(cached.state.journal().is_empty());
    assert_eq!(cached.state.classes(), &ClassList(vec!["X AP 1".into()]));
    assert_eq!(
      cached.undecoded.into_iter().collect::<Vec<_>>(),
      [CollectionKey::Journal, CollectionKey::Periods]
    );
    // Loading never writes.
    assert!(store.write_log().is_empty());
  }
}
