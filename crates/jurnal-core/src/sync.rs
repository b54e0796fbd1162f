//! [`SyncController`] keeps in-memory state, the local store, and the
//! remote snapshot consistent.
//!
//! # Phases
//!
//! ```text
//! Booting ──boot──▶ Reconciling ──pull settled──▶ Ready ◀──push settled── Pushing
//!                        ▲                          │ │                       ▲
//!                        └────────reload────────────┘ └───────push────────────┘
//! ```
//!
//! Local-store mirroring is controlled by a one-shot [`WriteGate`]. It opens
//! when the first reconciliation settles, whatever its outcome, and never
//! closes again. Mutations made before that point stay in memory only, so a
//! freshly started process cannot overwrite a good cache with defaults
//! before the remote has had its say. Collections whose cached text did not
//! decode are left out of the gate-open flush; their stored text is only
//! replaced by a real edit or by a pulled value.
//!
//! Mutations are never blocked by sync work. A manual reload that resolves
//! after a concurrent edit silently wins for the collections it carries;
//! there is no merge and no warning.

use std::{
  collections::BTreeSet,
  fmt,
  mem,
  sync::{Mutex, MutexGuard, PoisonError},
};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  collection::{Collection, CollectionKey},
  ids::IdSource,
  remote::{Acknowledged, SnapshotRemote},
  snapshot::AggregateDocument,
  state::{AppState, Update},
  store::{CachedState, LocalStore, load_state},
};

// ─── State machine ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
  /// Process started; state holds cached or default values.
  Booting,
  /// A pull is in flight.
  Reconciling,
  /// Idle.
  Ready,
  /// A user-triggered push is in flight.
  Pushing,
}

impl fmt::Display for SyncPhase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Booting => "booting",
      Self::Reconciling => "reconciling",
      Self::Ready => "ready",
      Self::Pushing => "pushing",
    })
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
  Boot,
  Reload,
  PullSettled,
  PushStarted,
  PushSettled,
}

impl SyncPhase {
  /// The phase after `event`, or why `event` is not allowed now.
  pub fn on(self, event: SyncEvent) -> Result<SyncPhase> {
    use SyncEvent as E;
    use SyncPhase as P;
    match (self, event) {
      (P::Booting, E::Boot) => Ok(P::Reconciling),
      (P::Reconciling, E::PullSettled) => Ok(P::Ready),
      (P::Ready, E::Reload) => Ok(P::Reconciling),
      (P::Ready, E::PushStarted) => Ok(P::Pushing),
      (P::Pushing, E::PushSettled) => Ok(P::Ready),
      (P::Reconciling | P::Pushing, E::Reload | E::PushStarted) => Err(Error::Busy(self)),
      (from, event) => Err(Error::InvalidTransition { from, event }),
    }
  }
}

/// Whether mutations are mirrored to the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteGate {
  Closed,
  Open,
}

// ─── Notices ─────────────────────────────────────────────────────────────────

/// The user-facing outcome of a sync action. Network failures end up here
/// rather than as errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
  Pushed(Acknowledged),
  PushFailed(String),
  /// The remote snapshot replaced these collections.
  Pulled(Vec<CollectionKey>),
  /// The remote had nothing to load; local data is unchanged.
  RemoteEmpty,
  PullFailed(String),
}

impl Notice {
  pub fn is_error(&self) -> bool { matches!(self, Self::PushFailed(_) | Self::PullFailed(_)) }
}

impl fmt::Display for Notice {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Pushed(_) => write!(f, "Saved to cloud."),
      Self::PushFailed(reason) => write!(f, "Cloud save failed: {reason}"),
      Self::Pulled(keys) => {
        let names: Vec<String> = keys.iter().map(ToString::to_string).collect();
        write!(f, "Loaded from cloud: {}.", names.join(", "))
      }
      Self::RemoteEmpty => write!(f, "No data in the cloud yet; local data left unchanged."),
      Self::PullFailed(reason) => write!(f, "Could not load from cloud: {reason}"),
    }
  }
}

// ─── Controller ──────────────────────────────────────────────────────────────

struct Inner {
  state: AppState,
  phase: SyncPhase,
  gate:  WriteGate,
  /// Keys whose stored text must not be overwritten by the gate-open flush.
  held:  BTreeSet<CollectionKey>,
}

/// Owns the application state and orchestrates local mirroring and remote
/// sync.
///
/// All methods take `&self`; the internal lock is never held across an
/// `.await`, so mutations interleave freely with in-flight pulls and pushes
/// on the same task.
pub struct SyncController<L, R> {
  local:  L,
  remote: R,
  ids:    Box<dyn IdSource>,
  inner:  Mutex<Inner>,
}

impl<L: LocalStore, R: SnapshotRemote> SyncController<L, R> {
  /// Load cached state from `local` and enter [`SyncPhase::Booting`].
  pub async fn open(local: L, remote: R, ids: impl IdSource + 'static) -> Self {
    let CachedState { state, undecoded } = load_state(&local).await;
    debug!(undecoded = undecoded.len(), "cached state loaded");
    Self {
      local,
      remote,
      ids: Box::new(ids),
      inner: Mutex::new(Inner {
        state,
        phase: SyncPhase::Booting,
        gate: WriteGate::Closed,
        held: undecoded,
      }),
    }
  }

  // ── Accessors ─────────────────────────────────────────────────────────

  pub fn phase(&self) -> SyncPhase { self.lock().phase }

  pub fn write_gate(&self) -> WriteGate { self.lock().gate }

  pub fn local(&self) -> &L { &self.local }

  pub fn remote(&self) -> &R { &self.remote }

  /// A fresh record identifier.
  pub fn next_id(&self) -> u64 { self.ids.next_id() }

  /// Collections still holding defaults in place of undecodable cache text.
  pub fn held(&self) -> Vec<CollectionKey> { self.lock().held.iter().copied().collect() }

  /// A copy of the whole in-memory state.
  pub fn snapshot(&self) -> AppState { self.lock().state.clone() }

  /// Read one collection.
  pub fn read<C: Collection, T>(&self, f: impl FnOnce(&C) -> T) -> T { f(self.lock().state.get::<C>()) }

  // ── Mutations ─────────────────────────────────────────────────────────

  /// Replace a collection, or derive its new value from the old one.
  /// Returns whether the value changed.
  pub async fn set<C: Collection>(&self, update: impl Into<Update<C>>) -> bool {
    let update = update.into();
    let (changed, pending) = {
      let mut inner = self.lock();
      let changed = inner.state.set::<C>(update);
      (changed, pending_write(&mut inner, C::KEY, changed))
    };
    if let Some(json) = pending {
      self.mirror(C::KEY, json).await;
    }
    changed
  }

  /// Edit a collection in place and return the closure's result.
  pub async fn modify<C: Collection, T>(&self, f: impl FnOnce(&mut C) -> T) -> T {
    let (out, pending) = {
      let mut inner = self.lock();
      let (out, changed) = inner.state.modify(f);
      (out, pending_write(&mut inner, C::KEY, changed))
    };
    if let Some(json) = pending {
      self.mirror(C::KEY, json).await;
    }
    out
  }

  // ── Sync actions ──────────────────────────────────────────────────────

  /// Run the initial reconciliation, then open the write gate.
  ///
  /// Whatever the pull outcome, the process ends up [`SyncPhase::Ready`]
  /// with mirroring enabled and every collection written through once,
  /// except those [held](Self::held) because their cached text did not decode.
  /// Errors only if called more than once.
  pub async fn boot(&self) -> Result<Notice> {
    self.transition(SyncEvent::Boot)?;
    info!("initial reconciliation started");
    let notice = self.reconcile().await;

    let opened = {
      let mut inner = self.lock();
      inner.phase = inner.phase.on(SyncEvent::PullSettled)?;
      mem::replace(&mut inner.gate, WriteGate::Open) == WriteGate::Closed
    };
    if opened {
      info!("write gate open");
      self.mirror_all().await;
    }
    Ok(notice)
  }

  /// User-triggered pull. Errors if a sync action is already in flight.
  pub async fn reload(&self) -> Result<Notice> {
    self.transition(SyncEvent::Reload)?;
    info!("manual reload started");
    let notice = self.reconcile().await;
    self.transition(SyncEvent::PullSettled)?;
    Ok(notice)
  }

  /// User-triggered push of the whole state. Mutations may continue while
  /// the push is in flight; the snapshot is taken when it starts.
  pub async fn push(&self) -> Result<Notice> {
    self.transition(SyncEvent::PushStarted)?;
    let doc = AggregateDocument::capture(&self.lock().state, Utc::now());
    info!("push started");
    let result = self.remote.push(doc).await;
    self.transition(SyncEvent::PushSettled)?;

    Ok(match result {
      Ok(ack) => {
        info!(status = ack.status, "push acknowledged");
        Notice::Pushed(ack)
      }
      Err(e) => {
        warn!(error = %e, "push failed");
        Notice::PushFailed(e.to_string())
      }
    })
  }

  // ── Internals ─────────────────────────────────────────────────────────

  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn transition(&self, event: SyncEvent) -> Result<SyncPhase> {
    let mut inner = self.lock();
    let next = inner.phase.on(event)?;
    debug!(from = %inner.phase, to = %next, ?event, "sync transition");
    inner.phase = next;
    Ok(next)
  }

  /// Pull and apply. Never fails; failures become notices and leave the
  /// state untouched.
  async fn reconcile(&self) -> Notice {
    let doc = match self.remote.pull().await {
      Ok(Some(doc)) => doc,
      Ok(None) => {
        info!("remote snapshot is empty");
        return Notice::RemoteEmpty;
      }
      Err(e) => {
        warn!(error = %e, "pull failed");
        return Notice::PullFailed(e.to_string());
      }
    };

    let (applied, writes) = {
      let mut inner = self.lock();
      let applied = doc.apply_to(&mut inner.state);
      let writes: Vec<_> = applied
        .iter()
        .filter_map(|&key| pending_write(&mut inner, key, true).map(|json| (key, json)))
        .collect();
      (applied, writes)
    };
    info!(collections = applied.len(), "remote snapshot applied");
    for (key, json) in writes {
      self.mirror(key, json).await;
    }
    Notice::Pulled(applied)
  }

  async fn mirror_all(&self) {
    let writes: Vec<_> = {
      let inner = self.lock();
      for key in &inner.held {
        warn!(key = key.local_key(), "keeping undecodable cached collection until it is replaced");
      }
      CollectionKey::ALL
        .into_iter()
        .filter(|key| !inner.held.contains(key))
        .filter_map(|key| slot_json(&inner, key).map(|json| (key, json)))
        .collect()
    };
    for (key, json) in writes {
      self.mirror(key, json).await;
    }
  }

  async fn mirror(&self, key: CollectionKey, json: String) {
    debug!(key = key.local_key(), bytes = json.len(), "mirroring to local store");
    if let Err(e) = self.local.write(key, json).await {
      warn!(key = key.local_key(), error = %e, "local store write failed");
    }
  }
}

/// The JSON to mirror for `key`, if it changed and the gate is open. A
/// change releases any hold on the key.
fn pending_write(inner: &mut Inner, key: CollectionKey, changed: bool) -> Option<String> {
  if !changed {
    return None;
  }
  inner.held.remove(&key);
  if inner.gate == WriteGate::Closed {
    return None;
  }
  slot_json(inner, key)
}

fn slot_json(inner: &Inner, key: CollectionKey) -> Option<String> {
  inner
    .state
    .slot_json(key)
    .inspect_err(|e| warn!(key = key.local_key(), error = %e, "failed to serialise collection"))
    .ok()
}
