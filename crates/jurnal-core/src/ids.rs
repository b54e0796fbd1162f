//! Client-side identifiers for list-shaped records.
//!
//! Journal entries and mentoring notes carry a numeric `id` generated on the
//! client. Ids must be distinct within a process and never reused; sources
//! are injected so tests do not depend on clock resolution.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

/// A source of record identifiers.
pub trait IdSource: Send + Sync {
  /// Return an id strictly greater than every id previously returned.
  fn next_id(&self) -> u64;
}

/// Millisecond-timestamp ids, bumped past the last issued id whenever the
/// clock stalls or steps backwards.
#[derive(Debug, Default)]
pub struct ClockIds {
  last: AtomicU64,
}

impl ClockIds {
  pub fn new() -> Self { Self::default() }
}

impl IdSource for ClockIds {
  fn next_id(&self) -> u64 {
    let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
    let mut prev = self.last.load(Ordering::Relaxed);
    loop {
      let candidate = now.max(prev + 1);
      match self.last.compare_exchange_weak(
        prev,
        candidate,
        Ordering::Relaxed,
        Ordering::Relaxed,
      ) {
        Ok(_) => return candidate,
        Err(actual) => prev = actual,
      }
    }
  }
}

/// A plain counter. Deterministic, for tests and fixtures.
#[derive(Debug)]
pub struct SequentialIds {
  next: AtomicU64,
}

impl SequentialIds {
  pub fn starting_at(first: u64) -> Self { Self { next: AtomicU64::new(first) } }
}

impl IdSource for SequentialIds {
  fn next_id(&self) -> u64 { self.next.fetch_add(1, Ordering::Relaxed) }
}
