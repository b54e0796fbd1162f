//! SQLite backend for the Jurnal local store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Each collection is one row holding its
//! JSON text, mirroring the key-value model of the core crate.

mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{SqliteStore, StoredEntry};

#[cfg(test)]
mod tests;
