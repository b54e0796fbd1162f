//! HTTP transport for Jurnal snapshots.
//!
//! [`HttpSnapshotClient`] implements [`SnapshotRemote`] against a
//! spreadsheet-macro style endpoint (or `jurnal-relay`): one URL, `POST` to
//! save everything, `GET ?action=load_all` to load it back.

mod client;

pub mod error;

pub use client::{HttpSnapshotClient, RemoteConfig};
pub use error::{Error, Result};
