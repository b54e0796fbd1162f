//! Core types and sync model for the Jurnal classroom journal.
//!
//! This crate is deliberately free of HTTP and database dependencies. Storage
//! backends implement [`store::LocalStore`], remote transports implement
//! [`remote::SnapshotRemote`], and both meet in [`sync::SyncController`].

pub mod attendance;
pub mod calendar;
pub mod collection;
pub mod error;
pub mod grades;
pub mod ids;
pub mod journal;
pub mod mentoring;
pub mod remote;
pub mod report;
pub mod roster;
pub mod settings;
pub mod snapshot;
pub mod state;
pub mod store;
pub mod sync;

pub use collection::{Collection, CollectionKey};
pub use error::{Error, Result};
pub use state::AppState;
