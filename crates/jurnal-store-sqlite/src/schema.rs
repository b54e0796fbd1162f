//! SQL schema for the Jurnal SQLite store.
//!
//! Versioned through `PRAGMA user_version`. `MIGRATIONS[n]` moves a database
//! from version `n` to `n + 1`.

pub const SCHEMA_VERSION: i64 = 1;

pub const PRAGMAS: &str = "PRAGMA journal_mode = WAL;";

pub const MIGRATIONS: [&str; SCHEMA_VERSION as usize] = [
  // v0 → v1
  "
CREATE TABLE IF NOT EXISTS collections (
    key        TEXT PRIMARY KEY,   -- local key, e.g. 'jurnalData'
    value      TEXT NOT NULL,      -- whole-collection JSON text
    updated_at TEXT NOT NULL       -- ISO 8601 UTC of the last write
);
",
];
