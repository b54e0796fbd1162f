//! `jurnal`: command-line front end for the Jurnal classroom journal.
//!
//! Every invocation is one short session: load the local cache, run the
//! initial reconciliation, apply one command, and exit.
//!
//! # Usage
//!
//! ```
//! jurnal classes add "x ap 1"
//! jurnal journal add --date 2025-03-10 --period 1-2 --class "X AP 1" --material Intro
//! jurnal --endpoint https://script.google.com/macros/s/.../exec push
//! jurnal --config ~/.config/jurnal/config.toml report journal 2025 3
//! ```

mod app;
mod client;
mod ui;

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use jurnal_core::{ids::ClockIds, remote::Detached, store::MemoryStore, sync::SyncController};
use jurnal_remote::{HttpSnapshotClient, RemoteConfig};
use jurnal_store_sqlite::SqliteStore;
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use app::App;
use client::{Local, Remote};

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "jurnal", version, about = "Classroom journal with cloud snapshot sync")]
struct Args {
  /// Path to a TOML config file (endpoint, store_path, timeout_secs,
  /// sync_on_start).
  #[arg(short, long, value_name = "FILE", env = "JURNAL_CONFIG")]
  config: Option<PathBuf>,

  /// Snapshot endpoint URL.
  #[arg(long, env = "JURNAL_ENDPOINT")]
  endpoint: Option<String>,

  /// SQLite file holding the local cache.
  #[arg(long, value_name = "PATH", env = "JURNAL_STORE")]
  store: Option<PathBuf>,

  /// Request timeout in seconds (default: 30).
  #[arg(long, value_name = "SECS")]
  timeout: Option<u64>,

  /// Pull from the endpoint before every command, not only on `pull`.
  #[arg(long)]
  sync_on_start: bool,

  /// Never contact the endpoint.
  #[arg(long)]
  offline: bool,

  /// Keep state in memory only; nothing is read from or written to disk.
  #[arg(long)]
  ephemeral: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Show where data lives and what is stored.
  Status,
  /// Save everything to the cloud endpoint.
  Push,
  /// Replace local collections with the cloud copy.
  Pull,
  /// Teacher and school identity.
  #[command(subcommand)]
  Settings(SettingsCmd),
  /// Class names.
  #[command(subcommand)]
  Classes(ListCmd),
  /// Lesson periods.
  #[command(subcommand)]
  Periods(ListCmd),
  /// Students per class.
  #[command(subcommand)]
  Roster(RosterCmd),
  /// Teaching journal entries.
  #[command(subcommand)]
  Journal(JournalCmd),
  /// Daily attendance marks.
  #[command(subcommand)]
  Attendance(AttendanceCmd),
  /// Weekly mentoring notes.
  #[command(subcommand)]
  Mentoring(MentoringCmd),
  /// Score sheets.
  #[command(subcommand)]
  Grades(GradesCmd),
  /// Printable report rows.
  #[command(subcommand)]
  Report(ReportCmd),
}

#[derive(Subcommand, Debug)]
pub enum SettingsCmd {
  Show,
  /// Update identity fields; omitted fields keep their value.
  Set {
    #[arg(long)]
    name:               Option<String>,
    #[arg(long)]
    nip:                Option<String>,
    #[arg(long)]
    position:           Option<String>,
    #[arg(long)]
    subject:            Option<String>,
    #[arg(long)]
    school:             Option<String>,
    #[arg(long)]
    principal:          Option<String>,
    #[arg(long)]
    principal_nip:      Option<String>,
    #[arg(long)]
    principal_position: Option<String>,
  },
  /// Add a homeroom class.
  AddHomeroom { class: String },
  RemoveHomeroom { class: String },
  /// Add a mentored student.
  AddMentee { name: String, class: String },
  RemoveMentee { name: String, class: String },
}

#[derive(Subcommand, Debug)]
pub enum ListCmd {
  List,
  Add { value: String },
  Remove { value: String },
}

#[derive(Subcommand, Debug)]
pub enum RosterCmd {
  List { class: Option<String> },
  Add {
    class:    String,
    #[arg(required = true)]
    students: Vec<String>,
  },
  Remove { class: String, student: String },
  Rename { class: String, from: String, to: String },
}

#[derive(Subcommand, Debug)]
pub enum JournalCmd {
  /// Entries for one date, or every date.
  List {
    #[arg(long)]
    date: Option<String>,
  },
  Add {
    #[arg(long)]
    date:     String,
    #[arg(long)]
    period:   String,
    #[arg(long)]
    class:    String,
    #[arg(long, default_value = "")]
    material: String,
    #[arg(long, default_value = "")]
    activity: String,
  },
  Remove { date: String, id: u64 },
}

#[derive(Subcommand, Debug)]
pub enum AttendanceCmd {
  /// The sheet for a class on a date; unmarked students show as present.
  Show { date: String, class: String },
  /// Record a sheet. Students not listed are marked present.
  Mark {
    date:  String,
    class: String,
    /// `NAME=CODE` pairs, where CODE is one of H, S, I, A.
    marks: Vec<String>,
  },
}

#[derive(Subcommand, Debug)]
pub enum MentoringCmd {
  List {
    #[arg(long)]
    year: Option<i32>,
  },
  /// Save the note for the ISO week containing `date`, replacing any
  /// earlier note for that student and week.
  Save {
    #[arg(long)]
    date:      String,
    #[arg(long)]
    student:   String,
    #[arg(long)]
    class:     String,
    #[arg(long, default_value = "Lainnya")]
    category:  String,
    #[arg(long, default_value_t = 0)]
    present:   u32,
    #[arg(long, default_value_t = 0)]
    sick:      u32,
    #[arg(long, default_value_t = 0)]
    excused:   u32,
    #[arg(long, default_value_t = 0)]
    absent:    u32,
    #[arg(long, default_value = "")]
    narrative: String,
    #[arg(long, default_value = "")]
    follow_up: String,
  },
  Remove { id: u64 },
}

#[derive(Subcommand, Debug)]
pub enum GradesCmd {
  Show { class: String },
  /// Set one score, e.g. `grades set "X AP 1" Andi tp_m1_2 85`.
  Set {
    class:   String,
    student: String,
    field:   String,
    value:   String,
  },
}

#[derive(Subcommand, Debug)]
pub enum ReportCmd {
  Journal { year: i32, month: u32 },
  Attendance { year: i32, month: u32 },
  Mentoring { year: i32 },
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  endpoint:      Option<String>,
  #[serde(default)]
  store_path:    Option<PathBuf>,
  #[serde(default)]
  timeout_secs:  Option<u64>,
  #[serde(default)]
  sync_on_start: bool,
}

const DEFAULT_STORE: &str = "~/.local/share/jurnal/jurnal.db";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let endpoint = args
    .endpoint
    .clone()
    .or(file_cfg.endpoint)
    .filter(|e| !e.trim().is_empty());
  let store_path = expand_tilde(
    &args
      .store
      .clone()
      .or(file_cfg.store_path)
      .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE)),
  );
  let timeout = Duration::from_secs(
    args
      .timeout
      .or(file_cfg.timeout_secs)
      .unwrap_or(DEFAULT_TIMEOUT_SECS),
  );
  let sync_on_start = args.sync_on_start || file_cfg.sync_on_start;

  let local = if args.ephemeral {
    Local::Memory(MemoryStore::new())
  } else {
    if let Some(parent) = store_path.parent() {
      std::fs::create_dir_all(parent)
        .with_context(|| format!("creating {}", parent.display()))?;
    }
    Local::Sqlite(
      SqliteStore::open(&store_path)
        .await
        .with_context(|| format!("opening store at {}", store_path.display()))?,
    )
  };

  let remote = match endpoint {
    Some(url) if !args.offline => {
      let client = HttpSnapshotClient::new(RemoteConfig { endpoint: url, timeout })?;
      match args.command {
        Command::Pull => Remote::Http(client),
        _ if sync_on_start => Remote::Http(client),
        Command::Push => Remote::PushOnly(client),
        _ => Remote::Detached(Detached),
      }
    }
    _ => Remote::Detached(Detached),
  };
  tracing::debug!(remote = %remote.describe(), store = %store_path.display(), "starting");

  let location = if args.ephemeral { "memory".to_owned() } else { store_path.display().to_string() };
  let ctrl = SyncController::open(local, remote, ClockIds::new()).await;
  App::new(ctrl, location).run(args.command).await
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
