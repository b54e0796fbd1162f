//! jurnal-relay server binary.
//!
//! Reads `relay.toml` (or the path given with `--config`) plus `JURNAL_RELAY_*`
//! environment variables, opens the SQLite store, and serves the snapshot
//! endpoint over HTTP.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use jurnal_relay::{AppState, RelayConfig};
use jurnal_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Jurnal snapshot relay")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "relay.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .set_default("host", "127.0.0.1")?
    .set_default("port", 8787)?
    .set_default("store_path", "~/.local/share/jurnal/relay.db")?
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("JURNAL_RELAY"))
    .build()
    .context("failed to read config file")?;

  let relay_cfg: RelayConfig = settings
    .try_deserialize()
    .context("failed to deserialise RelayConfig")?;

  let store_path = expand_tilde(&relay_cfg.store_path);
  if let Some(parent) = store_path.parent() {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let app = jurnal_relay::router(AppState { store });
  let address = format!("{}:{}", relay_cfg.host, relay_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
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
