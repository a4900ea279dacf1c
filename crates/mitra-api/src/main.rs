//! mitra-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) overlaid with
//! `MITRA_*` environment variables, opens the SQLite store, and serves the
//! JSON API over HTTP.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use mitra_api::{AppState, ServerConfig};
use mitra_google::{GeminiClient, http_client};
use mitra_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Mitra wellness API server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("MITRA"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  // Open SQLite store.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Upstream clients share one HTTP connection pool.
  let http = http_client(server_cfg.request_timeout()).context("failed to build HTTP client")?;
  let mut gemini = GeminiClient::new(http.clone(), server_cfg.gemini_api_key.clone());
  if let Some(model) = &server_cfg.gemini_model {
    gemini = gemini.with_model(model);
  }
  if let Some(base_url) = &server_cfg.gemini_base_url {
    gemini = gemini.with_base_url(base_url);
  }
  if !gemini.is_configured() {
    tracing::warn!("no gemini_api_key configured; generated content will use fallbacks");
  }
  if server_cfg.dev_mode {
    tracing::warn!("dev_mode is on; requests are accepted without token verification");
  }

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  tracing::info!(strategy = %server_cfg.sound_strategy, "soundscape strategy");

  let state = AppState::new(store, gemini, server_cfg, http);
  let app = mitra_api::router(state);

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
