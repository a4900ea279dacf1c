//! HTTP gateway for Mitra.
//!
//! Exposes an axum [`Router`] backed by any [`DocumentStore`] and
//! [`Generator`]. Every feature route lives under `/api` and requires an
//! authenticated user (see [`auth`]); `/healthz` is open.

pub mod auth;
pub mod error;
pub mod extract;
pub mod handlers;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post},
};
use mitra_core::{generate::Generator, soundscape::SoundStrategy, store::DocumentStore};
use mitra_google::{IdentityClient, SpeechClient};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use handlers::{chat, health, journal, mood, practice, soundscape, speech, twin};

/// Large enough for a base64-encoded voice note.
const BODY_LIMIT: usize = 10 * 1024 * 1024;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `MITRA_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                 String,
  #[serde(default = "default_port")]
  pub port:                 u16,
  #[serde(default = "default_store_path")]
  pub store_path:           PathBuf,
  /// Accept `x-dev-user` (or `dev_user`) in place of a verified token.
  #[serde(default)]
  pub dev_mode:             bool,
  #[serde(default)]
  pub dev_user:             Option<String>,
  #[serde(default)]
  pub gemini_api_key:       Option<String>,
  #[serde(default)]
  pub gemini_model:         Option<String>,
  #[serde(default)]
  pub gemini_base_url:      Option<String>,
  #[serde(default)]
  pub identity_api_key:     Option<String>,
  #[serde(default)]
  pub speech_api_key:       Option<String>,
  #[serde(default)]
  pub sound_strategy:       SoundStrategy,
  #[serde(default = "default_request_timeout")]
  pub request_timeout_secs: u64,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("mitra.db") }

fn default_request_timeout() -> u64 { 30 }

impl ServerConfig {
  pub fn request_timeout(&self) -> Duration { Duration::from_secs(self.request_timeout_secs) }
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                 default_host(),
      port:                 default_port(),
      store_path:           default_store_path(),
      dev_mode:             false,
      dev_user:             None,
      gemini_api_key:       None,
      gemini_model:         None,
      gemini_base_url:      None,
      identity_api_key:     None,
      speech_api_key:       None,
      sound_strategy:       SoundStrategy::default(),
      request_timeout_secs: default_request_timeout(),
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S, G> {
  pub store:     Arc<S>,
  pub generator: Arc<G>,
  pub config:    Arc<ServerConfig>,
  pub identity:  Arc<IdentityClient>,
  pub speech:    Arc<SpeechClient>,
}

impl<S, G> AppState<S, G> {
  /// Build the state, constructing the identity and speech clients from
  /// `config` over the shared `http` client.
  pub fn new(store: S, generator: G, config: ServerConfig, http: reqwest::Client) -> Self {
    let identity = IdentityClient::new(http.clone(), config.identity_api_key.clone());
    let speech = SpeechClient::new(http, config.speech_api_key.clone());
    Self {
      store:     Arc::new(store),
      generator: Arc::new(generator),
      config:    Arc::new(config),
      identity:  Arc::new(identity),
      speech:    Arc::new(speech),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router.
pub fn router<S, G>(state: AppState<S, G>) -> Router
where
  S: DocumentStore + Clone + 'static,
  G: Generator + Clone + 'static,
{
  let api = Router::new()
    // Journal
    .route("/journal/entries", post(journal::create::<S, G>))
    .route(
      "/journal/entries/{id}",
      get(journal::get_one::<S, G>).delete(journal::delete_one::<S, G>),
    )
    .route("/journal/sessions", get(journal::list::<S, G>))
    .route("/journal/analyze", post(journal::analyze::<S, G>))
    .route("/journal/reflections", post(journal::start_reflection::<S, G>))
    .route("/journal/reflections/{id}", get(journal::get_reflection::<S, G>))
    .route("/journal/reflections/{id}/respond", post(journal::respond::<S, G>))
    .route("/journal/reflections/{id}/complete", post(journal::complete::<S, G>))
    // Mood
    .route("/mood/entries", post(mood::create::<S, G>))
    .route("/mood/history", get(mood::history::<S, G>))
    .route("/mood/streak", get(mood::streak::<S, G>))
    // Chat
    .route("/mitra/chat", post(chat::chat::<S, G>))
    .route("/mitra/history", get(chat::history::<S, G>))
    .route("/mitra/memory", get(chat::memory::<S, G>).delete(chat::forget::<S, G>))
    // Practice
    .route("/practice/scenarios", get(practice::scenarios))
    .route("/practice/simulate", post(practice::simulate::<S, G>))
    .route("/practice/complete", post(practice::complete::<S, G>))
    .route("/practice/progress", get(practice::progress::<S, G>))
    // Health
    .route("/health/entries", get(health::list::<S, G>).post(health::upsert::<S, G>))
    .route("/health/insights", post(health::insights::<S, G>))
    // Soundscape
    .route("/soundscape/catalog", get(soundscape::catalog))
    .route("/soundscape/recommendations", post(soundscape::recommend::<S, G>))
    // Digital twin
    .route("/digital-twin/profile", get(twin::profile::<S, G>))
    .route("/digital-twin/insights", post(twin::insights::<S, G>))
    // Speech
    .route("/speech/transcribe", post(speech::transcribe::<S, G>))
    .route("/speech/synthesize", post(speech::synthesize::<S, G>));

  Router::new()
    .route("/healthz", get(healthz))
    .nest("/api", api)
    .layer(DefaultBodyLimit::max(BODY_LIMIT))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

async fn healthz() -> &'static str { "ok" }

#[cfg(test)]
mod tests;
