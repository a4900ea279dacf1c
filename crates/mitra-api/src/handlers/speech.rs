//! Handlers for `/speech` endpoints: a pass-through to Google Cloud
//! Speech-to-Text and Text-to-Speech. There is no fallback; an unconfigured
//! or failing service is a 500.

use axum::extract::State;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use mitra_core::{generate::Generator, persona::Language, store::DocumentStore};
use mitra_google::speech::{Recognize, Transcript};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{AppState, auth::AuthUser, error::ApiError, extract::Json};

const TEXT_CHAR_LIMIT: usize = 5_000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscribeBody {
  /// Base64-encoded audio.
  pub audio:             String,
  pub encoding:          Option<String>,
  pub sample_rate_hertz: Option<u32>,
  pub language:          Option<String>,
}

/// `POST /speech/transcribe`
pub async fn transcribe<S, G>(
  State(state): State<AppState<S, G>>,
  _user: AuthUser,
  Json(body): Json<TranscribeBody>,
) -> Result<Json<Transcript>, ApiError>
where
  S: DocumentStore,
  G: Generator,
{
  let audio = STANDARD
    .decode(body.audio.trim())
    .map_err(|_| ApiError::BadRequest("audio must be base64-encoded".into()))?;
  if audio.is_empty() {
    return Err(ApiError::BadRequest("audio must not be empty".into()));
  }

  let request = Recognize {
    audio,
    encoding: body.encoding.filter(|e| !e.trim().is_empty()),
    sample_rate_hertz: body.sample_rate_hertz,
    language: Language::parse_or_default(body.language.as_deref()),
  };
  let transcript = state
    .speech
    .transcribe(&request)
    .await
    .map_err(ApiError::upstream)?;
  Ok(Json(transcript))
}

#[derive(Debug, Deserialize)]
pub struct SynthesizeBody {
  pub text:     String,
  pub language: Option<String>,
  pub voice:    Option<String>,
}

/// `POST /speech/synthesize`
pub async fn synthesize<S, G>(
  State(state): State<AppState<S, G>>,
  _user: AuthUser,
  Json(body): Json<SynthesizeBody>,
) -> Result<Json<Value>, ApiError>
where
  S: DocumentStore,
  G: Generator,
{
  let text = body.text.trim();
  if text.is_empty() {
    return Err(ApiError::BadRequest("text must not be empty".into()));
  }
  if text.chars().count() > TEXT_CHAR_LIMIT {
    return Err(ApiError::BadRequest(format!(
      "text must be at most {TEXT_CHAR_LIMIT} characters"
    )));
  }

  let language = Language::parse_or_default(body.language.as_deref());
  let audio = state
    .speech
    .synthesize(text, language, body.voice.as_deref())
    .await
    .map_err(ApiError::upstream)?;
  Ok(Json(json!({ "audio": STANDARD.encode(audio), "encoding": "MP3" })))
}
