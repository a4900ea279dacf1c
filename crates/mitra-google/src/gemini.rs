//! Gemini `generateContent` client.

use mitra_core::generate::{GenerationRequest, Generator};
use serde_json::{Value, json};
use tracing::debug;

use crate::{Error, Result, post_json};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

const SERVICE: &str = "gemini";

/// A [`Generator`] backed by the Gemini REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct GeminiClient {
  client:   reqwest::Client,
  api_key:  Option<String>,
  model:    String,
  base_url: String,
}

impl GeminiClient {
  pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
    Self {
      client,
      api_key: api_key.filter(|k| !k.trim().is_empty()),
      model: DEFAULT_MODEL.to_owned(),
      base_url: DEFAULT_BASE_URL.to_owned(),
    }
  }

  pub fn with_model(mut self, model: impl Into<String>) -> Self {
    self.model = model.into();
    self
  }

  pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
    self.base_url = base_url.into();
    self
  }

  pub fn is_configured(&self) -> bool { self.api_key.is_some() }

  fn url(&self) -> String {
    format!(
      "{}/v1beta/models/{}:generateContent",
      self.base_url.trim_end_matches('/'),
      self.model
    )
  }
}

/// The `generateContent` request body for `request`.
pub fn request_body(request: &GenerationRequest) -> Value {
  let mut config = json!({
    "temperature": request.temperature,
    "maxOutputTokens": request.max_output_tokens,
  });
  if request.json {
    config["responseMimeType"] = json!("application/json");
  }
  json!({
    "contents": [{ "role": "user", "parts": [{ "text": request.prompt }] }],
    "generationConfig": config,
  })
}

/// The first candidate's text parts, joined. `None` when there is no
/// non-blank text.
pub fn response_text(body: &Value) -> Option<String> {
  let parts = body.pointer("/candidates/0/content/parts")?.as_array()?;
  let text: String = parts
    .iter()
    .filter_map(|p| p.get("text").and_then(Value::as_str))
    .collect();
  (!text.trim().is_empty()).then_some(text)
}

impl Generator for GeminiClient {
  type Error = Error;

  async fn generate(&self, request: GenerationRequest) -> Result<String> {
    debug!(
      model = %self.model,
      prompt_chars = request.prompt.chars().count(),
      json = request.json,
      "calling gemini"
    );
    let body = post_json(
      &self.client,
      SERVICE,
      &self.url(),
      self.api_key.as_deref(),
      &request_body(&request),
    )
    .await?;
    response_text(&body).ok_or(Error::Empty(SERVICE))
  }
}
