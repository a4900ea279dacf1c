//! HTTP clients for the Google services behind Mitra: Gemini text
//! generation, Cloud Speech-to-Text / Text-to-Speech, and Identity Toolkit
//! token lookup.
//!
//! Every client shares one [`reqwest::Client`] and authenticates with an API
//! key sent in the `x-goog-api-key` header. A client built without a key
//! fails every call with [`Error::NotConfigured`].

use std::time::Duration;

use serde_json::Value;
use tracing::warn;

pub mod error;
pub mod gemini;
pub mod identity;
pub mod speech;

pub use error::{Error, Result};
pub use gemini::GeminiClient;
pub use identity::IdentityClient;
pub use speech::SpeechClient;

const API_KEY_HEADER: &str = "x-goog-api-key";
/// Longest upstream error body kept in an [`Error::Status`].
const ERROR_BODY_LIMIT: usize = 512;

/// The shared HTTP client. No retries; `timeout` bounds each call.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
  Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// POST `body` as JSON and return the parsed JSON response. Non-success
/// statuses become [`Error::Status`] with a truncated body.
async fn post_json(
  client: &reqwest::Client,
  service: &'static str,
  url: &str,
  api_key: Option<&str>,
  body: &Value,
) -> Result<Value> {
  let api_key = api_key.ok_or(Error::NotConfigured(service))?;
  let resp = client
    .post(url)
    .header(API_KEY_HEADER, api_key)
    .json(body)
    .send()
    .await?;

  let status = resp.status();
  if !status.is_success() {
    let body: String = resp.text().await.unwrap_or_default().chars().take(ERROR_BODY_LIMIT).collect();
    warn!(service, status = status.as_u16(), "upstream call failed");
    return Err(Error::Status { service, status: status.as_u16(), body });
  }
  Ok(resp.json().await?)
}
