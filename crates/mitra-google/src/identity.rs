//! Identity Toolkit `accounts:lookup`: resolves a client ID token to the
//! account's `localId`.

use serde_json::{Value, json};

use crate::{Error, Result};

pub const DEFAULT_LOOKUP_URL: &str = "https://identitytoolkit.googleapis.com/v1/accounts:lookup";

const SERVICE: &str = "identity-toolkit";

#[derive(Clone)]
pub struct IdentityClient {
  client:  reqwest::Client,
  api_key: Option<String>,
  url:     String,
}

/// The first account's `localId`, if any.
pub fn local_id(body: &Value) -> Option<String> {
  body
    .pointer("/users/0/localId")
    .and_then(Value::as_str)
    .filter(|id| !id.is_empty())
    .map(str::to_owned)
}

impl IdentityClient {
  pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
    Self {
      client,
      api_key: api_key.filter(|k| !k.trim().is_empty()),
      url: DEFAULT_LOOKUP_URL.to_owned(),
    }
  }

  pub fn is_configured(&self) -> bool { self.api_key.is_some() }

  /// Look up the user behind `id_token`. `Ok(None)` means the token was
  /// rejected; `Err` means the lookup itself could not be performed.
  pub async fn lookup(&self, id_token: &str) -> Result<Option<String>> {
    let api_key = self.api_key.as_deref().ok_or(Error::NotConfigured(SERVICE))?;
    let resp = self
      .client
      .post(&self.url)
      .header(crate::API_KEY_HEADER, api_key)
      .json(&json!({ "idToken": id_token }))
      .send()
      .await?;

    let status = resp.status();
    if status == reqwest::StatusCode::BAD_REQUEST {
      return Ok(None);
    }
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      return Err(Error::Status { service: SERVICE, status: status.as_u16(), body });
    }
    let body: Value = resp.json().await?;
    Ok(local_id(&body))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn local_id_is_read_from_the_first_user() {
    let body = json!({ "users": [{ "localId": "abc123", "email": "a@example.com" }] });
    assert_eq!(local_id(&body).as_deref(), Some("abc123"));
    assert_eq!(local_id(&json!({ "users": [] })), None);
    assert_eq!(local_id(&json!({})), None);
  }

  #[tokio::test]
  async fn unconfigured_lookup_errors() {
    let client = IdentityClient::new(reqwest::Client::new(), None);
    assert!(matches!(client.lookup("t").await, Err(Error::NotConfigured(SERVICE))));
  }
}
