//! Bearer-token extractor.
//!
//! The client sends `Authorization: Bearer <idToken>`; the token is resolved
//! to a user id through the Identity Toolkit. In development mode the
//! `x-dev-user` header (or the configured `dev_user`) is trusted instead.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use mitra_google::IdentityClient;
use tracing::{debug, warn};

use crate::{AppState, ServerConfig, error::ApiError};

pub const DEV_USER_HEADER: &str = "x-dev-user";

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
  pub uid: String,
}

fn header_str<'a>(headers: &'a HeaderMap, name: impl header::AsHeaderName) -> Option<&'a str> {
  headers
    .get(name)
    .and_then(|v| v.to_str().ok())
    .map(str::trim)
    .filter(|v| !v.is_empty())
}

/// The token from an `Authorization: Bearer` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  let value = header_str(headers, header::AUTHORIZATION)?;
  let (scheme, token) = value.split_once(' ')?;
  let token = token.trim();
  (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// The development identity, when `dev_mode` is on.
fn dev_user(headers: &HeaderMap, config: &ServerConfig) -> Option<String> {
  if !config.dev_mode {
    return None;
  }
  header_str(headers, DEV_USER_HEADER)
    .map(str::to_owned)
    .or_else(|| config.dev_user.clone().filter(|u| !u.trim().is_empty()))
}

/// Resolve the caller from request headers.
pub async fn authenticate(
  headers: &HeaderMap,
  config: &ServerConfig,
  identity: &IdentityClient,
) -> Result<AuthUser, ApiError> {
  if let Some(uid) = dev_user(headers, config) {
    debug!(%uid, "dev-mode identity");
    return Ok(AuthUser { uid });
  }

  let token = bearer_token(headers).ok_or(ApiError::Unauthorized)?;
  match identity.lookup(token).await {
    Ok(Some(uid)) => Ok(AuthUser { uid }),
    Ok(None) => Err(ApiError::Unauthorized),
    Err(mitra_google::Error::NotConfigured(_)) => {
      warn!("bearer token presented but identity lookup is not configured");
      Err(ApiError::Unauthorized)
    }
    Err(e) => Err(ApiError::upstream(e)),
  }
}

impl<S, G> FromRequestParts<AppState<S, G>> for AuthUser
where
  S: Send + Sync,
  G: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, G>,
  ) -> Result<Self, Self::Rejection> {
    authenticate(&parts.headers, &state.config, &state.identity).await
  }
}
