//! Per-feature axum handlers.
//!
//! Every handler follows the same shape: validate the body, read or write
//! the store, optionally consult the generator, shape the JSON.

pub mod chat;
pub mod health;
pub mod journal;
pub mod mood;
pub mod practice;
pub mod soundscape;
pub mod speech;
pub mod twin;

use chrono::{Duration, NaiveDate, Utc};
use mitra_core::store::{Document, DocumentStore};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

/// Decode a document that must exist and belong to `uid`.
pub(crate) fn owned<T: DeserializeOwned>(
  doc: Option<Document>,
  uid: &str,
  what: &str,
) -> Result<T, ApiError> {
  let doc = doc.ok_or_else(|| ApiError::NotFound(format!("{what} not found")))?;
  if doc.data.get("userId").and_then(Value::as_str) != Some(uid) {
    return Err(ApiError::Forbidden);
  }
  Ok(doc.decode()?)
}

pub(crate) fn decode_all<T: DeserializeOwned>(docs: &[Document]) -> Result<Vec<T>, ApiError> {
  docs
    .iter()
    .map(|d| d.decode().map_err(ApiError::from))
    .collect()
}

/// A per-user singleton document, or its default when none is stored yet.
pub(crate) async fn load_or_default<S, T>(
  store: &S,
  collection: &str,
  id: &str,
) -> Result<T, ApiError>
where
  S: DocumentStore,
  T: DeserializeOwned + Default,
{
  match store.get(collection, id).await.map_err(ApiError::store)? {
    Some(doc) => Ok(doc.decode()?),
    None => Ok(T::default()),
  }
}

/// The first day of a window of `days` days ending today.
pub(crate) fn window_start(days: i64) -> NaiveDate {
  Utc::now().date_naive() - Duration::days(days - 1)
}
