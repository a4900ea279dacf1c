//! Error types for `mitra-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Caller-supplied input violated an advisory invariant (empty content,
  /// out-of-range score, ...).
  #[error("validation failed: {0}")]
  Validation(String),

  #[error("invalid field name: {0:?}")]
  InvalidField(String),

  #[error("document {collection}/{id} must be a JSON object")]
  NotAnObject { collection: String, id: String },

  #[error("unsupported filter value for field {0:?}")]
  UnsupportedFilter(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub fn validation(message: impl Into<String>) -> Self {
    Self::Validation(message.into())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
