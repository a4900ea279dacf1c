//! Error type for `mitra-google`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// The service answered with a non-success status.
  #[error("{service} returned {status}: {body}")]
  Status {
    service: &'static str,
    status:  u16,
    body:    String,
  },

  #[error("{0} returned no usable content")]
  Empty(&'static str),

  /// No API key was configured for the service.
  #[error("{0} is not configured")]
  NotConfigured(&'static str),

  #[error("base64 decode error: {0}")]
  Base64(#[from] base64::DecodeError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
