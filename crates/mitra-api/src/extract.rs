//! Extractors whose rejections use the API error shape.
//!
//! axum's own [`axum::Json`] and [`axum::extract::Query`] reject malformed
//! input with plain-text 400/415/422 responses. These wrappers route every
//! rejection through [`ApiError`] so clients always get `{"error": ...}`.

use axum::{
  extract::{
    FromRequest, FromRequestParts, OptionalFromRequest, Request,
    rejection::{JsonRejection, QueryRejection},
  },
  response::{IntoResponse, Response},
};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::ApiError;

/// A JSON request body or response.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
  fn into_response(self) -> Response { axum::Json(self.0).into_response() }
}

/// `Option<Json<T>>` is `None` when the request carries no JSON content type.
impl<T, S> OptionalFromRequest<S> for Json<T>
where
  T: DeserializeOwned,
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request(req: Request, state: &S) -> Result<Option<Self>, Self::Rejection> {
    let body = <axum::Json<T> as OptionalFromRequest<S>>::from_request(req, state).await?;
    Ok(body.map(|axum::Json(value)| Json(value)))
  }
}

/// Query-string parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct Query<T>(pub T);

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}
