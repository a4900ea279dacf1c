//! Handlers for `/soundscape` endpoints.

use axum::extract::State;
use mitra_core::{
  generate::Generator,
  soundscape::{self, CATALOG, Recommendations, SoundRequest},
  store::DocumentStore,
};
use serde_json::{Value, json};

use crate::{AppState, auth::AuthUser, error::ApiError, extract::Json};

/// `GET /soundscape/catalog`
pub async fn catalog() -> Json<Value> { Json(json!({ "sounds": CATALOG })) }

/// `POST /soundscape/recommendations`, using the configured strategy.
pub async fn recommend<S, G>(
  State(state): State<AppState<S, G>>,
  _user: AuthUser,
  Json(request): Json<SoundRequest>,
) -> Result<Json<Recommendations>, ApiError>
where
  S: DocumentStore,
  G: Generator,
{
  if request.mood.trim().is_empty() {
    return Err(ApiError::BadRequest("mood must not be empty".into()));
  }
  if let Some(stress) = request.stress
    && !(1..=10).contains(&stress)
  {
    return Err(ApiError::BadRequest("stress must be between 1 and 10".into()));
  }

  let strategy = state.config.sound_strategy;
  Ok(Json(soundscape::recommend(state.generator.as_ref(), strategy, &request).await))
}
