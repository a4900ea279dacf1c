//! Handlers for `/practice` endpoints: social-skill scenario simulations.

use axum::extract::State;
use chrono::Utc;
use mitra_core::{
  conversation::Turn,
  generate::Generator,
  practice::{self, PracticeProgress, SCENARIOS, Scenario},
  store::{DocumentStore, collections, encode},
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::load_or_default;
use crate::{AppState, auth::AuthUser, error::ApiError, extract::Json};

fn find_scenario(id: &str) -> Result<&'static Scenario, ApiError> {
  practice::scenario(id).ok_or_else(|| ApiError::NotFound(format!("unknown scenario: {id}")))
}

/// `GET /practice/scenarios`
pub async fn scenarios() -> Json<Value> { Json(json!({ "scenarios": SCENARIOS })) }

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateBody {
  pub scenario_id: String,
  pub message:     String,
  #[serde(default)]
  pub history:     Vec<Turn>,
}

/// `POST /practice/simulate`
pub async fn simulate<S, G>(
  State(state): State<AppState<S, G>>,
  _user: AuthUser,
  Json(body): Json<SimulateBody>,
) -> Result<Json<Value>, ApiError>
where
  S: DocumentStore,
  G: Generator,
{
  let scenario = find_scenario(&body.scenario_id)?;
  let message = body.message.trim();
  if message.is_empty() {
    return Err(ApiError::BadRequest("message must not be empty".into()));
  }

  let result =
    practice::simulate(state.generator.as_ref(), scenario, &body.history, message).await;
  let source = result.source();
  let result = result.into_inner();
  Ok(Json(json!({
    "scenarioId": scenario.id,
    "reply": result.reply,
    "feedback": result.feedback,
    "source": source,
  })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteBody {
  pub scenario_id: String,
  pub score:       i64,
}

/// `POST /practice/complete`
pub async fn complete<S, G>(
  State(state): State<AppState<S, G>>,
  user: AuthUser,
  Json(body): Json<CompleteBody>,
) -> Result<Json<Value>, ApiError>
where
  S: DocumentStore,
  G: Generator,
{
  let scenario = find_scenario(&body.scenario_id)?;
  let mut progress: PracticeProgress =
    load_or_default(state.store.as_ref(), collections::PRACTICE_PROGRESS, &user.uid).await?;
  let new_badges = progress.record_completion(scenario, body.score, Utc::now())?;

  state
    .store
    .set(collections::PRACTICE_PROGRESS, &user.uid, encode(&progress)?)
    .await
    .map_err(ApiError::store)?;

  Ok(Json(json!({ "progress": progress, "newBadges": new_badges })))
}

/// `GET /practice/progress`
pub async fn progress<S, G>(
  State(state): State<AppState<S, G>>,
  user: AuthUser,
) -> Result<Json<PracticeProgress>, ApiError>
where
  S: DocumentStore,
  G: Generator,
{
  Ok(Json(
    load_or_default(state.store.as_ref(), collections::PRACTICE_PROGRESS, &user.uid).await?,
  ))
}
