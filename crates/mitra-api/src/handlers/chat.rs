//! Handlers for `/mitra` endpoints: the conversational companion.

use axum::extract::State;
use mitra_core::{
  conversation::{ActiveContext, StoredTurn},
  generate::Generator,
  memory::MemoryProfile,
  orchestrator::{ChatInput, ChatOutput, Orchestrator},
  store::{DocQuery, Direction, DocumentStore, OrderBy, collections},
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{decode_all, load_or_default};
use crate::{AppState, auth::AuthUser, error::ApiError, extract::{Json, Query}};

const DEFAULT_HISTORY: usize = 50;
const MAX_HISTORY: usize = 200;

/// `POST /mitra/chat`
///
/// Answers 200 whenever a reply was produced, degraded or not; the
/// degradations are listed in `meta.warnings`.
pub async fn chat<S, G>(
  State(state): State<AppState<S, G>>,
  user: AuthUser,
  Json(input): Json<ChatInput>,
) -> Result<Json<ChatOutput>, ApiError>
where
  S: DocumentStore,
  G: Generator,
{
  let orchestrator = Orchestrator::new(state.store.as_ref(), state.generator.as_ref());
  Ok(Json(orchestrator.respond(&user.uid, input).await?))
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
  pub limit: Option<usize>,
}

/// `GET /mitra/history[?limit=N]`: the most recent stored turns, oldest
/// first.
pub async fn history<S, G>(
  State(state): State<AppState<S, G>>,
  user: AuthUser,
  Query(params): Query<HistoryParams>,
) -> Result<Json<Value>, ApiError>
where
  S: DocumentStore,
  G: Generator,
{
  let limit = params.limit.unwrap_or(DEFAULT_HISTORY).clamp(1, MAX_HISTORY);
  let query = DocQuery::new(collections::CONVERSATIONS)
    .where_eq("userId", user.uid.as_str())
    .order_by(OrderBy::CreatedAt(Direction::Desc))
    .limit(limit);
  let docs = state.store.list(&query).await.map_err(ApiError::store)?;
  let mut turns: Vec<StoredTurn> = decode_all(&docs)?;
  turns.reverse();

  Ok(Json(json!({ "turns": turns })))
}

/// `GET /mitra/memory`
pub async fn memory<S, G>(
  State(state): State<AppState<S, G>>,
  user: AuthUser,
) -> Result<Json<Value>, ApiError>
where
  S: DocumentStore,
  G: Generator,
{
  let profile: MemoryProfile =
    load_or_default(state.store.as_ref(), collections::MEMORY_PROFILES, &user.uid).await?;
  let context: ActiveContext =
    load_or_default(state.store.as_ref(), collections::ACTIVE_CONTEXTS, &user.uid).await?;

  Ok(Json(json!({
    "facts": profile.recall(usize::MAX),
    "dominantEmotion": context.dominant_emotion(),
  })))
}

/// `DELETE /mitra/memory`: forget remembered facts and the rolling context.
/// Stored conversation turns are kept.
pub async fn forget<S, G>(
  State(state): State<AppState<S, G>>,
  user: AuthUser,
) -> Result<Json<Value>, ApiError>
where
  S: DocumentStore,
  G: Generator,
{
  for collection in [collections::MEMORY_PROFILES, collections::ACTIVE_CONTEXTS] {
    state
      .store
      .delete(collection, &user.uid)
      .await
      .map_err(ApiError::store)?;
  }
  Ok(Json(json!({ "success": true })))
}
