//! Handlers for `/mood` endpoints.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use mitra_core::{
  generate::Generator,
  mood::{self, MoodEntry, NewMood, Streak},
  store::{DocQuery, Direction, DocumentStore, OrderBy, collections, encode},
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use super::{decode_all, window_start};
use crate::{AppState, auth::AuthUser, error::ApiError, extract::{Json, Query}};

const DEFAULT_DAYS: i64 = 30;
const MAX_DAYS: i64 = 365;

async fn current_streak<S: DocumentStore>(store: &S, uid: &str) -> Result<Streak, ApiError> {
  let query = DocQuery::new(collections::MOOD_ENTRIES).where_eq("userId", uid);
  let docs = store.list(&query).await.map_err(ApiError::store)?;
  let entries: Vec<MoodEntry> = decode_all(&docs)?;
  Ok(mood::streak(entries.iter().map(|e| e.date), Utc::now().date_naive()))
}

/// `POST /mood/entries`
pub async fn create<S, G>(
  State(state): State<AppState<S, G>>,
  user: AuthUser,
  Json(body): Json<NewMood>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocumentStore,
  G: Generator,
{
  let entry = body.into_entry(Uuid::new_v4().to_string(), user.uid, Utc::now())?;
  state
    .store
    .set(collections::MOOD_ENTRIES, &entry.id, encode(&entry)?)
    .await
    .map_err(ApiError::store)?;

  let streak = current_streak(state.store.as_ref(), &entry.user_id).await?;
  Ok((
    StatusCode::CREATED,
    Json(json!({ "success": true, "id": entry.id, "entry": entry, "streak": streak })),
  ))
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
  pub days: Option<i64>,
}

/// `GET /mood/history[?days=N]`: entries from the last `days` days, oldest
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
  let days = params.days.unwrap_or(DEFAULT_DAYS).clamp(1, MAX_DAYS);
  let query = DocQuery::new(collections::MOOD_ENTRIES)
    .where_eq("userId", user.uid.as_str())
    .where_gte("date", window_start(days).to_string())
    .order_by(OrderBy::Field("date".into(), Direction::Asc));
  let docs = state.store.list(&query).await.map_err(ApiError::store)?;
  let entries: Vec<MoodEntry> = decode_all(&docs)?;

  let scores: Vec<u8> = entries.iter().map(|e| e.score).collect();
  Ok(Json(json!({
    "days": days,
    "entries": entries,
    "average": mood::average(&scores),
    "trend": mood::trend(&scores),
  })))
}

/// `GET /mood/streak`
pub async fn streak<S, G>(
  State(state): State<AppState<S, G>>,
  user: AuthUser,
) -> Result<Json<Streak>, ApiError>
where
  S: DocumentStore,
  G: Generator,
{
  Ok(Json(current_streak(state.store.as_ref(), &user.uid).await?))
}
