//! Handlers for `/health` endpoints: daily wellbeing metrics.

use axum::extract::State;
use chrono::Utc;
use mitra_core::{
  generate::Generator,
  health::{self, HealthEntry, InsightReport},
  store::{DocQuery, Direction, DocumentStore, OrderBy, collections, encode},
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{decode_all, window_start};
use crate::{AppState, auth::AuthUser, error::ApiError, extract::{Json, Query}};

const DEFAULT_DAYS: i64 = 7;
const MAX_DAYS: i64 = 90;

/// `POST /health/entries`: merge the given metrics into the day's document.
pub async fn upsert<S, G>(
  State(state): State<AppState<S, G>>,
  user: AuthUser,
  Json(mut entry): Json<HealthEntry>,
) -> Result<Json<Value>, ApiError>
where
  S: DocumentStore,
  G: Generator,
{
  entry.validate()?;
  entry.user_id = user.uid;
  entry.updated_at = Some(Utc::now());

  let id = HealthEntry::doc_id(&entry.user_id, entry.date);
  let doc = state
    .store
    .merge(collections::HEALTH_ENTRIES, &id, encode(&entry)?)
    .await
    .map_err(ApiError::store)?;
  let merged: HealthEntry = doc.decode()?;

  Ok(Json(json!({ "success": true, "id": id, "entry": merged })))
}

async fn recent_entries<S: DocumentStore>(
  store: &S,
  uid: &str,
  days: Option<i64>,
) -> Result<Vec<HealthEntry>, ApiError> {
  let days = days.unwrap_or(DEFAULT_DAYS).clamp(1, MAX_DAYS);
  let query = DocQuery::new(collections::HEALTH_ENTRIES)
    .where_eq("userId", uid)
    .where_gte("date", window_start(days).to_string())
    .order_by(OrderBy::Field("date".into(), Direction::Asc));
  let docs = store.list(&query).await.map_err(ApiError::store)?;
  decode_all(&docs)
}

#[derive(Debug, Default, Deserialize)]
pub struct DaysParams {
  pub days: Option<i64>,
}

/// `GET /health/entries[?days=N]`, oldest first.
pub async fn list<S, G>(
  State(state): State<AppState<S, G>>,
  user: AuthUser,
  Query(params): Query<DaysParams>,
) -> Result<Json<Value>, ApiError>
where
  S: DocumentStore,
  G: Generator,
{
  let entries = recent_entries(state.store.as_ref(), &user.uid, params.days).await?;
  Ok(Json(json!({ "entries": entries })))
}

/// `POST /health/insights`. The `{days}` body is optional.
pub async fn insights<S, G>(
  State(state): State<AppState<S, G>>,
  user: AuthUser,
  body: Option<Json<DaysParams>>,
) -> Result<Json<InsightReport>, ApiError>
where
  S: DocumentStore,
  G: Generator,
{
  let days = body.and_then(|Json(params)| params.days);
  let entries = recent_entries(state.store.as_ref(), &user.uid, days).await?;
  Ok(Json(health::report(state.generator.as_ref(), &entries).await))
}
