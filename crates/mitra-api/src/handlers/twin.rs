//! Handlers for `/digital-twin` endpoints.

use axum::extract::State;
use mitra_core::{
  generate::Generator,
  journal::JournalEntry,
  store::{DocQuery, Direction, DocumentStore, OrderBy, collections},
  twin::{self, TwinSnapshot, TwinSources},
};
use serde_json::{Value, json};

use super::{decode_all, load_or_default, window_start};
use crate::{AppState, auth::AuthUser, error::ApiError, extract::Json};

const MOOD_DAYS: i64 = 30;
const HEALTH_DAYS: i64 = 7;
const JOURNAL_ENTRIES: usize = 20;

/// Gather everything the snapshot aggregates for `uid`.
async fn load_sources<S: DocumentStore>(store: &S, uid: &str) -> Result<TwinSources, ApiError> {
  let dated = |collection: &str, days: i64| {
    DocQuery::new(collection)
      .where_eq("userId", uid)
      .where_gte("date", window_start(days).to_string())
      .order_by(OrderBy::Field("date".into(), Direction::Asc))
  };

  let moods = store
    .list(&dated(collections::MOOD_ENTRIES, MOOD_DAYS))
    .await
    .map_err(ApiError::store)?;
  let health = store
    .list(&dated(collections::HEALTH_ENTRIES, HEALTH_DAYS))
    .await
    .map_err(ApiError::store)?;
  let journal_query = DocQuery::new(collections::JOURNAL_ENTRIES)
    .where_eq("userId", uid)
    .order_by(OrderBy::CreatedAt(Direction::Desc))
    .limit(JOURNAL_ENTRIES);
  let journal = store.list(&journal_query).await.map_err(ApiError::store)?;
  let journal: Vec<JournalEntry> = decode_all(&journal)?;

  Ok(TwinSources {
    moods: decode_all(&moods)?,
    journal,
    health: decode_all(&health)?,
    practice: load_or_default(store, collections::PRACTICE_PROGRESS, uid).await?,
    memory: load_or_default(store, collections::MEMORY_PROFILES, uid).await?,
    context: load_or_default(store, collections::ACTIVE_CONTEXTS, uid).await?,
  })
}

/// `GET /digital-twin/profile`
pub async fn profile<S, G>(
  State(state): State<AppState<S, G>>,
  user: AuthUser,
) -> Result<Json<TwinSnapshot>, ApiError>
where
  S: DocumentStore,
  G: Generator,
{
  let sources = load_sources(state.store.as_ref(), &user.uid).await?;
  Ok(Json(twin::build_snapshot(&sources)))
}

/// `POST /digital-twin/insights`: the snapshot plus a narrative about it.
pub async fn insights<S, G>(
  State(state): State<AppState<S, G>>,
  user: AuthUser,
) -> Result<Json<Value>, ApiError>
where
  S: DocumentStore,
  G: Generator,
{
  let sources = load_sources(state.store.as_ref(), &user.uid).await?;
  let snapshot = twin::build_snapshot(&sources);
  let narrative = twin::narrative(state.generator.as_ref(), &snapshot).await;
  let source = narrative.source();

  Ok(Json(json!({
    "snapshot": snapshot,
    "narrative": narrative.into_inner(),
    "source": source,
  })))
}
