//! Handlers for `/journal` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/journal/entries` | Body: [`NewEntry`]; analysed inline, returns 201 |
//! | `GET`    | `/journal/entries/{id}` | 404 missing, 403 another user's |
//! | `DELETE` | `/journal/entries/{id}` | 404 missing, 403 another user's |
//! | `GET`    | `/journal/sessions` | `?limit` (default 20, max 100), newest first |
//! | `POST`   | `/journal/analyze` | Body: `{"content", "mood"?}` |
//! | `POST`   | `/journal/reflections` | Body: `{"before"?, "topic"?}`; returns 201 |
//! | `GET`    | `/journal/reflections/{id}` | |
//! | `POST`   | `/journal/reflections/{id}/respond` | Body: `{"response"}` |
//! | `POST`   | `/journal/reflections/{id}/complete` | Body: `{"after"?}` |

use axum::{
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use mitra_core::{
  generate::Generator,
  journal::{self, JournalEntry, JournalInsights, NewEntry, ReflectionSession},
  store::{DocQuery, Direction, DocumentStore, OrderBy, collections, encode},
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use super::{decode_all, owned};
use crate::{AppState, auth::AuthUser, error::ApiError, extract::{Json, Query}};

const DEFAULT_LIMIT: usize = 20;
const MAX_LIMIT: usize = 100;

// ─── Entries ──────────────────────────────────────────────────────────────────

/// `POST /journal/entries`
pub async fn create<S, G>(
  State(state): State<AppState<S, G>>,
  user: AuthUser,
  Json(body): Json<NewEntry>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocumentStore,
  G: Generator,
{
  let mut entry = body.into_entry(Uuid::new_v4().to_string(), user.uid, Utc::now())?;
  let analysis =
    journal::analyze(state.generator.as_ref(), &entry.content, entry.mood.as_deref()).await;
  entry.insights = Some(JournalInsights::from(analysis));

  state
    .store
    .set(collections::JOURNAL_ENTRIES, &entry.id, encode(&entry)?)
    .await
    .map_err(ApiError::store)?;

  Ok((
    StatusCode::CREATED,
    Json(json!({ "success": true, "id": entry.id, "entry": entry })),
  ))
}

/// `GET /journal/entries/{id}`
pub async fn get_one<S, G>(
  State(state): State<AppState<S, G>>,
  user: AuthUser,
  Path(id): Path<String>,
) -> Result<Json<JournalEntry>, ApiError>
where
  S: DocumentStore,
  G: Generator,
{
  let doc = state
    .store
    .get(collections::JOURNAL_ENTRIES, &id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(owned(doc, &user.uid, "journal entry")?))
}

/// `DELETE /journal/entries/{id}`
pub async fn delete_one<S, G>(
  State(state): State<AppState<S, G>>,
  user: AuthUser,
  Path(id): Path<String>,
) -> Result<Json<Value>, ApiError>
where
  S: DocumentStore,
  G: Generator,
{
  let doc = state
    .store
    .get(collections::JOURNAL_ENTRIES, &id)
    .await
    .map_err(ApiError::store)?;
  let _: JournalEntry = owned(doc, &user.uid, "journal entry")?;

  state
    .store
    .delete(collections::JOURNAL_ENTRIES, &id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub limit: Option<usize>,
}

/// `GET /journal/sessions[?limit=N]`
pub async fn list<S, G>(
  State(state): State<AppState<S, G>>,
  user: AuthUser,
  Query(params): Query<ListParams>,
) -> Result<Json<Value>, ApiError>
where
  S: DocumentStore,
  G: Generator,
{
  let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
  let query = DocQuery::new(collections::JOURNAL_ENTRIES)
    .where_eq("userId", user.uid.as_str())
    .order_by(OrderBy::CreatedAt(Direction::Desc))
    .limit(limit);
  let docs = state.store.list(&query).await.map_err(ApiError::store)?;
  let entries: Vec<JournalEntry> = decode_all(&docs)?;

  Ok(Json(json!({ "entries": entries, "count": entries.len() })))
}

// ─── Analysis ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AnalyzeBody {
  pub content: String,
  pub mood:    Option<String>,
}

/// `POST /journal/analyze`
pub async fn analyze<S, G>(
  State(state): State<AppState<S, G>>,
  _user: AuthUser,
  Json(body): Json<AnalyzeBody>,
) -> Result<Json<JournalInsights>, ApiError>
where
  S: DocumentStore,
  G: Generator,
{
  let content = body.content.trim();
  if content.is_empty() {
    return Err(ApiError::BadRequest("content must not be empty".into()));
  }
  let analysis = journal::analyze(state.generator.as_ref(), content, body.mood.as_deref()).await;
  Ok(Json(analysis.into()))
}

// ─── Reflection sessions ──────────────────────────────────────────────────────

async fn load_session<S, G>(
  state: &AppState<S, G>,
  uid: &str,
  id: &str,
) -> Result<ReflectionSession, ApiError>
where
  S: DocumentStore,
{
  let doc = state
    .store
    .get(collections::REFLECTION_SESSIONS, id)
    .await
    .map_err(ApiError::store)?;
  owned(doc, uid, "reflection session")
}

async fn save_session<S, G>(
  state: &AppState<S, G>,
  session: &ReflectionSession,
) -> Result<(), ApiError>
where
  S: DocumentStore,
{
  state
    .store
    .set(collections::REFLECTION_SESSIONS, &session.id, encode(session)?)
    .await
    .map_err(ApiError::store)?;
  Ok(())
}

#[derive(Debug, Default, Deserialize)]
pub struct StartBody {
  pub before: Option<u8>,
  pub topic:  Option<String>,
}

/// `POST /journal/reflections`
pub async fn start_reflection<S, G>(
  State(state): State<AppState<S, G>>,
  user: AuthUser,
  Json(body): Json<StartBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DocumentStore,
  G: Generator,
{
  let now = Utc::now();
  let mut session =
    ReflectionSession::start(Uuid::new_v4().to_string(), user.uid, body.topic, body.before, now)?;
  let prompt = journal::next_prompt(state.generator.as_ref(), &session).await;
  let source = prompt.source();
  session.push_prompt(prompt.into_inner(), now);
  save_session(&state, &session).await?;

  Ok((StatusCode::CREATED, Json(json!({ "session": session, "source": source }))))
}

/// `GET /journal/reflections/{id}`
pub async fn get_reflection<S, G>(
  State(state): State<AppState<S, G>>,
  user: AuthUser,
  Path(id): Path<String>,
) -> Result<Json<ReflectionSession>, ApiError>
where
  S: DocumentStore,
  G: Generator,
{
  Ok(Json(load_session(&state, &user.uid, &id).await?))
}

#[derive(Debug, Deserialize)]
pub struct RespondBody {
  pub response: String,
}

/// `POST /journal/reflections/{id}/respond`
pub async fn respond<S, G>(
  State(state): State<AppState<S, G>>,
  user: AuthUser,
  Path(id): Path<String>,
  Json(body): Json<RespondBody>,
) -> Result<Json<Value>, ApiError>
where
  S: DocumentStore,
  G: Generator,
{
  let mut session = load_session(&state, &user.uid, &id).await?;
  session.record_response(&body.response)?;

  let prompt = journal::next_prompt(state.generator.as_ref(), &session).await;
  let source = prompt.source();
  session.push_prompt(prompt.into_inner(), Utc::now());
  save_session(&state, &session).await?;

  Ok(Json(json!({ "session": session, "source": source })))
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteBody {
  pub after: Option<u8>,
}

/// `POST /journal/reflections/{id}/complete`
pub async fn complete<S, G>(
  State(state): State<AppState<S, G>>,
  user: AuthUser,
  Path(id): Path<String>,
  Json(body): Json<CompleteBody>,
) -> Result<Json<Value>, ApiError>
where
  S: DocumentStore,
  G: Generator,
{
  let mut session = load_session(&state, &user.uid, &id).await?;
  if !session.is_active() {
    return Err(ApiError::BadRequest("session is already completed".into()));
  }

  let insights = journal::closing_insights(state.generator.as_ref(), &session, body.after).await;
  let source = insights.source();
  session.complete(body.after, insights.into_inner(), Utc::now())?;
  save_session(&state, &session).await?;

  Ok(Json(json!({ "session": session, "source": source })))
}
