//! Router tests: requests driven through the full axum stack against an
//! in-memory store and a canned generator.

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
};
use mitra_core::generate::{GenerationRequest, Generator};
use mitra_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{AppState, ServerConfig, auth::DEV_USER_HEADER, router};

/// Answers every request with the same text, or fails when `None`.
#[derive(Clone)]
struct Canned(Option<&'static str>);

impl Generator for Canned {
  type Error = std::io::Error;

  async fn generate(&self, _request: GenerationRequest) -> Result<String, Self::Error> {
    self.0.map(str::to_owned).ok_or_else(|| std::io::Error::other("generator offline"))
  }
}

const OFFLINE: Canned = Canned(None);

async fn make_state(generator: Canned) -> AppState<SqliteStore, Canned> {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let config = ServerConfig { dev_mode: true, ..ServerConfig::default() };
  AppState::new(store, generator, config, reqwest::Client::new())
}

async fn call(
  state: &AppState<SqliteStore, Canned>,
  method: &str,
  uri: &str,
  user: Option<&str>,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(user) = user {
    builder = builder.header(DEV_USER_HEADER, user);
  }
  let body = match body {
    Some(json) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(json.to_string())
    }
    None => Body::empty(),
  };
  let resp = router(state.clone())
    .oneshot(builder.body(body).unwrap())
    .await
    .unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
  (status, value)
}

// ─── Gateway ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn healthz_needs_no_auth() {
  let state = make_state(OFFLINE).await;
  let resp = router(state)
    .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
    .await
    .unwrap();
  assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_credentials_are_401() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let state = AppState::new(store, OFFLINE, ServerConfig::default(), reqwest::Client::new());
  let resp = router(state)
    .oneshot(Request::get("/api/mood/streak").body(Body::empty()).unwrap())
    .await
    .unwrap();
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert_eq!(resp.headers()[header::WWW_AUTHENTICATE], "Bearer");
}

#[tokio::test]
async fn malformed_bodies_are_json_400s() {
  let state = make_state(OFFLINE).await;
  let cases = [
    ("/api/journal/entries", json!({ "mood": "good" })),
    ("/api/mood/entries", json!({ "score": "high" })),
    ("/api/mood/entries", json!({ "score": 7.5 })),
    ("/api/mitra/chat", json!({ "history": [] })),
    ("/api/health/entries", json!({ "date": "yesterday" })),
  ];
  for (uri, body) in cases {
    let (status, reply) = call(&state, "POST", uri, Some("alice"), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
    assert!(reply["error"].is_string(), "{uri}: {reply}");
  }

  let (status, reply) =
    call(&state, "GET", "/api/mood/history?days=lots", Some("alice"), None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(reply["error"].is_string());
}

#[tokio::test]
async fn non_json_bodies_are_json_400s() {
  let state = make_state(OFFLINE).await;
  let resp = router(state)
    .oneshot(
      Request::post("/api/mood/entries")
        .header(DEV_USER_HEADER, "alice")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap(),
    )
    .await
    .unwrap();
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let reply: Value = serde_json::from_slice(&bytes).unwrap();
  assert!(reply["error"].is_string());
}

// ─── Journal ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn journal_entry_is_analysed_and_listed() {
  let state = make_state(OFFLINE).await;
  let (status, created) = call(
    &state,
    "POST",
    "/api/journal/entries",
    Some("alice"),
    Some(json!({ "content": "I feel grateful and happy today", "mood": "good", "tags": ["Gratitude"] })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(created["success"], true);
  assert_eq!(created["entry"]["tags"], json!(["gratitude"]));

  let (status, listed) = call(&state, "GET", "/api/journal/sessions", Some("alice"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(listed["count"], 1);
  let entry = &listed["entries"][0];
  assert_eq!(entry["id"], created["id"]);
  assert_eq!(entry["insights"]["sentiment"], "positive");
  assert_eq!(entry["insights"]["source"], "fallback");

  let (_, others) = call(&state, "GET", "/api/journal/sessions", Some("bob"), None).await;
  assert_eq!(others["count"], 0);
}

#[tokio::test]
async fn empty_journal_content_is_400() {
  let state = make_state(OFFLINE).await;
  let (status, body) = call(
    &state,
    "POST",
    "/api/journal/entries",
    Some("alice"),
    Some(json!({ "content": "   " })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("content"));
}

#[tokio::test]
async fn journal_entries_are_private() {
  let state = make_state(OFFLINE).await;
  let (_, created) = call(
    &state,
    "POST",
    "/api/journal/entries",
    Some("alice"),
    Some(json!({ "content": "A quiet day." })),
  )
  .await;
  let uri = format!("/api/journal/entries/{}", created["id"].as_str().unwrap());

  let (status, _) = call(&state, "GET", &uri, Some("bob"), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  let (status, _) = call(&state, "DELETE", &uri, Some("bob"), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _) = call(&state, "DELETE", &uri, Some("alice"), None).await;
  assert_eq!(status, StatusCode::OK);
  let (status, _) = call(&state, "GET", &uri, Some("alice"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reflection_session_runs_to_completion() {
  let state = make_state(OFFLINE).await;
  let (status, started) = call(
    &state,
    "POST",
    "/api/journal/reflections",
    Some("alice"),
    Some(json!({ "before": 7, "topic": "work" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(started["source"], "fallback");
  assert_eq!(started["session"]["exchanges"].as_array().unwrap().len(), 1);
  let base = format!("/api/journal/reflections/{}", started["session"]["id"].as_str().unwrap());

  let (status, answered) = call(
    &state,
    "POST",
    &format!("{base}/respond"),
    Some("alice"),
    Some(json!({ "response": "Deadlines piling up." })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  let exchanges = answered["session"]["exchanges"].as_array().unwrap();
  assert_eq!(exchanges.len(), 2);
  assert_eq!(exchanges[0]["response"], "Deadlines piling up.");
  assert_ne!(exchanges[0]["prompt"], exchanges[1]["prompt"]);

  let (status, done) = call(
    &state,
    "POST",
    &format!("{base}/complete"),
    Some("alice"),
    Some(json!({ "after": 4 })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(done["session"]["status"], "completed");
  assert_eq!(done["session"]["emotionalState"], json!({ "before": 7, "after": 4 }));
  assert!(done["session"]["insights"][0].as_str().unwrap().contains("from 7 to 4"));

  let (status, _) = call(
    &state,
    "POST",
    &format!("{base}/respond"),
    Some("alice"),
    Some(json!({ "response": "one more thing" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = call(&state, "GET", &base, Some("bob"), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

// ─── Mood ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn mood_entries_update_streak_and_history() {
  let state = make_state(OFFLINE).await;
  let (status, created) = call(
    &state,
    "POST",
    "/api/mood/entries",
    Some("alice"),
    Some(json!({ "score": 7, "note": "  decent  " })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(created["entry"]["label"], "good");
  assert_eq!(created["entry"]["note"], "decent");
  assert_eq!(created["streak"]["current"], 1);

  let (status, _) = call(
    &state,
    "POST",
    "/api/mood/entries",
    Some("alice"),
    Some(json!({ "score": 11 })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, history) = call(&state, "GET", "/api/mood/history?days=7", Some("alice"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(history["entries"].as_array().unwrap().len(), 1);
  assert_eq!(history["average"], 7.0);

  let (_, streak) = call(&state, "GET", "/api/mood/streak", Some("alice"), None).await;
  assert_eq!(streak["current"], 1);
  assert_eq!(streak["longest"], 1);
}

// ─── Chat ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn chat_degrades_with_warnings_instead_of_failing() {
  let state = make_state(OFFLINE).await;
  let (status, reply) = call(
    &state,
    "POST",
    "/api/mitra/chat",
    Some("alice"),
    Some(json!({ "message": "My name is Asha and I feel low", "mode": "coach" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(reply["meta"]["fallback"], true);
  assert_eq!(reply["mode"], "coach");
  let warnings = reply["meta"]["warnings"].as_array().unwrap();
  assert!(warnings.contains(&json!("emotion_analysis_fallback")));
  assert!(warnings.contains(&json!("generation_failed")));
  assert_eq!(reply["memory"]["updates"][0]["value"], "Asha");

  let (_, memory) = call(&state, "GET", "/api/mitra/memory", Some("alice"), None).await;
  assert_eq!(memory["facts"][0]["value"], "Asha");

  let (_, history) = call(&state, "GET", "/api/mitra/history", Some("alice"), None).await;
  let turns = history["turns"].as_array().unwrap();
  assert_eq!(turns.len(), 2);
  assert_eq!(turns[0]["role"], "user");
  assert_eq!(turns[1]["role"], "assistant");

  let (status, _) = call(&state, "DELETE", "/api/mitra/memory", Some("alice"), None).await;
  assert_eq!(status, StatusCode::OK);
  let (_, memory) = call(&state, "GET", "/api/mitra/memory", Some("alice"), None).await;
  assert_eq!(memory["facts"], json!([]));
}

#[tokio::test]
async fn chat_strips_emotion_tags_from_replies() {
  let state = make_state(Canned(Some("That sounds heavy. [emotion: sad]"))).await;
  let (status, reply) = call(
    &state,
    "POST",
    "/api/mitra/chat",
    Some("alice"),
    Some(json!({ "message": "Everything went wrong today" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(reply["text"], "That sounds heavy.");
  assert_eq!(reply["meta"]["fallback"], false);
  assert_eq!(reply["emotion"]["emotion"]["label"], "sad");
}

#[tokio::test]
async fn empty_chat_message_is_400() {
  let state = make_state(OFFLINE).await;
  let (status, _) = call(
    &state,
    "POST",
    "/api/mitra/chat",
    Some("alice"),
    Some(json!({ "message": "" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ─── Practice ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_scenario_is_404() {
  let state = make_state(OFFLINE).await;
  let (status, _) = call(
    &state,
    "POST",
    "/api/practice/simulate",
    Some("alice"),
    Some(json!({ "scenarioId": "no-such-thing", "message": "hi" })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn simulation_falls_back_to_rule_feedback() {
  let state = make_state(OFFLINE).await;
  let (status, result) = call(
    &state,
    "POST",
    "/api/practice/simulate",
    Some("alice"),
    Some(json!({ "scenarioId": "asking-for-help", "message": "I feel stuck on this. Could you help me?" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(result["source"], "fallback");
  assert!(!result["reply"].as_str().unwrap().is_empty());
  assert!(result["feedback"]["score"].as_u64().unwrap() >= 7);
}

#[tokio::test]
async fn completing_a_scenario_awards_xp_and_badges() {
  let state = make_state(OFFLINE).await;
  let (status, done) = call(
    &state,
    "POST",
    "/api/practice/complete",
    Some("alice"),
    Some(json!({ "scenarioId": "asking-for-help", "score": 8 })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(done["progress"]["xp"], 105);
  assert_eq!(done["newBadges"], json!(["first-steps"]));

  let (_, progress) = call(&state, "GET", "/api/practice/progress", Some("alice"), None).await;
  assert_eq!(progress["xp"], 105);
  assert_eq!(progress["completedScenarios"], json!(["asking-for-help"]));

  let (status, _) = call(
    &state,
    "POST",
    "/api/practice/complete",
    Some("alice"),
    Some(json!({ "scenarioId": "asking-for-help", "score": 14 })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn scenario_catalog_is_listed() {
  let state = make_state(OFFLINE).await;
  let (status, body) = call(&state, "GET", "/api/practice/scenarios", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["scenarios"].as_array().unwrap().len(), 5);
}

// ─── Health ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_entries_merge_by_date() {
  let state = make_state(OFFLINE).await;
  let today = chrono::Utc::now().date_naive().to_string();
  call(
    &state,
    "POST",
    "/api/health/entries",
    Some("alice"),
    Some(json!({ "date": today, "sleepHours": 5.5 })),
  )
  .await;
  let (status, merged) = call(
    &state,
    "POST",
    "/api/health/entries",
    Some("alice"),
    Some(json!({ "date": today, "stress": 8 })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(merged["entry"]["sleepHours"], 5.5);
  assert_eq!(merged["entry"]["stress"], 8);

  let (_, listed) = call(&state, "GET", "/api/health/entries", Some("alice"), None).await;
  assert_eq!(listed["entries"].as_array().unwrap().len(), 1);

  let (status, _) = call(
    &state,
    "POST",
    "/api/health/entries",
    Some("alice"),
    Some(json!({ "date": today, "sleepHours": 30 })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_insights_lead_with_rules() {
  let state = make_state(OFFLINE).await;
  let today = chrono::Utc::now().date_naive().to_string();
  call(
    &state,
    "POST",
    "/api/health/entries",
    Some("alice"),
    Some(json!({ "date": today, "sleepHours": 5.0, "stress": 8, "steps": 9000, "mood": 6 })),
  )
  .await;

  let (status, report) =
    call(&state, "POST", "/api/health/insights", Some("alice"), Some(json!({}))).await;
  assert_eq!(status, StatusCode::OK);
  let categories: Vec<&str> = report["insights"]
    .as_array()
    .unwrap()
    .iter()
    .map(|i| i["category"].as_str().unwrap())
    .collect();
  assert_eq!(categories, vec!["sleep", "stress"]);
  assert_eq!(report["summary"]["days"], 1);

  let (_, empty) = call(&state, "POST", "/api/health/insights", Some("bob"), Some(json!({}))).await;
  assert_eq!(empty["insights"][0]["category"], "getting-started");
}

#[tokio::test]
async fn health_insights_need_no_body() {
  let state = make_state(OFFLINE).await;
  let (status, report) = call(&state, "POST", "/api/health/insights", Some("alice"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(report["insights"][0]["category"], "getting-started");

  let (status, _) =
    call(&state, "POST", "/api/health/insights", Some("alice"), Some(json!({ "days": 3 }))).await;
  assert_eq!(status, StatusCode::OK);
}

// ─── Soundscape and twin ──────────────────────────────────────────────────────

#[tokio::test]
async fn curated_sounds_are_recommended() {
  let state = make_state(OFFLINE).await;
  let (status, body) = call(
    &state,
    "POST",
    "/api/soundscape/recommendations",
    Some("alice"),
    Some(json!({ "mood": "anxious", "timeOfDay": "night" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["strategy"], "curated");
  assert_eq!(body["source"], "rules");
  let picks = body["recommendations"].as_array().unwrap();
  assert!((1..=3).contains(&picks.len()));

  let (status, _) = call(
    &state,
    "POST",
    "/api/soundscape/recommendations",
    Some("alice"),
    Some(json!({ "mood": "calm", "stress": 12 })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn twin_aggregates_features() {
  let state = make_state(OFFLINE).await;
  call(&state, "POST", "/api/mood/entries", Some("alice"), Some(json!({ "score": 6 }))).await;
  call(
    &state,
    "POST",
    "/api/journal/entries",
    Some("alice"),
    Some(json!({ "content": "Feeling anxious about exams" })),
  )
  .await;

  let (status, profile) = call(&state, "GET", "/api/digital-twin/profile", Some("alice"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(profile["mood"]["entries"], 1);
  assert_eq!(profile["journal"]["entries"], 1);
  assert_eq!(profile["journal"]["sentiments"]["negative"], 1);

  let (status, insights) =
    call(&state, "POST", "/api/digital-twin/insights", Some("alice"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(insights["source"], "fallback");
  assert!(!insights["narrative"]["summary"].as_str().unwrap().is_empty());
}

// ─── Speech ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unconfigured_speech_is_a_generic_500() {
  let state = make_state(OFFLINE).await;
  let (status, body) = call(
    &state,
    "POST",
    "/api/speech/synthesize",
    Some("alice"),
    Some(json!({ "text": "hello" })),
  )
  .await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert_eq!(body, json!({ "error": "internal server error" }));
}

#[tokio::test]
async fn malformed_audio_is_400() {
  let state = make_state(OFFLINE).await;
  let (status, _) = call(
    &state,
    "POST",
    "/api/speech/transcribe",
    Some("alice"),
    Some(json!({ "audio": "not base64!!" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = call(
    &state,
    "POST",
    "/api/speech/transcribe",
    Some("alice"),
    Some(json!({ "audio": "" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}
