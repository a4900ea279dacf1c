//! Integration tests for `SqliteStore` against an in-memory database.

use mitra_core::store::{DocQuery, Direction, DocumentStore, OrderBy, collections};
use serde_json::json;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

// ─── Single documents ────────────────────────────────────────────────────────

#[tokio::test]
async fn set_and_get_document() {
  let s = store().await;

  let doc = s
    .set(collections::JOURNAL_ENTRIES, "e1", json!({"userId": "u1", "content": "hi"}))
    .await
    .unwrap();
  assert_eq!(doc.id, "e1");
  assert_eq!(doc.collection, collections::JOURNAL_ENTRIES);

  let fetched = s.get(collections::JOURNAL_ENTRIES, "e1").await.unwrap().unwrap();
  assert_eq!(fetched.data["content"], "hi");
  assert_eq!(fetched.created_at, doc.created_at);
}

#[tokio::test]
async fn get_missing_returns_none() {
  let s = store().await;
  assert!(s.get(collections::JOURNAL_ENTRIES, "nope").await.unwrap().is_none());
}

#[tokio::test]
async fn collections_are_separate_namespaces() {
  let s = store().await;
  s.set(collections::MOOD_ENTRIES, "x", json!({"a": 1})).await.unwrap();
  assert!(s.get(collections::JOURNAL_ENTRIES, "x").await.unwrap().is_none());
}

#[tokio::test]
async fn set_replaces_but_keeps_created_at() {
  let s = store().await;
  let first = s
    .set(collections::PRACTICE_PROGRESS, "u1", json!({"xp": 10, "level": 1}))
    .await
    .unwrap();
  let second = s
    .set(collections::PRACTICE_PROGRESS, "u1", json!({"xp": 20}))
    .await
    .unwrap();

  assert_eq!(second.data, json!({"xp": 20}));
  assert_eq!(second.created_at, first.created_at);
  assert!(second.updated_at >= first.updated_at);
}

#[tokio::test]
async fn merge_creates_then_patches() {
  let s = store().await;
  let created = s
    .merge(collections::HEALTH_ENTRIES, "u1_2024-05-01", json!({"sleepHours": 6.5, "skip": null}))
    .await
    .unwrap();
  assert_eq!(created.data, json!({"sleepHours": 6.5}));

  let merged = s
    .merge(collections::HEALTH_ENTRIES, "u1_2024-05-01", json!({"steps": 4000}))
    .await
    .unwrap();
  assert_eq!(merged.data, json!({"sleepHours": 6.5, "steps": 4000}));
}

#[tokio::test]
async fn merge_is_per_key_last_write_wins() {
  let s = store().await;
  s.merge(
    collections::MEMORY_PROFILES,
    "u1",
    json!({"name": {"value": "Asha", "confidence": 0.9}, "preference_tea": {"value": "tea"}}),
  )
  .await
  .unwrap();
  let doc = s
    .merge(collections::MEMORY_PROFILES, "u1", json!({"name": {"value": "Asha Rao"}}))
    .await
    .unwrap();

  assert_eq!(doc.data["name"]["value"], "Asha Rao");
  assert_eq!(doc.data["name"]["confidence"], 0.9);
  assert_eq!(doc.data["preference_tea"]["value"], "tea");
}

#[tokio::test]
async fn non_object_bodies_are_rejected() {
  let s = store().await;
  let err = s.set(collections::CONVERSATIONS, "c1", json!([1, 2])).await.unwrap_err();
  assert!(matches!(err, Error::Core(mitra_core::Error::NotAnObject { .. })));

  let err = s.merge(collections::CONVERSATIONS, "c1", json!("text")).await.unwrap_err();
  assert!(matches!(err, Error::Core(mitra_core::Error::NotAnObject { .. })));
}

#[tokio::test]
async fn delete_reports_existence() {
  let s = store().await;
  s.set(collections::JOURNAL_ENTRIES, "e1", json!({})).await.unwrap();
  assert!(s.delete(collections::JOURNAL_ENTRIES, "e1").await.unwrap());
  assert!(!s.delete(collections::JOURNAL_ENTRIES, "e1").await.unwrap());
  assert!(s.get(collections::JOURNAL_ENTRIES, "e1").await.unwrap().is_none());
}

// ─── Queries ─────────────────────────────────────────────────────────────────

async fn seed_moods(s: &SqliteStore) {
  for (id, user, date, score) in [
    ("m1", "u1", "2024-05-01", 4),
    ("m2", "u1", "2024-05-03", 7),
    ("m3", "u2", "2024-05-02", 5),
    ("m4", "u1", "2024-05-02", 6),
  ] {
    s.set(
      collections::MOOD_ENTRIES,
      id,
      json!({"userId": user, "date": date, "score": score, "done": score > 5}),
    )
    .await
    .unwrap();
  }
}

fn ids(docs: &[mitra_core::store::Document]) -> Vec<&str> {
  docs.iter().map(|d| d.id.as_str()).collect()
}

#[tokio::test]
async fn list_filters_by_equality() {
  let s = store().await;
  seed_moods(&s).await;

  let q = DocQuery::new(collections::MOOD_ENTRIES).where_eq("userId", "u1");
  let docs = s.list(&q).await.unwrap();
  assert_eq!(ids(&docs), vec!["m1", "m2", "m4"]);

  let q = DocQuery::new(collections::MOOD_ENTRIES).where_eq("score", 5);
  assert_eq!(ids(&s.list(&q).await.unwrap()), vec!["m3"]);

  let q = DocQuery::new(collections::MOOD_ENTRIES).where_eq("done", true);
  assert_eq!(ids(&s.list(&q).await.unwrap()), vec!["m2", "m4"]);
}

#[tokio::test]
async fn list_orders_by_field_and_limits() {
  let s = store().await;
  seed_moods(&s).await;

  let q = DocQuery::new(collections::MOOD_ENTRIES)
    .where_eq("userId", "u1")
    .where_gte("date", "2024-05-02")
    .order_by(OrderBy::Field("date".into(), Direction::Desc));
  assert_eq!(ids(&s.list(&q).await.unwrap()), vec!["m2", "m4"]);

  let q = DocQuery::new(collections::MOOD_ENTRIES)
    .order_by(OrderBy::Field("date".into(), Direction::Asc))
    .limit(2);
  assert_eq!(ids(&s.list(&q).await.unwrap()), vec!["m1", "m3"]);
}

#[tokio::test]
async fn list_orders_by_creation() {
  let s = store().await;
  seed_moods(&s).await;

  let q = DocQuery::new(collections::MOOD_ENTRIES).order_by(OrderBy::CreatedAt(Direction::Desc));
  assert_eq!(ids(&s.list(&q).await.unwrap()), vec!["m4", "m3", "m2", "m1"]);
}

#[tokio::test]
async fn null_filters_match_missing_fields() {
  let s = store().await;
  s.set(collections::CONVERSATIONS, "a", json!({"emotion": "calm"})).await.unwrap();
  s.set(collections::CONVERSATIONS, "b", json!({"emotion": null})).await.unwrap();
  s.set(collections::CONVERSATIONS, "c", json!({})).await.unwrap();

  let q = DocQuery::new(collections::CONVERSATIONS).where_eq("emotion", serde_json::Value::Null);
  assert_eq!(ids(&s.list(&q).await.unwrap()), vec!["b", "c"]);
}

#[tokio::test]
async fn unsafe_field_names_are_rejected() {
  let s = store().await;
  let q = DocQuery::new(collections::MOOD_ENTRIES).where_eq("x') OR 1=1 --", "u1");
  let err = s.list(&q).await.unwrap_err();
  assert!(matches!(err, Error::Core(mitra_core::Error::InvalidField(_))));
}

#[tokio::test]
async fn structured_filter_values_are_rejected() {
  let s = store().await;
  let q = DocQuery::new(collections::MOOD_ENTRIES).where_eq("tags", json!(["a"]));
  let err = s.list(&q).await.unwrap_err();
  assert!(matches!(err, Error::Core(mitra_core::Error::UnsupportedFilter(_))));
}
