//! In-process test doubles for the store and generator traits.

use std::{
  collections::{BTreeMap, VecDeque},
  sync::Mutex,
};

use chrono::Utc;
use serde_json::Value;

use crate::{
  generate::{GenerationRequest, Generator},
  store::{DocQuery, Document, DocumentStore, FilterOp},
};

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct StubError(pub &'static str);

// ─── Generator ───────────────────────────────────────────────────────────────

/// Replays scripted responses in order; `None` entries (and an exhausted
/// script) produce errors. Every received prompt is recorded.
pub struct ScriptedGenerator {
  script:  Mutex<VecDeque<Option<String>>>,
  pub seen: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
  pub fn new(script: Vec<Option<&str>>) -> Self {
    Self {
      script: Mutex::new(script.into_iter().map(|s| s.map(str::to_owned)).collect()),
      seen:   Mutex::new(Vec::new()),
    }
  }

  pub fn failing() -> Self { Self::new(Vec::new()) }

  pub fn prompts(&self) -> Vec<String> {
    self.seen.lock().unwrap().iter().map(|r| r.prompt.clone()).collect()
  }
}

impl Generator for ScriptedGenerator {
  type Error = StubError;

  async fn generate(&self, request: GenerationRequest) -> Result<String, StubError> {
    self.seen.lock().unwrap().push(request);
    self
      .script
      .lock()
      .unwrap()
      .pop_front()
      .flatten()
      .ok_or(StubError("generator offline"))
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

fn merge_patch(target: &mut Value, patch: Value) {
  match (target, patch) {
    (Value::Object(t), Value::Object(p)) => {
      for (k, v) in p {
        if v.is_null() {
          t.remove(&k);
        } else {
          merge_patch(t.entry(k).or_insert(Value::Null), v);
        }
      }
    }
    (t, p) => *t = p,
  }
}

/// A `BTreeMap`-backed store. Ordering in `list` follows insertion keys; tests
/// that need ordering sort explicitly.
#[derive(Default)]
pub struct MemoryStore {
  docs: Mutex<BTreeMap<(String, String), Document>>,
}

impl MemoryStore {
  fn write(&self, collection: &str, id: &str, data: Value, merge: bool) -> Document {
    let now = Utc::now();
    let mut docs = self.docs.lock().unwrap();
    let doc = docs
      .entry((collection.to_owned(), id.to_owned()))
      .or_insert_with(|| Document {
        id:         id.to_owned(),
        collection: collection.to_owned(),
        data:       Value::Object(Default::default()),
        created_at: now,
        updated_at: now,
      });
    if merge {
      merge_patch(&mut doc.data, data);
    } else {
      doc.data = data;
    }
    doc.updated_at = now;
    doc.clone()
  }
}

impl DocumentStore for MemoryStore {
  type Error = StubError;

  async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StubError> {
    let docs = self.docs.lock().unwrap();
    Ok(docs.get(&(collection.to_owned(), id.to_owned())).cloned())
  }

  async fn set(&self, collection: &str, id: &str, data: Value) -> Result<Document, StubError> {
    Ok(self.write(collection, id, data, false))
  }

  async fn merge(&self, collection: &str, id: &str, data: Value) -> Result<Document, StubError> {
    Ok(self.write(collection, id, data, true))
  }

  async fn delete(&self, collection: &str, id: &str) -> Result<bool, StubError> {
    let mut docs = self.docs.lock().unwrap();
    Ok(docs.remove(&(collection.to_owned(), id.to_owned())).is_some())
  }

  async fn list(&self, query: &DocQuery) -> Result<Vec<Document>, StubError> {
    let docs = self.docs.lock().unwrap();
    let mut out: Vec<Document> = docs
      .values()
      .filter(|d| d.collection == query.collection)
      .filter(|d| {
        query.filters.iter().all(|f| {
          let field = d.data.get(&f.field);
          match f.op {
            FilterOp::Eq => field == Some(&f.value),
            FilterOp::Gte => field
              .and_then(Value::as_str)
              .zip(f.value.as_str())
              .is_some_and(|(a, b)| a >= b),
            FilterOp::Lte => field
              .and_then(Value::as_str)
              .zip(f.value.as_str())
              .is_some_and(|(a, b)| a <= b),
          }
        })
      })
      .cloned()
      .collect();
    if let Some(limit) = query.limit {
      out.truncate(limit);
    }
    Ok(out)
  }
}

/// Every call fails; used to exercise degraded paths.
pub struct FailingStore;

impl DocumentStore for FailingStore {
  type Error = StubError;

  async fn get(&self, _: &str, _: &str) -> Result<Option<Document>, StubError> {
    Err(StubError("store offline"))
  }

  async fn set(&self, _: &str, _: &str, _: Value) -> Result<Document, StubError> {
    Err(StubError("store offline"))
  }

  async fn merge(&self, _: &str, _: &str, _: Value) -> Result<Document, StubError> {
    Err(StubError("store offline"))
  }

  async fn delete(&self, _: &str, _: &str) -> Result<bool, StubError> {
    Err(StubError("store offline"))
  }

  async fn list(&self, _: &DocQuery) -> Result<Vec<Document>, StubError> {
    Err(StubError("store offline"))
  }
}
