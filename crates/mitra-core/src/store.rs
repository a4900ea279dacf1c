//! The `DocumentStore` trait and supporting query types.
//!
//! Every feature persists loosely-typed JSON documents grouped into
//! collections and addressed by string ids. The trait is implemented by
//! storage backends (e.g. `mitra-store-sqlite`); handlers convert between
//! documents and the typed records in this crate with [`Document::decode`]
//! and [`encode`].

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{Error, Result};

// ─── Collections ─────────────────────────────────────────────────────────────

/// Collection paths used by the feature handlers.
pub mod collections {
  pub const JOURNAL_ENTRIES: &str = "journal_entries";
  pub const REFLECTION_SESSIONS: &str = "reflection_sessions";
  pub const CONVERSATIONS: &str = "conversations";
  /// Keyed by user id.
  pub const ACTIVE_CONTEXTS: &str = "active_contexts";
  /// Keyed by user id; each top-level key is one memory fact.
  pub const MEMORY_PROFILES: &str = "memory_profiles";
  pub const MOOD_ENTRIES: &str = "mood_entries";
  /// Keyed by `{user_id}_{date}`.
  pub const HEALTH_ENTRIES: &str = "health_entries";
  /// Keyed by user id.
  pub const PRACTICE_PROGRESS: &str = "practice_progress";
}

// ─── Document ────────────────────────────────────────────────────────────────

/// A stored JSON object together with its store-assigned metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
  pub id:         String,
  pub collection: String,
  pub data:       Value,
  /// Time of the first write; never changes afterwards.
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Document {
  /// Deserialise the document body into a typed record.
  pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
    Ok(serde_json::from_value(self.data.clone())?)
  }
}

/// Serialise a typed record into a document body.
pub fn encode<T: Serialize>(value: &T) -> Result<Value> {
  Ok(serde_json::to_value(value)?)
}

/// Field names usable in filters and ordering: non-empty ASCII alphanumerics
/// and underscores only.
pub fn is_valid_field(name: &str) -> bool {
  !name.is_empty()
    && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ─── Query type ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
  Eq,
  Gte,
  Lte,
}

/// A comparison against a top-level field of the document body.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
  pub field: String,
  pub op:    FilterOp,
  pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
  Asc,
  #[default]
  Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderBy {
  CreatedAt(Direction),
  UpdatedAt(Direction),
  /// A top-level field of the document body.
  Field(String, Direction),
}

/// Parameters for [`DocumentStore::list`].
#[derive(Debug, Clone)]
pub struct DocQuery {
  pub collection: String,
  pub filters:    Vec<Filter>,
  pub order_by:   Option<OrderBy>,
  pub limit:      Option<usize>,
}

impl DocQuery {
  pub fn new(collection: impl Into<String>) -> Self {
    Self {
      collection: collection.into(),
      filters:    Vec::new(),
      order_by:   None,
      limit:      None,
    }
  }

  pub fn where_eq(self, field: &str, value: impl Into<Value>) -> Self {
    self.filter(field, FilterOp::Eq, value)
  }

  pub fn where_gte(self, field: &str, value: impl Into<Value>) -> Self {
    self.filter(field, FilterOp::Gte, value)
  }

  pub fn where_lte(self, field: &str, value: impl Into<Value>) -> Self {
    self.filter(field, FilterOp::Lte, value)
  }

  fn filter(mut self, field: &str, op: FilterOp, value: impl Into<Value>) -> Self {
    self.filters.push(Filter { field: field.to_owned(), op, value: value.into() });
    self
  }

  pub fn order_by(mut self, order: OrderBy) -> Self {
    self.order_by = Some(order);
    self
  }

  pub fn limit(mut self, limit: usize) -> Self {
    self.limit = Some(limit);
    self
  }

  /// Reject field names that could not be addressed safely.
  pub fn validate(&self) -> Result<()> {
    let ordered = match &self.order_by {
      Some(OrderBy::Field(f, _)) => Some(f.as_str()),
      _ => None,
    };
    for field in self.filters.iter().map(|f| f.field.as_str()).chain(ordered) {
      if !is_valid_field(field) {
        return Err(Error::InvalidField(field.to_owned()));
      }
    }
    Ok(())
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a schema-less document store.
///
/// Writes are single-document; there are no transactions, and concurrent
/// read-modify-write sequences on the same document may race.
///
/// All methods return `Send` futures so the trait can be used from axum
/// handlers on a multi-threaded runtime.
pub trait DocumentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Fetch a document. Returns `None` if it does not exist.
  fn get<'a>(
    &'a self,
    collection: &'a str,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + 'a;

  /// Create or fully replace a document. `data` must be a JSON object.
  fn set<'a>(
    &'a self,
    collection: &'a str,
    id: &'a str,
    data: Value,
  ) -> impl Future<Output = Result<Document, Self::Error>> + Send + 'a;

  /// Merge `data` into an existing document (JSON merge-patch semantics:
  /// nested objects merge, `null` removes a key), creating it when missing.
  fn merge<'a>(
    &'a self,
    collection: &'a str,
    id: &'a str,
    data: Value,
  ) -> impl Future<Output = Result<Document, Self::Error>> + Send + 'a;

  /// Delete a document. Returns `false` if it did not exist.
  fn delete<'a>(
    &'a self,
    collection: &'a str,
    id: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// List documents of one collection matching `query`.
  fn list<'a>(
    &'a self,
    query: &'a DocQuery,
  ) -> impl Future<Output = Result<Vec<Document>, Self::Error>> + Send + 'a;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn field_names_are_restricted() {
    assert!(is_valid_field("userId"));
    assert!(is_valid_field("sleep_hours"));
    assert!(!is_valid_field(""));
    assert!(!is_valid_field("data.userId"));
    assert!(!is_valid_field("x') OR 1=1 --"));
  }

  #[test]
  fn query_validation_checks_filters_and_ordering() {
    let ok = DocQuery::new("mood_entries")
      .where_eq("userId", "u1")
      .order_by(OrderBy::Field("date".into(), Direction::Desc));
    assert!(ok.validate().is_ok());

    let bad = DocQuery::new("mood_entries")
      .order_by(OrderBy::Field("date desc; drop".into(), Direction::Asc));
    assert!(matches!(bad.validate(), Err(Error::InvalidField(_))));
  }
}
