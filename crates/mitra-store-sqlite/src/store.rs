//! [`SqliteStore`], the SQLite implementation of [`DocumentStore`].

use std::path::Path;

use chrono::Utc;
use mitra_core::store::{DocQuery, Direction, Document, DocumentStore, FilterOp, OrderBy};
use rusqlite::OptionalExtension as _;
use serde_json::Value;
use tracing::debug;

use crate::{
  Error, Result,
  encode::{RawDocument, encode_dt, encode_filter_value},
  schema::SCHEMA,
};

/// How a write combines with an existing document.
#[derive(Clone, Copy)]
enum WriteMode {
  Replace,
  Merge,
}

fn require_object(collection: &str, id: &str, data: &Value) -> Result<()> {
  if data.is_object() {
    Ok(())
  } else {
    Err(
      mitra_core::Error::NotAnObject {
        collection: collection.to_owned(),
        id:         id.to_owned(),
      }
      .into(),
    )
  }
}

fn direction_sql(direction: Direction) -> &'static str {
  match direction {
    Direction::Asc => "ASC",
    Direction::Desc => "DESC",
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A document store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn write(
    &self,
    collection: &str,
    id: &str,
    data: Value,
    mode: WriteMode,
  ) -> Result<Document> {
    require_object(collection, id, &data)?;

    let collection = collection.to_owned();
    let id = id.to_owned();
    let data_str = data.to_string();
    let now_str = encode_dt(Utc::now());

    // A merge into a missing document still applies the patch to `{}` so
    // `null` members are dropped the same way in both cases.
    let sql = match mode {
      WriteMode::Replace => format!(
        "INSERT INTO documents (collection, doc_id, data_json, created_at, updated_at)
         VALUES (?1, ?2, json(?3), ?4, ?4)
         ON CONFLICT (collection, doc_id) DO UPDATE SET
           data_json  = excluded.data_json,
           updated_at = excluded.updated_at
         RETURNING {}",
        RawDocument::COLUMNS
      ),
      WriteMode::Merge => format!(
        "INSERT INTO documents (collection, doc_id, data_json, created_at, updated_at)
         VALUES (?1, ?2, json_patch('{{}}', ?3), ?4, ?4)
         ON CONFLICT (collection, doc_id) DO UPDATE SET
           data_json  = json_patch(documents.data_json, ?3),
           updated_at = excluded.updated_at
         RETURNING {}",
        RawDocument::COLUMNS
      ),
    };

    let raw: RawDocument = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        Ok(stmt.query_row(
          rusqlite::params![collection, id, data_str, now_str],
          RawDocument::from_row,
        )?)
      })
      .await?;

    raw.into_document()
  }
}

// ─── DocumentStore impl ──────────────────────────────────────────────────────

impl DocumentStore for SqliteStore {
  type Error = Error;

  async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
    let collection = collection.to_owned();
    let id = id.to_owned();

    let raw: Option<RawDocument> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM documents WHERE collection = ?1 AND doc_id = ?2",
          RawDocument::COLUMNS
        );
        Ok(
          conn
            .query_row(&sql, rusqlite::params![collection, id], RawDocument::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDocument::into_document).transpose()
  }

  async fn set(&self, collection: &str, id: &str, data: Value) -> Result<Document> {
    self.write(collection, id, data, WriteMode::Replace).await
  }

  async fn merge(&self, collection: &str, id: &str, data: Value) -> Result<Document> {
    self.write(collection, id, data, WriteMode::Merge).await
  }

  async fn delete(&self, collection: &str, id: &str) -> Result<bool> {
    let collection = collection.to_owned();
    let id = id.to_owned();

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM documents WHERE collection = ?1 AND doc_id = ?2",
          rusqlite::params![collection, id],
        )?)
      })
      .await?;

    Ok(deleted > 0)
  }

  async fn list(&self, query: &DocQuery) -> Result<Vec<Document>> {
    query.validate()?;

    // Build WHERE clause dynamically. Field names were validated above, so
    // interpolating them into the JSON path is safe.
    let mut conds = vec!["collection = ?1".to_owned()];
    let mut params: Vec<rusqlite::types::Value> =
      vec![rusqlite::types::Value::Text(query.collection.clone())];
    for filter in &query.filters {
      let path = format!("json_extract(data_json, '$.{}')", filter.field);
      match (encode_filter_value(&filter.field, &filter.value)?, filter.op) {
        (None, FilterOp::Eq) => conds.push(format!("{path} IS NULL")),
        (None, _) => {
          return Err(mitra_core::Error::UnsupportedFilter(filter.field.clone()).into());
        }
        (Some(value), op) => {
          params.push(value);
          let op = match op {
            FilterOp::Eq => "=",
            FilterOp::Gte => ">=",
            FilterOp::Lte => "<=",
          };
          conds.push(format!("{path} {op} ?{}", params.len()));
        }
      }
    }

    let order_clause = match &query.order_by {
      Some(OrderBy::CreatedAt(dir)) => {
        let dir = direction_sql(*dir);
        format!("ORDER BY created_at {dir}, rowid {dir}")
      }
      Some(OrderBy::UpdatedAt(dir)) => {
        let dir = direction_sql(*dir);
        format!("ORDER BY updated_at {dir}, rowid {dir}")
      }
      Some(OrderBy::Field(field, dir)) => {
        let dir = direction_sql(*dir);
        format!("ORDER BY json_extract(data_json, '$.{field}') {dir}, rowid {dir}")
      }
      None => "ORDER BY rowid ASC".to_owned(),
    };

    let limit_clause = match query.limit {
      Some(limit) => format!("LIMIT {limit}"),
      None => String::new(),
    };

    let sql = format!(
      "SELECT {} FROM documents WHERE {} {order_clause} {limit_clause}",
      RawDocument::COLUMNS,
      conds.join(" AND "),
    );
    debug!(%sql, "listing documents");

    let raws: Vec<RawDocument> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawDocument::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDocument::into_document).collect()
  }
}
