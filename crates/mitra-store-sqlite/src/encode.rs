//! Conversions between [`Document`] and the text columns of a `documents`
//! row.
//!
//! Timestamps are stored as RFC 3339 strings with a fixed microsecond
//! precision so that lexical order in SQL matches chronological order.

use chrono::{DateTime, SecondsFormat, Utc};
use mitra_core::store::Document;
use rusqlite::types::Value as SqlValue;
use serde_json::Value;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Filter values ───────────────────────────────────────────────────────────

/// The SQL value `json_extract` yields for a scalar JSON value; `None` for
/// `null`, which is compared with `IS NULL` instead of a parameter.
pub fn encode_filter_value(field: &str, value: &Value) -> Result<Option<SqlValue>> {
  let sql = match value {
    Value::Null => return Ok(None),
    Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
    Value::Number(n) => match n.as_i64() {
      Some(i) => SqlValue::Integer(i),
      None => SqlValue::Real(n.as_f64().unwrap_or_default()),
    },
    Value::String(s) => SqlValue::Text(s.clone()),
    Value::Array(_) | Value::Object(_) => {
      return Err(mitra_core::Error::UnsupportedFilter(field.to_owned()).into());
    }
  };
  Ok(Some(sql))
}

// ─── Row type ────────────────────────────────────────────────────────────────

/// Raw strings read directly from a `documents` row.
pub struct RawDocument {
  pub collection: String,
  pub doc_id:     String,
  pub data_json:  String,
  pub created_at: String,
  pub updated_at: String,
}

impl RawDocument {
  pub const COLUMNS: &'static str = "collection, doc_id, data_json, created_at, updated_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      collection: row.get(0)?,
      doc_id:     row.get(1)?,
      data_json:  row.get(2)?,
      created_at: row.get(3)?,
      updated_at: row.get(4)?,
    })
  }

  pub fn into_document(self) -> Result<Document> {
    Ok(Document {
      id:         self.doc_id,
      collection: self.collection,
      data:       serde_json::from_str(&self.data_json)?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}
