//! SQL schema for the Mitra SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per document. The body is a JSON object; created_at is set on the
-- first write and never touched again.
CREATE TABLE IF NOT EXISTS documents (
    collection  TEXT NOT NULL,
    doc_id      TEXT NOT NULL,
    data_json   TEXT NOT NULL CHECK (json_type(data_json) = 'object'),
    created_at  TEXT NOT NULL,   -- RFC 3339 UTC, fixed microsecond precision
    updated_at  TEXT NOT NULL,
    PRIMARY KEY (collection, doc_id)
);

CREATE INDEX IF NOT EXISTS documents_updated_idx ON documents(collection, updated_at);
CREATE INDEX IF NOT EXISTS documents_created_idx ON documents(collection, created_at);

PRAGMA user_version = 1;
";
