//! SQL schema for the Brolly SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Every collection shares one table; a document is a JSON object.
CREATE TABLE IF NOT EXISTS documents (
    collection  TEXT NOT NULL,
    key         TEXT NOT NULL,
    fields      TEXT NOT NULL,   -- JSON object
    updated_at  TEXT NOT NULL,   -- RFC 3339 UTC
    PRIMARY KEY (collection, key)
);

PRAGMA user_version = 1;
";
