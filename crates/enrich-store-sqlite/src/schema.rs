//! SQL schema for the enrichment SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS records (
    record_id        INTEGER NOT NULL,
    period           INTEGER NOT NULL,
    external_code    TEXT    NOT NULL,
    display_name     TEXT    NOT NULL,
    record_group     TEXT    NOT NULL,
    status           TEXT    NOT NULL DEFAULT 'pending',  -- pending | partial | success | closed
    created_at       TEXT    NOT NULL,
    updated_at       TEXT    NOT NULL,
    last_enriched_at TEXT,
    PRIMARY KEY (record_id, period)
);

-- One row per (record, period, fragment type): the manifest entry and its
-- payload. Rows are upserted one at a time and never deleted.
CREATE TABLE IF NOT EXISTS fragments (
    record_id     INTEGER NOT NULL,
    period        INTEGER NOT NULL,
    fragment_type TEXT    NOT NULL,   -- storage key, e.g. 'report_card'
    code          INTEGER NOT NULL,   -- 200 | 404 | 503
    payload_json  TEXT,               -- full response body; NULL until captured
    updated_at    TEXT    NOT NULL,
    PRIMARY KEY (record_id, period, fragment_type),
    FOREIGN KEY (record_id, period) REFERENCES records(record_id, period)
);

-- Derived columns; overwritten on every enrichment run.
CREATE TABLE IF NOT EXISTS summaries (
    record_id           INTEGER NOT NULL,
    period              INTEGER NOT NULL,
    total_students      INTEGER,
    total_boys          INTEGER,
    total_girls         INTEGER,
    total_teachers      INTEGER,
    has_internet        INTEGER NOT NULL DEFAULT 0,
    has_library         INTEGER NOT NULL DEFAULT 0,
    has_playground      INTEGER NOT NULL DEFAULT 0,
    has_electricity     INTEGER NOT NULL DEFAULT 0,
    lgd_urban_body_id   TEXT,
    lgd_urban_body_name TEXT,
    lgd_ward_id         TEXT,
    lgd_ward_name       TEXT,
    computed_at         TEXT NOT NULL,
    PRIMARY KEY (record_id, period),
    FOREIGN KEY (record_id, period) REFERENCES records(record_id, period)
);

CREATE INDEX IF NOT EXISTS records_worklist_idx ON records(record_group, period, status);

PRAGMA user_version = 1;
";

/// Fragment upsert. A stored success code is never replaced, and a stored
/// payload is only ever replaced while the row is not yet a success.
///
/// Parameters: `record_id, period, fragment_type, code, payload_json,
/// updated_at`.
pub const UPSERT_FRAGMENT: &str = "
INSERT INTO fragments (record_id, period, fragment_type, code, payload_json, updated_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
ON CONFLICT (record_id, period, fragment_type) DO UPDATE SET
    code         = CASE WHEN fragments.code = 200 THEN fragments.code
                        ELSE excluded.code END,
    payload_json = CASE WHEN fragments.code = 200 THEN fragments.payload_json
                        ELSE COALESCE(excluded.payload_json, fragments.payload_json) END,
    updated_at   = excluded.updated_at
";
