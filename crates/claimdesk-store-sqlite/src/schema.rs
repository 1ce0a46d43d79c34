//! SQL schema for the claimdesk SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS claims (
    claim_id      TEXT PRIMARY KEY,
    title         TEXT NOT NULL,
    description   TEXT NOT NULL,
    priority      TEXT NOT NULL,   -- 'low' | 'medium' | 'high'
    critical      INTEGER NOT NULL DEFAULT 0,
    status        TEXT NOT NULL,   -- 'pending' | 'in_review' | 'resolved' | 'rejected'
    client_id     TEXT NOT NULL,
    project_id    TEXT NOT NULL,
    claim_type_id TEXT NOT NULL,
    area_id       TEXT NOT NULL,
    deleted_at    TEXT,            -- NULL = active; soft delete is reversible
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

-- The N:M claim-handler relation. The UNIQUE constraint is the atomic
-- arbiter for concurrent self-assign: exactly one insert wins.
CREATE TABLE IF NOT EXISTS assignments (
    claim_id    TEXT NOT NULL REFERENCES claims(claim_id),
    handler_id  TEXT NOT NULL,
    principal   INTEGER NOT NULL DEFAULT 0,
    assigned_at TEXT NOT NULL,
    UNIQUE (claim_id, handler_id)
);

-- The audit trail is strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS audit_log (
    entry_id    TEXT PRIMARY KEY,
    claim_id    TEXT NOT NULL REFERENCES claims(claim_id),
    kind        TEXT NOT NULL,   -- discriminant of AuditKind
    detail      TEXT NOT NULL,
    actor_id    TEXT NOT NULL,
    recorded_at TEXT NOT NULL,   -- ISO 8601 UTC; server-assigned
    metadata    TEXT             -- JSON object or NULL
);

-- Handler directory: existence and area membership checks.
CREATE TABLE IF NOT EXISTS handlers (
    handler_id   TEXT PRIMARY KEY,
    display_name TEXT NOT NULL,
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS handler_areas (
    handler_id TEXT NOT NULL REFERENCES handlers(handler_id),
    area_id    TEXT NOT NULL,
    UNIQUE (handler_id, area_id)
);

CREATE INDEX IF NOT EXISTS claims_status_idx      ON claims(status);
CREATE INDEX IF NOT EXISTS claims_area_idx        ON claims(area_id);
CREATE INDEX IF NOT EXISTS claims_client_idx      ON claims(client_id);
CREATE INDEX IF NOT EXISTS assignments_claim_idx  ON assignments(claim_id);
CREATE INDEX IF NOT EXISTS audit_claim_idx        ON audit_log(claim_id);
CREATE INDEX IF NOT EXISTS audit_recorded_idx     ON audit_log(recorded_at);

PRAGMA user_version = 1;
";
