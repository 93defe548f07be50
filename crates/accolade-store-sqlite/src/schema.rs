//! SQL schema for the Accolade SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS accounts (
    account_id          TEXT PRIMARY KEY,
    username            TEXT NOT NULL UNIQUE,
    password_hash       TEXT NOT NULL,   -- argon2 PHC string
    role                TEXT NOT NULL,   -- 'student' | 'admin'
    full_name           TEXT,
    email               TEXT,
    registration_number TEXT,
    department          TEXT,
    created_at          TEXT NOT NULL
);

-- Timestamps are fixed-width RFC 3339 (nanoseconds, 'Z'), so text order is
-- chronological order.
CREATE TABLE IF NOT EXISTS achievements (
    achievement_id TEXT PRIMARY KEY,
    owner_id       TEXT NOT NULL REFERENCES accounts(account_id),
    title          TEXT NOT NULL,
    description    TEXT NOT NULL,
    kind           TEXT NOT NULL,
    level          TEXT NOT NULL,
    position       TEXT NOT NULL DEFAULT 'participant',
    organizer      TEXT NOT NULL,
    occurred_on    TEXT NOT NULL,   -- YYYY-MM-DD
    evidence_ref   TEXT,
    status         TEXT NOT NULL DEFAULT 'pending',
    reviewed_by    TEXT REFERENCES accounts(account_id),
    reviewed_at    TEXT,
    remarks        TEXT,
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL,
    CHECK (status IN ('pending', 'approved', 'rejected')),
    -- A record names its reviewer exactly when it has left 'pending'.
    CHECK ((status = 'pending') = (reviewed_by IS NULL)),
    CHECK ((status = 'pending') = (reviewed_at IS NULL))
);

CREATE INDEX IF NOT EXISTS achievements_owner_idx   ON achievements(owner_id);
CREATE INDEX IF NOT EXISTS achievements_status_idx  ON achievements(status);
CREATE INDEX IF NOT EXISTS achievements_created_idx ON achievements(created_at);
CREATE INDEX IF NOT EXISTS accounts_role_idx        ON accounts(role);

PRAGMA user_version = 1;
";
