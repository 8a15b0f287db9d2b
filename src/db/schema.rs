//! Database schema and migrations for Outpost.
//!
//! Migrations are applied sequentially when the database is opened; the
//! `schema_version` table tracks which have already run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: sent mail records
    r#"
-- One row per send attempt that reached the relay successfully
-- (or, when callers record them, failed/pending attempts).
CREATE TABLE sent_mails (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL,
    recipient   TEXT NOT NULL,           -- To address
    cc          TEXT,
    bcc         TEXT,
    subject     TEXT NOT NULL,
    body        TEXT NOT NULL,
    message_id  TEXT,                    -- relay-assigned identifier
    status      TEXT NOT NULL DEFAULT 'sent',  -- 'sent', 'failed', 'pending'
    sent_at     TEXT NOT NULL
);

CREATE INDEX idx_sent_mails_user_id ON sent_mails(user_id);
CREATE INDEX idx_sent_mails_sent_at ON sent_mails(sent_at);
"#,
];
