//! Database schema and migrations for FileShare.
//!
//! Migrations are applied in order when the database is opened; the
//! `schema_version` table tracks which ones have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: Shared folders and the files exposed under them
    r#"
CREATE TABLE folders (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    storage_ref TEXT NOT NULL UNIQUE,        -- opaque storage collaborator reference
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE shared_files (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    folder_id   INTEGER NOT NULL REFERENCES folders(id) ON DELETE CASCADE,
    name        TEXT NOT NULL,
    storage_ref TEXT NOT NULL,
    mime_type   TEXT NOT NULL,
    size        INTEGER,                     -- NULL when unknown
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at  TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(folder_id, name)
);

CREATE INDEX idx_shared_files_folder_id ON shared_files(folder_id);
"#,
    // v2: Login sessions and access preferences
    r#"
CREATE TABLE sessions (
    token_hash  TEXT PRIMARY KEY,            -- SHA-256 of the cookie token, hex
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE preferences (
    key         TEXT PRIMARY KEY,
    value       TEXT NOT NULL
);
"#,
];
