//! DDL statements for the SQLite schema.
//!
//! Timestamps are stored as TEXT in RFC 3339 format (SQLite has no native
//! datetime type). Schema definitions are stored as JSON TEXT. Property and
//! reference lists keep their order through a `position` column.

/// Current schema version, kept in `PRAGMA user_version`.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Core DDL statements executed during `init_schema`.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    // -- Beans table ---------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS beans (
        schema_name TEXT NOT NULL,
        instance_id TEXT NOT NULL,
        created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        updated_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        PRIMARY KEY (schema_name, instance_id)
    )
    "#,
    // -- Property values -----------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS bean_properties (
        schema_name TEXT NOT NULL,
        instance_id TEXT NOT NULL,
        name        TEXT NOT NULL,
        position    INTEGER NOT NULL,
        value       TEXT NOT NULL,
        PRIMARY KEY (schema_name, instance_id, name, position),
        FOREIGN KEY (schema_name, instance_id)
            REFERENCES beans(schema_name, instance_id) ON DELETE CASCADE
    )
    "#,
    // -- References ----------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS bean_references (
        schema_name     TEXT NOT NULL,
        instance_id     TEXT NOT NULL,
        name            TEXT NOT NULL,
        position        INTEGER NOT NULL,
        target_schema   TEXT NOT NULL,
        target_instance TEXT NOT NULL,
        PRIMARY KEY (schema_name, instance_id, name, position),
        FOREIGN KEY (schema_name, instance_id)
            REFERENCES beans(schema_name, instance_id) ON DELETE CASCADE
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_bean_references_target ON bean_references(target_schema, target_instance)",
    // -- Registered schemas --------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS schemas (
        name          TEXT PRIMARY KEY,
        definition    TEXT NOT NULL,
        registered_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    )
    "#,
    // -- Events table (audit trail, survives bean deletion) ------------------
    r#"
    CREATE TABLE IF NOT EXISTS events (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        schema_name TEXT NOT NULL,
        instance_id TEXT NOT NULL,
        event_type  TEXT NOT NULL,
        actor       TEXT NOT NULL,
        created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_events_bean ON events(schema_name, instance_id)",
];
