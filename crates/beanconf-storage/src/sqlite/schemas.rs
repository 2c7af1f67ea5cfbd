//! Schema registry persistence for [`SqliteStore`].
//!
//! Definitions are stored as JSON documents keyed by schema name.

use std::collections::BTreeMap;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;

use beanconf_core::Schema;

use crate::error::{Result, StorageError};
use crate::sqlite::beans::format_datetime;
use crate::sqlite::store::SqliteStore;

pub(crate) fn get_schemas_on_conn(conn: &Connection) -> Result<BTreeMap<String, Schema>> {
    let mut stmt = conn.prepare_cached("SELECT name, definition FROM schemas ORDER BY name")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut schemas = BTreeMap::new();
    for row in rows {
        let (name, definition) = row?;
        let schema: Schema = serde_json::from_str(&definition)?;
        schemas.insert(name, schema);
    }
    Ok(schemas)
}

pub(crate) fn get_schema_on_conn(conn: &Connection, name: &str) -> Result<Schema> {
    let definition: Option<String> = conn
        .query_row(
            "SELECT definition FROM schemas WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?;
    match definition {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Err(StorageError::not_found("schema", name)),
    }
}

pub(crate) fn register_schema_on_conn(conn: &Connection, schema: &Schema) -> Result<()> {
    let definition = serde_json::to_string(schema)?;
    conn.execute(
        "INSERT OR REPLACE INTO schemas (name, definition, registered_at) VALUES (?1, ?2, ?3)",
        params![schema.name, definition, format_datetime(&Utc::now())],
    )?;
    Ok(())
}

pub(crate) fn remove_schema_on_conn(conn: &Connection, name: &str) -> Result<()> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM beans WHERE schema_name = ?1",
        params![name],
        |row| row.get(0),
    )?;
    if count > 0 {
        return Err(StorageError::SchemaInUse {
            name: name.to_string(),
            count,
        });
    }
    let affected = conn.execute("DELETE FROM schemas WHERE name = ?1", params![name])?;
    if affected == 0 {
        return Err(StorageError::not_found("schema", name));
    }
    Ok(())
}

impl SqliteStore {
    pub fn get_schemas_impl(&self) -> Result<BTreeMap<String, Schema>> {
        let conn = self.lock_conn()?;
        get_schemas_on_conn(&conn)
    }

    pub fn get_schema_impl(&self, name: &str) -> Result<Schema> {
        let conn = self.lock_conn()?;
        get_schema_on_conn(&conn, name)
    }

    pub fn register_schema_impl(&self, schema: &Schema) -> Result<()> {
        info!(schema = %schema.name, "registering schema");
        let conn = self.lock_conn()?;
        register_schema_on_conn(&conn, schema)
    }

    pub fn remove_schema_impl(&self, name: &str) -> Result<()> {
        info!(schema = name, "removing schema");
        self.write_in_transaction(|conn| remove_schema_on_conn(conn, name))
    }
}
