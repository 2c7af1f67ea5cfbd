//! Audit trail rows for [`SqliteStore`].

use rusqlite::{Connection, params};

use beanconf_core::{BeanEvent, BeanId, EventType};

use crate::error::Result;
use crate::sqlite::beans::{format_datetime, parse_datetime};
use crate::sqlite::store::SqliteStore;

/// Records an event for `id` on the given connection.
pub(crate) fn emit_event(
    conn: &Connection,
    id: &BeanId,
    event_type: &EventType,
    actor: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO events (schema_name, instance_id, event_type, actor, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            id.schema_name,
            id.instance_id,
            event_type.as_str(),
            actor,
            format_datetime(&chrono::Utc::now()),
        ],
    )?;
    Ok(())
}

/// Returns the newest `limit` events of a bean.
pub(crate) fn get_events_on_conn(
    conn: &Connection,
    id: &BeanId,
    limit: usize,
) -> Result<Vec<BeanEvent>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, event_type, actor, created_at FROM events
         WHERE schema_name = ?1 AND instance_id = ?2
         ORDER BY id DESC LIMIT ?3",
    )?;
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let rows = stmt.query_map(params![id.schema_name, id.instance_id, limit], |row| {
        Ok(BeanEvent {
            id: row.get("id")?,
            bean: id.clone(),
            event_type: EventType::from(row.get::<_, String>("event_type")?.as_str()),
            actor: row.get("actor")?,
            created_at: parse_datetime(&row.get::<_, String>("created_at")?),
        })
    })?;

    let mut events = Vec::new();
    for row in rows {
        events.push(row?);
    }
    Ok(events)
}

impl SqliteStore {
    pub fn get_events_impl(&self, id: &BeanId, limit: usize) -> Result<Vec<BeanEvent>> {
        let conn = self.lock_conn()?;
        get_events_on_conn(&conn, id, limit)
    }
}
