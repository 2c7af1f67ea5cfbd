//! Bean CRUD operations for [`SqliteStore`].

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, params};
use tracing::debug;

use beanconf_core::{Bean, BeanId, EventType};

use crate::error::{Result, StorageError};
use crate::sqlite::events::emit_event;
use crate::sqlite::references::{check_references_on_conn, referrers_on_conn};
use crate::sqlite::store::SqliteStore;
use crate::traits::WriteKind;

/// Actor recorded when the store creates a singleton on first access.
const SYSTEM_ACTOR: &str = "beanconf";

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses a stored timestamp, falling back to now on corrupt data.
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

// ---------------------------------------------------------------------------
// Row-level helpers
// ---------------------------------------------------------------------------

pub(crate) fn bean_exists_on_conn(conn: &Connection, id: &BeanId) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM beans WHERE schema_name = ?1 AND instance_id = ?2)",
        params![id.schema_name, id.instance_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn load_properties(conn: &Connection, id: &BeanId) -> Result<BTreeMap<String, Vec<String>>> {
    let mut stmt = conn.prepare_cached(
        "SELECT name, value FROM bean_properties
         WHERE schema_name = ?1 AND instance_id = ?2
         ORDER BY name, position",
    )?;
    let rows = stmt.query_map(params![id.schema_name, id.instance_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut properties: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for row in rows {
        let (name, value) = row?;
        properties.entry(name).or_default().push(value);
    }
    Ok(properties)
}

fn load_references(conn: &Connection, id: &BeanId) -> Result<BTreeMap<String, Vec<BeanId>>> {
    let mut stmt = conn.prepare_cached(
        "SELECT name, target_schema, target_instance FROM bean_references
         WHERE schema_name = ?1 AND instance_id = ?2
         ORDER BY name, position",
    )?;
    let rows = stmt.query_map(params![id.schema_name, id.instance_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            BeanId::new(row.get::<_, String>(1)?, row.get::<_, String>(2)?),
        ))
    })?;

    let mut references: BTreeMap<String, Vec<BeanId>> = BTreeMap::new();
    for row in rows {
        let (name, target) = row?;
        references.entry(name).or_default().push(target);
    }
    Ok(references)
}

/// Loads a single bean with its references as plain ids.
pub(crate) fn load_bean_on_conn(conn: &Connection, id: &BeanId) -> Result<Bean> {
    if !bean_exists_on_conn(conn, id)? {
        return Err(StorageError::not_found("bean", id));
    }
    let mut bean = Bean::new(id.clone());
    bean.properties = load_properties(conn, id)?;
    bean.references = load_references(conn, id)?;
    Ok(bean)
}

/// Replaces the stored values of one property. An empty list removes it.
fn write_property(conn: &Connection, id: &BeanId, name: &str, values: &[String]) -> Result<()> {
    conn.execute(
        "DELETE FROM bean_properties WHERE schema_name = ?1 AND instance_id = ?2 AND name = ?3",
        params![id.schema_name, id.instance_id, name],
    )?;
    let mut stmt = conn.prepare_cached(
        "INSERT INTO bean_properties (schema_name, instance_id, name, position, value)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for (position, value) in values.iter().enumerate() {
        stmt.execute(params![id.schema_name, id.instance_id, name, position, value])?;
    }
    Ok(())
}

/// Replaces the stored targets of one reference. An empty list removes it.
fn write_reference(conn: &Connection, id: &BeanId, name: &str, targets: &[BeanId]) -> Result<()> {
    conn.execute(
        "DELETE FROM bean_references WHERE schema_name = ?1 AND instance_id = ?2 AND name = ?3",
        params![id.schema_name, id.instance_id, name],
    )?;
    let mut stmt = conn.prepare_cached(
        "INSERT INTO bean_references
         (schema_name, instance_id, name, position, target_schema, target_instance)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for (position, target) in targets.iter().enumerate() {
        stmt.execute(params![
            id.schema_name,
            id.instance_id,
            name,
            position,
            target.schema_name,
            target.instance_id,
        ])?;
    }
    Ok(())
}

fn write_entries(conn: &Connection, bean: &Bean) -> Result<()> {
    for (name, values) in &bean.properties {
        write_property(conn, &bean.id, name, values)?;
    }
    for (name, targets) in &bean.references {
        write_reference(conn, &bean.id, name, targets)?;
    }
    Ok(())
}

fn clear_entries(conn: &Connection, id: &BeanId) -> Result<()> {
    conn.execute(
        "DELETE FROM bean_properties WHERE schema_name = ?1 AND instance_id = ?2",
        params![id.schema_name, id.instance_id],
    )?;
    conn.execute(
        "DELETE FROM bean_references WHERE schema_name = ?1 AND instance_id = ?2",
        params![id.schema_name, id.instance_id],
    )?;
    Ok(())
}

fn touch(conn: &Connection, id: &BeanId) -> Result<()> {
    conn.execute(
        "UPDATE beans SET updated_at = ?3 WHERE schema_name = ?1 AND instance_id = ?2",
        params![id.schema_name, id.instance_id, format_datetime(&Utc::now())],
    )?;
    Ok(())
}

fn require_existing(conn: &Connection, id: &BeanId) -> Result<()> {
    if bean_exists_on_conn(conn, id)? {
        Ok(())
    } else {
        Err(StorageError::not_found("bean", id))
    }
}

// ---------------------------------------------------------------------------
// Connection-level operations
// ---------------------------------------------------------------------------

/// Inserts new beans, then checks that every reference resolves. Batch
/// members may reference each other.
pub(crate) fn insert_beans_on_conn(conn: &Connection, beans: &[Bean], actor: &str) -> Result<()> {
    let now = format_datetime(&Utc::now());
    for bean in beans {
        if bean_exists_on_conn(conn, &bean.id)? {
            return Err(StorageError::already_exists("bean", &bean.id));
        }
        conn.execute(
            "INSERT INTO beans (schema_name, instance_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)",
            params![bean.id.schema_name, bean.id.instance_id, now],
        )?;
        write_entries(conn, bean)?;
        emit_event(conn, &bean.id, &EventType::Created, actor)?;
    }
    for bean in beans {
        check_references_on_conn(conn, bean)?;
    }
    Ok(())
}

/// Replaces the full content of existing beans.
pub(crate) fn replace_beans_on_conn(conn: &Connection, beans: &[Bean], actor: &str) -> Result<()> {
    for bean in beans {
        require_existing(conn, &bean.id)?;
        clear_entries(conn, &bean.id)?;
        write_entries(conn, bean)?;
        touch(conn, &bean.id)?;
        emit_event(conn, &bean.id, &EventType::Set, actor)?;
    }
    for bean in beans {
        check_references_on_conn(conn, bean)?;
    }
    Ok(())
}

/// Applies partial updates to existing beans.
pub(crate) fn merge_beans_on_conn(conn: &Connection, beans: &[Bean], actor: &str) -> Result<()> {
    for bean in beans {
        require_existing(conn, &bean.id)?;
        write_entries(conn, bean)?;
        touch(conn, &bean.id)?;
        emit_event(conn, &bean.id, &EventType::Merged, actor)?;
    }
    for bean in beans {
        check_references_on_conn(conn, bean)?;
    }
    Ok(())
}

/// Deletes beans after checking that nothing outside the deleted set
/// references them.
pub(crate) fn delete_beans_on_conn(conn: &Connection, ids: &[BeanId], actor: &str) -> Result<()> {
    for id in ids {
        require_existing(conn, id)?;
        let outside: Vec<BeanId> = referrers_on_conn(conn, id)?
            .into_iter()
            .filter(|r| !ids.contains(r))
            .collect();
        if !outside.is_empty() {
            return Err(StorageError::ReferentialIntegrity {
                bean: id.clone(),
                referrers: outside,
            });
        }
    }
    for id in ids {
        conn.execute(
            "DELETE FROM beans WHERE schema_name = ?1 AND instance_id = ?2",
            params![id.schema_name, id.instance_id],
        )?;
        emit_event(conn, id, &EventType::Deleted, actor)?;
    }
    Ok(())
}

pub(crate) fn list_on_conn(conn: &Connection, schema_name: &str) -> Result<BTreeMap<BeanId, Bean>> {
    let mut stmt = conn.prepare_cached(
        "SELECT instance_id FROM beans WHERE schema_name = ?1 ORDER BY instance_id",
    )?;
    let ids = stmt
        .query_map(params![schema_name], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;

    let mut beans = BTreeMap::new();
    for instance_id in ids {
        let id = BeanId::new(schema_name, instance_id);
        let bean = load_bean_on_conn(conn, &id)?;
        beans.insert(id, bean);
    }
    Ok(beans)
}

/// Inserts the empty singleton of `schema_name` unless it exists. Returns
/// `true` if a row was inserted.
fn ensure_singleton_on_conn(conn: &Connection, schema_name: &str) -> Result<bool> {
    let id = BeanId::singleton(schema_name);
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO beans (schema_name, instance_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?3)",
        params![id.schema_name, id.instance_id, format_datetime(&Utc::now())],
    )?;
    if inserted > 0 {
        debug!(bean = %id, "created singleton");
        emit_event(conn, &id, &EventType::SingletonCreated, SYSTEM_ACTOR)?;
    }
    Ok(inserted > 0)
}

/// Loads the singleton of `schema_name`, inserting an empty one first if
/// it does not exist yet.
pub(crate) fn singleton_on_conn(conn: &Connection, schema_name: &str) -> Result<Bean> {
    ensure_singleton_on_conn(conn, schema_name)?;
    load_bean_on_conn(conn, &BeanId::singleton(schema_name))
}


// ---------------------------------------------------------------------------
// SqliteStore methods
// ---------------------------------------------------------------------------

impl SqliteStore {
    pub fn create_all_impl(&self, beans: &[Bean], actor: &str) -> Result<()> {
        self.write_all_impl(WriteKind::Create, beans, &[], actor)
    }

    pub fn set_all_impl(&self, beans: &[Bean], actor: &str) -> Result<()> {
        self.write_all_impl(WriteKind::Set, beans, &[], actor)
    }

    pub fn merge_all_impl(&self, beans: &[Bean], actor: &str) -> Result<()> {
        self.write_all_impl(WriteKind::Merge, beans, &[], actor)
    }

    /// Materializes `singletons` and applies the write in one transaction.
    /// A failing write leaves no singleton behind.
    pub fn write_all_impl(
        &self,
        kind: WriteKind,
        beans: &[Bean],
        singletons: &[String],
        actor: &str,
    ) -> Result<()> {
        debug!(?kind, count = beans.len(), singletons = singletons.len(), actor, "writing beans");
        self.write_in_transaction(|conn| {
            for schema_name in singletons {
                ensure_singleton_on_conn(conn, schema_name)?;
            }
            match kind {
                WriteKind::Create => insert_beans_on_conn(conn, beans, actor),
                WriteKind::Set => replace_beans_on_conn(conn, beans, actor),
                WriteKind::Merge => merge_beans_on_conn(conn, beans, actor),
            }
        })
    }

    pub fn delete_all_impl(&self, schema_name: &str, instance_ids: &[String], actor: &str) -> Result<()> {
        let ids: Vec<BeanId> = instance_ids
            .iter()
            .map(|i| BeanId::new(schema_name, i.as_str()))
            .collect();
        debug!(schema = schema_name, count = ids.len(), actor, "deleting beans");
        self.write_in_transaction(|conn| delete_beans_on_conn(conn, &ids, actor))
    }

    pub fn get_lazy_impl(&self, id: &BeanId) -> Result<Bean> {
        let conn = self.lock_conn()?;
        load_bean_on_conn(&conn, id)
    }

    pub fn exists_impl(&self, id: &BeanId) -> Result<bool> {
        let conn = self.lock_conn()?;
        bean_exists_on_conn(&conn, id)
    }

    pub fn list_impl(&self, schema_name: &str) -> Result<BTreeMap<BeanId, Bean>> {
        let conn = self.lock_conn()?;
        list_on_conn(&conn, schema_name)
    }

    pub fn get_singleton_impl(&self, schema_name: &str) -> Result<Bean> {
        self.write_in_transaction(|conn| singleton_on_conn(conn, schema_name))
    }
}

#[cfg(test)]
mod tests {
    use beanconf_core::BeanBuilder;
    use pretty_assertions::assert_eq;

    use super::*;

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn pool(id: &str) -> Bean {
        BeanBuilder::new("Pool", id).property("size", "4").build()
    }

    fn server(id: &str, pool_id: &str) -> Bean {
        BeanBuilder::new("Server", id)
            .property("port", "8080")
            .property_list("tags", ["b", "a", "c"])
            .reference("pool", BeanId::new("Pool", pool_id))
            .build()
    }

    #[test]
    fn create_and_read_back_preserves_order() {
        let s = store();
        s.create_all_impl(&[pool("p1"), server("s1", "p1")], "alice").unwrap();

        let got = s.get_lazy_impl(&BeanId::new("Server", "s1")).unwrap();
        assert_eq!(got, server("s1", "p1"));
        assert_eq!(got.values("tags"), &["b", "a", "c"]);
    }

    #[test]
    fn batch_may_reference_itself_in_any_order() {
        let s = store();
        s.create_all_impl(&[server("s1", "p1"), pool("p1")], "alice").unwrap();
        assert!(s.exists_impl(&BeanId::new("Pool", "p1")).unwrap());
    }

    #[test]
    fn duplicate_create_fails() {
        let s = store();
        s.create_all_impl(&[pool("p1")], "alice").unwrap();
        let err = s.create_all_impl(&[pool("p1")], "alice").unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists { .. }));
    }

    #[test]
    fn missing_reference_rolls_back_whole_batch() {
        let s = store();
        let err = s
            .create_all_impl(&[pool("p2"), server("s1", "nope")], "alice")
            .unwrap_err();
        assert!(matches!(err, StorageError::MissingReference { .. }));
        assert!(!s.exists_impl(&BeanId::new("Pool", "p2")).unwrap());
    }

    #[test]
    fn set_replaces_everything() {
        let s = store();
        s.create_all_impl(&[pool("p1"), server("s1", "p1")], "alice").unwrap();
        let replacement = BeanBuilder::new("Server", "s1").property("port", "9090").build();
        s.set_all_impl(std::slice::from_ref(&replacement), "bob").unwrap();

        let got = s.get_lazy_impl(&replacement.id).unwrap();
        assert_eq!(got, replacement);
    }

    #[test]
    fn merge_keeps_unnamed_and_drops_empty() {
        let s = store();
        s.create_all_impl(&[pool("p1"), server("s1", "p1")], "alice").unwrap();
        let patch = BeanBuilder::new("Server", "s1")
            .property("port", "9090")
            .property_list("tags", Vec::<String>::new())
            .build();
        s.merge_all_impl(&[patch], "bob").unwrap();

        let got = s.get_lazy_impl(&BeanId::new("Server", "s1")).unwrap();
        assert_eq!(got.value("port"), Some("9090"));
        assert!(got.values("tags").is_empty());
        assert_eq!(got.reference_ids("pool"), &[BeanId::new("Pool", "p1")]);
    }

    #[test]
    fn set_and_merge_require_existing() {
        let s = store();
        assert!(s.set_all_impl(&[pool("p1")], "a").unwrap_err().is_not_found());
        assert!(s.merge_all_impl(&[pool("p1")], "a").unwrap_err().is_not_found());
    }

    #[test]
    fn delete_blocked_by_referrer() {
        let s = store();
        s.create_all_impl(&[pool("p1"), server("s1", "p1")], "alice").unwrap();

        let err = s.delete_all_impl("Pool", &["p1".into()], "alice").unwrap_err();
        match err {
            StorageError::ReferentialIntegrity { bean, referrers } => {
                assert_eq!(bean, BeanId::new("Pool", "p1"));
                assert_eq!(referrers, vec![BeanId::new("Server", "s1")]);
            }
            other => panic!("expected ReferentialIntegrity, got {other:?}"),
        }

        s.delete_all_impl("Server", &["s1".into()], "alice").unwrap();
        s.delete_all_impl("Pool", &["p1".into()], "alice").unwrap();
        assert!(s.get_lazy_impl(&BeanId::new("Pool", "p1")).unwrap_err().is_not_found());
    }

    #[test]
    fn delete_set_may_reference_itself() {
        let s = store();
        let a = BeanBuilder::new("Node", "a").reference("next", BeanId::new("Node", "b")).build();
        let b = BeanBuilder::new("Node", "b").reference("next", BeanId::new("Node", "a")).build();
        let me = BeanBuilder::new("Node", "me").reference("next", BeanId::new("Node", "me")).build();
        s.create_all_impl(&[a, b, me], "alice").unwrap();

        s.delete_all_impl("Node", &["me".into()], "alice").unwrap();
        assert!(s.delete_all_impl("Node", &["a".into()], "alice").is_err());
        s.delete_all_impl("Node", &["a".into(), "b".into()], "alice").unwrap();
        assert!(s.list_impl("Node").unwrap().is_empty());
    }

    #[test]
    fn list_is_sorted_by_instance() {
        let s = store();
        s.create_all_impl(&[pool("p2"), pool("p1"), pool("p3")], "alice").unwrap();
        let ids: Vec<String> = s
            .list_impl("Pool")
            .unwrap()
            .into_keys()
            .map(|id| id.instance_id)
            .collect();
        assert_eq!(ids, vec!["p1", "p2", "p3"]);
        assert!(s.list_impl("Unknown").unwrap().is_empty());
    }

    #[test]
    fn singleton_created_once() {
        let s = store();
        let first = s.get_singleton_impl("Pension").unwrap();
        assert_eq!(first.id, BeanId::singleton("Pension"));
        let second = s.get_singleton_impl("Pension").unwrap();
        assert_eq!(first, second);
        assert_eq!(s.list_impl("Pension").unwrap().len(), 1);
    }

    #[test]
    fn write_creates_referenced_singleton() {
        let s = store();
        let holder = BeanBuilder::new("Server", "s1")
            .reference("pension", BeanId::singleton("Pension"))
            .build();
        s.write_all_impl(WriteKind::Create, std::slice::from_ref(&holder), &["Pension".into()], "alice")
            .unwrap();
        assert!(s.exists_impl(&BeanId::singleton("Pension")).unwrap());
    }

    #[test]
    fn failed_write_drops_its_singletons() {
        let s = store();
        s.create_all_impl(&[pool("p1")], "alice").unwrap();

        let err = s
            .write_all_impl(WriteKind::Create, &[pool("p1")], &["Pension".into()], "alice")
            .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists { .. }));
        assert!(!s.exists_impl(&BeanId::singleton("Pension")).unwrap());

        let err = s
            .write_all_impl(WriteKind::Merge, &[pool("p9")], &["Pension".into()], "alice")
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(s.list_impl("Pension").unwrap().is_empty());
    }
}
