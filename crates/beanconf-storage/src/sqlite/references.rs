//! Reference lookups and graph traversal for [`SqliteStore`].

use std::collections::{HashSet, VecDeque};

use rusqlite::{Connection, params};
use tracing::debug;

use beanconf_core::{Bean, BeanGraph, BeanId};

use crate::error::{Result, StorageError};
use crate::sqlite::beans::{bean_exists_on_conn, load_bean_on_conn};
use crate::sqlite::store::SqliteStore;

// ---------------------------------------------------------------------------
// Connection-level helpers
// ---------------------------------------------------------------------------

/// Beans holding at least one reference to `id`, sorted and deduplicated.
pub(crate) fn referrers_on_conn(conn: &Connection, id: &BeanId) -> Result<Vec<BeanId>> {
    let mut stmt = conn.prepare_cached(
        "SELECT DISTINCT schema_name, instance_id FROM bean_references
         WHERE target_schema = ?1 AND target_instance = ?2
         ORDER BY schema_name, instance_id",
    )?;
    let rows = stmt.query_map(params![id.schema_name, id.instance_id], |row| {
        Ok(BeanId::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Fails with [`StorageError::MissingReference`] on the first target of
/// `bean` that is not stored.
pub(crate) fn check_references_on_conn(conn: &Connection, bean: &Bean) -> Result<()> {
    for target in bean.all_reference_ids() {
        if !bean_exists_on_conn(conn, target)? {
            return Err(StorageError::MissingReference {
                from: bean.id.clone(),
                to: target.clone(),
            });
        }
    }
    Ok(())
}

/// Loads the successors of every bean in `graph` up to `depth` hops away
/// from `start`. Ids already in the graph are not fetched again.
fn load_successors(
    conn: &Connection,
    graph: &mut BeanGraph,
    start: &[BeanId],
    depth: Option<u32>,
) -> Result<()> {
    let mut visited: HashSet<BeanId> = start.iter().cloned().collect();
    let mut queue: VecDeque<(BeanId, u32)> = start.iter().map(|id| (id.clone(), 0)).collect();

    while let Some((current, hops)) = queue.pop_front() {
        if depth.is_some_and(|max| hops >= max) {
            continue;
        }
        let targets: Vec<BeanId> = match graph.get(&current) {
            Some(bean) => bean.all_reference_ids().cloned().collect(),
            None => continue,
        };
        for target in targets {
            if !visited.insert(target.clone()) {
                continue;
            }
            if !graph.contains(&target) {
                match load_bean_on_conn(conn, &target) {
                    Ok(bean) => {
                        graph.insert(bean);
                    }
                    // Dangling targets stay unresolved.
                    Err(e) if e.is_not_found() => continue,
                    Err(e) => return Err(e),
                }
            }
            queue.push_back((target, hops + 1));
        }
    }
    Ok(())
}

/// A bean with its direct reference targets.
pub(crate) fn get_on_conn(conn: &Connection, id: &BeanId) -> Result<BeanGraph> {
    let mut graph = BeanGraph::with_root(load_bean_on_conn(conn, id)?);
    load_successors(conn, &mut graph, std::slice::from_ref(id), Some(1))?;
    Ok(graph)
}

/// A bean with its transitive closure of reference targets.
pub(crate) fn get_eager_on_conn(conn: &Connection, id: &BeanId) -> Result<BeanGraph> {
    let mut graph = BeanGraph::with_root(load_bean_on_conn(conn, id)?);
    load_successors(conn, &mut graph, std::slice::from_ref(id), None)?;
    Ok(graph)
}

/// The given beans and all their direct and indirect referrers as roots,
/// plus successors up to `successor_depth` hops around every root.
pub(crate) fn beans_to_validate_on_conn(
    conn: &Connection,
    ids: &[BeanId],
    successor_depth: u32,
) -> Result<BeanGraph> {
    let mut graph = BeanGraph::new();
    let mut visited: HashSet<BeanId> = HashSet::new();
    let mut queue: VecDeque<BeanId> = VecDeque::new();

    for id in ids {
        if visited.insert(id.clone()) {
            queue.push_back(id.clone());
        }
    }

    while let Some(current) = queue.pop_front() {
        graph.insert_root(load_bean_on_conn(conn, &current)?);
        for referrer in referrers_on_conn(conn, &current)? {
            if visited.insert(referrer.clone()) {
                queue.push_back(referrer);
            }
        }
    }

    let roots = graph.root_ids().to_vec();
    load_successors(conn, &mut graph, &roots, Some(successor_depth))?;
    debug!(
        requested = ids.len(),
        roots = roots.len(),
        total = graph.len(),
        "collected beans to validate"
    );
    Ok(graph)
}

// ---------------------------------------------------------------------------
// SqliteStore methods
// ---------------------------------------------------------------------------

impl SqliteStore {
    pub fn get_impl(&self, id: &BeanId) -> Result<BeanGraph> {
        let conn = self.lock_conn()?;
        get_on_conn(&conn, id)
    }

    pub fn get_eager_impl(&self, id: &BeanId) -> Result<BeanGraph> {
        let conn = self.lock_conn()?;
        get_eager_on_conn(&conn, id)
    }

    pub fn get_beans_to_validate_impl(&self, ids: &[BeanId]) -> Result<BeanGraph> {
        let conn = self.lock_conn()?;
        beans_to_validate_on_conn(&conn, ids, self.successor_depth)
    }

    pub fn referrers(&self, id: &BeanId) -> Result<Vec<BeanId>> {
        let conn = self.lock_conn()?;
        referrers_on_conn(&conn, id)
    }
}

#[cfg(test)]
mod tests {
    use beanconf_core::BeanBuilder;
    use pretty_assertions::assert_eq;

    use super::*;

    fn id(schema: &str, instance: &str) -> BeanId {
        BeanId::new(schema, instance)
    }

    /// a -> b -> c -> d, x -> a, plus a self loop on c.
    fn chain_store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        let beans = vec![
            BeanBuilder::new("N", "d").build(),
            BeanBuilder::new("N", "c")
                .reference_list("next", vec![id("N", "d"), id("N", "c")])
                .build(),
            BeanBuilder::new("N", "b").reference("next", id("N", "c")).build(),
            BeanBuilder::new("N", "a").reference("next", id("N", "b")).build(),
            BeanBuilder::new("X", "x").reference("to", id("N", "a")).build(),
        ];
        store.create_all_impl(&beans, "test").unwrap();
        store
    }

    #[test]
    fn get_loads_direct_targets_only() {
        let store = chain_store();
        let graph = store.get_impl(&id("N", "a")).unwrap();
        assert_eq!(graph.ids(), vec![id("N", "a"), id("N", "b")]);
        assert_eq!(graph.root().unwrap().id, id("N", "a"));
        assert_eq!(graph.unresolved_ids(), vec![id("N", "c")]);
    }

    #[test]
    fn get_eager_follows_cycles_once() {
        let store = chain_store();
        let graph = store.get_eager_impl(&id("X", "x")).unwrap();
        assert_eq!(graph.len(), 5);
        assert!(graph.unresolved_ids().is_empty());
    }

    #[test]
    fn referrers_sorted() {
        let store = chain_store();
        assert_eq!(store.referrers(&id("N", "c")).unwrap(), vec![id("N", "b"), id("N", "c")]);
        assert!(store.referrers(&id("X", "x")).unwrap().is_empty());
    }

    #[test]
    fn beans_to_validate_collects_referrers_as_roots() {
        let store = chain_store();
        let graph = store.get_beans_to_validate_impl(&[id("N", "c")]).unwrap();

        let mut roots = graph.root_ids().to_vec();
        roots.sort();
        assert_eq!(
            roots,
            vec![id("N", "a"), id("N", "b"), id("N", "c"), id("X", "x")]
        );
        assert!(graph.contains(&id("N", "d")));
    }

    #[test]
    fn beans_to_validate_bounds_successors() {
        let store = chain_store().with_successor_depth(1);
        let graph = store.get_beans_to_validate_impl(&[id("X", "x")]).unwrap();
        assert_eq!(graph.root_ids(), &[id("X", "x")]);
        assert_eq!(graph.ids(), vec![id("N", "a"), id("X", "x")]);
    }

    #[test]
    fn beans_to_validate_missing_bean_fails() {
        let store = chain_store();
        let err = store
            .get_beans_to_validate_impl(&[id("N", "zz")])
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
