//! Reference resolver.
//!
//! References are resolved by making their targets present in the
//! operation's [`BeanGraph`]. Beans supplied by the caller are inserted
//! first, so they always win over stored beans with the same id, and the
//! graph doubles as the fetch cache of one operation.

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::Arc;

use tracing::debug;

use beanconf_core::{Bean, BeanGraph, BeanId, SchemaPropertyRef};
use beanconf_storage::BeanStore;

use crate::attach::{SchemaMap, attach_graph, lookup};
use crate::error::{AdminError, Result};

/// In-flight state of one write operation.
#[derive(Debug, Default)]
pub struct Resolution {
    pub graph: BeanGraph,
    /// Singleton schemas whose instance is referenced or written but does
    /// not exist in the store yet. The store creates them in the same
    /// transaction as the write, after validation passed.
    pub pending_singletons: BTreeSet<String>,
}

impl Resolution {
    pub fn new(graph: BeanGraph) -> Self {
        Self {
            graph,
            pending_singletons: BTreeSet::new(),
        }
    }

    /// Adds an empty, schema-attached stand-in for a singleton that is not
    /// stored yet.
    pub fn add_pending_singleton(&mut self, id: BeanId, schemas: &SchemaMap) -> Result<()> {
        let schema = lookup(schemas, &id.schema_name)?;
        let mut bean = Bean::new(id);
        bean.attach_schema(Arc::clone(schema));
        self.pending_singletons.insert(schema.name.clone());
        self.graph.insert_if_absent(bean);
        Ok(())
    }
}

/// Resolves every reference of the beans `ids` for validation.
///
/// Targets already in the graph are used as they are. Others are fetched
/// lazily from the store and get their schema attached. A target that
/// exists nowhere fails with [`AdminError::InvalidReference`], unless it is
/// the not yet created instance of a singleton schema.
pub fn resolve_for_validation(
    resolution: &mut Resolution,
    ids: &[BeanId],
    store: &dyn BeanStore,
    schemas: &SchemaMap,
) -> Result<()> {
    let mut fetched = 0usize;
    for id in ids {
        let targets: Vec<BeanId> = match resolution.graph.get(id) {
            Some(bean) => bean.all_reference_ids().cloned().collect(),
            None => continue,
        };
        for target in targets {
            if resolution.graph.contains(&target) {
                continue;
            }
            let schema = lookup(schemas, &target.schema_name)?;
            match store.get_lazy(&target) {
                Ok(mut bean) => {
                    bean.attach_schema(Arc::clone(schema));
                    resolution.graph.insert(bean);
                    fetched += 1;
                }
                Err(e) if e.is_not_found() => {
                    if schema.singleton && target == BeanId::singleton(&schema.name) {
                        resolution.add_pending_singleton(target, schemas)?;
                    } else {
                        return Err(AdminError::InvalidReference {
                            from: id.clone(),
                            to: target,
                        });
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
    debug!(beans = ids.len(), fetched, "resolved references");
    Ok(())
}

/// Binds every singleton reference declared by the schemas of the beans in
/// `graph` to the single instance of its target schema.
///
/// The binding replaces whatever the bean stored. Missing singletons are
/// created by the store on first access, then loaded with everything they
/// reference, and their own singleton references are resolved in turn.
pub fn resolve_singletons(
    graph: &mut BeanGraph,
    store: &dyn BeanStore,
    schemas: &SchemaMap,
) -> Result<()> {
    let mut visited: HashSet<BeanId> = HashSet::new();
    let mut queue: VecDeque<BeanId> = graph.ids().into();

    while let Some(id) = queue.pop_front() {
        if !visited.insert(id.clone()) {
            continue;
        }
        let decls: Vec<SchemaPropertyRef> = match graph.get(&id).and_then(|b| b.schema.clone()) {
            Some(schema) => schema.singleton_references().cloned().collect(),
            None => continue,
        };

        for decl in decls {
            let target = BeanId::singleton(&decl.schema_name);
            if !graph.contains(&target) {
                lookup(schemas, &decl.schema_name)?;
                store.get_singleton(&decl.schema_name)?;
                let mut loaded = store.get_eager(&target)?;
                attach_graph(&mut loaded, schemas)?;
                for bean in loaded.into_beans() {
                    let bean_id = bean.id.clone();
                    if graph.insert_if_absent(bean) {
                        queue.push_back(bean_id);
                    }
                }
                debug!(bean = %id, singleton = %target, "materialized singleton");
            }
            if let Some(bean) = graph.get_mut(&id) {
                bean.set_reference(decl.name.clone(), vec![target]);
            }
        }
    }
    Ok(())
}
