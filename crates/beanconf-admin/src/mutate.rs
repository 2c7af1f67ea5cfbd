//! Graph mutator: set (replace) and merge (partial update) over the beans
//! affected by a write.

use std::fmt;

use tracing::debug;

use beanconf_core::{Bean, BeanGraph, BeanId};
use beanconf_storage::BeanStore;

use crate::attach::{SchemaMap, attach_graph, lookup};
use crate::error::{AdminError, Result};
use crate::resolve::{Resolution, resolve_for_validation};

/// How incoming beans are applied to their stored state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Everything not supplied is dropped.
    Set,
    /// Supplied entries replace stored ones, empty lists remove them, the
    /// rest is kept.
    Merge,
}

impl UpdateMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Merge => "merge",
        }
    }
}

impl fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Applies `incoming` to the graph of beans to validate and resolves the
/// new references.
///
/// The graph holds the updated beans and all their direct and indirect
/// referrers as roots, with successors loaded around them. Updated beans
/// are mutated in place; nothing is written to the store. Singleton
/// instances that do not exist yet start out empty and are recorded as
/// pending.
pub fn prepare_update(
    incoming: &[Bean],
    mode: UpdateMode,
    store: &dyn BeanStore,
    schemas: &SchemaMap,
) -> Result<Resolution> {
    let mut stored_ids: Vec<BeanId> = Vec::new();
    let mut unborn_singletons: Vec<BeanId> = Vec::new();
    for bean in incoming {
        let schema = lookup(schemas, &bean.id.schema_name)?;
        if schema.singleton && !store.exists(&bean.id)? {
            unborn_singletons.push(bean.id.clone());
        } else if !stored_ids.contains(&bean.id) {
            stored_ids.push(bean.id.clone());
        }
    }

    let graph = if stored_ids.is_empty() {
        BeanGraph::new()
    } else {
        store.get_beans_to_validate(&stored_ids)?
    };
    let mut resolution = Resolution::new(graph);
    for id in unborn_singletons {
        resolution.add_pending_singleton(id.clone(), schemas)?;
        resolution.graph.mark_root(id);
    }
    attach_graph(&mut resolution.graph, schemas)?;

    for bean in incoming {
        let target = resolution
            .graph
            .get_mut(&bean.id)
            .ok_or_else(|| AdminError::BeanNotFound(bean.id.to_string()))?;
        if mode == UpdateMode::Set {
            target.clear();
        }
        target.merge_from(bean);
    }

    let ids: Vec<BeanId> = incoming.iter().map(|b| b.id.clone()).collect();
    resolve_for_validation(&mut resolution, &ids, store, schemas)?;
    debug!(
        %mode,
        beans = incoming.len(),
        affected = resolution.graph.root_ids().len(),
        loaded = resolution.graph.len(),
        "prepared update"
    );
    Ok(resolution)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use beanconf_core::{BeanBuilder, PropertyType, Schema, SchemaProperty, SchemaPropertyRef};
    use beanconf_storage::SqliteStore;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::attach::schema_map;

    fn schemas() -> SchemaMap {
        let mut all = BTreeMap::new();
        for schema in [
            Schema::new("Pension")
                .as_singleton()
                .with_property(SchemaProperty::new("amount", PropertyType::Double)),
            Schema::new("Father")
                .with_property(SchemaProperty::new("name", PropertyType::String))
                .with_property(SchemaProperty::new("age", PropertyType::Integer)),
            Schema::new("Grandfather")
                .with_property(SchemaProperty::new("name", PropertyType::String))
                .with_reference(SchemaPropertyRef::list("children", "Father")),
        ] {
            all.insert(schema.name.clone(), schema);
        }
        schema_map(all)
    }

    fn seeded() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        let f1 = BeanBuilder::new("Father", "f1")
            .property("name", "Homer")
            .property("age", "39")
            .build();
        let f2 = BeanBuilder::new("Father", "f2").property("name", "Herb").build();
        let g1 = BeanBuilder::new("Grandfather", "g1")
            .property("name", "Abe")
            .reference_list("children", vec![f1.id.clone()])
            .build();
        store.create_all(&[f1, f2, g1], "test").unwrap();
        store
    }

    #[test]
    fn set_replaces_in_place_and_collects_referrers() {
        let store = seeded();
        let schemas = schemas();
        let incoming = BeanBuilder::new("Father", "f1").property("name", "Homer J").build();

        let resolution = prepare_update(
            std::slice::from_ref(&incoming),
            UpdateMode::Set,
            &store,
            &schemas,
        )
        .unwrap();

        assert_eq!(resolution.graph.get(&incoming.id), Some(&incoming));
        let mut roots = resolution.graph.root_ids().to_vec();
        roots.sort();
        assert_eq!(roots, vec![incoming.id.clone(), BeanId::new("Grandfather", "g1")]);
        assert!(resolution.graph.beans().all(Bean::has_schema));
        // Nothing written yet.
        assert_eq!(store.get_lazy(&incoming.id).unwrap().value("age"), Some("39"));
    }

    #[test]
    fn merge_keeps_unnamed_entries() {
        let store = seeded();
        let schemas = schemas();
        let incoming = BeanBuilder::new("Father", "f1")
            .property_list("name", Vec::<String>::new())
            .property("age", "40")
            .build();

        let resolution =
            prepare_update(&[incoming.clone()], UpdateMode::Merge, &store, &schemas).unwrap();
        let merged = resolution.graph.get(&incoming.id).unwrap();
        assert_eq!(merged.value("name"), None);
        assert_eq!(merged.value("age"), Some("40"));
    }

    #[test]
    fn new_references_are_resolved() {
        let store = seeded();
        let schemas = schemas();
        let incoming = BeanBuilder::new("Grandfather", "g1")
            .reference_list("children", vec![BeanId::new("Father", "f2")])
            .build();

        let resolution =
            prepare_update(&[incoming], UpdateMode::Merge, &store, &schemas).unwrap();
        assert!(resolution.graph.contains(&BeanId::new("Father", "f2")));
    }

    #[test]
    fn missing_target_bean_fails() {
        let store = seeded();
        let incoming = BeanBuilder::new("Father", "nobody").build();
        let err = prepare_update(&[incoming], UpdateMode::Set, &store, &schemas()).unwrap_err();
        assert!(matches!(err, AdminError::BeanNotFound(_)));
    }

    #[test]
    fn unborn_singleton_is_pending_root() {
        let store = seeded();
        let incoming = BeanBuilder::new("Pension", "Pension").property("amount", "12.5").build();
        let resolution =
            prepare_update(&[incoming.clone()], UpdateMode::Merge, &store, &schemas()).unwrap();

        assert_eq!(resolution.graph.root_ids(), &[incoming.id.clone()]);
        assert_eq!(resolution.graph.get(&incoming.id), Some(&incoming));
        assert!(resolution.pending_singletons.contains("Pension"));
        assert!(!store.exists(&incoming.id).unwrap());
    }
}
