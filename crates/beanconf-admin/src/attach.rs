//! Schema attacher: binds registered schemas to raw beans.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use beanconf_core::{Bean, BeanGraph, Schema};

use crate::error::{AdminError, Result};

/// Registered schemas keyed by name, shared by every bean of one operation.
pub type SchemaMap = HashMap<String, Arc<Schema>>;

/// Builds a [`SchemaMap`] from a registry listing.
pub fn schema_map(schemas: BTreeMap<String, Schema>) -> SchemaMap {
    schemas
        .into_iter()
        .map(|(name, schema)| (name, Arc::new(schema)))
        .collect()
}

/// Looks up the schema named `name`.
pub fn lookup<'a>(schemas: &'a SchemaMap, name: &str) -> Result<&'a Arc<Schema>> {
    schemas
        .get(name)
        .ok_or_else(|| AdminError::SchemaNotFound(name.to_string()))
}

/// Binds the schema of `bean`. Attaching again is harmless.
pub fn attach_schema(bean: &mut Bean, schemas: &SchemaMap) -> Result<()> {
    let schema = lookup(schemas, &bean.id.schema_name)?;
    bean.attach_schema(Arc::clone(schema));
    Ok(())
}

/// Binds schemas to every bean of `graph`.
///
/// The graph holds each bean once, so beans reached through several
/// referrers or through a cycle are visited a single time.
pub fn attach_graph(graph: &mut BeanGraph, schemas: &SchemaMap) -> Result<()> {
    for bean in graph.beans_mut() {
        attach_schema(bean, schemas)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use beanconf_core::{BeanBuilder, BeanId};

    use super::*;

    fn schemas() -> SchemaMap {
        let mut all = BTreeMap::new();
        all.insert("Node".to_string(), Schema::new("Node"));
        schema_map(all)
    }

    #[test]
    fn attaches_every_bean_of_a_cycle() {
        let a = BeanBuilder::new("Node", "a").reference("next", BeanId::new("Node", "b")).build();
        let b = BeanBuilder::new("Node", "b").reference("next", BeanId::new("Node", "a")).build();
        let mut graph = BeanGraph::with_root(a);
        graph.insert(b);

        attach_graph(&mut graph, &schemas()).unwrap();
        assert!(graph.beans().all(Bean::has_schema));
        // Idempotent.
        attach_graph(&mut graph, &schemas()).unwrap();
    }

    #[test]
    fn unknown_schema_fails() {
        let mut bean = BeanBuilder::new("Ghost", "g").build();
        let err = attach_schema(&mut bean, &schemas()).unwrap_err();
        assert!(matches!(err, AdminError::SchemaNotFound(ref name) if name == "Ghost"));
        assert!(!bean.has_schema());
    }
}
