//! Storage backend for the beanconf system.
//!
//! Provides the [`BeanStore`] and [`SchemaRegistry`] traits and a SQLite
//! implementation of both ([`SqliteStore`]).

pub mod error;
pub mod sqlite;
pub mod traits;

// Re-exports for convenience.
pub use error::StorageError;
pub use sqlite::SqliteStore;
pub use traits::{BeanStore, DEFAULT_SUCCESSOR_DEPTH, SchemaRegistry, WriteKind};

// ---------------------------------------------------------------------------
// Trait implementations for SqliteStore
// ---------------------------------------------------------------------------

use std::collections::BTreeMap;

use beanconf_core::{Bean, BeanEvent, BeanGraph, BeanId, Schema};

use crate::error::Result;

impl BeanStore for SqliteStore {
    fn create(&self, bean: &Bean, actor: &str) -> Result<()> {
        self.create_all_impl(std::slice::from_ref(bean), actor)
    }

    fn create_all(&self, beans: &[Bean], actor: &str) -> Result<()> {
        self.create_all_impl(beans, actor)
    }

    fn set(&self, bean: &Bean, actor: &str) -> Result<()> {
        self.set_all_impl(std::slice::from_ref(bean), actor)
    }

    fn set_all(&self, beans: &[Bean], actor: &str) -> Result<()> {
        self.set_all_impl(beans, actor)
    }

    fn merge(&self, bean: &Bean, actor: &str) -> Result<()> {
        self.merge_all_impl(std::slice::from_ref(bean), actor)
    }

    fn merge_all(&self, beans: &[Bean], actor: &str) -> Result<()> {
        self.merge_all_impl(beans, actor)
    }

    fn write_all(
        &self,
        kind: WriteKind,
        beans: &[Bean],
        singletons: &[String],
        actor: &str,
    ) -> Result<()> {
        self.write_all_impl(kind, beans, singletons, actor)
    }

    fn delete(&self, id: &BeanId, actor: &str) -> Result<()> {
        self.delete_all_impl(&id.schema_name, std::slice::from_ref(&id.instance_id), actor)
    }

    fn delete_all(&self, schema_name: &str, instance_ids: &[String], actor: &str) -> Result<()> {
        self.delete_all_impl(schema_name, instance_ids, actor)
    }

    fn get(&self, id: &BeanId) -> Result<BeanGraph> {
        self.get_impl(id)
    }

    fn get_lazy(&self, id: &BeanId) -> Result<Bean> {
        self.get_lazy_impl(id)
    }

    fn get_eager(&self, id: &BeanId) -> Result<BeanGraph> {
        self.get_eager_impl(id)
    }

    fn exists(&self, id: &BeanId) -> Result<bool> {
        self.exists_impl(id)
    }

    fn list(&self, schema_name: &str) -> Result<BTreeMap<BeanId, Bean>> {
        self.list_impl(schema_name)
    }

    fn get_singleton(&self, schema_name: &str) -> Result<Bean> {
        self.get_singleton_impl(schema_name)
    }

    fn get_beans_to_validate(&self, ids: &[BeanId]) -> Result<BeanGraph> {
        self.get_beans_to_validate_impl(ids)
    }

    fn get_events(&self, id: &BeanId, limit: usize) -> Result<Vec<BeanEvent>> {
        self.get_events_impl(id, limit)
    }
}

impl SchemaRegistry for SqliteStore {
    fn get_schemas(&self) -> Result<BTreeMap<String, Schema>> {
        self.get_schemas_impl()
    }

    fn get_schema(&self, name: &str) -> Result<Schema> {
        self.get_schema_impl(name)
    }

    fn register_schema(&self, schema: &Schema) -> Result<()> {
        self.register_schema_impl(schema)
    }

    fn remove_schema(&self, name: &str) -> Result<()> {
        self.remove_schema_impl(name)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use beanconf_core::BeanBuilder;

    use super::*;

    #[test]
    fn usable_as_trait_objects() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let beans: Arc<dyn BeanStore> = store.clone();
        let registry: Arc<dyn SchemaRegistry> = store;

        registry.register_schema(&Schema::new("Pool")).unwrap();
        beans
            .create(&BeanBuilder::new("Pool", "p1").build(), "alice")
            .unwrap();

        assert!(beans.exists(&BeanId::new("Pool", "p1")).unwrap());
        beans.delete(&BeanId::new("Pool", "p1"), "alice").unwrap();
        assert!(!beans.exists(&BeanId::new("Pool", "p1")).unwrap());
        assert_eq!(registry.get_schemas().unwrap().len(), 1);
    }
}
