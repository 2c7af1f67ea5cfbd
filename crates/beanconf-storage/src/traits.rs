//! BeanStore and SchemaRegistry traits -- the collaborator contracts the
//! admin core depends on.
//!
//! Consumers depend on these traits rather than on concrete implementations
//! so that alternative backends (mocks, proxies, etc.) can be substituted.

use std::collections::BTreeMap;

use beanconf_core::{Bean, BeanEvent, BeanGraph, BeanId, Schema};

use crate::error::Result;

/// Default number of successor hops loaded around every referrer when
/// computing the beans to validate.
pub const DEFAULT_SUCCESSOR_DEPTH: u32 = 2;

/// The kind of a batch write handed to [`BeanStore::write_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Create,
    Set,
    Merge,
}

// ---------------------------------------------------------------------------
// BeanStore trait
// ---------------------------------------------------------------------------

/// Durable bean persistence.
///
/// Every write method is one atomic unit: it either applies to all given
/// beans or to none. Beans returned by the store never carry a schema.
pub trait BeanStore: Send + Sync {
    // -- Writes --------------------------------------------------------------

    /// Stores a new bean. Fails if the id exists or a reference target is
    /// missing.
    fn create(&self, bean: &Bean, actor: &str) -> Result<()>;

    /// Stores several new beans. References may point at beans of the
    /// same batch.
    fn create_all(&self, beans: &[Bean], actor: &str) -> Result<()>;

    /// Replaces all properties and references of an existing bean.
    fn set(&self, bean: &Bean, actor: &str) -> Result<()>;

    fn set_all(&self, beans: &[Bean], actor: &str) -> Result<()>;

    /// Partially updates an existing bean: named entries are replaced,
    /// entries with an empty value list are removed, the rest is kept.
    fn merge(&self, bean: &Bean, actor: &str) -> Result<()>;

    fn merge_all(&self, beans: &[Bean], actor: &str) -> Result<()>;

    /// Creates the missing instances of the `singletons` schemas, then
    /// applies a create, set or merge of `beans`, all in one atomic unit.
    fn write_all(
        &self,
        kind: WriteKind,
        beans: &[Bean],
        singletons: &[String],
        actor: &str,
    ) -> Result<()>;

    /// Deletes a bean. Fails while another bean references it.
    fn delete(&self, id: &BeanId, actor: &str) -> Result<()>;

    /// Deletes several beans of one schema. References between the deleted
    /// beans do not block the deletion.
    fn delete_all(&self, schema_name: &str, instance_ids: &[String], actor: &str) -> Result<()>;

    // -- Reads ---------------------------------------------------------------

    /// Fetches a bean together with its direct reference targets.
    fn get(&self, id: &BeanId) -> Result<BeanGraph>;

    /// Fetches a bean alone; references stay unresolved ids.
    fn get_lazy(&self, id: &BeanId) -> Result<Bean>;

    /// Fetches a bean and everything it transitively references.
    fn get_eager(&self, id: &BeanId) -> Result<BeanGraph>;

    fn exists(&self, id: &BeanId) -> Result<bool>;

    /// All beans of a schema, keyed by id.
    fn list(&self, schema_name: &str) -> Result<BTreeMap<BeanId, Bean>>;

    /// Returns the single instance of a singleton schema, creating an
    /// empty one on first access.
    fn get_singleton(&self, schema_name: &str) -> Result<Bean>;

    /// The given beans plus all their direct and indirect referrers as
    /// roots, with successors loaded a bounded number of hops around each
    /// root so validators can navigate.
    fn get_beans_to_validate(&self, ids: &[BeanId]) -> Result<BeanGraph>;

    /// Audit trail of a bean, newest first.
    fn get_events(&self, id: &BeanId, limit: usize) -> Result<Vec<BeanEvent>>;
}

// ---------------------------------------------------------------------------
// SchemaRegistry trait
// ---------------------------------------------------------------------------

/// Source of schema definitions. The admin core only reads from it.
pub trait SchemaRegistry: Send + Sync {
    /// All registered schemas keyed by name.
    fn get_schemas(&self) -> Result<BTreeMap<String, Schema>>;

    fn get_schema(&self, name: &str) -> Result<Schema>;

    /// Registers a schema, replacing any previous definition of that name.
    fn register_schema(&self, schema: &Schema) -> Result<()>;

    /// Removes a schema. Fails while beans of it are stored.
    fn remove_schema(&self, name: &str) -> Result<()>;
}
