//! [`BeanAdmin`] -- the public entry point composing schema attachment,
//! reference resolution, validation and storage for every operation.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info};

use beanconf_core::validation::validate_bean;
use beanconf_core::{Bean, BeanEvent, BeanGraph, BeanId, ConversionService, Schema};
use beanconf_storage::{BeanStore, SchemaRegistry, WriteKind};

use crate::attach::{SchemaMap, attach_graph, attach_schema, lookup, schema_map};
use crate::error::{AdminError, Result};
use crate::mutate::{UpdateMode, prepare_update};
use crate::resolve::{Resolution, resolve_for_validation, resolve_singletons};
use crate::validator::BeanValidator;

/// Administers beans against a store and a schema registry.
///
/// Stateless between calls. Every write is prepared in memory and checked
/// completely before the store is asked to persist it in one call.
pub struct BeanAdmin {
    store: Arc<dyn BeanStore>,
    registry: Arc<dyn SchemaRegistry>,
    validator: Option<Arc<dyn BeanValidator>>,
    conversions: ConversionService,
}

/// Builder for [`BeanAdmin`].
pub struct BeanAdminBuilder {
    store: Arc<dyn BeanStore>,
    registry: Arc<dyn SchemaRegistry>,
    validator: Option<Arc<dyn BeanValidator>>,
    conversions: ConversionService,
}

impl BeanAdminBuilder {
    /// Installs a validation engine. Without one the semantic validation
    /// step is skipped.
    pub fn validator(mut self, validator: Arc<dyn BeanValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Replaces the default conversion service, e.g. to add converters for
    /// custom property types.
    pub fn conversions(mut self, conversions: ConversionService) -> Self {
        self.conversions = conversions;
        self
    }

    pub fn build(self) -> BeanAdmin {
        BeanAdmin {
            store: self.store,
            registry: self.registry,
            validator: self.validator,
            conversions: self.conversions,
        }
    }
}

impl BeanAdmin {
    pub fn builder(store: Arc<dyn BeanStore>, registry: Arc<dyn SchemaRegistry>) -> BeanAdminBuilder {
        BeanAdminBuilder {
            store,
            registry,
            validator: None,
            conversions: ConversionService::new(),
        }
    }

    /// An admin without a validation engine.
    pub fn new(store: Arc<dyn BeanStore>, registry: Arc<dyn SchemaRegistry>) -> Self {
        Self::builder(store, registry).build()
    }

    fn schemas(&self) -> Result<SchemaMap> {
        Ok(schema_map(self.registry.get_schemas()?))
    }

    // -- Schemas -------------------------------------------------------------

    pub fn get_schemas(&self) -> Result<BTreeMap<String, Schema>> {
        Ok(self.registry.get_schemas()?)
    }

    pub fn get_schema(&self, name: &str) -> Result<Schema> {
        Ok(self.registry.get_schema(name)?)
    }

    // -- Reads ---------------------------------------------------------------

    /// Returns the bean `id` as the root of a graph holding everything it
    /// references, with schemas attached and singleton references bound.
    pub fn get(&self, id: &BeanId) -> Result<BeanGraph> {
        let schemas = self.schemas()?;
        let schema = lookup(&schemas, &id.schema_name)?;
        if schema.singleton && *id == BeanId::singleton(&schema.name) {
            self.store.get_singleton(&schema.name)?;
        }

        let mut graph = self.store.get_eager(id)?;
        attach_graph(&mut graph, &schemas)?;
        resolve_singletons(&mut graph, self.store.as_ref(), &schemas)?;
        debug!(bean = %id, loaded = graph.len(), "fetched bean");
        Ok(graph)
    }

    /// All beans of a schema, sorted by id, with schemas attached.
    pub fn list(&self, schema_name: &str) -> Result<Vec<Bean>> {
        let schemas = self.schemas()?;
        let schema = lookup(&schemas, schema_name)?;
        if schema.singleton {
            self.store.get_singleton(schema_name)?;
        }

        let mut beans = Vec::new();
        for mut bean in self.store.list(schema_name)?.into_values() {
            bean.attach_schema(Arc::clone(schema));
            beans.push(bean);
        }
        Ok(beans)
    }

    /// The beans of a schema with the given instance ids, in request order.
    /// Fails with [`AdminError::BeanNotFound`] on the first missing id.
    pub fn list_ids(&self, schema_name: &str, instance_ids: &[String]) -> Result<Vec<Bean>> {
        let mut all: BTreeMap<BeanId, Bean> = self
            .list(schema_name)?
            .into_iter()
            .map(|b| (b.id.clone(), b))
            .collect();

        instance_ids
            .iter()
            .map(|instance| {
                let id = BeanId::new(schema_name, instance.as_str());
                all.remove(&id)
                    .ok_or_else(|| AdminError::BeanNotFound(id.to_string()))
            })
            .collect()
    }

    /// Audit trail of a bean, newest first.
    pub fn events(&self, id: &BeanId, limit: usize) -> Result<Vec<BeanEvent>> {
        Ok(self.store.get_events(id, limit)?)
    }

    // -- Writes --------------------------------------------------------------

    pub fn create(&self, bean: &Bean, actor: &str) -> Result<()> {
        self.create_all(std::slice::from_ref(bean), actor)
    }

    /// Creates new beans. References may target beans of the same batch,
    /// stored beans, or the not yet materialized instance of a singleton
    /// schema.
    pub fn create_all(&self, beans: &[Bean], actor: &str) -> Result<()> {
        if beans.is_empty() {
            return Ok(());
        }
        let schemas = self.schemas()?;

        let mut graph = BeanGraph::new();
        let mut seen: HashSet<&BeanId> = HashSet::new();
        for bean in beans {
            let checked = self.check_incoming(bean, &schemas, "create")?;
            if !seen.insert(&bean.id) {
                return Err(AdminError::BeanAlreadyExists(bean.id.to_string()));
            }
            graph.insert_root(checked.without_empty_entries());
        }

        let mut resolution = Resolution::new(graph);
        let ids: Vec<BeanId> = beans.iter().map(|b| b.id.clone()).collect();
        resolve_for_validation(&mut resolution, &ids, self.store.as_ref(), &schemas)?;

        let stored: Vec<Bean> = beans.iter().cloned().map(Bean::without_empty_entries).collect();
        self.commit(&resolution, WriteKind::Create, &stored, actor)?;
        info!(count = beans.len(), actor, "created beans");
        Ok(())
    }

    pub fn set(&self, bean: &Bean, actor: &str) -> Result<()> {
        self.set_all(std::slice::from_ref(bean), actor)
    }

    /// Replaces existing beans: whatever is not supplied is dropped.
    pub fn set_all(&self, beans: &[Bean], actor: &str) -> Result<()> {
        self.update(beans, UpdateMode::Set, actor)
    }

    pub fn merge(&self, bean: &Bean, actor: &str) -> Result<()> {
        self.merge_all(std::slice::from_ref(bean), actor)
    }

    /// Partially updates existing beans: supplied entries replace stored
    /// ones, entries with empty lists are removed, the rest is kept.
    pub fn merge_all(&self, beans: &[Bean], actor: &str) -> Result<()> {
        self.update(beans, UpdateMode::Merge, actor)
    }

    pub fn delete(&self, id: &BeanId, actor: &str) -> Result<()> {
        self.delete_all(&id.schema_name, std::slice::from_ref(&id.instance_id), actor)
    }

    /// Deletes beans of one schema. Fails while any bean outside the
    /// deleted set still references one of them.
    pub fn delete_all(&self, schema_name: &str, instance_ids: &[String], actor: &str) -> Result<()> {
        let schemas = self.schemas()?;
        let schema = lookup(&schemas, schema_name)?;
        if schema.singleton {
            let instance = instance_ids.first().map_or(schema_name, String::as_str);
            return Err(AdminError::SingletonViolation {
                operation: "delete",
                schema: schema_name.to_string(),
                bean: BeanId::new(schema_name, instance),
            });
        }
        self.store.delete_all(schema_name, instance_ids, actor)?;
        info!(schema = schema_name, count = instance_ids.len(), actor, "deleted beans");
        Ok(())
    }

    // -- Internals -----------------------------------------------------------

    /// Attaches the schema to a copy of `bean` and runs the identity,
    /// multiplicity and type checks.
    fn check_incoming(&self, bean: &Bean, schemas: &SchemaMap, operation: &'static str) -> Result<Bean> {
        let mut checked = bean.clone();
        attach_schema(&mut checked, schemas)?;
        let schema = lookup(schemas, &bean.id.schema_name)?;
        if schema.singleton
            && (operation == "create" || bean.id != BeanId::singleton(&schema.name))
        {
            return Err(AdminError::SingletonViolation {
                operation,
                schema: schema.name.clone(),
                bean: bean.id.clone(),
            });
        }
        validate_bean(&checked, &self.conversions)?;
        Ok(checked)
    }

    fn update(&self, beans: &[Bean], mode: UpdateMode, actor: &str) -> Result<()> {
        if beans.is_empty() {
            return Ok(());
        }
        let schemas = self.schemas()?;
        for bean in beans {
            self.check_incoming(bean, &schemas, mode.as_str())?;
        }

        let resolution = prepare_update(beans, mode, self.store.as_ref(), &schemas)?;
        match mode {
            UpdateMode::Set => {
                let stored: Vec<Bean> =
                    beans.iter().cloned().map(Bean::without_empty_entries).collect();
                self.commit(&resolution, WriteKind::Set, &stored, actor)?;
            }
            UpdateMode::Merge => {
                self.commit(&resolution, WriteKind::Merge, beans, actor)?;
            }
        }
        info!(%mode, count = beans.len(), actor, "updated beans");
        Ok(())
    }

    /// Runs the validation engine over the prepared graph, then hands the
    /// write to the store together with the pending singletons, which are
    /// created in the same store transaction.
    fn commit(
        &self,
        resolution: &Resolution,
        kind: WriteKind,
        beans: &[Bean],
        actor: &str,
    ) -> Result<()> {
        if let Some(validator) = &self.validator {
            validator
                .validate(&resolution.graph)
                .map_err(AdminError::ValidationFailed)?;
        }
        let singletons: Vec<String> = resolution.pending_singletons.iter().cloned().collect();
        self.store.write_all(kind, beans, &singletons, actor)?;
        Ok(())
    }
}

impl std::fmt::Debug for BeanAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeanAdmin")
            .field("validator", &self.validator.is_some())
            .field("conversions", &self.conversions)
            .finish_non_exhaustive()
    }
}
