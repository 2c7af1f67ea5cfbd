//! Bean and BeanId -- the configuration instances administered by beanconf.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::schema::Schema;

/// Composite identity of a bean: `(schema_name, instance_id)`.
///
/// Ordering is by schema first so that listings group naturally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BeanId {
    #[serde(rename = "schema")]
    pub schema_name: String,

    #[serde(rename = "id")]
    pub instance_id: String,
}

impl BeanId {
    pub fn new(schema_name: impl Into<String>, instance_id: impl Into<String>) -> Self {
        Self {
            schema_name: schema_name.into(),
            instance_id: instance_id.into(),
        }
    }

    /// The id of the single instance of a singleton schema.
    ///
    /// Singletons use the schema name as their instance id.
    pub fn singleton(schema_name: impl Into<String>) -> Self {
        let schema_name = schema_name.into();
        Self {
            instance_id: schema_name.clone(),
            schema_name,
        }
    }

    /// Returns `true` if the instance id is empty or whitespace only.
    pub fn is_missing_instance(&self) -> bool {
        self.instance_id.trim().is_empty()
    }
}

impl fmt::Display for BeanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.schema_name, self.instance_id)
    }
}

/// A configuration instance: identity, string-valued properties and
/// references to other beans.
///
/// Beans arrive from callers and storage without a schema. The admin layer
/// attaches one before validation or type conversion; attaching is
/// idempotent. The attached schema never takes part in equality or
/// serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bean {
    pub id: BeanId,

    /// Property name -> ordered values. An empty list in a merge request
    /// means "delete this property".
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Vec<String>>,

    /// Reference name -> ordered target ids.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub references: BTreeMap<String, Vec<BeanId>>,

    #[serde(skip)]
    pub schema: Option<Arc<Schema>>,
}

impl PartialEq for Bean {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.properties == other.properties
            && self.references == other.references
    }
}

impl Eq for Bean {}

impl Bean {
    /// Creates an empty bean with the given identity.
    pub fn new(id: BeanId) -> Self {
        Self {
            id,
            properties: BTreeMap::new(),
            references: BTreeMap::new(),
            schema: None,
        }
    }

    /// Binds a schema to this bean. Re-attaching replaces the previous one.
    pub fn attach_schema(&mut self, schema: Arc<Schema>) {
        self.schema = Some(schema);
    }

    pub fn has_schema(&self) -> bool {
        self.schema.is_some()
    }

    /// Returns the values of a property, or an empty slice if absent.
    pub fn values(&self, name: &str) -> &[String] {
        self.properties.get(name).map_or(&[], Vec::as_slice)
    }

    /// Returns the first value of a property.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.values(name).first().map(String::as_str)
    }

    /// Returns the target ids of a reference, or an empty slice if absent.
    pub fn reference_ids(&self, name: &str) -> &[BeanId] {
        self.references.get(name).map_or(&[], Vec::as_slice)
    }

    pub fn set_property(&mut self, name: impl Into<String>, values: Vec<String>) {
        self.properties.insert(name.into(), values);
    }

    pub fn set_reference(&mut self, name: impl Into<String>, targets: Vec<BeanId>) {
        self.references.insert(name.into(), targets);
    }

    /// Iterates over every referenced id, across all reference names.
    pub fn all_reference_ids(&self) -> impl Iterator<Item = &BeanId> {
        self.references.values().flatten()
    }

    /// Drops every property and reference. Used to get replace semantics
    /// out of [`Bean::merge_from`].
    pub fn clear(&mut self) {
        self.properties.clear();
        self.references.clear();
    }

    /// Applies `other` onto this bean with partial-update semantics.
    ///
    /// Properties and references named in `other` replace the current
    /// values wholesale; an empty list removes the entry. Entries not named
    /// in `other` are left untouched.
    pub fn merge_from(&mut self, other: &Bean) {
        for (name, values) in &other.properties {
            if values.is_empty() {
                self.properties.remove(name);
            } else {
                self.properties.insert(name.clone(), values.clone());
            }
        }
        for (name, targets) in &other.references {
            if targets.is_empty() {
                self.references.remove(name);
            } else {
                self.references.insert(name.clone(), targets.clone());
            }
        }
    }

    /// Drops entries whose value lists are empty.
    ///
    /// Create and set requests store nothing for an empty list.
    pub fn without_empty_entries(mut self) -> Self {
        self.properties.retain(|_, v| !v.is_empty());
        self.references.retain(|_, v| !v.is_empty());
        self
    }
}

/// Builder for [`Bean`], mostly used by tests and the CLI.
#[derive(Debug, Clone)]
pub struct BeanBuilder {
    bean: Bean,
}

impl BeanBuilder {
    pub fn new(schema_name: impl Into<String>, instance_id: impl Into<String>) -> Self {
        Self {
            bean: Bean::new(BeanId::new(schema_name, instance_id)),
        }
    }

    /// Sets a single-valued property.
    pub fn property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.bean.set_property(name, vec![value.into()]);
        self
    }

    /// Sets a property to a list of values (possibly empty).
    pub fn property_list<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bean
            .set_property(name, values.into_iter().map(Into::into).collect());
        self
    }

    /// Sets a reference to a single target.
    pub fn reference(mut self, name: impl Into<String>, target: BeanId) -> Self {
        self.bean.set_reference(name, vec![target]);
        self
    }

    /// Sets a reference to a list of targets (possibly empty).
    pub fn reference_list(mut self, name: impl Into<String>, targets: Vec<BeanId>) -> Self {
        self.bean.set_reference(name, targets);
        self
    }

    pub fn build(self) -> Bean {
        self.bean
    }
}
