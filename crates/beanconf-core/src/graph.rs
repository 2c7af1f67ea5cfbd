//! [`BeanGraph`] -- the in-flight resolution arena of one operation.
//!
//! References on a [`Bean`] are plain [`BeanId`]s. A reference counts as
//! resolved when its target is present in the graph. Each id maps to
//! exactly one bean, so a bean reached through several referrers (or
//! through a cycle) is stored and mutated once.

use std::collections::{BTreeSet, HashMap};

use crate::bean::{Bean, BeanId};

#[derive(Debug, Clone, Default)]
pub struct BeanGraph {
    beans: HashMap<BeanId, Bean>,
    roots: Vec<BeanId>,
}

impl BeanGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// A graph holding a single root bean.
    pub fn with_root(bean: Bean) -> Self {
        let mut graph = Self::new();
        graph.insert_root(bean);
        graph
    }

    /// Inserts a bean, replacing any bean with the same id.
    pub fn insert(&mut self, bean: Bean) -> Option<Bean> {
        self.beans.insert(bean.id.clone(), bean)
    }

    /// Inserts a bean only if its id is not present yet. Returns `true`
    /// when inserted.
    pub fn insert_if_absent(&mut self, bean: Bean) -> bool {
        if self.beans.contains_key(&bean.id) {
            return false;
        }
        self.beans.insert(bean.id.clone(), bean);
        true
    }

    /// Inserts (replacing) a bean and marks it as a root.
    pub fn insert_root(&mut self, bean: Bean) {
        let id = bean.id.clone();
        self.beans.insert(id.clone(), bean);
        self.mark_root(id);
    }

    /// Marks an already present id as root. Duplicate marks are ignored.
    pub fn mark_root(&mut self, id: BeanId) {
        if !self.roots.contains(&id) {
            self.roots.push(id);
        }
    }

    pub fn contains(&self, id: &BeanId) -> bool {
        self.beans.contains_key(id)
    }

    pub fn get(&self, id: &BeanId) -> Option<&Bean> {
        self.beans.get(id)
    }

    pub fn get_mut(&mut self, id: &BeanId) -> Option<&mut Bean> {
        self.beans.get_mut(id)
    }

    /// The first root, if any.
    pub fn root(&self) -> Option<&Bean> {
        self.roots.first().and_then(|id| self.beans.get(id))
    }

    pub fn root_ids(&self) -> &[BeanId] {
        &self.roots
    }

    /// Root beans in insertion order.
    pub fn roots(&self) -> impl Iterator<Item = &Bean> {
        self.roots.iter().filter_map(|id| self.beans.get(id))
    }

    /// All beans, in no particular order.
    pub fn beans(&self) -> impl Iterator<Item = &Bean> {
        self.beans.values()
    }

    pub fn beans_mut(&mut self) -> impl Iterator<Item = &mut Bean> {
        self.beans.values_mut()
    }

    /// All ids, sorted.
    pub fn ids(&self) -> Vec<BeanId> {
        let mut ids: Vec<BeanId> = self.beans.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.beans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beans.is_empty()
    }

    /// Resolved targets of `bean`'s reference `name`. Targets not present
    /// in the graph are skipped.
    pub fn resolve<'a>(&'a self, bean: &Bean, name: &str) -> Vec<&'a Bean> {
        bean.reference_ids(name)
            .iter()
            .filter_map(|id| self.beans.get(id))
            .collect()
    }

    /// Referenced ids whose targets are not in the graph, sorted and
    /// deduplicated.
    pub fn unresolved_ids(&self) -> Vec<BeanId> {
        let missing: BTreeSet<&BeanId> = self
            .beans
            .values()
            .flat_map(Bean::all_reference_ids)
            .filter(|id| !self.beans.contains_key(*id))
            .collect();
        missing.into_iter().cloned().collect()
    }

    /// Beans for display: roots first, then the rest sorted by id.
    pub fn ordered(&self) -> Vec<&Bean> {
        let mut out: Vec<&Bean> = self.roots().collect();
        let mut rest: Vec<&Bean> = self
            .beans
            .values()
            .filter(|b| !self.roots.contains(&b.id))
            .collect();
        rest.sort_by(|a, b| a.id.cmp(&b.id));
        out.extend(rest);
        out
    }

    /// Consumes the graph, returning the first root bean.
    pub fn into_root(mut self) -> Option<Bean> {
        let id = self.roots.first()?.clone();
        self.beans.remove(&id)
    }

    /// Consumes the graph, returning every bean in [`BeanGraph::ordered`]
    /// order.
    pub fn into_beans(self) -> Vec<Bean> {
        let order: Vec<BeanId> = self.ordered().into_iter().map(|b| b.id.clone()).collect();
        let mut beans = self.beans;
        order.iter().filter_map(|id| beans.remove(id)).collect()
    }
}
