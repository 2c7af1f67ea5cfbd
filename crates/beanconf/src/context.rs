//! Runtime context for command execution.
//!
//! The [`RuntimeContext`] holds the global flags. Commands that touch beans
//! open a [`Workspace`]: the discovered `.beanconf/` directory, its
//! configuration, the store and a [`BeanAdmin`] wired to it.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use beanconf_admin::{BeanAdmin, ConstraintValidator};
use beanconf_config::beanconf_dir::find_beanconf_dir;
use beanconf_config::{BeanconfConfig, load_config, load_schema_file};
use beanconf_storage::{BeanStore, SchemaRegistry, SqliteStore};

use crate::cli::GlobalArgs;

/// Runtime context passed to every command handler.
///
/// Constructed once in `main` after CLI parsing, before command dispatch.
#[derive(Debug)]
pub struct RuntimeContext {
    /// Explicit database path from `--db`.
    pub db_path: Option<PathBuf>,

    /// Explicit actor from `--actor` or `$BEANCONF_ACTOR`.
    pub actor: Option<String>,

    pub json: bool,

    pub verbose: bool,
}

/// An opened beanconf project.
pub struct Workspace {
    pub dir: PathBuf,
    pub config: BeanconfConfig,
    pub store: Arc<SqliteStore>,
    pub admin: BeanAdmin,
    /// Label recorded in the audit trail of every write.
    pub actor: String,
}

impl RuntimeContext {
    pub fn from_global_args(global: &GlobalArgs) -> Self {
        Self {
            db_path: global.db.as_ref().map(PathBuf::from),
            actor: global.actor.clone(),
            json: global.json,
            verbose: global.verbose,
        }
    }

    /// Discovers the `.beanconf` directory from the current directory.
    pub fn beanconf_dir(&self) -> Result<PathBuf> {
        let cwd = env::current_dir().context("failed to get current directory")?;
        find_beanconf_dir(&cwd)
            .context("no .beanconf directory found. Run 'beanconf init' to create one.")
    }

    /// Resolves the database path: `--db` wins over the `db` config key.
    pub fn db_path(&self, dir: &Path, config: &BeanconfConfig) -> PathBuf {
        self.db_path.clone().unwrap_or_else(|| config.db_path(dir))
    }

    /// Opens the store of `dir` with the configured successor depth.
    pub fn open_store(&self, dir: &Path, config: &BeanconfConfig) -> Result<SqliteStore> {
        let db_path = self.db_path(dir, config);
        let store = SqliteStore::open(&db_path)
            .with_context(|| format!("failed to open database: {}", db_path.display()))?;
        Ok(store.with_successor_depth(config.validation.successor_depth))
    }

    /// Opens the project containing the current directory.
    ///
    /// The schema files listed in the configuration are registered again on
    /// every open so edits to them take effect.
    pub fn open_workspace(&self) -> Result<Workspace> {
        let dir = self.beanconf_dir()?;
        let config = load_config(&dir)
            .with_context(|| format!("failed to load configuration from {}", dir.display()))?;
        let store = Arc::new(self.open_store(&dir, &config)?);
        sync_schemas(store.as_ref(), &config, &dir)?;

        let bean_store: Arc<dyn BeanStore> = store.clone();
        let registry: Arc<dyn SchemaRegistry> = store.clone();
        let mut builder = BeanAdmin::builder(bean_store, registry);
        if config.validation.constraints {
            builder = builder.validator(Arc::new(ConstraintValidator::new()));
        }

        let actor = resolve_actor(self.actor.as_deref(), config.actor.as_deref());
        debug!(dir = %dir.display(), actor = %actor, "opened workspace");
        Ok(Workspace {
            dir,
            admin: builder.build(),
            store,
            actor,
            config,
        })
    }
}

/// Registers every schema of the configured schema files.
pub fn sync_schemas(registry: &dyn SchemaRegistry, config: &BeanconfConfig, dir: &Path) -> Result<usize> {
    let mut count = 0;
    for path in config.schema_paths(dir) {
        let schemas = load_schema_file(&path)
            .with_context(|| format!("failed to load schema file: {}", path.display()))?;
        for schema in &schemas {
            registry
                .register_schema(schema)
                .with_context(|| format!("failed to register schema {}", schema.name))?;
        }
        count += schemas.len();
    }
    Ok(count)
}

/// Resolves the actor name.
///
/// Priority: explicit flag or `$BEANCONF_ACTOR` > `actor` config key >
/// `$USER` / `$USERNAME` > `"unknown"`.
fn resolve_actor(flag_value: Option<&str>, configured: Option<&str>) -> String {
    if let Some(actor) = [flag_value, configured]
        .into_iter()
        .flatten()
        .find(|a| !a.trim().is_empty())
    {
        return actor.to_string();
    }

    if let Ok(user) = env::var("USER").or_else(|_| env::var("USERNAME")) {
        if !user.is_empty() {
            return user;
        }
    }

    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_wins_over_config() {
        assert_eq!(resolve_actor(Some("cli"), Some("config")), "cli");
        assert_eq!(resolve_actor(None, Some("config")), "config");
    }

    #[test]
    fn blank_actor_falls_through() {
        assert_eq!(resolve_actor(Some("  "), Some("config")), "config");
        assert!(!resolve_actor(Some("  "), None).trim().is_empty());
    }
}
