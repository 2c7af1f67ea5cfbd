//! Configuration types and loading for the beanconf system.
//!
//! The main entry point is [`BeanconfConfig`], which represents the contents
//! of `.beanconf/config.yaml`. Configuration is loaded with [`load_config`]
//! and saved with [`save_config`].
//!
//! Values are layered: built-in defaults, then the YAML file, then
//! `BEANCONF_` prefixed environment variables. Nested keys are separated by
//! a double underscore and single underscores stand for dashes, e.g.
//! `BEANCONF_VALIDATION__SUCCESSOR_DEPTH=3`.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use beanconf_storage::DEFAULT_SUCCESSOR_DEPTH;

/// File name of the configuration inside `.beanconf/`.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// File name of the default database inside `.beanconf/`.
pub const DEFAULT_DB_NAME: &str = "beanconf.db";

const ENV_PREFIX: &str = "BEANCONF_";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file could not be read or written.
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// A file contained invalid YAML.
    #[error("failed to parse config file: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// The layered configuration could not be extracted.
    #[error("invalid configuration: {0}")]
    Extract(#[from] figment::Error),

    /// The `.beanconf/` directory was not found.
    #[error("no .beanconf directory found (run 'beanconf init' first)")]
    BeanconfDirNotFound,

    /// A configuration value was invalid.
    #[error("invalid configuration value for key '{key}': {reason}")]
    InvalidValue {
        /// The configuration key that had an invalid value.
        key: String,
        /// A description of why the value is invalid.
        reason: String,
    },
}

/// A specialized `Result` type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Validation configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Successor hops the store loads around every referrer when it
    /// computes the beans to validate.
    #[serde(default = "default_successor_depth", rename = "successor-depth")]
    pub successor_depth: u32,

    /// Install the built-in constraint validator.
    #[serde(default = "default_true")]
    pub constraints: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            successor_depth: default_successor_depth(),
            constraints: true,
        }
    }
}

fn default_successor_depth() -> u32 {
    DEFAULT_SUCCESSOR_DEPTH
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// BeanconfConfig
// ---------------------------------------------------------------------------

/// Top-level configuration, stored in `.beanconf/config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BeanconfConfig {
    /// Database path. Relative paths resolve against `.beanconf/`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<String>,

    /// Default actor label recorded on writes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,

    /// Schema definition files, relative to `.beanconf/`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schemas: Vec<String>,

    #[serde(default)]
    pub validation: ValidationConfig,
}

impl BeanconfConfig {
    /// Resolves the database path for a configuration living in
    /// `beanconf_dir`.
    pub fn db_path(&self, beanconf_dir: &Path) -> PathBuf {
        match &self.db {
            Some(db) if Path::new(db).is_absolute() => PathBuf::from(db),
            Some(db) => beanconf_dir.join(db),
            None => beanconf_dir.join(DEFAULT_DB_NAME),
        }
    }

    /// Resolves the registered schema files against `beanconf_dir`.
    pub fn schema_paths(&self, beanconf_dir: &Path) -> Vec<PathBuf> {
        self.schemas.iter().map(|s| beanconf_dir.join(s)).collect()
    }

    /// Adds a schema file entry unless already listed. Returns `true` when
    /// added.
    pub fn add_schema_file(&mut self, file: impl Into<String>) -> bool {
        let file = file.into();
        if self.schemas.contains(&file) {
            return false;
        }
        self.schemas.push(file);
        true
    }

    fn check(self) -> Result<Self> {
        if self.actor.as_deref().is_some_and(|a| a.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                key: "actor".into(),
                reason: "must not be blank".into(),
            });
        }
        Ok(self)
    }
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// Loads the configuration of `beanconf_dir`.
///
/// A missing or empty `config.yaml` yields the defaults. Environment
/// variables override file values.
pub fn load_config(beanconf_dir: &Path) -> Result<BeanconfConfig> {
    let config_path = beanconf_dir.join(CONFIG_FILE_NAME);

    let mut figment = Figment::from(Serialized::defaults(BeanconfConfig::default()));

    // An empty file is valid and yields the defaults.
    if config_path.exists() && !std::fs::read_to_string(&config_path)?.trim().is_empty() {
        figment = figment.merge(Yaml::file(&config_path));
    }

    let config: BeanconfConfig = figment
        .merge(
            Env::prefixed(ENV_PREFIX)
                .ignore(&["DIR"])
                .split("__")
                .map(|key| key.as_str().replace('_', "-").into()),
        )
        .extract()?;
    config.check()
}

/// Writes `config` to `beanconf_dir/config.yaml`, creating the directory if
/// needed.
pub fn save_config(beanconf_dir: &Path, config: &BeanconfConfig) -> Result<()> {
    std::fs::create_dir_all(beanconf_dir)?;

    let config_path = beanconf_dir.join(CONFIG_FILE_NAME);
    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(config_path, yaml)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use figment::Jail;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        Jail::expect_with(|jail| {
            let config = load_config(jail.directory()).unwrap();
            assert_eq!(config, BeanconfConfig::default());
            assert_eq!(config.validation.successor_depth, DEFAULT_SUCCESSOR_DEPTH);
            assert!(config.validation.constraints);
            Ok(())
        });
    }

    #[test]
    fn empty_file_yields_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(CONFIG_FILE_NAME, "   \n")?;
            let config = load_config(jail.directory()).unwrap();
            assert_eq!(config, BeanconfConfig::default());
            Ok(())
        });
    }

    #[test]
    fn file_values_are_read() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE_NAME,
                r#"
db: data/app.db
actor: ops
schemas:
  - family.yaml
validation:
  successor-depth: 3
  constraints: false
"#,
            )?;
            let config = load_config(jail.directory()).unwrap();
            assert_eq!(config.db.as_deref(), Some("data/app.db"));
            assert_eq!(config.actor.as_deref(), Some("ops"));
            assert_eq!(config.schemas, vec!["family.yaml"]);
            assert_eq!(config.validation.successor_depth, 3);
            assert!(!config.validation.constraints);
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(CONFIG_FILE_NAME, "actor: file\n")?;
            jail.set_env("BEANCONF_ACTOR", "env");
            jail.set_env("BEANCONF_VALIDATION__CONSTRAINTS", "false");
            jail.set_env("BEANCONF_VALIDATION__SUCCESSOR_DEPTH", "4");
            jail.set_env("BEANCONF_DIR", "/somewhere/else");

            let config = load_config(jail.directory()).unwrap();
            assert_eq!(config.actor.as_deref(), Some("env"));
            assert!(!config.validation.constraints);
            assert_eq!(config.validation.successor_depth, 4);
            Ok(())
        });
    }

    #[test]
    fn blank_actor_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file(CONFIG_FILE_NAME, "actor: \"  \"\n")?;
            let err = load_config(jail.directory()).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { .. }));
            Ok(())
        });
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BeanconfConfig::default();
        config.actor = Some("alice".into());
        assert!(config.add_schema_file("family.yaml"));
        assert!(!config.add_schema_file("family.yaml"));
        config.validation.successor_depth = 5;

        save_config(dir.path(), &config).unwrap();
        let written = std::fs::read_to_string(dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert!(written.contains("successor-depth: 5"));

        let loaded: BeanconfConfig = serde_yaml::from_str(&written).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn db_path_resolution() {
        let dir = Path::new("/project/.beanconf");
        let mut config = BeanconfConfig::default();
        assert_eq!(config.db_path(dir), dir.join(DEFAULT_DB_NAME));

        config.db = Some("custom.db".into());
        assert_eq!(config.db_path(dir), dir.join("custom.db"));

        config.db = Some("/abs/beans.db".into());
        assert_eq!(config.db_path(dir), PathBuf::from("/abs/beans.db"));
    }
}
