//! Configuration management for the beanconf system.
//!
//! This crate handles loading and saving `.beanconf/config.yaml` files,
//! discovering `.beanconf/` directories in the filesystem, and reading
//! schema definition files.

pub mod beanconf_dir;
pub mod config;
pub mod schema_file;

pub use config::{BeanconfConfig, ConfigError, ValidationConfig, load_config, save_config};
pub use schema_file::{load_schema_file, parse_schemas};
