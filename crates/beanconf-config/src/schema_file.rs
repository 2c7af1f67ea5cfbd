//! Schema definition files.
//!
//! A schema file is YAML with a top-level `schemas` list:
//!
//! ```yaml
//! schemas:
//!   - name: Pension
//!     singleton: true
//!     properties:
//!       - name: amount
//!         type: double
//!   - name: Grandfather
//!     properties:
//!       - name: name
//!         required: true
//!     references:
//!       - name: retirement
//!         schema: Pension
//!         singleton: true
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use beanconf_core::Schema;

use crate::config::{ConfigError, Result};

#[derive(Debug, Default, Serialize, Deserialize)]
struct SchemaFile {
    #[serde(default)]
    schemas: Vec<Schema>,
}

/// Parses schema definitions from YAML text.
///
/// Fails on a duplicate schema name or a blank name.
pub fn parse_schemas(content: &str) -> Result<Vec<Schema>> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let file: SchemaFile = serde_yaml::from_str(content)?;

    let mut seen = HashSet::new();
    for schema in &file.schemas {
        if schema.name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "schemas.name".into(),
                reason: "schema name must not be blank".into(),
            });
        }
        if !seen.insert(schema.name.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "schemas.name".into(),
                reason: format!("duplicate schema {}", schema.name),
            });
        }
    }
    Ok(file.schemas)
}

/// Reads and parses a schema definition file.
pub fn load_schema_file(path: &Path) -> Result<Vec<Schema>> {
    let content = std::fs::read_to_string(path)?;
    parse_schemas(&content)
}
