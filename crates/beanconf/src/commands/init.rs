//! `beanconf init` -- initialize a `.beanconf` directory in the current directory.

use std::env;

use anyhow::{Context, Result, bail};

use beanconf_config::beanconf_dir::{BEANCONF_DIR_NAME, ensure_beanconf_dir};
use beanconf_config::config::CONFIG_FILE_NAME;
use beanconf_config::{load_config, save_config};

use crate::cli::InitArgs;
use crate::commands::schema::{import_schema_file, register_all};
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `beanconf init` command.
pub fn run(ctx: &RuntimeContext, args: &InitArgs) -> Result<()> {
    let cwd = env::current_dir().context("failed to get current directory")?;
    let dir = cwd.join(BEANCONF_DIR_NAME);

    if !args.force && dir.join(CONFIG_FILE_NAME).exists() {
        bail!(
            "Found existing configuration in {}\n\n\
            This directory is already initialized.\n\
            Use --force to re-initialize.",
            dir.display()
        );
    }

    let dir = ensure_beanconf_dir(&cwd)
        .with_context(|| format!("failed to create directory: {}", dir.display()))?;
    let mut config = load_config(&dir).context("failed to load configuration")?;

    let mut schemas = Vec::new();
    for file in &args.schemas {
        schemas.extend(import_schema_file(&dir, &mut config, file)?);
    }
    save_config(&dir, &config).context("failed to save configuration")?;

    // Opening the store creates the database tables.
    let store = ctx.open_store(&dir, &config)?;
    register_all(&store, &schemas)?;
    let db_path = ctx.db_path(&dir, &config);

    if ctx.json {
        let names: Vec<&str> = schemas.iter().map(|s| s.name.as_str()).collect();
        output_json(&serde_json::json!({
            "path": dir.display().to_string(),
            "db": db_path.display().to_string(),
            "schemas": names,
        }));
    } else {
        println!("Initialized beanconf in {}", dir.display());
        println!("  Database: {}", db_path.display());
        if !schemas.is_empty() {
            println!("  Registered {} schema(s)", schemas.len());
        }
    }
    Ok(())
}
