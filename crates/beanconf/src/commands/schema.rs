//! `beanconf schema` -- register and inspect schemas.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use beanconf_config::{BeanconfConfig, load_schema_file, save_config};
use beanconf_core::Schema;
use beanconf_storage::SchemaRegistry;

use crate::cli::{SchemaArgs, SchemaCommands};
use crate::context::RuntimeContext;
use crate::output::{format_schema, output_json, output_table};

/// Execute the `beanconf schema` command.
pub fn run(ctx: &RuntimeContext, args: &SchemaArgs) -> Result<()> {
    match &args.command {
        SchemaCommands::Add { file } => run_add(ctx, file),
        SchemaCommands::List => run_list(ctx),
        SchemaCommands::Show { name } => run_show(ctx, name),
    }
}

fn run_add(ctx: &RuntimeContext, file: &Path) -> Result<()> {
    let mut ws = ctx.open_workspace()?;
    let schemas = import_schema_file(&ws.dir, &mut ws.config, file)?;
    save_config(&ws.dir, &ws.config).context("failed to save configuration")?;
    register_all(ws.store.as_ref(), &schemas)?;

    let names: Vec<&str> = schemas.iter().map(|s| s.name.as_str()).collect();
    if ctx.json {
        output_json(&serde_json::json!({ "registered": names }));
    } else {
        println!("Registered {} schema(s): {}", names.len(), names.join(", "));
    }
    Ok(())
}

fn run_list(ctx: &RuntimeContext) -> Result<()> {
    let ws = ctx.open_workspace()?;
    let schemas = ws.admin.get_schemas()?;

    if ctx.json {
        let all: Vec<&Schema> = schemas.values().collect();
        output_json(&all);
        return Ok(());
    }
    if schemas.is_empty() {
        println!("No schemas registered. Use 'beanconf schema add <file>'.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = schemas
        .values()
        .map(|s| {
            vec![
                s.name.clone(),
                if s.singleton { "yes".into() } else { String::new() },
                (s.properties.len() + s.property_lists.len()).to_string(),
                s.references.len().to_string(),
            ]
        })
        .collect();
    output_table(&["NAME", "SINGLETON", "PROPERTIES", "REFERENCES"], &rows);
    Ok(())
}

fn run_show(ctx: &RuntimeContext, name: &str) -> Result<()> {
    let ws = ctx.open_workspace()?;
    let schema = ws.admin.get_schema(name)?;
    if ctx.json {
        output_json(&schema);
    } else {
        println!("{}", format_schema(&schema));
    }
    Ok(())
}

/// Parses `source`, copies it into `dir` and lists it in `config`.
///
/// Nothing is copied when the file does not parse.
pub fn import_schema_file(dir: &Path, config: &mut BeanconfConfig, source: &Path) -> Result<Vec<Schema>> {
    let schemas = load_schema_file(source)
        .with_context(|| format!("failed to load schema file: {}", source.display()))?;
    let file_name = source
        .file_name()
        .with_context(|| format!("not a file: {}", source.display()))?;

    let target = dir.join(file_name);
    let same_file = match (source.canonicalize(), target.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    };
    if !same_file {
        fs::copy(source, &target)
            .with_context(|| format!("failed to copy schema file to {}", target.display()))?;
    }
    config.add_schema_file(file_name.to_string_lossy());
    Ok(schemas)
}

/// Registers `schemas` with the registry.
pub fn register_all(registry: &dyn SchemaRegistry, schemas: &[Schema]) -> Result<()> {
    for schema in schemas {
        registry
            .register_schema(schema)
            .with_context(|| format!("failed to register schema {}", schema.name))?;
    }
    Ok(())
}
