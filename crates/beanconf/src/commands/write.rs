//! `beanconf create`, `beanconf set` and `beanconf merge`.
//!
//! A bean is given inline (`-p name=value`, `-r name=target`, `--unset
//! name`) or as JSON with `--file`. The whole batch is checked before
//! anything is stored.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use beanconf_core::{Bean, BeanId, Schema};

use crate::cli::WriteArgs;
use crate::context::RuntimeContext;
use crate::output::output_json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Create,
    Set,
    Merge,
}

impl Operation {
    fn past_tense(self) -> &'static str {
        match self {
            Self::Create => "created",
            Self::Set => "set",
            Self::Merge => "merged",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Create => "Created",
            Self::Set => "Set",
            Self::Merge => "Merged",
        }
    }
}

/// Contents of a `--file`: one bean or an array of beans.
#[derive(Deserialize)]
#[serde(untagged)]
enum BeansFile {
    One(Bean),
    Many(Vec<Bean>),
}

/// Execute the `beanconf create` command.
pub fn run_create(ctx: &RuntimeContext, args: &WriteArgs) -> Result<()> {
    run(ctx, args, Operation::Create)
}

/// Execute the `beanconf set` command.
pub fn run_set(ctx: &RuntimeContext, args: &WriteArgs) -> Result<()> {
    run(ctx, args, Operation::Set)
}

/// Execute the `beanconf merge` command.
pub fn run_merge(ctx: &RuntimeContext, args: &WriteArgs) -> Result<()> {
    run(ctx, args, Operation::Merge)
}

fn run(ctx: &RuntimeContext, args: &WriteArgs, operation: Operation) -> Result<()> {
    let ws = ctx.open_workspace()?;
    let beans = match &args.file {
        Some(path) => read_beans_file(path)?,
        None => {
            let schema_name = args.schema.as_deref().context("a schema name is required")?;
            let schema = ws.admin.get_schema(schema_name)?;
            vec![bean_from_args(&schema, args)?]
        }
    };

    match operation {
        Operation::Create => ws.admin.create_all(&beans, &ws.actor)?,
        Operation::Set => ws.admin.set_all(&beans, &ws.actor)?,
        Operation::Merge => ws.admin.merge_all(&beans, &ws.actor)?,
    }

    let ids: Vec<&BeanId> = beans.iter().map(|b| &b.id).collect();
    if ctx.json {
        output_json(&serde_json::json!({
            "status": operation.past_tense(),
            "beans": ids,
        }));
    } else {
        for id in ids {
            println!("{} {}", operation.label(), id);
        }
    }
    Ok(())
}

fn read_beans_file(path: &Path) -> Result<Vec<Bean>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let parsed: BeansFile = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse beans from {}", path.display()))?;
    Ok(match parsed {
        BeansFile::One(bean) => vec![bean],
        BeansFile::Many(beans) => beans,
    })
}

/// Builds the bean described by the inline arguments.
///
/// Without an instance id a singleton schema names its single instance;
/// for other schemas the id stays empty and the write is rejected.
fn bean_from_args(schema: &Schema, args: &WriteArgs) -> Result<Bean> {
    let id = match args.id.as_deref() {
        Some(instance) => BeanId::new(&schema.name, instance),
        None if schema.singleton => BeanId::singleton(&schema.name),
        None => BeanId::new(&schema.name, ""),
    };
    let mut bean = Bean::new(id);

    for raw in &args.properties {
        let (name, value) = split_assignment(raw)?;
        bean.properties
            .entry(name.to_string())
            .or_default()
            .push(value.to_string());
    }
    for raw in &args.references {
        let (name, target) = split_assignment(raw)?;
        let declared = schema.reference(name).map(|r| r.schema_name.as_str());
        let target = parse_target(target, declared)?;
        bean.references.entry(name.to_string()).or_default().push(target);
    }
    for name in &args.unset {
        if schema.reference(name).is_some() {
            bean.set_reference(name.clone(), Vec::new());
        } else {
            bean.set_property(name.clone(), Vec::new());
        }
    }
    Ok(bean)
}

/// Splits `NAME=VALUE`. The value may be empty or contain `=`.
fn split_assignment(raw: &str) -> Result<(&str, &str)> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim(), value)),
        _ => bail!("expected NAME=VALUE, got '{raw}'"),
    }
}

/// Parses a reference target: `SCHEMA/ID`, or a plain `ID` of the declared
/// target schema.
fn parse_target(raw: &str, declared: Option<&str>) -> Result<BeanId> {
    if let Some((schema, instance)) = raw.split_once('/') {
        return Ok(BeanId::new(schema, instance));
    }
    match declared {
        Some(schema) => Ok(BeanId::new(schema, raw)),
        None => bail!("reference target '{raw}' of an undeclared reference needs the SCHEMA/ID form"),
    }
}

#[cfg(test)]
mod tests {
    use beanconf_core::{BeanBuilder, PropertyType, SchemaProperty, SchemaPropertyRef};
    use pretty_assertions::assert_eq;

    use super::*;

    fn father() -> Schema {
        Schema::new("Father")
            .with_property(SchemaProperty::new("name", PropertyType::String))
            .with_reference(SchemaPropertyRef::new("friend", "Father"))
    }

    fn args(id: Option<&str>, properties: &[&str], references: &[&str], unset: &[&str]) -> WriteArgs {
        let strings = |v: &[&str]| -> Vec<String> { v.iter().map(|s| s.to_string()).collect() };
        WriteArgs {
            schema: Some("Father".into()),
            id: id.map(String::from),
            properties: strings(properties),
            references: strings(references),
            unset: strings(unset),
            file: None,
        }
    }

    #[test]
    fn inline_bean() {
        let bean = bean_from_args(
            &father(),
            &args(
                Some("f1"),
                &["name=Homer", "nicknames=D'oh", "nicknames=Homie"],
                &["friend=f2"],
                &[],
            ),
        )
        .unwrap();
        let expected = BeanBuilder::new("Father", "f1")
            .property("name", "Homer")
            .property_list("nicknames", ["D'oh", "Homie"])
            .reference("friend", BeanId::new("Father", "f2"))
            .build();
        assert_eq!(bean, expected);
    }

    #[test]
    fn unset_picks_property_or_reference() {
        let bean = bean_from_args(&father(), &args(Some("f1"), &[], &[], &["name", "friend"])).unwrap();
        assert_eq!(bean.properties.get("name"), Some(&Vec::new()));
        assert_eq!(bean.references.get("friend"), Some(&Vec::new()));
    }

    #[test]
    fn missing_id_defaults() {
        let bean = bean_from_args(&father(), &args(None, &[], &[], &[])).unwrap();
        assert!(bean.id.is_missing_instance());

        let pension = Schema::new("Pension").as_singleton();
        let bean = bean_from_args(&pension, &args(None, &[], &[], &[])).unwrap();
        assert_eq!(bean.id, BeanId::singleton("Pension"));
    }

    #[test]
    fn assignments() {
        assert_eq!(split_assignment("name=a=b").unwrap(), ("name", "a=b"));
        assert_eq!(split_assignment("name=").unwrap(), ("name", ""));
        assert!(split_assignment("name").is_err());
        assert!(split_assignment("=value").is_err());
    }

    #[test]
    fn targets() {
        assert_eq!(parse_target("Father/f2", None).unwrap(), BeanId::new("Father", "f2"));
        assert_eq!(parse_target("f2", Some("Father")).unwrap(), BeanId::new("Father", "f2"));
        assert!(parse_target("f2", None).is_err());
    }

    #[test]
    fn beans_file_accepts_one_or_many() {
        let dir = tempfile::TempDir::new().unwrap();
        let one = dir.path().join("one.json");
        fs::write(&one, r#"{"id": {"schema": "Father", "id": "f1"}, "properties": {"name": ["Homer"]}}"#)
            .unwrap();
        let beans = read_beans_file(&one).unwrap();
        assert_eq!(beans.len(), 1);
        assert_eq!(beans[0].value("name"), Some("Homer"));

        let many = dir.path().join("many.json");
        fs::write(
            &many,
            r#"[{"id": {"schema": "Father", "id": "f1"}}, {"id": {"schema": "Father", "id": "f2"}}]"#,
        )
        .unwrap();
        assert_eq!(read_beans_file(&many).unwrap().len(), 2);
    }
}
