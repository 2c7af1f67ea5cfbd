//! `beanconf get` -- show a bean with everything it references.

use anyhow::Result;

use beanconf_core::{Bean, BeanId};

use crate::cli::GetArgs;
use crate::context::RuntimeContext;
use crate::output::{format_bean_details, output_json};

/// Execute the `beanconf get` command.
pub fn run(ctx: &RuntimeContext, args: &GetArgs) -> Result<()> {
    let ws = ctx.open_workspace()?;
    let id = bean_id(&args.schema, args.id.as_deref());
    let graph = ws.admin.get(&id)?;

    let mut beans = graph.ordered().into_iter();
    let root = beans.next();
    let referenced: Vec<&Bean> = beans.collect();

    if ctx.json {
        output_json(&serde_json::json!({
            "bean": root,
            "referenced": referenced,
        }));
        return Ok(());
    }

    if let Some(root) = root {
        println!("{}", format_bean_details(root, ""));
    }
    if !referenced.is_empty() {
        println!();
        println!("Referenced ({}):", referenced.len());
        for bean in referenced {
            println!("{}", format_bean_details(bean, "  "));
        }
    }
    Ok(())
}

/// The id named on the command line. Without an instance id the schema's
/// singleton instance is meant.
pub fn bean_id(schema: &str, instance: Option<&str>) -> BeanId {
    match instance {
        Some(instance) => BeanId::new(schema, instance),
        None => BeanId::singleton(schema),
    }
}
