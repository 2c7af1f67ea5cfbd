//! `beanconf list` -- list the beans of a schema.

use anyhow::Result;

use crate::cli::ListArgs;
use crate::context::RuntimeContext;
use crate::output::{format_bean_compact, output_json, output_table};

/// Execute the `beanconf list` command.
pub fn run(ctx: &RuntimeContext, args: &ListArgs) -> Result<()> {
    let ws = ctx.open_workspace()?;
    let beans = if args.ids.is_empty() {
        ws.admin.list(&args.schema)?
    } else {
        ws.admin.list_ids(&args.schema, &args.ids)?
    };

    if ctx.json {
        output_json(&beans);
        return Ok(());
    }
    if beans.is_empty() {
        println!("No {} beans found.", args.schema);
        return Ok(());
    }
    let rows: Vec<Vec<String>> = beans
        .iter()
        .map(|b| vec![b.id.instance_id.clone(), format_bean_compact(b)])
        .collect();
    output_table(&["ID", "PROPERTIES"], &rows);
    Ok(())
}
