//! `beanconf delete` -- delete beans.

use anyhow::{Result, bail};

use crate::cli::DeleteArgs;
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `beanconf delete` command.
pub fn run(ctx: &RuntimeContext, args: &DeleteArgs) -> Result<()> {
    if !args.force {
        bail!(
            "deletion cannot be undone.\n\
            Use --force to confirm deletion of {} {} bean(s): {}",
            args.ids.len(),
            args.schema,
            args.ids.join(", ")
        );
    }

    let ws = ctx.open_workspace()?;
    ws.admin.delete_all(&args.schema, &args.ids, &ws.actor)?;

    if ctx.json {
        output_json(&serde_json::json!({
            "deleted": args.ids,
            "schema": args.schema,
        }));
    } else {
        for id in &args.ids {
            println!("Deleted {}/{}", args.schema, id);
        }
    }
    Ok(())
}
