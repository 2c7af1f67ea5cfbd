//! `beanconf history` -- show the audit trail of a bean.

use anyhow::Result;

use crate::cli::HistoryArgs;
use crate::commands::get::bean_id;
use crate::context::RuntimeContext;
use crate::output::{event_row, output_json, output_table};

/// Execute the `beanconf history` command.
pub fn run(ctx: &RuntimeContext, args: &HistoryArgs) -> Result<()> {
    let ws = ctx.open_workspace()?;
    let id = bean_id(&args.schema, args.id.as_deref());
    let events = ws.admin.events(&id, args.limit)?;

    if ctx.json {
        output_json(&serde_json::json!({
            "bean": id,
            "events": events,
        }));
        return Ok(());
    }
    if events.is_empty() {
        println!("No history for {}.", id);
        return Ok(());
    }
    println!("History for {} (newest first):", id);
    let rows: Vec<Vec<String>> = events.iter().map(event_row).collect();
    output_table(&["TIME", "EVENT", "ACTOR"], &rows);
    Ok(())
}
