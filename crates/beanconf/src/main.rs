//! `beanconf` -- administer schema-typed configuration beans.
//!
//! Parses CLI arguments with clap, resolves the runtime context, and
//! dispatches to command handlers.

mod cli;
mod commands;
mod context;
mod output;

use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use beanconf_admin::AdminError;

use cli::{Cli, Commands};
use context::RuntimeContext;

/// Tracks whether a Ctrl+C has already been received.
static CTRLC_RECEIVED: AtomicBool = AtomicBool::new(false);

fn main() {
    // First Ctrl+C: exit cleanly. Second: force exit.
    let _ = ctrlc::set_handler(|| {
        if CTRLC_RECEIVED.swap(true, Ordering::SeqCst) {
            std::process::exit(1);
        }
        std::process::exit(0);
    });

    let cli = Cli::parse();
    let ctx = RuntimeContext::from_global_args(&cli.global);

    let filter = if ctx.verbose {
        EnvFilter::new("beanconf=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Some(Commands::Init(args)) => commands::init::run(&ctx, &args),
        Some(Commands::Schema(args)) => commands::schema::run(&ctx, &args),
        Some(Commands::Get(args)) => commands::get::run(&ctx, &args),
        Some(Commands::List(args)) => commands::list::run(&ctx, &args),
        Some(Commands::Create(args)) => commands::write::run_create(&ctx, &args),
        Some(Commands::Set(args)) => commands::write::run_set(&ctx, &args),
        Some(Commands::Merge(args)) => commands::write::run_merge(&ctx, &args),
        Some(Commands::Delete(args)) => commands::delete::run(&ctx, &args),
        Some(Commands::History(args)) => commands::history::run(&ctx, &args),
        Some(Commands::Completion(args)) => commands::completion::run(&ctx, &args),
        None => {
            use clap::CommandFactory;
            Cli::command().print_help().ok();
            println!();
            Ok(())
        }
    };

    if let Err(e) = result {
        let admin_error = e.chain().find_map(|cause| cause.downcast_ref::<AdminError>());
        if cli.global.json {
            let mut err_json = serde_json::json!({
                "error": format!("{:#}", e),
            });
            if let Some(event) = admin_error.map(AdminError::event) {
                err_json["module"] = serde_json::json!(event.module);
                err_json["code"] = serde_json::json!(event.code);
            }
            if let Ok(s) = serde_json::to_string_pretty(&err_json) {
                eprintln!("{}", s);
            }
        } else {
            match admin_error {
                Some(err) => eprintln!("Error [{}:{}]: {:#}", err.module(), err.code(), e),
                None => eprintln!("Error: {:#}", e),
            }
        }
        std::process::exit(1);
    }
}
