//! Clap CLI definitions for the `beanconf` command.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// beanconf -- schema-typed configuration beans.
///
/// Beans are typed configuration instances that reference each other. Every
/// write is checked against the registered schemas and all affected
/// referrers before it is stored.
#[derive(Parser, Debug)]
#[command(
    name = "beanconf",
    about = "Administer schema-typed configuration beans",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Global flags available to all subcommands.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Database path (default: `.beanconf/beanconf.db` or the `db` config key).
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Actor name for the audit trail (default: $BEANCONF_ACTOR, config, $USER).
    #[arg(long, global = true, env = "BEANCONF_ACTOR")]
    pub actor: Option<String>,

    /// Output in JSON format.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose/debug output.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

/// All available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a `.beanconf` directory in the current directory.
    Init(InitArgs),

    /// Register and inspect schemas.
    Schema(SchemaArgs),

    /// Show a bean with everything it references.
    #[command(alias = "show")]
    Get(GetArgs),

    /// List the beans of a schema.
    List(ListArgs),

    /// Create new beans.
    Create(WriteArgs),

    /// Replace existing beans; entries not given are dropped.
    Set(WriteArgs),

    /// Partially update existing beans; entries not given are kept.
    Merge(WriteArgs),

    /// Delete beans.
    Delete(DeleteArgs),

    /// Show the audit trail of a bean.
    History(HistoryArgs),

    /// Generate shell completion scripts.
    Completion(CompletionArgs),
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Schema definition files to register right away.
    #[arg(long = "schema", value_name = "FILE")]
    pub schemas: Vec<PathBuf>,

    /// Re-initialize even if a database already exists.
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct SchemaArgs {
    #[command(subcommand)]
    pub command: SchemaCommands,
}

#[derive(Subcommand, Debug)]
pub enum SchemaCommands {
    /// Register the schemas of a YAML definition file.
    Add {
        /// Schema definition file.
        file: PathBuf,
    },

    /// List registered schemas.
    List,

    /// Show one schema.
    Show {
        /// Schema name.
        name: String,
    },
}

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Schema name.
    pub schema: String,

    /// Instance id (default for singleton schemas: the schema name).
    pub id: Option<String>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Schema name.
    pub schema: String,

    /// Only these instance ids, in this order.
    pub ids: Vec<String>,
}

/// Arguments shared by `create`, `set` and `merge`.
#[derive(Args, Debug)]
pub struct WriteArgs {
    /// Schema name.
    #[arg(required_unless_present = "file")]
    pub schema: Option<String>,

    /// Instance id (default for singleton schemas: the schema name).
    pub id: Option<String>,

    /// Property value as NAME=VALUE. Repeat a name for list properties.
    #[arg(short = 'p', long = "property", value_name = "NAME=VALUE")]
    pub properties: Vec<String>,

    /// Reference as NAME=ID or NAME=SCHEMA/ID. Repeat a name for list references.
    #[arg(short = 'r', long = "reference", value_name = "NAME=TARGET")]
    pub references: Vec<String>,

    /// Property or reference to remove (merge) or leave empty (create, set).
    #[arg(long, value_name = "NAME")]
    pub unset: Vec<String>,

    /// Read beans from a JSON file (a bean object or an array of beans).
    #[arg(long, conflicts_with_all = ["schema", "id", "properties", "references", "unset"])]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Schema name.
    pub schema: String,

    /// Instance ids to delete.
    #[arg(required = true)]
    pub ids: Vec<String>,

    /// Confirm the deletion.
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Schema name.
    pub schema: String,

    /// Instance id (default for singleton schemas: the schema name).
    pub id: Option<String>,

    /// Maximum number of events to show.
    #[arg(long, default_value_t = 50)]
    pub limit: usize,
}

#[derive(Args, Debug)]
pub struct CompletionArgs {
    #[command(subcommand)]
    pub command: CompletionCommands,
}

#[derive(Subcommand, Debug)]
pub enum CompletionCommands {
    /// Generate bash completion script.
    Bash,
    /// Generate zsh completion script.
    Zsh,
    /// Generate fish completion script.
    Fish,
    /// Generate PowerShell completion script.
    Powershell,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_inline_write() {
        let cli = Cli::try_parse_from([
            "beanconf", "merge", "Father", "f1", "-p", "name=Homer", "-r", "friend=f2",
            "--unset", "age", "--actor", "ops",
        ])
        .unwrap();
        let Some(Commands::Merge(args)) = cli.command else {
            panic!("expected merge");
        };
        assert_eq!(args.schema.as_deref(), Some("Father"));
        assert_eq!(args.id.as_deref(), Some("f1"));
        assert_eq!(args.properties, vec!["name=Homer"]);
        assert_eq!(args.references, vec!["friend=f2"]);
        assert_eq!(args.unset, vec!["age"]);
        assert_eq!(cli.global.actor.as_deref(), Some("ops"));
    }

    #[test]
    fn file_conflicts_with_inline_bean() {
        let err = Cli::try_parse_from(["beanconf", "create", "Father", "--file", "beans.json"]);
        assert!(err.is_err());
        assert!(Cli::try_parse_from(["beanconf", "create", "--file", "beans.json"]).is_ok());
    }
}
