//! Command handlers, one module per subcommand.

pub mod completion;
pub mod delete;
pub mod get;
pub mod history;
pub mod init;
pub mod list;
pub mod schema;
pub mod write;
