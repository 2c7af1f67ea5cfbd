//! SQLite-backed storage implementation.

mod beans;
mod events;
mod references;
pub mod schema;
mod schemas;
mod store;
mod transaction;

pub use store::SqliteStore;
