//! [`SqliteStore`] -- SQLite-backed bean store and schema registry.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{Result, StorageError};
use crate::sqlite::schema::{CURRENT_SCHEMA_VERSION, SCHEMA_STATEMENTS};
use crate::traits::DEFAULT_SUCCESSOR_DEPTH;

/// SQLite-backed implementation of [`BeanStore`](crate::traits::BeanStore)
/// and [`SchemaRegistry`](crate::traits::SchemaRegistry).
///
/// One connection behind a `Mutex`; every public call holds the lock for its
/// whole duration, so each call is serialized against the others.
pub struct SqliteStore {
    pub(crate) conn: Mutex<Connection>,

    /// Successor hops loaded around each referrer by
    /// `get_beans_to_validate`.
    pub(crate) successor_depth: u32,
}

impl SqliteStore {
    /// Opens (or creates) the bean database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(?path, "opening bean database");

        let conn = Connection::open(path).map_err(|e| {
            StorageError::Connection(format!("failed to open {}: {e}", path.display()))
        })?;
        Self::from_connection(conn)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        debug!("opening in-memory bean database");
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Connection(format!("failed to open in-memory db: {e}")))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )
        .map_err(|e| StorageError::Connection(format!("failed to set pragmas: {e}")))?;

        let store = Self {
            conn: Mutex::new(conn),
            successor_depth: DEFAULT_SUCCESSOR_DEPTH,
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Overrides how many successor hops `get_beans_to_validate` loads.
    pub fn with_successor_depth(mut self, depth: u32) -> Self {
        self.successor_depth = depth;
        self
    }

    /// Creates the tables unless `user_version` says they exist.
    fn init_schema(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version >= CURRENT_SCHEMA_VERSION {
            debug!(version, "bean tables up to date");
            return Ok(());
        }

        for (i, stmt) in SCHEMA_STATEMENTS.iter().enumerate() {
            conn.execute_batch(stmt).map_err(|e| StorageError::Migration {
                name: format!("init_schema[{i}]"),
                reason: e.to_string(),
            })?;
        }
        conn.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)?;

        info!(version = CURRENT_SCHEMA_VERSION, "bean tables created");
        Ok(())
    }

    pub(crate) fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::Connection(format!("mutex poisoned: {e}")))
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("successor_depth", &self.successor_depth)
            .finish_non_exhaustive()
    }
}
