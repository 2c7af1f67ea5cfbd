//! Storage error types.

use beanconf_core::BeanId;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested entity was not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g., "bean", "schema").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// An entity with the same identity already exists.
    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: String, id: String },

    /// A bean cannot be deleted while other beans reference it.
    #[error("{bean} is still referenced by {}", join_ids(.referrers))]
    ReferentialIntegrity {
        bean: BeanId,
        referrers: Vec<BeanId>,
    },

    /// A written bean references a bean that does not exist.
    #[error("{from} references missing bean {to}")]
    MissingReference { from: BeanId, to: BeanId },

    /// A schema cannot be removed while beans of it are stored.
    #[error("schema {name} is still used by {count} bean(s)")]
    SchemaInUse { name: String, count: i64 },

    /// Failed to establish or maintain a database connection.
    #[error("connection error: {0}")]
    Connection(String),

    /// A transaction operation failed.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// A schema migration failed.
    #[error("migration {name} failed: {reason}")]
    Migration {
        /// Name of the migration that failed.
        name: String,
        /// Underlying error description.
        reason: String,
    },

    /// A raw SQLite query error.
    #[error("query error: {0}")]
    Query(#[from] rusqlite::Error),

    /// JSON serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Catch-all for unexpected internal errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the storage crate.
pub type Result<T> = std::result::Result<T, StorageError>;

fn join_ids(ids: &[BeanId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl StorageError {
    // -- Constructors --------------------------------------------------------

    /// Creates a [`StorageError::NotFound`] for the given entity kind and id.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates a [`StorageError::AlreadyExists`] for the given entity kind and id.
    pub fn already_exists(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::AlreadyExists {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    // -- Predicates ----------------------------------------------------------

    /// Returns `true` if this is a [`StorageError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
