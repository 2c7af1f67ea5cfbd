//! Admin error type and its structured event form.

use std::fmt;

use beanconf_core::{BeanId, SchemaError};
use beanconf_storage::StorageError;

use crate::validator::ConstraintViolation;

/// Module label of errors raised by the admin core.
pub const MODULE_CORE: &str = "core";

/// Module label of errors surfaced from the bean store.
pub const MODULE_STORAGE: &str = "storage";

/// The single abortable error of every admin operation.
///
/// Nothing is written to the store once one of these is raised during
/// preparation; store-side failures roll back the whole call.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("schema not found: {0}")]
    SchemaNotFound(String),

    #[error("bean of schema {schema} has no instance id")]
    MissingId { schema: String },

    #[error("{bean}: property {property} value {value:?} is not a valid {expected}: {reason}")]
    WrongPropertyType {
        bean: BeanId,
        property: String,
        value: String,
        expected: String,
        reason: String,
    },

    #[error("{bean}: {property} accepts a single value (got {count})")]
    WrongMultiplicity {
        bean: BeanId,
        property: String,
        count: usize,
    },

    #[error("validation failed: {}", join(.0, "; "))]
    ValidationFailed(Vec<ConstraintViolation>),

    #[error("{bean} is still referenced by {}", join(.referrers, ", "))]
    ReferentialIntegrityViolation {
        bean: BeanId,
        referrers: Vec<BeanId>,
    },

    #[error("bean not found: {0}")]
    BeanNotFound(String),

    #[error("bean already exists: {0}")]
    BeanAlreadyExists(String),

    #[error("{from} references missing bean {to}")]
    InvalidReference { from: BeanId, to: BeanId },

    /// Undeclared names and references to the wrong schema.
    #[error(transparent)]
    SchemaMismatch(SchemaError),

    #[error("cannot {operation} {bean}: schema {schema} is a singleton")]
    SingletonViolation {
        operation: &'static str,
        schema: String,
        bean: BeanId,
    },

    #[error("{0}: no schema attached")]
    SchemaNotAttached(BeanId),

    #[error(transparent)]
    Storage(StorageError),
}

/// A specialized `Result` type for admin operations.
pub type Result<T> = std::result::Result<T, AdminError>;

fn join<T: fmt::Display>(items: &[T], separator: &str) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(separator)
}

/// Structured form of an [`AdminError`]: module, stable numeric code and
/// message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEvent {
    pub module: &'static str,
    pub code: u16,
    pub message: String,
}

impl fmt::Display for ErrorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}] {}", self.module, self.code, self.message)
    }
}

impl AdminError {
    /// Stable numeric code of this error.
    pub fn code(&self) -> u16 {
        match self {
            Self::SchemaNotFound(_) => 101,
            Self::MissingId { .. } => 102,
            Self::WrongPropertyType { .. } => 103,
            Self::WrongMultiplicity { .. } => 104,
            Self::ValidationFailed(_) => 105,
            Self::ReferentialIntegrityViolation { .. } => 106,
            Self::BeanNotFound(_) => 107,
            Self::BeanAlreadyExists(_) => 108,
            Self::InvalidReference { .. } => 109,
            Self::SchemaMismatch(_) => 110,
            Self::SingletonViolation { .. } => 111,
            Self::SchemaNotAttached(_) => 112,
            Self::Storage(_) => 201,
        }
    }

    pub fn module(&self) -> &'static str {
        match self {
            Self::Storage(_) => MODULE_STORAGE,
            _ => MODULE_CORE,
        }
    }

    pub fn event(&self) -> ErrorEvent {
        ErrorEvent {
            module: self.module(),
            code: self.code(),
            message: self.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::BeanNotFound(_) | Self::SchemaNotFound(_))
    }
}

impl From<SchemaError> for AdminError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::MissingId { schema } => Self::MissingId { schema },
            SchemaError::WrongPropertyType {
                bean,
                property,
                value,
                expected,
                reason,
            } => Self::WrongPropertyType {
                bean,
                property,
                value,
                expected,
                reason,
            },
            SchemaError::WrongMultiplicity {
                bean,
                property,
                count,
            } => Self::WrongMultiplicity {
                bean,
                property,
                count,
            },
            SchemaError::SchemaNotAttached(id) => Self::SchemaNotAttached(id),
            other => Self::SchemaMismatch(other),
        }
    }
}

impl From<StorageError> for AdminError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { entity, id } if entity == "schema" => Self::SchemaNotFound(id),
            StorageError::NotFound { id, .. } => Self::BeanNotFound(id),
            StorageError::AlreadyExists { id, .. } => Self::BeanAlreadyExists(id),
            StorageError::ReferentialIntegrity { bean, referrers } => {
                Self::ReferentialIntegrityViolation { bean, referrers }
            }
            StorageError::MissingReference { from, to } => Self::InvalidReference { from, to },
            other => Self::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn storage_errors_map_to_core_kinds() {
        let err = AdminError::from(StorageError::ReferentialIntegrity {
            bean: BeanId::new("Father", "f1"),
            referrers: vec![BeanId::new("Grandfather", "g1")],
        });
        assert_eq!(
            err.event(),
            ErrorEvent {
                module: "core",
                code: 106,
                message: "Father/f1 is still referenced by Grandfather/g1".into(),
            }
        );

        let err = AdminError::from(StorageError::not_found("schema", "Nope"));
        assert!(matches!(err, AdminError::SchemaNotFound(ref s) if s == "Nope"));
        assert!(err.is_not_found());

        let err = AdminError::from(StorageError::not_found("bean", BeanId::new("A", "a")));
        assert!(matches!(err, AdminError::BeanNotFound(ref s) if s == "A/a"));
    }

    #[test]
    fn other_storage_errors_keep_storage_module() {
        let err = AdminError::from(StorageError::Connection("gone".into()));
        let event = err.event();
        assert_eq!(event.module, "storage");
        assert_eq!(event.code, 201);
        assert_eq!(event.to_string(), "[storage:201] connection error: gone");
    }

    #[test]
    fn schema_errors_keep_their_kind() {
        let err = AdminError::from(SchemaError::MissingId {
            schema: "Father".into(),
        });
        assert_eq!(err.code(), 102);

        let err = AdminError::from(SchemaError::UnknownProperty {
            bean: BeanId::new("Father", "f1"),
            property: "shoe".into(),
        });
        assert_eq!(err.code(), 110);
        assert_eq!(err.to_string(), "Father/f1: schema declares no property shoe");
    }

    #[test]
    fn validation_message_joins_violations() {
        let err = AdminError::ValidationFailed(vec![
            ConstraintViolation::new(BeanId::new("A", "a"), "x", "is required"),
            ConstraintViolation::new(BeanId::new("A", "a"), "y", "must be at most 3"),
        ]);
        assert_eq!(
            err.to_string(),
            "validation failed: A/a.x is required; A/a.y must be at most 3"
        );
    }
}
