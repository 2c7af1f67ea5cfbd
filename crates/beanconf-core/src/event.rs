//! Audit trail entries recorded by the bean store on every write.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::bean::BeanId;

/// Categorises audit trail events.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    Created,
    Set,
    Merged,
    Deleted,
    SingletonCreated,
    /// Catch-all for unknown / future event types.
    Other(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "created",
            Self::Set => "set",
            Self::Merged => "merged",
            Self::Deleted => "deleted",
            Self::SingletonCreated => "singleton_created",
            Self::Other(s) => s.as_str(),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for EventType {
    fn from(s: &str) -> Self {
        match s {
            "created" => Self::Created,
            "set" => Self::Set,
            "merged" => Self::Merged,
            "deleted" => Self::Deleted,
            "singleton_created" => Self::SingletonCreated,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s.as_str()))
    }
}

/// An audit trail entry.
///
/// `actor` is an opaque caller-supplied label; it is recorded, never
/// checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeanEvent {
    pub id: i64,

    pub bean: BeanId,

    pub event_type: EventType,

    pub actor: String,

    pub created_at: DateTime<Utc>,
}
