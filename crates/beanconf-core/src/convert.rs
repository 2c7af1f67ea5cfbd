//! Type conversion service -- string property values to and from typed values.
//!
//! Each [`PropertyType`] kind maps to one [`Converter`] in a table built
//! when the service is constructed. Custom types are supported by
//! registering an extra converter under the custom type's name.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::schema::PropertyType;

/// A property value after conversion from its string form.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    String(String),
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    Timestamp(DateTime<Utc>),
    Enum(String),
    Custom(String),
}

impl TypedValue {
    /// Numeric view of the value, used by range constraints.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Byte(v) => Some(f64::from(*v)),
            Self::Short(v) => Some(f64::from(*v)),
            Self::Integer(v) => Some(f64::from(*v)),
            #[allow(clippy::cast_precision_loss)]
            Self::Long(v) => Some(*v as f64),
            Self::Float(v) => Some(f64::from(*v)),
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }
}

/// Formats the value back into the canonical string form stored on beans.
impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) | Self::Enum(s) | Self::Custom(s) => f.write_str(s),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Byte(v) => write!(f, "{v}"),
            Self::Short(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Char(c) => write!(f, "{c}"),
            Self::Timestamp(t) => f.write_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        }
    }
}

/// Errors returned by the conversion service.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConversionError {
    #[error("cannot convert {value:?} to {target}: {reason}")]
    Incompatible {
        value: String,
        target: String,
        reason: String,
    },

    #[error("no converter registered for type {0}")]
    NoConverter(String),
}

impl ConversionError {
    fn incompatible(value: &str, target: &PropertyType, reason: impl fmt::Display) -> Self {
        Self::Incompatible {
            value: value.to_owned(),
            target: target.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Converts the string form of a value into a [`TypedValue`].
pub trait Converter: Send + Sync {
    fn convert(&self, value: &str, target: &PropertyType) -> Result<TypedValue, ConversionError>;
}

struct StringConverter;

impl Converter for StringConverter {
    fn convert(&self, value: &str, _target: &PropertyType) -> Result<TypedValue, ConversionError> {
        Ok(TypedValue::String(value.to_owned()))
    }
}

struct BooleanConverter;

impl Converter for BooleanConverter {
    fn convert(&self, value: &str, target: &PropertyType) -> Result<TypedValue, ConversionError> {
        if value.eq_ignore_ascii_case("true") {
            Ok(TypedValue::Boolean(true))
        } else if value.eq_ignore_ascii_case("false") {
            Ok(TypedValue::Boolean(false))
        } else {
            Err(ConversionError::incompatible(
                value,
                target,
                "expected true or false",
            ))
        }
    }
}

struct IntegralConverter;

impl Converter for IntegralConverter {
    fn convert(&self, value: &str, target: &PropertyType) -> Result<TypedValue, ConversionError> {
        let err = |e: std::num::ParseIntError| ConversionError::incompatible(value, target, e);
        match target {
            PropertyType::Byte => value.parse().map(TypedValue::Byte).map_err(err),
            PropertyType::Short => value.parse().map(TypedValue::Short).map_err(err),
            PropertyType::Integer => value.parse().map(TypedValue::Integer).map_err(err),
            PropertyType::Long => value.parse().map(TypedValue::Long).map_err(err),
            other => Err(ConversionError::NoConverter(other.to_string())),
        }
    }
}

struct FloatingConverter;

impl Converter for FloatingConverter {
    fn convert(&self, value: &str, target: &PropertyType) -> Result<TypedValue, ConversionError> {
        let err = |e: std::num::ParseFloatError| ConversionError::incompatible(value, target, e);
        match target {
            PropertyType::Float => value.parse().map(TypedValue::Float).map_err(err),
            PropertyType::Double => value.parse().map(TypedValue::Double).map_err(err),
            other => Err(ConversionError::NoConverter(other.to_string())),
        }
    }
}

struct CharConverter;

impl Converter for CharConverter {
    fn convert(&self, value: &str, target: &PropertyType) -> Result<TypedValue, ConversionError> {
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(TypedValue::Char(c)),
            _ => Err(ConversionError::incompatible(
                value,
                target,
                "expected exactly one character",
            )),
        }
    }
}

struct TimestampConverter;

impl Converter for TimestampConverter {
    fn convert(&self, value: &str, target: &PropertyType) -> Result<TypedValue, ConversionError> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| TypedValue::Timestamp(dt.with_timezone(&Utc)))
            .map_err(|e| ConversionError::incompatible(value, target, e))
    }
}

struct EnumConverter;

impl Converter for EnumConverter {
    fn convert(&self, value: &str, target: &PropertyType) -> Result<TypedValue, ConversionError> {
        let PropertyType::Enum(values) = target else {
            return Err(ConversionError::NoConverter(target.to_string()));
        };
        if values.iter().any(|v| v == value) {
            Ok(TypedValue::Enum(value.to_owned()))
        } else {
            Err(ConversionError::incompatible(
                value,
                target,
                format!("expected one of {}", values.join(", ")),
            ))
        }
    }
}

/// Table of converters keyed by [`PropertyType::kind`].
#[derive(Clone)]
pub struct ConversionService {
    converters: HashMap<String, Arc<dyn Converter>>,
}

impl ConversionService {
    /// Creates a service with a converter for every built-in type.
    pub fn new() -> Self {
        let mut converters: HashMap<String, Arc<dyn Converter>> = HashMap::new();
        let integral: Arc<dyn Converter> = Arc::new(IntegralConverter);
        let floating: Arc<dyn Converter> = Arc::new(FloatingConverter);

        converters.insert("string".into(), Arc::new(StringConverter));
        converters.insert("boolean".into(), Arc::new(BooleanConverter));
        for kind in ["byte", "short", "integer", "long"] {
            converters.insert(kind.into(), Arc::clone(&integral));
        }
        for kind in ["float", "double"] {
            converters.insert(kind.into(), Arc::clone(&floating));
        }
        converters.insert("char".into(), Arc::new(CharConverter));
        converters.insert("timestamp".into(), Arc::new(TimestampConverter));
        converters.insert("enum".into(), Arc::new(EnumConverter));

        Self { converters }
    }

    /// Registers (or replaces) the converter for a custom type name.
    pub fn register(&mut self, type_name: impl Into<String>, converter: Arc<dyn Converter>) {
        self.converters.insert(type_name.into(), converter);
    }

    /// Converts `value` into the declared type.
    pub fn convert(&self, value: &str, target: &PropertyType) -> Result<TypedValue, ConversionError> {
        let converter = self
            .converters
            .get(target.kind())
            .ok_or_else(|| ConversionError::NoConverter(target.to_string()))?;
        converter.convert(value, target)
    }
}

impl Default for ConversionService {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConversionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.converters.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        f.debug_struct("ConversionService")
            .field("types", &kinds)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn svc() -> ConversionService {
        ConversionService::new()
    }

    #[test]
    fn integral_types_respect_width() {
        let s = svc();
        assert_eq!(
            s.convert("127", &PropertyType::Byte).unwrap(),
            TypedValue::Byte(127)
        );
        assert!(s.convert("128", &PropertyType::Byte).is_err());
        assert_eq!(
            s.convert("-40000", &PropertyType::Integer).unwrap(),
            TypedValue::Integer(-40000)
        );
        assert!(s.convert("40000", &PropertyType::Short).is_err());
        assert_eq!(
            s.convert("9000000000", &PropertyType::Long).unwrap(),
            TypedValue::Long(9_000_000_000)
        );
        assert!(s.convert("abc", &PropertyType::Integer).is_err());
    }

    #[test]
    fn floating_and_boolean() {
        let s = svc();
        assert_eq!(
            s.convert("2.5", &PropertyType::Double).unwrap(),
            TypedValue::Double(2.5)
        );
        assert!(s.convert("two", &PropertyType::Float).is_err());
        assert_eq!(
            s.convert("TRUE", &PropertyType::Boolean).unwrap(),
            TypedValue::Boolean(true)
        );
        assert!(s.convert("yes", &PropertyType::Boolean).is_err());
    }

    #[test]
    fn char_requires_single_character() {
        let s = svc();
        assert_eq!(
            s.convert("x", &PropertyType::Char).unwrap(),
            TypedValue::Char('x')
        );
        assert!(s.convert("", &PropertyType::Char).is_err());
        assert!(s.convert("xy", &PropertyType::Char).is_err());
    }

    #[test]
    fn timestamp_roundtrip() {
        let s = svc();
        let v = s
            .convert("2024-01-15T10:30:00Z", &PropertyType::Timestamp)
            .unwrap();
        assert_eq!(v.to_string(), "2024-01-15T10:30:00Z");
        assert!(s.convert("yesterday", &PropertyType::Timestamp).is_err());
    }

    #[test]
    fn enum_checks_membership() {
        let s = svc();
        let unit = PropertyType::Enum(vec!["SECONDS".into(), "MINUTES".into()]);
        assert_eq!(
            s.convert("MINUTES", &unit).unwrap(),
            TypedValue::Enum("MINUTES".into())
        );
        let err = s.convert("HOURS", &unit).unwrap_err();
        assert!(err.to_string().contains("expected one of SECONDS, MINUTES"));
    }

    #[test]
    fn custom_type_needs_registration() {
        struct Upper;
        impl Converter for Upper {
            fn convert(
                &self,
                value: &str,
                target: &PropertyType,
            ) -> Result<TypedValue, ConversionError> {
                if value.chars().all(|c| c.is_ascii_uppercase()) {
                    Ok(TypedValue::Custom(value.to_owned()))
                } else {
                    Err(ConversionError::incompatible(value, target, "not uppercase"))
                }
            }
        }

        let ty = PropertyType::Custom("upper".into());
        let mut s = svc();
        assert!(matches!(
            s.convert("ABC", &ty),
            Err(ConversionError::NoConverter(_))
        ));

        s.register("upper", Arc::new(Upper));
        assert_eq!(
            s.convert("ABC", &ty).unwrap(),
            TypedValue::Custom("ABC".into())
        );
        assert!(s.convert("abc", &ty).is_err());
    }

    #[test]
    fn numeric_view() {
        assert_eq!(TypedValue::Integer(3).as_f64(), Some(3.0));
        assert_eq!(TypedValue::String("3".into()).as_f64(), None);
    }
}
