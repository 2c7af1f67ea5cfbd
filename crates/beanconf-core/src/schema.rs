//! Schema types -- the type definitions beans are validated against.
//!
//! A [`Schema`] is immutable once registered. It declares single-valued
//! properties ([`SchemaProperty`]), multi-valued properties
//! ([`SchemaPropertyList`]) and references to other schemas
//! ([`SchemaPropertyRef`]).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Helper for `skip_serializing_if` on `bool` fields.
fn is_false(b: &bool) -> bool {
    !b
}

/// Declared type of a property value.
///
/// Unit variants serialise as lowercase strings (`integer`), the data
/// carrying variants as single-key maps (`{enum: [a, b]}`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    String,
    Boolean,
    Byte,
    Short,
    Integer,
    Long,
    Float,
    Double,
    Char,
    /// RFC 3339 timestamp.
    Timestamp,
    /// One of a closed set of symbolic values.
    Enum(Vec<String>),
    /// A type handled by a converter registered under this name.
    Custom(String),
}

impl PropertyType {
    /// Key used to look up the converter for this type.
    pub fn kind(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Integer => "integer",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Char => "char",
            Self::Timestamp => "timestamp",
            Self::Enum(_) => "enum",
            Self::Custom(name) => name.as_str(),
        }
    }

    /// Returns `true` for the integral and floating point types.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Byte | Self::Short | Self::Integer | Self::Long | Self::Float | Self::Double
        )
    }
}

impl Default for PropertyType {
    fn default() -> Self {
        Self::String
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enum(values) => write!(f, "enum[{}]", values.join("|")),
            Self::Custom(name) => write!(f, "custom:{name}"),
            other => f.write_str(other.kind()),
        }
    }
}

/// A single-valued property declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaProperty {
    pub name: String,

    #[serde(rename = "type", default)]
    pub property_type: PropertyType,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Documented default. Never filled in by validation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl SchemaProperty {
    pub fn new(name: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            name: name.into(),
            property_type,
            description: String::new(),
            default: None,
            required: false,
            min: None,
            max: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A multi-valued property declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaPropertyList {
    pub name: String,

    #[serde(rename = "type", default)]
    pub property_type: PropertyType,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defaults: Vec<String>,

    /// At least one value must be present.
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl SchemaPropertyList {
    pub fn new(name: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            name: name.into(),
            property_type,
            description: String::new(),
            defaults: Vec::new(),
            required: false,
            min: None,
            max: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }
}

/// A reference declaration pointing at another schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaPropertyRef {
    pub name: String,

    /// Name of the target schema.
    #[serde(rename = "schema")]
    pub schema_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Targets the single instance of a singleton schema. Always
    /// materialized on read, whatever the caller stored.
    #[serde(default, skip_serializing_if = "is_false")]
    pub singleton: bool,

    /// Allows more than one target.
    #[serde(default, skip_serializing_if = "is_false")]
    pub list: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
}

impl SchemaPropertyRef {
    pub fn new(name: impl Into<String>, schema_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema_name: schema_name.into(),
            description: String::new(),
            singleton: false,
            list: false,
            required: false,
        }
    }

    /// A reference to the singleton instance of `schema_name`.
    pub fn singleton(name: impl Into<String>, schema_name: impl Into<String>) -> Self {
        Self {
            singleton: true,
            ..Self::new(name, schema_name)
        }
    }

    /// A reference allowing any number of targets.
    pub fn list(name: impl Into<String>, schema_name: impl Into<String>) -> Self {
        Self {
            list: true,
            ..Self::new(name, schema_name)
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Type definition for a class of beans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Exactly one instance exists, with the schema name as instance id.
    #[serde(default, skip_serializing_if = "is_false")]
    pub singleton: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<SchemaProperty>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub property_lists: Vec<SchemaPropertyList>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<SchemaPropertyRef>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            singleton: false,
            properties: Vec::new(),
            property_lists: Vec::new(),
            references: Vec::new(),
        }
    }

    /// Marks the schema as singleton.
    pub fn as_singleton(mut self) -> Self {
        self.singleton = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_property(mut self, property: SchemaProperty) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_property_list(mut self, list: SchemaPropertyList) -> Self {
        self.property_lists.push(list);
        self
    }

    pub fn with_reference(mut self, reference: SchemaPropertyRef) -> Self {
        self.references.push(reference);
        self
    }

    pub fn property(&self, name: &str) -> Option<&SchemaProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn property_list(&self, name: &str) -> Option<&SchemaPropertyList> {
        self.property_lists.iter().find(|p| p.name == name)
    }

    pub fn reference(&self, name: &str) -> Option<&SchemaPropertyRef> {
        self.references.iter().find(|r| r.name == name)
    }

    /// References that target a singleton instance.
    pub fn singleton_references(&self) -> impl Iterator<Item = &SchemaPropertyRef> {
        self.references.iter().filter(|r| r.singleton)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn grandfather() -> Schema {
        Schema::new("Grandfather")
            .with_property(SchemaProperty::new("name", PropertyType::String).required())
            .with_property(
                SchemaProperty::new("age", PropertyType::Integer).range(Some(0.0), Some(150.0)),
            )
            .with_property_list(SchemaPropertyList::new("nicknames", PropertyType::String))
            .with_reference(SchemaPropertyRef::singleton("retirement", "Pension"))
            .with_reference(SchemaPropertyRef::list("children", "Father"))
    }

    #[test]
    fn lookups() {
        let s = grandfather();
        assert!(s.property("name").unwrap().required);
        assert!(s.property_list("nicknames").is_some());
        assert!(s.property("retirement").is_none());
        assert!(s.reference("children").unwrap().list);
        let singles: Vec<_> = s.singleton_references().map(|r| r.name.as_str()).collect();
        assert_eq!(singles, vec!["retirement"]);
    }

    #[test]
    fn property_type_serde_forms() {
        let json = serde_json::to_string(&PropertyType::Integer).unwrap();
        assert_eq!(json, r#""integer""#);

        let e = PropertyType::Enum(vec!["SECONDS".into(), "MINUTES".into()]);
        let json = serde_json::to_string(&e).unwrap();
        assert_eq!(json, r#"{"enum":["SECONDS","MINUTES"]}"#);
        let back: PropertyType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }

    #[test]
    fn property_type_display() {
        assert_eq!(PropertyType::Long.to_string(), "long");
        assert_eq!(
            PropertyType::Enum(vec!["A".into(), "B".into()]).to_string(),
            "enum[A|B]"
        );
        assert_eq!(PropertyType::Custom("url".into()).to_string(), "custom:url");
    }

    #[test]
    fn schema_json_omits_defaults() {
        let s = Schema::new("Pension").as_singleton();
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, r#"{"name":"Pension","singleton":true}"#);
    }

    #[test]
    fn schema_json_roundtrip() {
        let s = grandfather();
        let json = serde_json::to_string(&s).unwrap();
        let back: Schema = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
