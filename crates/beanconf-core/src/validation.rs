//! Schema-driven bean checks: identity, declared names, multiplicity and
//! type well-formedness.
//!
//! These run before any semantic validation and before anything reaches
//! storage. Properties absent from the bean are skipped; no defaults are
//! filled in here.

use crate::bean::{Bean, BeanId};
use crate::convert::ConversionService;

/// Error type for schema check failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
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

    #[error("{bean}: schema declares no property {property}")]
    UnknownProperty { bean: BeanId, property: String },

    #[error("{bean}: schema declares no reference {reference}")]
    UnknownReference { bean: BeanId, reference: String },

    #[error("{bean}: reference {reference} must target schema {expected} (got {target})")]
    WrongReferenceSchema {
        bean: BeanId,
        reference: String,
        expected: String,
        target: BeanId,
    },

    #[error("{0}: no schema attached")]
    SchemaNotAttached(BeanId),
}

/// Checks a bean against its attached schema.
///
/// Fails fast on the first problem. The instance id is checked before any
/// property is inspected.
pub fn validate_bean(bean: &Bean, conversions: &ConversionService) -> Result<(), SchemaError> {
    if bean.id.is_missing_instance() {
        return Err(SchemaError::MissingId {
            schema: bean.id.schema_name.clone(),
        });
    }
    let schema = bean
        .schema
        .as_deref()
        .ok_or_else(|| SchemaError::SchemaNotAttached(bean.id.clone()))?;

    for (name, values) in &bean.properties {
        if let Some(decl) = schema.property(name) {
            if values.len() > 1 {
                return Err(SchemaError::WrongMultiplicity {
                    bean: bean.id.clone(),
                    property: name.clone(),
                    count: values.len(),
                });
            }
            if let Some(value) = values.first() {
                check_value(bean, name, value, &decl.property_type, conversions)?;
            }
        } else if let Some(decl) = schema.property_list(name) {
            for value in values {
                check_value(bean, name, value, &decl.property_type, conversions)?;
            }
        } else {
            return Err(SchemaError::UnknownProperty {
                bean: bean.id.clone(),
                property: name.clone(),
            });
        }
    }

    for (name, targets) in &bean.references {
        let decl = schema
            .reference(name)
            .ok_or_else(|| SchemaError::UnknownReference {
                bean: bean.id.clone(),
                reference: name.clone(),
            })?;
        if !decl.list && targets.len() > 1 {
            return Err(SchemaError::WrongMultiplicity {
                bean: bean.id.clone(),
                property: name.clone(),
                count: targets.len(),
            });
        }
        if let Some(target) = targets.iter().find(|t| t.schema_name != decl.schema_name) {
            return Err(SchemaError::WrongReferenceSchema {
                bean: bean.id.clone(),
                reference: name.clone(),
                expected: decl.schema_name.clone(),
                target: target.clone(),
            });
        }
    }

    Ok(())
}

fn check_value(
    bean: &Bean,
    property: &str,
    value: &str,
    expected: &crate::schema::PropertyType,
    conversions: &ConversionService,
) -> Result<(), SchemaError> {
    conversions
        .convert(value, expected)
        .map(|_| ())
        .map_err(|e| SchemaError::WrongPropertyType {
            bean: bean.id.clone(),
            property: property.to_owned(),
            value: value.to_owned(),
            expected: expected.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::bean::BeanBuilder;
    use crate::schema::{PropertyType, Schema, SchemaProperty, SchemaPropertyList, SchemaPropertyRef};

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::new("Server")
                .with_property(SchemaProperty::new("port", PropertyType::Integer))
                .with_property(SchemaProperty::new("host", PropertyType::String))
                .with_property_list(SchemaPropertyList::new("weights", PropertyType::Double))
                .with_reference(SchemaPropertyRef::new("pool", "Pool"))
                .with_reference(SchemaPropertyRef::list("backups", "Server")),
        )
    }

    fn check(builder: BeanBuilder) -> Result<(), SchemaError> {
        let mut bean = builder.build();
        bean.attach_schema(schema());
        validate_bean(&bean, &ConversionService::new())
    }

    #[test]
    fn valid_bean_passes() {
        let b = BeanBuilder::new("Server", "s1")
            .property("port", "8080")
            .property_list("weights", ["0.5", "1.5"])
            .reference("pool", BeanId::new("Pool", "p1"))
            .reference_list(
                "backups",
                vec![BeanId::new("Server", "s2"), BeanId::new("Server", "s3")],
            );
        assert!(check(b).is_ok());
    }

    #[test]
    fn missing_id_checked_first() {
        // The bad port would also fail, but the id is inspected first.
        let b = BeanBuilder::new("Server", "").property("port", "nope");
        assert_eq!(
            check(b),
            Err(SchemaError::MissingId {
                schema: "Server".into()
            })
        );
    }

    #[test]
    fn wrong_type_on_single_property() {
        let b = BeanBuilder::new("Server", "s1").property("port", "eighty");
        match check(b) {
            Err(SchemaError::WrongPropertyType {
                property, expected, ..
            }) => {
                assert_eq!(property, "port");
                assert_eq!(expected, "integer");
            }
            other => panic!("expected WrongPropertyType, got {other:?}"),
        }
    }

    #[test]
    fn wrong_type_on_any_list_element() {
        let b = BeanBuilder::new("Server", "s1").property_list("weights", ["1.0", "heavy"]);
        assert!(matches!(
            check(b),
            Err(SchemaError::WrongPropertyType { value, .. }) if value == "heavy"
        ));
    }

    #[test]
    fn single_property_with_two_values() {
        let b = BeanBuilder::new("Server", "s1").property_list("port", ["80", "81"]);
        assert!(matches!(
            check(b),
            Err(SchemaError::WrongMultiplicity { count: 2, .. })
        ));
    }

    #[test]
    fn empty_values_are_skipped() {
        let b = BeanBuilder::new("Server", "s1").property_list("port", Vec::<String>::new());
        assert!(check(b).is_ok());
    }

    #[test]
    fn undeclared_names_rejected() {
        let b = BeanBuilder::new("Server", "s1").property("colour", "red");
        assert!(matches!(check(b), Err(SchemaError::UnknownProperty { .. })));

        let b = BeanBuilder::new("Server", "s1").reference("owner", BeanId::new("User", "u"));
        assert!(matches!(check(b), Err(SchemaError::UnknownReference { .. })));
    }

    #[test]
    fn reference_multiplicity_and_target_schema() {
        let b = BeanBuilder::new("Server", "s1").reference_list(
            "pool",
            vec![BeanId::new("Pool", "p1"), BeanId::new("Pool", "p2")],
        );
        assert!(matches!(
            check(b),
            Err(SchemaError::WrongMultiplicity { .. })
        ));

        let b = BeanBuilder::new("Server", "s1").reference("pool", BeanId::new("Server", "s9"));
        assert!(matches!(
            check(b),
            Err(SchemaError::WrongReferenceSchema { .. })
        ));
    }

    #[test]
    fn schema_must_be_attached() {
        let bean = BeanBuilder::new("Server", "s1").build();
        assert_eq!(
            validate_bean(&bean, &ConversionService::new()),
            Err(SchemaError::SchemaNotAttached(BeanId::new("Server", "s1")))
        );
    }
}
