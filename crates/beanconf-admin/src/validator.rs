//! Semantic validation seam and the built-in constraint validator.

use std::fmt;

use beanconf_core::{Bean, BeanGraph, BeanId, ConversionService, PropertyType, Schema};

/// One rejected constraint on one bean.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintViolation {
    pub bean: BeanId,
    /// Property or reference name.
    pub field: String,
    pub message: String,
}

impl ConstraintViolation {
    pub fn new(bean: BeanId, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            bean,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} {}", self.bean, self.field, self.message)
    }
}

/// A validation engine run over the resolved graph of a write.
///
/// The roots of `graph` are the beans being written together with every
/// bean that references them; the remaining beans are loaded so that
/// references can be navigated. Every bean carries its schema.
pub trait BeanValidator: Send + Sync {
    fn validate(&self, graph: &BeanGraph) -> Result<(), Vec<ConstraintViolation>>;
}

/// Checks the `required`, `min` and `max` declarations of every root bean.
///
/// `min`/`max` bound the value of numeric properties and the character
/// length of all others. All violations are collected.
#[derive(Debug, Default)]
pub struct ConstraintValidator {
    conversions: ConversionService,
}

impl ConstraintValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `conversions` to read numeric values, e.g. to honour custom
    /// converters.
    pub fn with_conversions(conversions: ConversionService) -> Self {
        Self { conversions }
    }

    fn check_bean(&self, bean: &Bean, schema: &Schema, out: &mut Vec<ConstraintViolation>) {
        for decl in &schema.properties {
            let values = bean.values(&decl.name);
            if decl.required && values.is_empty() {
                out.push(ConstraintViolation::new(bean.id.clone(), &decl.name, "is required"));
            }
            for value in values {
                self.check_range(bean, &decl.name, value, &decl.property_type, decl.min, decl.max, out);
            }
        }
        for decl in &schema.property_lists {
            let values = bean.values(&decl.name);
            if decl.required && values.is_empty() {
                out.push(ConstraintViolation::new(
                    bean.id.clone(),
                    &decl.name,
                    "requires at least one value",
                ));
            }
            for value in values {
                self.check_range(bean, &decl.name, value, &decl.property_type, decl.min, decl.max, out);
            }
        }
        for decl in &schema.references {
            // Singleton references are bound on read whatever is stored.
            if decl.required && !decl.singleton && bean.reference_ids(&decl.name).is_empty() {
                out.push(ConstraintViolation::new(bean.id.clone(), &decl.name, "is required"));
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn check_range(
        &self,
        bean: &Bean,
        name: &str,
        value: &str,
        property_type: &PropertyType,
        min: Option<f64>,
        max: Option<f64>,
        out: &mut Vec<ConstraintViolation>,
    ) {
        if min.is_none() && max.is_none() {
            return;
        }
        let measured = if property_type.is_numeric() {
            match self.conversions.convert(value, property_type).ok().and_then(|v| v.as_f64()) {
                Some(n) => n,
                // Type errors are reported by the schema checks.
                None => return,
            }
        } else {
            #[allow(clippy::cast_precision_loss)]
            let len = value.chars().count() as f64;
            len
        };
        let what = if property_type.is_numeric() { "" } else { "length " };

        if let Some(min) = min.filter(|m| measured < *m) {
            out.push(ConstraintViolation::new(
                bean.id.clone(),
                name,
                format!("{what}must be at least {min}"),
            ));
        }
        if let Some(max) = max.filter(|m| measured > *m) {
            out.push(ConstraintViolation::new(
                bean.id.clone(),
                name,
                format!("{what}must be at most {max}"),
            ));
        }
    }
}

impl BeanValidator for ConstraintValidator {
    fn validate(&self, graph: &BeanGraph) -> Result<(), Vec<ConstraintViolation>> {
        let mut violations = Vec::new();
        let mut roots: Vec<&Bean> = graph.roots().collect();
        roots.sort_by(|a, b| a.id.cmp(&b.id));
        for bean in roots {
            if let Some(schema) = bean.schema.as_deref() {
                self.check_bean(bean, schema, &mut violations);
            }
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use beanconf_core::{BeanBuilder, SchemaProperty, SchemaPropertyList, SchemaPropertyRef};
    use pretty_assertions::assert_eq;

    use super::*;

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::new("Father")
                .with_property(SchemaProperty::new("name", PropertyType::String).required().range(Some(2.0), None))
                .with_property(SchemaProperty::new("age", PropertyType::Integer).range(Some(0.0), Some(150.0)))
                .with_property_list(SchemaPropertyList::new("scores", PropertyType::Double).range(None, Some(10.0)))
                .with_reference(SchemaPropertyRef::new("mother", "Mother").required())
                .with_reference(SchemaPropertyRef::singleton("retirement", "Pension").required()),
        )
    }

    fn graph_of(mut bean: Bean) -> BeanGraph {
        bean.attach_schema(schema());
        BeanGraph::with_root(bean)
    }

    #[test]
    fn valid_bean_passes() {
        let bean = BeanBuilder::new("Father", "f1")
            .property("name", "Homer")
            .property("age", "39")
            .property_list("scores", ["1.5", "10"])
            .reference("mother", BeanId::new("Mother", "m1"))
            .build();
        assert_eq!(ConstraintValidator::new().validate(&graph_of(bean)), Ok(()));
    }

    #[test]
    fn collects_every_violation() {
        let bean = BeanBuilder::new("Father", "f1")
            .property("age", "200")
            .property_list("scores", ["3", "11"])
            .build();
        let violations = ConstraintValidator::new().validate(&graph_of(bean)).unwrap_err();
        let rendered: Vec<String> = violations.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "Father/f1.name is required",
                "Father/f1.age must be at most 150",
                "Father/f1.scores must be at most 10",
                "Father/f1.mother is required",
            ]
        );
    }

    #[test]
    fn string_range_bounds_length() {
        let bean = BeanBuilder::new("Father", "f1")
            .property("name", "H")
            .reference("mother", BeanId::new("Mother", "m1"))
            .build();
        let violations = ConstraintValidator::new().validate(&graph_of(bean)).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].message, "length must be at least 2");
    }

    #[test]
    fn only_roots_are_checked() {
        let mut root = BeanBuilder::new("Father", "f1")
            .property("name", "Homer")
            .reference("mother", BeanId::new("Mother", "m1"))
            .build();
        root.attach_schema(schema());
        let mut context = BeanBuilder::new("Father", "f2").build();
        context.attach_schema(schema());

        let mut graph = BeanGraph::with_root(root);
        graph.insert(context);
        assert_eq!(ConstraintValidator::new().validate(&graph), Ok(()));
    }
}
