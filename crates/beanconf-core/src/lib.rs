//! Core types for the beanconf system.
//!
//! Beans are typed configuration instances described by a [`Schema`]. This
//! crate holds the data model, the in-flight resolution arena
//! ([`BeanGraph`]), the type conversion service and the schema-driven
//! type/multiplicity checks. It performs no I/O.

pub mod bean;
pub mod convert;
pub mod event;
pub mod graph;
pub mod schema;
pub mod validation;

pub use bean::{Bean, BeanBuilder, BeanId};
pub use convert::{ConversionError, ConversionService, Converter, TypedValue};
pub use event::{BeanEvent, EventType};
pub use graph::BeanGraph;
pub use schema::{PropertyType, Schema, SchemaProperty, SchemaPropertyList, SchemaPropertyRef};
pub use validation::SchemaError;
