//! Bean graph resolution and validation engine.
//!
//! [`BeanAdmin`] is the entry point. Each operation attaches schemas to the
//! raw beans it handles ([`attach`]), resolves their references into an
//! in-flight [`BeanGraph`](beanconf_core::BeanGraph) ([`resolve`]), applies
//! set or merge semantics across the affected beans ([`mutate`]), runs the
//! schema checks and the optional [`BeanValidator`], and only then hands the
//! write to the [`BeanStore`](beanconf_storage::BeanStore).

pub mod admin;
pub mod attach;
pub mod error;
pub mod mutate;
pub mod resolve;
pub mod validator;

pub use admin::{BeanAdmin, BeanAdminBuilder};
pub use attach::SchemaMap;
pub use error::{AdminError, ErrorEvent, Result};
pub use mutate::UpdateMode;
pub use validator::{BeanValidator, ConstraintValidator, ConstraintViolation};
