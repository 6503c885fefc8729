//! Type-keyed schema registry and declarative schema catalogs.
//!
//! This crate binds schemas built with `value-schema-core` to the rest of an
//! application:
//!
//! - [`Registry`]: maps a Rust type to its [`Schema`](value_schema_core::Schema)
//!   so call sites can parse and serialize by type. The [`Registered`] trait
//!   adds `parse_with` / `serialize_with` / `validate_with` to any type.
//! - [`SchemaCatalog`]: a YAML/JSON document of named
//!   [`SchemaDescriptor`]s, compiled into a [`Catalog`] of dynamic schemas
//!   over `serde_json::Value`.
//!
//! # Quick start
//!
//! ```
//! use serde_json::json;
//! use value_schema_core::*;
//! use value_schema_registry::{Registered, Registry};
//!
//! #[derive(Debug, PartialEq)]
//! struct Email(String);
//!
//! impl Registered for Email {}
//!
//! let mut registry = Registry::new();
//! registry.register(
//!     string()
//!         .refine(|s| s.contains('@'), "must contain @")
//!         .map(Email, |e: &Email| Some(e.0.clone())),
//! );
//!
//! let email = Email::parse_with(&registry, &json!("ada@example.com")).unwrap();
//! assert_eq!(email, Ok(Email("ada@example.com".into())));
//! assert!(Email::parse_with(&registry, &json!("nope")).unwrap().is_err());
//! ```

mod catalog;
mod descriptor;
mod error;
mod registry;

pub use catalog::{Catalog, SchemaCatalog};
pub use descriptor::{FieldDescriptor, SchemaDescriptor};
pub use error::{RegistryError, Result};
pub use registry::{Registered, Registry};
