//! Type-keyed schema lookup.
//!
//! A [`Registry`] maps a Rust type to the [`Schema`] used to parse and
//! serialize it. It is an ordinary value: build one at start-up, register
//! every type, then share it by reference. Callers that need to register
//! while other threads read wrap it in a lock themselves.
//!
//! # Examples
//!
//! ```
//! use serde_json::json;
//! use value_schema_core::*;
//! use value_schema_registry::{Registered, Registry};
//!
//! #[derive(Debug, PartialEq)]
//! struct Celsius(f64);
//!
//! impl Registered for Celsius {}
//!
//! let mut registry = Registry::new();
//! registry.register(number().map(Celsius, |c: &Celsius| Some(c.0)));
//!
//! let parsed = Celsius::parse_with(&registry, &json!(21.5)).unwrap();
//! assert_eq!(parsed, Ok(Celsius(21.5)));
//! assert_eq!(Celsius(-4.0).serialize_with(&registry).unwrap(), json!(-4));
//! ```

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;
use value_schema_core::{Outcome, Schema};

use crate::error::{RegistryError, Result};

struct Entry {
    type_name: &'static str,
    schema: Box<dyn Any + Send + Sync>,
}

/// Mapping from Rust type to the schema that handles it.
#[derive(Default)]
pub struct Registry {
    entries: HashMap<TypeId, Entry>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `schema` for `T`, returning the schema it replaces.
    pub fn register<T: Send + Sync + 'static>(&mut self, schema: Schema<T>) -> Option<Schema<T>> {
        let type_name = type_name::<T>();
        let previous = self.entries.insert(
            TypeId::of::<T>(),
            Entry {
                type_name,
                schema: Box::new(schema),
            },
        );

        match previous {
            Some(entry) => {
                debug!(type_name, "replaced registered schema");
                entry.schema.downcast::<Schema<T>>().ok().map(|schema| *schema)
            }
            None => {
                debug!(type_name, total = self.entries.len(), "registered schema");
                None
            }
        }
    }

    /// Returns the schema registered for `T`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnregisteredType`] if `T` was never
    /// registered.
    pub fn schema_for<T: Send + Sync + 'static>(&self) -> Result<Schema<T>> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.schema.downcast_ref::<Schema<T>>())
            .cloned()
            .ok_or_else(|| {
                let type_name = type_name::<T>();
                debug!(type_name, "schema lookup for unregistered type");
                RegistryError::UnregisteredType { type_name }
            })
    }

    /// Returns `true` if a schema is registered for `T`.
    pub fn contains<T: 'static>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of the registered types, sorted.
    pub fn type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.entries.values().map(|entry| entry.type_name).collect();
        names.sort_unstable();
        names
    }

    /// Parses `raw` with the schema registered for `T`.
    ///
    /// The outer `Result` reports a missing registration; the inner
    /// [`Outcome`] is the parse result.
    pub fn parse<T: Send + Sync + 'static>(&self, raw: &Value) -> Result<Outcome<T>> {
        Ok(self.schema_for::<T>()?.parse(raw))
    }

    /// Serializes `value` with the schema registered for `T`.
    pub fn serialize<T: Send + Sync + 'static>(&self, value: &T) -> Result<Value> {
        Ok(self.schema_for::<T>()?.serialize(value)?)
    }

    /// Checks `value` against every refinement of the schema registered
    /// for `T`.
    pub fn validate<T: Send + Sync + 'static>(&self, value: &T) -> Result<bool> {
        Ok(self.schema_for::<T>()?.validate(value))
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("types", &self.type_names())
            .finish()
    }
}

/// Parse, serialize, and validate through a [`Registry`] by the receiver's
/// type.
///
/// All methods are provided; an empty `impl Registered for MyType {}` is
/// enough.
pub trait Registered: Sized + Send + Sync + 'static {
    /// Parses `raw` with the schema registered for `Self`.
    fn parse_with(registry: &Registry, raw: &Value) -> Result<Outcome<Self>> {
        registry.parse::<Self>(raw)
    }

    /// Serializes `self` with the schema registered for `Self`.
    fn serialize_with(&self, registry: &Registry) -> Result<Value> {
        registry.serialize(self)
    }

    /// Checks `self` against the schema registered for `Self`.
    fn validate_with(&self, registry: &Registry) -> Result<bool> {
        registry.validate(self)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use value_schema_core::{ErrorKind, integer, string};

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct UserId(i64);

    impl Registered for UserId {}

    fn user_id() -> Schema<UserId> {
        integer()
            .refine(|id| *id > 0, "must be positive")
            .map(UserId, |id: &UserId| Some(id.0))
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = Registry::new();
        assert!(registry.is_empty());
        assert!(registry.register(user_id()).is_none());

        assert!(registry.contains::<UserId>());
        assert!(!registry.contains::<String>());
        assert_eq!(registry.len(), 1);
        assert_eq!(UserId::parse_with(&registry, &json!(7)).unwrap(), Ok(UserId(7)));
    }

    #[test]
    fn test_unregistered_type_is_a_configuration_error() {
        let registry = Registry::new();
        let err = registry.schema_for::<UserId>().unwrap_err();
        assert!(matches!(err, RegistryError::UnregisteredType { type_name } if type_name.ends_with("UserId")));
        assert!(UserId(1).serialize_with(&registry).is_err());
    }

    #[test]
    fn test_register_returns_replaced_schema() {
        let mut registry = Registry::new();
        registry.register(string().with_help("first"));
        let previous = registry.register(string().with_help("second")).unwrap();

        assert_eq!(previous.help(), Some("first"));
        assert_eq!(registry.schema_for::<String>().unwrap().help(), Some("second"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_parse_failures_stay_in_the_outcome() {
        let mut registry = Registry::new();
        registry.register(user_id());

        let failure = UserId::parse_with(&registry, &json!(-3)).unwrap().unwrap_err();
        assert_eq!(failure.errors()[0].kind, ErrorKind::Invalid);
        assert!(UserId(5).validate_with(&registry).unwrap());
        assert!(!UserId(0).validate_with(&registry).unwrap());
    }

    #[test]
    fn test_type_names_are_sorted() {
        let mut registry = Registry::new();
        registry.register(user_id());
        registry.register(string());
        let names = registry.type_names();
        assert_eq!(names.len(), 2);
        assert!(names.windows(2).all(|pair| pair[0] <= pair[1]));
    }
}
