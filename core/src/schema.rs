//! The schema handle and the contract every schema kind implements.
//!
//! A [`Shape<T>`] knows how to parse raw data into a `T` and serialize a `T`
//! back. [`Schema<T>`] wraps a shape in an `Arc` so schemas can be cloned
//! freely, shared across threads, and composed: every combinator returns a
//! new `Schema` and never touches the one it was called on.
//!
//! # Examples
//!
//! ```
//! use serde_json::json;
//! use value_schema_core::*;
//!
//! let port = integer().coerce().refine(|p| (1..=65535).contains(p), "must be a valid port");
//!
//! assert_eq!(port.parse(&json!("8080")).unwrap(), 8080);
//! assert!(port.parse(&json!(0)).is_err());
//! assert_eq!(port.serialize(&443).unwrap(), json!(443));
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::combinator::{Catch, DefaultTo, Map, Nullable, Optional, Refine, Then, Transform, TryMap};
use crate::error::SerializeError;
use crate::outcome::Outcome;
use crate::union::Union;

/// Parse/serialize contract implemented by every schema kind.
///
/// Implement this to add a schema kind of your own, then wrap it with
/// [`Schema::new`] to get all combinators for free.
pub trait Shape<T>: Send + Sync {
    /// Parses `raw`; `None` means the value is absent (e.g. a missing field).
    fn parse(&self, raw: Option<&Value>) -> Outcome<T>;

    /// Serializes a typed value back to raw data.
    fn serialize(&self, value: &T) -> Result<Value, SerializeError>;

    /// Serializes a value in field position; `Ok(None)` omits the field.
    fn serialize_field(&self, value: &T) -> Result<Option<Value>, SerializeError> {
        self.serialize(value).map(Some)
    }

    /// Short human-readable description, e.g. `array<string>`.
    fn describe(&self) -> String;

    /// Returns a coercing variant of this shape, for kinds that support it.
    fn coerce(&self) -> Option<Arc<dyn Shape<T>>> {
        None
    }

    /// Returns `true` if `value` satisfies every constraint of this shape.
    ///
    /// The default serializes `value` and parses the result back, which is
    /// exact for shapes without fallbacks. Shapes that substitute values on
    /// failure must override it.
    fn check(&self, value: &T) -> bool {
        self.serialize(value)
            .is_ok_and(|raw| self.parse(Some(&raw)).is_ok())
    }
}

/// Immutable, shareable schema producing values of type `T`.
pub struct Schema<T> {
    shape: Arc<dyn Shape<T>>,
    help: Option<Arc<str>>,
}

impl<T> Clone for Schema<T> {
    fn clone(&self) -> Self {
        Self {
            shape: Arc::clone(&self.shape),
            help: self.help.clone(),
        }
    }
}

impl<T> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("shape", &self.shape.describe())
            .field("help", &self.help)
            .finish()
    }
}

impl<T: Send + Sync + 'static> Schema<T> {
    /// Wraps a shape.
    pub fn new(shape: impl Shape<T> + 'static) -> Self {
        Self {
            shape: Arc::new(shape),
            help: None,
        }
    }

    fn derive<U>(&self, shape: impl Shape<U> + 'static) -> Schema<U> {
        Schema {
            shape: Arc::new(shape),
            help: self.help.clone(),
        }
    }

    /// Parses a present raw value.
    pub fn parse(&self, raw: &Value) -> Outcome<T> {
        self.shape.parse(Some(raw))
    }

    /// Parses a raw value that may be absent.
    pub fn parse_input(&self, raw: Option<&Value>) -> Outcome<T> {
        self.shape.parse(raw)
    }

    /// Serializes a typed value.
    pub fn serialize(&self, value: &T) -> Result<Value, SerializeError> {
        self.shape.serialize(value)
    }

    /// Serializes a value in field position; `Ok(None)` means "omit".
    pub fn serialize_field(&self, value: &T) -> Result<Option<Value>, SerializeError> {
        self.shape.serialize_field(value)
    }

    /// Describes the expected shape, e.g. `{ name: string, age: number }`.
    pub fn describe(&self) -> String {
        self.shape.describe()
    }

    /// Returns the attached help text.
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Attaches help text, kept by every combinator derived from this schema.
    pub fn with_help(mut self, text: impl Into<String>) -> Self {
        self.help = Some(Arc::from(text.into()));
        self
    }

    /// Switches a leaf schema to best-effort coercion.
    ///
    /// Leaf schemas (string, number, integer, boolean) coerce. Combinators
    /// and unions pass the switch down to the schemas they wrap, so
    /// `number().refine(..).coerce()` coerces like `number().coerce()`.
    /// Objects and collections are returned unchanged; coerce their fields
    /// or elements instead.
    pub fn coerce(self) -> Self {
        match self.shape.coerce() {
            Some(shape) => Self {
                shape,
                help: self.help,
            },
            None => self,
        }
    }

    pub(crate) fn coerced(&self) -> Self {
        self.clone().coerce()
    }

    /// Returns `true` if `value` satisfies every constraint of this schema.
    ///
    /// Fallbacks never apply here: a value rejected by a refinement under
    /// `default(..)` or `catch(..)` is invalid. Nested fields and elements
    /// are checked recursively.
    pub fn validate(&self, value: &T) -> bool {
        self.shape.check(value)
    }

    /// Treats an absent or `null` value as `None`.
    ///
    /// Only a missing value is tolerated; a present but invalid value still
    /// fails. `None` serializes to an omitted field (or `null` at the root).
    pub fn optional(&self) -> Schema<Option<T>> {
        self.derive(Optional::new(self.clone()))
    }

    /// Accepts an explicit `null` as `None`, serialized back as `null`.
    ///
    /// Unlike [`optional`](Schema::optional), an absent value still fails.
    pub fn nullable(&self) -> Schema<Option<T>> {
        self.derive(Nullable::new(self.clone()))
    }

    /// Substitutes `value` whenever parsing fails.
    pub fn default(&self, value: T) -> Schema<T>
    where
        T: Clone,
    {
        self.derive(DefaultTo::new(self.clone(), value))
    }

    /// Tries this schema, then `other`, against the same raw input.
    ///
    /// The first schema that succeeds wins, so order matters. Serializing
    /// tries this schema first and falls back to `other` when the value has
    /// another shape.
    pub fn or(&self, other: Schema<T>) -> Schema<T> {
        self.derive(Union::new(self.clone(), other))
    }

    /// Post-processes the whole outcome.
    ///
    /// Failures handed to `f` carry the original raw input
    /// ([`Failure::input`](crate::Failure::input)); successes do not. Use
    /// [`transform_with_input`](Schema::transform_with_input) to see the
    /// raw input in both cases.
    pub fn transform<F>(&self, f: F) -> Schema<T>
    where
        F: Fn(Outcome<T>) -> Outcome<T> + Send + Sync + 'static,
    {
        self.transform_with_input(move |outcome, _| f(outcome))
    }

    /// Like [`transform`](Schema::transform), but `f` also receives the raw
    /// input, so it can re-parse it with another schema after a success.
    ///
    /// # Examples
    ///
    /// ```
    /// use serde_json::json;
    /// use value_schema_core::*;
    ///
    /// // Keep the exact spelling of whole numbers written as text.
    /// let verbatim = string();
    /// let schema = string().coerce().transform_with_input(move |outcome, raw| {
    ///     outcome.and_then(|text| match verbatim.parse_input(raw) {
    ///         Ok(_) => Ok(text),
    ///         Err(_) => Ok(format!("#{text}")),
    ///     })
    /// });
    ///
    /// assert_eq!(schema.parse(&json!("7")).unwrap(), "7");
    /// assert_eq!(schema.parse(&json!(7)).unwrap(), "#7");
    /// ```
    pub fn transform_with_input<F>(&self, f: F) -> Schema<T>
    where
        F: Fn(Outcome<T>, Option<&Value>) -> Outcome<T> + Send + Sync + 'static,
    {
        self.derive(Transform::new(self.clone(), f))
    }

    /// Applies `f` to successfully parsed values.
    pub fn then<F>(&self, f: F) -> Schema<T>
    where
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        self.derive(Then::new(self.clone(), f))
    }

    /// Replaces a failure with the outcome returned by `f`.
    ///
    /// The failure carries the original raw input, so `f` can re-parse it
    /// with another schema.
    pub fn catch<F>(&self, f: F) -> Schema<T>
    where
        F: Fn(crate::Failure) -> Outcome<T> + Send + Sync + 'static,
    {
        self.derive(Catch::new(self.clone(), f))
    }

    /// Rejects parsed values for which `predicate` is false.
    pub fn refine<P>(&self, predicate: P, message: impl Into<String>) -> Schema<T>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.derive(Refine::new(self.clone(), predicate, message.into()))
    }

    /// Maps parsed values to another type and back.
    ///
    /// `backward` returns `None` for values this schema cannot represent;
    /// inside a union that hands serialization to the next branch.
    pub fn map<U, F, B>(&self, forward: F, backward: B) -> Schema<U>
    where
        U: Send + Sync + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
        B: Fn(&U) -> Option<T> + Send + Sync + 'static,
    {
        self.derive(Map::new(self.clone(), forward, backward))
    }

    /// Like [`map`](Schema::map), but `forward` may reject a value.
    pub fn try_map<U, F, B>(&self, forward: F, backward: B) -> Schema<U>
    where
        U: Send + Sync + 'static,
        F: Fn(T) -> Result<U, String> + Send + Sync + 'static,
        B: Fn(&U) -> Option<T> + Send + Sync + 'static,
    {
        self.derive(TryMap::new(self.clone(), forward, backward))
    }
}

/// Parses `raw` with `schema`.
pub fn parse<T: Send + Sync + 'static>(schema: &Schema<T>, raw: &Value) -> Outcome<T> {
    schema.parse(raw)
}

/// Serializes `value` with `schema`.
pub fn serialize<T: Send + Sync + 'static>(
    schema: &Schema<T>,
    value: &T,
) -> Result<Value, SerializeError> {
    schema.serialize(value)
}
