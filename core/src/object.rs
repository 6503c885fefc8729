//! Object schemas: a fixed, ordered set of named fields.
//!
//! Each field is parsed from `raw[name]` with its own schema. Every field is
//! visited even after a failure, so one pass reports all of them, each
//! prefixed with its field name. The parsed fields land in a [`Record`], or
//! in your own type through [`Construct`].
//!
//! # Examples
//!
//! ```
//! use serde_json::json;
//! use value_schema_core::*;
//!
//! let person = object()
//!     .field("name", string())
//!     .field("age", number().coerce())
//!     .build()
//!     .unwrap();
//!
//! let record = person.parse(&json!({"name": "Ada", "age": "36"})).unwrap();
//! assert_eq!(record.get::<f64>("age"), Some(&36.0));
//!
//! let failure = person.parse(&json!({"age": 36})).unwrap_err();
//! assert_eq!(failure.errors()[0].path_string(), "name");
//! ```

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{ErrorEntry, ErrorKind, SchemaError, SerializeError, value_kind};
use crate::outcome::{Failure, Outcome, require_present};
use crate::record::{Record, RecordError, Slot};
use crate::schema::{Schema, Shape};

/// Construction hook: builds a typed value from parsed object fields and
/// takes it apart again for serialization.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use value_schema_core::*;
///
/// #[derive(Debug, PartialEq)]
/// struct Point {
///     x: i64,
///     y: i64,
/// }
///
/// impl Construct for Point {
///     fn construct(mut record: Record) -> Result<Self, RecordError> {
///         Ok(Point {
///             x: record.take("x")?,
///             y: record.take("y")?,
///         })
///     }
///
///     fn deconstruct(&self) -> Record {
///         Record::new().with("x", self.x).with("y", self.y)
///     }
/// }
///
/// let schema = object()
///     .field("x", integer())
///     .field("y", integer())
///     .build_as::<Point>()
///     .unwrap();
///
/// assert_eq!(schema.parse(&json!({"x": 1, "y": 2})).unwrap(), Point { x: 1, y: 2 });
/// assert_eq!(schema.serialize(&Point { x: 3, y: 4 }).unwrap(), json!({"x": 3, "y": 4}));
/// ```
pub trait Construct: Sized {
    /// Builds the value from successfully parsed fields.
    fn construct(record: Record) -> Result<Self, RecordError>;

    /// Returns the field values to serialize. Fields left out are omitted.
    fn deconstruct(&self) -> Record;
}

/// A field schema with its value type erased.
trait ErasedField: Send + Sync {
    fn parse_erased(&self, raw: Option<&Value>) -> Outcome<Slot>;
    fn serialize_erased(
        &self,
        value: &(dyn Any + Send + Sync),
    ) -> Result<Option<Value>, SerializeError>;
    fn describe_field(&self) -> String;
    fn check_erased(&self, value: Option<&(dyn Any + Send + Sync)>) -> bool;
}

impl<T: Any + Send + Sync> ErasedField for Schema<T> {
    fn parse_erased(&self, raw: Option<&Value>) -> Outcome<Slot> {
        self.parse_input(raw).map(|value| Box::new(value) as Slot)
    }

    fn serialize_erased(
        &self,
        value: &(dyn Any + Send + Sync),
    ) -> Result<Option<Value>, SerializeError> {
        match value.downcast_ref::<T>() {
            Some(value) => self.serialize_field(value),
            None => Err(SerializeError::mismatch(self.describe())),
        }
    }

    fn describe_field(&self) -> String {
        self.describe()
    }

    fn check_erased(&self, value: Option<&(dyn Any + Send + Sync)>) -> bool {
        match value {
            Some(value) => value.downcast_ref::<T>().is_some_and(|value| self.validate(value)),
            None => self.parse_input(None).is_ok(),
        }
    }
}

struct Field {
    name: String,
    schema: Arc<dyn ErasedField>,
}

/// Builder for object schemas, started with [`object()`].
pub struct ObjectBuilder {
    fields: Vec<Field>,
    deny_unknown_fields: bool,
    error: Option<SchemaError>,
}

/// Starts an object schema.
pub fn object() -> ObjectBuilder {
    ObjectBuilder {
        fields: Vec::new(),
        deny_unknown_fields: false,
        error: None,
    }
}

impl ObjectBuilder {
    /// Declares a field. Declaration order is parse and report order.
    pub fn field<T: Send + Sync + 'static>(mut self, name: impl Into<String>, schema: Schema<T>) -> Self {
        let name = name.into();
        if self.error.is_none() {
            if name.is_empty() {
                self.error = Some(SchemaError::EmptyFieldName);
            } else if self.fields.iter().any(|field| field.name == name) {
                self.error = Some(SchemaError::DuplicateField(name.clone()));
            }
        }
        self.fields.push(Field {
            name,
            schema: Arc::new(schema),
        });
        self
    }

    /// Reports keys not declared as fields as shape mismatches.
    pub fn deny_unknown_fields(mut self) -> Self {
        self.deny_unknown_fields = true;
        self
    }

    /// Builds a schema producing [`Record`]s.
    pub fn build(self) -> Result<Schema<Record>, SchemaError> {
        Ok(Schema::new(self.into_shape()?))
    }

    /// Builds a schema producing `T` through its [`Construct`] hook.
    pub fn build_as<T: Construct + Send + Sync + 'static>(self) -> Result<Schema<T>, SchemaError> {
        Ok(Schema::new(Constructed {
            object: self.into_shape()?,
            _target: PhantomData,
        }))
    }

    fn into_shape(self) -> Result<ObjectShape, SchemaError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(ObjectShape {
                fields: self.fields,
                deny_unknown_fields: self.deny_unknown_fields,
            }),
        }
    }
}

struct ObjectShape {
    fields: Vec<Field>,
    deny_unknown_fields: bool,
}

impl ObjectShape {
    fn parse_record(&self, raw: Option<&Value>) -> Outcome<Record> {
        let value = require_present(raw)?;
        let Value::Object(map) = value else {
            return Err(Failure::shape_mismatch(format!(
                "expected object, found {}",
                value_kind(value)
            )));
        };

        let mut record = Record::new();
        let mut errors = Vec::new();
        for field in &self.fields {
            match field.schema.parse_erased(map.get(&field.name)) {
                Ok(parsed) => record.insert_boxed(field.name.clone(), parsed),
                Err(failure) => errors.extend(failure.prefixed(field.name.as_str()).into_errors()),
            }
        }

        if self.deny_unknown_fields {
            for key in map.keys() {
                if !self.fields.iter().any(|field| field.name == *key) {
                    errors.push(
                        ErrorEntry::new(ErrorKind::ShapeMismatch, "unknown field")
                            .with_prefix(key.as_str()),
                    );
                }
            }
        }

        if errors.is_empty() {
            Ok(record)
        } else {
            Err(Failure::from_errors(errors))
        }
    }

    fn serialize_record(&self, record: &Record) -> Result<Value, SerializeError> {
        let mut map = Map::new();
        for field in &self.fields {
            let Some(value) = record.get_raw(&field.name) else {
                continue;
            };
            let serialized = field
                .schema
                .serialize_erased(value)
                .map_err(|err| err.in_field(field.name.as_str()))?;
            if let Some(serialized) = serialized {
                map.insert(field.name.clone(), serialized);
            }
        }
        Ok(Value::Object(map))
    }

    /// An absent field is valid when its schema accepts absence.
    fn check_record(&self, record: &Record) -> bool {
        self.fields
            .iter()
            .all(|field| field.schema.check_erased(record.get_raw(&field.name)))
    }

    fn describe(&self) -> String {
        if self.fields.is_empty() {
            return "{}".to_string();
        }
        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|field| format!("{}: {}", field.name, field.schema.describe_field()))
            .collect();
        format!("{{ {} }}", fields.join(", "))
    }
}

impl Shape<Record> for ObjectShape {
    fn parse(&self, raw: Option<&Value>) -> Outcome<Record> {
        self.parse_record(raw)
    }

    fn serialize(&self, value: &Record) -> Result<Value, SerializeError> {
        self.serialize_record(value)
    }

    fn describe(&self) -> String {
        ObjectShape::describe(self)
    }

    fn check(&self, value: &Record) -> bool {
        self.check_record(value)
    }
}

struct Constructed<T> {
    object: ObjectShape,
    _target: PhantomData<fn() -> T>,
}

impl<T: Construct + Send + Sync> Shape<T> for Constructed<T> {
    fn parse(&self, raw: Option<&Value>) -> Outcome<T> {
        let record = self.object.parse_record(raw)?;
        T::construct(record).map_err(|err| Failure::new(ErrorKind::Invalid, err.to_string()))
    }

    fn serialize(&self, value: &T) -> Result<Value, SerializeError> {
        self.object.serialize_record(&value.deconstruct())
    }

    fn describe(&self) -> String {
        self.object.describe()
    }

    fn check(&self, value: &T) -> bool {
        self.object.check_record(&value.deconstruct())
    }
}
