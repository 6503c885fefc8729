//! Declarative schema descriptors and their compilation into dynamic
//! schemas.
//!
//! A [`SchemaDescriptor`] is the serializable form of a schema, tagged by
//! `type`. Compiling one yields a `Schema<Value>` that parses raw values
//! into normalized JSON values and serializes them back.
//!
//! # Example YAML
//!
//! ```yaml
//! type: object
//! deny_unknown_fields: true
//! fields:
//!   - name: id
//!     type: integer
//!     coerce: true
//!   - name: email
//!     type: string
//!     pattern: "^[^@]+@[^@]+$"
//!   - name: tags
//!     type: default
//!     value: []
//!     inner:
//!       type: array
//!       items: { type: string }
//! ```

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use value_schema_core::{
    Failure, Outcome, Record, Schema, SerializeError, Shape, array, boolean, datetime, distinct,
    indexed, integer, json_number, number, object, require_present, string, value_kind,
};

use crate::error::{RegistryError, Result};

/// Serializable description of a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchemaDescriptor {
    /// Text, optionally constrained by a regular expression.
    String {
        /// Accept numbers, booleans, and containers as text.
        #[serde(default, skip_serializing_if = "is_false")]
        coerce: bool,
        /// Pattern the text must match.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
    },
    /// Floating-point number.
    Number {
        /// Accept numeric strings.
        #[serde(default, skip_serializing_if = "is_false")]
        coerce: bool,
    },
    /// Integral number.
    Integer {
        /// Accept numeric strings.
        #[serde(default, skip_serializing_if = "is_false")]
        coerce: bool,
    },
    /// `true` or `false`.
    Boolean {
        /// Decide by truthiness.
        #[serde(default, skip_serializing_if = "is_false")]
        coerce: bool,
    },
    /// Timestamp from epoch milliseconds or RFC 3339 text, normalized to
    /// RFC 3339 text.
    Datetime,
    /// Sequence of `items`.
    Array {
        /// Element schema.
        items: Box<SchemaDescriptor>,
    },
    /// Sequence of `items` with duplicates removed.
    Set {
        /// Element schema.
        items: Box<SchemaDescriptor>,
    },
    /// Fixed-length sequence, one schema per position.
    Tuple {
        /// Position schemas.
        items: Vec<SchemaDescriptor>,
    },
    /// Object with declared fields.
    Object {
        /// Fields in declaration order.
        fields: Vec<FieldDescriptor>,
        /// Reject keys that are not declared.
        #[serde(default, skip_serializing_if = "is_false")]
        deny_unknown_fields: bool,
    },
    /// Object used as a dictionary.
    Indexed {
        /// Schema for every value.
        values: Box<SchemaDescriptor>,
    },
    /// Absent or `null` parses to `null`.
    Optional {
        /// Wrapped schema.
        inner: Box<SchemaDescriptor>,
    },
    /// Explicit `null` parses to `null`; absence still fails.
    Nullable {
        /// Wrapped schema.
        inner: Box<SchemaDescriptor>,
    },
    /// `value` replaces any failure of `inner`.
    Default {
        /// Wrapped schema.
        inner: Box<SchemaDescriptor>,
        /// Substitute, which must itself be valid for `inner`.
        value: Value,
    },
    /// First alternative that accepts the value, tried left to right.
    Union {
        /// Alternatives in priority order.
        any_of: Vec<SchemaDescriptor>,
    },
    /// Another named schema of the same catalog.
    Ref {
        /// Name of the referenced schema.
        schema: String,
    },
}

/// A named field of an object descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name.
    pub name: String,
    /// Field schema, written inline next to `name`.
    #[serde(flatten)]
    pub schema: SchemaDescriptor,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Compiles descriptors, resolving references against named descriptors.
pub(crate) struct Compiler<'a> {
    named: &'a BTreeMap<String, SchemaDescriptor>,
    compiled: HashMap<String, Schema<Value>>,
    in_progress: Vec<String>,
}

impl<'a> Compiler<'a> {
    pub(crate) fn new(named: &'a BTreeMap<String, SchemaDescriptor>) -> Self {
        Self {
            named,
            compiled: HashMap::new(),
            in_progress: Vec::new(),
        }
    }

    /// Compiles the named schema, reusing earlier results.
    pub(crate) fn compile_named(&mut self, name: &str) -> Result<Schema<Value>> {
        if let Some(schema) = self.compiled.get(name) {
            return Ok(schema.clone());
        }
        if self.in_progress.iter().any(|pending| pending == name) {
            let mut chain = self.in_progress.clone();
            chain.push(name.to_string());
            return Err(RegistryError::ReferenceCycle(chain.join(" -> ")));
        }
        let named = self.named;
        let descriptor = named
            .get(name)
            .ok_or_else(|| RegistryError::UnknownSchema(name.to_string()))?;

        self.in_progress.push(name.to_string());
        let compiled = self.compile(descriptor, name);
        self.in_progress.pop();

        let schema = compiled?;
        self.compiled.insert(name.to_string(), schema.clone());
        Ok(schema)
    }

    pub(crate) fn compile(
        &mut self,
        descriptor: &SchemaDescriptor,
        path: &str,
    ) -> Result<Schema<Value>> {
        let schema = match descriptor {
            SchemaDescriptor::String { coerce, pattern } => {
                let mut text = coerced(string(), *coerce);
                if let Some(pattern) = pattern {
                    let regex = Regex::new(pattern)
                        .map_err(|e| RegistryError::invalid(path, e.to_string()))?;
                    text = text.matches(regex);
                }
                text.map(Value::String, |value| value.as_str().map(str::to_string))
            }
            SchemaDescriptor::Number { coerce } => coerced(number(), *coerce).try_map(
                |n| json_number(n).ok_or_else(|| format!("{n} is not a finite number")),
                Value::as_f64,
            ),
            SchemaDescriptor::Integer { coerce } => {
                coerced(integer(), *coerce).map(Value::from, Value::as_i64)
            }
            SchemaDescriptor::Boolean { coerce } => {
                coerced(boolean(), *coerce).map(Value::Bool, Value::as_bool)
            }
            SchemaDescriptor::Datetime => datetime().map(
                |timestamp| Value::String(timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
                |value| {
                    value
                        .as_str()
                        .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
                        .map(|parsed| parsed.with_timezone(&Utc))
                },
            ),
            SchemaDescriptor::Array { items } => {
                let items = self.compile(items, &format!("{path}.items"))?;
                array(items).map(Value::Array, |value| value.as_array().cloned())
            }
            SchemaDescriptor::Set { items } => {
                let items = self.compile(items, &format!("{path}.items"))?;
                distinct(items).map(Value::Array, |value| value.as_array().cloned())
            }
            SchemaDescriptor::Tuple { items } => {
                if items.is_empty() {
                    return Err(RegistryError::invalid(path, "tuple needs at least one item"));
                }
                let items = items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| self.compile(item, &format!("{path}.items[{index}]")))
                    .collect::<Result<Vec<_>>>()?;
                Schema::new(DynamicTuple { items })
            }
            SchemaDescriptor::Object {
                fields,
                deny_unknown_fields,
            } => self.compile_object(fields, *deny_unknown_fields, path)?,
            SchemaDescriptor::Indexed { values } => {
                let values = self.compile(values, &format!("{path}.values"))?;
                indexed(values).map(
                    |entries| Value::Object(entries.into_iter().collect()),
                    |value| {
                        value.as_object().map(|map| {
                            map.iter()
                                .map(|(key, item)| (key.clone(), item.clone()))
                                .collect()
                        })
                    },
                )
            }
            SchemaDescriptor::Optional { inner } => {
                let inner = self.compile(inner, &format!("{path}.inner"))?;
                inner.optional().map(unwrap_or_null, null_to_none)
            }
            SchemaDescriptor::Nullable { inner } => {
                let inner = self.compile(inner, &format!("{path}.inner"))?;
                inner.nullable().map(unwrap_or_null, null_to_none)
            }
            SchemaDescriptor::Default { inner, value } => {
                let inner = self.compile(inner, &format!("{path}.inner"))?;
                let value = inner.parse(value).map_err(|failure| {
                    RegistryError::invalid(path, format!("default value is invalid: {failure}"))
                })?;
                inner.default(value)
            }
            SchemaDescriptor::Union { any_of } => {
                let mut alternatives = any_of.iter().enumerate().map(|(index, alternative)| {
                    self.compile(alternative, &format!("{path}.any_of[{index}]"))
                });
                let first = alternatives
                    .next()
                    .ok_or_else(|| RegistryError::invalid(path, "union needs at least one alternative"))??;
                let mut union = first;
                for alternative in alternatives {
                    union = union.or(alternative?);
                }
                union
            }
            SchemaDescriptor::Ref { schema } => self.compile_named(schema)?,
        };
        Ok(schema)
    }

    fn compile_object(
        &mut self,
        fields: &[FieldDescriptor],
        deny_unknown_fields: bool,
        path: &str,
    ) -> Result<Schema<Value>> {
        let mut builder = object();
        for field in fields {
            let schema = self.compile(&field.schema, &format!("{path}.{}", field.name))?;
            builder = builder.field(field.name.as_str(), schema);
        }
        if deny_unknown_fields {
            builder = builder.deny_unknown_fields();
        }

        let record = builder
            .build()
            .map_err(|err| RegistryError::invalid(path, err.to_string()))?;
        Ok(record.map(record_to_value, value_to_record))
    }
}

fn coerced<T: Send + Sync + 'static>(schema: Schema<T>, coerce: bool) -> Schema<T> {
    if coerce { schema.coerce() } else { schema }
}

fn unwrap_or_null(value: Option<Value>) -> Value {
    value.unwrap_or(Value::Null)
}

fn null_to_none(value: &Value) -> Option<Option<Value>> {
    Some((!value.is_null()).then(|| value.clone()))
}

fn record_to_value(mut record: Record) -> Value {
    let names: Vec<String> = record.names().map(str::to_string).collect();
    let mut map = Map::new();
    for name in names {
        if let Ok(value) = record.take::<Value>(&name) {
            map.insert(name, value);
        }
    }
    Value::Object(map)
}

fn value_to_record(value: &Value) -> Option<Record> {
    let map = value.as_object()?;
    Some(
        map.iter()
            .fold(Record::new(), |record, (key, item)| record.with(key.as_str(), item.clone())),
    )
}

/// Tuple with an arity chosen at run time.
struct DynamicTuple {
    items: Vec<Schema<Value>>,
}

impl Shape<Value> for DynamicTuple {
    fn parse(&self, raw: Option<&Value>) -> Outcome<Value> {
        let value = require_present(raw)?;
        let Value::Array(items) = value else {
            return Err(Failure::shape_mismatch(format!(
                "expected array of length {}, found {}",
                self.items.len(),
                value_kind(value)
            )));
        };
        if items.len() != self.items.len() {
            return Err(Failure::shape_mismatch(format!(
                "expected array of length {}, found length {}",
                self.items.len(),
                items.len()
            )));
        }

        let mut parsed = Vec::with_capacity(items.len());
        let mut errors = Vec::new();
        for (index, (schema, item)) in self.items.iter().zip(items).enumerate() {
            match schema.parse(item) {
                Ok(value) => parsed.push(value),
                Err(failure) => errors.extend(failure.prefixed(index).into_errors()),
            }
        }
        if errors.is_empty() {
            Ok(Value::Array(parsed))
        } else {
            Err(Failure::from_errors(errors))
        }
    }

    fn serialize(&self, value: &Value) -> std::result::Result<Value, SerializeError> {
        let items = match value.as_array() {
            Some(items) if items.len() == self.items.len() => items,
            _ => return Err(SerializeError::mismatch(self.describe())),
        };
        self.items
            .iter()
            .zip(items)
            .enumerate()
            .map(|(index, (schema, item))| schema.serialize(item).map_err(|err| err.in_index(index)))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Value::Array)
    }

    fn describe(&self) -> String {
        let items: Vec<String> = self.items.iter().map(Schema::describe).collect();
        format!("[{}]", items.join(", "))
    }

    fn check(&self, value: &Value) -> bool {
        value.as_array().is_some_and(|items| {
            items.len() == self.items.len()
                && self
                    .items
                    .iter()
                    .zip(items)
                    .all(|(schema, item)| schema.validate(item))
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use value_schema_core::ErrorKind;

    use super::*;

    fn compile(yaml: &str) -> Result<Schema<Value>> {
        let descriptor: SchemaDescriptor = serde_yaml::from_str(yaml).unwrap();
        let named = BTreeMap::new();
        Compiler::new(&named).compile(&descriptor, "test")
    }

    #[test]
    fn test_leaf_descriptors() {
        let schema = compile("type: integer\ncoerce: true").unwrap();
        assert_eq!(schema.parse(&json!("0x10")), Ok(json!(16)));

        let schema = compile("type: number").unwrap();
        assert_eq!(schema.parse(&json!(2.5)), Ok(json!(2.5)));
        assert!(schema.parse(&json!("2.5")).is_err());

        let schema = compile("type: boolean\ncoerce: true").unwrap();
        assert_eq!(schema.parse(&json!("")), Ok(json!(false)));

        let schema = compile("type: string\npattern: '^[a-z]+$'").unwrap();
        assert_eq!(schema.parse(&json!("abc")), Ok(json!("abc")));
        assert_eq!(
            schema.parse(&json!("ABC")).unwrap_err().errors()[0].kind,
            ErrorKind::Invalid
        );
    }

    #[test]
    fn test_datetime_normalizes_to_rfc3339() {
        let schema = compile("type: datetime").unwrap();
        let parsed = schema.parse(&json!(1500)).unwrap();
        assert_eq!(parsed, json!("1970-01-01T00:00:01.500Z"));
        assert_eq!(schema.serialize(&parsed), Ok(json!(1500)));
    }

    #[test]
    fn test_object_descriptor_with_optional_field() {
        let schema = compile(
            r#"
type: object
fields:
  - name: id
    type: integer
  - name: nickname
    type: optional
    inner: { type: string }
"#,
        )
        .unwrap();

        assert_eq!(
            schema.parse(&json!({"id": 1, "nickname": "x", "extra": 0})),
            Ok(json!({"id": 1, "nickname": "x"}))
        );
        let parsed = schema.parse(&json!({"id": 2})).unwrap();
        assert_eq!(parsed, json!({"id": 2, "nickname": null}));
        assert_eq!(schema.serialize(&parsed), Ok(json!({"id": 2})));

        let failure = schema.parse(&json!({"nickname": 5})).unwrap_err();
        let paths: Vec<String> = failure.errors().iter().map(|e| e.path_string()).collect();
        assert_eq!(paths, vec!["id", "nickname"]);
    }

    #[test]
    fn test_set_descriptor_removes_duplicates() {
        let schema = compile("type: set\nitems: { type: string }").unwrap();
        assert_eq!(schema.parse(&json!(["a", "b", "a"])), Ok(json!(["a", "b"])));
        assert!(!schema.validate(&json!(["a", "a"])));
    }

    #[test]
    fn test_validate_ignores_descriptor_defaults() {
        let schema = compile(
            r#"
type: object
fields:
  - name: code
    type: default
    value: "aaa"
    inner: { type: string, pattern: "^[a-z]{3}$" }
  - name: pair
    type: tuple
    items:
      - type: default
        value: 0
        inner: { type: integer }
      - { type: string, pattern: "^x" }
"#,
        )
        .unwrap();

        assert!(schema.validate(&json!({"code": "abc", "pair": [1, "xy"]})));
        assert!(!schema.validate(&json!({"code": "ABC", "pair": [1, "xy"]})));
        assert!(!schema.validate(&json!({"code": "abc", "pair": [1, "y"]})));
        assert!(!schema.validate(&json!({"code": "abc", "pair": [1]})));
    }

    #[test]
    fn test_tuple_descriptor() {
        let schema = compile("type: tuple\nitems: [{ type: string }, { type: number }]").unwrap();
        assert_eq!(schema.parse(&json!(["a", 1])), Ok(json!(["a", 1])));
        let failure = schema.parse(&json!(["a"])).unwrap_err();
        assert_eq!(failure.errors()[0].kind, ErrorKind::ShapeMismatch);
        assert!(schema.serialize(&json!("a")).unwrap_err().is_mismatch());
        assert_eq!(schema.describe(), "[string, number]");
    }

    #[test]
    fn test_union_descriptor_tries_in_order() {
        let schema = compile(
            "type: union\nany_of: [{ type: integer }, { type: string, coerce: true }]",
        )
        .unwrap();
        assert_eq!(schema.parse(&json!(3)), Ok(json!(3)));
        assert_eq!(schema.parse(&json!(true)), Ok(json!("true")));
    }

    #[test]
    fn test_default_value_is_validated() {
        let schema = compile("type: default\nvalue: 1\ninner: { type: integer }").unwrap();
        assert_eq!(schema.parse(&json!("x")), Ok(json!(1)));

        let err = compile("type: default\nvalue: x\ninner: { type: integer }").unwrap_err();
        assert!(matches!(err, RegistryError::InvalidDescriptor { .. }));
    }

    #[test]
    fn test_invalid_descriptors() {
        for yaml in [
            "type: union\nany_of: []",
            "type: tuple\nitems: []",
            "type: string\npattern: '('",
            "type: object\nfields: [{ name: a, type: string }, { name: a, type: number }]",
        ] {
            let err = compile(yaml).unwrap_err();
            assert!(
                matches!(err, RegistryError::InvalidDescriptor { .. }),
                "{yaml}: {err}"
            );
        }
    }

    #[test]
    fn test_descriptor_yaml_round_trip() {
        let descriptor = SchemaDescriptor::Object {
            fields: vec![FieldDescriptor {
                name: "id".into(),
                schema: SchemaDescriptor::Integer { coerce: true },
            }],
            deny_unknown_fields: false,
        };
        let yaml = serde_yaml::to_string(&descriptor).unwrap();
        assert!(!yaml.contains("deny_unknown_fields"));
        let back: SchemaDescriptor = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, descriptor);
    }
}
