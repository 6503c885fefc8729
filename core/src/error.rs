//! Error types for parsing, serialization, and schema construction.
//!
//! Data errors found while parsing are collected as [`ErrorEntry`] values
//! inside a [`Failure`](crate::Failure) so composite schemas can keep
//! validating siblings and report every violation in one pass. Programmer
//! mistakes (a malformed object schema) and serialization problems are
//! reported through the [`SchemaError`] and [`SerializeError`] enums.
//!
//! # Examples
//!
//! ```
//! use value_schema_core::{ErrorEntry, ErrorKind, PathSegment};
//!
//! let entry = ErrorEntry::new(ErrorKind::TypeMismatch, "expected string, found number")
//!     .with_prefix(PathSegment::Index(1))
//!     .with_prefix("tags");
//! assert_eq!(entry.path_string(), "tags[1]");
//! assert_eq!(entry.to_string(), "tags[1]: expected string, found number");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// One step of an error path.
///
/// Serializes untagged, so a path renders as a plain JSON array of strings
/// and integers (e.g. `["users", 3, "email"]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Object field name or map key.
    Key(String),
    /// Sequence position.
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, "{key}"),
            PathSegment::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Category of a data-validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The value has the wrong primitive kind.
    TypeMismatch,
    /// Wrong container kind or wrong arity (tuple length, pair shape).
    ShapeMismatch,
    /// Absent or `null` where a value is required.
    MissingValue,
    /// Best-effort conversion was attempted and exhausted.
    CoercionFailure,
    /// Every branch of a union rejected the value.
    UnionExhausted,
    /// A refinement or mapping rejected an otherwise well-typed value.
    Invalid,
}

impl ErrorKind {
    /// Returns the stable snake_case code for this kind.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::TypeMismatch => "type_mismatch",
            ErrorKind::ShapeMismatch => "shape_mismatch",
            ErrorKind::MissingValue => "missing_value",
            ErrorKind::CoercionFailure => "coercion_failure",
            ErrorKind::UnionExhausted => "union_exhausted",
            ErrorKind::Invalid => "invalid",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A single located validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    /// Location of the offending value, empty at the root.
    pub path: Vec<PathSegment>,
    /// What went wrong.
    pub kind: ErrorKind,
    /// Human-readable description.
    pub message: String,
}

impl ErrorEntry {
    /// Creates a root-level entry.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            path: Vec::new(),
            kind,
            message: message.into(),
        }
    }

    /// Prepends `segment` to the path.
    pub fn with_prefix(mut self, segment: impl Into<PathSegment>) -> Self {
        self.path.insert(0, segment.into());
        self
    }

    /// Returns `true` if the entry refers to the value itself.
    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Renders the path as `field.nested[3]`, or `$` at the root.
    pub fn path_string(&self) -> String {
        format_path(&self.path)
    }
}

impl fmt::Display for ErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path_string(), self.message)
    }
}

/// Renders a path as `field.nested[3]`, or `$` for the empty path.
pub fn format_path(path: &[PathSegment]) -> String {
    if path.is_empty() {
        return "$".to_string();
    }

    let mut rendered = String::new();
    for segment in path {
        match segment {
            PathSegment::Key(key) => {
                if !rendered.is_empty() {
                    rendered.push('.');
                }
                rendered.push_str(key);
            }
            PathSegment::Index(index) => {
                rendered.push_str(&format!("[{index}]"));
            }
        }
    }
    rendered
}

/// Returns the JSON kind name of `value` for error messages.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Errors raised while turning a typed value back into raw data.
///
/// [`is_mismatch`](SerializeError::is_mismatch) separates "this value is not
/// of the shape this schema serializes" (a union moves on to its next
/// branch) from data that cannot be serialized at all.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SerializeError {
    /// The value is not one this schema knows how to serialize.
    #[error("value does not match {expected}")]
    Mismatch {
        /// Description of the schema that rejected the value.
        expected: String,
    },
    /// Non-finite numbers have no JSON representation.
    #[error("number {0} cannot be represented as JSON")]
    NonFinite(f64),
    /// Failure inside an object field.
    #[error("field {field}: {source}")]
    Field {
        /// Field name or map key.
        field: String,
        /// Underlying failure.
        source: Box<SerializeError>,
    },
    /// Failure inside the value stored under a map key.
    #[error("key {key:?}: {source}")]
    Key {
        /// Map key.
        key: String,
        /// Underlying failure.
        source: Box<SerializeError>,
    },
    /// Failure inside a sequence element.
    #[error("index {index}: {source}")]
    Index {
        /// Element position.
        index: usize,
        /// Underlying failure.
        source: Box<SerializeError>,
    },
    /// No branch of a union accepted the value.
    #[error("no alternative of {expected} accepts the value")]
    NoMatchingBranch {
        /// Description of the union.
        expected: String,
    },
}

impl SerializeError {
    /// Creates a [`Mismatch`](SerializeError::Mismatch) error.
    pub fn mismatch(expected: impl Into<String>) -> Self {
        SerializeError::Mismatch {
            expected: expected.into(),
        }
    }

    /// Returns `true` if the value simply has another shape, at any depth.
    pub fn is_mismatch(&self) -> bool {
        match self {
            SerializeError::Mismatch { .. } | SerializeError::NoMatchingBranch { .. } => true,
            SerializeError::Field { source, .. }
            | SerializeError::Key { source, .. }
            | SerializeError::Index { source, .. } => source.is_mismatch(),
            SerializeError::NonFinite(_) => false,
        }
    }

    /// Wraps the error as occurring under field `field`.
    pub fn in_field(self, field: impl Into<String>) -> Self {
        SerializeError::Field {
            field: field.into(),
            source: Box::new(self),
        }
    }

    /// Wraps the error as occurring under map key `key`.
    pub fn in_key(self, key: impl Into<String>) -> Self {
        SerializeError::Key {
            key: key.into(),
            source: Box::new(self),
        }
    }

    /// Wraps the error as occurring at sequence position `index`.
    pub fn in_index(self, index: usize) -> Self {
        SerializeError::Index {
            index,
            source: Box::new(self),
        }
    }
}

/// Errors in how a schema was put together.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Two fields of one object schema share a name.
    #[error("duplicate field in object schema: {0}")]
    DuplicateField(String),
    /// An object field was declared with an empty name.
    #[error("object field name cannot be empty")]
    EmptyFieldName,
}
