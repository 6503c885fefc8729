//! The result of parsing: a typed value or a list of located errors.
//!
//! [`Outcome<T>`] is a plain `Result<T, Failure>`, so `?`, `map`, `is_ok`
//! and friends all apply. [`Failure`] aggregates [`ErrorEntry`] values and
//! can remember the raw input that produced it, which is what `catch` and
//! `transform` callbacks use to re-run another schema against the original
//! value.
//!
//! # Examples
//!
//! ```
//! use value_schema_core::{ErrorKind, Failure, Outcome};
//!
//! let failed: Outcome<String> = Err(Failure::missing().prefixed("name"));
//! let failure = failed.unwrap_err();
//! assert_eq!(failure.errors()[0].kind, ErrorKind::MissingValue);
//! assert_eq!(failure.errors()[0].path_string(), "name");
//! ```

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::error::{ErrorEntry, ErrorKind, PathSegment, value_kind};

/// Result of a parse: `Ok` on success, [`Failure`] otherwise.
pub type Outcome<T> = std::result::Result<T, Failure>;

/// Non-empty, ordered collection of validation errors.
#[derive(Debug, Clone, Serialize, Error)]
#[error("{}", summarize(.errors))]
pub struct Failure {
    errors: Vec<ErrorEntry>,
    #[serde(skip)]
    input: Option<Value>,
}

impl Failure {
    /// Creates a failure with a single root-level entry.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::from_errors(vec![ErrorEntry::new(kind, message)])
    }

    /// Creates a failure from already-located entries.
    pub fn from_errors(errors: Vec<ErrorEntry>) -> Self {
        Self {
            errors,
            input: None,
        }
    }

    /// The value is absent or `null`.
    pub fn missing() -> Self {
        Self::new(ErrorKind::MissingValue, "value is required")
    }

    /// `found` is not of the `expected` primitive kind.
    pub fn type_mismatch(expected: &str, found: &Value) -> Self {
        Self::new(
            ErrorKind::TypeMismatch,
            format!("expected {expected}, found {}", value_kind(found)),
        )
    }

    /// The container kind or arity is wrong.
    pub fn shape_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ShapeMismatch, message)
    }

    /// Returns the collected errors in discovery order.
    pub fn errors(&self) -> &[ErrorEntry] {
        &self.errors
    }

    /// Consumes the failure, returning its errors.
    pub fn into_errors(self) -> Vec<ErrorEntry> {
        self.errors
    }

    /// Returns `true` if any entry has the given kind.
    pub fn has_kind(&self, kind: ErrorKind) -> bool {
        self.errors.iter().any(|entry| entry.kind == kind)
    }

    /// Returns `true` if the value was merely absent, not invalid.
    ///
    /// Only root-level [`ErrorKind::MissingValue`] entries qualify: a
    /// missing field *inside* an object is a real error for that object.
    pub fn is_missing(&self) -> bool {
        !self.errors.is_empty()
            && self
                .errors
                .iter()
                .all(|entry| entry.kind == ErrorKind::MissingValue && entry.is_root())
    }

    /// Re-roots every error path under `segment`.
    pub fn prefixed(mut self, segment: impl Into<PathSegment>) -> Self {
        let segment = segment.into();
        for entry in &mut self.errors {
            entry.path.insert(0, segment.clone());
        }
        self
    }

    /// Appends the errors of `other`.
    pub fn merge(&mut self, other: Failure) {
        self.errors.extend(other.errors);
    }

    /// Remembers the raw input this failure was produced from.
    pub fn with_input(mut self, raw: Option<&Value>) -> Self {
        self.input = raw.cloned();
        self
    }

    /// Returns the raw input, when a combinator attached it.
    pub fn input(&self) -> Option<&Value> {
        self.input.as_ref()
    }
}

/// Failures compare by their errors; the remembered input is context.
impl PartialEq for Failure {
    fn eq(&self, other: &Self) -> bool {
        self.errors == other.errors
    }
}

fn summarize(errors: &[ErrorEntry]) -> String {
    errors
        .iter()
        .map(ErrorEntry::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Returns the raw value, or a missing-value failure for absent and `null`.
///
/// Every built-in schema starts with this check, which is what lets
/// `optional()` tell "absent" apart from "present but invalid".
pub fn require_present(raw: Option<&Value>) -> Outcome<&Value> {
    match raw {
        None | Some(Value::Null) => Err(Failure::missing()),
        Some(value) => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_prefixed_reroots_all_errors() {
        let mut failure = Failure::missing();
        failure.merge(Failure::type_mismatch("string", &json!(1)).prefixed(PathSegment::Index(0)));
        let failure = failure.prefixed("tags");

        let paths: Vec<String> = failure.errors().iter().map(|e| e.path_string()).collect();
        assert_eq!(paths, vec!["tags", "tags[0]"]);
    }

    #[test]
    fn test_is_missing_only_for_root_entries() {
        assert!(Failure::missing().is_missing());
        assert!(!Failure::missing().prefixed("name").is_missing());
        assert!(!Failure::type_mismatch("number", &json!("x")).is_missing());
        assert!(!Failure::from_errors(Vec::new()).is_missing());
    }

    #[test]
    fn test_with_input_is_not_part_of_equality() {
        let raw = json!({"a": 1});
        let remembered = Failure::missing().with_input(Some(&raw));
        assert_eq!(remembered.input(), Some(&raw));
        assert_eq!(remembered, Failure::missing());
    }

    #[test]
    fn test_display_joins_entries() {
        let mut failure = Failure::missing().prefixed("name");
        failure.merge(Failure::type_mismatch("number", &json!(true)).prefixed("age"));
        assert_eq!(
            failure.to_string(),
            "name: value is required; age: expected number, found boolean"
        );
    }

    #[test]
    fn test_require_present_rejects_null_and_absent() {
        assert!(require_present(None).unwrap_err().is_missing());
        assert!(require_present(Some(&Value::Null)).unwrap_err().is_missing());
        assert_eq!(require_present(Some(&json!(0))).unwrap(), &json!(0));
    }
}
