//! Generic destination for parsed objects.

use std::any::{Any, type_name};
use std::fmt;

use thiserror::Error;

pub(crate) type Slot = Box<dyn Any + Send + Sync>;

/// Ordered field name → value map with type-erased values.
///
/// An object schema without a construction hook parses into a `Record`:
/// each successfully parsed field is stored under its declared name with
/// the type its field schema produces, so an `optional()` field is stored
/// as an `Option`. Read values back with the type you declared.
///
/// # Examples
///
/// ```
/// use value_schema_core::Record;
///
/// let mut record = Record::new()
///     .with("name", "Ada".to_string())
///     .with("age", 36.0_f64);
///
/// assert_eq!(record.get::<String>("name").map(String::as_str), Some("Ada"));
/// assert_eq!(record.get::<String>("age"), None);
/// assert_eq!(record.take::<f64>("age").unwrap(), 36.0);
/// assert_eq!(record.names().collect::<Vec<_>>(), vec!["name"]);
/// ```
#[derive(Default)]
pub struct Record {
    fields: Vec<(String, Slot)>,
}

/// Errors reading typed values out of a [`Record`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// The record has no field with this name.
    #[error("record has no field '{0}'")]
    MissingField(String),

    /// The field holds a value of another type.
    #[error("field '{field}' does not hold a value of type {expected}")]
    WrongType {
        /// Field name.
        field: String,
        /// Requested type.
        expected: &'static str,
    },
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `name`, replacing any previous value.
    pub fn insert<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) {
        self.insert_boxed(name.into(), Box::new(value));
    }

    /// Builder form of [`insert`](Record::insert).
    pub fn with<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
        self.insert(name, value);
        self
    }

    pub(crate) fn insert_boxed(&mut self, name: String, value: Slot) {
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Returns the value under `name` if it exists and has type `T`.
    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.get_raw(name).and_then(|value| value.downcast_ref::<T>())
    }

    pub(crate) fn get_raw(&self, name: &str) -> Option<&(dyn Any + Send + Sync)> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_ref())
    }

    /// Removes and returns the value under `name`.
    ///
    /// A value of another type is left in place.
    pub fn take<T: Any>(&mut self, name: &str) -> Result<T, RecordError> {
        let position = self
            .fields
            .iter()
            .position(|(existing, _)| existing == name)
            .ok_or_else(|| RecordError::MissingField(name.to_string()))?;

        if !self.fields[position].1.is::<T>() {
            return Err(RecordError::WrongType {
                field: name.to_string(),
                expected: type_name::<T>(),
            });
        }

        let (_, value) = self.fields.remove(position);
        value
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| RecordError::WrongType {
                field: name.to_string(),
                expected: type_name::<T>(),
            })
    }

    /// Returns `true` if a field named `name` is stored.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|(existing, _)| existing == name)
    }

    /// Number of stored fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if no field is stored.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("fields", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_in_place() {
        let mut record = Record::new().with("a", 1_i64).with("b", true);
        record.insert("a", "one".to_string());

        assert_eq!(record.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(record.get::<String>("a").map(String::as_str), Some("one"));
        assert_eq!(record.get::<i64>("a"), None);
    }

    #[test]
    fn test_take_reports_missing_and_wrong_type() {
        let mut record = Record::new().with("flag", false);

        assert_eq!(
            record.take::<bool>("other"),
            Err(RecordError::MissingField("other".to_string()))
        );
        assert!(matches!(
            record.take::<String>("flag"),
            Err(RecordError::WrongType { .. })
        ));
        assert!(record.contains("flag"));
        assert_eq!(record.take::<bool>("flag"), Ok(false));
        assert!(record.is_empty());
    }

    #[test]
    fn test_debug_lists_field_names() {
        let record = Record::new().with("x", 1_u8);
        assert_eq!(format!("{record:?}"), r#"Record { fields: ["x"] }"#);
    }
}
