//! Homogeneous collections: arrays, sets, string-keyed maps, and maps with
//! structured keys.
//!
//! Two set flavours exist: [`set_of`] keeps elements ordered in a
//! `BTreeSet` and needs `T: Ord`; [`distinct`] keeps first-seen order in a
//! `Vec` and only needs `PartialEq`, so it also works for `f64`.
//!
//! Every element is checked even after a failure; element errors are
//! prefixed with the index (or key) they were found at.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use crate::error::{ErrorEntry, ErrorKind, PathSegment, SerializeError, value_kind};
use crate::outcome::{Failure, Outcome, require_present};
use crate::schema::{Schema, Shape};

fn require_array(raw: Option<&Value>) -> Outcome<&Vec<Value>> {
    match require_present(raw)? {
        Value::Array(items) => Ok(items),
        other => Err(Failure::shape_mismatch(format!(
            "expected array, found {}",
            value_kind(other)
        ))),
    }
}

fn collect_outcome<T>(values: Vec<T>, errors: Vec<ErrorEntry>) -> Outcome<Vec<T>> {
    if errors.is_empty() {
        Ok(values)
    } else {
        Err(Failure::from_errors(errors))
    }
}

fn parse_elements<T: Send + Sync + 'static>(
    element: &Schema<T>,
    items: &[Value],
) -> Outcome<Vec<T>> {
    let mut values = Vec::with_capacity(items.len());
    let mut errors = Vec::new();
    for (index, item) in items.iter().enumerate() {
        match element.parse(item) {
            Ok(value) => values.push(value),
            Err(failure) => errors.extend(failure.prefixed(index).into_errors()),
        }
    }
    collect_outcome(values, errors)
}

fn serialize_elements<'a, T: Send + Sync + 'static>(
    element: &Schema<T>,
    values: impl Iterator<Item = &'a T>,
) -> Result<Value, SerializeError> {
    values
        .enumerate()
        .map(|(index, value)| element.serialize(value).map_err(|err| err.in_index(index)))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

struct ArrayShape<T> {
    element: Schema<T>,
}

impl<T: Send + Sync + 'static> Shape<Vec<T>> for ArrayShape<T> {
    fn parse(&self, raw: Option<&Value>) -> Outcome<Vec<T>> {
        parse_elements(&self.element, require_array(raw)?)
    }

    fn serialize(&self, value: &Vec<T>) -> Result<Value, SerializeError> {
        serialize_elements(&self.element, value.iter())
    }

    fn describe(&self) -> String {
        format!("array<{}>", self.element.describe())
    }

    fn check(&self, value: &Vec<T>) -> bool {
        value.iter().all(|item| self.element.validate(item))
    }
}

/// Sequence of values sharing one schema.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use value_schema_core::*;
///
/// let schema = array(number());
/// assert_eq!(schema.parse(&json!([1, 2.5])).unwrap(), vec![1.0, 2.5]);
///
/// let failure = schema.parse(&json!([1, "x", 3])).unwrap_err();
/// assert_eq!(failure.errors().len(), 1);
/// assert_eq!(failure.errors()[0].path_string(), "[1]");
/// ```
pub fn array<T: Send + Sync + 'static>(element: Schema<T>) -> Schema<Vec<T>> {
    Schema::new(ArrayShape { element })
}

struct SetShape<T> {
    element: Schema<T>,
}

impl<T: Ord + Send + Sync + 'static> Shape<BTreeSet<T>> for SetShape<T> {
    fn parse(&self, raw: Option<&Value>) -> Outcome<BTreeSet<T>> {
        parse_elements(&self.element, require_array(raw)?).map(|values| values.into_iter().collect())
    }

    fn serialize(&self, value: &BTreeSet<T>) -> Result<Value, SerializeError> {
        serialize_elements(&self.element, value.iter())
    }

    fn describe(&self) -> String {
        format!("set<{}>", self.element.describe())
    }

    fn check(&self, value: &BTreeSet<T>) -> bool {
        value.iter().all(|item| self.element.validate(item))
    }
}

/// Set of values read from an array; duplicates collapse and serialization
/// emits the elements in order.
pub fn set_of<T: Ord + Send + Sync + 'static>(element: Schema<T>) -> Schema<BTreeSet<T>> {
    Schema::new(SetShape { element })
}

struct DistinctShape<T> {
    element: Schema<T>,
}

fn is_distinct<T: PartialEq>(values: &[T]) -> bool {
    values
        .iter()
        .enumerate()
        .all(|(index, value)| !values[..index].contains(value))
}

impl<T: PartialEq + Send + Sync + 'static> Shape<Vec<T>> for DistinctShape<T> {
    fn parse(&self, raw: Option<&Value>) -> Outcome<Vec<T>> {
        let values = parse_elements(&self.element, require_array(raw)?)?;
        let mut unique: Vec<T> = Vec::with_capacity(values.len());
        for value in values {
            if !unique.contains(&value) {
                unique.push(value);
            }
        }
        Ok(unique)
    }

    fn serialize(&self, value: &Vec<T>) -> Result<Value, SerializeError> {
        serialize_elements(&self.element, value.iter())
    }

    fn describe(&self) -> String {
        format!("set<{}>", self.element.describe())
    }

    fn check(&self, value: &Vec<T>) -> bool {
        is_distinct(value) && value.iter().all(|item| self.element.validate(item))
    }
}

/// Set of values read from an array, kept in first-seen order.
///
/// Duplicates are found with `PartialEq`, so element types without a total
/// order such as `f64` work. A vector holding duplicates fails
/// [`Schema::validate`].
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use value_schema_core::*;
///
/// let schema = distinct(number());
/// assert_eq!(schema.parse(&json!([2.5, 1, 2.5])).unwrap(), vec![2.5, 1.0]);
/// assert!(!schema.validate(&vec![1.0, 1.0]));
/// ```
pub fn distinct<T: PartialEq + Send + Sync + 'static>(element: Schema<T>) -> Schema<Vec<T>> {
    Schema::new(DistinctShape { element })
}

struct IndexedShape<T> {
    value: Schema<T>,
}

impl<T: Send + Sync + 'static> Shape<BTreeMap<String, T>> for IndexedShape<T> {
    fn parse(&self, raw: Option<&Value>) -> Outcome<BTreeMap<String, T>> {
        let value = require_present(raw)?;
        let Value::Object(map) = value else {
            return Err(Failure::shape_mismatch(format!(
                "expected object, found {}",
                value_kind(value)
            )));
        };

        let mut parsed = BTreeMap::new();
        let mut errors = Vec::new();
        for (key, item) in map {
            match self.value.parse(item) {
                Ok(item) => {
                    parsed.insert(key.clone(), item);
                }
                Err(failure) => errors.extend(failure.prefixed(key.as_str()).into_errors()),
            }
        }

        if errors.is_empty() {
            Ok(parsed)
        } else {
            Err(Failure::from_errors(errors))
        }
    }

    fn serialize(&self, value: &BTreeMap<String, T>) -> Result<Value, SerializeError> {
        let mut map = Map::new();
        for (key, item) in value {
            let serialized = self
                .value
                .serialize(item)
                .map_err(|err| err.in_key(key.as_str()))?;
            map.insert(key.clone(), serialized);
        }
        Ok(Value::Object(map))
    }

    fn describe(&self) -> String {
        format!("indexed<{}>", self.value.describe())
    }

    fn check(&self, value: &BTreeMap<String, T>) -> bool {
        value.values().all(|item| self.value.validate(item))
    }
}

/// Object used as a dictionary: any string key, one schema for the values.
pub fn indexed<T: Send + Sync + 'static>(value: Schema<T>) -> Schema<BTreeMap<String, T>> {
    Schema::new(IndexedShape { value })
}

struct PairMapShape<K, V> {
    key: Schema<K>,
    value: Schema<V>,
}

impl<K, V> PairMapShape<K, V>
where
    K: Ord + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn parse_pair(&self, index: usize, item: &Value) -> Result<(K, V), Vec<ErrorEntry>> {
        let pair = match item {
            Value::Array(pair) if pair.len() == 2 => pair,
            other => {
                return Err(Failure::shape_mismatch(format!(
                    "expected [key, value] pair, found {}",
                    describe_pair_candidate(other)
                ))
                .prefixed(index)
                .into_errors());
            }
        };

        let key = self.key.parse(&pair[0]);
        let value = self.value.parse(&pair[1]);
        match (key, value) {
            (Ok(key), Ok(value)) => Ok((key, value)),
            (key, value) => {
                let mut errors = Vec::new();
                if let Err(failure) = key {
                    errors.extend(failure.prefixed(0_usize).prefixed(index).into_errors());
                }
                if let Err(failure) = value {
                    errors.extend(failure.prefixed(1_usize).prefixed(index).into_errors());
                }
                Err(errors)
            }
        }
    }
}

fn describe_pair_candidate(value: &Value) -> String {
    match value {
        Value::Array(items) => format!("array of length {}", items.len()),
        other => value_kind(other).to_string(),
    }
}

impl<K, V> Shape<BTreeMap<K, V>> for PairMapShape<K, V>
where
    K: Ord + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn parse(&self, raw: Option<&Value>) -> Outcome<BTreeMap<K, V>> {
        let items = require_array(raw)?;
        let mut parsed = BTreeMap::new();
        let mut errors = Vec::new();
        for (index, item) in items.iter().enumerate() {
            match self.parse_pair(index, item) {
                Ok((key, value)) => {
                    if parsed.contains_key(&key) {
                        errors.push(
                            ErrorEntry::new(ErrorKind::ShapeMismatch, "duplicate key in map")
                            .with_prefix(PathSegment::Index(0))
                            .with_prefix(PathSegment::Index(index)),
                        );
                    } else {
                        parsed.insert(key, value);
                    }
                }
                Err(pair_errors) => errors.extend(pair_errors),
            }
        }

        if errors.is_empty() {
            Ok(parsed)
        } else {
            Err(Failure::from_errors(errors))
        }
    }

    fn serialize(&self, value: &BTreeMap<K, V>) -> Result<Value, SerializeError> {
        let mut pairs = Vec::with_capacity(value.len());
        for (index, (key, item)) in value.iter().enumerate() {
            let key = self
                .key
                .serialize(key)
                .map_err(|err| err.in_index(0).in_index(index))?;
            let item = self
                .value
                .serialize(item)
                .map_err(|err| err.in_index(1).in_index(index))?;
            pairs.push(Value::Array(vec![key, item]));
        }
        Ok(Value::Array(pairs))
    }

    fn describe(&self) -> String {
        format!("map<{}, {}>", self.key.describe(), self.value.describe())
    }

    fn check(&self, value: &BTreeMap<K, V>) -> bool {
        value
            .iter()
            .all(|(key, item)| self.key.validate(key) && self.value.validate(item))
    }
}

/// Map with structured keys, written as an array of `[key, value]` pairs.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use value_schema_core::*;
///
/// let schema = map_of(tuple((integer(), integer())), string());
/// let raw = json!([[[0, 0], "origin"], [[1, 2], "p"]]);
///
/// let parsed = schema.parse(&raw).unwrap();
/// assert_eq!(parsed[&(1, 2)], "p");
/// assert_eq!(schema.serialize(&parsed).unwrap(), raw);
/// ```
pub fn map_of<K, V>(key: Schema<K>, value: Schema<V>) -> Schema<BTreeMap<K, V>>
where
    K: Ord + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    Schema::new(PairMapShape { key, value })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{integer, number, string};

    use super::*;

    fn located(failure: &Failure) -> Vec<(String, ErrorKind)> {
        failure
            .errors()
            .iter()
            .map(|e| (e.path_string(), e.kind))
            .collect()
    }

    #[test]
    fn test_array_preserves_order_and_count() {
        let schema = array(string());
        let raw = json!(["b", "a", "b"]);
        let parsed = schema.parse(&raw).unwrap();
        assert_eq!(parsed, vec!["b", "a", "b"]);
        assert_eq!(schema.serialize(&parsed), Ok(raw));
        assert_eq!(schema.parse(&json!([])), Ok(Vec::new()));
    }

    #[test]
    fn test_array_rejects_non_sequences() {
        for raw in [json!({"0": 1}), json!("abc"), json!(1)] {
            let failure = array(number()).parse(&raw).unwrap_err();
            assert_eq!(located(&failure), vec![("$".to_string(), ErrorKind::ShapeMismatch)]);
        }
    }

    #[test]
    fn test_array_reports_every_bad_element() {
        let failure = array(number()).parse(&json!(["a", 1, null])).unwrap_err();
        assert_eq!(
            located(&failure),
            vec![
                ("[0]".to_string(), ErrorKind::TypeMismatch),
                ("[2]".to_string(), ErrorKind::MissingValue),
            ]
        );
    }

    #[test]
    fn test_array_serialize_locates_errors() {
        let err = array(number()).serialize(&vec![1.0, f64::INFINITY]).unwrap_err();
        assert!(matches!(err, SerializeError::Index { index: 1, .. }));
    }

    #[test]
    fn test_set_collapses_duplicates() {
        let schema = set_of(integer());
        let parsed = schema.parse(&json!([3, 1, 3, 2])).unwrap();
        assert_eq!(parsed, BTreeSet::from([1, 2, 3]));
        assert_eq!(schema.serialize(&parsed), Ok(json!([1, 2, 3])));
    }

    #[test]
    fn test_indexed_prefixes_with_key() {
        let schema = indexed(number());
        let parsed = schema.parse(&json!({"a": 1, "b": 2})).unwrap();
        assert_eq!(parsed.get("b"), Some(&2.0));

        let failure = schema.parse(&json!({"a": 1, "b": "two"})).unwrap_err();
        assert_eq!(located(&failure), vec![("b".to_string(), ErrorKind::TypeMismatch)]);

        let failure = schema.parse(&json!([1])).unwrap_err();
        assert_eq!(failure.errors()[0].kind, ErrorKind::ShapeMismatch);
    }

    #[test]
    fn test_map_of_locates_key_and_value_errors() {
        let schema = map_of(integer(), string());
        let failure = schema
            .parse(&json!([[1, "one"], ["two", 2], [3]]))
            .unwrap_err();
        assert_eq!(
            located(&failure),
            vec![
                ("[1][0]".to_string(), ErrorKind::TypeMismatch),
                ("[1][1]".to_string(), ErrorKind::TypeMismatch),
                ("[2]".to_string(), ErrorKind::ShapeMismatch),
            ]
        );
    }

    #[test]
    fn test_map_of_rejects_duplicate_keys() {
        let failure = map_of(integer(), string())
            .parse(&json!([[1, "a"], [1, "b"]]))
            .unwrap_err();
        assert_eq!(
            located(&failure),
            vec![("[1][0]".to_string(), ErrorKind::ShapeMismatch)]
        );
    }

    #[test]
    fn test_map_of_round_trip() {
        let schema = map_of(string(), number());
        let mut value = BTreeMap::new();
        value.insert("x".to_string(), 1.5);
        value.insert("y".to_string(), -2.0);
        let raw = schema.serialize(&value).unwrap();
        assert_eq!(raw, json!([["x", 1.5], ["y", -2]]));
        assert_eq!(schema.parse(&raw), Ok(value));
    }

    #[test]
    fn test_distinct_keeps_first_seen_order() {
        let schema = distinct(number());
        let parsed = schema.parse(&json!([3, 1.5, 3, 0.1])).unwrap();
        assert_eq!(parsed, vec![3.0, 1.5, 0.1]);
        assert_eq!(schema.serialize(&parsed), Ok(json!([3, 1.5, 0.1])));
        assert_eq!(schema.describe(), "set<number>");

        let failure = schema.parse(&json!([1, "x"])).unwrap_err();
        assert_eq!(located(&failure), vec![("[1]".to_string(), ErrorKind::TypeMismatch)]);
    }

    #[test]
    fn test_validate_descends_into_elements() {
        let positive = || integer().range(1, 100).default(1);
        assert!(array(positive()).validate(&vec![1, 2]));
        assert!(!array(positive()).validate(&vec![1, 200]));
        assert!(!set_of(positive()).validate(&BTreeSet::from([0])));
        assert!(!distinct(positive()).validate(&vec![2, 2]));
        assert!(!indexed(positive()).validate(&BTreeMap::from([("a".to_string(), -1)])));
        assert!(!map_of(positive(), string()).validate(&BTreeMap::from([(500, "x".to_string())])));
        assert!(map_of(positive(), string()).validate(&BTreeMap::from([(5, "x".to_string())])));
    }
}
