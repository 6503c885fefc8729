//! Fixed-length, positionally typed sequences.

use serde_json::Value;

use crate::error::{PathSegment, SerializeError, value_kind};
use crate::outcome::{Failure, Outcome, require_present};
use crate::schema::{Schema, Shape};

/// A tuple of schemas usable with [`tuple`], implemented for arities 1 to 6.
pub trait TupleSchemas: Send + Sync + 'static {
    /// The parsed tuple type.
    type Output: Send + Sync + 'static;

    /// Number of positions.
    const ARITY: usize;

    /// Parses exactly [`ARITY`](TupleSchemas::ARITY) items; any other
    /// length is a shape mismatch.
    fn parse_items(&self, items: &[Value]) -> Outcome<Self::Output>;

    /// Serializes every position in order.
    fn serialize_items(&self, value: &Self::Output) -> Result<Vec<Value>, SerializeError>;

    /// Descriptions of the position schemas.
    fn describe_items(&self) -> Vec<String>;

    /// Validates every position.
    fn check_items(&self, value: &Self::Output) -> bool;
}

fn arity_mismatch(arity: usize, found: usize) -> Failure {
    Failure::shape_mismatch(format!(
        "expected array of length {arity}, found length {found}"
    ))
}

macro_rules! tuple_schemas {
    ($arity:literal; $($ty:ident $var:ident $idx:tt),+) => {
        impl<$($ty: Send + Sync + 'static),+> TupleSchemas for ($(Schema<$ty>,)+) {
            type Output = ($($ty,)+);

            const ARITY: usize = $arity;

            fn parse_items(&self, items: &[Value]) -> Outcome<Self::Output> {
                if items.len() != $arity {
                    return Err(arity_mismatch($arity, items.len()));
                }
                let mut errors = Vec::new();
                let parsed = ($(
                    match self.$idx.parse(&items[$idx]) {
                        Ok(value) => Some(value),
                        Err(failure) => {
                            errors.extend(failure.prefixed(PathSegment::Index($idx)).into_errors());
                            None
                        }
                    },
                )+);
                match parsed {
                    ($(Some($var),)+) => Ok(($($var,)+)),
                    _ => Err(Failure::from_errors(errors)),
                }
            }

            fn serialize_items(&self, value: &Self::Output) -> Result<Vec<Value>, SerializeError> {
                Ok(vec![$(
                    self.$idx
                        .serialize(&value.$idx)
                        .map_err(|err| err.in_index($idx))?,
                )+])
            }

            fn describe_items(&self) -> Vec<String> {
                vec![$(self.$idx.describe()),+]
            }

            fn check_items(&self, value: &Self::Output) -> bool {
                $(self.$idx.validate(&value.$idx))&&+
            }
        }
    };
}

tuple_schemas!(1; A a 0);
tuple_schemas!(2; A a 0, B b 1);
tuple_schemas!(3; A a 0, B b 1, C c 2);
tuple_schemas!(4; A a 0, B b 1, C c 2, D d 3);
tuple_schemas!(5; A a 0, B b 1, C c 2, D d 3, E e 4);
tuple_schemas!(6; A a 0, B b 1, C c 2, D d 3, E e 4, F f 5);

struct TupleShape<S> {
    schemas: S,
}

impl<S: TupleSchemas> Shape<S::Output> for TupleShape<S> {
    fn parse(&self, raw: Option<&Value>) -> Outcome<S::Output> {
        let value = require_present(raw)?;
        let Value::Array(items) = value else {
            return Err(Failure::shape_mismatch(format!(
                "expected array of length {}, found {}",
                S::ARITY,
                value_kind(value)
            )));
        };
        self.schemas.parse_items(items)
    }

    fn serialize(&self, value: &S::Output) -> Result<Value, SerializeError> {
        self.schemas.serialize_items(value).map(Value::Array)
    }

    fn describe(&self) -> String {
        format!("[{}]", self.schemas.describe_items().join(", "))
    }

    fn check(&self, value: &S::Output) -> bool {
        self.schemas.check_items(value)
    }
}

/// Tuple whose positions each have their own schema.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use value_schema_core::*;
///
/// let entry = tuple((string(), number(), boolean()));
/// assert_eq!(
///     entry.parse(&json!(["a", 1, true])).unwrap(),
///     ("a".to_string(), 1.0, true)
/// );
/// assert!(entry.parse(&json!(["a", 1])).is_err());
/// ```
pub fn tuple<S: TupleSchemas>(schemas: S) -> Schema<S::Output> {
    Schema::new(TupleShape { schemas })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{ErrorKind, boolean, integer, number, string};

    use super::*;

    #[test]
    fn test_arity_mismatch_is_a_shape_mismatch() {
        let schema = tuple((string(), number()));
        for raw in [json!([]), json!(["a"]), json!(["a", 1, 2])] {
            let failure = schema.parse(&raw).unwrap_err();
            assert_eq!(failure.errors().len(), 1);
            assert_eq!(failure.errors()[0].kind, ErrorKind::ShapeMismatch);
        }
        let failure = schema.parse(&json!({"0": "a", "1": 1})).unwrap_err();
        assert_eq!(failure.errors()[0].kind, ErrorKind::ShapeMismatch);
    }

    #[test]
    fn test_position_errors_are_prefixed() {
        let schema = tuple((string(), number(), boolean()));
        let failure = schema.parse(&json!([1, 2, "x"])).unwrap_err();
        let paths: Vec<String> = failure.errors().iter().map(|e| e.path_string()).collect();
        assert_eq!(paths, vec!["[0]", "[2]"]);
    }

    #[test]
    fn test_round_trip_and_describe() {
        let schema = tuple((integer(), string().optional()));
        let raw = json!([7, null]);
        let parsed = schema.parse(&raw).unwrap();
        assert_eq!(parsed, (7, None));
        assert_eq!(schema.serialize(&parsed), Ok(raw));
        assert_eq!(schema.describe(), "[integer, string?]");
    }

    #[test]
    fn test_single_and_six_element_tuples() {
        assert_eq!(tuple((integer(),)).parse(&json!([1])), Ok((1,)));

        let six = tuple((integer(), integer(), integer(), integer(), integer(), integer()));
        let parsed = six.parse(&json!([1, 2, 3, 4, 5, 6])).unwrap();
        assert_eq!(parsed, (1, 2, 3, 4, 5, 6));
        assert_eq!(<(Schema<i64>,) as TupleSchemas>::ARITY, 1);
    }

    #[test]
    fn test_parse_items_checks_length() {
        let schemas = (integer(), string());
        let failure = schemas.parse_items(&[json!(1)]).unwrap_err();
        assert_eq!(failure.errors()[0].kind, ErrorKind::ShapeMismatch);
        assert_eq!(
            schemas.parse_items(&[json!(1), json!("a")]),
            Ok((1, "a".to_string()))
        );
    }

    #[test]
    fn test_validate_checks_every_position() {
        let schema = tuple((integer().range(0, 9).default(0), string().non_empty()));
        assert!(schema.validate(&(3, "a".to_string())));
        assert!(!schema.validate(&(30, "a".to_string())));
        assert!(!schema.validate(&(3, String::new())));
    }
}
