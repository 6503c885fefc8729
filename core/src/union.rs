//! Ordered two-way union behind [`Schema::or`](crate::Schema::or).
//!
//! Parsing tries the first branch, then the second, against the same raw
//! input; the first success wins. When both fail the failure starts with a
//! single root-level [`ErrorKind::UnionExhausted`] entry followed by the
//! errors of every branch, so chains like `a.or(b).or(c)` report one summary
//! line and all branch errors. Two merely-missing branches collapse to a
//! plain missing failure, which keeps `a.or(b).optional()` working.

use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use crate::error::{ErrorEntry, ErrorKind, SerializeError};
use crate::outcome::{Failure, Outcome};
use crate::schema::{Schema, Shape};

pub(crate) struct Union<T> {
    first: Schema<T>,
    second: Schema<T>,
}

impl<T> Union<T> {
    pub(crate) fn new(first: Schema<T>, second: Schema<T>) -> Self {
        Self { first, second }
    }
}

impl<T: Send + Sync + 'static> Union<T> {
    fn exhausted(&self, first: Failure, second: Failure) -> Failure {
        if first.is_missing() && second.is_missing() {
            return Failure::missing();
        }

        let mut errors = vec![ErrorEntry::new(
            ErrorKind::UnionExhausted,
            format!("value matches none of {}", self.describe()),
        )];
        errors.extend(
            first
                .into_errors()
                .into_iter()
                .chain(second.into_errors())
                .filter(|entry| !(entry.kind == ErrorKind::UnionExhausted && entry.is_root())),
        );
        Failure::from_errors(errors)
    }

    fn serialize_with<R>(
        &self,
        value: &T,
        serialize: impl Fn(&Schema<T>, &T) -> Result<R, SerializeError>,
    ) -> Result<R, SerializeError> {
        match serialize(&self.first, value) {
            Err(err) if err.is_mismatch() => {
                trace!(error = %err, "first union branch cannot serialize value, trying second");
                serialize(&self.second, value).map_err(|err| {
                    if err.is_mismatch() {
                        SerializeError::NoMatchingBranch {
                            expected: self.describe(),
                        }
                    } else {
                        err
                    }
                })
            }
            other => other,
        }
    }

    fn describe(&self) -> String {
        format!("{} | {}", self.first.describe(), self.second.describe())
    }
}

impl<T: Send + Sync + 'static> Shape<T> for Union<T> {
    fn parse(&self, raw: Option<&Value>) -> Outcome<T> {
        let first = match self.first.parse_input(raw) {
            Ok(value) => return Ok(value),
            Err(failure) => failure,
        };
        trace!(errors = first.errors().len(), "first union branch rejected value");

        match self.second.parse_input(raw) {
            Ok(value) => Ok(value),
            Err(second) => Err(self.exhausted(first, second)),
        }
    }

    fn serialize(&self, value: &T) -> Result<Value, SerializeError> {
        self.serialize_with(value, |schema, value| schema.serialize(value))
    }

    fn serialize_field(&self, value: &T) -> Result<Option<Value>, SerializeError> {
        self.serialize_with(value, |schema, value| schema.serialize_field(value))
    }

    fn describe(&self) -> String {
        Union::describe(self)
    }

    fn coerce(&self) -> Option<Arc<dyn Shape<T>>> {
        Some(Arc::new(Union::new(self.first.coerced(), self.second.coerced())))
    }

    fn check(&self, value: &T) -> bool {
        self.first.validate(value) || self.second.validate(value)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{integer, number, string};

    use super::*;

    fn text_or_number() -> Schema<String> {
        string().or(number().map(|n| n.to_string(), |s: &String| s.parse().ok()))
    }

    #[test]
    fn test_first_success_wins() {
        let schema = integer()
            .map(|n| n * 2, |n| Some(n / 2))
            .or(integer());
        assert_eq!(schema.parse(&json!(4)), Ok(8));
    }

    #[test]
    fn test_second_branch_is_tried() {
        let schema = text_or_number();
        assert_eq!(schema.parse(&json!("a")), Ok("a".to_string()));
        assert_eq!(schema.parse(&json!(2.5)), Ok("2.5".to_string()));
    }

    #[test]
    fn test_exhausted_reports_summary_then_branch_errors() {
        let failure = text_or_number().parse(&json!(true)).unwrap_err();
        let kinds: Vec<ErrorKind> = failure.errors().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ErrorKind::UnionExhausted,
                ErrorKind::TypeMismatch,
                ErrorKind::TypeMismatch
            ]
        );
        assert!(failure.errors().iter().all(ErrorEntry::is_root));
    }

    #[test]
    fn test_chained_unions_keep_one_summary() {
        let schema = string()
            .or(string().coerce().refine(|s| s == "x", "must be x"))
            .or(string().non_empty());
        let failure = schema.parse(&json!(7)).unwrap_err();
        let summaries = failure
            .errors()
            .iter()
            .filter(|e| e.kind == ErrorKind::UnionExhausted)
            .count();
        assert_eq!(summaries, 1);
        assert_eq!(failure.errors().len(), 4);
    }

    #[test]
    fn test_missing_on_both_sides_stays_missing() {
        let schema = string().or(string().coerce());
        assert!(schema.parse_input(None).unwrap_err().is_missing());
        assert_eq!(schema.optional().parse_input(None), Ok(None));
    }

    #[test]
    fn test_serialize_falls_through_on_mismatch() {
        #[derive(Debug, Clone, PartialEq)]
        enum Id {
            Numeric(i64),
            Named(String),
        }

        let schema = integer()
            .map(Id::Numeric, |id| match id {
                Id::Numeric(n) => Some(*n),
                Id::Named(_) => None,
            })
            .or(string().map(Id::Named, |id| match id {
                Id::Named(name) => Some(name.clone()),
                Id::Numeric(_) => None,
            }));

        assert_eq!(schema.serialize(&Id::Numeric(3)), Ok(json!(3)));
        assert_eq!(schema.serialize(&Id::Named("root".into())), Ok(json!("root")));
        assert_eq!(schema.parse(&json!("root")), Ok(Id::Named("root".into())));
        assert_eq!(schema.describe(), "integer | string");
    }

    #[test]
    fn test_serialize_with_no_matching_branch() {
        let never = integer().map(|n| n, |_| None::<i64>);
        let schema = never.or(never.clone());
        let err = schema.serialize(&1).unwrap_err();
        assert!(matches!(err, SerializeError::NoMatchingBranch { .. }));
    }
}
