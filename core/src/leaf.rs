//! Leaf schemas: strings, numbers, integers, booleans, timestamps, and
//! regular expressions.
//!
//! Leaves are strict by default: the raw value must already have the
//! expected JSON kind. [`Schema::coerce`] switches a leaf to best-effort
//! conversion.
//!
//! | schema      | strict accepts     | coerced also accepts                          |
//! |-------------|--------------------|-----------------------------------------------|
//! | `string()`  | strings            | numbers, booleans, arrays/objects as JSON text |
//! | `number()`  | numbers            | decimal strings, then hexadecimal strings     |
//! | `integer()` | integral numbers   | integral decimal strings (`"1e3"`), hex, `3.0` |
//! | `boolean()` | `true` / `false`   | anything, by truthiness                       |
//!
//! Absent and `null` values are missing for every leaf, except that a
//! coerced boolean treats `null` as `false`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{ErrorKind, SerializeError, value_kind};
use crate::outcome::{Failure, Outcome, require_present};
use crate::schema::{Schema, Shape};

/// Largest magnitude at which every integer is exactly representable as `f64`.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

#[derive(Debug, Clone, Copy, Default)]
struct StringShape {
    coerce: bool,
}

impl Shape<String> for StringShape {
    fn parse(&self, raw: Option<&Value>) -> Outcome<String> {
        let value = require_present(raw)?;
        match value {
            Value::String(text) => Ok(text.clone()),
            Value::Number(n) if self.coerce => Ok(n.to_string()),
            Value::Bool(b) if self.coerce => Ok(b.to_string()),
            Value::Array(_) | Value::Object(_) if self.coerce => Ok(value.to_string()),
            other => Err(Failure::type_mismatch("string", other)),
        }
    }

    fn serialize(&self, value: &String) -> Result<Value, SerializeError> {
        Ok(Value::String(value.clone()))
    }

    fn describe(&self) -> String {
        "string".to_string()
    }

    fn coerce(&self) -> Option<Arc<dyn Shape<String>>> {
        Some(Arc::new(StringShape { coerce: true }))
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct NumberShape {
    coerce: bool,
}

impl Shape<f64> for NumberShape {
    fn parse(&self, raw: Option<&Value>) -> Outcome<f64> {
        let value = require_present(raw)?;
        match value {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| Failure::type_mismatch("number", value)),
            Value::String(text) if self.coerce => {
                coerce_f64(text).ok_or_else(|| coercion_failure(text, "number"))
            }
            other => Err(Failure::type_mismatch("number", other)),
        }
    }

    fn serialize(&self, value: &f64) -> Result<Value, SerializeError> {
        json_number(*value).ok_or(SerializeError::NonFinite(*value))
    }

    fn describe(&self) -> String {
        "number".to_string()
    }

    fn coerce(&self) -> Option<Arc<dyn Shape<f64>>> {
        Some(Arc::new(NumberShape { coerce: true }))
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct IntegerShape {
    coerce: bool,
}

impl Shape<i64> for IntegerShape {
    fn parse(&self, raw: Option<&Value>) -> Outcome<i64> {
        let value = require_present(raw)?;
        match value {
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(i),
                None if self.coerce => n
                    .as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < MAX_EXACT_INTEGER)
                    .map(|f| f as i64)
                    .ok_or_else(|| coercion_failure(&n.to_string(), "integer")),
                None => Err(Failure::type_mismatch("integer", value)),
            },
            Value::String(text) if self.coerce => {
                coerce_i64(text).ok_or_else(|| coercion_failure(text, "integer"))
            }
            other => Err(Failure::type_mismatch("integer", other)),
        }
    }

    fn serialize(&self, value: &i64) -> Result<Value, SerializeError> {
        Ok(Value::from(*value))
    }

    fn describe(&self) -> String {
        "integer".to_string()
    }

    fn coerce(&self) -> Option<Arc<dyn Shape<i64>>> {
        Some(Arc::new(IntegerShape { coerce: true }))
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct BooleanShape {
    coerce: bool,
}

impl Shape<bool> for BooleanShape {
    fn parse(&self, raw: Option<&Value>) -> Outcome<bool> {
        if self.coerce {
            let Some(value) = raw else {
                return Err(Failure::missing());
            };
            return Ok(truthy(value));
        }

        match require_present(raw)? {
            Value::Bool(b) => Ok(*b),
            other => Err(Failure::type_mismatch("boolean", other)),
        }
    }

    fn serialize(&self, value: &bool) -> Result<Value, SerializeError> {
        Ok(Value::Bool(*value))
    }

    fn describe(&self) -> String {
        "boolean".to_string()
    }

    fn coerce(&self) -> Option<Arc<dyn Shape<bool>>> {
        Some(Arc::new(BooleanShape { coerce: true }))
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct DateTimeShape;

impl Shape<DateTime<Utc>> for DateTimeShape {
    fn parse(&self, raw: Option<&Value>) -> Outcome<DateTime<Utc>> {
        let value = require_present(raw)?;
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .ok_or_else(|| {
                    Failure::new(
                        ErrorKind::CoercionFailure,
                        format!("timestamp {n} is out of range"),
                    )
                }),
            Value::String(text) => DateTime::parse_from_rfc3339(text)
                .map(|parsed| parsed.with_timezone(&Utc))
                .map_err(|e| {
                    Failure::new(
                        ErrorKind::CoercionFailure,
                        format!("invalid RFC 3339 timestamp {text:?}: {e}"),
                    )
                }),
            other => Err(Failure::type_mismatch("timestamp", other)),
        }
    }

    fn serialize(&self, value: &DateTime<Utc>) -> Result<Value, SerializeError> {
        Ok(Value::from(value.timestamp_millis()))
    }

    fn describe(&self) -> String {
        "datetime".to_string()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct RegexShape;

/// Inline flags understood by `regex`; the rest only affect how a match is
/// iterated and are dropped.
const REGEX_FLAGS: &str = "ims";
const IGNORED_REGEX_FLAGS: &str = "gyud";

impl RegexShape {
    fn compile(source: &str, flags: &str) -> Outcome<Regex> {
        let mut inline = String::new();
        for flag in flags.chars() {
            if REGEX_FLAGS.contains(flag) {
                if !inline.contains(flag) {
                    inline.push(flag);
                }
            } else if !IGNORED_REGEX_FLAGS.contains(flag) {
                return Err(Failure::new(
                    ErrorKind::CoercionFailure,
                    format!("unsupported regex flag {flag:?}"),
                ));
            }
        }
        let pattern = if inline.is_empty() {
            source.to_string()
        } else {
            format!("(?{inline}){source}")
        };
        Regex::new(&pattern).map_err(|e| {
            Failure::new(
                ErrorKind::CoercionFailure,
                format!("invalid regex {source:?}: {e}"),
            )
        })
    }
}

/// Splits a leading `(?ims)` group off a pattern.
fn split_inline_flags(pattern: &str) -> (&str, &str) {
    let Some(rest) = pattern.strip_prefix("(?") else {
        return ("", pattern);
    };
    match rest.split_once(')') {
        Some((flags, source))
            if !flags.is_empty() && flags.chars().all(|c| REGEX_FLAGS.contains(c)) =>
        {
            (flags, source)
        }
        _ => ("", pattern),
    }
}

impl Shape<Regex> for RegexShape {
    fn parse(&self, raw: Option<&Value>) -> Outcome<Regex> {
        let value = require_present(raw)?;
        let Value::Object(map) = value else {
            return Err(Failure::type_mismatch("regex", value));
        };
        let source = match map.get("source") {
            Some(Value::String(source)) => source,
            Some(other) => {
                return Err(Failure::type_mismatch("string", other).prefixed("source"));
            }
            None => return Err(Failure::missing().prefixed("source")),
        };
        let flags = match map.get("flags") {
            None | Some(Value::Null) => "",
            Some(Value::String(flags)) => flags.as_str(),
            Some(other) => {
                return Err(Failure::shape_mismatch(format!(
                    "expected string flags, found {}",
                    value_kind(other)
                ))
                .prefixed("flags"));
            }
        };
        Self::compile(source, flags)
    }

    fn serialize(&self, value: &Regex) -> Result<Value, SerializeError> {
        let (flags, source) = split_inline_flags(value.as_str());
        let mut map = Map::new();
        map.insert("source".to_string(), Value::String(source.to_string()));
        map.insert("flags".to_string(), Value::String(flags.to_string()));
        Ok(Value::Object(map))
    }

    fn describe(&self) -> String {
        "regex".to_string()
    }
}

/// Strict string schema.
pub fn string() -> Schema<String> {
    Schema::new(StringShape::default())
}

/// Strict `f64` schema.
pub fn number() -> Schema<f64> {
    Schema::new(NumberShape::default())
}

/// Strict `i64` schema; fractional numbers are a type mismatch.
pub fn integer() -> Schema<i64> {
    Schema::new(IntegerShape::default())
}

/// Strict boolean schema.
pub fn boolean() -> Schema<bool> {
    Schema::new(BooleanShape::default())
}

/// UTC timestamp from epoch milliseconds or an RFC 3339 string.
///
/// Serializes to epoch milliseconds, so sub-millisecond precision does not
/// survive a round trip.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use value_schema_core::datetime;
///
/// let schema = datetime();
/// let parsed = schema.parse(&json!("2024-01-15T10:30:00Z")).unwrap();
/// assert_eq!(schema.serialize(&parsed).unwrap(), json!(1_705_314_600_000_i64));
/// assert_eq!(schema.parse(&json!(1_705_314_600_000_i64)).unwrap(), parsed);
/// ```
pub fn datetime() -> Schema<DateTime<Utc>> {
    Schema::new(DateTimeShape)
}

/// Regular expression written as `{"source": "...", "flags": "..."}`.
///
/// The `i`, `m`, and `s` flags become inline flags; `g`, `y`, `u`, and `d`
/// are accepted and dropped. Serialization moves a leading inline flag
/// group back into `flags`.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use value_schema_core::regex;
///
/// let schema = regex();
/// let pattern = schema.parse(&json!({"source": "^ab+$", "flags": "gi"})).unwrap();
/// assert!(pattern.is_match("ABB"));
/// assert_eq!(
///     schema.serialize(&pattern).unwrap(),
///     json!({"source": "^ab+$", "flags": "i"})
/// );
/// ```
pub fn regex() -> Schema<Regex> {
    Schema::new(RegexShape)
}

impl Schema<String> {
    /// Requires the whole string to be matched somewhere by `pattern`.
    pub fn matches(&self, pattern: Regex) -> Schema<String> {
        let message = format!("must match /{}/", pattern.as_str());
        self.refine(move |text: &String| pattern.is_match(text), message)
    }

    /// Rejects the empty string.
    pub fn non_empty(&self) -> Schema<String> {
        self.refine(|text: &String| !text.is_empty(), "must not be empty")
    }
}

impl Schema<f64> {
    /// Requires `min <= value <= max`.
    pub fn range(&self, min: f64, max: f64) -> Schema<f64> {
        self.refine(
            move |n: &f64| (min..=max).contains(n),
            format!("must be between {min} and {max}"),
        )
    }
}

impl Schema<i64> {
    /// Requires `min <= value <= max`.
    pub fn range(&self, min: i64, max: i64) -> Schema<i64> {
        self.refine(
            move |n: &i64| (min..=max).contains(n),
            format!("must be between {min} and {max}"),
        )
    }
}

/// Converts a finite `f64` into a JSON number, preferring the integer form
/// for integral values.
pub fn json_number(value: f64) -> Option<Value> {
    if value.fract() == 0.0 && value.abs() < MAX_EXACT_INTEGER {
        return Some(Value::from(value as i64));
    }
    serde_json::Number::from_f64(value).map(Value::Number)
}

fn coercion_failure(text: &str, target: &str) -> Failure {
    Failure::new(
        ErrorKind::CoercionFailure,
        format!("cannot convert {text:?} to {target}"),
    )
}

/// Decimal float first, hexadecimal integer second.
fn coerce_f64(text: &str) -> Option<f64> {
    let text = text.trim();
    match text.parse::<f64>() {
        Ok(parsed) => parsed.is_finite().then_some(parsed),
        Err(_) => parse_hex(text).map(|i| i as f64),
    }
}

/// Decimal integer, then integral decimal float, then hexadecimal. Text
/// that reads as a decimal float never falls through to hex, so `"1e3"` is
/// 1000 and `"2.5"` fails.
fn coerce_i64(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(parsed) = text.parse::<i64>() {
        return Some(parsed);
    }
    match text.parse::<f64>() {
        Ok(parsed) => {
            (parsed.fract() == 0.0 && parsed.abs() < MAX_EXACT_INTEGER).then_some(parsed as i64)
        }
        Err(_) => parse_hex(text),
    }
}

fn parse_hex(text: &str) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(digits);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let magnitude = i64::from_str_radix(digits, 16).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
