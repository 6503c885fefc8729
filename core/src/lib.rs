//! Composable schemas that parse untyped values into typed ones and
//! serialize them back.
//!
//! Describe the shape of a value once and get both directions from it:
//!
//! - [`Schema<T>`]: an immutable, shareable schema producing `T`, with
//!   combinators ([`optional`](Schema::optional), [`default`](Schema::default),
//!   [`or`](Schema::or), [`transform`](Schema::transform),
//!   [`then`](Schema::then), [`catch`](Schema::catch), [`map`](Schema::map)
//!   and more).
//! - Leaf schemas: [`string`], [`number`], [`integer`], [`boolean`],
//!   [`datetime`], [`regex`], strict by default and lenient after
//!   [`coerce`](Schema::coerce).
//! - Composite schemas: [`object`], [`array`], [`tuple`], [`indexed`],
//!   [`map_of`], [`set_of`], [`distinct`].
//! - [`Outcome<T>`]: the parse result; a [`Failure`] lists every error
//!   found, each located by a path such as `users[3].email`.
//!
//! Raw data is a [`serde_json::Value`], so anything serde can deserialize
//! (JSON, YAML, TOML) can be validated.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use value_schema_core::*;
//!
//! let person = object()
//!     .field("name", string())
//!     .field("age", number().coerce())
//!     .field("tags", array(string()).default(Vec::new()))
//!     .build()
//!     .unwrap();
//!
//! let record = person.parse(&json!({"name": "Ada", "age": "36"})).unwrap();
//! assert_eq!(record.get::<f64>("age"), Some(&36.0));
//! assert_eq!(record.get::<Vec<String>>("tags"), Some(&Vec::new()));
//!
//! let failure = person.parse(&json!({"age": true, "tags": [1]})).unwrap_err();
//! let paths: Vec<String> = failure.errors().iter().map(|e| e.path_string()).collect();
//! assert_eq!(paths, vec!["name", "age"]);
//!
//! assert_eq!(
//!     person.serialize(&record).unwrap(),
//!     json!({"name": "Ada", "age": 36, "tags": []})
//! );
//! ```

mod collection;
mod combinator;
mod error;
mod leaf;
mod object;
mod outcome;
mod record;
mod schema;
mod tuple;
mod union;

pub use collection::{array, distinct, indexed, map_of, set_of};
pub use error::{
    ErrorEntry, ErrorKind, PathSegment, SchemaError, SerializeError, format_path, value_kind,
};
pub use leaf::{boolean, datetime, integer, json_number, number, regex, string};
pub use object::{Construct, ObjectBuilder, object};
pub use outcome::{Failure, Outcome, require_present};
pub use record::{Record, RecordError};
pub use schema::{Schema, Shape, parse, serialize};
pub use tuple::{TupleSchemas, tuple};
