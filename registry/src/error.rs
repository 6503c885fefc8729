//! Error types for registry and catalog operations.
//!
//! These are configuration errors: they mean a schema was looked up that was
//! never registered, or a catalog file is malformed. Data errors found while
//! parsing stay inside [`Failure`](value_schema_core::Failure).

use thiserror::Error;
use value_schema_core::SerializeError;

/// Errors that can occur during registry and catalog operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No schema is registered for the requested type.
    #[error("no schema registered for type {type_name}")]
    UnregisteredType {
        /// Fully qualified Rust type name.
        type_name: &'static str,
    },

    /// A catalog has no schema with this name.
    #[error("unknown schema: {0}")]
    UnknownSchema(String),

    /// A catalog descriptor cannot be compiled.
    #[error("invalid schema descriptor at {path}: {reason}")]
    InvalidDescriptor {
        /// Location of the descriptor, e.g. `user.fields.email`.
        path: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Named schemas reference each other in a loop.
    #[error("schema reference cycle: {0}")]
    ReferenceCycle(String),

    /// A value could not be serialized.
    #[error("serialize error: {0}")]
    Serialize(#[from] SerializeError),

    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl RegistryError {
    pub(crate) fn invalid(path: &str, reason: impl Into<String>) -> Self {
        RegistryError::InvalidDescriptor {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias for results with [`RegistryError`].
pub type Result<T> = std::result::Result<T, RegistryError>;
