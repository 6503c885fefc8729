//! Named schema catalogs loaded from configuration files.
//!
//! A [`SchemaCatalog`] is the YAML/JSON document; [`SchemaCatalog::compile`]
//! turns it into a [`Catalog`] of ready-to-use dynamic schemas.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! schemas:
//!   address:
//!     type: object
//!     fields:
//!       - name: city
//!         type: string
//!   user:
//!     type: object
//!     fields:
//!       - name: name
//!         type: string
//!       - name: age
//!         type: number
//!         coerce: true
//!       - name: home
//!         type: optional
//!         inner: { type: ref, schema: address }
//! ```

use std::collections::BTreeMap;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use value_schema_core::{Outcome, Schema};

use crate::descriptor::{Compiler, SchemaDescriptor};
use crate::error::{RegistryError, Result};

/// Declarative catalog of named schema descriptors.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use value_schema_registry::SchemaCatalog;
///
/// let yaml = r#"
/// version: "1.0"
/// schemas:
///   port:
///     type: integer
///     coerce: true
/// "#;
/// let catalog = SchemaCatalog::from_yaml_str(yaml).unwrap().compile().unwrap();
/// assert_eq!(catalog.parse("port", &json!("8080")).unwrap(), Ok(json!(8080)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaCatalog {
    /// Configuration format version (e.g., `"1.0"`).
    pub version: String,
    /// Descriptors by name.
    #[serde(default)]
    pub schemas: BTreeMap<String, SchemaDescriptor>,
}

impl SchemaCatalog {
    /// Creates an empty catalog with the given format version.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            schemas: BTreeMap::new(),
        }
    }

    /// Adds or replaces a named descriptor.
    pub fn with_schema(mut self, name: impl Into<String>, descriptor: SchemaDescriptor) -> Self {
        self.schemas.insert(name.into(), descriptor);
        self
    }

    /// Loads a catalog file: JSON when the extension is `.json`, YAML
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](RegistryError::IoError) if the file cannot be
    /// read, or [`JsonError`](RegistryError::JsonError) /
    /// [`YamlError`](RegistryError::YamlError) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(std::fs::File::open(path)?);
        let catalog = if is_json(path) {
            serde_json::from_reader(reader)?
        } else {
            serde_yaml::from_reader(reader)?
        };
        Ok(catalog)
    }

    /// Saves the catalog, choosing the format by extension like
    /// [`load`](SchemaCatalog::load).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let writer = BufWriter::new(std::fs::File::create(path)?);
        if is_json(path) {
            serde_json::to_writer_pretty(writer, self)?;
        } else {
            serde_yaml::to_writer(writer, self)?;
        }
        Ok(())
    }

    /// Parses a catalog from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parses a catalog from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Renders the catalog as YAML.
    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Compiles every descriptor, resolving `ref`s between them.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownSchema`](RegistryError::UnknownSchema) for a `ref` to
    /// a missing name, [`ReferenceCycle`](RegistryError::ReferenceCycle) when
    /// references loop, or
    /// [`InvalidDescriptor`](RegistryError::InvalidDescriptor) for anything
    /// else that cannot be compiled.
    pub fn compile(&self) -> Result<Catalog> {
        let mut compiler = Compiler::new(&self.schemas);
        let mut schemas = BTreeMap::new();
        for name in self.schemas.keys() {
            schemas.insert(name.clone(), compiler.compile_named(name)?);
        }
        debug!(version = %self.version, schemas = schemas.len(), "compiled schema catalog");
        Ok(Catalog { schemas })
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("json")
}

/// Compiled, named dynamic schemas.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    schemas: BTreeMap<String, Schema<Value>>,
}

impl Catalog {
    /// Returns the schema named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownSchema`] if there is none.
    pub fn get(&self, name: &str) -> Result<&Schema<Value>> {
        self.schemas
            .get(name)
            .ok_or_else(|| RegistryError::UnknownSchema(name.to_string()))
    }

    /// Parses `raw` with the schema named `name`.
    pub fn parse(&self, name: &str, raw: &Value) -> Result<Outcome<Value>> {
        Ok(self.get(name)?.parse(raw))
    }

    /// Serializes `value` with the schema named `name`.
    pub fn serialize(&self, name: &str, value: &Value) -> Result<Value> {
        Ok(self.get(name)?.serialize(value)?)
    }

    /// Returns `true` if a schema named `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Schema names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Number of schemas.
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Returns `true` if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
