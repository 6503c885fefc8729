use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde_json::json;
use value_schema_core::*;
use value_schema_registry::{
    FieldDescriptor, Registered, Registry, RegistryError, SchemaCatalog, SchemaDescriptor,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct Event {
    name: String,
    at: DateTime<Utc>,
    tags: BTreeSet<String>,
}

impl Registered for Event {}

impl Construct for Event {
    fn construct(mut record: Record) -> Result<Self, RecordError> {
        Ok(Event {
            name: record.take("name")?,
            at: record.take("at")?,
            tags: record.take("tags")?,
        })
    }

    fn deconstruct(&self) -> Record {
        Record::new()
            .with("name", self.name.clone())
            .with("at", self.at)
            .with("tags", self.tags.clone())
    }
}

fn event_schema() -> Schema<Event> {
    object()
        .field("name", string().non_empty())
        .field("at", datetime())
        .field("tags", set_of(string().non_empty()).default(BTreeSet::new()))
        .build_as::<Event>()
        .unwrap()
}

fn catalog_yaml() -> &'static str {
    r#"
version: "1.0"
schemas:
  id:
    type: union
    any_of:
      - type: integer
      - type: string
        pattern: "^[a-z]+-[0-9]+$"
  user:
    type: object
    deny_unknown_fields: true
    fields:
      - name: id
        type: ref
        schema: id
      - name: age
        type: number
        coerce: true
      - name: admin
        type: default
        value: false
        inner: { type: boolean }
      - name: labels
        type: optional
        inner:
          type: indexed
          values: { type: string }
"#
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[test]
fn test_registered_type_round_trip() {
    let mut registry = Registry::new();
    registry.register(event_schema());

    let raw = json!({"name": "deploy", "at": "2024-01-15T10:30:00Z", "tags": ["b", "a", "b"]});
    let event = Event::parse_with(&registry, &raw).unwrap().unwrap();
    assert_eq!(event.tags, BTreeSet::from(["a".to_string(), "b".to_string()]));

    let serialized = event.serialize_with(&registry).unwrap();
    assert_eq!(
        serialized,
        json!({"name": "deploy", "at": 1_705_314_600_000_i64, "tags": ["a", "b"]})
    );
    assert_eq!(Event::parse_with(&registry, &serialized).unwrap(), Ok(event));
}

#[test]
fn test_registered_type_reports_every_field() {
    let mut registry = Registry::new();
    registry.register(event_schema());

    let failure = Event::parse_with(&registry, &json!({"name": "", "at": "soon"}))
        .unwrap()
        .unwrap_err();
    let located: Vec<(String, ErrorKind)> = failure
        .errors()
        .iter()
        .map(|e| (e.path_string(), e.kind))
        .collect();
    assert_eq!(
        located,
        vec![
            ("name".to_string(), ErrorKind::Invalid),
            ("at".to_string(), ErrorKind::CoercionFailure),
        ]
    );
}

#[test]
fn test_validate_with_checks_refinements() {
    let mut registry = Registry::new();
    registry.register(event_schema());

    let mut event = Event {
        name: "x".into(),
        at: DateTime::<Utc>::from_timestamp_millis(0).unwrap(),
        tags: BTreeSet::new(),
    };
    assert!(event.validate_with(&registry).unwrap());
    event.name.clear();
    assert!(!event.validate_with(&registry).unwrap());
}

#[test]
fn test_validate_with_sees_through_field_defaults() {
    let mut registry = Registry::new();
    registry.register(event_schema());

    let mut event = Event {
        name: "deploy".into(),
        at: DateTime::<Utc>::from_timestamp_millis(0).unwrap(),
        tags: BTreeSet::from(["prod".to_string()]),
    };
    assert!(event.validate_with(&registry).unwrap());
    event.tags.insert(String::new());
    assert!(!event.validate_with(&registry).unwrap());
}

#[test]
fn test_unregistered_lookup_fails_immediately() {
    let registry = Registry::new();
    let err = Event::parse_with(&registry, &json!({})).unwrap_err();
    assert!(matches!(err, RegistryError::UnregisteredType { .. }));
    assert!(err.to_string().contains("Event"));
}

#[test]
fn test_registry_shared_across_threads() {
    let mut registry = Registry::new();
    registry.register(integer());
    let registry = std::sync::Arc::new(registry);

    let handles: Vec<_> = (0..4_i64)
        .map(|i| {
            let registry = std::sync::Arc::clone(&registry);
            std::thread::spawn(move || registry.parse::<i64>(&json!(i)).unwrap().unwrap())
        })
        .collect();
    let sum: i64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(sum, 6);
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[test]
fn test_catalog_parses_and_serializes() {
    let catalog = SchemaCatalog::from_yaml_str(catalog_yaml())
        .unwrap()
        .compile()
        .unwrap();

    let parsed = catalog
        .parse("user", &json!({"id": "usr-1", "age": "41"}))
        .unwrap()
        .unwrap();
    assert_eq!(
        parsed,
        json!({"id": "usr-1", "age": 41, "admin": false, "labels": null})
    );
    assert_eq!(
        catalog.serialize("user", &parsed).unwrap(),
        json!({"id": "usr-1", "age": 41, "admin": false})
    );
}

#[test]
fn test_catalog_union_and_unknown_fields() {
    let catalog = SchemaCatalog::from_yaml_str(catalog_yaml())
        .unwrap()
        .compile()
        .unwrap();

    let failure = catalog
        .parse("user", &json!({"id": "USR", "age": 1, "extra": true}))
        .unwrap()
        .unwrap_err();
    let located: Vec<(String, ErrorKind)> = failure
        .errors()
        .iter()
        .map(|e| (e.path_string(), e.kind))
        .collect();
    assert_eq!(
        located,
        vec![
            ("id".to_string(), ErrorKind::UnionExhausted),
            ("id".to_string(), ErrorKind::TypeMismatch),
            ("id".to_string(), ErrorKind::Invalid),
            ("extra".to_string(), ErrorKind::ShapeMismatch),
        ]
    );
}

#[test]
fn test_catalog_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let original = SchemaCatalog::from_yaml_str(catalog_yaml()).unwrap();

    for file in ["catalog.yml", "catalog.json"] {
        let path = dir.path().join(file);
        original.save(&path).unwrap();
        let loaded = SchemaCatalog::load(&path).unwrap();
        assert_eq!(loaded, original, "{file}");
    }

    let json_text = std::fs::read_to_string(dir.path().join("catalog.json")).unwrap();
    assert!(json_text.trim_start().starts_with('{'));
}

#[test]
fn test_catalog_built_in_code_matches_yaml() {
    let built = SchemaCatalog::new("1.0").with_schema(
        "point",
        SchemaDescriptor::Object {
            fields: vec![
                FieldDescriptor {
                    name: "x".into(),
                    schema: SchemaDescriptor::Integer { coerce: false },
                },
                FieldDescriptor {
                    name: "y".into(),
                    schema: SchemaDescriptor::Integer { coerce: false },
                },
            ],
            deny_unknown_fields: false,
        },
    );
    let yaml = built.to_yaml_string().unwrap();
    assert_eq!(SchemaCatalog::from_yaml_str(&yaml).unwrap(), built);

    let catalog = built.compile().unwrap();
    assert!(catalog.contains("point"));
    assert_eq!(catalog.len(), 1);
    assert_eq!(
        catalog.parse("point", &json!({"x": 1, "y": 2})).unwrap(),
        Ok(json!({"x": 1, "y": 2}))
    );
}

#[test]
fn test_catalog_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = SchemaCatalog::load(dir.path().join("absent.yml")).unwrap_err();
    assert!(matches!(err, RegistryError::IoError(_)));
}
