use std::path::Path;

use serde_json::json;
use shapecheck_catalog::{CatalogError, EngineConfig, SchemaCatalog};
use shapecheck_core::{ErrorKind, SchemaDefinitionError, Value};
use shapecheck_engine::{Parser, Validator};

fn write(dir: &Path, file: &str, contents: &str) {
    let path = dir.join(file);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "schemas/Entity.yaml",
        r#"
id:
  description: Id
  type: positiveInteger
createdAt:
  description: Created at
  type: date
"#,
    );
    write(
        dir.path(),
        "schemas/User.yaml",
        r#"
description: User
extends: Entity
schema:
  name:
    description: Name
    type: string
  tags:
    description: Tags
    arrayOf: string
    required: false
"#,
    );
    write(
        dir.path(),
        "shapecheck.yml",
        r#"
validator:
  returnAllErrors: true
  convertDates: true
parser:
  structure: flat
schemaDirs:
  - schemas
"#,
    );
    dir
}

#[test]
fn test_config_driven_validation() {
    let dir = project();
    let config = EngineConfig::load(dir.path().join("shapecheck.yml")).unwrap();
    let catalog = config.catalog(dir.path()).unwrap();
    catalog.check().unwrap();

    let user = catalog.get("User").unwrap();
    let validator = Validator::new(user, config.validator_options(&catalog)).unwrap();

    let valid = validator
        .validate(Value::from(json!({
            "id": 1,
            "createdAt": "2024-05-01T10:00:00.000Z",
            "name": "Ada"
        })))
        .unwrap();
    assert!(matches!(valid.get("createdAt"), Some(Value::Date(_))));

    let err = validator
        .validate(Value::from(json!({"id": 0, "name": 5, "extra": true})))
        .unwrap_err();
    assert_eq!(
        err.messages(),
        vec![
            "extra is not allowed",
            "id must be a positive integer",
            "createdAt is a required field",
            "name must be a string"
        ]
    );
    assert_eq!(err.kind, ErrorKind::Unknown);
}

#[test]
fn test_config_driven_flat_parsing() {
    let dir = project();
    let config = EngineConfig::load(dir.path().join("shapecheck.yml")).unwrap();
    let catalog = config.catalog(dir.path()).unwrap();

    let parser = Parser::new(catalog.get("User").unwrap(), config.parser_options(&catalog)).unwrap();
    let parsed = parser
        .parse(Value::from(json!({
            "id": "3",
            "createdAt": "2024-05-01T10:00:00.000Z",
            "name": "Ada",
            "tags": "[\"a\", \"b\"]"
        })))
        .unwrap();
    assert_eq!(parsed.get("id"), Some(&Value::from(3_i64)));
    assert_eq!(
        parsed.get("tags"),
        Some(&Value::from(json!(["a", "b"])))
    );
}

#[test]
fn test_missing_reference_surfaces_on_check() {
    let dir = project();
    write(
        dir.path(),
        "schemas/Order.json",
        r#"{"buyer": {"description": "Buyer", "schema": "Customer"}}"#,
    );
    let catalog = SchemaCatalog::from_dir(dir.path().join("schemas")).unwrap();

    match catalog.check() {
        Err(CatalogError::InvalidSchema { name, source }) => {
            assert_eq!(name, "Order");
            assert!(matches!(source, SchemaDefinitionError::UnknownReference { .. }));
        }
        other => panic!("expected an invalid schema, got {other:?}"),
    }
}

#[test]
fn test_reference_cycles_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "bundle.json",
        r#"{
            "A": {"b": {"description": "b", "schema": "B"}},
            "B": {"a": {"description": "a", "schema": "A"}}
        }"#,
    );
    let catalog = SchemaCatalog::from_bundle(dir.path().join("bundle.json")).unwrap();
    let err = catalog.normalized("A").unwrap_err();
    assert!(matches!(
        err,
        CatalogError::InvalidSchema {
            source: SchemaDefinitionError::ReferenceCycle { .. },
            ..
        }
    ));
}
