//! End-to-end generation from schema files to output directory

use restforge_common::{SchemaGraph, OPENAPI_VERSION};
use restforge_generator::{Config, HttpHandler, SpecGenerator, DEFAULT_SPEC_PATH, SPEC_ENDPOINT};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const SCHEMA_YAML: &str = r#"
schemas:
  - name: Category
    fields:
      - name: title
        type: string
        sortable: true
        filter: [GroupEqual, GroupArray]
    edges:
      - name: pets
        target: Pet
        filter: [Edge, IsNil]
  - name: Pet
    description: A pet that can be adopted.
    fields:
      - name: name
        type: string
        filter: GroupEqualExact
      - name: weight
        type: float
        optional: true
        filter: GroupLength
    edges:
      - name: categories
        target: Category
    annotations:
      maxItemsPerPage: 20
"#;

const CONFIG_YAML: &str = r#"
handler: axum
withTesting: true
itemsPerPage: 50
globalRequestHeaders:
  X-Request-Id:
    description: Unique request identifier.
globalResponseHeaders:
  X-Ratelimit-Remaining:
    schema:
      type: integer
"#;

fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn load(dir: &Path) -> (SchemaGraph, Config) {
    let graph = SchemaGraph::load(&write_file(dir, "schema.yaml", SCHEMA_YAML)).unwrap();
    let config = Config::load(&write_file(dir, "restforge.yaml", CONFIG_YAML)).unwrap();
    (graph, config)
}

#[test]
fn test_generate_to_directory() {
    let temp_dir = TempDir::new().unwrap();
    let (graph, config) = load(temp_dir.path());

    let output_dir = temp_dir.path().join("out");
    let output = SpecGenerator::new(config).run(&graph, &output_dir).unwrap();

    let spec_path = output_dir.join(DEFAULT_SPEC_PATH);
    assert_eq!(output.spec_path.as_deref(), Some(spec_path.as_path()));
    assert!(spec_path.exists());
    assert!(output_dir.join("rest/handlers.rs").exists());
    assert!(output_dir.join("rest/resttest.rs").exists());
    assert_eq!(output.handler_files.len(), 2);

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&spec_path).unwrap()).unwrap();
    assert_eq!(json["openapi"], OPENAPI_VERSION);
    assert!(json["paths"][SPEC_ENDPOINT]["get"].is_object());
    assert!(json["paths"]["/categories/{id}/pets"]["get"].is_object());
    assert_eq!(
        json["components"]["schemas"]["Pet"]["description"],
        "A pet that can be adopted."
    );

    let handlers = fs::read_to_string(output_dir.join("rest/handlers.rs")).unwrap();
    assert!(handlers.contains("fn list_categories"));
    assert!(handlers.contains("\"/openapi.json\""));
}

#[test]
fn test_generated_document_policies() {
    let temp_dir = TempDir::new().unwrap();
    let (graph, config) = load(temp_dir.path());
    let output = SpecGenerator::new(config)
        .run(&graph, temp_dir.path())
        .unwrap();
    let spec = output.spec;

    // itemsPerPage is clamped per schema to its own maximum.
    let pets = spec.operation("/pets", "get").unwrap();
    let per_page = pets.parameter("per_page").unwrap();
    assert_eq!(per_page.schema["maximum"], 20);
    assert_eq!(per_page.schema["default"], 20);

    let categories = spec.operation("/categories", "get").unwrap();
    assert_eq!(
        categories.parameter("per_page").unwrap().schema["default"],
        50
    );
    for name in [
        "title.eq",
        "title.containsFold",
        "title.in",
        "title.notIn",
        "pets.name.eqFold",
        "pets.name.null",
        "pets.weight.gt",
        "has.pets",
        "X-Request-Id",
    ] {
        assert!(categories.parameter(name).is_some(), "missing {}", name);
    }
    let weight_lt = categories.parameter("pets.weight.lt").unwrap();
    assert!(weight_lt
        .description
        .as_deref()
        .unwrap()
        .contains("less than"));
    assert!(categories.parameter("title.gt").is_none());

    assert!(!categories.responses.contains_key("404"));
    assert!(!categories.responses.contains_key("409"));
    assert!(spec.operation("/categories", "post").unwrap().responses.contains_key("409"));

    let created = spec.operation("/categories", "post").unwrap().responses["201"]
        .as_item()
        .unwrap();
    assert!(created.headers.contains_key("X-Ratelimit-Remaining"));
}

#[test]
fn test_output_is_deterministic() {
    let temp_dir = TempDir::new().unwrap();

    let render = |name: &str| {
        let (graph, config) = load(temp_dir.path());
        let output_dir = temp_dir.path().join(name);
        SpecGenerator::new(config).run(&graph, &output_dir).unwrap();
        fs::read_to_string(output_dir.join(DEFAULT_SPEC_PATH)).unwrap()
    };

    assert_eq!(render("first"), render("second"));
}

#[test]
fn test_no_handler_only_writes_document() {
    let temp_dir = TempDir::new().unwrap();
    let (graph, mut config) = load(temp_dir.path());
    config.handler = HttpHandler::None;

    let output = SpecGenerator::new(config)
        .run(&graph, temp_dir.path())
        .unwrap();

    assert!(output.handler_files.is_empty());
    assert!(output.spec.operation(SPEC_ENDPOINT, "get").is_none());
    assert!(!temp_dir.path().join("rest/handlers.rs").exists());
    assert!(!temp_dir.path().join("rest/resttest.rs").exists());
}
