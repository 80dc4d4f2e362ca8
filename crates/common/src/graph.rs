//! Schema graph
//!
//! The declarative description of entities, their fields and the edges
//! between them. This is the input of every generation run; it is loaded
//! from JSON or YAML and treated as read-only afterwards.

use crate::{GeneratorError, Operation, Predicate, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Root of a schema graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaGraph {
    #[serde(default)]
    pub schemas: Vec<SchemaNode>,
}

impl SchemaGraph {
    pub fn new(schemas: Vec<SchemaNode>) -> Self {
        Self { schemas }
    }

    /// Parse a schema graph from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| GeneratorError::Parse(format!("Failed to parse schema graph JSON: {}", e)))
    }

    /// Parse a schema graph from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a schema graph from a `.json`, `.yaml` or `.yml` file and check
    /// that it is internally consistent
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            GeneratorError::Parse(format!("Failed to read schema file {:?}: {}", path, e))
        })?;

        let graph = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content)?,
            _ => Self::from_json(&content)?,
        };

        graph.check()?;
        Ok(graph)
    }

    /// Look up a schema by name
    pub fn node(&self, name: &str) -> Option<&SchemaNode> {
        self.schemas.iter().find(|node| node.name == name)
    }

    /// Reject duplicate schema names and edges pointing at unknown schemas
    pub fn check(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for node in &self.schemas {
            if !seen.insert(node.name.as_str()) {
                return Err(GeneratorError::Parse(format!(
                    "schema {:?} is defined more than once",
                    node.name
                )));
            }
        }

        for node in &self.schemas {
            for edge in &node.edges {
                if self.node(&edge.target).is_none() {
                    return Err(GeneratorError::Parse(format!(
                        "edge {:?} on schema {:?} points at unknown schema {:?}",
                        edge.name, node.name, edge.target
                    )));
                }
            }
        }

        Ok(())
    }
}

/// A single entity in the schema graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaNode {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub fields: Vec<FieldDef>,

    #[serde(default)]
    pub edges: Vec<EdgeDef>,

    #[serde(default)]
    pub annotations: SchemaAnnotations,
}

impl SchemaNode {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            fields: Vec::new(),
            edges: Vec::new(),
            annotations: SchemaAnnotations::default(),
        }
    }

    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_edge(mut self, edge: EdgeDef) -> Self {
        self.edges.push(edge);
        self
    }

    /// The identifier field: a declared `id` field, or an implicit integer one
    pub fn id_field(&self) -> FieldDef {
        self.fields
            .iter()
            .find(|f| f.name == "id")
            .cloned()
            .unwrap_or_else(|| {
                let mut id = FieldDef::new("id", FieldType::Integer);
                id.immutable = true;
                id.sortable = true;
                id
            })
    }

    /// Declared fields, excluding `id`
    pub fn data_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.name != "id")
    }

    /// Fields that may be used for sorting, `id` included
    pub fn sortable_fields(&self) -> Vec<String> {
        let mut names = Vec::new();
        let id = self.id_field();
        if id.sortable {
            names.push(id.name);
        }
        names.extend(
            self.data_fields()
                .filter(|f| f.sortable && !f.sensitive)
                .map(|f| f.name.clone()),
        );
        names
    }
}

/// Per-schema overrides of the generation-wide policy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaAnnotations {
    /// Exclude the schema from the generated document
    #[serde(default)]
    pub skip: bool,

    /// Operations to generate instead of the configured defaults
    #[serde(default)]
    pub operations: Option<Vec<Operation>>,

    /// Force pagination on or off for this schema's list endpoints
    #[serde(default)]
    pub pagination: Option<bool>,

    #[serde(default)]
    pub min_items_per_page: Option<u32>,

    #[serde(default)]
    pub max_items_per_page: Option<u32>,

    #[serde(default)]
    pub items_per_page: Option<u32>,
}

/// A field of a schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    pub name: String,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Not required on create
    #[serde(default)]
    pub optional: bool,

    /// May be null
    #[serde(default)]
    pub nillable: bool,

    /// Never returned in responses
    #[serde(default)]
    pub sensitive: bool,

    /// Cannot be changed after create
    #[serde(default)]
    pub immutable: bool,

    #[serde(default)]
    pub description: Option<String>,

    /// Filter operations exposed on list endpoints
    #[serde(default)]
    pub filter: Predicate,

    #[serde(default)]
    pub sortable: bool,

    /// Allowed values of an `enum` field
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

impl FieldDef {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            optional: false,
            nillable: false,
            sensitive: false,
            immutable: false,
            description: None,
            filter: Predicate::NONE,
            sortable: false,
            values: Vec::new(),
        }
    }

    pub fn with_filter(mut self, filter: Predicate) -> Self {
        self.filter = filter;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Whether the value domain is textual. Ordering filters on textual
    /// fields compare length rather than magnitude.
    pub fn is_textual(&self) -> bool {
        self.field_type == FieldType::String
    }

    /// JSON schema of the bare value type
    pub fn value_schema(&self) -> Value {
        let mut schema = self.field_type.json_schema();
        if self.field_type == FieldType::Enum && !self.values.is_empty() {
            schema["enum"] = json!(self.values);
        }
        schema
    }

    /// JSON schema of the field as a property, honoring nillability
    pub fn json_schema(&self) -> Value {
        let mut schema = self.value_schema();
        if self.nillable {
            schema["nullable"] = Value::Bool(true);
        }
        if let Some(description) = &self.description {
            schema["description"] = Value::String(description.clone());
        }
        schema
    }
}

/// Value domain of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    Time,
    Uuid,
    Bytes,
    Json,
    Enum,
}

impl FieldType {
    pub fn json_schema(&self) -> Value {
        match self {
            FieldType::String => json!({ "type": "string" }),
            FieldType::Integer => json!({ "type": "integer" }),
            FieldType::Float => json!({ "type": "number", "format": "double" }),
            FieldType::Boolean => json!({ "type": "boolean" }),
            FieldType::Time => json!({ "type": "string", "format": "date-time" }),
            FieldType::Uuid => json!({ "type": "string", "format": "uuid" }),
            FieldType::Bytes => json!({ "type": "string", "format": "byte" }),
            FieldType::Json => json!({}),
            FieldType::Enum => json!({ "type": "string" }),
        }
    }
}

/// A relation from one schema to another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDef {
    pub name: String,

    /// Name of the target schema
    pub target: String,

    /// At most one target entity
    #[serde(default)]
    pub unique: bool,

    #[serde(default)]
    pub required: bool,

    /// Overrides the configured eager-load default
    #[serde(default)]
    pub eager_load: Option<bool>,

    /// Overrides whether a dedicated endpoint is generated for the edge
    #[serde(default)]
    pub disable_endpoint: Option<bool>,

    /// `EDGE` exposes the target's filters through this edge; `IS_NIL`
    /// exposes a `has.<edge>` existence filter.
    #[serde(default)]
    pub filter: Predicate,

    #[serde(default)]
    pub description: Option<String>,
}

impl EdgeDef {
    pub fn new(name: &str, target: &str) -> Self {
        Self {
            name: name.to_string(),
            target: target.to_string(),
            unique: false,
            required: false,
            eager_load: None,
            disable_endpoint: None,
            filter: Predicate::NONE,
            description: None,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn eager(mut self, eager: bool) -> Self {
        self.eager_load = Some(eager);
        self
    }

    pub fn with_filter(mut self, filter: Predicate) -> Self {
        self.filter = filter;
        self
    }
}
