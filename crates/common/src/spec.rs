//! OpenAPI 3.0 document model
//!
//! The subset of the OpenAPI document the generator emits. Schemas are kept
//! as raw JSON values; every map is a `BTreeMap` so the serialized document
//! is byte-stable across runs.

use crate::{Result, OPENAPI_VERSION};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// OpenAPI document root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApiSpec {
    /// OpenAPI version (e.g., "3.0.3")
    pub openapi: String,

    /// API metadata
    pub info: Info,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,

    /// API paths (endpoints)
    #[serde(default)]
    pub paths: BTreeMap<String, PathItem>,

    /// Reusable components
    #[serde(default, skip_serializing_if = "Components::is_empty")]
    pub components: Components,

    /// Global security requirements
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<BTreeMap<String, Vec<String>>>,
}

impl Default for OpenApiSpec {
    fn default() -> Self {
        Self::new("API", "1.0.0")
    }
}

impl OpenApiSpec {
    pub fn new(title: &str, version: &str) -> Self {
        Self {
            openapi: OPENAPI_VERSION.to_string(),
            info: Info {
                title: title.to_string(),
                version: version.to_string(),
                description: None,
            },
            servers: Vec::new(),
            tags: Vec::new(),
            paths: BTreeMap::new(),
            components: Components::default(),
            security: Vec::new(),
        }
    }

    /// Path item for `path`, created empty if missing
    pub fn path_mut(&mut self, path: &str) -> &mut PathItem {
        self.paths.entry(path.to_string()).or_default()
    }

    /// Operation registered for `method` on `path`
    pub fn operation(&self, path: &str, method: &str) -> Option<&Operation> {
        self.paths.get(path).and_then(|item| item.get_method(method))
    }

    /// Every operation as `(path, method, operation)`, ordered by path then
    /// method
    pub fn operations_mut(&mut self) -> Vec<(&str, &'static str, &mut Operation)> {
        let mut ops = Vec::new();
        for (path, item) in self.paths.iter_mut() {
            for (method, op) in item.operations_mut() {
                ops.push((path.as_str(), method, op));
            }
        }
        ops
    }

    /// Number of operations across all paths
    pub fn operation_count(&self) -> usize {
        self.paths.values().map(|item| item.operations().count()).sum()
    }

    /// Add a tag unless one with the same name exists
    pub fn add_tag(&mut self, name: &str, description: Option<String>) {
        if self.tags.iter().all(|tag| tag.name != name) {
            self.tags.push(Tag {
                name: name.to_string(),
                description,
            });
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// API information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    pub title: String,

    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Server information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Path item (operations for a path)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,

    /// Parameters shared by every operation on the path
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<RefOr<Parameter>>,
}

impl PathItem {
    pub fn get_method(&self, method: &str) -> Option<&Operation> {
        match method {
            "get" => self.get.as_ref(),
            "post" => self.post.as_ref(),
            "put" => self.put.as_ref(),
            "patch" => self.patch.as_ref(),
            "delete" => self.delete.as_ref(),
            _ => None,
        }
    }

    /// Store `op` under `method`, replacing any existing operation
    pub fn set_method(&mut self, method: &str, op: Operation) {
        let slot = match method {
            "get" => &mut self.get,
            "post" => &mut self.post,
            "put" => &mut self.put,
            "patch" => &mut self.patch,
            "delete" => &mut self.delete,
            _ => return,
        };
        *slot = Some(op);
    }

    pub fn operations(&self) -> impl Iterator<Item = (&'static str, &Operation)> + '_ {
        [
            ("get", &self.get),
            ("post", &self.post),
            ("put", &self.put),
            ("patch", &self.patch),
            ("delete", &self.delete),
        ]
        .into_iter()
        .filter_map(|(method, op)| op.as_ref().map(|op| (method, op)))
    }

    pub fn operations_mut(&mut self) -> impl Iterator<Item = (&'static str, &mut Operation)> + '_ {
        [
            ("get", &mut self.get),
            ("post", &mut self.post),
            ("put", &mut self.put),
            ("patch", &mut self.patch),
            ("delete", &mut self.delete),
        ]
        .into_iter()
        .filter_map(|(method, op)| op.as_mut().map(|op| (method, op)))
    }
}

/// HTTP operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<RefOr<Parameter>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,

    /// Status code (or "default") → response
    #[serde(default)]
    pub responses: BTreeMap<String, RefOr<Response>>,
}

impl Operation {
    /// Whether an inline parameter with this name and location exists
    pub fn has_parameter(&self, name: &str, location: ParameterLocation) -> bool {
        self.parameters.iter().any(|param| match param {
            RefOr::Item(param) => param.name == name && param.location == location,
            RefOr::Ref { .. } => false,
        })
    }

    /// Inline parameter by name
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find_map(|param| match param {
            RefOr::Item(param) if param.name == name => Some(param),
            _ => None,
        })
    }
}

/// Either an inline item or a `$ref` to a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RefOr<T> {
    Ref {
        #[serde(rename = "$ref")]
        reference: String,
    },
    Item(T),
}

impl<T> RefOr<T> {
    pub fn reference(reference: impl Into<String>) -> Self {
        RefOr::Ref {
            reference: reference.into(),
        }
    }

    pub fn as_item(&self) -> Option<&T> {
        match self {
            RefOr::Item(item) => Some(item),
            RefOr::Ref { .. } => None,
        }
    }

    pub fn as_item_mut(&mut self) -> Option<&mut T> {
        match self {
            RefOr::Item(item) => Some(item),
            RefOr::Ref { .. } => None,
        }
    }
}

/// Location of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Query,
    Header,
    Path,
    Cookie,
}

/// Parameter definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,

    #[serde(rename = "in")]
    pub location: ParameterLocation,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub schema: Value,

    /// Serialization of array values (`form` + `explode` for repeated keys)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explode: Option<bool>,
}

impl Parameter {
    pub fn query(name: &str, description: &str, schema: Value) -> Self {
        Self {
            name: name.to_string(),
            location: ParameterLocation::Query,
            description: Some(description.to_string()),
            required: false,
            schema,
            explode: None,
        }
    }

    pub fn path(name: &str, description: &str, schema: Value) -> Self {
        Self {
            name: name.to_string(),
            location: ParameterLocation::Path,
            description: Some(description.to_string()),
            required: true,
            schema,
            explode: None,
        }
    }
}

/// Request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub content: BTreeMap<String, MediaType>,

    #[serde(default)]
    pub required: bool,
}

impl RequestBody {
    pub fn json(schema: Value) -> Self {
        Self {
            description: None,
            content: json_content(schema),
            required: true,
        }
    }
}

/// Response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub description: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, Header>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub content: BTreeMap<String, MediaType>,
}

impl Response {
    pub fn new(description: &str) -> Self {
        Self {
            description: description.to_string(),
            headers: BTreeMap::new(),
            content: BTreeMap::new(),
        }
    }

    pub fn json(description: &str, schema: Value) -> Self {
        Self {
            description: description.to_string(),
            headers: BTreeMap::new(),
            content: json_content(schema),
        }
    }
}

/// Response header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub schema: Value,
}

/// Media type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    #[serde(default)]
    pub schema: Value,
}

/// Reusable components
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub schemas: BTreeMap<String, Value>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, Parameter>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub responses: BTreeMap<String, Response>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub security_schemes: BTreeMap<String, Value>,
}

impl Components {
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
            && self.parameters.is_empty()
            && self.responses.is_empty()
            && self.security_schemes.is_empty()
    }
}

/// `$ref` path of a component schema
pub fn schema_ref(name: &str) -> String {
    format!("#/components/schemas/{}", name)
}

/// `$ref` path of a component response
pub fn response_ref(name: &str) -> String {
    format!("#/components/responses/{}", name)
}

fn json_content(schema: Value) -> BTreeMap<String, MediaType> {
    let mut content = BTreeMap::new();
    content.insert("application/json".to_string(), MediaType { schema });
    content
}
