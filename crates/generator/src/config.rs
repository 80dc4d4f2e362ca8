//! Generation configuration
//!
//! Generation-wide policy (pagination bounds, default operations, global
//! headers and error responses, handler target, feature toggles) plus the
//! three pipeline hooks. A `Config` is validated once, then read-only.

use crate::writer::{DocumentSink, JsonSink};
use restforge_common::graph::{EdgeDef, SchemaAnnotations, SchemaNode};
use restforge_common::{GeneratorError, OpenApiSpec, Operation, Result, SchemaGraph};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

pub const DEFAULT_MIN_ITEMS_PER_PAGE: u32 = 1;
pub const DEFAULT_MAX_ITEMS_PER_PAGE: u32 = 100;
pub const DEFAULT_ITEMS_PER_PAGE: u32 = 10;

/// Hook receiving the schema graph and the in-progress document
pub type GraphHook =
    Box<dyn Fn(&SchemaGraph, &mut OpenApiSpec) -> anyhow::Result<()> + Send + Sync>;

/// Hook receiving only the finished document
pub type SpecHook = Box<dyn Fn(&mut OpenApiSpec) -> anyhow::Result<()> + Send + Sync>;

/// Main configuration for a generation run
#[derive(Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    #[serde(skip)]
    validated: bool,

    /// Base document that generated paths and schemas are merged into. Use
    /// it to provide API info, servers, security schemes, etc.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec: Option<OpenApiSpec>,

    /// Disables pagination for every schema unless re-enabled per schema
    pub disable_pagination: bool,

    /// Default minimum page size for paginated calls
    pub min_items_per_page: u32,

    /// Default maximum page size for paginated calls
    pub max_items_per_page: u32,

    /// Default page size for paginated calls
    pub items_per_page: u32,

    /// Eager-load every edge unless overridden per edge
    pub default_eager_load: bool,

    /// Keep pagination on edge endpoints even when the edge is eager-loaded
    pub disable_eager_load_non_paged_opt: bool,

    /// Skip the dedicated endpoint of edges that are eager-loaded
    pub disable_eager_loaded_endpoints: bool,

    /// Tag read/list operations with the schemas of their eager-loaded edges
    pub add_edges_to_tags: bool,

    /// Operations generated for every schema unless overridden. Empty means
    /// every operation.
    pub default_operations: Vec<Operation>,

    /// Headers added to every request (e.g. `X-Request-Id`)
    pub global_request_headers: BTreeMap<String, RequestHeader>,

    /// Headers added to every response (e.g. `X-Ratelimit-Remaining`)
    pub global_response_headers: BTreeMap<String, ResponseHeader>,

    /// Status code → error response added to every operation. Keys must be
    /// HTTP error codes. Empty means [`default_error_responses`].
    pub global_error_responses: BTreeMap<u16, ErrorResponse>,

    /// Server framework to generate handlers for
    pub handler: HttpHandler,

    /// Reject unknown fields in create/update bodies
    pub strict_mutate: bool,

    /// Do not expose the document itself at `/openapi.json`
    pub disable_spec_handler: bool,

    /// Accept a client-supplied `id` on create
    #[serde(rename = "allowClientUUIDs", alias = "allowClientUuids")]
    pub allow_client_uuids: bool,

    /// Keep optional output fields optional instead of always present
    #[serde(rename = "disablePatchJSONTag", alias = "disablePatchJsonTag")]
    pub disable_patch_json_tag: bool,

    /// Generate test helpers next to the handlers
    pub with_testing: bool,

    /// Runs before any schema-driven generation
    #[serde(skip)]
    pub pre_generate_hook: Option<GraphHook>,

    /// Runs after generation, before global headers and errors are applied
    #[serde(skip)]
    pub post_generate_hook: Option<GraphHook>,

    /// Runs directly before the document is written
    #[serde(skip)]
    pub pre_write_hook: Option<SpecHook>,

    /// Output sink. Defaults to `<output>/rest/openapi.json`.
    #[serde(skip)]
    pub writer: Option<Box<dyn DocumentSink>>,
}

impl Config {
    /// Parse a configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| GeneratorError::Parse(format!("Failed to parse config JSON: {}", e)))
    }

    /// Parse a configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a configuration from a `.json`, `.yaml` or `.yml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            GeneratorError::Parse(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            _ => Self::from_json(&content),
        }
    }

    pub fn with_pre_generate_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&SchemaGraph, &mut OpenApiSpec) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.pre_generate_hook = Some(Box::new(hook));
        self
    }

    pub fn with_post_generate_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&SchemaGraph, &mut OpenApiSpec) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.post_generate_hook = Some(Box::new(hook));
        self
    }

    pub fn with_pre_write_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut OpenApiSpec) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.pre_write_hook = Some(Box::new(hook));
        self
    }

    /// Write the document as pretty JSON to `writer` instead of a file
    pub fn with_writer<W: Write + Send + 'static>(self, writer: W) -> Self {
        self.with_sink(JsonSink::new(writer))
    }

    pub fn with_sink<S: DocumentSink + 'static>(mut self, sink: S) -> Self {
        self.writer = Some(Box::new(sink));
        self
    }

    pub fn is_validated(&self) -> bool {
        self.validated
    }

    /// Normalize and check the configuration.
    ///
    /// Pagination bounds are clamped, unset defaults are filled in, and
    /// caller mistakes (non-error status codes, unknown handlers) are
    /// reported. Once this succeeds, later calls return immediately without
    /// touching any field.
    pub fn validate(&mut self) -> Result<()> {
        if self.validated {
            return Ok(());
        }

        if self.min_items_per_page < 1 {
            self.min_items_per_page = DEFAULT_MIN_ITEMS_PER_PAGE;
        }

        if self.max_items_per_page < 1 {
            self.max_items_per_page = DEFAULT_MAX_ITEMS_PER_PAGE;
        }

        if self.max_items_per_page < self.min_items_per_page {
            debug!(
                max = self.max_items_per_page,
                min = self.min_items_per_page,
                "raising maxItemsPerPage to minItemsPerPage"
            );
            self.max_items_per_page = self.min_items_per_page;
        }

        if self.items_per_page < 1 {
            self.items_per_page = DEFAULT_ITEMS_PER_PAGE;
        }

        if self.items_per_page < self.min_items_per_page {
            self.items_per_page = self.min_items_per_page;
        }

        if self.items_per_page > self.max_items_per_page {
            debug!(
                items = self.items_per_page,
                max = self.max_items_per_page,
                "lowering itemsPerPage to maxItemsPerPage"
            );
            self.items_per_page = self.max_items_per_page;
        }

        if self.default_operations.is_empty() {
            self.default_operations = Operation::ALL.to_vec();
        }

        if self.global_error_responses.is_empty() {
            self.global_error_responses = default_error_responses();
        }

        if let Some(code) = self.global_error_responses.keys().find(|code| **code < 400) {
            return Err(GeneratorError::Config(format!(
                "error response defined with status code {}, which is not an HTTP error code",
                code
            )));
        }

        if let HttpHandler::Unsupported(name) = &self.handler {
            return Err(GeneratorError::Config(format!(
                "unsupported handler provided: {:?} (expected one of: {})",
                name,
                HttpHandler::SUPPORTED
                    .iter()
                    .map(|h| h.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        if self.handler.is_none() && self.with_testing {
            debug!("no handler configured, disabling test helper generation");
            self.with_testing = false;
        }

        self.validated = true;
        Ok(())
    }

    /// Operations to generate for `node`
    pub fn operations_for(&self, node: &SchemaNode) -> Vec<Operation> {
        let mut ops = node
            .annotations
            .operations
            .clone()
            .unwrap_or_else(|| self.default_operations.clone());
        ops.sort();
        ops.dedup();
        ops
    }

    /// Whether `edge` is eager-loaded
    pub fn eager_load(&self, edge: &EdgeDef) -> bool {
        edge.eager_load.unwrap_or(self.default_eager_load)
    }

    /// Page size bounds for a schema's list endpoints, or `None` when the
    /// schema is not paginated
    pub fn page_bounds(&self, annotations: &SchemaAnnotations) -> Option<PageBounds> {
        if !annotations.pagination.unwrap_or(!self.disable_pagination) {
            return None;
        }

        let min = annotations
            .min_items_per_page
            .filter(|v| *v >= 1)
            .unwrap_or(self.min_items_per_page)
            .max(1);
        let max = annotations
            .max_items_per_page
            .filter(|v| *v >= 1)
            .unwrap_or(self.max_items_per_page)
            .max(min);
        let default = annotations
            .items_per_page
            .filter(|v| *v >= 1)
            .unwrap_or(self.items_per_page)
            .clamp(min, max);

        Some(PageBounds { min, max, default })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("validated", &self.validated)
            .field("spec", &self.spec.as_ref().map(|s| &s.info.title))
            .field("disable_pagination", &self.disable_pagination)
            .field("min_items_per_page", &self.min_items_per_page)
            .field("max_items_per_page", &self.max_items_per_page)
            .field("items_per_page", &self.items_per_page)
            .field("default_eager_load", &self.default_eager_load)
            .field(
                "disable_eager_load_non_paged_opt",
                &self.disable_eager_load_non_paged_opt,
            )
            .field(
                "disable_eager_loaded_endpoints",
                &self.disable_eager_loaded_endpoints,
            )
            .field("add_edges_to_tags", &self.add_edges_to_tags)
            .field("default_operations", &self.default_operations)
            .field("global_request_headers", &self.global_request_headers)
            .field("global_response_headers", &self.global_response_headers)
            .field("global_error_responses", &self.global_error_responses)
            .field("handler", &self.handler)
            .field("strict_mutate", &self.strict_mutate)
            .field("disable_spec_handler", &self.disable_spec_handler)
            .field("allow_client_uuids", &self.allow_client_uuids)
            .field("disable_patch_json_tag", &self.disable_patch_json_tag)
            .field("with_testing", &self.with_testing)
            .field("pre_generate_hook", &self.pre_generate_hook.is_some())
            .field("post_generate_hook", &self.post_generate_hook.is_some())
            .field("pre_write_hook", &self.pre_write_hook.is_some())
            .field("writer", &self.writer.is_some())
            .finish()
    }
}

/// Resolved page size bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageBounds {
    pub min: u32,
    pub max: u32,
    pub default: u32,
}

/// Server framework targeted by generated handlers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HttpHandler {
    /// Only the document is generated
    #[default]
    None,
    /// Framework-agnostic handler trait and route table
    Generic,
    /// Router for the `axum` framework
    Axum,
    /// Anything else; rejected by [`Config::validate`]
    Unsupported(String),
}

impl HttpHandler {
    pub const SUPPORTED: [HttpHandler; 2] = [HttpHandler::Generic, HttpHandler::Axum];

    pub fn as_str(&self) -> &str {
        match self {
            HttpHandler::None => "none",
            HttpHandler::Generic => "generic",
            HttpHandler::Axum => "axum",
            HttpHandler::Unsupported(name) => name,
        }
    }

    pub fn is_none(&self) -> bool {
        *self == HttpHandler::None
    }
}

impl FromStr for HttpHandler {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "" | "none" => HttpHandler::None,
            "generic" => HttpHandler::Generic,
            "axum" => HttpHandler::Axum,
            _ => HttpHandler::Unsupported(s.to_string()),
        })
    }
}

impl From<String> for HttpHandler {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(handler) => handler,
            Err(never) => match never {},
        }
    }
}

impl From<HttpHandler> for String {
    fn from(handler: HttpHandler) -> Self {
        handler.as_str().to_string()
    }
}

impl fmt::Display for HttpHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header added to every request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestHeader {
    pub description: Option<String>,
    pub required: bool,
    pub schema: Value,
}

impl Default for RequestHeader {
    fn default() -> Self {
        Self {
            description: None,
            required: false,
            schema: json!({ "type": "string" }),
        }
    }
}

/// Header added to every response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseHeader {
    pub description: Option<String>,
    pub required: bool,
    pub schema: Value,
}

impl Default for ResponseHeader {
    fn default() -> Self {
        Self {
            description: None,
            required: false,
            schema: json!({ "type": "string" }),
        }
    }
}

/// Error response added to every operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub description: String,

    /// Body schema; the shared `ErrorBody` schema when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

impl ErrorResponse {
    pub fn new(description: &str) -> Self {
        Self {
            description: description.to_string(),
            schema: None,
        }
    }
}

/// Error responses used when none are configured
pub fn default_error_responses() -> BTreeMap<u16, ErrorResponse> {
    [
        (400, "Invalid input or malformed request."),
        (401, "Unauthorized."),
        (403, "Forbidden."),
        (404, "Entity not found."),
        (409, "Conflict with the current state of the entity."),
        (429, "Rate limit exceeded."),
        (500, "Internal server error."),
    ]
    .into_iter()
    .map(|(code, description)| (code, ErrorResponse::new(description)))
    .collect()
}

/// JSON body shared by the default error responses
pub fn error_body_schema() -> Value {
    json!({
        "type": "object",
        "required": ["code", "error", "type", "timestamp"],
        "properties": {
            "code": { "type": "integer", "description": "HTTP response code." },
            "error": { "type": "string", "description": "Description of the error." },
            "type": { "type": "string", "description": "HTTP status text." },
            "request_id": { "type": "string", "description": "Request ID, if any." },
            "timestamp": { "type": "string", "format": "date-time" }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_defaults() {
        let mut config = Config::default();
        config.validate().unwrap();

        assert_eq!(config.min_items_per_page, DEFAULT_MIN_ITEMS_PER_PAGE);
        assert_eq!(config.max_items_per_page, DEFAULT_MAX_ITEMS_PER_PAGE);
        assert_eq!(config.items_per_page, DEFAULT_ITEMS_PER_PAGE);
        assert_eq!(config.default_operations, Operation::ALL.to_vec());
        assert_eq!(config.global_error_responses, default_error_responses());
        assert!(config.is_validated());
    }

    #[test]
    fn test_validate_clamps_items_per_page_to_max() {
        let mut config = Config {
            min_items_per_page: 0,
            max_items_per_page: 5,
            items_per_page: 50,
            ..Default::default()
        };
        config.validate().unwrap();

        assert_eq!(config.min_items_per_page, 1);
        assert_eq!(config.max_items_per_page, 5);
        assert_eq!(config.items_per_page, 5);
    }

    #[test]
    fn test_validate_raises_max_and_default_to_min() {
        let mut config = Config {
            min_items_per_page: 20,
            max_items_per_page: 10,
            items_per_page: 3,
            ..Default::default()
        };
        config.validate().unwrap();

        assert_eq!(config.max_items_per_page, 20);
        assert_eq!(config.items_per_page, 20);
    }

    #[test]
    fn test_validate_rejects_non_error_status() {
        let mut config = Config::default();
        config
            .global_error_responses
            .insert(200, ErrorResponse::new("OK"));

        let err = config.validate().unwrap_err();
        assert!(matches!(err, GeneratorError::Config(_)));
        assert!(err.to_string().contains("200"));
        assert!(!config.is_validated());
    }

    #[test]
    fn test_validate_rejects_unsupported_handler() {
        let mut config = Config {
            handler: HttpHandler::from("gin".to_string()),
            ..Default::default()
        };

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("unsupported handler"));
        assert!(!config.is_validated());
    }

    #[test]
    fn test_validate_disables_testing_without_handler() {
        let mut config = Config {
            handler: HttpHandler::None,
            with_testing: true,
            ..Default::default()
        };
        config.validate().unwrap();
        assert!(!config.with_testing);

        let mut config = Config {
            handler: HttpHandler::Axum,
            with_testing: true,
            ..Default::default()
        };
        config.validate().unwrap();
        assert!(config.with_testing);
    }

    #[test]
    fn test_validate_twice_is_noop() {
        let mut config = Config::default();
        config.validate().unwrap();

        config.items_per_page = 5000;
        config.with_testing = true;
        config.validate().unwrap();

        assert_eq!(config.items_per_page, 5000);
        assert!(config.with_testing);
    }

    #[test]
    fn test_validate_keeps_custom_errors() {
        let mut config = Config::default();
        config
            .global_error_responses
            .insert(418, ErrorResponse::new("Teapot."));
        config.validate().unwrap();

        assert_eq!(config.global_error_responses.len(), 1);
        assert!(config.global_error_responses.contains_key(&418));
    }

    #[test]
    fn test_from_json_surface_names() {
        let config = Config::from_json(
            r#"{
                "minItemsPerPage": 2,
                "maxItemsPerPage": 50,
                "itemsPerPage": 25,
                "defaultOperations": ["read", "list"],
                "globalErrorResponses": { "404": { "description": "Missing." } },
                "globalRequestHeaders": { "X-Request-Id": { "required": true } },
                "handler": "axum",
                "allowClientUUIDs": true,
                "disablePatchJSONTag": true,
                "withTesting": true
            }"#,
        )
        .unwrap();

        assert_eq!(config.min_items_per_page, 2);
        assert_eq!(config.default_operations, vec![Operation::Read, Operation::List]);
        assert_eq!(config.global_error_responses[&404].description, "Missing.");
        assert!(config.global_request_headers["X-Request-Id"].required);
        assert_eq!(
            config.global_request_headers["X-Request-Id"].schema["type"],
            "string"
        );
        assert_eq!(config.handler, HttpHandler::Axum);
        assert!(config.allow_client_uuids);
        assert!(config.disable_patch_json_tag);
        assert!(!config.is_validated());
    }

    #[test]
    fn test_from_yaml() {
        let config = Config::from_yaml(
            "handler: generic\ndisablePagination: true\nglobalErrorResponses:\n  500:\n    description: Boom.\n",
        )
        .unwrap();

        assert_eq!(config.handler, HttpHandler::Generic);
        assert!(config.disable_pagination);
        assert!(config.global_error_responses.contains_key(&500));

        let err = Config::from_yaml("handler: [").unwrap_err();
        assert!(matches!(err, GeneratorError::Yaml(_)));
    }

    #[test]
    fn test_handler_parsing() {
        assert_eq!(HttpHandler::from(String::new()), HttpHandler::None);
        assert_eq!(HttpHandler::from("None".to_string()), HttpHandler::None);
        assert_eq!(
            HttpHandler::from("chi".to_string()),
            HttpHandler::Unsupported("chi".to_string())
        );
        assert_eq!(String::from(HttpHandler::Axum), "axum");
    }

    #[test]
    fn test_page_bounds() {
        let mut config = Config::default();
        config.validate().unwrap();

        let bounds = config.page_bounds(&SchemaAnnotations::default()).unwrap();
        assert_eq!(
            bounds,
            PageBounds {
                min: 1,
                max: 100,
                default: 10
            }
        );

        let overridden = SchemaAnnotations {
            max_items_per_page: Some(5),
            ..Default::default()
        };
        assert_eq!(config.page_bounds(&overridden).unwrap().default, 5);

        let disabled = SchemaAnnotations {
            pagination: Some(false),
            ..Default::default()
        };
        assert!(config.page_bounds(&disabled).is_none());

        config.disable_pagination = true;
        assert!(config.page_bounds(&SchemaAnnotations::default()).is_none());
        let forced = SchemaAnnotations {
            pagination: Some(true),
            ..Default::default()
        };
        assert!(config.page_bounds(&forced).is_some());
    }

    #[test]
    fn test_operations_for_override() {
        let mut config = Config::default();
        config.validate().unwrap();

        let mut node = SchemaNode::new("Pet");
        assert_eq!(config.operations_for(&node), Operation::ALL.to_vec());

        node.annotations.operations = Some(vec![Operation::List, Operation::Read]);
        assert_eq!(
            config.operations_for(&node),
            vec![Operation::Read, Operation::List]
        );
    }
}
