//! OpenAPI generation for restforge
//!
//! This crate turns a [`SchemaGraph`](restforge_common::SchemaGraph) into an
//! OpenAPI 3 document describing a paginated, filterable REST API, and
//! optionally renders handler scaffolding for a server framework.

pub mod config;
mod paths;
mod pipeline;
pub mod policy;
mod templates;
pub mod writer;

pub use config::{
    default_error_responses, error_body_schema, Config, ErrorResponse, GraphHook, HttpHandler,
    PageBounds, RequestHeader, ResponseHeader, SpecHook,
};
pub use paths::SPEC_ENDPOINT;
pub use pipeline::{generate_spec, GenerationOutput, SpecGenerator};
pub use templates::{load_templates, HandlerRenderer, RenderedFile, RouteContext};
pub use writer::{DocumentSink, FileSink, JsonSink, DEFAULT_SPEC_PATH};
