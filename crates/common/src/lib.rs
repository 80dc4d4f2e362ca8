//! Common types and utilities for restforge
//!
//! This crate contains the shared intermediate representation used by the
//! generator and CLI: the schema graph, the filter predicate model, the
//! OpenAPI document model and the error type.

pub mod catalog;
pub mod graph;
pub mod naming;
pub mod predicate;
pub mod spec;

pub use catalog::{describe, param_name, param_token, value_schema};
pub use graph::{EdgeDef, FieldDef, FieldType, SchemaAnnotations, SchemaGraph, SchemaNode};
pub use predicate::{FilterOp, Predicate};
pub use spec::OpenApiSpec;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// OpenAPI version emitted by the generator
pub const OPENAPI_VERSION: &str = "3.0.3";

/// Errors that can occur during specification generation
#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{stage} hook failed: {message}")]
    Hook { stage: HookStage, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type for generator operations
pub type Result<T> = std::result::Result<T, GeneratorError>;

/// Point in the pipeline at which a caller-supplied hook runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    PreGenerate,
    PostGenerate,
    PreWrite,
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookStage::PreGenerate => write!(f, "pre-generate"),
            HookStage::PostGenerate => write!(f, "post-generate"),
            HookStage::PreWrite => write!(f, "pre-write"),
        }
    }
}

/// CRUD (plus list) operation generated for a schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Create (method: POST)
    Create,
    /// Read (method: GET)
    Read,
    /// Update (method: PATCH)
    Update,
    /// Delete (method: DELETE)
    Delete,
    /// List (method: GET)
    List,
}

impl Operation {
    /// Every supported operation, in generation order
    pub const ALL: [Operation; 5] = [
        Operation::Create,
        Operation::Read,
        Operation::Update,
        Operation::Delete,
        Operation::List,
    ];

    /// HTTP method used for the operation
    pub fn method(&self) -> &'static str {
        match self {
            Operation::Create => "post",
            Operation::Read | Operation::List => "get",
            Operation::Update => "patch",
            Operation::Delete => "delete",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::List => "list",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_methods() {
        assert_eq!(Operation::Create.method(), "post");
        assert_eq!(Operation::List.method(), "get");
        assert_eq!(Operation::Update.method(), "patch");
    }

    #[test]
    fn test_operation_serde_lowercase() {
        let ops: Vec<Operation> = serde_json::from_str(r#"["create", "list"]"#).unwrap();
        assert_eq!(ops, vec![Operation::Create, Operation::List]);
        assert_eq!(serde_json::to_string(&Operation::Delete).unwrap(), "\"delete\"");
    }

    #[test]
    fn test_hook_error_display() {
        let err = GeneratorError::Hook {
            stage: HookStage::PostGenerate,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "post-generate hook failed: boom");
    }
}
