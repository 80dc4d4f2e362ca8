//! Handler scaffolding templates

use crate::config::{Config, HttpHandler};
use restforge_common::naming::{pascal_case, snake_case};
use restforge_common::{GeneratorError, OpenApiSpec, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tera::{Context, Tera, Value};
use tracing::debug;

/// Load all templates
pub fn load_templates() -> Result<Tera> {
    let mut tera = Tera::default();

    tera.register_filter("pascal", pascal_filter);
    tera.register_filter("snake", snake_filter);

    tera.add_raw_template(
        "routes_generic.rs",
        include_str!("../templates/routes_generic.rs.tera"),
    )
    .map_err(|e| {
        GeneratorError::Generation(format!("Failed to load routes_generic.rs template: {}", e))
    })?;

    tera.add_raw_template(
        "routes_axum.rs",
        include_str!("../templates/routes_axum.rs.tera"),
    )
    .map_err(|e| {
        GeneratorError::Generation(format!("Failed to load routes_axum.rs template: {}", e))
    })?;

    tera.add_raw_template("resttest.rs", include_str!("../templates/resttest.rs.tera"))
        .map_err(|e| {
            GeneratorError::Generation(format!("Failed to load resttest.rs template: {}", e))
        })?;

    Ok(tera)
}

/// One route of the generated handler module
#[derive(Debug, Clone, Serialize)]
pub struct RouteContext {
    pub method: String,
    pub path: String,
    pub operation_id: String,
    pub summary: Option<String>,
    pub has_body: bool,
    pub path_params: Vec<String>,
}

impl RouteContext {
    /// Routes of every operation that has an operation ID
    pub fn collect(spec: &OpenApiSpec) -> Vec<Self> {
        let mut routes = Vec::new();
        for (path, item) in &spec.paths {
            for (method, op) in item.operations() {
                let Some(operation_id) = &op.operation_id else {
                    continue;
                };
                routes.push(Self {
                    method: method.to_string(),
                    path: path.clone(),
                    operation_id: operation_id.clone(),
                    summary: op.summary.clone(),
                    has_body: op.request_body.is_some(),
                    path_params: path_params(path),
                });
            }
        }
        routes
    }
}

fn path_params(path: &str) -> Vec<String> {
    path.split('/')
        .filter_map(|segment| segment.strip_prefix('{')?.strip_suffix('}'))
        .map(str::to_string)
        .collect()
}

/// A rendered file, not yet written
#[derive(Debug, Clone)]
pub struct RenderedFile {
    /// Path relative to the output directory
    pub path: PathBuf,
    pub content: String,
}

impl RenderedFile {
    /// Write under `output_dir`, creating parent directories
    pub fn write_to(&self, output_dir: &Path) -> Result<PathBuf> {
        let path = output_dir.join(&self.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                GeneratorError::Generation(format!("Failed to create {:?}: {}", parent, e))
            })?;
        }

        fs::write(&path, &self.content).map_err(|e| {
            GeneratorError::Generation(format!("Failed to write {:?}: {}", path, e))
        })?;

        Ok(path)
    }
}

/// Renders handler scaffolding for the configured [`HttpHandler`]
pub struct HandlerRenderer {
    tera: Tera,
}

impl HandlerRenderer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            tera: load_templates()?,
        })
    }

    #[cfg(test)]
    pub(crate) fn from_tera(tera: Tera) -> Self {
        Self { tera }
    }

    /// Render the scaffolding for `spec` in memory. Empty when no handler is
    /// configured.
    pub fn render(&self, spec: &OpenApiSpec, config: &Config) -> Result<Vec<RenderedFile>> {
        let template = match config.handler {
            HttpHandler::Generic => "routes_generic.rs",
            HttpHandler::Axum => "routes_axum.rs",
            HttpHandler::None | HttpHandler::Unsupported(_) => return Ok(Vec::new()),
        };

        let context = self.create_context(spec, config);
        let mut files = vec![self.render_file(template, &context, "handlers.rs")?];
        if config.with_testing {
            files.push(self.render_file("resttest.rs", &context, "resttest.rs")?);
        }

        debug!(files = files.len(), handler = %config.handler, "rendered handler scaffolding");
        Ok(files)
    }

    /// Render into `<output_dir>/rest`, returning the written files
    pub fn render_to(
        &self,
        output_dir: &Path,
        spec: &OpenApiSpec,
        config: &Config,
    ) -> Result<Vec<PathBuf>> {
        self.render(spec, config)?
            .iter()
            .map(|file| file.write_to(output_dir))
            .collect()
    }

    fn render_file(&self, template: &str, context: &Context, name: &str) -> Result<RenderedFile> {
        let content = self
            .tera
            .render(template, context)
            .map_err(|e| GeneratorError::Generation(format!("Template error: {:?}", e)))?;

        Ok(RenderedFile {
            path: Path::new("rest").join(name),
            content,
        })
    }

    fn create_context(&self, spec: &OpenApiSpec, config: &Config) -> Context {
        let mut context = Context::new();
        context.insert("title", &spec.info.title);
        context.insert("version", &spec.info.version);
        context.insert("routes", &RouteContext::collect(spec));
        context.insert("strict_mutate", &config.strict_mutate);
        context
    }
}

/// Filter converting an identifier to PascalCase
fn pascal_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("pascal filter expects a string"))?;

    Ok(Value::String(pascal_case(s)))
}

/// Filter converting an identifier to snake_case
fn snake_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("snake filter expects a string"))?;

    Ok(Value::String(snake_case(s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use restforge_common::spec::Operation;
    use tempfile::TempDir;

    fn sample_spec() -> OpenApiSpec {
        let mut spec = OpenApiSpec::new("Pets", "1.0.0");
        spec.path_mut("/pets/{id}").set_method(
            "get",
            Operation {
                operation_id: Some("readPet".to_string()),
                ..Default::default()
            },
        );
        spec.path_mut("/pets").set_method("get", Operation::default());
        spec
    }

    fn validated(handler: HttpHandler, with_testing: bool) -> Config {
        let mut config = Config::default();
        config.handler = handler;
        config.with_testing = with_testing;
        config.validate().unwrap();
        config
    }

    #[test]
    fn test_load_templates() {
        let tera = load_templates().unwrap();
        let names: Vec<&str> = tera.get_template_names().collect();
        assert!(names.contains(&"routes_axum.rs"));
        assert!(names.contains(&"resttest.rs"));
    }

    #[test]
    fn test_collect_routes_skips_anonymous() {
        let routes = RouteContext::collect(&sample_spec());
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].operation_id, "readPet");
        assert_eq!(routes[0].path_params, vec!["id".to_string()]);
    }

    #[test]
    fn test_render_axum() {
        let temp_dir = TempDir::new().unwrap();
        let renderer = HandlerRenderer::new().unwrap();
        let files = renderer
            .render_to(temp_dir.path(), &sample_spec(), &validated(HttpHandler::Axum, true))
            .unwrap();

        assert_eq!(files.len(), 2);
        let handlers = fs::read_to_string(temp_dir.path().join("rest/handlers.rs")).unwrap();
        assert!(handlers.contains("fn read_pet"));
        assert!(handlers.contains("\"/pets/{id}\""));
        assert!(temp_dir.path().join("rest/resttest.rs").exists());
    }

    #[test]
    fn test_render_generic_without_testing() {
        let temp_dir = TempDir::new().unwrap();
        let renderer = HandlerRenderer::new().unwrap();
        let files = renderer
            .render_to(temp_dir.path(), &sample_spec(), &validated(HttpHandler::Generic, false))
            .unwrap();

        assert_eq!(files.len(), 1);
        let handlers = fs::read_to_string(&files[0]).unwrap();
        assert!(handlers.contains("ReadPet"));
    }

    #[test]
    fn test_render_is_in_memory() {
        let temp_dir = TempDir::new().unwrap();
        let renderer = HandlerRenderer::new().unwrap();
        let files = renderer
            .render(&sample_spec(), &validated(HttpHandler::Axum, false))
            .unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, Path::new("rest/handlers.rs"));
        assert!(files[0].content.contains("fn read_pet"));
        assert!(!temp_dir.path().join("rest").exists());

        let written = files[0].write_to(temp_dir.path()).unwrap();
        assert_eq!(written, temp_dir.path().join("rest/handlers.rs"));
        assert!(written.exists());
    }

    #[test]
    fn test_render_none_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let renderer = HandlerRenderer::new().unwrap();
        let files = renderer
            .render_to(temp_dir.path(), &sample_spec(), &validated(HttpHandler::None, false))
            .unwrap();

        assert!(files.is_empty());
        assert!(!temp_dir.path().join("rest").exists());
    }

    #[test]
    fn test_case_filters() {
        let args = HashMap::new();
        assert_eq!(
            pascal_filter(&Value::String("list_pets".into()), &args).unwrap(),
            Value::String("ListPets".into())
        );
        assert_eq!(
            snake_filter(&Value::String("readPetOwner".into()), &args).unwrap(),
            Value::String("read_pet_owner".into())
        );
        assert!(snake_filter(&Value::Bool(true), &args).is_err());
    }
}
