//! Hook pipeline
//!
//! Drives a generation run: validate → base document → pre-generate hook →
//! schema-driven generation → post-generate hook → global policies →
//! pre-write hook → write. Any failure stops the run before anything is
//! written.

use crate::config::{Config, GraphHook};
use crate::templates::HandlerRenderer;
use crate::writer::{DocumentSink, FileSink};
use crate::{paths, policy};
use restforge_common::{GeneratorError, HookStage, OpenApiSpec, Result, SchemaGraph};
use std::path::{Path, PathBuf};
use tracing::{debug, info, info_span};

/// Result of a [`SpecGenerator::run`]
#[derive(Debug)]
pub struct GenerationOutput {
    /// The document as written
    pub spec: OpenApiSpec,

    /// File the document was written to, `None` when a custom writer was
    /// configured
    pub spec_path: Option<PathBuf>,

    /// Handler scaffolding and test helper files
    pub handler_files: Vec<PathBuf>,
}

/// OpenAPI document generator
///
/// Owns the configuration for the lifetime of the run; the configuration is
/// validated on the first call to [`SpecGenerator::generate`].
#[derive(Debug)]
pub struct SpecGenerator {
    config: Config,
}

impl SpecGenerator {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build the finalized document without writing it
    pub fn generate(&mut self, graph: &SchemaGraph) -> Result<OpenApiSpec> {
        self.config.validate()?;

        let span = info_span!("generate", schemas = graph.schemas.len());
        let _enter = span.enter();

        let mut spec = self.config.spec.clone().unwrap_or_default();

        run_graph_hook(
            HookStage::PreGenerate,
            self.config.pre_generate_hook.as_ref(),
            graph,
            &mut spec,
        )?;

        paths::generate(&self.config, graph, &mut spec)?;
        debug!(
            paths = spec.paths.len(),
            operations = spec.operation_count(),
            "generated paths"
        );

        run_graph_hook(
            HookStage::PostGenerate,
            self.config.post_generate_hook.as_ref(),
            graph,
            &mut spec,
        )?;

        policy::apply(&self.config, &mut spec);

        if let Some(hook) = &self.config.pre_write_hook {
            debug!(stage = %HookStage::PreWrite, "running hook");
            hook(&mut spec).map_err(|e| hook_error(HookStage::PreWrite, e))?;
        }

        Ok(spec)
    }

    /// Generate, write the document and render handler scaffolding
    ///
    /// The document goes to the configured writer, or to
    /// `<output_dir>/rest/openapi.json` when none is set.
    pub fn run(&mut self, graph: &SchemaGraph, output_dir: &Path) -> Result<GenerationOutput> {
        let renderer = HandlerRenderer::new()?;
        self.run_with(&renderer, graph, output_dir)
    }

    fn run_with(
        &mut self,
        renderer: &HandlerRenderer,
        graph: &SchemaGraph,
        output_dir: &Path,
    ) -> Result<GenerationOutput> {
        let spec = self.generate(graph)?;
        // Rendered before the document is written so template errors leave
        // nothing on disk.
        let rendered = renderer.render(&spec, &self.config)?;

        let spec_path = match self.config.writer.as_mut() {
            Some(writer) => {
                writer.write_document(&spec)?;
                None
            }
            None => {
                let mut sink = FileSink::in_output_dir(output_dir);
                sink.write_document(&spec)?;
                Some(sink.path().to_path_buf())
            }
        };

        let handler_files = rendered
            .iter()
            .map(|file| file.write_to(output_dir))
            .collect::<Result<Vec<_>>>()?;

        info!(
            operations = spec.operation_count(),
            handler_files = handler_files.len(),
            "wrote OpenAPI document"
        );

        Ok(GenerationOutput {
            spec,
            spec_path,
            handler_files,
        })
    }
}

/// Generate a document for `graph` with `config` (convenience function)
pub fn generate_spec(graph: &SchemaGraph, config: Config) -> Result<OpenApiSpec> {
    SpecGenerator::new(config).generate(graph)
}

fn run_graph_hook(
    stage: HookStage,
    hook: Option<&GraphHook>,
    graph: &SchemaGraph,
    spec: &mut OpenApiSpec,
) -> Result<()> {
    let Some(hook) = hook else {
        return Ok(());
    };

    debug!(stage = %stage, "running hook");
    hook(graph, spec).map_err(|e| hook_error(stage, e))
}

fn hook_error(stage: HookStage, err: anyhow::Error) -> GeneratorError {
    GeneratorError::Hook {
        stage,
        message: format!("{:#}", err),
    }
}
