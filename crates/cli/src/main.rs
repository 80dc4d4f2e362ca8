//! restforge CLI
//!
//! Command-line interface for generating OpenAPI documents and handler
//! scaffolding from a schema graph.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use restforge_common::graph::{FieldDef, FieldType};
use restforge_common::{catalog, Predicate, SchemaGraph};
use restforge_generator::{Config, HttpHandler, SpecGenerator};
use std::path::{Path, PathBuf};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(name = "restforge")]
#[command(version, about = "Generate paginated, filterable REST API specs from a schema graph", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an OpenAPI document (and handlers) from a schema graph
    #[command(after_help = "EXAMPLES:\n  \
        # Generate rest/openapi.json under ./output\n  \
        restforge generate --schema schema.yaml\n\n  \
        # Use a configuration file and generate axum handlers\n  \
        restforge generate \\\n    \
        --schema schema.yaml \\\n    \
        --config restforge.yaml \\\n    \
        --handler axum \\\n    \
        --output ./api\n\n  \
        # Print the document instead of writing it\n  \
        restforge generate --schema schema.json --stdout")]
    Generate {
        /// Path to the schema graph (JSON or YAML)
        #[arg(short, long)]
        schema: PathBuf,

        /// Path to the generation config (JSON or YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Handler framework (overrides the config file)
        #[arg(long)]
        handler: Option<HandlerArg>,

        /// Write the document to stdout instead of the output directory
        #[arg(long)]
        stdout: bool,
    },

    /// Validate a config file and print it with defaults applied
    #[command(after_help = "EXAMPLES:\n  \
        restforge validate --config restforge.yaml")]
    Validate {
        /// Path to the generation config (JSON or YAML)
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Show the query parameters a filter predicate expands to
    #[command(after_help = "EXAMPLES:\n  \
        # Parameters for a string field\n  \
        restforge filters GroupEqual --field name --textual\n\n  \
        # Combine groups and single operations\n  \
        restforge filters GroupLength GTE LTE --field age")]
    Filters {
        /// Predicate names (operations, query tokens or groups)
        #[arg(required = true)]
        names: Vec<String>,

        /// Field the filters apply to
        #[arg(short, long, default_value = "field")]
        field: String,

        /// Describe the filters for a textual field
        #[arg(long)]
        textual: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum HandlerArg {
    None,
    Generic,
    Axum,
}

impl From<HandlerArg> for HttpHandler {
    fn from(arg: HandlerArg) -> Self {
        match arg {
            HandlerArg::None => HttpHandler::None,
            HandlerArg::Generic => HttpHandler::Generic,
            HandlerArg::Axum => HttpHandler::Axum,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Generate {
            schema,
            config,
            output,
            handler,
            stdout,
        } => {
            generate_command(
                schema.as_path(),
                config.as_deref(),
                output.as_path(),
                handler,
                stdout,
                cli.verbose,
            )?;
        }
        Commands::Validate { config } => {
            validate_command(config.as_path())?;
        }
        Commands::Filters {
            names,
            field,
            textual,
        } => {
            filters_command(&names, &field, textual)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn generate_command(
    schema_path: &Path,
    config_path: Option<&Path>,
    output: &Path,
    handler: Option<HandlerArg>,
    stdout: bool,
    verbose: bool,
) -> Result<()> {
    // Status goes to stderr when the document itself is on stdout
    let status = |line: String| {
        if stdout {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    };

    status(format!(
        "{} Loading schema graph: {}",
        "→".cyan(),
        schema_path.display()
    ));
    let graph = SchemaGraph::load(schema_path).context("Failed to load schema graph")?;

    let mut config = match config_path {
        Some(path) => {
            status(format!("{} Loading config: {}", "→".cyan(), path.display()));
            Config::load(path).context("Failed to load config")?
        }
        None => Config::default(),
    };

    if let Some(handler) = handler {
        config.handler = handler.into();
    }

    if verbose {
        status(format!("  Schemas: {}", graph.schemas.len()));
        status(format!("  Handler: {}", config.handler));
        status(format!("  Output: {}", output.display()));
    }

    if stdout {
        config = config.with_writer(std::io::stdout());
    }

    status(format!("{} Generating OpenAPI document...", "→".cyan()));
    let mut generator = SpecGenerator::new(config);
    let result = generator
        .run(&graph, output)
        .context("Failed to generate OpenAPI document")?;

    status(format!(
        "{} Generated {} operations across {} paths",
        "✓".green(),
        result.spec.operation_count(),
        result.spec.paths.len()
    ));

    if stdout {
        return Ok(());
    }

    println!("\n{}", "✓ Generation complete!".green().bold());
    println!("\n{}", "Generated files:".bold());
    if let Some(path) = &result.spec_path {
        println!("  📄 {}", path.display());
    }
    for path in &result.handler_files {
        println!("  📄 {}", path.display());
    }

    Ok(())
}

fn validate_command(config_path: &Path) -> Result<()> {
    println!(
        "{} Validating config: {}",
        "→".cyan(),
        config_path.display()
    );

    let mut config = Config::load(config_path).context("Failed to load config")?;
    config.validate().context("Invalid config")?;

    println!("{}", "✓ Config is valid".green().bold());
    println!(
        "{}",
        serde_json::to_string_pretty(&config).context("Failed to serialize config")?
    );

    Ok(())
}

fn filters_command(names: &[String], field: &str, textual: bool) -> Result<()> {
    let predicate = parse_predicate(names)?;
    tracing::debug!(bits = predicate.bits(), "parsed predicate");

    let field_type = if textual {
        FieldType::String
    } else {
        FieldType::Integer
    };
    let field_def = FieldDef::new(field, field_type).with_filter(predicate);

    println!("{} {}", "Predicate:".bold(), predicate.to_string().yellow());
    if predicate.has(Predicate::EDGE) {
        println!(
            "  {} also exposes the target's filters as <edge>.<field>.<token>",
            "Edge".cyan()
        );
    }

    for op in predicate.explode() {
        println!(
            "  {} {}",
            catalog::param_name(None, field, op).cyan(),
            catalog::describe(&field_def, op)
        );
    }

    Ok(())
}

fn parse_predicate(names: &[String]) -> Result<Predicate> {
    names.join("|").parse().context("Failed to parse predicate")
}
