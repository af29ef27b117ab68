//! lamad CLI tool
//!
//! Command-line interface over lamad-core.
//!
//! ## Commands
//!
//! - `parse [dir]`: build the documentation graph once and print a diagnostics summary
//! - `search [dir] <query>`: token search over titles, descriptions and tags
//! - `show [dir] <id>`: one node with its related nodes and containment descendants
//! - `export [dir]`: write the graph's feature files and a manifest
//! - `fetch --source <dir> --path <id>`: walk a learning path and write its Gherkin resources
//!
//! Settings come from `lamad.toml` (see [lamad_core::config::LamadConfig]); flags given on the
//! command line override them.

use clap::{Args, Parser, Subcommand};
use lamad_core::{
    codec::{DirectorySource, DocumentCompiler},
    config::{ConfigProvider, LamadConfig, TomlConfigProvider, DEFAULT_CONFIG_FILE},
    docgraph::{DocumentGraph, GraphStore},
    export::{fetch_features, graph_features, FeatureWriter, JsonContentSource},
    properties::NodeType,
    query::GraphQuery,
    LamadError,
};
use std::{path::PathBuf, process::ExitCode, sync::Arc};

#[derive(Parser)]
#[command(name = "lamad")]
#[command(author, version, about = "Compile Markdown epics and Gherkin features into a queryable graph", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct BuildArgs {
    /// Documentation root (overrides `docs_root`)
    dir: Option<PathBuf>,

    /// Report skipped Gherkin lines
    #[arg(long)]
    strict: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the graph once and display diagnostics
    Parse {
        #[command(flatten)]
        build: BuildArgs,

        /// List every diagnostic, not only warnings
        #[arg(short, long)]
        verbose: bool,
    },

    /// Search node titles, descriptions and tags
    Search {
        query: String,

        #[command(flatten)]
        build: BuildArgs,
    },

    /// Show one node, its related nodes and its descendants
    Show {
        id: String,

        #[command(flatten)]
        build: BuildArgs,

        /// Print the node as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the graph's feature files and a manifest
    Export {
        #[command(flatten)]
        build: BuildArgs,

        /// Output directory (overrides `output_dir`)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Only export features with a matching tag (overrides `filter_tags`)
        #[arg(short, long, value_delimiter = ',')]
        tags: Vec<String>,
    },

    /// Walk a learning path and write its Gherkin resources
    Fetch {
        /// Directory holding `paths/<id>.json` and `content/<id>.json`
        #[arg(long)]
        source: PathBuf,

        /// Learning path id
        #[arg(long)]
        path: String,

        /// Output directory (overrides `output_dir`)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Only write resources with a matching tag (overrides `filter_tags`)
        #[arg(short, long, value_delimiter = ',')]
        tags: Vec<String>,
    },
}

fn apply_build_args(config: &mut LamadConfig, build: &BuildArgs) {
    if let Some(dir) = &build.dir {
        config.docs_root = dir.clone();
    }
    if build.strict {
        config.strict = true;
    }
}

fn apply_export_args(config: &mut LamadConfig, out: Option<PathBuf>, tags: Vec<String>) {
    if let Some(out) = out {
        config.output_dir = out;
    }
    if !tags.is_empty() {
        config.filter_tags = tags;
    }
}

fn build(config: &LamadConfig) -> Result<Arc<DocumentGraph>, LamadError> {
    let store = GraphStore::new();
    let source = DirectorySource::new(&config.docs_root);
    store.rebuild_from(&DocumentCompiler::from_config(config), &source)
}

fn print_summary(graph: &DocumentGraph, verbose: bool) -> usize {
    let metadata = graph.metadata();
    println!("\n=== Build Results ===");
    println!("Epics: {}", metadata.epic_count);
    println!("Features: {}", metadata.feature_count);
    println!("Scenarios: {}", metadata.scenario_count);
    println!("Relations: {}", metadata.relation_count);
    println!("Unresolved references: {}", metadata.unresolved_count);

    let mut failures = 0;
    for result in graph.parse_results() {
        if let Some(error) = &result.error {
            failures += 1;
            eprintln!("error: {error}");
        }
        for diagnostic in result.diagnostics.iter() {
            if verbose || diagnostic.is_warning() {
                println!("{}: {diagnostic}", result.artifact.path);
            }
        }
    }
    if verbose {
        for diagnostic in graph.diagnostics() {
            println!("{diagnostic}");
        }
    }
    println!("Files: {} ({failures} failed)", graph.parse_results().len());
    failures
}

fn run(cli: Cli) -> Result<ExitCode, LamadError> {
    let mut config = TomlConfigProvider::new(&cli.config).load()?;

    match cli.command {
        Commands::Parse { build: args, verbose } => {
            apply_build_args(&mut config, &args);
            let graph = build(&config)?;
            let failures = print_summary(&graph, verbose);
            Ok(if failures > 0 {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }

        Commands::Search { query, build: args } => {
            apply_build_args(&mut config, &args);
            let graph = build(&config)?;
            let hits = graph.search_nodes(&query);
            if hits.is_empty() {
                println!("No matches for {query:?}");
            }
            for node in hits {
                println!("{node}");
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Show {
            id,
            build: args,
            json,
        } => {
            apply_build_args(&mut config, &args);
            let graph = build(&config)?;
            let Some(node) = graph.get_node(&id) else {
                eprintln!("No node with id {id:?}");
                return Ok(ExitCode::FAILURE);
            };
            if json {
                println!("{}", serde_json::to_string_pretty(node.as_ref())?);
                return Ok(ExitCode::SUCCESS);
            }
            println!("{node}");
            println!("  source: {}", node.source_path());
            if !node.description().is_empty() {
                println!("  {}", node.description());
            }
            if !node.tags().is_empty() {
                println!("  tags: {}", node.tags().join(", "));
            }
            println!("Related:");
            for related in graph.get_related_nodes(node.id()) {
                println!("  {related}");
            }
            if node.node_type() != NodeType::Scenario {
                println!("Descendants:");
                for descendant in graph.descendants(node.id()) {
                    println!("  {descendant}");
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Export {
            build: args,
            out,
            tags,
        } => {
            apply_build_args(&mut config, &args);
            apply_export_args(&mut config, out, tags);
            let graph = build(&config)?;
            let features = graph_features(&graph, &config.filter_tags);
            let manifest = FeatureWriter::new(&config.output_dir).write(&features)?;
            println!(
                "Exported {} features to {}",
                manifest.feature_count,
                config.output_dir.display()
            );
            Ok(ExitCode::SUCCESS)
        }

        Commands::Fetch {
            source,
            path,
            out,
            tags,
        } => {
            apply_export_args(&mut config, out, tags);
            let source = JsonContentSource::new(source);
            let report = fetch_features(&source, &path, &config.filter_tags)?;
            for skipped in report.skipped.iter() {
                tracing::info!("skipped {}: {}", skipped.id, skipped.reason);
            }
            let manifest = FeatureWriter::new(&config.output_dir).write(&report.features)?;
            println!(
                "Fetched {} features to {}",
                manifest.feature_count,
                config.output_dir.display()
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
