//! textgraph CLI - Command-line interface
//!
//! Usage:
//!   textgraph build --corpus <file> [--gazetteer <file>] [--format json|dot] [--output <file>]
//!   textgraph entities --corpus <file> [--gazetteer <file>] [--json]

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tg_core::{read_input, AppConfig, LoggingConfig};
use tg_extractor::{Gazetteer, Pipeline};
use tg_graph::export;

#[derive(Parser)]
#[command(name = "textgraph")]
#[command(about = "Build entity-relation knowledge graphs from plain text")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML); environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and export the graph
    Build {
        /// UTF-8 text file to process
        #[arg(long)]
        corpus: PathBuf,
        /// Tab-separated gazetteer: text, type, ignored
        #[arg(long)]
        gazetteer: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
        /// Seed for node colors, overriding config
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print consolidated entities without scoring relations
    Entities {
        #[arg(long)]
        corpus: PathBuf,
        #[arg(long)]
        gazetteer: Option<PathBuf>,
        /// One JSON object per line
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Dot,
}

#[derive(Serialize)]
struct Summary {
    entities: usize,
    relations: usize,
    pairs: usize,
    skipped: usize,
    failed: usize,
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    Ok(config)
}

fn init_logging(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.level.clone().into());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    if config.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_gazetteer(path: Option<&Path>) -> anyhow::Result<Option<Gazetteer>> {
    path.map(|p| {
        Gazetteer::load(p).with_context(|| format!("loading gazetteer {}", p.display()))
    })
    .transpose()
}

fn write_output(path: Option<&Path>, content: &str) -> anyhow::Result<()> {
    match path {
        Some(path) => fs::write(path, content)
            .with_context(|| format!("writing output {}", path.display()))?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            if !content.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
        }
    }
    Ok(())
}

fn render(graph: &tg_graph::KnowledgeGraph, format: Format) -> anyhow::Result<String> {
    Ok(match format {
        Format::Json => export::to_json(graph)?,
        Format::Dot => export::to_dot(graph),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    init_logging(&config.logging);

    match cli.command {
        Commands::Build {
            corpus,
            gazetteer,
            format,
            output,
            seed,
        } => {
            if seed.is_some() {
                config.graph.color_seed = seed;
            }
            let text = read_input(&corpus)?;
            let gazetteer = load_gazetteer(gazetteer.as_deref())?;
            let pipeline = Pipeline::from_config(&config)?;

            let result = pipeline.run(&text, gazetteer.as_ref()).await?;
            write_output(output.as_deref(), &render(&result.graph, format)?)?;

            let summary = Summary {
                entities: result.entities.len(),
                relations: result.relations.len(),
                pairs: result.scoring_report.pairs,
                skipped: result.scoring_report.skipped_missing
                    + result.scoring_report.skipped_overlap
                    + result.scoring_report.skipped_degenerate,
                failed: result.scoring_report.failed + result.scoring_report.timed_out,
            };
            tracing::info!(summary = %serde_json::to_string(&summary)?, "graph built");
        }
        Commands::Entities {
            corpus,
            gazetteer,
            json,
        } => {
            let text = read_input(&corpus)?;
            let gazetteer = load_gazetteer(gazetteer.as_deref())?;
            let pipeline = Pipeline::from_config(&config)?;

            let (_, entities) = pipeline.extract_entities(&text, gazetteer.as_ref()).await?;
            let mut lines = Vec::with_capacity(entities.len());
            for entity in &entities {
                lines.push(if json {
                    serde_json::to_string(entity)?
                } else {
                    format!("{}\t{}", entity.text, entity.entity_type)
                });
            }
            write_output(None, &lines.join("\n"))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_build_arguments() {
        let cli = Cli::try_parse_from([
            "textgraph",
            "build",
            "--corpus",
            "news.txt",
            "--format",
            "dot",
            "--seed",
            "3",
        ])
        .unwrap();

        match cli.command {
            Commands::Build {
                corpus,
                gazetteer,
                format,
                output,
                seed,
            } => {
                assert_eq!(corpus, PathBuf::from("news.txt"));
                assert!(gazetteer.is_none());
                assert_eq!(format, Format::Dot);
                assert!(output.is_none());
                assert_eq!(seed, Some(3));
            }
            Commands::Entities { .. } => panic!("expected build"),
        }
    }

    #[test]
    fn test_corpus_is_required() {
        assert!(Cli::try_parse_from(["textgraph", "entities"]).is_err());
    }

    #[test]
    fn test_missing_gazetteer_is_fatal() {
        let err = load_gazetteer(Some(Path::new("/nonexistent/gazetteer.tsv"))).unwrap_err();
        assert!(err.to_string().contains("loading gazetteer"));
        assert!(load_gazetteer(None).unwrap().is_none());
    }

    #[test]
    fn test_write_output_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.dot");
        write_output(Some(&path), "digraph knowledge_graph {\n}\n").unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "digraph knowledge_graph {\n}\n"
        );
    }

    #[test]
    fn test_render_empty_graph() {
        let graph = tg_graph::KnowledgeGraph::new();
        assert!(render(&graph, Format::Dot).unwrap().starts_with("digraph"));
        let json: serde_json::Value =
            serde_json::from_str(&render(&graph, Format::Json).unwrap()).unwrap();
        assert!(json["edges"].as_array().unwrap().is_empty());
    }
}
