//! lsrb - Command-line interface for LSR benchmark corpora.
//!
//! # Usage
//!
//! ```bash
//! # Build corpus, queries and qrels from a directory with config.json
//! lsrb create-corpus corpora/trec-web-2009
//!
//! # Inspect a dataset (known id or local directory, optionally /segmented)
//! lsrb info lsr-benchmark/clueweb09/en/trec-web-2009
//! lsrb docs corpora/trec-web-2009/segmented -n 5
//! lsrb queries corpora/trec-web-2009 --json
//! lsrb embeddings corpora/trec-web-2009 naver/splade-v3 query
//!
//! # Show help
//! lsrb --help
//! ```

mod commands;
mod config;
mod output;
mod progress;

use anyhow::Result;
use clap::{Parser, Subcommand};
use lsrbench_core::embeddings::TextType;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Build and inspect storage-bounded learned sparse retrieval benchmarks.
#[derive(Parser)]
#[command(name = "lsrb", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Artifact cache directory (default: $LSR_BENCHMARK_HOME or platform data dir)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Directory holding pre-downloaded dataset archives
    #[arg(long, global = true)]
    mirror: Option<PathBuf>,

    /// Output results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Build corpus and truth artifacts from a directory containing config.json
    CreateCorpus {
        /// Corpus directory
        directory: PathBuf,
    },

    /// List the built-in datasets
    Datasets,

    /// Show capabilities and counts of a dataset
    Info {
        /// Dataset id or corpus directory
        dataset: String,
    },

    /// Print documents of a dataset
    Docs {
        dataset: String,

        /// Maximum number of documents to print
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },

    /// Print queries of a dataset
    Queries {
        dataset: String,

        /// Maximum number of queries to print
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },

    /// Print sparse embeddings of a dataset
    Embeddings {
        dataset: String,

        /// Embedding model, e.g. naver/splade-v3
        model: String,

        /// `query` or `doc`
        text_type: TextType,

        /// Maximum number of rows to print
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let output = match cli.command {
        Command::CreateCorpus { directory } => {
            let report = commands::create_corpus(&directory)?;
            output::format_report(&directory, &report, cli.json)
        }
        Command::Datasets => output::format_datasets(&commands::list_datasets(), cli.json),
        Command::Info { dataset } => {
            let mut registry = config::open_registry(cli.cache_dir.as_ref(), cli.mirror.as_ref())?;
            let info = commands::dataset_info(&mut registry, &dataset)?;
            output::format_info(&info, cli.json)
        }
        Command::Docs { dataset, limit } => {
            let mut registry = config::open_registry(cli.cache_dir.as_ref(), cli.mirror.as_ref())?;
            let docs = commands::list_docs(&mut registry, &dataset, limit)?;
            output::format_docs(&docs, cli.json)
        }
        Command::Queries { dataset, limit } => {
            let mut registry = config::open_registry(cli.cache_dir.as_ref(), cli.mirror.as_ref())?;
            let queries = commands::list_queries(&mut registry, &dataset, limit)?;
            output::format_queries(&queries, cli.json)
        }
        Command::Embeddings {
            dataset,
            model,
            text_type,
            limit,
        } => {
            let mut registry = config::open_registry(cli.cache_dir.as_ref(), cli.mirror.as_ref())?;
            let rows = commands::list_embeddings(&mut registry, &dataset, &model, text_type, limit)?;
            output::format_embeddings(&rows, cli.json)
        }
    };

    println!("{}", output);
    Ok(())
}
