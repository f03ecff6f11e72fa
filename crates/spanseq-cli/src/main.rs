#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
//! `spanseq` CLI - explain and run sequence patterns over a corpus file
//!
//! Usage:
//!   `spanseq explain corpus.txt '{"type": "token", "value": "the"}'`
//!   `spanseq search corpus.txt @pattern.json --fields word,pos --shards 4`

mod corpus;
mod output;


use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use output::OutputFormat;
use spanseq_core::config::LoggingConfig;
use spanseq_core::{Clause, ClauseNode, OptimizerConfig, Searcher, SpanseqConfig};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "spanseq")]
#[command(
    author,
    version,
    about = "spanseq CLI - sequence pattern search over annotated corpora"
)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (missing file means defaults)
    #[arg(
        short,
        long,
        global = true,
        default_value = "spanseq.toml",
        env = "SPANSEQ_CONFIG"
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Corpus and pattern arguments shared by every subcommand.
#[derive(Args)]
struct Input {
    /// Corpus file, one document per line
    corpus: PathBuf,

    /// Pattern as JSON, or `@file` to read it from a file
    pattern: String,

    /// Annotation fields of each token, separated by '/' in the corpus
    #[arg(long, value_delimiter = ',', default_value = "word")]
    fields: Vec<String>,

    /// Number of shards to split the corpus into
    #[arg(long, default_value = "1")]
    shards: usize,

    /// Disable forward-index (NFA) matching
    #[arg(long)]
    no_nfa: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Show how a pattern is rewritten and combined
    Explain {
        #[command(flatten)]
        input: Input,
    },

    /// Search a corpus for a pattern
    Search {
        #[command(flatten)]
        input: Input,

        /// Maximum number of hits (0 = unlimited)
        #[arg(long)]
        max_hits: Option<usize>,
    },
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn read_pattern(pattern: &str) -> Result<Clause> {
    let json = match pattern.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(Path::new(path))
            .with_context(|| format!("Failed to read pattern file {path}"))?,
        None => pattern.to_string(),
    };
    ClauseNode::from_json(&json).context("Invalid pattern")
}

fn optimizer_config(config: &SpanseqConfig, input: &Input) -> OptimizerConfig {
    if input.no_nfa {
        config.optimizer.clone().without_nfa()
    } else {
        config.optimizer.clone()
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = SpanseqConfig::load_from_path(&cli.config)?;
    config.validate()?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Explain { input } => {
            let pattern = read_pattern(&input.pattern)?;
            let corpus = corpus::load_corpus(&input.corpus, &input.fields, input.shards)?;
            let searcher = Searcher::new(corpus.shards)
                .with_optimizer_config(optimizer_config(&config, &input));
            let optimized = searcher.optimize(&pattern)?;
            output::print_explain(&pattern, &optimized.clause, &optimized.steps, input.format)?;
        }
        Commands::Search { input, max_hits } => {
            let pattern = read_pattern(&input.pattern)?;
            let corpus = corpus::load_corpus(&input.corpus, &input.fields, input.shards)?;
            let mut search = config.search.clone();
            if let Some(max_hits) = max_hits {
                search.max_hits = max_hits;
            }
            let searcher = Searcher::new(corpus.shards.clone())
                .with_optimizer_config(optimizer_config(&config, &input))
                .with_search_config(search);
            let outcome = searcher.search(&pattern)?;
            output::print_hits(&outcome, &corpus, input.format)?;
        }
    }

    Ok(())
}
