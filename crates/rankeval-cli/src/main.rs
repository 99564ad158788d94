#![allow(clippy::doc_markdown)]
//! `rankeval` - evaluate TREC-style rankings from the command line.

mod commands;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::output::OutputFormat;

/// Exit status for malformed command lines (-1 as seen by the shell).
const USAGE_EXIT: u8 = 255;

/// rankeval - trec_eval metrics, significance tests and fold staging
#[derive(Parser, Debug)]
#[command(name = "rankeval")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./rankeval.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate one ranking against relevance judgments
    Evaluate {
        /// Ranking file (`qid Q0 docid score rank runtag`)
        ranking: PathBuf,

        /// Judgments file (`qid 0 docid grade`)
        judgments: PathBuf,

        /// Also write the trec_eval results summary to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Trec)]
        format: OutputFormat,
    },

    /// Compare a baseline and a treatment ranking with significance tests
    Compare {
        /// Baseline ranking file
        baseline: PathBuf,

        /// Treatment ranking file
        treatment: PathBuf,

        /// Judgments file
        judgments: PathBuf,

        /// Seed of the randomized test
        #[arg(long)]
        seed: Option<u64>,

        /// Rounds of the randomized test
        #[arg(long)]
        trials: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Trec)]
        format: OutputFormat,
    },

    /// Merge a LETOR feature file and its predictions into judgments and ranking files
    Merge {
        /// Feature file (`grade qid:<id> f:v ... # docid = <id>`)
        features: PathBuf,

        /// Prediction file, one score per line
        predictions: PathBuf,

        /// Judgments file to write
        judgments_out: PathBuf,

        /// Ranking file to write
        ranking_out: PathBuf,

        /// Run tag (overrides the configured one)
        #[arg(long)]
        run_tag: Option<String>,
    },

    /// Average one metric over per-fold results summaries
    Aggregate {
        /// Metric name (`MAP`, `P@10`, `NDCG@5`, or a results key such as `bpref`)
        #[arg(short, long)]
        metric: String,

        /// Number of folds to read (defaults to every file given)
        #[arg(long)]
        folds: Option<usize>,

        /// Results summary files, one per fold
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Trec)]
        format: OutputFormat,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if err.use_stderr() => {
            eprint!("{err}");
            return ExitCode::from(USAGE_EXIT);
        }
        Err(err) => err.exit(),
    };

    init_tracing();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Evaluate {
            ranking,
            judgments,
            output,
            format,
        } => commands::evaluate(&ranking, &judgments, output.as_deref(), format),
        Command::Compare {
            baseline,
            treatment,
            judgments,
            seed,
            trials,
            format,
        } => {
            let mut config = config;
            if let Some(seed) = seed {
                config.seed = seed;
            }
            if let Some(trials) = trials {
                config.randomized_trials = trials;
            }
            config.validate()?;
            commands::compare(&baseline, &treatment, &judgments, &config, format)
        }
        Command::Merge {
            features,
            predictions,
            judgments_out,
            ranking_out,
            run_tag,
        } => {
            let run_tag = run_tag.unwrap_or(config.run_tag);
            commands::merge(
                &features,
                &predictions,
                &judgments_out,
                &ranking_out,
                &run_tag,
            )
        }
        Command::Aggregate {
            metric,
            folds,
            files,
            format,
        } => commands::aggregate(&files, &metric, folds, format),
    }
}
