//! Command handlers.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rankeval_core::{
    load_judgments, load_ranking, merge_fold, parse_results, ComparisonReport, CorpusEvaluation,
    EvalConfig, ResultsSummary,
};

use crate::output::{self, OutputFormat};

/// Loads configuration from `path`, or from the working directory and environment.
pub fn load_config(path: Option<&Path>) -> Result<EvalConfig> {
    match path {
        Some(path) => EvalConfig::load_from(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => EvalConfig::load().context("Failed to load configuration"),
    }
}

fn load_corpus(ranking: &Path, judgments: &Path) -> Result<CorpusEvaluation> {
    let ranking = load_ranking(ranking)
        .with_context(|| format!("Failed to read ranking {}", ranking.display()))?;
    let judgments = load_judgments(judgments)
        .with_context(|| format!("Failed to read judgments {}", judgments.display()))?;
    Ok(CorpusEvaluation::new(ranking, judgments))
}

pub fn evaluate(
    ranking: &Path,
    judgments: &Path,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let evaluation = load_corpus(ranking, judgments)?;
    tracing::info!(
        queries = evaluation.len(),
        dropped = evaluation.dropped_queries().len(),
        "Evaluated ranking"
    );

    let summary = ResultsSummary::from_evaluation(&evaluation);
    if let Some(path) = output {
        summary
            .save(path)
            .with_context(|| format!("Failed to write results to {}", path.display()))?;
    }
    output::print_evaluation(&evaluation, &summary, format)
}

pub fn compare(
    baseline: &Path,
    treatment: &Path,
    judgments: &Path,
    config: &EvalConfig,
    format: OutputFormat,
) -> Result<()> {
    let baseline = load_corpus(baseline, judgments)?;
    let treatment = load_corpus(treatment, judgments)?;
    let report = ComparisonReport::build(&baseline, &treatment, config)?;
    output::print_comparison(&report, format)
}

pub fn merge(
    features: &Path,
    predictions: &Path,
    judgments_out: &Path,
    ranking_out: &Path,
    run_tag: &str,
) -> Result<()> {
    if run_tag.split_whitespace().count() != 1 {
        bail!("Run tag must be a single token, got '{run_tag}'");
    }
    let fold = merge_fold(features, predictions, run_tag).with_context(|| {
        format!(
            "Failed to merge {} with {}",
            features.display(),
            predictions.display()
        )
    })?;
    fold.write_files(judgments_out, ranking_out)?;
    println!(
        "Merged {} instances over {} queries",
        fold.len(),
        fold.groups().len()
    );
    Ok(())
}

pub fn aggregate(
    files: &[PathBuf],
    metric: &str,
    folds: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let folds = folds.unwrap_or(files.len());
    let summary = parse_results(files, metric, folds)?;
    output::print_fold_summary(&summary, format)
}
