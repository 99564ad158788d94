//! Rendering of evaluation results.

use std::collections::HashMap;

use anyhow::Result;
use clap::ValueEnum;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use rankeval_core::{
    ComparisonReport, CorpusEvaluation, DroppedQuery, FoldSummary, ResultRow, ResultValue,
    ResultsSummary, ALL_TARGET,
};
use serde::Serialize;

/// How results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// trec_eval text layout
    Trec,
    /// Aligned table
    Table,
    /// JSON document
    Json,
}

#[derive(Serialize)]
struct EvaluationJson<'a> {
    queries: usize,
    dropped: &'a [DroppedQuery],
    rows: &'a [ResultRow],
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn number(value: impl ToString) -> Cell {
    Cell::new(value.to_string()).set_alignment(CellAlignment::Right)
}

pub fn print_evaluation(
    evaluation: &CorpusEvaluation,
    summary: &ResultsSummary,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Trec => summary.write_to(std::io::stdout().lock())?,
        OutputFormat::Table => {
            println!("{}", evaluation_table(summary));
            println!(
                "{} queries evaluated, {} dropped",
                evaluation.len(),
                evaluation.dropped_queries().len()
            );
        }
        OutputFormat::Json => {
            let document = EvaluationJson {
                queries: evaluation.len(),
                dropped: evaluation.dropped_queries(),
                rows: summary.rows(),
            };
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
    }
    Ok(())
}

/// One row per metric, one column per query followed by `all`.
fn evaluation_table(summary: &ResultsSummary) -> Table {
    let mut metrics: Vec<&str> = Vec::new();
    let mut targets: Vec<&str> = Vec::new();
    let mut values: HashMap<(&str, &str), ResultValue> = HashMap::new();
    for row in summary.rows() {
        if !metrics.contains(&row.metric.as_str()) {
            metrics.push(&row.metric);
        }
        if row.target != ALL_TARGET && !targets.contains(&row.target.as_str()) {
            targets.push(&row.target);
        }
        values
            .entry((row.metric.as_str(), row.target.as_str()))
            .or_insert(row.value);
    }
    targets.push(ALL_TARGET);

    let mut header = vec!["Metric"];
    header.extend(&targets);
    let mut table = new_table(header);
    for metric in metrics {
        let mut cells = vec![Cell::new(metric)];
        cells.extend(targets.iter().map(|target| match values.get(&(metric, *target)) {
            Some(value) => number(value),
            None => Cell::new(""),
        }));
        table.add_row(cells);
    }
    table
}

pub fn print_comparison(report: &ComparisonReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Trec => print!("{report}"),
        OutputFormat::Table => {
            let mut table = new_table(vec![
                "Metric",
                "Baseline",
                "Treatment",
                "Base better",
                "Treat better",
                "Equal",
                "t-test p",
                "Randomized p",
                "Sign test p",
            ]);
            for row in &report.rows {
                table.add_row(vec![
                    Cell::new(row.metric),
                    number(format!("{:.4}", row.baseline)),
                    number(format!("{:.4}", row.treatment)),
                    number(row.baseline_better),
                    number(row.treatment_better),
                    number(row.equal),
                    number(format!("{:.4}", row.t_test.p_value)),
                    number(format!("{:.4}", row.randomized)),
                    number(format!("{:.4}", row.sign_test)),
                ]);
            }
            println!("{table}");
            println!(
                "Randomized test: {} trials, seed {}",
                report.randomized_trials, report.seed
            );
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(())
}

pub fn print_fold_summary(summary: &FoldSummary, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Trec => {
            for (fold, value) in summary.values.iter().enumerate() {
                println!("{:<16}{:>3} {}", summary.metric, fold + 1, ResultValue::Score(*value));
            }
            println!(
                "{:<16}{:>3} {}",
                summary.metric,
                ALL_TARGET,
                ResultValue::Score(summary.mean)
            );
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["Fold", summary.metric.as_str()]);
            for (fold, value) in summary.values.iter().enumerate() {
                table.add_row(vec![number(fold + 1), number(ResultValue::Score(*value))]);
            }
            table.add_row(vec![Cell::new("mean"), number(ResultValue::Score(summary.mean))]);
            println!("{table}");
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(summary)?),
    }
    Ok(())
}
