//! trec_eval-style results summaries.
//!
//! A summary is a list of `metricName target value` rows. Per-query rows use
//! the query id as target; the corpus-level rows use `all`. Rows are written
//! with the metric name left-aligned in 16 columns, the target right-aligned
//! in 3, and scores with at least 4 significant digits (4 decimals from 0.1
//! upwards, more below, scientific notation for very small values):
//!
//! ```text
//! num_ret         all 6
//! map             all 0.7500
//! P1000           all 0.0003333
//! ```

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::corpus::CorpusEvaluation;
use crate::error::{open_reader, Error, Result};
use crate::metric::{MetricKind, NDCG_CUTOFFS, PRECISION_CUTOFFS};
use crate::query::QueryEvaluation;

/// Target of corpus-level rows.
pub const ALL_TARGET: &str = "all";

/// Value of a results row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultValue {
    /// Document count.
    Count(usize),
    /// Metric score.
    Score(f64),
}

impl ResultValue {
    /// Numeric value.
    #[must_use]
    pub fn as_f64(self) -> f64 {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Self::Count(n) => n as f64,
            Self::Score(v) => v,
        }
    }
}

impl fmt::Display for ResultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{n}"),
            Self::Score(v) => write_score(f, *v),
        }
    }
}

const MIN_SIGNIFICANT_DIGITS: i32 = 4;
const MAX_FIXED_DECIMALS: i32 = 10;

fn write_score(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value == 0.0 || !value.is_finite() || value.abs() >= 0.1 {
        return write!(f, "{value:.4}");
    }
    #[allow(clippy::cast_possible_truncation)]
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = MIN_SIGNIFICANT_DIGITS - 1 - magnitude;
    if decimals > MAX_FIXED_DECIMALS {
        write!(f, "{value:.3e}")
    } else {
        #[allow(clippy::cast_sign_loss)]
        let decimals = decimals as usize;
        write!(f, "{value:.decimals$}")
    }
}

/// One `metricName target value` row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    /// Results-file metric key (`map`, `P10`, `ndcg5`, ...).
    pub metric: String,
    /// Query id, or `all` for corpus-level rows.
    pub target: String,
    /// Row value.
    pub value: ResultValue,
}

impl ResultRow {
    fn score(metric: impl Into<String>, target: &str, value: f64) -> Self {
        Self {
            metric: metric.into(),
            target: target.to_string(),
            value: ResultValue::Score(value),
        }
    }

    fn count(metric: &str, target: &str, value: usize) -> Self {
        Self {
            metric: metric.to_string(),
            target: target.to_string(),
            value: ResultValue::Count(value),
        }
    }
}

impl fmt::Display for ResultRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<16}{:>3} {}", self.metric, self.target, self.value)
    }
}

/// Metrics reported for each query and for `all`, in output order.
fn reported_metrics() -> Vec<MetricKind> {
    let mut metrics = vec![MetricKind::AveragePrecision, MetricKind::Ndcg];
    metrics.extend(NDCG_CUTOFFS.iter().map(|&k| MetricKind::NdcgAt(k)));
    metrics.extend([
        MetricKind::RPrecision,
        MetricKind::BinaryPreference,
        MetricKind::ReciprocalRank,
    ]);
    metrics.extend(PRECISION_CUTOFFS.iter().map(|&k| MetricKind::Precision(k)));
    metrics
}

/// A parsed or rendered results summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultsSummary {
    rows: Vec<ResultRow>,
}

impl ResultsSummary {
    /// Renders per-query rows (lexicographic query order) followed by the `all` rows.
    #[must_use]
    pub fn from_evaluation(evaluation: &CorpusEvaluation) -> Self {
        let metrics = reported_metrics();
        let mut rows = Vec::new();

        for query in evaluation.evaluations() {
            push_query_rows(&mut rows, query, &metrics);
        }

        rows.push(ResultRow::count("num_ret", ALL_TARGET, evaluation.number_retrieved()));
        rows.push(ResultRow::count("num_rel", ALL_TARGET, evaluation.number_relevant()));
        rows.push(ResultRow::count(
            "num_rel_ret",
            ALL_TARGET,
            evaluation.number_relevant_retrieved(),
        ));
        for metric in &metrics {
            rows.push(ResultRow::score(
                metric.results_key(),
                ALL_TARGET,
                evaluation.mean(*metric),
            ));
        }

        Self { rows }
    }

    /// All rows in order.
    #[must_use]
    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    /// Value of the first row matching `metric` and `target`.
    #[must_use]
    pub fn value(&self, metric: &str, target: &str) -> Option<f64> {
        self.rows
            .iter()
            .find(|r| r.metric == metric && r.target == target)
            .map(|r| r.value.as_f64())
    }

    /// Corpus-level value of `metric`.
    #[must_use]
    pub fn aggregate(&self, metric: &str) -> Option<f64> {
        self.value(metric, ALL_TARGET)
    }

    /// Parses a summary; every non-blank line needs at least three fields.
    pub fn parse<R: BufRead>(reader: R) -> Result<Self> {
        let mut rows = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.is_empty() {
                continue;
            }
            if fields.len() < 3 {
                return Err(Error::format(
                    index + 1,
                    format!("expected 3 results fields, found {}", fields.len()),
                ));
            }
            rows.push(ResultRow {
                metric: fields[0].to_string(),
                target: fields[1].to_string(),
                value: parse_value(fields[2]).ok_or_else(|| {
                    Error::format(index + 1, format!("value '{}' is not a number", fields[2]))
                })?,
            });
        }
        Ok(Self { rows })
    }

    /// Reads a summary file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::parse(open_reader(path.as_ref())?)
    }

    /// Writes every row, one per line.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        for row in &self.rows {
            writeln!(writer, "{row}")?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Writes the summary to `path`, replacing any previous content.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.write_to(BufWriter::new(File::create(path)?))?;
        tracing::debug!(path = %path.display(), rows = self.rows.len(), "Wrote results summary");
        Ok(())
    }
}

fn push_query_rows(rows: &mut Vec<ResultRow>, query: &QueryEvaluation, metrics: &[MetricKind]) {
    let target = query.query_id();
    rows.push(ResultRow::count("num_ret", target, query.retrieved_documents().len()));
    rows.push(ResultRow::count("num_rel", target, query.relevant_documents().len()));
    rows.push(ResultRow::count(
        "num_rel_ret",
        target,
        query.relevant_retrieved_documents().len(),
    ));
    for metric in metrics {
        rows.push(ResultRow::score(
            metric.results_key(),
            target,
            metric.evaluate(query),
        ));
    }
}

fn parse_value(text: &str) -> Option<ResultValue> {
    if text.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(n) = text.parse() {
            return Some(ResultValue::Count(n));
        }
    }
    // tolerate a decimal comma written by locale-aware formatters
    text.replace(',', ".").parse().ok().map(ResultValue::Score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Judgment, RankedDocument};

    fn evaluation() -> CorpusEvaluation {
        CorpusEvaluation::from_evaluations([QueryEvaluation::new(
            "7",
            vec![
                RankedDocument::new("d1", 1, 0.9),
                RankedDocument::new("d3", 2, 0.7),
                RankedDocument::new("d2", 3, 0.5),
            ],
            vec![
                Judgment::new("d1", 1),
                Judgment::new("d2", 0),
                Judgment::new("d3", 1),
            ],
        )])
    }

    #[test]
    fn test_row_layout() {
        let row = ResultRow::score("map", ALL_TARGET, 0.75);
        assert_eq!(row.to_string(), "map             all 0.7500");
        let row = ResultRow::count("num_rel_ret", "7", 12);
        assert_eq!(row.to_string(), "num_rel_ret       7 12");
    }

    #[test]
    fn test_summary_has_named_ndcg_rows() {
        let summary = ResultsSummary::from_evaluation(&evaluation());
        for key in ["ndcg1", "ndcg2", "ndcg3", "ndcg4", "ndcg5", "ndcg10", "ndcg15", "ndcg20"] {
            assert!(summary.aggregate(key).is_some(), "missing {key}");
        }
        let ndcg5_rows = summary
            .rows()
            .iter()
            .filter(|r| r.metric == "ndcg5" && r.target == ALL_TARGET)
            .count();
        assert_eq!(ndcg5_rows, 1);
    }

    #[test]
    fn test_summary_values() {
        let summary = ResultsSummary::from_evaluation(&evaluation());
        assert_eq!(summary.aggregate("num_ret"), Some(3.0));
        assert_eq!(summary.aggregate("map"), Some(1.0));
        assert_eq!(summary.value("recip_rank", "7"), Some(1.0));
        let p3 = summary.aggregate("P3").unwrap();
        assert!((p3 - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_write_then_parse_keeps_four_decimals() {
        let summary = ResultsSummary::from_evaluation(&evaluation());
        let mut buffer = Vec::new();
        summary.write_to(&mut buffer).unwrap();

        let parsed = ResultsSummary::parse(buffer.as_slice()).unwrap();
        assert_eq!(parsed.rows().len(), summary.rows().len());
        let p3 = parsed.aggregate("P3").unwrap();
        assert!((p3 - 0.6667).abs() < 1e-9);
        assert!(matches!(parsed.rows()[0].value, ResultValue::Count(3)));
    }

    #[test]
    fn test_small_scores_keep_four_significant_digits() {
        assert_eq!(ResultValue::Score(0.05).to_string(), "0.05000");
        assert_eq!(ResultValue::Score(0.0).to_string(), "0.0000");
        assert_eq!(ResultValue::Score(2.5e-12).to_string(), "2.500e-12");

        // one relevant document in the top 1000 of three queries
        let rows = vec![ResultRow::score("P1000", ALL_TARGET, 1.0 / 3000.0)];
        let summary = ResultsSummary { rows };
        let mut buffer = Vec::new();
        summary.write_to(&mut buffer).unwrap();
        assert_eq!(String::from_utf8(buffer.clone()).unwrap(), "P1000           all 0.0003333\n");

        let parsed = ResultsSummary::parse(buffer.as_slice()).unwrap();
        let value = parsed.aggregate("P1000").unwrap();
        assert!((value - 1.0 / 3000.0).abs() / (1.0 / 3000.0) < 1e-3);

        let parsed = ResultsSummary::parse("ndcg5           all 2.500e-12\n".as_bytes()).unwrap();
        assert_eq!(parsed.aggregate("ndcg5"), Some(2.5e-12));
    }

    #[test]
    fn test_parse_rejects_short_rows() {
        let err = ResultsSummary::parse("map all\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Format { line: 1, .. }));
    }

    #[test]
    fn test_parse_decimal_comma() {
        let summary = ResultsSummary::parse("map all 0,2500\n".as_bytes()).unwrap();
        assert_eq!(summary.aggregate("map"), Some(0.25));
    }
}
