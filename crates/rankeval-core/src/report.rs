//! Side-by-side comparison of two systems over a metric panel.

use std::fmt;

use serde::Serialize;

use crate::compare::{Comparator, PairedTTest};
use crate::config::EvalConfig;
use crate::corpus::CorpusEvaluation;
use crate::error::Result;
use crate::metric::MetricKind;

/// Comparison outcome for one metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    /// Compared metric.
    pub metric: MetricKind,
    /// Queries judged and ranked by both systems.
    pub compared_queries: usize,
    /// Baseline mean over compared queries.
    pub baseline: f64,
    /// Treatment mean over compared queries.
    pub treatment: f64,
    /// Queries won by the baseline.
    pub baseline_better: usize,
    /// Queries won by the treatment.
    pub treatment_better: usize,
    /// Ties within the configured epsilon.
    pub equal: usize,
    /// Paired t-test.
    pub t_test: PairedTTest,
    /// Randomization test p-value.
    pub randomized: f64,
    /// Sign test p-value.
    pub sign_test: f64,
}

impl ComparisonRow {
    fn from_comparator(metric: MetricKind, comparator: &Comparator, config: &EvalConfig) -> Self {
        Self {
            metric,
            compared_queries: comparator.len(),
            baseline: comparator.mean_baseline_metric(),
            treatment: comparator.mean_treatment_metric(),
            baseline_better: comparator.count_baseline_better(),
            treatment_better: comparator.count_treatment_better(),
            equal: comparator.count_equal(),
            t_test: comparator.paired_t_test(),
            randomized: comparator.randomized_test(config.randomized_trials, config.seed),
            sign_test: comparator.sign_test(),
        }
    }
}

/// Baseline against treatment on every configured comparison metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    /// One row per panel metric, in panel order.
    pub rows: Vec<ComparisonRow>,
    /// Rounds used by the randomized test.
    pub randomized_trials: usize,
    /// Seed used by the randomized test.
    pub seed: u64,
}

impl ComparisonReport {
    /// Runs the comparator for each metric of `config.comparison_metrics`.
    pub fn build(
        baseline: &CorpusEvaluation,
        treatment: &CorpusEvaluation,
        config: &EvalConfig,
    ) -> Result<Self> {
        let panel = config.comparison_panel()?;
        let rows = panel
            .into_iter()
            .map(|metric| {
                let comparator = Comparator::new(
                    &baseline.evaluate_metric(metric),
                    &treatment.evaluate_metric(metric),
                )
                .with_epsilon(config.tie_epsilon);
                let row = ComparisonRow::from_comparator(metric, &comparator, config);
                tracing::debug!(
                    metric = %metric,
                    queries = row.compared_queries,
                    baseline = row.baseline,
                    treatment = row.treatment,
                    "Compared metric"
                );
                row
            })
            .collect();

        Ok(Self {
            rows,
            randomized_trials: config.randomized_trials,
            seed: config.seed,
        })
    }
}

impl fmt::Display for ComparisonReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            let metric = row.metric.to_string();
            writeln!(f, "{metric:<20}{:<12}{:6.4}", "baseline", row.baseline)?;
            writeln!(f, "{metric:<20}{:<12}{:6.4}", "treatment", row.treatment)?;
            writeln!(f, "{metric:<20}{:<12}{}", "basebetter", row.baseline_better)?;
            writeln!(f, "{metric:<20}{:<12}{}", "treatbetter", row.treatment_better)?;
            writeln!(f, "{metric:<20}{:<12}{}", "equal", row.equal)?;
            writeln!(f, "{metric:<20}{:<12}{:6.4}", "ttest", row.t_test.p_value)?;
            writeln!(f, "{metric:<20}{:<12}{:6.4}", "randomized", row.randomized)?;
            writeln!(f, "{metric:<20}{:<12}{:6.4}", "signtest", row.sign_test)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{read_judgments, read_ranking};

    const QRELS: &str = "q1 0 a 1\nq1 0 b 0\nq2 0 c 1\nq2 0 d 1\n";
    const BASELINE: &str = "q1 Q0 b 2 1 base\nq1 Q0 a 1 2 base\nq2 Q0 c 2 1 base\n";
    const TREATMENT: &str = "q1 Q0 a 2 1 new\nq1 Q0 b 1 2 new\nq2 Q0 c 2 1 new\nq2 Q0 d 1 2 new\n";

    fn corpus(run: &str) -> CorpusEvaluation {
        CorpusEvaluation::new(
            read_ranking(run.as_bytes()).unwrap(),
            read_judgments(QRELS.as_bytes()).unwrap(),
        )
    }

    #[test]
    fn test_report_covers_panel() {
        let config = EvalConfig {
            randomized_trials: 200,
            ..EvalConfig::default()
        };
        let report = ComparisonReport::build(&corpus(BASELINE), &corpus(TREATMENT), &config).unwrap();

        assert_eq!(report.rows.len(), 5);
        let ap = &report.rows[0];
        assert_eq!(ap.metric, MetricKind::AveragePrecision);
        assert_eq!(ap.compared_queries, 2);
        // baseline AP: q1 = 0.5, q2 = 0.5; treatment: 1.0 and 1.0
        assert!((ap.baseline - 0.5).abs() < 1e-9);
        assert!((ap.treatment - 1.0).abs() < 1e-9);
        assert_eq!(ap.treatment_better, 2);
        assert_eq!(ap.baseline_better + ap.equal, 0);
    }

    #[test]
    fn test_report_layout() {
        let config = EvalConfig {
            randomized_trials: 50,
            comparison_metrics: vec!["P5".to_string()],
            ..EvalConfig::default()
        };
        let report = ComparisonReport::build(&corpus(BASELINE), &corpus(TREATMENT), &config).unwrap();
        let text = report.to_string();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 8);
        assert_eq!(lines[0], "P5                  baseline    0.2000");
        assert_eq!(lines[1], "P5                  treatment   0.3000");
        assert_eq!(lines[2], "P5                  basebetter  0");
        assert_eq!(lines[3], "P5                  treatbetter 1");
        assert_eq!(lines[4], "P5                  equal       1");
    }
}
