//! Recognized metric names and their per-query accessors.
//!
//! Comparison tooling and fold aggregation address metrics by name. Names are
//! validated once at the boundary into a [`MetricKind`]; anything outside the
//! recognized set is an [`Error::UnknownMetric`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::query::QueryEvaluation;

/// Precision cut points reported for every query (`P1` .. `P1000`).
pub const PRECISION_CUTOFFS: [usize; 13] = [1, 2, 3, 4, 5, 10, 15, 20, 30, 100, 200, 500, 1000];

/// NDCG cut points reported in results summaries.
pub const NDCG_CUTOFFS: [usize; 8] = [1, 2, 3, 4, 5, 10, 15, 20];

/// Largest cutoff accepted for `ndcgK` names.
pub const MAX_NDCG_CUTOFF: usize = 20;

/// Default comparison panel.
pub const DEFAULT_COMPARISON_METRICS: [&str; 5] = ["averagePrecision", "P5", "P10", "P15", "P20"];

/// A per-query metric that can be looked up by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MetricKind {
    /// Average precision.
    AveragePrecision,
    /// Precision at one of [`PRECISION_CUTOFFS`].
    Precision(usize),
    /// NDCG over the full ranking.
    Ndcg,
    /// NDCG at a cutoff in `1..=20`.
    NdcgAt(usize),
    /// R-precision.
    RPrecision,
    /// Binary preference.
    BinaryPreference,
    /// Reciprocal rank.
    ReciprocalRank,
}

type Accessor = fn(&QueryEvaluation) -> f64;

const NAMED_METRICS: [(&str, MetricKind, Accessor); 5] = [
    (
        "averagePrecision",
        MetricKind::AveragePrecision,
        QueryEvaluation::average_precision,
    ),
    ("ndcg", MetricKind::Ndcg, |q| {
        q.normalized_discounted_cumulative_gain(None)
    }),
    ("rPrecision", MetricKind::RPrecision, QueryEvaluation::r_precision),
    (
        "binaryPreference",
        MetricKind::BinaryPreference,
        QueryEvaluation::binary_preference,
    ),
    (
        "reciprocalRank",
        MetricKind::ReciprocalRank,
        QueryEvaluation::reciprocal_rank,
    ),
];

impl MetricKind {
    /// Resolves a metric name.
    ///
    /// Accepted: `averagePrecision`, `ndcg`, `rPrecision`, `binaryPreference`,
    /// `reciprocalRank`, `P<k>` for `k` in [`PRECISION_CUTOFFS`], and
    /// `ndcg<k>` for `k` in `1..=20`.
    pub fn parse(name: &str) -> Result<Self> {
        if let Some((_, kind, _)) = NAMED_METRICS.iter().find(|(n, _, _)| *n == name) {
            return Ok(*kind);
        }

        let unknown = || Error::UnknownMetric(name.to_string());
        if let Some(cutoff) = name.strip_prefix('P') {
            let k = parse_cutoff(cutoff).ok_or_else(unknown)?;
            return if PRECISION_CUTOFFS.contains(&k) {
                Ok(Self::Precision(k))
            } else {
                Err(unknown())
            };
        }
        if let Some(cutoff) = name.strip_prefix("ndcg") {
            let k = parse_cutoff(cutoff).ok_or_else(unknown)?;
            return if (1..=MAX_NDCG_CUTOFF).contains(&k) {
                Ok(Self::NdcgAt(k))
            } else {
                Err(unknown())
            };
        }
        Err(unknown())
    }

    /// Evaluates this metric for one query.
    #[must_use]
    pub fn evaluate(self, query: &QueryEvaluation) -> f64 {
        match self {
            Self::Precision(k) => query.precision(k),
            Self::NdcgAt(k) => query.normalized_discounted_cumulative_gain(Some(k)),
            named => {
                let accessor = NAMED_METRICS
                    .iter()
                    .find(|(_, kind, _)| *kind == named)
                    .map(|(_, _, accessor)| *accessor);
                accessor.map_or(0.0, |f| f(query))
            }
        }
    }

    /// Row name used for this metric in results summaries.
    #[must_use]
    pub fn results_key(self) -> String {
        match self {
            Self::AveragePrecision => "map".to_string(),
            Self::Precision(k) => format!("P{k}"),
            Self::Ndcg => "ndcg".to_string(),
            Self::NdcgAt(k) => format!("ndcg{k}"),
            Self::RPrecision => "R-prec".to_string(),
            Self::BinaryPreference => "bpref".to_string(),
            Self::ReciprocalRank => "recip_rank".to_string(),
        }
    }
}

fn parse_cutoff(text: &str) -> Option<usize> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Precision(k) => write!(f, "P{k}"),
            Self::NdcgAt(k) => write!(f, "ndcg{k}"),
            named => {
                let name = NAMED_METRICS
                    .iter()
                    .find(|(_, kind, _)| kind == named)
                    .map_or("unknown", |(name, _, _)| name);
                f.write_str(name)
            }
        }
    }
}

impl FromStr for MetricKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MetricKind {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<MetricKind> for String {
    fn from(kind: MetricKind) -> Self {
        kind.to_string()
    }
}

/// Maps a metric name as spelled by a model-selection harness to the row name
/// used in results summaries.
///
/// `MAP` becomes `map`, `P@10` becomes `P10`, `NDCG@5` becomes `ndcg5`.
/// Names accepted by [`MetricKind::parse`] map to their results key. Any other
/// name is returned with `@` removed.
#[must_use]
pub fn results_key_for(name: &str) -> String {
    if let Ok(kind) = MetricKind::parse(name) {
        return kind.results_key();
    }
    if name.eq_ignore_ascii_case("map") {
        return "map".to_string();
    }
    if let Some(cutoff) = name.strip_prefix("NDCG@") {
        return format!("ndcg{cutoff}");
    }
    name.replace('@', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_named_metrics() {
        assert_eq!(
            MetricKind::parse("averagePrecision").unwrap(),
            MetricKind::AveragePrecision
        );
        assert_eq!(MetricKind::parse("ndcg").unwrap(), MetricKind::Ndcg);
        assert_eq!(
            MetricKind::parse("reciprocalRank").unwrap(),
            MetricKind::ReciprocalRank
        );
    }

    #[test]
    fn test_parse_cutoff_metrics() {
        assert_eq!(MetricKind::parse("P10").unwrap(), MetricKind::Precision(10));
        assert_eq!(MetricKind::parse("P1000").unwrap(), MetricKind::Precision(1000));
        assert_eq!(MetricKind::parse("ndcg7").unwrap(), MetricKind::NdcgAt(7));
    }

    #[test]
    fn test_parse_rejects_unknown() {
        for name in ["P7", "P", "P+5", "ndcg0", "ndcg21", "map", "MAP", "recall", ""] {
            let err = MetricKind::parse(name).unwrap_err();
            assert!(matches!(err, Error::UnknownMetric(n) if n == name));
        }
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for kind in [
            MetricKind::AveragePrecision,
            MetricKind::Precision(15),
            MetricKind::Ndcg,
            MetricKind::NdcgAt(20),
            MetricKind::RPrecision,
            MetricKind::BinaryPreference,
            MetricKind::ReciprocalRank,
        ] {
            assert_eq!(MetricKind::parse(&kind.to_string()).unwrap(), kind);
        }
    }

    #[test]
    fn test_results_key_for_harness_names() {
        assert_eq!(results_key_for("MAP"), "map");
        assert_eq!(results_key_for("P@10"), "P10");
        assert_eq!(results_key_for("NDCG@5"), "ndcg5");
        assert_eq!(results_key_for("averagePrecision"), "map");
        assert_eq!(results_key_for("bpref"), "bpref");
    }
}
