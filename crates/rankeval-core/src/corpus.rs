//! Set-level aggregation over per-query evaluations.
//!
//! Only queries present in **both** the judgments and the ranking are
//! evaluated. A query found in just one of them is dropped from every mean
//! and sum; this is intentional and each drop is logged at `warn` level and
//! recorded in [`CorpusEvaluation::dropped_queries`].

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::Result;
use crate::loader::{Judgments, QueryId, Ranking};
use crate::metric::MetricKind;
use crate::query::QueryEvaluation;

/// Which input a dropped query was missing from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MissingSide {
    /// The query was ranked but never judged.
    Judgments,
    /// The query was judged but never ranked.
    Ranking,
}

/// A query excluded from aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedQuery {
    /// Query id.
    pub query_id: QueryId,
    /// Input the query was absent from.
    pub missing_from: MissingSide,
}

/// Aggregate evaluation of one ranking against one set of judgments.
#[derive(Debug, Clone, Default)]
pub struct CorpusEvaluation {
    evaluations: BTreeMap<QueryId, QueryEvaluation>,
    dropped: Vec<DroppedQuery>,
}

impl CorpusEvaluation {
    /// Evaluates every query present in both `ranking` and `judgments`.
    #[must_use]
    pub fn new(mut ranking: Ranking, mut judgments: Judgments) -> Self {
        let mut dropped = Vec::new();
        for query_id in judgments.keys().filter(|q| !ranking.contains_key(*q)) {
            dropped.push(DroppedQuery {
                query_id: query_id.clone(),
                missing_from: MissingSide::Ranking,
            });
        }

        let mut evaluations = BTreeMap::new();
        while let Some((query_id, docs)) = ranking.pop_first() {
            match judgments.remove(&query_id) {
                Some(judged) => {
                    let evaluation = QueryEvaluation::new(query_id.clone(), docs, judged);
                    evaluations.insert(query_id, evaluation);
                }
                None => dropped.push(DroppedQuery {
                    query_id,
                    missing_from: MissingSide::Judgments,
                }),
            }
        }

        for query in &dropped {
            tracing::warn!(
                query = %query.query_id,
                missing_from = ?query.missing_from,
                "Query excluded from evaluation"
            );
        }
        dropped.sort_by(|a, b| a.query_id.cmp(&b.query_id));

        Self {
            evaluations,
            dropped,
        }
    }

    /// Builds an aggregate from already evaluated queries.
    ///
    /// A later evaluation for the same query id replaces an earlier one.
    pub fn from_evaluations(evaluations: impl IntoIterator<Item = QueryEvaluation>) -> Self {
        Self {
            evaluations: evaluations
                .into_iter()
                .map(|e| (e.query_id().to_string(), e))
                .collect(),
            dropped: Vec::new(),
        }
    }

    /// Number of evaluated queries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.evaluations.len()
    }

    /// Returns true if no query was evaluated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.evaluations.is_empty()
    }

    /// Per-query evaluations in lexicographic query order.
    pub fn evaluations(&self) -> impl Iterator<Item = &QueryEvaluation> {
        self.evaluations.values()
    }

    /// Evaluation of one query, if it was included.
    #[must_use]
    pub fn get(&self, query_id: &str) -> Option<&QueryEvaluation> {
        self.evaluations.get(query_id)
    }

    /// Queries excluded because one of the inputs lacked them.
    #[must_use]
    pub fn dropped_queries(&self) -> &[DroppedQuery] {
        &self.dropped
    }

    /// Arithmetic mean of `metric` over the included queries (0 if none).
    #[must_use]
    pub fn mean(&self, metric: MetricKind) -> f64 {
        self.mean_of(|q| metric.evaluate(q))
    }

    /// Mean average precision (MAP).
    #[must_use]
    pub fn mean_average_precision(&self) -> f64 {
        self.mean_of(QueryEvaluation::average_precision)
    }

    /// Mean precision at `k`.
    #[must_use]
    pub fn mean_precision(&self, k: usize) -> f64 {
        self.mean_of(|q| q.precision(k))
    }

    /// Mean reciprocal rank.
    #[must_use]
    pub fn mean_reciprocal_rank(&self) -> f64 {
        self.mean_of(QueryEvaluation::reciprocal_rank)
    }

    /// Mean R-precision.
    #[must_use]
    pub fn mean_r_precision(&self) -> f64 {
        self.mean_of(QueryEvaluation::r_precision)
    }

    /// Mean bpref.
    #[must_use]
    pub fn mean_binary_preference(&self) -> f64 {
        self.mean_of(QueryEvaluation::binary_preference)
    }

    /// Mean NDCG at `k`, or over full rankings when `k` is `None`.
    #[must_use]
    pub fn mean_normalized_discounted_cumulative_gain(&self, k: Option<usize>) -> f64 {
        self.mean_of(|q| q.normalized_discounted_cumulative_gain(k))
    }

    /// Sum over queries of distinct retrieved documents.
    #[must_use]
    pub fn number_retrieved(&self) -> usize {
        self.evaluations()
            .map(|q| q.retrieved_documents().len())
            .sum()
    }

    /// Sum over queries of relevant documents.
    #[must_use]
    pub fn number_relevant(&self) -> usize {
        self.evaluations()
            .map(|q| q.relevant_documents().len())
            .sum()
    }

    /// Sum over queries of relevant retrieved documents.
    #[must_use]
    pub fn number_relevant_retrieved(&self) -> usize {
        self.evaluations()
            .map(|q| q.relevant_retrieved_documents().len())
            .sum()
    }

    /// Per-query values of the metric called `name`.
    ///
    /// Fails with [`crate::Error::UnknownMetric`] for names outside the
    /// recognized set.
    pub fn evaluate_all(&self, name: &str) -> Result<BTreeMap<QueryId, f64>> {
        Ok(self.evaluate_metric(MetricKind::parse(name)?))
    }

    /// Per-query values of an already validated metric.
    #[must_use]
    pub fn evaluate_metric(&self, metric: MetricKind) -> BTreeMap<QueryId, f64> {
        self.evaluations
            .iter()
            .map(|(id, q)| (id.clone(), metric.evaluate(q)))
            .collect()
    }

    fn mean_of(&self, metric: impl Fn(&QueryEvaluation) -> f64) -> f64 {
        if self.evaluations.is_empty() {
            return 0.0;
        }
        let total: f64 = self.evaluations().map(metric).sum();
        #[allow(clippy::cast_precision_loss)]
        let mean = total / self.evaluations.len() as f64;
        mean
    }
}
