//! Per-query retrieval metrics.
//!
//! A [`QueryEvaluation`] is built once from one query's ranking and judgments
//! and is immutable afterwards. Every metric is a pure function of those two
//! inputs.
//!
//! Zero-denominator policy: a metric whose denominator (relevant count, IDCG,
//! cutoff) is zero evaluates to exactly `0.0`.
//!
//! # Example
//!
//! ```rust
//! use rankeval_core::{Judgment, QueryEvaluation, RankedDocument};
//!
//! let judgments = vec![
//!     Judgment::new("d1", 1),
//!     Judgment::new("d2", 0),
//!     Judgment::new("d3", 1),
//! ];
//! let ranking = vec![
//!     RankedDocument::new("d1", 1, 0.9),
//!     RankedDocument::new("d3", 2, 0.7),
//!     RankedDocument::new("d2", 3, 0.5),
//! ];
//!
//! let eval = QueryEvaluation::new("q1", ranking, judgments);
//! assert!((eval.average_precision() - 1.0).abs() < 1e-12);
//! assert!((eval.precision(3) - 2.0 / 3.0).abs() < 1e-12);
//! ```

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::loader::{Judgment, QueryId, RankedDocument};

/// Metric values for one query, derived from its ranking and judgments.
#[derive(Debug, Clone)]
pub struct QueryEvaluation {
    query_id: QueryId,
    ranking: Vec<RankedDocument>,
    judgments: Vec<Judgment>,
    /// Grade credited at each ranked position (0 for unjudged or repeated documents).
    gains: Vec<i32>,
    /// Number of relevant documents within the first `i + 1` positions.
    relevant_seen: Vec<usize>,
    /// Whether the document at each position is judged nonrelevant.
    judged_nonrelevant_at: Vec<bool>,
    relevant: BTreeSet<String>,
    judged_nonrelevant: usize,
    /// Judgment grades sorted descending, negatives clamped to zero.
    ideal_gains: Vec<i32>,
}

impl QueryEvaluation {
    /// Evaluates `ranking` (in the given order) against `judgments`.
    ///
    /// A ranked document without a judgment counts as nonrelevant. If a
    /// document appears more than once in the ranking, only its first
    /// occurrence earns credit.
    pub fn new(
        query_id: impl Into<QueryId>,
        ranking: Vec<RankedDocument>,
        judgments: Vec<Judgment>,
    ) -> Self {
        let grades: HashMap<&str, i32> = judgments
            .iter()
            .map(|j| (j.doc_id.as_str(), j.grade))
            .collect();

        let mut seen: HashSet<&str> = HashSet::with_capacity(ranking.len());
        let mut gains = Vec::with_capacity(ranking.len());
        let mut relevant_seen = Vec::with_capacity(ranking.len());
        let mut judged_nonrelevant_at = Vec::with_capacity(ranking.len());
        let mut relevant_so_far = 0;

        for doc in &ranking {
            let first_time = seen.insert(doc.doc_id.as_str());
            let grade = grades.get(doc.doc_id.as_str()).copied();
            let gain = match grade {
                Some(g) if first_time && g > 0 => g,
                _ => 0,
            };
            if gain > 0 {
                relevant_so_far += 1;
            }
            gains.push(gain);
            relevant_seen.push(relevant_so_far);
            judged_nonrelevant_at.push(first_time && matches!(grade, Some(g) if g <= 0));
        }

        let relevant: BTreeSet<String> = judgments
            .iter()
            .filter(|j| j.grade > 0)
            .map(|j| j.doc_id.clone())
            .collect();
        let judged_nonrelevant = judgments.iter().filter(|j| j.grade <= 0).count();

        let mut ideal_gains: Vec<i32> = judgments.iter().map(|j| j.grade.max(0)).collect();
        ideal_gains.sort_by(|a, b| b.cmp(a));

        Self {
            query_id: query_id.into(),
            ranking,
            judgments,
            gains,
            relevant_seen,
            judged_nonrelevant_at,
            relevant,
            judged_nonrelevant,
            ideal_gains,
        }
    }

    /// Query this evaluation belongs to.
    #[must_use]
    pub fn query_id(&self) -> &str {
        &self.query_id
    }

    /// The ranking as supplied.
    #[must_use]
    pub fn ranking(&self) -> &[RankedDocument] {
        &self.ranking
    }

    /// The judgments as supplied.
    #[must_use]
    pub fn judgments(&self) -> &[Judgment] {
        &self.judgments
    }

    /// Distinct documents present in the ranking.
    #[must_use]
    pub fn retrieved_documents(&self) -> BTreeSet<&str> {
        self.ranking.iter().map(|d| d.doc_id.as_str()).collect()
    }

    /// Documents judged with grade `> 0`.
    #[must_use]
    pub fn relevant_documents(&self) -> BTreeSet<&str> {
        self.relevant.iter().map(String::as_str).collect()
    }

    /// Relevant documents that were retrieved.
    #[must_use]
    pub fn relevant_retrieved_documents(&self) -> BTreeSet<&str> {
        self.ranking
            .iter()
            .map(|d| d.doc_id.as_str())
            .filter(|id| self.relevant.contains(*id))
            .collect()
    }

    /// Relevant documents among the first `k` positions, divided by `k`.
    ///
    /// Positions past the end of the ranking count as nonrelevant.
    #[must_use]
    pub fn precision(&self, k: usize) -> f64 {
        if k == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let precision = self.relevant_within(k) as f64 / k as f64;
        precision
    }

    /// Mean of `precision(i)` over the positions `i` holding a relevant
    /// document, divided by the number of relevant documents.
    #[must_use]
    pub fn average_precision(&self) -> f64 {
        if self.relevant.is_empty() {
            return 0.0;
        }

        let sum: f64 = self
            .gains
            .iter()
            .enumerate()
            .filter(|(_, &gain)| gain > 0)
            .map(|(i, _)| self.precision(i + 1))
            .sum();

        #[allow(clippy::cast_precision_loss)]
        let ap = sum / self.relevant.len() as f64;
        ap
    }

    /// `1 / rank` of the first relevant document, or 0 if none is retrieved.
    #[must_use]
    pub fn reciprocal_rank(&self) -> f64 {
        self.gains
            .iter()
            .position(|&gain| gain > 0)
            .map_or(0.0, |i| {
                #[allow(clippy::cast_precision_loss)]
                let rr = 1.0 / (i + 1) as f64;
                rr
            })
    }

    /// Precision at `R`, the number of relevant documents.
    #[must_use]
    pub fn r_precision(&self) -> f64 {
        if self.relevant.is_empty() {
            return 0.0;
        }
        self.precision(self.relevant.len())
    }

    /// Binary preference (bpref).
    ///
    /// Each retrieved relevant document scores
    /// `1 - min(n_above, R) / min(R, N)` where `n_above` counts judged
    /// nonrelevant documents ranked above it, `R` the relevant documents and
    /// `N` the judged nonrelevant ones. The sum is divided by `R`. With no
    /// judged nonrelevant documents every retrieved relevant document scores 1.
    #[must_use]
    pub fn binary_preference(&self) -> f64 {
        let r = self.relevant.len();
        if r == 0 {
            return 0.0;
        }
        let denominator = r.min(self.judged_nonrelevant);

        let mut nonrelevant_above = 0usize;
        let mut sum = 0.0;
        for (&gain, &nonrelevant) in self.gains.iter().zip(&self.judged_nonrelevant_at) {
            if gain > 0 {
                sum += if denominator == 0 {
                    1.0
                } else {
                    #[allow(clippy::cast_precision_loss)]
                    let penalty = nonrelevant_above.min(r) as f64 / denominator as f64;
                    1.0 - penalty
                };
            } else if nonrelevant {
                nonrelevant_above += 1;
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let bpref = sum / r as f64;
        bpref
    }

    /// NDCG over the first `k` positions, or over the whole ranking when `k`
    /// is `None`.
    ///
    /// Gain is the graded relevance, discounted by `log2(i + 1)` for 1-based
    /// position `i`. The ideal ranking orders the judgments by descending grade.
    #[must_use]
    pub fn normalized_discounted_cumulative_gain(&self, k: Option<usize>) -> f64 {
        let k = k.unwrap_or(self.ranking.len());
        let idcg = discounted_cumulative_gain(&self.ideal_gains, k);
        if idcg <= 0.0 {
            return 0.0;
        }
        discounted_cumulative_gain(&self.gains, k) / idcg
    }

    fn relevant_within(&self, k: usize) -> usize {
        let cutoff = k.min(self.relevant_seen.len());
        if cutoff == 0 {
            0
        } else {
            self.relevant_seen[cutoff - 1]
        }
    }
}

fn discounted_cumulative_gain(gains: &[i32], k: usize) -> f64 {
    gains
        .iter()
        .take(k)
        .enumerate()
        .map(|(i, &gain)| {
            #[allow(clippy::cast_precision_loss)]
            let discount = (i as f64 + 2.0).log2();
            f64::from(gain) / discount
        })
        .sum()
}
