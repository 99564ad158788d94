//! Paired significance testing between two systems.
//!
//! A [`Comparator`] pairs the per-query values of one metric from a baseline
//! and a treatment run. Only queries present in both mappings are compared.
//! Pairs are kept in lexicographic query order, which fixes the order in which
//! the randomized test draws from its seeded generator.

mod stats;

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::loader::QueryId;

/// Default tolerance under which two metric values count as equal.
pub const DEFAULT_TIE_EPSILON: f64 = 1e-6;

/// Default number of trials for [`Comparator::randomized_test`].
pub const DEFAULT_RANDOMIZED_TRIALS: usize = 10_000;

/// Default seed for [`Comparator::randomized_test`].
pub const DEFAULT_SEED: u64 = 0x5EED;

/// Spread of paired differences below which the t statistic is undefined.
const ZERO_SPREAD: f64 = 1e-12;

/// Result of the paired t-test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairedTTest {
    /// `mean(d) / (stddev(d) / sqrt(n))`, 0 when undefined.
    pub t_statistic: f64,
    /// `n - 1`, 0 when fewer than two pairs.
    pub degrees_of_freedom: usize,
    /// Two-sided p-value, 1 when the statistic is undefined.
    pub p_value: f64,
}

impl PairedTTest {
    const UNDEFINED: Self = Self {
        t_statistic: 0.0,
        degrees_of_freedom: 0,
        p_value: 1.0,
    };
}

/// Paired comparison of one metric across two systems.
#[derive(Debug, Clone)]
pub struct Comparator {
    pairs: Vec<(QueryId, f64, f64)>,
    epsilon: f64,
}

impl Comparator {
    /// Pairs up queries present in both `baseline` and `treatment`.
    #[must_use]
    pub fn new(baseline: &BTreeMap<QueryId, f64>, treatment: &BTreeMap<QueryId, f64>) -> Self {
        let pairs: Vec<(QueryId, f64, f64)> = baseline
            .iter()
            .filter_map(|(query, &b)| treatment.get(query).map(|&t| (query.clone(), b, t)))
            .collect();

        let ignored = baseline.len() + treatment.len() - 2 * pairs.len();
        if ignored > 0 {
            tracing::debug!(
                compared = pairs.len(),
                ignored,
                "Queries missing from one system were ignored"
            );
        }

        Self {
            pairs,
            epsilon: DEFAULT_TIE_EPSILON,
        }
    }

    /// Sets the tolerance under which two values are considered equal.
    #[must_use]
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon.abs();
        self
    }

    /// Number of compared queries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns true if no query is shared by both systems.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Compared queries in lexicographic order.
    pub fn queries(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(q, _, _)| q.as_str())
    }

    /// Mean baseline value over compared queries.
    #[must_use]
    pub fn mean_baseline_metric(&self) -> f64 {
        mean(self.pairs.iter().map(|(_, b, _)| *b), self.pairs.len())
    }

    /// Mean treatment value over compared queries.
    #[must_use]
    pub fn mean_treatment_metric(&self) -> f64 {
        mean(self.pairs.iter().map(|(_, _, t)| *t), self.pairs.len())
    }

    /// Queries where the baseline beats the treatment by more than epsilon.
    #[must_use]
    pub fn count_baseline_better(&self) -> usize {
        self.differences()
            .filter(|d| *d < -self.epsilon)
            .count()
    }

    /// Queries where the treatment beats the baseline by more than epsilon.
    #[must_use]
    pub fn count_treatment_better(&self) -> usize {
        self.differences().filter(|d| *d > self.epsilon).count()
    }

    /// Queries whose values differ by at most epsilon.
    #[must_use]
    pub fn count_equal(&self) -> usize {
        self.len() - self.count_baseline_better() - self.count_treatment_better()
    }

    /// Paired t-test on `d_i = treatment_i - baseline_i`.
    ///
    /// Undefined (t = 0, p = 1) with fewer than two pairs or when every
    /// difference is the same.
    #[must_use]
    pub fn paired_t_test(&self) -> PairedTTest {
        let n = self.pairs.len();
        if n < 2 {
            return PairedTTest::UNDEFINED;
        }

        let mean_diff = mean(self.differences(), n);
        #[allow(clippy::cast_precision_loss)]
        let variance = self
            .differences()
            .map(|d| (d - mean_diff).powi(2))
            .sum::<f64>()
            / (n - 1) as f64;
        let deviation = variance.sqrt();
        if deviation < ZERO_SPREAD {
            return PairedTTest::UNDEFINED;
        }

        #[allow(clippy::cast_precision_loss)]
        let t = mean_diff / (deviation / (n as f64).sqrt());
        PairedTTest {
            t_statistic: t,
            degrees_of_freedom: n - 1,
            p_value: stats::student_t_two_sided(t, n - 1),
        }
    }

    /// Exact two-sided sign test p-value; ties are excluded.
    #[must_use]
    pub fn sign_test(&self) -> f64 {
        let wins = self.count_treatment_better();
        let losses = self.count_baseline_better();
        stats::binomial_two_sided(wins.min(losses), wins + losses)
    }

    /// Paired randomization test p-value.
    ///
    /// Each of `trials` rounds flips every query's baseline/treatment label with
    /// probability 0.5 and recomputes the mean difference. The p-value is the
    /// fraction of rounds whose absolute mean difference reaches the observed
    /// one. Identical `seed`s give identical results.
    #[must_use]
    pub fn randomized_test(&self, trials: usize, seed: u64) -> f64 {
        let n = self.pairs.len();
        if n == 0 || trials == 0 {
            return 1.0;
        }

        let diffs: Vec<f64> = self.differences().collect();
        let observed = mean(diffs.iter().copied(), n).abs();

        let mut rng = StdRng::seed_from_u64(seed);
        let mut extreme = 0usize;
        for _ in 0..trials {
            let sum: f64 = diffs
                .iter()
                .map(|&d| if rng.gen_bool(0.5) { -d } else { d })
                .sum();
            #[allow(clippy::cast_precision_loss)]
            let statistic = sum / n as f64;
            if statistic.abs() >= observed {
                extreme += 1;
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let p = extreme as f64 / trials as f64;
        p
    }

    fn differences(&self) -> impl Iterator<Item = f64> + '_ {
        self.pairs.iter().map(|(_, b, t)| t - b)
    }
}

fn mean(values: impl Iterator<Item = f64>, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let mean = values.sum::<f64>() / n as f64;
    mean
}
