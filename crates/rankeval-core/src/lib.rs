//! # rankeval core
//!
//! Evaluation engine for ranked retrieval output.
//!
//! Given a TREC ranking file and a relevance judgments (qrels) file, `rankeval`
//! computes the standard per-query and corpus-level metrics, compares two
//! systems with paired significance tests, and stages cross-validation folds
//! of a learning-to-rank run into evaluable files.
//!
//! ## Features
//!
//! - **Metrics**: precision at fixed cutoffs, average precision, R-precision,
//!   bpref, reciprocal rank, NDCG with or without a cutoff
//! - **Comparison**: paired t-test, sign test, seeded randomization test
//! - **trec_eval layout**: results summaries written and read back
//! - **Folds**: LETOR feature and prediction files merged into qrels and runs
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rankeval_core::{load_judgments, load_ranking, CorpusEvaluation, ResultsSummary};
//!
//! fn main() -> rankeval_core::Result<()> {
//!     let ranking = load_ranking("run.txt")?;
//!     let judgments = load_judgments("qrels.txt")?;
//!
//!     let evaluation = CorpusEvaluation::new(ranking, judgments);
//!     println!("MAP = {:.4}", evaluation.mean_average_precision());
//!
//!     ResultsSummary::from_evaluation(&evaluation).save("results")?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
// Clippy lints configured in workspace Cargo.toml [workspace.lints.clippy]
#![cfg_attr(
    test,
    allow(
        clippy::float_cmp,
        clippy::uninlined_format_args,
        clippy::cast_precision_loss
    )
)]

pub mod compare;
#[cfg(test)]
mod compare_tests;
pub mod config;
pub mod corpus;
pub mod error;
pub mod fold;
pub mod loader;
pub mod metric;
pub mod query;
pub mod report;
pub mod results;

pub use compare::{Comparator, PairedTTest};
pub use config::EvalConfig;
pub use corpus::{CorpusEvaluation, DroppedQuery, MissingSide};
pub use error::{Error, Result};
pub use fold::{merge_fold, parse_results, FoldDocument, FoldSummary, MergedFold, QueryGroup};
pub use loader::{
    load_judgments, load_ranking, read_judgments, read_ranking, Judgment, Judgments, QueryId,
    RankedDocument, Ranking,
};
pub use metric::{results_key_for, MetricKind};
pub use query::QueryEvaluation;
pub use report::{ComparisonReport, ComparisonRow};
pub use results::{ResultRow, ResultValue, ResultsSummary, ALL_TARGET};
