//! Cross-validation fold staging.
//!
//! A learning-to-rank run scores one held-out fold at a time. [`merge_fold`]
//! joins the fold's LETOR feature file with the model's prediction file and
//! produces the judgments and ranking records the loaders read back.
//! [`parse_results`] averages one metric over the per-fold results summaries.
//!
//! Feature file lines look like
//!
//! ```text
//! 2 qid:10 1:0.03 2:0.66 3:1.00 # docid = GX000-00-0000000
//! ```
//!
//! and the prediction file holds one score per line, in the same row order.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{open_reader, Error, Result};
use crate::loader::{Judgment, Judgments, QueryId, RankedDocument, Ranking};
use crate::metric::results_key_for;
use crate::results::ResultsSummary;

/// One scored instance of a fold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoldDocument {
    /// Document id from the feature line comment.
    pub doc_id: String,
    /// True relevance grade.
    pub grade: i32,
    /// Model score.
    pub score: f64,
    /// 1-based line number in the feature file.
    pub row: usize,
}

/// Documents of one contiguous query block, best score first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryGroup {
    /// Query id without the `qid:` prefix.
    pub query_id: QueryId,
    /// Ranked documents; equal scores keep feature file order.
    pub documents: Vec<FoldDocument>,
}

/// A fold joined with its predictions and ranked per query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedFold {
    groups: Vec<QueryGroup>,
    run_tag: String,
}

struct FeatureRow {
    row: usize,
    query_id: QueryId,
    grade: i32,
    doc_id: String,
}

/// Merges a feature file with its prediction file.
pub fn merge_fold(
    features: impl AsRef<Path>,
    predictions: impl AsRef<Path>,
    run_tag: &str,
) -> Result<MergedFold> {
    let features = features.as_ref();
    let predictions = predictions.as_ref();
    let merged = merge_readers(
        open_reader(features)?,
        open_reader(predictions)?,
        run_tag,
    )?;
    tracing::debug!(
        features = %features.display(),
        predictions = %predictions.display(),
        queries = merged.groups.len(),
        "Merged fold"
    );
    Ok(merged)
}

/// Merges feature and prediction streams.
///
/// Rows are grouped by query as they appear: a change of query id closes the
/// current group. Blank lines are ignored in both streams. A document id seen
/// earlier for the same query is renamed to `<docid>-<line>` so the written
/// judgments load back.
pub fn merge_readers<F: BufRead, P: BufRead>(
    features: F,
    predictions: P,
    run_tag: &str,
) -> Result<MergedFold> {
    let mut rows = read_feature_rows(features)?;
    let scores = read_prediction_scores(predictions)?;
    if rows.len() != scores.len() {
        return Err(Error::LengthMismatch {
            features: rows.len(),
            predictions: scores.len(),
        });
    }

    rename_repeated_documents(&mut rows);

    let mut groups: Vec<QueryGroup> = Vec::new();
    let mut closed: HashSet<QueryId> = HashSet::new();
    for (row, score) in rows.into_iter().zip(scores) {
        let document = FoldDocument {
            doc_id: row.doc_id,
            grade: row.grade,
            score,
            row: row.row,
        };
        match groups.last_mut() {
            Some(group) if group.query_id == row.query_id => group.documents.push(document),
            last => {
                if let Some(group) = last {
                    closed.insert(group.query_id.clone());
                }
                if closed.contains(&row.query_id) {
                    tracing::warn!(
                        query = %row.query_id,
                        line = row.row,
                        "Query rows are not contiguous; starting a separate group"
                    );
                }
                groups.push(QueryGroup {
                    query_id: row.query_id,
                    documents: vec![document],
                });
            }
        }
    }

    for group in &mut groups {
        group
            .documents
            .sort_by(|a, b| b.score.total_cmp(&a.score));
    }

    Ok(MergedFold {
        groups,
        run_tag: run_tag.to_string(),
    })
}

fn rename_repeated_documents(rows: &mut [FeatureRow]) {
    let mut seen: HashMap<QueryId, HashSet<String>> = HashMap::new();
    for row in rows {
        let ids = seen.entry(row.query_id.clone()).or_default();
        if ids.contains(&row.doc_id) {
            let mut renamed = format!("{}-{}", row.doc_id, row.row);
            while ids.contains(&renamed) {
                renamed = format!("{renamed}-{}", row.row);
            }
            tracing::warn!(
                query = %row.query_id,
                doc = %row.doc_id,
                line = row.row,
                renamed = %renamed,
                "Document id repeated within a query"
            );
            row.doc_id = renamed;
        }
        ids.insert(row.doc_id.clone());
    }
}

fn read_feature_rows<R: BufRead>(reader: R) -> Result<Vec<FeatureRow>> {
    let mut rows = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let number = index + 1;
        let (data, comment) = match line.split_once('#') {
            Some((data, comment)) => (data, Some(comment)),
            None => (line.as_str(), None),
        };
        let mut fields = data.split_whitespace();
        let Some(grade) = fields.next() else {
            continue;
        };
        let grade = grade.parse::<i32>().map_err(|_| {
            Error::format(number, format!("relevance grade '{grade}' is not an integer"))
        })?;
        let query_id = fields
            .next()
            .and_then(|field| field.strip_prefix("qid:"))
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::format(number, "expected 'qid:<id>' after the grade"))?;

        let doc_id = comment
            .and_then(comment_doc_id)
            .unwrap_or_else(|| format!("{query_id}-{number}"));
        rows.push(FeatureRow {
            row: number,
            query_id: query_id.to_string(),
            grade,
            doc_id,
        });
    }
    Ok(rows)
}

/// `docid = X`, `docid=X`, `docid X` give `X`; otherwise the last comment token.
fn comment_doc_id(comment: &str) -> Option<String> {
    let mut tokens = comment.split_whitespace();
    while let Some(token) = tokens.next() {
        let Some(rest) = token.strip_prefix("docid") else {
            continue;
        };
        if rest.is_empty() {
            return tokens.find(|t| *t != "=").map(ToString::to_string);
        }
        if let Some(value) = rest.strip_prefix('=') {
            if !value.is_empty() {
                return Some(value.to_string());
            }
            return tokens.next().map(ToString::to_string);
        }
    }
    comment.split_whitespace().last().map(ToString::to_string)
}

fn read_prediction_scores<R: BufRead>(reader: R) -> Result<Vec<f64>> {
    let mut scores = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let Some(token) = line.split_whitespace().last() else {
            continue;
        };
        let score = token
            .parse::<f64>()
            .map_err(|_| Error::format(index + 1, format!("score '{token}' is not a number")))?;
        scores.push(score);
    }
    Ok(scores)
}

impl MergedFold {
    /// Query groups in feature file order.
    #[must_use]
    pub fn groups(&self) -> &[QueryGroup] {
        &self.groups
    }

    /// Run tag written in the last ranking column.
    #[must_use]
    pub fn run_tag(&self) -> &str {
        &self.run_tag
    }

    /// Number of scored instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.documents.len()).sum()
    }

    /// Returns true if the fold has no instances.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Judgments as the loader would read them from [`MergedFold::write_judgments`].
    #[must_use]
    pub fn judgments(&self) -> Judgments {
        let mut judgments = Judgments::new();
        for group in &self.groups {
            judgments
                .entry(group.query_id.clone())
                .or_default()
                .extend(
                    group
                        .documents
                        .iter()
                        .map(|d| Judgment::new(d.doc_id.clone(), d.grade)),
                );
        }
        judgments
    }

    /// Ranking as the loader would read it from [`MergedFold::write_ranking`].
    #[must_use]
    pub fn ranking(&self) -> Ranking {
        let mut ranking = Ranking::new();
        for group in &self.groups {
            ranking.entry(group.query_id.clone()).or_default().extend(
                group
                    .documents
                    .iter()
                    .enumerate()
                    .map(|(i, d)| RankedDocument::new(d.doc_id.clone(), i + 1, d.score)),
            );
        }
        ranking
    }

    /// Writes `qid 0 docid grade` records.
    pub fn write_judgments<W: Write>(&self, mut writer: W) -> Result<()> {
        for group in &self.groups {
            for document in &group.documents {
                writeln!(
                    writer,
                    "{}\t0\t{}\t{}",
                    group.query_id, document.doc_id, document.grade
                )?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// Writes `qid Q0 docid score rank runtag` records.
    pub fn write_ranking<W: Write>(&self, mut writer: W) -> Result<()> {
        for group in &self.groups {
            for (index, document) in group.documents.iter().enumerate() {
                writeln!(
                    writer,
                    "{}\tQ0\t{}\t{}\t{}\t{}",
                    group.query_id,
                    document.doc_id,
                    document.score,
                    index + 1,
                    self.run_tag
                )?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// Writes both files, replacing previous content.
    pub fn write_files(
        &self,
        judgments_path: impl AsRef<Path>,
        ranking_path: impl AsRef<Path>,
    ) -> Result<()> {
        let judgments_path = judgments_path.as_ref();
        let ranking_path = ranking_path.as_ref();
        self.write_judgments(BufWriter::new(File::create(judgments_path)?))?;
        self.write_ranking(BufWriter::new(File::create(ranking_path)?))?;
        tracing::debug!(
            judgments = %judgments_path.display(),
            ranking = %ranking_path.display(),
            instances = self.len(),
            "Wrote merged fold"
        );
        Ok(())
    }
}

/// One metric averaged over folds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoldSummary {
    /// Results-file key that was read.
    pub metric: String,
    /// Aggregate value of each fold, in file order.
    pub values: Vec<f64>,
    /// Arithmetic mean of `values`, 0 for no folds.
    pub mean: f64,
}

/// Averages the `all` row of `metric_name` over the first `num_folds` results files.
///
/// `metric_name` may use the grid-search spelling (`MAP`, `P@10`, `NDCG@5`).
pub fn parse_results<P: AsRef<Path>>(
    files: &[P],
    metric_name: &str,
    num_folds: usize,
) -> Result<FoldSummary> {
    let metric = results_key_for(metric_name);
    if files.len() < num_folds {
        return Err(Error::FoldCount {
            expected: num_folds,
            found: files.len(),
        });
    }

    let mut values = Vec::with_capacity(num_folds);
    for path in files.iter().take(num_folds) {
        let path = path.as_ref();
        let summary = ResultsSummary::load(path)?;
        let value = summary
            .aggregate(&metric)
            .ok_or_else(|| Error::MetricNotFound {
                metric: metric.clone(),
                file: PathBuf::from(path),
            })?;
        tracing::debug!(file = %path.display(), metric = %metric, value, "Fold result");
        values.push(value);
    }

    let mean = if values.is_empty() {
        0.0
    } else {
        #[allow(clippy::cast_precision_loss)]
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        mean
    };
    tracing::info!(metric = %metric, folds = values.len(), mean, "Averaged fold results");

    Ok(FoldSummary {
        metric,
        values,
        mean,
    })
}
