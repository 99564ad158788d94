//! Judgment and ranking file loaders.
//!
//! Both formats are whitespace-delimited, one record per line:
//!
//! - judgments (qrels): `qid unused docid relevanceGrade`
//! - ranking (run): `qid unused docid score rank runtag`
//!
//! Records are grouped by query id into a [`BTreeMap`], so iteration order is
//! the lexicographic order of the query-id string. Within a query, records
//! keep their file order. Blank lines are skipped.

use std::collections::{BTreeMap, HashSet};
use std::io::BufRead;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{open_reader, Error, Result};

/// Query identifier grouping judgments and ranked documents.
pub type QueryId = String;

/// Judgments grouped by query, in lexicographic query order.
pub type Judgments = BTreeMap<QueryId, Vec<Judgment>>;

/// Ranked documents grouped by query, in lexicographic query order.
pub type Ranking = BTreeMap<QueryId, Vec<RankedDocument>>;

/// A relevance judgment for one document of one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Judgment {
    /// Judged document.
    pub doc_id: String,
    /// Relevance grade; `> 0` is relevant, graded values are kept as-is.
    pub grade: i32,
}

impl Judgment {
    /// Creates a judgment.
    pub fn new(doc_id: impl Into<String>, grade: i32) -> Self {
        Self {
            doc_id: doc_id.into(),
            grade,
        }
    }
}

/// A document as placed in a ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedDocument {
    /// Retrieved document.
    pub doc_id: String,
    /// 1-based rank as written by the producer of the ranking.
    pub rank: usize,
    /// Retrieval score.
    pub score: f64,
}

impl RankedDocument {
    /// Creates a ranked document.
    pub fn new(doc_id: impl Into<String>, rank: usize, score: f64) -> Self {
        Self {
            doc_id: doc_id.into(),
            rank,
            score,
        }
    }
}

/// Loads a judgments file.
pub fn load_judgments(path: impl AsRef<Path>) -> Result<Judgments> {
    let path = path.as_ref();
    let judgments = read_judgments(open_reader(path)?)?;
    tracing::debug!(
        path = %path.display(),
        queries = judgments.len(),
        "Loaded judgments"
    );
    Ok(judgments)
}

/// Parses judgments from a reader.
///
/// A `(query, docid)` pair may be judged only once; a repeat is a format error.
pub fn read_judgments<R: BufRead>(reader: R) -> Result<Judgments> {
    let mut judgments = Judgments::new();
    let mut seen: HashSet<(String, String)> = HashSet::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = index + 1;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() < 4 {
            return Err(Error::format(
                line_no,
                format!("expected 4 judgment fields, found {}", fields.len()),
            ));
        }

        let query = fields[0];
        let doc_id = fields[2];
        let grade: i32 = fields[3].parse().map_err(|_| {
            Error::format(line_no, format!("relevance grade '{}' is not an integer", fields[3]))
        })?;

        if !seen.insert((query.to_string(), doc_id.to_string())) {
            return Err(Error::format(
                line_no,
                format!("document '{doc_id}' judged twice for query '{query}'"),
            ));
        }

        judgments
            .entry(query.to_string())
            .or_default()
            .push(Judgment::new(doc_id, grade));
    }

    Ok(judgments)
}

/// Loads a ranking file.
pub fn load_ranking(path: impl AsRef<Path>) -> Result<Ranking> {
    let path = path.as_ref();
    let ranking = read_ranking(open_reader(path)?)?;
    tracing::debug!(
        path = %path.display(),
        queries = ranking.len(),
        "Loaded ranking"
    );
    Ok(ranking)
}

/// Parses a ranking from a reader.
///
/// Field 3 is the score and field 4 the rank. Documents are appended in file
/// order and never re-sorted.
pub fn read_ranking<R: BufRead>(reader: R) -> Result<Ranking> {
    let mut ranking = Ranking::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = index + 1;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() < 6 {
            return Err(Error::format(
                line_no,
                format!("expected 6 ranking fields, found {}", fields.len()),
            ));
        }

        let score: f64 = fields[3].parse().map_err(|_| {
            Error::format(line_no, format!("score '{}' is not a number", fields[3]))
        })?;
        let rank: usize = fields[4].parse().map_err(|_| {
            Error::format(line_no, format!("rank '{}' is not an integer", fields[4]))
        })?;

        ranking
            .entry(fields[0].to_string())
            .or_default()
            .push(RankedDocument::new(fields[2], rank, score));
    }

    Ok(ranking)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_judgments_groups_lexicographically() {
        let input = "b 0 d1 1\na 0 d2 0\nb 0 d3 2\n10 0 d4 1\n";
        let judgments = read_judgments(input.as_bytes()).unwrap();

        let order: Vec<&str> = judgments.keys().map(String::as_str).collect();
        assert_eq!(order, vec!["10", "a", "b"]);
        assert_eq!(
            judgments["b"],
            vec![Judgment::new("d1", 1), Judgment::new("d3", 2)]
        );
    }

    #[test]
    fn test_read_judgments_short_line() {
        let err = read_judgments("q1 0 d1 1\nq1 0 d2\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Format { line: 2, .. }));
    }

    #[test]
    fn test_read_judgments_non_integer_grade() {
        let err = read_judgments("q1 0 d1 high\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Format { line: 1, .. }));
    }

    #[test]
    fn test_read_judgments_duplicate_document() {
        let err = read_judgments("q1 0 d1 1\nq1 0 d1 0\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Format { line: 2, .. }));
    }

    #[test]
    fn test_read_judgments_skips_blank_lines() {
        let judgments = read_judgments("\nq1 0 d1 1\n   \n".as_bytes()).unwrap();
        assert_eq!(judgments["q1"].len(), 1);
    }

    #[test]
    fn test_read_ranking_keeps_file_order() {
        let input = "q1 Q0 d2 0.5 2 run\nq1 Q0 d1 0.9 1 run\n";
        let ranking = read_ranking(input.as_bytes()).unwrap();
        let docs = &ranking["q1"];
        assert_eq!(docs[0], RankedDocument::new("d2", 2, 0.5));
        assert_eq!(docs[1], RankedDocument::new("d1", 1, 0.9));
    }

    #[test]
    fn test_read_ranking_score_before_rank() {
        let ranking = read_ranking("7 Q0 doc -3.05948 39 Exp\n".as_bytes()).unwrap();
        let doc = &ranking["7"][0];
        assert_eq!(doc.rank, 39);
        assert!((doc.score + 3.05948).abs() < 1e-12);
    }

    #[test]
    fn test_read_ranking_bad_rank() {
        let err = read_ranking("q1 Q0 d1 0.5 first run\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Format { line: 1, .. }));
    }

    #[test]
    fn test_read_ranking_missing_runtag() {
        let err = read_ranking("q1 Q0 d1 0.5 1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Format { line: 1, .. }));
    }

    #[test]
    fn test_load_judgments_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_judgments(dir.path().join("qrels")).unwrap_err();
        assert!(matches!(err, Error::MissingFile(_)));
    }
}
