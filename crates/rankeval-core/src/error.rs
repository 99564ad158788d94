//! Error types for rankeval-core.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Evaluation engine error types.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input line (missing fields, non-numeric value).
    #[error("Format error at line {line}: {message}")]
    Format {
        /// 1-based line number in the offending input.
        line: usize,
        /// What was wrong with the line.
        message: String,
    },

    /// An expected input file does not exist.
    #[error("Missing file: {}", .0.display())]
    MissingFile(PathBuf),

    /// Metric name outside the recognized set.
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    /// A results summary exists but has no `all` row for the metric.
    #[error("Metric '{metric}' has no aggregate row in {}", file.display())]
    MetricNotFound {
        /// Results-file key that was searched for.
        metric: String,
        /// Results file that was searched.
        file: PathBuf,
    },

    /// Feature file and prediction file disagree on the number of rows.
    #[error("Row count mismatch: {features} feature rows vs {predictions} predictions")]
    LengthMismatch {
        /// Rows in the feature/label file.
        features: usize,
        /// Rows in the prediction-score file.
        predictions: usize,
    },

    /// Fewer fold results files than folds requested.
    #[error("Expected {expected} fold results files, got {found}")]
    FoldCount {
        /// Number of folds requested.
        expected: usize,
        /// Number of results files supplied.
        found: usize,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn format(line: usize, message: impl Into<String>) -> Self {
        Self::Format {
            line,
            message: message.into(),
        }
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type alias for evaluation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Opens `path` for buffered reading, mapping a missing file to [`Error::MissingFile`].
pub(crate) fn open_reader(path: &Path) -> Result<BufReader<File>> {
    match File::open(path) {
        Ok(file) => Ok(BufReader::new(file)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            Err(Error::MissingFile(path.to_path_buf()))
        }
        Err(err) => Err(err.into()),
    }
}
