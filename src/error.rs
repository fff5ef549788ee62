use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::data::model::Dimension;

/// Fatal failure while loading the sales dataset.
///
/// The dashboard cannot render without a dataset, so every variant aborts
/// startup (or the File → Open action).
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed Parquet: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow decode failed: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("{format} has no '{column}' column")]
    MissingColumn {
        column: &'static str,
        format: &'static str,
    },

    #[error("unexpected file layout: {0}")]
    Layout(String),

    #[error("row {row}: field '{field}': {reason}")]
    InvalidRow {
        row: usize,
        field: &'static str,
        reason: String,
    },

    #[error("dataset contains no valid records")]
    Empty,
}

// ---------------------------------------------------------------------------
// Empty-result warning (non-fatal)
// ---------------------------------------------------------------------------

/// Why a filtered view came out empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    /// Every value of this dimension was deselected.
    EmptySelection(Dimension),
    /// The date range has its start after its end.
    InvertedDateRange,
    /// The predicates are satisfiable but no record matches them.
    NoMatches,
}

/// Raised alongside (never instead of) an empty filtered view. All metrics are
/// zero and all groupings empty in this state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyResultWarning {
    pub reason: EmptyReason,
}

impl fmt::Display for EmptyResultWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            EmptyReason::EmptySelection(dim) => {
                write!(f, "No {} selected, nothing to show", dim.label().to_lowercase())
            }
            EmptyReason::InvertedDateRange => {
                f.write_str("Start date is after end date, nothing to show")
            }
            EmptyReason::NoMatches => f.write_str("No transactions match the current filters"),
        }
    }
}
