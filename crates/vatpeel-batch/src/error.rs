//! Errors at the file boundary of the core.

use thiserror::Error;
use vatpeel_core::CoreError;

/// A specialized `Result` type for batch operations.
pub type BatchResult<T> = Result<T, BatchError>;

/// Errors from reading, writing, or batch-processing tabular records.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BatchError {
    /// CSV-level failure (includes underlying I/O errors).
    #[error("CSV error in '{path}': {source}")]
    Csv {
        /// File the error came from
        path: String,
        /// Underlying CSV/IO error
        #[source]
        source: csv::Error,
    },

    /// A required column is absent from the header row.
    #[error("Missing required column '{column}' in '{path}'")]
    MissingColumn {
        /// The column that was looked for
        column: &'static str,
        /// File that was inspected
        path: String,
    },

    /// Structural invariant violation from the core.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl BatchError {
    pub(crate) fn csv(path: &std::path::Path, source: csv::Error) -> Self {
        Self::Csv {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn missing_column(column: &'static str, path: &std::path::Path) -> Self {
        Self::MissingColumn {
            column,
            path: path.display().to_string(),
        }
    }
}
