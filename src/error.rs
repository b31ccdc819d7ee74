//! Error types for table loading and transformation.
//!
//! Every table operation returns [`TableError`]. The binaries wrap these in
//! `anyhow` with file or step context.

use polars::prelude::PolarsError;
use thiserror::Error;

use crate::models::Label;

/// Errors raised while loading or transforming a table.
#[derive(Debug, Error)]
pub enum TableError {
    /// Failed to open or read a file.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The spreadsheet could not be parsed.
    #[error("Failed to parse spreadsheet {path}: {message}")]
    Spreadsheet { path: String, message: String },

    /// The file has no sheet or no header row.
    #[error("{0} contains no data")]
    EmptySource(String),

    /// File extension with no loader.
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// A declared column is absent.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// A row label is absent from the index.
    #[error("Label not found in index: {0}")]
    MissingLabel(Label),

    /// Truncation needs labels in increasing order.
    #[error("Truncate requires a sorted index")]
    UnsortedIndex,

    /// A date literal that is not `YYYY-MM-DD`.
    #[error("Invalid date literal '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    /// A literal or operation does not fit the column dtype.
    #[error("Type mismatch on column '{column}': expected {expected}, found {found}")]
    TypeMismatch {
        column: String,
        expected: String,
        found: String,
    },

    /// A text pattern that does not compile.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// Row or schema shapes do not line up.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Error from the dataframe engine.
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
}

pub type Result<T> = std::result::Result<T, TableError>;

impl TableError {
    pub(crate) fn type_mismatch(
        column: &str,
        expected: impl Into<String>,
        found: impl ToString,
    ) -> Self {
        TableError::TypeMismatch {
            column: column.to_string(),
            expected: expected.into(),
            found: found.to_string(),
        }
    }
}
