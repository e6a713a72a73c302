//! Errors in the library.
use std::path::PathBuf;
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug)]
pub enum SwarmError {
    /// The data file could not be opened or read.
    #[error("Failed to read {path:?}: {source}")]
    Io {
        /// Path of the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A record could not be decoded or a field is not a number.
    #[error("Format error at row {row}, column {column}: {msg}")]
    Format {
        /// Zero-based index of the record, blank lines not counted.
        row: usize,
        /// Zero-based column index.
        column: usize,
        /// What went wrong.
        msg: String,
    },

    /// A row does not consist of the expected number of fields.
    #[error("Shape error at row {row}: expected {expected} fields, found {found}")]
    Shape {
        /// Zero-based index of the record, blank lines not counted.
        row: usize,
        /// Number of fields a row must have.
        expected: usize,
        /// Number of fields found.
        found: usize,
    },

    /// Test fraction outside of `(0, 1)`.
    #[error("Test fraction must be in (0, 1), got {0}")]
    InvalidFraction(f64),

    /// The dataset has no rows.
    #[error("Dataset is empty")]
    EmptyDataset,

    /// A configuration value is out of range.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),
}
