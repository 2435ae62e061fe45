//! I/O error types for silvae-io.

use std::path::PathBuf;

use silvae_proximity::ProximityError;
use silvae_tree::TreeError;

/// Errors from file I/O, parsing, validation, and result serialization.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when a JSON document cannot be parsed into the expected shape.
    #[error("JSON parse error in {path}")]
    JsonParse {
        /// Path to the JSON file.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// Returned when the CSV file contains a header but zero data rows.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyDataset {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a data row has a different number of columns than the header.
    #[error("inconsistent row length in {path}: row {row_index} has {got} columns, expected {expected}")]
    InconsistentRowLength {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Expected number of columns (from header).
        expected: usize,
        /// Actual number of columns in this row.
        got: usize,
    },

    /// Returned when a numeric cell is NaN, Inf, or otherwise not a finite float.
    #[error("non-finite value in {path}: row {row_index}, column \"{column}\", raw value \"{raw}\"")]
    NonFiniteValue {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Header name of the column.
        column: String,
        /// The raw string value that failed to parse.
        raw: String,
    },

    /// Returned when a requested column is absent from the header.
    #[error("column \"{column}\" not found in {path}")]
    MissingColumn {
        /// Path to the CSV file.
        path: PathBuf,
        /// The requested column name.
        column: String,
    },

    /// Returned when the header names the same column twice.
    #[error("duplicate column \"{column}\" in {path}")]
    DuplicateColumn {
        /// Path to the CSV file.
        path: PathBuf,
        /// The duplicated column name.
        column: String,
    },

    /// Returned when only the response column is present.
    #[error("no predictor columns in {path}")]
    NoPredictorColumns {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when the ensemble reports no importance for a dataset predictor.
    #[error("ensemble in {path} has no importance for predictor \"{name}\"")]
    MissingImportance {
        /// Path to the ensemble file.
        path: PathBuf,
        /// Dataset predictor name.
        name: String,
    },

    /// Returned when the ensemble reports importance for a predictor the dataset lacks.
    #[error("ensemble in {path} reports importance for unknown predictor \"{name}\"")]
    UnknownPredictor {
        /// Path to the ensemble file.
        path: PathBuf,
        /// Importance key with no matching dataset column.
        name: String,
    },

    /// Returned when an ensemble section covers a different number of observations than the dataset.
    #[error("ensemble {section} in {path} covers {got} observations, dataset has {expected}")]
    ObservationCountMismatch {
        /// Path to the ensemble file.
        path: PathBuf,
        /// Offending part of the document, e.g. `leaves[2]` or `predictions`.
        section: String,
        /// Number of dataset observations.
        expected: usize,
        /// Number of observations in the section.
        got: usize,
    },

    /// Returned when loaded ensemble data fails validation.
    #[error("invalid ensemble in {path}")]
    Ensemble {
        /// Path to the ensemble file.
        path: PathBuf,
        /// Underlying validation error.
        source: ProximityError,
    },

    /// Returned when a dense proximity matrix fails validation.
    #[error("invalid proximity matrix in {path}")]
    Proximity {
        /// Path to the CSV file.
        path: PathBuf,
        /// Underlying validation error.
        source: ProximityError,
    },

    /// Returned when loaded table data fails dataset validation.
    #[error("invalid dataset in {path}")]
    Dataset {
        /// Path to the CSV file.
        path: PathBuf,
        /// Underlying validation error.
        source: TreeError,
    },

    /// Returned when the experiment name contains characters outside `[a-zA-Z0-9_-]`.
    #[error("invalid experiment name \"{name}\": must match [a-zA-Z0-9_-]+")]
    InvalidExperimentName {
        /// The invalid name.
        name: String,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a result file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a CSV result file cannot be written.
    #[error("cannot write CSV file {path}")]
    CsvWrite {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when a result cannot be serialized to JSON.
    #[error("cannot serialize result for {path}")]
    Serialize {
        /// Destination path of the artifact.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
}
