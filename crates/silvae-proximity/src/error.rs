//! Error types for proximity extraction and dissimilarity construction.

/// Errors from ensemble validation and dissimilarity matrix construction.
#[derive(Debug, thiserror::Error)]
pub enum ProximityError {
    /// Returned when an ensemble has no member trees.
    #[error("ensemble must contain at least one member tree")]
    EmptyEnsemble,

    /// Returned when a matrix is requested over zero observations.
    #[error("dissimilarity requires at least one observation")]
    NoObservations,

    /// Returned when an importance score is NaN or infinite.
    #[error("importance score for predictor {predictor} is not finite: {value}")]
    NonFiniteImportance {
        /// Zero-based predictor index.
        predictor: usize,
        /// The offending value.
        value: f64,
    },

    /// Returned when ensemble predictions are NaN or infinite.
    #[error("ensemble prediction for observation {observation} is not finite")]
    NonFinitePrediction {
        /// Zero-based observation index.
        observation: usize,
    },

    /// Returned when a member's leaf assignments do not cover the dataset exactly.
    #[error("member {member} assigns leaves to {got} observations, dataset has {expected}")]
    ObservationCountMismatch {
        /// Zero-based member tree index.
        member: usize,
        /// Number of observations in the dataset.
        expected: usize,
        /// Number of leaf assignments in the member.
        got: usize,
    },

    /// Returned when a parallel worker count of zero is requested.
    #[error("worker count must be at least 1, got {workers}")]
    InvalidWorkerCount {
        /// The invalid worker count.
        workers: usize,
    },

    /// Returned when the dedicated worker pool cannot be started.
    #[error("failed to start dissimilarity worker pool")]
    ThreadPool {
        /// The underlying rayon error.
        source: rayon::ThreadPoolBuildError,
    },

    /// Returned when a dense proximity matrix is not square.
    #[error("proximity matrix row {row} has {got} entries, expected {expected}")]
    NotSquare {
        /// Zero-based row index.
        row: usize,
        /// Expected row length (number of rows).
        expected: usize,
        /// Actual row length.
        got: usize,
    },

    /// Returned when a dense proximity matrix is not symmetric.
    #[error("proximity matrix is asymmetric at ({i}, {j}): {upper} vs {lower}")]
    Asymmetric {
        /// Row index.
        i: usize,
        /// Column index.
        j: usize,
        /// Value at (i, j).
        upper: f64,
        /// Value at (j, i).
        lower: f64,
    },

    /// Returned when a proximity entry falls outside [0, 1].
    #[error("proximity at ({i}, {j}) is outside [0, 1]: {value}")]
    ProximityOutOfRange {
        /// Row index.
        i: usize,
        /// Column index.
        j: usize,
        /// The offending value.
        value: f64,
    },
}
