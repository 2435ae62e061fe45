/// Errors from surrogate tree configuration, data validation, and prediction.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// Returned when `min_node_size` is zero.
    #[error("min_node_size must be at least 1, got {min_node_size}")]
    InvalidMinNodeSize {
        /// The invalid min_node_size value provided.
        min_node_size: usize,
    },

    /// Returned when `imp_total` is not in [0.0, 1.0].
    #[error("imp_total must be in [0.0, 1.0], got {imp_total}")]
    InvalidImportanceTotal {
        /// The invalid imp_total value provided.
        imp_total: f64,
    },

    /// Returned when `max_dec` is not in [0.0, 1.0].
    #[error("max_dec must be in [0.0, 1.0], got {max_dec}")]
    InvalidMaxDecrease {
        /// The invalid max_dec value provided.
        max_dec: f64,
    },

    /// Returned when `t_max` is zero.
    #[error("t_max must be at least 1, got {t_max}")]
    InvalidMaxIterations {
        /// The invalid t_max value provided.
        t_max: usize,
    },

    /// Returned when the dataset has zero observations.
    #[error("dataset has zero observations")]
    EmptyDataset,

    /// Returned when the dataset has zero predictor columns.
    #[error("dataset has zero predictor columns")]
    ZeroPredictors,

    /// Returned when two predictor columns share a name.
    #[error("duplicate predictor name \"{predictor}\"")]
    DuplicatePredictor {
        /// The repeated name.
        predictor: String,
    },

    /// Returned when a predictor column length differs from the response length.
    #[error("predictor \"{predictor}\" has {got} values, expected {expected}")]
    ColumnLengthMismatch {
        /// Name of the offending predictor.
        predictor: String,
        /// Number of response values.
        expected: usize,
        /// Number of values in the predictor column.
        got: usize,
    },

    /// Returned when a continuous predictor value is NaN or infinite.
    #[error("non-finite value in predictor \"{predictor}\" at observation {observation}")]
    NonFiniteValue {
        /// Name of the offending predictor.
        predictor: String,
        /// Zero-based observation index.
        observation: usize,
    },

    /// Returned when a response value is NaN or infinite.
    #[error("non-finite response at observation {observation}")]
    NonFiniteResponse {
        /// Zero-based observation index.
        observation: usize,
    },

    /// Returned when a categorical code has no matching level.
    #[error("predictor \"{predictor}\" has code {code} at observation {observation}, but only {n_levels} levels")]
    CategoryOutOfRange {
        /// Name of the offending predictor.
        predictor: String,
        /// Zero-based observation index.
        observation: usize,
        /// The out-of-range code.
        code: u32,
        /// Number of declared levels.
        n_levels: usize,
    },

    /// Returned when the dissimilarity matrix and dataset disagree on size.
    #[error("dissimilarity matrix covers {matrix} observations, dataset has {dataset}")]
    DimensionMismatch {
        /// Dimension of the dissimilarity matrix.
        matrix: usize,
        /// Number of dataset observations.
        dataset: usize,
    },

    /// Returned when an ensemble member covers a different number of observations.
    #[error("ensemble member {member} covers {got} observations, dataset has {expected}")]
    EnsembleObservationMismatch {
        /// Zero-based member index.
        member: usize,
        /// Number of dataset observations.
        expected: usize,
        /// Number of observations covered by the member.
        got: usize,
    },

    /// Returned when the ensemble carries a different number of predictions than observations.
    #[error("ensemble reports {got} predictions, dataset has {expected} observations")]
    PredictionCountMismatch {
        /// Number of dataset observations.
        expected: usize,
        /// Number of ensemble predictions.
        got: usize,
    },

    /// Returned when the ensemble importance vector length differs from the predictor count.
    #[error("ensemble reports {got} importance scores, dataset has {expected} predictors")]
    ImportanceCountMismatch {
        /// Number of dataset predictors.
        expected: usize,
        /// Number of importance scores.
        got: usize,
    },

    /// Returned when a prediction dataset has a different number of predictors.
    #[error("prediction input has {got} predictors, expected {expected}")]
    PredictorCountMismatch {
        /// Number of predictors the tree was grown on.
        expected: usize,
        /// Number of predictors in the prediction input.
        got: usize,
    },

    /// Returned when a prediction dataset column differs in kind or name.
    #[error("prediction input column {index} (\"{got}\") does not match training predictor \"{expected}\"")]
    PredictorLayoutMismatch {
        /// Zero-based predictor position.
        index: usize,
        /// Training predictor name.
        expected: String,
        /// Prediction input predictor name.
        got: String,
    },
}
