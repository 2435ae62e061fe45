use silvae_tree::TreeError;

/// Errors from surrogate fidelity validation.
#[derive(Debug, thiserror::Error)]
pub enum ValidateError {
    /// Returned when the permutation count is zero.
    #[error("permutation count must be at least 1, got {n_permutations}")]
    InvalidPermutationCount {
        /// The invalid permutation count provided.
        n_permutations: usize,
    },

    /// Returned when the two compared structures cover different observation counts.
    #[error("dimension mismatch: ensemble covers {ensemble} observations, tree covers {tree}")]
    DimensionMismatch {
        /// Observations covered by the ensemble dissimilarity matrix.
        ensemble: usize,
        /// Observations covered by the tree.
        tree: usize,
    },

    /// Returned when prediction vectors differ in length.
    #[error("prediction length mismatch: tree has {tree}, ensemble has {ensemble}")]
    PredictionLengthMismatch {
        /// Number of tree predictions.
        tree: usize,
        /// Number of ensemble predictions.
        ensemble: usize,
    },

    /// Returned when a prediction vector is empty.
    #[error("cannot compare empty prediction vectors")]
    EmptyPredictions,

    /// Wraps a tree error raised while predicting.
    #[error("tree prediction failed: {0}")]
    Tree(#[from] TreeError),
}
