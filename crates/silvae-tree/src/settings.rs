//! Growth settings for the surrogate tree.

use silvae_proximity::{DissimilarityMatrix, Ensemble};

use crate::data::Dataset;
use crate::error::TreeError;
use crate::tree::SurrogateTree;

/// Settings controlling surrogate tree growth.
///
/// Construct via [`Settings::new`], then chain `with_*` methods. Settings
/// are immutable during growth and are passed by reference down the
/// recursion.
///
/// # Defaults
///
/// | Parameter         | Default | Meaning                                                  |
/// |-------------------|---------|----------------------------------------------------------|
/// | `imp_total`       | 1.0     | cumulative importance fraction covered by candidates     |
/// | `max_dec`         | 0.01    | minimum NMSE decrease for a split to be accepted         |
/// | `min_node_size`   | 5       | minimum node size to split, and minimum child size       |
/// | `max_depth`       | 4       | nodes at this depth are leaves (root is depth 0)         |
/// | `t_max`           | 256     | candidate thresholds evaluated per predictor per node    |
/// | `parallel_growth` | false   | grow sibling subtrees in parallel                        |
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Settings {
    pub(crate) imp_total: f64,
    pub(crate) max_dec: f64,
    pub(crate) min_node_size: usize,
    pub(crate) max_depth: usize,
    pub(crate) t_max: usize,
    pub(crate) parallel_growth: bool,
}

impl Settings {
    /// Create settings with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            imp_total: 1.0,
            max_dec: 0.01,
            min_node_size: 5,
            max_depth: 4,
            t_max: 256,
            parallel_growth: false,
        }
    }

    // --- Setters ---

    /// Set the cumulative importance fraction candidate predictors must cover.
    #[must_use]
    pub fn with_imp_total(mut self, imp_total: f64) -> Self {
        self.imp_total = imp_total;
        self
    }

    /// Set the minimum NMSE decrease required to accept a split.
    #[must_use]
    pub fn with_max_dec(mut self, max_dec: f64) -> Self {
        self.max_dec = max_dec;
        self
    }

    /// Set the minimum node size to attempt a split (also the minimum child size).
    #[must_use]
    pub fn with_min_node_size(mut self, min_node_size: usize) -> Self {
        self.min_node_size = min_node_size;
        self
    }

    /// Set the maximum tree depth. `0` yields a single root leaf.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the maximum number of candidate thresholds per predictor per node.
    #[must_use]
    pub fn with_t_max(mut self, t_max: usize) -> Self {
        self.t_max = t_max;
        self
    }

    /// Enable or disable parallel growth of sibling subtrees.
    #[must_use]
    pub fn with_parallel_growth(mut self, parallel_growth: bool) -> Self {
        self.parallel_growth = parallel_growth;
        self
    }

    // --- Getters ---

    /// Return the cumulative importance fraction.
    #[must_use]
    pub fn imp_total(&self) -> f64 {
        self.imp_total
    }

    /// Return the minimum accepted NMSE decrease.
    #[must_use]
    pub fn max_dec(&self) -> f64 {
        self.max_dec
    }

    /// Return the minimum node size.
    #[must_use]
    pub fn min_node_size(&self) -> usize {
        self.min_node_size
    }

    /// Return the maximum depth.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Return the per-predictor candidate threshold budget.
    #[must_use]
    pub fn t_max(&self) -> usize {
        self.t_max
    }

    /// Return whether sibling subtrees grow in parallel.
    #[must_use]
    pub fn parallel_growth(&self) -> bool {
        self.parallel_growth
    }

    /// Check every setting against its valid domain.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TreeError::InvalidMinNodeSize`] | `min_node_size` is zero |
    /// | [`TreeError::InvalidImportanceTotal`] | `imp_total` is outside [0, 1] |
    /// | [`TreeError::InvalidMaxDecrease`] | `max_dec` is outside [0, 1] |
    /// | [`TreeError::InvalidMaxIterations`] | `t_max` is zero |
    pub fn validate(&self) -> Result<(), TreeError> {
        if self.min_node_size < 1 {
            return Err(TreeError::InvalidMinNodeSize {
                min_node_size: self.min_node_size,
            });
        }
        if !(0.0..=1.0).contains(&self.imp_total) {
            return Err(TreeError::InvalidImportanceTotal {
                imp_total: self.imp_total,
            });
        }
        if !(0.0..=1.0).contains(&self.max_dec) {
            return Err(TreeError::InvalidMaxDecrease {
                max_dec: self.max_dec,
            });
        }
        if self.t_max < 1 {
            return Err(TreeError::InvalidMaxIterations { t_max: self.t_max });
        }
        Ok(())
    }

    /// Grow a surrogate tree for `ensemble` on `dataset`.
    ///
    /// `dissimilarity` must be the ensemble's matrix over the same
    /// observations; it is checked for shape only.
    ///
    /// # Errors
    ///
    /// | Variant                                    | When                                           |
    /// |--------------------------------------------|------------------------------------------------|
    /// | [`TreeError::InvalidMinNodeSize`] etc.     | a setting is outside its domain                |
    /// | [`TreeError::DimensionMismatch`]           | matrix size differs from the observation count |
    /// | [`TreeError::EnsembleObservationMismatch`] | a member covers a different observation count  |
    /// | [`TreeError::PredictionCountMismatch`]     | prediction count differs from observation count |
    /// | [`TreeError::ImportanceCountMismatch`]     | importance count differs from predictor count  |
    pub fn fit(
        &self,
        dataset: &Dataset,
        dissimilarity: &DissimilarityMatrix,
        ensemble: &Ensemble,
    ) -> Result<SurrogateTree, TreeError> {
        crate::tree::grow_tree(self, dataset, dissimilarity, ensemble)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}
