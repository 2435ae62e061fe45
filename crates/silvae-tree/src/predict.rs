//! Prediction with a grown surrogate tree.

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::data::{Column, Dataset};
use crate::error::TreeError;
use crate::node::{Node, NodeIndex};
use crate::tree::SurrogateTree;

impl SurrogateTree {
    /// Check that `dataset` has the training predictor layout.
    ///
    /// Columns must match in count, name, and kind. Categorical levels may
    /// differ; rules compare level names.
    fn check_layout(&self, dataset: &Dataset) -> Result<(), TreeError> {
        if dataset.n_predictors() != self.predictor_names.len() {
            return Err(TreeError::PredictorCountMismatch {
                expected: self.predictor_names.len(),
                got: dataset.n_predictors(),
            });
        }
        for (index, (predictor, (name, &categorical))) in dataset
            .predictors()
            .iter()
            .zip(self.predictor_names.iter().zip(&self.categorical))
            .enumerate()
        {
            if predictor.name() != name || predictor.column().is_categorical() != categorical {
                return Err(TreeError::PredictorLayoutMismatch {
                    index,
                    expected: name.clone(),
                    got: predictor.name().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Walk from the root to the leaf reached by `observation`.
    fn traverse(&self, dataset: &Dataset, observation: usize) -> NodeIndex {
        let mut idx = NodeIndex::new(0);
        loop {
            match &self.nodes[idx.index()] {
                Node::Leaf { .. } => return idx,
                Node::Split {
                    rule, left, right, ..
                } => {
                    let column: &Column = dataset.predictors()[rule.predictor().index()].column();
                    idx = if rule.goes_left(column, observation) {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Return the leaf reached by one observation of `dataset`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TreeError::PredictorCountMismatch`] | `dataset` has a different number of predictors |
    /// | [`TreeError::PredictorLayoutMismatch`] | a column differs in name or kind |
    ///
    /// # Panics
    ///
    /// Panics if `observation >= dataset.n_observations()`.
    pub fn leaf_for(&self, dataset: &Dataset, observation: usize) -> Result<NodeIndex, TreeError> {
        self.check_layout(dataset)?;
        Ok(self.traverse(dataset, observation))
    }

    /// Predict the response of one observation of `dataset`.
    ///
    /// Categorical levels never seen during growth go right at every split.
    ///
    /// # Errors
    ///
    /// Same as [`SurrogateTree::leaf_for`].
    ///
    /// # Panics
    ///
    /// Panics if `observation >= dataset.n_observations()`.
    pub fn predict_row(&self, dataset: &Dataset, observation: usize) -> Result<f64, TreeError> {
        let leaf = self.leaf_for(dataset, observation)?;
        Ok(self.nodes[leaf.index()].prediction())
    }

    /// Predict every observation of `dataset` in parallel.
    ///
    /// `result[i]` is the prediction for observation `i`.
    ///
    /// # Errors
    ///
    /// Same as [`SurrogateTree::leaf_for`].
    pub fn predict(&self, dataset: &Dataset) -> Result<Vec<f64>, TreeError> {
        self.check_layout(dataset)?;
        Ok((0..dataset.n_observations())
            .into_par_iter()
            .map(|obs| self.nodes[self.traverse(dataset, obs).index()].prediction())
            .collect())
    }
}
