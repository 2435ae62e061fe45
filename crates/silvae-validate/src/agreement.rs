//! Agreement between surrogate and ensemble predictions.

use tracing::{instrument, warn};

use silvae_proximity::Ensemble;
use silvae_tree::{Dataset, SurrogateTree};

use crate::error::ValidateError;

/// How closely tree predictions track ensemble predictions.
///
/// The ensemble predictions are the reference: `r_squared` is the share
/// of their variance reproduced by the tree.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Agreement {
    /// `1 - SS_res / SS_tot`; 0 when the ensemble predictions are constant.
    pub r_squared: f64,
    /// Root mean squared difference.
    pub rmse: f64,
    /// Pearson correlation; 0 when either side is constant.
    pub correlation: f64,
    /// Number of compared observations.
    pub n_observations: usize,
}

impl Agreement {
    /// Compare two prediction vectors of equal length.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ValidateError::PredictionLengthMismatch`] | the vectors differ in length |
    /// | [`ValidateError::EmptyPredictions`] | the vectors are empty |
    pub fn between(tree: &[f64], ensemble: &[f64]) -> Result<Self, ValidateError> {
        if tree.len() != ensemble.len() {
            return Err(ValidateError::PredictionLengthMismatch {
                tree: tree.len(),
                ensemble: ensemble.len(),
            });
        }
        if tree.is_empty() {
            return Err(ValidateError::EmptyPredictions);
        }

        let n = tree.len() as f64;
        let mean_t = tree.iter().sum::<f64>() / n;
        let mean_e = ensemble.iter().sum::<f64>() / n;

        let (mut ss_res, mut ss_t, mut ss_e, mut cross) = (0.0, 0.0, 0.0, 0.0);
        for (&t, &e) in tree.iter().zip(ensemble) {
            let dt = t - mean_t;
            let de = e - mean_e;
            ss_res += (t - e) * (t - e);
            ss_t += dt * dt;
            ss_e += de * de;
            cross += dt * de;
        }

        let r_squared = if ss_e > 0.0 { 1.0 - ss_res / ss_e } else { 0.0 };
        let correlation = if ss_t > 0.0 && ss_e > 0.0 {
            cross / (ss_t * ss_e).sqrt()
        } else {
            0.0
        };

        Ok(Self {
            r_squared,
            rmse: (ss_res / n).sqrt(),
            correlation,
            n_observations: tree.len(),
        })
    }

    /// Compare the tree's in-sample predictions with the ensemble's.
    ///
    /// Returns `Ok(None)` when the ensemble carries no predictions.
    ///
    /// # Errors
    ///
    /// Returns [`ValidateError::Tree`] when `dataset` does not match the
    /// tree's predictor layout, plus the errors of [`Agreement::between`].
    #[instrument(skip_all, fields(n_observations = dataset.n_observations()))]
    pub fn for_tree(
        tree: &SurrogateTree,
        dataset: &Dataset,
        ensemble: &Ensemble,
    ) -> Result<Option<Self>, ValidateError> {
        let Some(reference) = ensemble.predictions() else {
            warn!("ensemble has no predictions; skipping agreement");
            return Ok(None);
        };
        let predicted = tree.predict(dataset)?;
        Self::between(&predicted, reference).map(Some)
    }
}
