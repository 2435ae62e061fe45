use std::fmt;

use crate::error::ProximityError;

/// Terminal leaf identifier within a single member tree.
///
/// Identifiers are only comparable within the member that produced them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct LeafId(u32);

impl LeafId {
    /// Create a leaf identifier from the collaborator's raw leaf number.
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Return the raw leaf number.
    #[must_use]
    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for LeafId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Leaf assignments of one member tree, indexed by observation.
///
/// `None` marks an observation with no recorded leaf in this member; such
/// an observation does not take part in this member's co-occurrence vote.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MemberLeaves {
    leaves: Vec<Option<LeafId>>,
}

impl MemberLeaves {
    /// Wrap a per-observation leaf vector.
    #[must_use]
    pub fn new(leaves: Vec<Option<LeafId>>) -> Self {
        Self { leaves }
    }

    /// Return the leaf of `observation`, if recorded.
    #[must_use]
    pub fn leaf(&self, observation: usize) -> Option<LeafId> {
        self.leaves.get(observation).copied().flatten()
    }

    /// Return the number of observations covered by this member.
    #[must_use]
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// Return true if the member covers no observations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Return the raw per-observation leaf slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Option<LeafId>] {
        &self.leaves
    }
}

/// Read-only view of a fitted regression ensemble.
///
/// Holds only what distillation consumes: per-member leaf assignments,
/// one importance score per predictor (dataset column order) and,
/// optionally, the ensemble's prediction for every training observation.
#[derive(Debug, Clone)]
pub struct Ensemble {
    members: Vec<MemberLeaves>,
    importances: Vec<f64>,
    predictions: Option<Vec<f64>>,
}

impl Ensemble {
    /// Create an ensemble view from raw leaf numbers.
    ///
    /// `leaves[member][observation]` is the terminal leaf of `observation`
    /// in `member`, or `None` when unrecorded.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ProximityError::EmptyEnsemble`] | `leaves` is empty |
    /// | [`ProximityError::NonFiniteImportance`] | an importance is NaN or infinite |
    pub fn new(leaves: Vec<Vec<Option<u32>>>, importances: Vec<f64>) -> Result<Self, ProximityError> {
        if leaves.is_empty() {
            return Err(ProximityError::EmptyEnsemble);
        }
        if let Some((predictor, &value)) = importances
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite())
        {
            return Err(ProximityError::NonFiniteImportance { predictor, value });
        }
        let members = leaves
            .into_iter()
            .map(|member| MemberLeaves::new(member.into_iter().map(|l| l.map(LeafId::new)).collect()))
            .collect();
        Ok(Self {
            members,
            importances,
            predictions: None,
        })
    }

    /// Attach the ensemble's in-sample predictions.
    ///
    /// # Errors
    ///
    /// Returns [`ProximityError::NonFinitePrediction`] if any prediction is NaN or infinite.
    pub fn with_predictions(mut self, predictions: Vec<f64>) -> Result<Self, ProximityError> {
        if let Some(observation) = predictions.iter().position(|p| !p.is_finite()) {
            return Err(ProximityError::NonFinitePrediction { observation });
        }
        self.predictions = Some(predictions);
        Ok(self)
    }

    /// Return the number of member trees.
    #[must_use]
    pub fn n_members(&self) -> usize {
        self.members.len()
    }

    /// Return the member leaf assignments.
    #[must_use]
    pub fn members(&self) -> &[MemberLeaves] {
        &self.members
    }

    /// Return the per-predictor importance scores.
    #[must_use]
    pub fn importances(&self) -> &[f64] {
        &self.importances
    }

    /// Return the ensemble predictions, if attached.
    #[must_use]
    pub fn predictions(&self) -> Option<&[f64]> {
        self.predictions.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_id_roundtrip() {
        assert_eq!(LeafId::new(9).value(), 9);
        assert_eq!(format!("{}", LeafId::new(3)), "3");
    }

    #[test]
    fn member_leaf_lookup() {
        let member = MemberLeaves::new(vec![Some(LeafId::new(1)), None]);
        assert_eq!(member.leaf(0), Some(LeafId::new(1)));
        assert_eq!(member.leaf(1), None);
        assert_eq!(member.leaf(5), None);
        assert_eq!(member.len(), 2);
    }

    #[test]
    fn empty_ensemble_error() {
        let err = Ensemble::new(vec![], vec![1.0]).unwrap_err();
        assert!(matches!(err, ProximityError::EmptyEnsemble));
    }

    #[test]
    fn non_finite_importance_error() {
        let err = Ensemble::new(vec![vec![Some(0)]], vec![1.0, f64::NAN]).unwrap_err();
        assert!(matches!(err, ProximityError::NonFiniteImportance { predictor: 1, .. }));
    }

    #[test]
    fn predictions_attached() {
        let ens = Ensemble::new(vec![vec![Some(0), Some(1)]], vec![1.0])
            .unwrap()
            .with_predictions(vec![0.5, 1.5])
            .unwrap();
        assert_eq!(ens.predictions(), Some(&[0.5, 1.5][..]));
        assert_eq!(ens.n_members(), 1);
    }

    #[test]
    fn non_finite_prediction_error() {
        let err = Ensemble::new(vec![vec![Some(0)]], vec![1.0])
            .unwrap()
            .with_predictions(vec![f64::INFINITY])
            .unwrap_err();
        assert!(matches!(err, ProximityError::NonFinitePrediction { observation: 0 }));
    }
}
