use silvae_proximity::{DissimilarityMatrix, Ensemble};
use tracing::{debug, info, instrument};

use crate::{
    TreeError,
    data::Dataset,
    importance::{RankedPredictor, rank_importances, select_candidates},
    node::{Node, NodeIndex, NodeStats, PredictorIndex, SplitRule},
    settings::Settings,
    split::{find_best_split, node_moments},
};

/// Nodes smaller than this grow both children on the current thread.
const PARALLEL_MIN_OBSERVATIONS: usize = 64;

/// Read-only inputs shared by every node during growth.
struct Growth<'a> {
    dataset: &'a Dataset,
    candidates: &'a [PredictorIndex],
    settings: &'a Settings,
    root_sse: f64,
}

/// A subtree before it is laid out in the arena.
enum Grown {
    Leaf(NodeStats),
    Split {
        stats: NodeStats,
        rule: SplitRule,
        split_nmse: f64,
        importance: f64,
        left: Box<Grown>,
        right: Box<Grown>,
    },
}

/// Validate inputs and grow the surrogate tree.
#[instrument(
    skip_all,
    fields(
        n_observations = dataset.n_observations(),
        n_predictors = dataset.n_predictors(),
        n_members = ensemble.n_members(),
    )
)]
pub(crate) fn grow_tree(
    settings: &Settings,
    dataset: &Dataset,
    dissimilarity: &DissimilarityMatrix,
    ensemble: &Ensemble,
) -> Result<SurrogateTree, TreeError> {
    settings.validate()?;

    let n = dataset.n_observations();
    if dissimilarity.len() != n {
        return Err(TreeError::DimensionMismatch {
            matrix: dissimilarity.len(),
            dataset: n,
        });
    }
    for (member, leaves) in ensemble.members().iter().enumerate() {
        if leaves.len() != n {
            return Err(TreeError::EnsembleObservationMismatch {
                member,
                expected: n,
                got: leaves.len(),
            });
        }
    }
    if let Some(predictions) = ensemble.predictions()
        && predictions.len() != n
    {
        return Err(TreeError::PredictionCountMismatch {
            expected: n,
            got: predictions.len(),
        });
    }
    if ensemble.importances().len() != dataset.n_predictors() {
        return Err(TreeError::ImportanceCountMismatch {
            expected: dataset.n_predictors(),
            got: ensemble.importances().len(),
        });
    }

    let candidates = select_candidates(ensemble.importances(), settings.imp_total);
    debug!(
        n_candidates = candidates.len(),
        imp_total = settings.imp_total,
        "selected candidate predictors"
    );

    let all: Vec<usize> = (0..n).collect();
    let (_, root_sse) = node_moments(dataset.response(), &all);
    let growth = Growth {
        dataset,
        candidates: &candidates,
        settings,
        root_sse,
    };

    let grown = grow(&growth, all, 0);
    let mut arena = Vec::new();
    flatten(grown, None, &mut arena);

    let tree = SurrogateTree {
        nodes: arena,
        predictor_names: dataset.predictor_names(),
        categorical: dataset
            .predictors()
            .iter()
            .map(|p| p.column().is_categorical())
            .collect(),
        response_name: dataset.response_name().to_string(),
        candidates,
        settings: settings.clone(),
        n_observations: n,
    };

    info!(
        n_nodes = tree.n_nodes(),
        n_leaves = tree.n_leaves(),
        depth = tree.depth(),
        "surrogate tree grown"
    );
    Ok(tree)
}

/// Grow the subtree over `observations` at `depth`.
fn grow(growth: &Growth<'_>, observations: Vec<usize>, depth: usize) -> Grown {
    let settings = growth.settings;
    let (prediction, sse) = node_moments(growth.dataset.response(), &observations);
    let nmse = if growth.root_sse > 0.0 {
        sse / growth.root_sse
    } else {
        0.0
    };

    let n_obs = observations.len();
    let stats = NodeStats {
        parent: None,
        depth,
        observations,
        prediction,
        sse,
        nmse,
    };

    if depth >= settings.max_depth || n_obs < settings.min_node_size {
        return Grown::Leaf(stats);
    }

    let Some(split) = find_best_split(
        growth.dataset,
        &stats.observations,
        sse,
        growth.candidates,
        settings,
    ) else {
        return Grown::Leaf(stats);
    };

    debug!(
        depth,
        n_obs,
        predictor = split.rule.predictor().index(),
        nmse = split.nmse,
        "accepted split"
    );

    let importance = (sse - split.sse_left - split.sse_right) / growth.root_sse;
    let (left_obs, right_obs) = (split.left_indices, split.right_indices);

    let (left, right) = if settings.parallel_growth && n_obs >= PARALLEL_MIN_OBSERVATIONS {
        rayon::join(
            || grow(growth, left_obs, depth + 1),
            || grow(growth, right_obs, depth + 1),
        )
    } else {
        (
            grow(growth, left_obs, depth + 1),
            grow(growth, right_obs, depth + 1),
        )
    };

    Grown::Split {
        stats,
        rule: split.rule,
        split_nmse: split.nmse,
        importance,
        left: Box::new(left),
        right: Box::new(right),
    }
}

/// Lay out `grown` in pre-order, returning the index of its root.
fn flatten(grown: Grown, parent: Option<NodeIndex>, arena: &mut Vec<Node>) -> NodeIndex {
    // Reserve the slot so children see a valid parent index.
    let idx = NodeIndex::new(arena.len());
    arena.push(Node::Leaf {
        stats: NodeStats::default(),
    });

    let node = match grown {
        Grown::Leaf(mut stats) => {
            stats.parent = parent;
            Node::Leaf { stats }
        }
        Grown::Split {
            mut stats,
            rule,
            split_nmse,
            importance,
            left,
            right,
        } => {
            stats.parent = parent;
            let left = flatten(*left, Some(idx), arena);
            let right = flatten(*right, Some(idx), arena);
            Node::Split {
                stats,
                rule,
                left,
                right,
                split_nmse,
                importance,
            }
        }
    };
    arena[idx.index()] = node;
    idx
}

/// A surrogate regression tree distilled from an ensemble.
///
/// Stored as an arena-based `Vec<Node>`; the root is index 0 and nodes
/// appear in pre-order (a node, its left subtree, then its right subtree).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SurrogateTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) predictor_names: Vec<String>,
    pub(crate) categorical: Vec<bool>,
    pub(crate) response_name: String,
    pub(crate) candidates: Vec<PredictorIndex>,
    pub(crate) settings: Settings,
    pub(crate) n_observations: usize,
}

impl SurrogateTree {
    /// Return all nodes in arena order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Return the node at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` does not belong to this tree.
    #[must_use]
    pub fn node(&self, index: NodeIndex) -> &Node {
        &self.nodes[index.index()]
    }

    /// Return the root node.
    #[must_use]
    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    /// Return the total number of nodes (splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the depth of the deepest node; a single root leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.nodes.iter().map(|n| n.stats().depth).max().unwrap_or(0)
    }

    /// Return the settings the tree was grown with.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Return the training predictor names in dataset order.
    #[must_use]
    pub fn predictor_names(&self) -> &[String] {
        &self.predictor_names
    }

    /// Return the training response name.
    #[must_use]
    pub fn response_name(&self) -> &str {
        &self.response_name
    }

    /// Return the number of training observations.
    #[must_use]
    pub fn n_observations(&self) -> usize {
        self.n_observations
    }

    /// Return the predictors that were eligible for splitting, in dataset order.
    #[must_use]
    pub fn candidate_predictors(&self) -> &[PredictorIndex] {
        &self.candidates
    }

    /// Return the names of the predictors eligible for splitting.
    #[must_use]
    pub fn candidate_names(&self) -> Vec<&str> {
        self.candidates
            .iter()
            .map(|p| self.predictor_names[p.index()].as_str())
            .collect()
    }

    /// Return the leaf reached by each training observation.
    ///
    /// `result[obs]` is the leaf whose observation subset contains `obs`.
    #[must_use]
    pub fn leaf_assignments(&self) -> Vec<NodeIndex> {
        let mut assignments = vec![NodeIndex::new(0); self.n_observations];
        for (idx, node) in self.nodes.iter().enumerate() {
            if let Node::Leaf { stats } = node {
                for &obs in &stats.observations {
                    assignments[obs] = NodeIndex::new(idx);
                }
            }
        }
        assignments
    }

    /// Rank predictors by the error their splits remove.
    ///
    /// Split importances are summed per predictor and normalized to sum to
    /// 1.0; a single-leaf tree reports all zeros.
    #[must_use]
    pub fn variable_importances(&self) -> Vec<RankedPredictor> {
        let mut totals = vec![0.0f64; self.predictor_names.len()];
        for node in &self.nodes {
            if let Node::Split {
                rule, importance, ..
            } = node
            {
                totals[rule.predictor().index()] += importance;
            }
        }
        rank_importances(&totals, &self.predictor_names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Predictor;

    fn fit(dataset: &Dataset, importances: Vec<f64>, settings: &Settings) -> SurrogateTree {
        let n = dataset.n_observations();
        let ensemble = Ensemble::new(vec![vec![Some(0); n]], importances).unwrap();
        let dissimilarity = DissimilarityMatrix::from_partition(&vec![0u8; n]);
        settings.fit(dataset, &dissimilarity, &ensemble).unwrap()
    }

    fn step_dataset() -> Dataset {
        let x: Vec<f64> = (0..20).map(f64::from).collect();
        let y: Vec<f64> = x.iter().map(|&v| if v < 10.0 { 1.0 } else { 5.0 }).collect();
        let noise: Vec<f64> = x.iter().map(|&v| (v * 7.0) % 3.0).collect();
        Dataset::new(
            vec![
                Predictor::continuous("noise", noise),
                Predictor::continuous("x", x),
            ],
            "y",
            y,
        )
        .unwrap()
    }

    #[test]
    fn step_function_single_split() {
        let ds = step_dataset();
        let tree = fit(&ds, vec![1.0, 1.0], &Settings::new().with_min_node_size(2));
        assert_eq!(tree.n_nodes(), 3);
        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(tree.depth(), 1);
        match tree.root() {
            Node::Split {
                rule: SplitRule::Threshold { predictor, threshold },
                left,
                right,
                importance,
                ..
            } => {
                assert_eq!(predictor.index(), 1);
                assert!((threshold - 9.5).abs() < 1e-12);
                assert_eq!(left.index(), 1);
                assert_eq!(right.index(), 2);
                assert!((importance - 1.0).abs() < 1e-12);
            }
            other => panic!("expected threshold split at root, got {other:?}"),
        }
        assert_eq!(tree.node(NodeIndex::new(1)).prediction(), 1.0);
        assert_eq!(tree.node(NodeIndex::new(2)).prediction(), 5.0);
        assert_eq!(tree.node(NodeIndex::new(2)).stats().parent(), Some(NodeIndex::new(0)));
    }

    #[test]
    fn root_statistics() {
        let ds = step_dataset();
        let tree = fit(&ds, vec![1.0, 1.0], &Settings::new());
        let root = tree.root().stats();
        assert_eq!(root.parent(), None);
        assert_eq!(root.depth(), 0);
        assert_eq!(root.n_observations(), 20);
        assert!((root.prediction() - 3.0).abs() < 1e-12);
        assert!((root.sse() - 80.0).abs() < 1e-9);
        assert!((root.nmse() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_depth_gives_single_leaf() {
        let ds = step_dataset();
        let tree = fit(&ds, vec![1.0, 1.0], &Settings::new().with_max_depth(0));
        assert_eq!(tree.n_nodes(), 1);
        assert!(tree.root().is_leaf());
        assert!(tree.variable_importances().iter().all(|r| r.importance == 0.0));
    }

    #[test]
    fn importance_cutoff_restricts_candidates() {
        // Only "noise" survives the cutoff, so the step in x is invisible.
        let ds = step_dataset();
        let tree = fit(&ds, vec![9.0, 1.0], &Settings::new().with_imp_total(0.5));
        assert_eq!(tree.candidate_names(), vec!["noise"]);
        for node in tree.nodes() {
            if let Node::Split { rule, .. } = node {
                assert_eq!(rule.predictor().index(), 0);
            }
        }
    }

    #[test]
    fn leaf_assignments_cover_every_observation() {
        let ds = step_dataset();
        let tree = fit(&ds, vec![1.0, 1.0], &Settings::new().with_min_node_size(2));
        let leaves = tree.leaf_assignments();
        assert_eq!(leaves.len(), 20);
        for (obs, leaf) in leaves.iter().enumerate() {
            assert!(tree.node(*leaf).is_leaf());
            assert!(tree.node(*leaf).stats().observations().contains(&obs));
        }
    }

    #[test]
    fn variable_importances_credit_split_predictor() {
        let ds = step_dataset();
        let tree = fit(&ds, vec![1.0, 1.0], &Settings::new().with_min_node_size(2));
        let ranked = tree.variable_importances();
        assert_eq!(ranked[0].name, "x");
        assert!((ranked[0].importance - 1.0).abs() < 1e-12);
        assert_eq!(ranked[1].importance, 0.0);
    }

    #[test]
    fn dimension_mismatch_rejected() {
        let ds = step_dataset();
        let ensemble = Ensemble::new(vec![vec![Some(0); 20]], vec![1.0, 1.0]).unwrap();
        let dissimilarity = DissimilarityMatrix::from_partition(&[0u8; 5]);
        let err = Settings::new().fit(&ds, &dissimilarity, &ensemble).unwrap_err();
        assert!(matches!(err, TreeError::DimensionMismatch { matrix: 5, dataset: 20 }));
    }

    #[test]
    fn member_length_mismatch_rejected() {
        let ds = step_dataset();
        let ensemble = Ensemble::new(vec![vec![Some(0); 20], vec![Some(0); 19]], vec![1.0, 1.0]).unwrap();
        let dissimilarity = DissimilarityMatrix::from_partition(&[0u8; 20]);
        let err = Settings::new().fit(&ds, &dissimilarity, &ensemble).unwrap_err();
        assert!(matches!(
            err,
            TreeError::EnsembleObservationMismatch { member: 1, expected: 20, got: 19 }
        ));
    }

    #[test]
    fn prediction_count_mismatch_rejected() {
        let ds = step_dataset();
        let ensemble = Ensemble::new(vec![vec![Some(0); 20]], vec![1.0, 1.0])
            .unwrap()
            .with_predictions(vec![1.0, 2.0, 3.0])
            .unwrap();
        let dissimilarity = DissimilarityMatrix::from_partition(&[0u8; 20]);
        let err = Settings::new().fit(&ds, &dissimilarity, &ensemble).unwrap_err();
        assert!(matches!(err, TreeError::PredictionCountMismatch { expected: 20, got: 3 }));
    }

    #[test]
    fn importance_count_mismatch_rejected() {
        let ds = step_dataset();
        let ensemble = Ensemble::new(vec![vec![Some(0); 20]], vec![1.0]).unwrap();
        let dissimilarity = DissimilarityMatrix::from_partition(&[0u8; 20]);
        let err = Settings::new().fit(&ds, &dissimilarity, &ensemble).unwrap_err();
        assert!(matches!(err, TreeError::ImportanceCountMismatch { expected: 2, got: 1 }));
    }

    #[test]
    fn invalid_settings_rejected_before_growth() {
        let ds = step_dataset();
        let ensemble = Ensemble::new(vec![vec![Some(0); 20]], vec![1.0, 1.0]).unwrap();
        let dissimilarity = DissimilarityMatrix::from_partition(&[0u8; 20]);
        let err = Settings::new()
            .with_t_max(0)
            .fit(&ds, &dissimilarity, &ensemble)
            .unwrap_err();
        assert!(matches!(err, TreeError::InvalidMaxIterations { t_max: 0 }));
    }
}
