use std::fmt;

use crate::data::Column;

/// Zero-based predictor column index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct PredictorIndex(usize);

impl PredictorIndex {
    /// Create a new predictor index from a zero-based column position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based predictor column index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for PredictorIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index into the tree's `Vec<Node>` arena; the root is index 0.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// Create a new node index from a zero-based arena position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rule routing an observation to the left or right child.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum SplitRule {
    /// Continuous predictor: values `<= threshold` go left.
    Threshold {
        /// Predictor tested by the rule.
        predictor: PredictorIndex,
        /// Midpoint between two consecutive observed values.
        threshold: f64,
    },
    /// Categorical predictor: listed levels go left, all others right.
    Categories {
        /// Predictor tested by the rule.
        predictor: PredictorIndex,
        /// Level names routed left.
        left: Vec<String>,
    },
}

impl SplitRule {
    /// Return the predictor tested by this rule.
    #[must_use]
    pub fn predictor(&self) -> PredictorIndex {
        match self {
            SplitRule::Threshold { predictor, .. } | SplitRule::Categories { predictor, .. } => {
                *predictor
            }
        }
    }

    /// Return true if observation `obs` of `column` goes to the left child.
    ///
    /// Levels not seen during growth, and columns of the wrong kind, go right.
    #[must_use]
    pub fn goes_left(&self, column: &Column, obs: usize) -> bool {
        match (self, column) {
            (SplitRule::Threshold { threshold, .. }, Column::Continuous(values)) => {
                values[obs] <= *threshold
            }
            (SplitRule::Categories { left, .. }, Column::Categorical { codes, levels }) => {
                let level = &levels[codes[obs] as usize];
                left.iter().any(|l| l == level)
            }
            _ => false,
        }
    }

    /// Render the split value for tabular export.
    ///
    /// Thresholds print as numbers; level groups as `{a,b}`.
    #[must_use]
    pub fn value_label(&self) -> String {
        match self {
            SplitRule::Threshold { threshold, .. } => format!("{threshold}"),
            SplitRule::Categories { left, .. } => format!("{{{}}}", left.join(",")),
        }
    }
}

/// Per-node statistics shared by split and leaf nodes.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NodeStats {
    pub(crate) parent: Option<NodeIndex>,
    pub(crate) depth: usize,
    pub(crate) observations: Vec<usize>,
    pub(crate) prediction: f64,
    pub(crate) sse: f64,
    pub(crate) nmse: f64,
}

impl NodeStats {
    /// Return the parent node, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<NodeIndex> {
        self.parent
    }

    /// Return the depth (root is 0).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Return the training observation indices that reached this node, ascending.
    #[must_use]
    pub fn observations(&self) -> &[usize] {
        &self.observations
    }

    /// Return the number of training observations at this node.
    #[must_use]
    pub fn n_observations(&self) -> usize {
        self.observations.len()
    }

    /// Return the mean response of this node's observations.
    #[must_use]
    pub fn prediction(&self) -> f64 {
        self.prediction
    }

    /// Return the sum of squared deviations of the response from the node mean.
    #[must_use]
    pub fn sse(&self) -> f64 {
        self.sse
    }

    /// Return the node's NMSE: `sse` relative to the root `sse`.
    #[must_use]
    pub fn nmse(&self) -> f64 {
        self.nmse
    }
}

/// A node in the surrogate tree arena.
///
/// Trees are stored as `Vec<Node>` where children are referenced by
/// [`NodeIndex`]. Each child belongs to exactly one parent; nothing is
/// mutated once growth finishes.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Node {
    /// An interior split node.
    Split {
        /// Node statistics before splitting.
        stats: NodeStats,
        /// Routing rule.
        rule: SplitRule,
        /// Index of the left child node.
        left: NodeIndex,
        /// Index of the right child node.
        right: NodeIndex,
        /// NMSE of the split relative to this node: `(sse_left + sse_right) / sse`.
        split_nmse: f64,
        /// Error removed by this split, relative to the root `sse`.
        importance: f64,
    },
    /// A terminal leaf node.
    Leaf {
        /// Node statistics.
        stats: NodeStats,
    },
}

impl Node {
    /// Return the node statistics.
    #[must_use]
    pub fn stats(&self) -> &NodeStats {
        match self {
            Node::Split { stats, .. } | Node::Leaf { stats } => stats,
        }
    }

    /// Return the number of training observations at this node.
    #[must_use]
    pub fn n_observations(&self) -> usize {
        self.stats().n_observations()
    }

    /// Return the node prediction (mean response).
    #[must_use]
    pub fn prediction(&self) -> f64 {
        self.stats().prediction
    }

    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }
}
