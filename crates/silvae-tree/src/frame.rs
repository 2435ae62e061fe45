//! Tabular export of a grown tree.

use crate::node::Node;
use crate::tree::SurrogateTree;

/// One node of the tree as a flat record.
///
/// Field order matches the exported column order.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameRow {
    /// Arena index of the node; the root is 0.
    pub node_id: usize,
    /// Arena index of the parent, empty for the root.
    pub parent_id: Option<usize>,
    /// Depth of the node; the root is 0.
    pub depth: usize,
    /// Number of training observations at the node.
    pub n_obs: usize,
    /// Mean response of the node.
    pub prediction: f64,
    /// Sum of squared deviations from the node mean.
    pub sse: f64,
    /// Node error relative to the root.
    pub nmse: f64,
    /// Name of the split predictor, empty for leaves.
    pub split_variable: Option<String>,
    /// Threshold or `{level,...}` group routed left, empty for leaves.
    pub split_value: Option<String>,
    /// Whether the node is a leaf.
    pub is_leaf: bool,
}

/// Per-node table of a surrogate tree, in arena (pre-)order.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct TreeFrame {
    rows: Vec<FrameRow>,
}

impl TreeFrame {
    /// Return the rows in node order.
    #[must_use]
    pub fn rows(&self) -> &[FrameRow] {
        &self.rows
    }

    /// Return the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Return true if the frame has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate over the rows in node order.
    pub fn iter(&self) -> std::slice::Iter<'_, FrameRow> {
        self.rows.iter()
    }
}

impl<'a> IntoIterator for &'a TreeFrame {
    type Item = &'a FrameRow;
    type IntoIter = std::slice::Iter<'a, FrameRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl SurrogateTree {
    /// Flatten the tree into one row per node.
    #[must_use]
    pub fn to_frame(&self) -> TreeFrame {
        let rows = self
            .nodes
            .iter()
            .enumerate()
            .map(|(node_id, node)| {
                let stats = node.stats();
                let (split_variable, split_value) = match node {
                    Node::Split { rule, .. } => (
                        Some(self.predictor_names[rule.predictor().index()].clone()),
                        Some(rule.value_label()),
                    ),
                    Node::Leaf { .. } => (None, None),
                };
                FrameRow {
                    node_id,
                    parent_id: stats.parent().map(|p| p.index()),
                    depth: stats.depth(),
                    n_obs: stats.n_observations(),
                    prediction: stats.prediction(),
                    sse: stats.sse(),
                    nmse: stats.nmse(),
                    split_variable,
                    split_value,
                    is_leaf: node.is_leaf(),
                }
            })
            .collect();
        TreeFrame { rows }
    }
}
