//! Surrogate regression tree induction.
//!
//! Grows a single interpretable tree that approximates a fitted regression
//! ensemble: candidate predictors are restricted by the ensemble's variable
//! importance, splits minimize normalized mean-square error (NMSE), and
//! growth stops on depth, node size, or insufficient error decrease. The
//! finished tree flattens into a per-node frame for export.

mod data;
mod error;
mod frame;
mod importance;
mod node;
mod predict;
mod settings;
mod split;
mod tree;

pub use data::{Column, Dataset, Predictor};
pub use error::TreeError;
pub use frame::{FrameRow, TreeFrame};
pub use importance::RankedPredictor;
pub use node::{Node, NodeIndex, NodeStats, PredictorIndex, SplitRule};
pub use settings::Settings;
pub use tree::SurrogateTree;
