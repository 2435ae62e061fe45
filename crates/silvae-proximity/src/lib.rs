//! Leaf co-occurrence proximity and dissimilarity for tree ensembles.
//!
//! Pure math library with no I/O. Converts per-member terminal-leaf
//! assignments of a fitted ensemble into pairwise co-occurrence counts and a
//! symmetric dissimilarity matrix, serially or in parallel across members.

mod builder;
mod ensemble;
mod error;
mod matrix;

pub use builder::{CoOccurrence, DissimilarityBuilder, ExecutionMode};
pub use ensemble::{Ensemble, LeafId, MemberLeaves};
pub use error::ProximityError;
pub use matrix::DissimilarityMatrix;
