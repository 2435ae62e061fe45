//! Fidelity checks for surrogate trees.
//!
//! Compares a surrogate tree against the ensemble it was distilled from:
//! a Mantel permutation test between the ensemble dissimilarity and the
//! tree's leaf co-assignment distance, and agreement statistics between
//! tree and ensemble predictions.

mod agreement;
mod error;
mod mantel;

pub use agreement::Agreement;
pub use error::ValidateError;
pub use mantel::{MantelResult, MantelTest};
