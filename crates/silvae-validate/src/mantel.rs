//! Mantel permutation test between two distance structures.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use silvae_proximity::DissimilarityMatrix;
use silvae_tree::SurrogateTree;

use crate::error::ValidateError;

/// Slack when comparing a permuted correlation against the observed one.
const EXTREME_TOLERANCE: f64 = 1e-12;

/// Outcome of a Mantel test.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MantelResult {
    /// Pearson correlation between the two lower triangles.
    pub correlation: f64,
    /// Share of permutations with `|r_perm| >= |r_obs|`.
    pub p_value: f64,
    /// Number of permutations evaluated.
    pub n_permutations: usize,
    /// Number of permutations at least as extreme as the observed correlation.
    pub n_as_extreme: usize,
}

/// Mantel test configuration.
///
/// Construct via [`MantelTest::new`], then optionally chain
/// [`MantelTest::with_seed`]. Permutation `k` draws from a ChaCha8 RNG
/// seeded with `seed + k`, so results depend only on the seed.
#[derive(Debug, Clone)]
pub struct MantelTest {
    n_permutations: usize,
    seed: u64,
}

impl MantelTest {
    /// Create a test evaluating `n_permutations` label permutations.
    ///
    /// # Errors
    ///
    /// Returns [`ValidateError::InvalidPermutationCount`] when `n_permutations` is zero.
    pub fn new(n_permutations: usize) -> Result<Self, ValidateError> {
        if n_permutations == 0 {
            return Err(ValidateError::InvalidPermutationCount { n_permutations });
        }
        Ok(Self {
            n_permutations,
            seed: 42,
        })
    }

    /// Set the master seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the number of permutations.
    #[must_use]
    pub fn n_permutations(&self) -> usize {
        self.n_permutations
    }

    /// Return the master seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Test the tree's leaf co-assignment distance against the ensemble dissimilarity.
    ///
    /// Two training observations are at distance 0 in the tree when they
    /// share a leaf and 1 otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ValidateError::DimensionMismatch`] when the tree was grown on
    /// a different number of observations than `ensemble` covers.
    #[instrument(skip_all, fields(n_observations = ensemble.len(), n_permutations = self.n_permutations))]
    pub fn run(
        &self,
        ensemble: &DissimilarityMatrix,
        tree: &SurrogateTree,
    ) -> Result<MantelResult, ValidateError> {
        if tree.n_observations() != ensemble.len() {
            return Err(ValidateError::DimensionMismatch {
                ensemble: ensemble.len(),
                tree: tree.n_observations(),
            });
        }
        let tree_distance = DissimilarityMatrix::from_partition(&tree.leaf_assignments());
        let result = self.compare(ensemble, &tree_distance)?;
        info!(
            correlation = result.correlation,
            p_value = result.p_value,
            "mantel test complete"
        );
        Ok(result)
    }

    /// Correlate two matrices, permuting the labels of `permuted`.
    ///
    /// When either matrix has no variance the correlation is undefined;
    /// the result then reports correlation 0 and p-value 1.
    ///
    /// # Errors
    ///
    /// Returns [`ValidateError::DimensionMismatch`] when the matrices differ in size.
    pub fn compare(
        &self,
        fixed: &DissimilarityMatrix,
        permuted: &DissimilarityMatrix,
    ) -> Result<MantelResult, ValidateError> {
        if fixed.len() != permuted.len() {
            return Err(ValidateError::DimensionMismatch {
                ensemble: fixed.len(),
                tree: permuted.len(),
            });
        }
        let n = fixed.len();

        if is_constant(fixed.lower_triangle()) || is_constant(permuted.lower_triangle()) {
            warn!(
                n_observations = n,
                "distance matrix has zero variance; correlation undefined"
            );
            return Ok(MantelResult {
                correlation: 0.0,
                p_value: 1.0,
                n_permutations: self.n_permutations,
                n_as_extreme: self.n_permutations,
            });
        }

        let (a, ss_a) = centered(fixed.lower_triangle());
        let (b, ss_b) = centered(permuted.lower_triangle());

        // Means and variances are invariant under relabeling; only the cross term moves.
        let scale = (ss_a * ss_b).sqrt();
        let identity: Vec<usize> = (0..n).collect();
        let observed = cross_product(&a, &b, &identity) / scale;
        let threshold = observed.abs() - EXTREME_TOLERANCE;

        let n_as_extreme = (0..self.n_permutations)
            .into_par_iter()
            .filter(|&k| {
                let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(k as u64));
                let mut labels = identity.clone();
                labels.shuffle(&mut rng);
                (cross_product(&a, &b, &labels) / scale).abs() >= threshold
            })
            .count();

        debug!(observed, n_as_extreme, "permutations evaluated");

        Ok(MantelResult {
            correlation: observed,
            p_value: n_as_extreme as f64 / self.n_permutations as f64,
            n_permutations: self.n_permutations,
            n_as_extreme,
        })
    }
}

/// True when every entry is equal (or there are none).
fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

/// Subtract the mean; return centered values and their sum of squares.
fn centered(values: &[f64]) -> (Vec<f64>, f64) {
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let centered: Vec<f64> = values.iter().map(|v| v - mean).collect();
    let ss = centered.iter().map(|v| v * v).sum();
    (centered, ss)
}

/// `Σ_{i>j} a(i, j) · b(labels[i], labels[j])` over lower-triangular storage.
fn cross_product(a: &[f64], b: &[f64], labels: &[usize]) -> f64 {
    let mut sum = 0.0;
    let mut offset = 0;
    for i in 1..labels.len() {
        let li = labels[i];
        for &lj in &labels[..i] {
            let (row, col) = if li > lj { (li, lj) } else { (lj, li) };
            sum += a[offset] * b[row * (row - 1) / 2 + col];
            offset += 1;
        }
    }
    sum
}
