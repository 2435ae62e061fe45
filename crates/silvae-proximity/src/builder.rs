//! Co-occurrence extraction and dissimilarity construction.

use rayon::prelude::*;
use tracing::{debug, info, instrument};

use crate::ensemble::{Ensemble, LeafId, MemberLeaves};
use crate::error::ProximityError;
use crate::matrix::{DissimilarityMatrix, n_pairs, tri_offset};

/// How the per-member co-occurrence increments are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Process members one after another on the calling thread.
    Serial,
    /// Process members in parallel.
    ///
    /// `workers: None` uses the current rayon pool; `Some(w)` runs on a
    /// dedicated pool of `w` threads.
    Parallel {
        /// Dedicated worker count, if any.
        workers: Option<usize>,
    },
}

/// Pairwise leaf co-occurrence counts across all ensemble members.
///
/// `count(i, j)` is the number of members placing `i` and `j` in the same
/// terminal leaf. Counts are integers, so summation order never changes
/// the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoOccurrence {
    n: usize,
    n_members: usize,
    counts: Vec<u32>,
}

impl CoOccurrence {
    /// Extract co-occurrence counts from an ensemble over `n_observations`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ProximityError::NoObservations`] | `n_observations` is zero |
    /// | [`ProximityError::ObservationCountMismatch`] | a member does not cover exactly `n_observations` |
    /// | [`ProximityError::InvalidWorkerCount`] | `Parallel { workers: Some(0) }` |
    /// | [`ProximityError::ThreadPool`] | the dedicated pool cannot be started |
    #[instrument(skip(ensemble), fields(n_members = ensemble.n_members()))]
    pub fn extract(
        ensemble: &Ensemble,
        n_observations: usize,
        mode: ExecutionMode,
    ) -> Result<Self, ProximityError> {
        if n_observations == 0 {
            return Err(ProximityError::NoObservations);
        }

        let members = ensemble.members();
        let counts = match mode {
            ExecutionMode::Serial => count_serial(members, n_observations)?,
            ExecutionMode::Parallel { workers: None } => count_parallel(members, n_observations)?,
            ExecutionMode::Parallel {
                workers: Some(workers),
            } => {
                if workers == 0 {
                    return Err(ProximityError::InvalidWorkerCount { workers });
                }
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .build()
                    .map_err(|source| ProximityError::ThreadPool { source })?;
                debug!(workers, "dedicated worker pool started");
                pool.install(|| count_parallel(members, n_observations))?
            }
        };

        Ok(Self {
            n: n_observations,
            n_members: ensemble.n_members(),
            counts,
        })
    }

    /// Return the number of observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.n
    }

    /// Return true if no observations are covered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Return the number of ensemble members that voted.
    #[must_use]
    pub fn n_members(&self) -> usize {
        self.n_members
    }

    /// Return the number of members sharing a leaf for `i` and `j`.
    ///
    /// The diagonal reports every member.
    ///
    /// # Panics
    ///
    /// Panics if `i >= n` or `j >= n`.
    #[must_use]
    pub fn count(&self, i: usize, j: usize) -> u32 {
        assert!(i < self.n && j < self.n, "pair ({i}, {j}) out of bounds for {} observations", self.n);
        if i == j {
            return u32::try_from(self.n_members).unwrap_or(u32::MAX);
        }
        let (row, col) = if i > j { (i, j) } else { (j, i) };
        self.counts[tri_offset(row, col)]
    }

    /// Return the proximity (shared-leaf fraction) of `i` and `j`.
    #[must_use]
    pub fn proximity(&self, i: usize, j: usize) -> f64 {
        if i == j {
            return 1.0;
        }
        f64::from(self.count(i, j)) / self.n_members as f64
    }

    /// Normalize the counts into a dissimilarity matrix: `1 - count / members`.
    #[must_use]
    pub fn to_dissimilarity(&self) -> DissimilarityMatrix {
        let members = self.n_members as f64;
        let data = self
            .counts
            .iter()
            .map(|&c| (1.0 - f64::from(c) / members).clamp(0.0, 1.0))
            .collect();
        DissimilarityMatrix::from_raw(self.n, data)
    }
}

/// Add one member's co-occurrence increments to `acc`.
///
/// Observations are grouped by leaf; every pair inside a group gains one
/// vote. Observations without a leaf are skipped.
fn accumulate_member(
    member_index: usize,
    member: &MemberLeaves,
    n_observations: usize,
    acc: &mut [u32],
) -> Result<(), ProximityError> {
    if member.len() != n_observations {
        return Err(ProximityError::ObservationCountMismatch {
            member: member_index,
            expected: n_observations,
            got: member.len(),
        });
    }

    let mut assigned: Vec<(LeafId, usize)> = member
        .as_slice()
        .iter()
        .enumerate()
        .filter_map(|(obs, leaf)| leaf.map(|l| (l, obs)))
        .collect();
    assigned.sort_unstable();

    for group in assigned.chunk_by(|a, b| a.0 == b.0) {
        // Within a group observations are ascending, so `hi > lo`.
        for (k, &(_, hi)) in group.iter().enumerate() {
            for &(_, lo) in &group[..k] {
                acc[tri_offset(hi, lo)] += 1;
            }
        }
    }
    Ok(())
}

fn count_serial(members: &[MemberLeaves], n_observations: usize) -> Result<Vec<u32>, ProximityError> {
    let mut counts = vec![0u32; n_pairs(n_observations)];
    for (m, member) in members.iter().enumerate() {
        accumulate_member(m, member, n_observations, &mut counts)?;
    }
    Ok(counts)
}

fn count_parallel(
    members: &[MemberLeaves],
    n_observations: usize,
) -> Result<Vec<u32>, ProximityError> {
    let size = n_pairs(n_observations);
    members
        .par_iter()
        .enumerate()
        .try_fold(
            || vec![0u32; size],
            |mut acc, (m, member)| {
                accumulate_member(m, member, n_observations, &mut acc)?;
                Ok(acc)
            },
        )
        .try_reduce(
            || vec![0u32; size],
            |mut a, b| {
                a.iter_mut().zip(&b).for_each(|(x, y)| *x += y);
                Ok(a)
            },
        )
}

/// Builds the ensemble dissimilarity matrix.
///
/// Construct via [`DissimilarityBuilder::new`], then chain `with_mode`.
///
/// # Defaults
///
/// | Parameter | Default                         |
/// |-----------|---------------------------------|
/// | `mode`    | `Parallel { workers: None }`    |
#[derive(Debug, Clone)]
pub struct DissimilarityBuilder {
    mode: ExecutionMode,
}

impl DissimilarityBuilder {
    /// Create a builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mode: ExecutionMode::Parallel { workers: None },
        }
    }

    /// Set the execution mode.
    #[must_use]
    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Return the execution mode.
    #[must_use]
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Compute the `n_observations × n_observations` dissimilarity matrix.
    ///
    /// # Errors
    ///
    /// Propagates every error of [`CoOccurrence::extract`]; no partial
    /// matrix is ever returned.
    #[instrument(skip_all, fields(n_members = ensemble.n_members(), n_observations))]
    pub fn build(
        &self,
        ensemble: &Ensemble,
        n_observations: usize,
    ) -> Result<DissimilarityMatrix, ProximityError> {
        info!(mode = ?self.mode, "building dissimilarity matrix");
        let co = CoOccurrence::extract(ensemble, n_observations, self.mode)?;
        let matrix = co.to_dissimilarity();
        debug!(n_pairs = matrix.lower_triangle().len(), "dissimilarity matrix built");
        Ok(matrix)
    }
}

impl Default for DissimilarityBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_ensemble() -> Ensemble {
        Ensemble::new(
            vec![
                vec![Some(0), Some(0), Some(1), Some(1)],
                vec![Some(5), Some(5), Some(5), Some(6)],
                vec![Some(2), Some(3), Some(3), None],
                vec![Some(0), Some(0), Some(0), Some(0)],
            ],
            vec![1.0],
        )
        .unwrap()
    }

    #[test]
    fn counts_match_hand_computation() {
        let co = CoOccurrence::extract(&small_ensemble(), 4, ExecutionMode::Serial).unwrap();
        assert_eq!(co.count(0, 1), 3);
        assert_eq!(co.count(1, 2), 3);
        assert_eq!(co.count(2, 3), 2);
        assert_eq!(co.count(0, 3), 1);
        assert_eq!(co.count(3, 0), 1);
        assert_eq!(co.count(2, 2), 4);
    }

    #[test]
    fn unassigned_observation_skips_vote() {
        let co = CoOccurrence::extract(&small_ensemble(), 4, ExecutionMode::Serial).unwrap();
        // Member 2 has no leaf for observation 3, so (1, 3) only gains member 3's vote.
        assert_eq!(co.count(1, 3), 1);
        assert!((co.proximity(1, 3) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn dissimilarity_normalized() {
        let m = DissimilarityBuilder::new()
            .with_mode(ExecutionMode::Serial)
            .build(&small_ensemble(), 4)
            .unwrap();
        assert!((m.get(0, 1) - 0.25).abs() < 1e-12);
        assert!((m.get(0, 3) - 0.75).abs() < 1e-12);
        assert_eq!(m.get(2, 2), 0.0);
    }

    #[test]
    fn parallel_matches_serial() {
        let ens = small_ensemble();
        let serial = CoOccurrence::extract(&ens, 4, ExecutionMode::Serial).unwrap();
        for workers in [None, Some(1), Some(3)] {
            let parallel =
                CoOccurrence::extract(&ens, 4, ExecutionMode::Parallel { workers }).unwrap();
            assert_eq!(serial, parallel, "workers = {workers:?}");
        }
    }

    #[test]
    fn observation_count_mismatch_error() {
        let ens = Ensemble::new(vec![vec![Some(0), Some(0)], vec![Some(0)]], vec![]).unwrap();
        for mode in [ExecutionMode::Serial, ExecutionMode::Parallel { workers: Some(2) }] {
            let err = CoOccurrence::extract(&ens, 2, mode).unwrap_err();
            assert!(matches!(
                err,
                ProximityError::ObservationCountMismatch { member: 1, expected: 2, got: 1 }
            ));
        }
    }

    #[test]
    fn zero_workers_error() {
        let err = CoOccurrence::extract(
            &small_ensemble(),
            4,
            ExecutionMode::Parallel { workers: Some(0) },
        )
        .unwrap_err();
        assert!(matches!(err, ProximityError::InvalidWorkerCount { workers: 0 }));
    }

    #[test]
    fn zero_observations_error() {
        let err = CoOccurrence::extract(&small_ensemble(), 0, ExecutionMode::Serial).unwrap_err();
        assert!(matches!(err, ProximityError::NoObservations));
    }
}
