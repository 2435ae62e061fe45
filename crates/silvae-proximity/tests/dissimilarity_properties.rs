//! Property tests for silvae-proximity on randomized ensembles.
//!
//! These tests verify the structural invariants of the dissimilarity matrix
//! and its independence from the execution mode.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use silvae_proximity::{CoOccurrence, DissimilarityBuilder, Ensemble, ExecutionMode};

// ---------------------------------------------------------------------------
// Helper: deterministic random ensemble
// ---------------------------------------------------------------------------

/// Generate an ensemble of `n_members` trees over `n_obs` observations.
///
/// Each member assigns observations to one of `n_leaves` leaves; roughly
/// one assignment in twenty is left unrecorded.
fn random_ensemble(n_obs: usize, n_members: usize, n_leaves: u32, seed: u64) -> Ensemble {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let leaves: Vec<Vec<Option<u32>>> = (0..n_members)
        .map(|_| {
            (0..n_obs)
                .map(|_| {
                    if rng.gen_range(0..20) == 0 {
                        None
                    } else {
                        Some(rng.gen_range(0..n_leaves))
                    }
                })
                .collect()
        })
        .collect();
    Ensemble::new(leaves, vec![1.0, 0.5]).unwrap()
}

#[test]
fn matrix_is_symmetric_bounded_with_zero_diagonal() {
    let ens = random_ensemble(60, 40, 6, 7);
    let m = DissimilarityBuilder::new().build(&ens, 60).unwrap();
    assert_eq!(m.len(), 60);
    for i in 0..60 {
        assert_eq!(m.get(i, i), 0.0);
        for j in 0..60 {
            let d = m.get(i, j);
            assert_eq!(d, m.get(j, i));
            assert!((0.0..=1.0).contains(&d), "d({i},{j}) = {d}");
        }
    }
}

#[test]
fn parallel_identical_to_serial_for_any_worker_count() {
    let ens = random_ensemble(80, 33, 5, 11);
    let serial = DissimilarityBuilder::new()
        .with_mode(ExecutionMode::Serial)
        .build(&ens, 80)
        .unwrap();
    for workers in 1..=4 {
        let parallel = DissimilarityBuilder::new()
            .with_mode(ExecutionMode::Parallel {
                workers: Some(workers),
            })
            .build(&ens, 80)
            .unwrap();
        assert_eq!(serial, parallel, "workers = {workers}");
    }
    let global = DissimilarityBuilder::new().build(&ens, 80).unwrap();
    assert_eq!(serial, global);
}

#[test]
fn single_leaf_members_give_zero_dissimilarity() {
    let leaves = vec![vec![Some(3); 10]; 4];
    let ens = Ensemble::new(leaves, vec![]).unwrap();
    let m = DissimilarityBuilder::new().build(&ens, 10).unwrap();
    assert!(m.lower_triangle().iter().all(|&d| d == 0.0));
}

#[test]
fn singleton_leaves_give_unit_dissimilarity() {
    let leaves: Vec<Vec<Option<u32>>> = vec![(0..10).map(Some).collect(); 3];
    let ens = Ensemble::new(leaves, vec![]).unwrap();
    let co = CoOccurrence::extract(&ens, 10, ExecutionMode::Serial).unwrap();
    assert_eq!(co.n_members(), 3);
    let m = co.to_dissimilarity();
    assert!(m.lower_triangle().iter().all(|&d| d == 1.0));
}
