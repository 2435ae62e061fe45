//! Criterion benchmarks for silvae-tree: surrogate growth and prediction.

use criterion::{Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use silvae_proximity::{DissimilarityMatrix, Ensemble};
use silvae_tree::{Dataset, Predictor, Settings};

fn make_regression(n: usize, n_predictors: usize, seed: u64) -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let columns: Vec<Vec<f64>> = (0..n_predictors)
        .map(|_| (0..n).map(|_| rng.gen_range(0.0..10.0)).collect())
        .collect();
    let response = (0..n)
        .map(|i| columns[0][i] + 0.5 * columns[1][i] + rng.r#gen::<f64>())
        .collect();
    let predictors = columns
        .into_iter()
        .enumerate()
        .map(|(p, values)| Predictor::continuous(format!("x{p}"), values))
        .collect();
    Dataset::new(predictors, "y", response).unwrap()
}

fn inputs(n: usize, n_predictors: usize) -> (Dataset, DissimilarityMatrix, Ensemble) {
    let ds = make_regression(n, n_predictors, 42);
    let ensemble = Ensemble::new(vec![vec![Some(0); n]], vec![1.0; n_predictors]).unwrap();
    let dissimilarity = DissimilarityMatrix::from_partition(&vec![0u8; n]);
    (ds, dissimilarity, ensemble)
}

fn bench_grow_serial(c: &mut Criterion) {
    let (ds, dissimilarity, ensemble) = inputs(2_000, 10);
    let settings = Settings::new().with_max_depth(6);

    c.bench_function("grow_serial_2000x10_depth6", |b| {
        b.iter(|| settings.fit(&ds, &dissimilarity, &ensemble).unwrap());
    });
}

fn bench_grow_parallel(c: &mut Criterion) {
    let (ds, dissimilarity, ensemble) = inputs(2_000, 10);
    let settings = Settings::new().with_max_depth(6).with_parallel_growth(true);

    c.bench_function("grow_parallel_2000x10_depth6", |b| {
        b.iter(|| settings.fit(&ds, &dissimilarity, &ensemble).unwrap());
    });
}

fn bench_predict_batch(c: &mut Criterion) {
    let (ds, dissimilarity, ensemble) = inputs(2_000, 10);
    let tree = Settings::new()
        .with_max_depth(6)
        .fit(&ds, &dissimilarity, &ensemble)
        .unwrap();

    c.bench_function("predict_batch_2000x10", |b| {
        b.iter(|| tree.predict(&ds).unwrap());
    });
}

criterion_group!(benches, bench_grow_serial, bench_grow_parallel, bench_predict_batch);
criterion_main!(benches);
