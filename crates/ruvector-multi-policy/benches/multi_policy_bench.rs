//! Benchmarks for the multi-policy hot paths: GPI action selection over a
//! growing pool, corner-weight enumeration, exact hypervolume and a short
//! end-to-end training run.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ruvector_multi_policy::gpi::gpi_action;
use ruvector_multi_policy::metrics::hypervolume;
use ruvector_multi_policy::{
    random_weights, DeepSeaTreasure, FrontierService, LinearSupport, MoQLearning,
    MultiPolicyConfig, MultiPolicyMoq, Observation, SubPolicy, TrainParams, WeightSelection,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Policies with random Q-values over a 10x10 grid of states.
fn random_pool(size: usize, seed: u64) -> Vec<MoQLearning> {
    let mut rng = StdRng::seed_from_u64(seed);
    let config = MultiPolicyConfig::default();
    (0..size)
        .map(|id| {
            let weight = random_weights(2, &mut rng);
            let mut policy = MoQLearning::new(id, weight, &config, 4, 2, id as u64)
                .unwrap_or_else(|e| panic!("bench policy: {e}"));
            for x in 0..10 {
                for y in 0..10 {
                    let rows = policy.q_table_mut().entry(&Observation::new(vec![x, y]));
                    for row in rows.iter_mut() {
                        for q in row.iter_mut() {
                            *q = rng.gen_range(-10.0..10.0);
                        }
                    }
                }
            }
            policy
        })
        .collect()
}

/// Points on the concave quarter circle, all non-dominated.
fn circle_front(n: usize, dim: usize) -> Vec<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(9);
    (0..n)
        .map(|_| {
            let raw: Vec<f64> = (0..dim).map(|_| rng.gen_range(0.01..1.0)).collect();
            let norm = raw.iter().map(|x| x * x).sum::<f64>().sqrt();
            raw.into_iter().map(|x| x / norm).collect()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_gpi_action(c: &mut Criterion) {
    let mut group = c.benchmark_group("gpi_action");
    let state = Observation::new(vec![4, 4]);
    for size in [1usize, 8, 32, 128] {
        let pool = random_pool(size, 1);
        group.bench_with_input(BenchmarkId::from_parameter(size), &pool, |b, pool| {
            b.iter(|| gpi_action(pool.iter(), black_box(&state), black_box(&[0.3, 0.7])))
        });
    }
    group.finish();
}

fn bench_corner_weights(c: &mut Criterion) {
    let mut group = c.benchmark_group("corner_weights");
    for (dim, size) in [(2usize, 16usize), (2, 64), (3, 16), (3, 48)] {
        let mut ls = LinearSupport::new(dim, None);
        for value in circle_front(size, dim) {
            let weight = value.clone();
            let _ = ls.add_solution(value, weight);
        }
        group.bench_function(format!("k{dim}_ccs{}", ls.ccs().len()), |b| {
            b.iter(|| black_box(&ls).corner_weights())
        });
    }
    group.finish();
}

fn bench_hypervolume(c: &mut Criterion) {
    let mut group = c.benchmark_group("hypervolume");
    for (dim, size) in [(2usize, 100usize), (3, 50), (4, 20)] {
        let front = circle_front(size, dim);
        let reference = vec![0.0; dim];
        group.bench_function(format!("k{dim}_n{size}"), |b| {
            b.iter(|| hypervolume(black_box(&reference), black_box(&front)))
        });
    }
    group.finish();
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    group.sample_size(10);
    for selection in [WeightSelection::Random, WeightSelection::Ols] {
        group.bench_function(selection.as_str(), |b| {
            b.iter(|| {
                let config = MultiPolicyConfig {
                    seed: Some(1),
                    log: false,
                    weight_selection: selection,
                    ..MultiPolicyConfig::default()
                };
                let mut agent = MultiPolicyMoq::new(DeepSeaTreasure::new(), config)
                    .unwrap_or_else(|e| panic!("bench agent: {e}"));
                let params = TrainParams::new(vec![0.0, -25.0], 3, 1_000).with_eval_repetitions(1);
                agent.train(None, &params)
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_gpi_action,
    bench_corner_weights,
    bench_hypervolume,
    bench_training
);
criterion_main!(benches);
