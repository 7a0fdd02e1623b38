use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use param_importance::prelude::*;

fn make_trials(n: u64, dims: usize) -> Vec<FrozenTrial> {
    let mut rng = fastrand::Rng::with_seed(42);
    (0..n)
        .map(|i| {
            let xs: Vec<f64> = (0..dims).map(|_| rng.f64() * 10.0 - 5.0).collect();
            let value = xs.iter().enumerate().map(|(d, x)| (d + 1) as f64 * x * x).sum();
            xs.iter().enumerate().fold(FrozenTrial::complete(i, value), |t, (d, &x)| {
                t.param(
                    format!("x{d}"),
                    ParamValue::Float(x),
                    Distribution::float(-5.0, 5.0),
                )
            })
        })
        .collect()
}

fn fresh_cache(selector: EvaluatorSelector) -> (ImportanceCache, u64) {
    let storage = MemoryStorage::new();
    let study = storage.create_study("bench");
    let cache = ImportanceCache::builder()
        .storage(storage)
        .selector(selector)
        .build();
    (cache, study)
}

fn bench_cache_hit(c: &mut Criterion) {
    let trials = make_trials(200, 5);
    let (cache, study) = fresh_cache(EvaluatorSelector::detect());
    cache.get_importances(study, 0, &trials).unwrap();

    c.bench_function("cache_hit", |b| {
        b.iter(|| cache.get_importances(study, 0, &trials).unwrap());
    });
}

fn bench_cache_miss(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_miss");
    group.sample_size(10);

    for n in [50, 200] {
        let trials = make_trials(n, 5);
        group.bench_with_input(BenchmarkId::new("fanova", n), &trials, |b, trials| {
            b.iter(|| {
                let (cache, study) =
                    fresh_cache(EvaluatorSelector::new(FanovaEvaluator::new()));
                cache.get_importances(study, 0, trials).unwrap()
            });
        });
        #[cfg(feature = "fast-fanova")]
        group.bench_with_input(BenchmarkId::new("fast_fanova", n), &trials, |b, trials| {
            b.iter(|| {
                let (cache, study) = fresh_cache(EvaluatorSelector::detect());
                cache.get_importances(study, 0, trials).unwrap()
            });
        });
        group.bench_with_input(BenchmarkId::new("spearman", n), &trials, |b, trials| {
            b.iter(|| {
                let (cache, study) =
                    fresh_cache(EvaluatorSelector::new(SpearmanEvaluator::new()));
                cache.get_importances(study, 0, trials).unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_cache_hit, bench_cache_miss);
criterion_main!(benches);
