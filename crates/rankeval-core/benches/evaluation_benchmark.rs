//! Benchmark for corpus evaluation and significance testing.
//!
//! Measures:
//! - Building a `CorpusEvaluation` over synthetic TREC-sized runs
//! - Rendering the trec_eval results summary
//! - Randomized test cost by number of trials

use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rankeval_core::{
    Comparator, CorpusEvaluation, Judgment, Judgments, RankedDocument, Ranking, ResultsSummary,
};

/// Documents retrieved per query, as in a TREC ad hoc run.
const DEPTH: usize = 1000;

fn synthetic_run(queries: usize, seed: u64) -> (Ranking, Judgments) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut ranking = Ranking::new();
    let mut judgments = Judgments::new();

    for q in 0..queries {
        let query = format!("{}", 301 + q);
        let docs: Vec<RankedDocument> = (0..DEPTH)
            .map(|rank| {
                #[allow(clippy::cast_precision_loss)]
                let score = (DEPTH - rank) as f64;
                RankedDocument::new(format!("doc{}", rng.gen_range(0..5 * DEPTH)), rank + 1, score)
            })
            .collect();
        let judged: Vec<Judgment> = (0..DEPTH / 2)
            .map(|d| Judgment::new(format!("doc{}", d * 10), rng.gen_range(0..3)))
            .collect();
        ranking.insert(query.clone(), docs);
        judgments.insert(query, judged);
    }
    (ranking, judgments)
}

fn bench_corpus_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("corpus_evaluation");
    for queries in [50_usize, 250] {
        let (ranking, judgments) = synthetic_run(queries, 42);
        group.throughput(Throughput::Elements(queries as u64));
        group.bench_with_input(BenchmarkId::from_parameter(queries), &queries, |b, _| {
            b.iter(|| {
                black_box(CorpusEvaluation::new(ranking.clone(), judgments.clone()))
            });
        });
    }
    group.finish();
}

fn bench_results_summary(c: &mut Criterion) {
    let (ranking, judgments) = synthetic_run(50, 7);
    let evaluation = CorpusEvaluation::new(ranking, judgments);
    c.bench_function("results_summary_50_queries", |b| {
        b.iter(|| black_box(ResultsSummary::from_evaluation(&evaluation)));
    });
}

fn bench_randomized_test(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(3);
    let baseline: BTreeMap<String, f64> = (0..150).map(|q| (format!("{q}"), rng.gen())).collect();
    let treatment: BTreeMap<String, f64> = (0..150).map(|q| (format!("{q}"), rng.gen())).collect();
    let comparator = Comparator::new(&baseline, &treatment);

    let mut group = c.benchmark_group("randomized_test");
    for trials in [1_000_usize, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(trials), &trials, |b, &trials| {
            b.iter(|| black_box(comparator.randomized_test(trials, 0x5EED)));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_corpus_evaluation,
    bench_results_summary,
    bench_randomized_test
);
criterion_main!(benches);
