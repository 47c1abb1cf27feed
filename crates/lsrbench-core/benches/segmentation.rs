//! Benchmarks for passage segmentation and sparse embedding lookups.
//!
//! Run with: `cargo bench -p lsrbench-core --bench segmentation`
//!
//! These benchmarks measure:
//! - Segmenting documents of increasing length with the word and character sizers
//! - Run-pool sampling over large synthetic runs
//! - Row lookups by id in a CSR embedding matrix

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lsrbench_core::config::{PassageUnit, DEFAULT_PASSAGE_SIZE};
use lsrbench_core::embeddings::CsrMatrix;
use lsrbench_core::sampling::{CorpusSampler, RunPoolSampler};
use lsrbench_core::segmentation::create_segmenter;
use lsrbench_core::trec::{Run, RunEntry};

// =============================================================================
// Test Data Generation
// =============================================================================

/// Generate web-page-like text with `sentences` sentences.
fn sample_text(sentences: usize) -> String {
    let topics = [
        "learned sparse retrieval expands queries into weighted vocabulary terms",
        "inverted indexes remain efficient when term weights are sparse",
        "the clueweb collection contains hundreds of millions of web pages",
        "pooling the top documents of several runs approximates the judged set",
    ];
    (0..sentences)
        .map(|i| format!("Sentence {i} notes that {}.", topics[i % topics.len()]))
        .collect::<Vec<_>>()
        .join(" ")
}

fn synthetic_run(queries: usize, depth: usize) -> Run {
    let entries = (0..queries)
        .flat_map(|q| {
            (0..depth).map(move |r| {
                RunEntry::new(
                    q.to_string(),
                    format!("doc-{}", (q * 7 + r * 13) % 50_000),
                    r as u32 + 1,
                    1000.0 - r as f64,
                )
            })
        })
        .collect();
    Run::new(entries)
}

fn synthetic_matrix(rows: usize) -> CsrMatrix {
    let ids = (0..rows).map(|i| format!("doc-{i}")).collect();
    let data = (0..rows).map(|i| {
        let mut tokens: Vec<u32> = (0..64).map(|t| ((i * 31 + t * 97) % 30_522) as u32).collect();
        tokens.sort_unstable();
        tokens.dedup();
        let weights = vec![0.5; tokens.len()];
        (tokens, weights)
    });
    CsrMatrix::from_rows(ids, data).expect("valid synthetic matrix")
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_segmentation(c: &mut Criterion) {
    let mut group = c.benchmark_group("segmentation");

    for sentences in [10, 100, 1000] {
        let text = sample_text(sentences);
        group.throughput(Throughput::Bytes(text.len() as u64));

        for unit in [PassageUnit::Words, PassageUnit::Characters] {
            let segmenter = create_segmenter(unit, DEFAULT_PASSAGE_SIZE);
            group.bench_with_input(
                BenchmarkId::new(segmenter.name(), sentences),
                &text,
                |b, text| b.iter(|| segmenter.segment(black_box(text))),
            );
        }
    }

    group.finish();
}

fn bench_run_pool(c: &mut Criterion) {
    let mut group = c.benchmark_group("run_pool");
    let runs = vec![synthetic_run(200, 1000), synthetic_run(200, 1000)];

    for depth in [10, 100, 1000] {
        let sampler = RunPoolSampler::new(depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &runs, |b, runs| {
            b.iter(|| sampler.sample_corpus("bench", black_box(runs)))
        });
    }

    group.finish();
}

fn bench_embedding_lookup(c: &mut Criterion) {
    let matrix = synthetic_matrix(10_000);
    c.bench_function("embedding_lookup", |b| {
        let mut i = 0usize;
        b.iter(|| {
            i = (i + 7919) % 10_000;
            black_box(matrix.get(&format!("doc-{i}")).map(|(t, _)| t.len()))
        })
    });
}

criterion_group!(benches, bench_segmentation, bench_run_pool, bench_embedding_lookup);
criterion_main!(benches);
