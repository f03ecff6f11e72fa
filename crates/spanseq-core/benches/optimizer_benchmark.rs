//! Benchmark for the clause rewriter and combiner on long patterns.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use spanseq_core::query::{any_token, default_value, not, repetition, sequence, term, Bounds};
use spanseq_core::{optimize, Clause, MemoryIndex, OptimizerConfig};

fn create_index() -> MemoryIndex {
    let texts: Vec<String> = (0..200)
        .map(|d| {
            (0..40)
                .map(|i| format!("w{}", (d * 7 + i * 13) % 97))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect();
    let texts: Vec<&str> = texts.iter().map(String::as_str).collect();
    MemoryIndex::from_texts(&texts)
}

/// A sequence of `parts` clauses mixing tokens, gaps and negations.
fn create_pattern(parts: usize) -> Clause {
    let clauses = (0..parts)
        .map(|i| match i % 5 {
            0 => term("word", &format!("w{}", i % 97)),
            1 => any_token(Bounds::new(0, Some(2)).expect("bounds")),
            2 => repetition(term("word", "w3"), Bounds::OPTIONAL),
            3 => not(term("word", "w5")),
            _ => default_value(),
        })
        .collect();
    sequence(clauses)
}

fn bench_optimize(c: &mut Criterion) {
    let mut group = c.benchmark_group("optimize");
    let index = create_index();

    for parts in [4, 8, 16] {
        let pattern = create_pattern(parts);
        for (name, config) in [
            ("default", OptimizerConfig::default()),
            ("nfa_ungated", OptimizerConfig::default().with_unique_terms_gate(false)),
        ] {
            group.bench_with_input(BenchmarkId::new(name, parts), &parts, |b, _| {
                b.iter(|| black_box(optimize(black_box(&pattern), &config, &index)));
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_optimize);
criterion_main!(benches);
