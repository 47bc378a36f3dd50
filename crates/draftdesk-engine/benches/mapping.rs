use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use draftdesk_engine::mapping::{compute_offsets, strip_emphasis};
use std::hint::black_box;

// Paragraph with every marker kind the stripper handles
fn generate_paragraph(words: usize) -> String {
    let pieces = ["plain", "**bold**", "*em*", "`code`", "__strong__", "_under_", "snake_case"];
    let mut out = String::new();
    for i in 0..words {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(pieces[i % pieces.len()]);
    }
    out
}

fn bench_mapping(c: &mut Criterion) {
    let mut group = c.benchmark_group("mapping");

    for words in [16, 256, 4096] {
        let content = generate_paragraph(words);
        let stripped = strip_emphasis(&content).text;
        let tail = stripped[stripped.len() / 2..].to_string();
        group.throughput(Throughput::Bytes(content.len() as u64));

        group.bench_with_input(BenchmarkId::new("strip", words), &content, |b, content| {
            b.iter(|| strip_emphasis(black_box(content)));
        });

        group.bench_with_input(
            BenchmarkId::new("exact", words),
            &(content.clone(), tail),
            |b, (content, rendered)| {
                b.iter(|| compute_offsets(black_box(content), black_box(rendered)));
            },
        );

        // Misses every mapped search and walks the whole fallback chain
        group.bench_with_input(BenchmarkId::new("fallback", words), &content, |b, content| {
            b.iter(|| compute_offsets(black_box(content), black_box("absent selection")));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_mapping);
criterion_main!(benches);
