use criterion::{black_box, criterion_group, criterion_main, Criterion};
use episcan_core::{
    EpitopeScanner, LocalOracle, ScanParams, Sequence, SimilarityConstraint, Subject,
    WindowGenerator,
};

fn generate_test_protein(length: usize) -> Vec<u8> {
    let pattern = b"MKTAYIAKQRQISFVKSHFSRQLEERLGLIEVQ";
    pattern.iter().cycle().take(length).copied().collect()
}

fn bench_window_generation(c: &mut Criterion) {
    c.bench_function("windows_10k_len15_step1", |b| {
        b.iter(|| {
            let generator = WindowGenerator::new(15, black_box(10_000), 1).unwrap();
            black_box(generator.iter().count())
        })
    });
}

fn bench_local_scan(c: &mut Criterion) {
    let query = Sequence::new("query", generate_test_protein(300));
    let subjects = vec![
        Subject::new(
            Sequence::new("subject_a", generate_test_protein(250)),
            SimilarityConstraint::new(0.66, 0.01).unwrap(),
        ),
        Subject::new(
            Sequence::new("subject_b", generate_test_protein(200)),
            SimilarityConstraint::new(1.0, 0.01).unwrap(),
        ),
    ];
    let scanner = EpitopeScanner::new(query, subjects, ScanParams::default());
    let oracle = LocalOracle::new();

    c.bench_function("local_scan_300aa_2_subjects", |b| {
        b.iter(|| black_box(scanner.run(&oracle).unwrap()))
    });
}

criterion_group!(benches, bench_window_generation, bench_local_scan);
criterion_main!(benches);
