use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use episcan_core::oracle::OracleResult;
use episcan_core::*;

/// Deterministic oracle answering from a table keyed by (subject id, window).
#[derive(Default)]
struct TableOracle {
    hits: HashMap<(String, Window), Hsp>,
    calls: AtomicUsize,
}

impl TableOracle {
    fn hit(mut self, subject: &str, window: (usize, usize), identities: u32, length: u32) -> Self {
        let hsp = Hsp::new(f64::from(identities) * 5.0, identities, length).unwrap();
        self.hits.insert((subject.to_string(), Window::from(window)), hsp);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AlignmentOracle for TableOracle {
    fn align(&self, _query: &Sequence, window: Window, subject: &Sequence) -> OracleResult<Option<Hsp>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.hits.get(&(subject.id.clone(), window)).copied())
    }

    fn name(&self) -> &'static str {
        "table"
    }
}

/// Oracle that fails like a crashed external process.
struct BrokenOracle;

impl AlignmentOracle for BrokenOracle {
    fn align(&self, _query: &Sequence, _window: Window, _subject: &Sequence) -> OracleResult<Option<Hsp>> {
        Err(OracleError::ExternalTool("blastp failed with exit code Some(2)".to_string()))
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

fn query(length: usize) -> Sequence {
    let residues: Vec<u8> = b"ACDEFGHIKLMNPQRSTVWY".iter().cycle().take(length).copied().collect();
    Sequence::new("sp|Q16875|F263_HUMAN", residues)
}

fn subject(id: &str, identity: f64, tolerance: f64) -> Subject {
    Subject::new(
        Sequence::new(id, b"MPLELTQSRVQKIWVPVDHR".to_vec()),
        SimilarityConstraint::new(identity, tolerance).unwrap(),
    )
}

fn windows_of(report: &ScanReport) -> Vec<(usize, usize, usize)> {
    report.candidates.iter().map(|c| (c.length, c.start, c.end)).collect()
}

#[test]
fn single_subject_single_window() {
    let oracle = TableOracle::default().hit("pfkfb3", (1, 10), 10, 10);
    let scanner = EpitopeScanner::new(
        query(20),
        vec![subject("pfkfb3", 1.0, 0.0)],
        ScanParams::default().with_range(10, 10).with_step(5),
    );

    let report = scanner.run(&oracle).unwrap();
    let lines: Vec<String> = report.lines().collect();
    assert_eq!(lines, vec!["10 - sp|Q16875|F263_HUMAN:1-10".to_string()]);
}

#[test]
fn every_subject_must_agree() {
    let oracle = TableOracle::default()
        .hit("A", (1, 10), 7, 10)
        .hit("A", (6, 15), 7, 10)
        .hit("B", (6, 15), 5, 10);
    let scanner = EpitopeScanner::new(
        query(25),
        vec![subject("A", 0.7, 0.01), subject("B", 0.5, 0.01)],
        ScanParams::default().with_range(10, 10).with_step(5),
    );

    let report = scanner.run(&oracle).unwrap();
    assert_eq!(windows_of(&report), vec![(10, 6, 15)]);
}

#[test]
fn missing_alignment_vetoes_window() {
    // B never aligns, so A's perfect hits are irrelevant.
    let oracle = TableOracle::default()
        .hit("A", (1, 10), 10, 10)
        .hit("A", (6, 15), 10, 10)
        .hit("A", (16, 25), 10, 10);
    let scanner = EpitopeScanner::new(
        query(25),
        vec![subject("A", 1.0, 0.0), subject("B", 0.0, 1.0)],
        ScanParams::default().with_range(10, 10),
    );

    assert!(scanner.run(&oracle).unwrap().is_empty());
}

#[test]
fn zero_subjects_accept_every_window() {
    let oracle = TableOracle::default();
    let scanner = EpitopeScanner::new(query(25), Vec::new(), ScanParams::default().with_range(10, 11));

    let report = scanner.run(&oracle).unwrap();
    assert_eq!(
        windows_of(&report),
        vec![(10, 1, 10), (10, 6, 15), (10, 16, 25), (11, 1, 11), (11, 6, 16), (11, 15, 25)]
    );
    assert_eq!(oracle.calls(), 0);
}

#[test]
fn report_is_ordered_by_length_then_start() {
    let mut oracle = TableOracle::default();
    for length in 10..=12 {
        let generator = WindowGenerator::new(length, 30, 5).unwrap();
        for window in generator.iter() {
            oracle = oracle.hit("A", (window.start, window.end), 2, 3);
        }
    }
    let scanner = EpitopeScanner::new(
        query(30),
        vec![subject("A", 0.66, 0.01)],
        ScanParams::default().with_range(10, 12),
    );

    let report = scanner.run(&oracle).unwrap();
    let keys: Vec<(usize, usize)> = report.candidates.iter().map(|c| (c.length, c.start)).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    assert_eq!(report.len(), scanner.plan().unwrap().windows);
    for c in &report.candidates {
        assert_eq!(c.end - c.start + 1, c.length);
    }
}

#[test]
fn first_failing_subject_short_circuits() {
    let oracle = TableOracle::default();
    let scanner = EpitopeScanner::new(
        query(25),
        vec![subject("A", 0.5, 0.01), subject("B", 0.5, 0.01), subject("C", 0.5, 0.01)],
        ScanParams::default().with_range(10, 10),
    );

    scanner.run(&oracle).unwrap();
    // Three windows, each rejected by the first subject.
    assert_eq!(oracle.calls(), 3);
}

#[test]
fn runs_are_deterministic_and_parallel_matches_sequential() {
    let build = || {
        TableOracle::default()
            .hit("A", (1, 10), 7, 10)
            .hit("A", (6, 15), 7, 10)
            .hit("A", (11, 20), 7, 10)
            .hit("A", (6, 16), 7, 10)
            .hit("B", (6, 15), 9, 10)
            .hit("B", (11, 20), 9, 10)
            .hit("B", (6, 16), 9, 10)
    };
    let subjects = vec![subject("A", 0.7, 0.0), subject("B", 0.9, 0.0)];
    let params = ScanParams::default().with_range(10, 12).with_step(5);

    let sequential = EpitopeScanner::new(query(40), subjects.clone(), params);
    let first = sequential.run(&build()).unwrap();
    let second = sequential.run(&build()).unwrap();
    assert_eq!(first, second);
    assert_eq!(windows_of(&first), vec![(10, 6, 15), (10, 11, 20), (11, 6, 16)]);

    let parallel = EpitopeScanner::new(query(40), subjects, params.with_parallel(true));
    let fanned_out = parallel.run(&build()).unwrap();
    assert_eq!(first.candidates, fanned_out.candidates);
}

#[test]
fn oracle_failure_aborts_with_context() {
    let scanner = EpitopeScanner::new(
        query(25),
        vec![subject("pfkfb1", 0.66, 0.01)],
        ScanParams::default().with_range(10, 10),
    );

    let err = scanner.run(&BrokenOracle).unwrap_err();
    match &err {
        ScanError::Oracle { subject, window, epitope_len, .. } => {
            assert_eq!(subject, "pfkfb1");
            assert_eq!(*window, Window::new(1, 10));
            assert_eq!(*epitope_len, 10);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("pfkfb1"));
}

#[test]
fn degenerate_configuration_is_rejected_before_alignment() {
    let oracle = TableOracle::default();
    let scanner = EpitopeScanner::new(
        query(8),
        vec![subject("A", 0.5, 0.01)],
        ScanParams::default(),
    );

    assert!(matches!(scanner.run(&oracle), Err(ScanError::InvalidParams(_))));
    assert_eq!(oracle.calls(), 0);
}

#[test]
fn reference_final_window_reports_longer_window() {
    let oracle = TableOracle::default().hit("A", (15, 25), 11, 11);
    let scanner = EpitopeScanner::new(
        query(25),
        vec![subject("A", 1.0, 0.0)],
        ScanParams::default()
            .with_range(10, 10)
            .with_final_window(FinalWindow::Reference),
    );

    // The legacy placement labels an 11-residue window as length 10.
    let report = scanner.run(&oracle).unwrap();
    assert_eq!(windows_of(&report), vec![(10, 15, 25)]);
}

#[test]
fn local_oracle_finds_embedded_epitope() {
    let query = Sequence::new("query", b"GGGGGGGGGGMKTAYIAKQRGGGGGGGGGG".to_vec());
    let subjects = vec![Subject::new(
        Sequence::new("subject", b"PPPPMKTAYIAKQRPPPP".to_vec()),
        SimilarityConstraint::new(1.0, 0.0).unwrap(),
    )];
    let scanner = EpitopeScanner::new(query, subjects, ScanParams::default().with_range(10, 10).with_step(1));

    let report = scanner.run(&LocalOracle::new()).unwrap();
    assert!(report
        .candidates
        .iter()
        .any(|c| c.start == 11 && c.end == 20));
}
