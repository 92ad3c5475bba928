//! Epitope scanning
//!
//! The scan visits every window of every length in the configured range and
//! keeps the windows whose best alignment against each subject falls inside
//! that subject's identity interval. The (length, window) iteration is held in
//! an explicit [`ScanCursor`]; subjects are evaluated in order and the first
//! failing subject ends evaluation of that window.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::constraint::Subject;
use crate::oracle::{AlignmentOracle, OracleError};
use crate::report::ScanReport;
use crate::types::{EpitopeCandidate, Sequence, Window};
use crate::window::{FinalWindow, WindowGenerator, Windows};

/// Result type for scan operations
pub type ScanResult<T> = Result<T, ScanError>;

/// Errors that can occur during a scan
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Alignment of {query}:{window} (length {epitope_len}) against {subject} failed: {source}")]
    Oracle {
        query: String,
        subject: String,
        epitope_len: usize,
        window: Window,
        #[source]
        source: OracleError,
    },
}

/// Parameters for a scan
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanParams {
    /// Shortest window length (inclusive)
    pub min_length: usize,
    /// Longest window length (inclusive)
    pub max_length: usize,
    /// Stride between consecutive windows
    pub step: usize,
    /// Placement of the last window of each length
    pub final_window: FinalWindow,
    /// Fan out oracle calls of one length over the rayon pool
    pub parallel: bool,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self {
            min_length: 10,
            max_length: 20,
            step: 5,
            final_window: FinalWindow::Anchored,
            parallel: false,
        }
    }
}

impl ScanParams {
    pub fn with_range(mut self, min_length: usize, max_length: usize) -> Self {
        self.min_length = min_length;
        self.max_length = max_length;
        self
    }

    pub fn with_step(mut self, step: usize) -> Self {
        self.step = step;
        self
    }

    pub fn with_final_window(mut self, final_window: FinalWindow) -> Self {
        self.final_window = final_window;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Reject degenerate configurations before any oracle call is made.
    pub fn validate(&self, query_length: usize) -> ScanResult<()> {
        if self.min_length == 0 {
            return Err(ScanError::InvalidParams(
                "minimum epitope length must be at least 1".to_string(),
            ));
        }
        if self.min_length > self.max_length {
            return Err(ScanError::InvalidParams(format!(
                "minimum epitope length {} exceeds maximum {}",
                self.min_length, self.max_length
            )));
        }
        if self.step == 0 {
            return Err(ScanError::InvalidParams(
                "step size must be at least 1".to_string(),
            ));
        }
        if self.min_length > query_length {
            return Err(ScanError::InvalidParams(format!(
                "minimum epitope length {} exceeds query length {}",
                self.min_length, query_length
            )));
        }
        Ok(())
    }

    pub fn lengths(&self) -> std::ops::RangeInclusive<usize> {
        self.min_length..=self.max_length
    }

    /// Lengths that yield at least one window; longer ones are skipped.
    pub fn scanned_lengths(&self, query_length: usize) -> std::ops::RangeInclusive<usize> {
        self.min_length..=self.max_length.min(query_length)
    }

    pub fn window_generator(&self, length: usize, query_length: usize) -> ScanResult<WindowGenerator> {
        Ok(WindowGenerator::new(length, query_length, self.step)?.with_final_window(self.final_window))
    }
}

/// One unit of work: a window of a given epitope length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScanStep {
    pub epitope_len: usize,
    pub window: Window,
}

/// Explicit state of the (length, window) iteration.
#[derive(Debug, Clone)]
pub struct ScanCursor {
    params: ScanParams,
    query_length: usize,
    last_len: usize,
    epitope_len: usize,
    windows: Option<Windows>,
}

impl ScanCursor {
    pub fn new(params: ScanParams, query_length: usize) -> ScanResult<Self> {
        params.validate(query_length)?;
        Ok(Self {
            params,
            query_length,
            last_len: *params.scanned_lengths(query_length).end(),
            epitope_len: params.min_length,
            windows: None,
        })
    }

    /// Length currently being visited.
    pub fn epitope_len(&self) -> usize {
        self.epitope_len
    }
}

impl Iterator for ScanCursor {
    type Item = ScanStep;

    fn next(&mut self) -> Option<ScanStep> {
        loop {
            if self.epitope_len > self.last_len {
                return None;
            }

            if self.windows.is_none() {
                let generator = WindowGenerator::from_validated(
                    self.epitope_len,
                    self.query_length,
                    self.params.step,
                    self.params.final_window,
                );
                self.windows = Some(generator.iter());
            }

            if let Some(window) = self.windows.as_mut().and_then(Iterator::next) {
                return Some(ScanStep {
                    epitope_len: self.epitope_len,
                    window,
                });
            }

            self.windows = None;
            self.epitope_len += 1;
        }
    }
}

impl std::iter::FusedIterator for ScanCursor {}

/// Size of a scan, known before any oracle call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanPlan {
    pub lengths: usize,
    pub windows: usize,
    pub subjects: usize,
}

impl ScanPlan {
    /// Upper bound on oracle calls; short-circuiting makes the real count lower.
    pub fn max_oracle_calls(&self) -> usize {
        self.windows * self.subjects
    }
}

/// Hooks for progress reporting. Every method has a no-op default.
pub trait ScanObserver {
    /// Called once before the first window of each length with at least one window.
    fn on_length(&mut self, _epitope_len: usize) {}

    /// Called after the last window of a length has been evaluated.
    fn on_length_done(&mut self, _epitope_len: usize) {}

    /// Called for every candidate, in report order.
    fn on_candidate(&mut self, _candidate: &EpitopeCandidate) {}
}

impl ScanObserver for () {}

/// Scans one query against an ordered panel of subjects.
#[derive(Debug, Clone)]
pub struct EpitopeScanner {
    query: Sequence,
    subjects: Vec<Subject>,
    params: ScanParams,
}

impl EpitopeScanner {
    pub fn new(query: Sequence, subjects: Vec<Subject>, params: ScanParams) -> Self {
        Self {
            query,
            subjects,
            params,
        }
    }

    pub fn query(&self) -> &Sequence {
        &self.query
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn params(&self) -> &ScanParams {
        &self.params
    }

    pub fn cursor(&self) -> ScanResult<ScanCursor> {
        ScanCursor::new(self.params, self.query.len())
    }

    pub fn plan(&self) -> ScanResult<ScanPlan> {
        let windows = self.cursor()?.count();
        Ok(ScanPlan {
            lengths: self.params.scanned_lengths(self.query.len()).count(),
            windows,
            subjects: self.subjects.len(),
        })
    }

    pub fn run(&self, oracle: &dyn AlignmentOracle) -> ScanResult<ScanReport> {
        self.run_with_observer(oracle, &mut ())
    }

    pub fn run_with_observer(
        &self,
        oracle: &dyn AlignmentOracle,
        observer: &mut dyn ScanObserver,
    ) -> ScanResult<ScanReport> {
        let cursor = self.cursor()?;
        if self.subjects.is_empty() {
            log::warn!("No subjects configured; every window will be reported");
        }
        log::info!(
            "Scanning {} ({} residues) against {} subject(s) with {} oracle, lengths {}-{}, step {}",
            self.query.id,
            self.query.len(),
            self.subjects.len(),
            oracle.name(),
            self.params.min_length,
            self.params.max_length,
            self.params.step
        );

        let candidates = if self.params.parallel {
            self.scan_parallel(cursor, oracle, observer)?
        } else {
            self.scan_sequential(cursor, oracle, observer)?
        };

        log::info!("Found {} candidate epitope(s)", candidates.len());
        Ok(ScanReport::new(&self.query, self.params, candidates))
    }

    fn scan_sequential(
        &self,
        cursor: ScanCursor,
        oracle: &dyn AlignmentOracle,
        observer: &mut dyn ScanObserver,
    ) -> ScanResult<Vec<EpitopeCandidate>> {
        let mut candidates = Vec::new();
        let mut current_len = None;

        for step in cursor {
            if current_len != Some(step.epitope_len) {
                if let Some(done) = current_len {
                    observer.on_length_done(done);
                }
                log::debug!("Scanning windows of length {}", step.epitope_len);
                observer.on_length(step.epitope_len);
                current_len = Some(step.epitope_len);
            }

            if let Some(candidate) = self.evaluate_step(oracle, step)? {
                observer.on_candidate(&candidate);
                candidates.push(candidate);
            }
        }
        if let Some(done) = current_len {
            observer.on_length_done(done);
        }

        Ok(candidates)
    }

    fn scan_parallel(
        &self,
        cursor: ScanCursor,
        oracle: &dyn AlignmentOracle,
        observer: &mut dyn ScanObserver,
    ) -> ScanResult<Vec<EpitopeCandidate>> {
        let steps: Vec<ScanStep> = cursor.collect();
        let mut candidates = Vec::new();

        for group in steps.chunk_by(|a, b| a.epitope_len == b.epitope_len) {
            let epitope_len = group[0].epitope_len;
            log::debug!(
                "Scanning {} windows of length {} in parallel",
                group.len(),
                epitope_len
            );
            observer.on_length(epitope_len);

            let mut found: Vec<EpitopeCandidate> = group
                .par_iter()
                .map(|step| self.evaluate_step(oracle, *step))
                .collect::<ScanResult<Vec<_>>>()?
                .into_iter()
                .flatten()
                .collect();
            found.sort_by_key(|c| (c.length, c.start, c.end));

            for candidate in found {
                observer.on_candidate(&candidate);
                candidates.push(candidate);
            }
            observer.on_length_done(epitope_len);
        }

        Ok(candidates)
    }

    /// Evaluate one window against every subject, stopping at the first failure.
    fn evaluate_step(
        &self,
        oracle: &dyn AlignmentOracle,
        step: ScanStep,
    ) -> ScanResult<Option<EpitopeCandidate>> {
        for subject in &self.subjects {
            let hsp = oracle
                .align(&self.query, step.window, &subject.sequence)
                .map_err(|source| ScanError::Oracle {
                    query: self.query.id.clone(),
                    subject: subject.id().to_string(),
                    epitope_len: step.epitope_len,
                    window: step.window,
                    source,
                })?;

            if !subject.constraint.evaluate(hsp.as_ref()) {
                log::trace!(
                    "{}:{} rejected by {} ({})",
                    self.query.id,
                    step.window,
                    subject.id(),
                    hsp.map(|h| format!("identity {:.3}", h.identity_ratio()))
                        .unwrap_or_else(|| "no alignment".to_string())
                );
                return Ok(None);
            }
        }

        let candidate = EpitopeCandidate::new(step.epitope_len, self.query.id.clone(), step.window);
        log::debug!("Candidate {}", candidate);
        Ok(Some(candidate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps(params: ScanParams, query_length: usize) -> Vec<(usize, usize, usize)> {
        ScanCursor::new(params, query_length)
            .unwrap()
            .map(|s| (s.epitope_len, s.window.start, s.window.end))
            .collect()
    }

    #[test]
    fn test_default_params() {
        let params = ScanParams::default();
        assert_eq!(params.min_length, 10);
        assert_eq!(params.max_length, 20);
        assert_eq!(params.step, 5);
        assert_eq!(params.final_window, FinalWindow::Anchored);
        assert!(!params.parallel);
    }

    #[test]
    fn test_validate_rejects_degenerate_configs() {
        let base = ScanParams::default();
        assert!(base.validate(30).is_ok());
        assert!(base.with_range(0, 5).validate(30).is_err());
        assert!(base.with_range(12, 11).validate(30).is_err());
        assert!(base.with_step(0).validate(30).is_err());
        assert!(base.validate(9).is_err());
    }

    #[test]
    fn test_cursor_visits_lengths_then_starts() {
        let params = ScanParams::default().with_range(4, 5).with_step(3);
        assert_eq!(
            steps(params, 10),
            vec![(4, 1, 4), (4, 7, 10), (5, 1, 5), (5, 6, 10)]
        );
    }

    #[test]
    fn test_cursor_leaves_gap_before_final_window() {
        // (4, 7) would be followed by an end at 10, so the final window
        // replaces it and residues 5-6 are never inside a length-4 window.
        let params = ScanParams::default().with_range(4, 4).with_step(3);
        let covered: Vec<usize> = steps(params, 10)
            .into_iter()
            .flat_map(|(_, start, end)| start..=end)
            .collect();
        assert!(!covered.contains(&5));
        assert!(!covered.contains(&6));
    }

    #[test]
    fn test_cursor_matches_window_generators() {
        let params = ScanParams::default().with_range(3, 7).with_step(2);
        let expected: Vec<(usize, usize, usize)> = params
            .lengths()
            .flat_map(|len| {
                params
                    .window_generator(len, 15)
                    .unwrap()
                    .iter()
                    .map(move |w| (len, w.start, w.end))
            })
            .collect();
        assert_eq!(steps(params, 15), expected);
    }

    #[test]
    fn test_cursor_stops_at_query_length() {
        let params = ScanParams::default().with_range(8, usize::MAX).with_step(4);
        let got = steps(params, 10);
        assert_eq!(got, vec![(8, 1, 8), (8, 3, 10), (9, 2, 10), (10, 1, 10)]);
        assert_eq!(*params.scanned_lengths(10).end(), 10);
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl ScanObserver for Recorder {
        fn on_length(&mut self, epitope_len: usize) {
            self.events.push(format!("start {}", epitope_len));
        }

        fn on_length_done(&mut self, epitope_len: usize) {
            self.events.push(format!("done {}", epitope_len));
        }
    }

    #[test]
    fn test_observer_sees_every_length_finish() {
        let query = Sequence::new("q", vec![b'A'; 12]);
        for parallel in [false, true] {
            let params = ScanParams::default().with_range(10, 14).with_parallel(parallel);
            let scanner = EpitopeScanner::new(query.clone(), Vec::new(), params);
            let oracle = crate::oracle::LocalOracle::new();
            let mut recorder = Recorder::default();
            scanner.run_with_observer(&oracle, &mut recorder).unwrap();
            assert_eq!(
                recorder.events,
                vec!["start 10", "done 10", "start 11", "done 11", "start 12", "done 12"]
            );
        }
    }

    #[test]
    fn test_cursor_skips_lengths_longer_than_query() {
        let params = ScanParams::default().with_range(9, 12).with_step(5);
        let got = steps(params, 10);
        assert_eq!(got, vec![(9, 2, 10), (10, 1, 10)]);
    }

    #[test]
    fn test_plan_counts() {
        let query = Sequence::new("q", vec![b'A'; 25]);
        let scanner = EpitopeScanner::new(query, Vec::new(), ScanParams::default().with_range(10, 10));
        let plan = scanner.plan().unwrap();
        assert_eq!(plan.lengths, 1);
        assert_eq!(plan.windows, 3);
        assert_eq!(plan.max_oracle_calls(), 0);
    }
}
