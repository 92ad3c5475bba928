//! episcan core library
//!
//! Window generation, per-subject identity constraints, alignment oracles and
//! the epitope scanner that ties them together.

pub mod types;
pub mod io;
pub mod window;
pub mod constraint;
pub mod oracle;
pub mod scan;
pub mod report;

// Re-export commonly used types and functions
pub use types::{EpitopeCandidate, Hsp, Sequence, Window};
pub use io::{FastaError, FastaParser, FastaResult};
pub use window::{FinalWindow, WindowGenerator};
pub use constraint::{SimilarityConstraint, Subject, DEFAULT_TOLERANCE};
pub use oracle::{AlignmentOracle, BlastpOracle, LocalOracle, OracleEngine, OracleError, OracleResult};
pub use scan::{EpitopeScanner, ScanCursor, ScanError, ScanObserver, ScanParams, ScanPlan, ScanResult, ScanStep};
pub use report::{ReportFormat, ScanReport};

/// Version information for the episcan core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
