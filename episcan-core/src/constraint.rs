//! Per-subject identity constraints

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::io::{FastaParser, FastaResult};
use crate::scan::{ScanError, ScanResult};
use crate::types::{Hsp, Sequence};

/// Default half-width of the acceptance interval.
pub const DEFAULT_TOLERANCE: f64 = 0.01;

/// Expected identity fraction with a symmetric tolerance.
///
/// The interval `[target - tolerance, target + tolerance]` is inclusive on both
/// ends and is not clamped to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityConstraint {
    target_identity: f64,
    tolerance: f64,
}

impl SimilarityConstraint {
    pub fn new(target_identity: f64, tolerance: f64) -> ScanResult<Self> {
        if !target_identity.is_finite() {
            return Err(ScanError::InvalidParams(format!(
                "target identity must be finite, got {}",
                target_identity
            )));
        }
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ScanError::InvalidParams(format!(
                "tolerance must be a non-negative number, got {}",
                tolerance
            )));
        }
        Ok(Self {
            target_identity,
            tolerance,
        })
    }

    pub fn target_identity(&self) -> f64 {
        self.target_identity
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Lower and upper bound of the acceptance interval.
    pub fn interval(&self) -> (f64, f64) {
        (
            self.target_identity - self.tolerance,
            self.target_identity + self.tolerance,
        )
    }

    pub fn accepts_ratio(&self, identity_ratio: f64) -> bool {
        let (low, high) = self.interval();
        low <= identity_ratio && identity_ratio <= high
    }

    /// A missing alignment never satisfies the constraint.
    pub fn evaluate(&self, hsp: Option<&Hsp>) -> bool {
        match hsp {
            Some(hsp) => self.accepts_ratio(hsp.identity_ratio()),
            None => false,
        }
    }
}

/// Reference sequence with its expected identity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub sequence: Sequence,
    pub constraint: SimilarityConstraint,
}

impl Subject {
    pub fn new(sequence: Sequence, constraint: SimilarityConstraint) -> Self {
        Self {
            sequence,
            constraint,
        }
    }

    /// Load a subject from a single-record FASTA file.
    pub fn load<P: AsRef<Path>>(path: P, constraint: SimilarityConstraint) -> FastaResult<Self> {
        let sequence = FastaParser::load_single(path)?;
        Ok(Self::new(sequence, constraint))
    }

    pub fn id(&self) -> &str {
        &self.sequence.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hsp(identities: u32, length: u32) -> Hsp {
        Hsp::new(30.0, identities, length).unwrap()
    }

    #[test]
    fn test_inclusive_boundaries() {
        let constraint = SimilarityConstraint::new(0.50, 0.01).unwrap();

        assert!(constraint.evaluate(Some(&hsp(49, 100))));
        assert!(constraint.evaluate(Some(&hsp(51, 100))));
        assert!(!constraint.evaluate(Some(&hsp(489_999, 1_000_000))));
        assert!(!constraint.evaluate(Some(&hsp(510_001, 1_000_000))));
    }

    #[test]
    fn test_no_alignment_rejected() {
        let constraint = SimilarityConstraint::new(0.0, 1.0).unwrap();
        assert!(!constraint.evaluate(None));
    }

    #[test]
    fn test_exact_match_with_zero_tolerance() {
        let constraint = SimilarityConstraint::new(1.0, 0.0).unwrap();
        assert!(constraint.evaluate(Some(&hsp(10, 10))));
        assert!(!constraint.evaluate(Some(&hsp(9, 10))));
    }

    #[test]
    fn test_interval_is_not_clamped() {
        let constraint = SimilarityConstraint::new(1.0, 0.05).unwrap();
        let (low, high) = constraint.interval();
        assert!((low - 0.95).abs() < 1e-12);
        assert!(high > 1.0);
    }

    #[test]
    fn test_invalid_tolerance_rejected() {
        assert!(SimilarityConstraint::new(0.5, -0.01).is_err());
        assert!(SimilarityConstraint::new(0.5, f64::NAN).is_err());
        assert!(SimilarityConstraint::new(f64::INFINITY, 0.01).is_err());
    }

    #[test]
    fn test_default_tolerance() {
        let constraint = SimilarityConstraint::new(0.66, DEFAULT_TOLERANCE).unwrap();
        assert!(constraint.accepts_ratio(0.655));
        assert!(!constraint.accepts_ratio(0.6));
    }
}
