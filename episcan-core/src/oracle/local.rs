//! In-process Smith-Waterman oracle
//!
//! Local alignment with rust-bio's pairwise aligner, BLOSUM62 substitution
//! scores and affine gaps. Residues outside `A-Z`/`*` are scored as `X`.

use bio::alignment::pairwise::Aligner;
use bio::alignment::AlignmentOperation;
use bio::scores::blosum62;

use super::{window_residues, AlignmentOracle, Hsp, OracleResult, Sequence, Window};

/// BLAST-like default gap open penalty for BLOSUM62.
pub const DEFAULT_GAP_OPEN: i32 = -11;
/// BLAST-like default gap extend penalty for BLOSUM62.
pub const DEFAULT_GAP_EXTEND: i32 = -1;

/// Smith-Waterman oracle
#[derive(Debug, Clone)]
pub struct LocalOracle {
    gap_open: i32,
    gap_extend: i32,
}

impl LocalOracle {
    pub fn new() -> Self {
        Self {
            gap_open: DEFAULT_GAP_OPEN,
            gap_extend: DEFAULT_GAP_EXTEND,
        }
    }

    /// Penalties are given as non-positive scores, as rust-bio expects.
    pub fn with_gap_penalties(gap_open: i32, gap_extend: i32) -> Self {
        Self {
            gap_open: -gap_open.abs(),
            gap_extend: -gap_extend.abs(),
        }
    }

    fn normalize(residues: &[u8]) -> Vec<u8> {
        residues
            .iter()
            .map(|&r| match r.to_ascii_uppercase() {
                c @ (b'A'..=b'Z' | b'*') => c,
                _ => b'X',
            })
            .collect()
    }

    /// Summarise a local alignment into an HSP. Clipped ends are not part of
    /// the aligned region; every other column counts towards the aligned
    /// query length, gaps included.
    fn summarize(score: i32, operations: &[AlignmentOperation]) -> OracleResult<Option<Hsp>> {
        if score <= 0 {
            return Ok(None);
        }

        let mut identities = 0u32;
        let mut columns = 0u32;
        for op in operations {
            match op {
                AlignmentOperation::Match => {
                    identities += 1;
                    columns += 1;
                }
                AlignmentOperation::Subst | AlignmentOperation::Ins | AlignmentOperation::Del => {
                    columns += 1;
                }
                AlignmentOperation::Xclip(_) | AlignmentOperation::Yclip(_) => {}
            }
        }

        if columns == 0 {
            return Ok(None);
        }
        Hsp::new(score as f64, identities, columns).map(Some)
    }
}

impl Default for LocalOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl AlignmentOracle for LocalOracle {
    fn align(
        &self,
        query: &Sequence,
        window: Window,
        subject: &Sequence,
    ) -> OracleResult<Option<Hsp>> {
        let x = Self::normalize(window_residues(query, window)?);
        let y = Self::normalize(&subject.residues);
        if x.is_empty() || y.is_empty() {
            return Ok(None);
        }

        let mut aligner =
            Aligner::with_capacity(x.len(), y.len(), self.gap_open, self.gap_extend, &blosum62);
        let alignment = aligner.local(&x, &y);
        log::trace!(
            "local {} {} vs {}: score {}",
            query.id,
            window,
            subject.id,
            alignment.score
        );

        Self::summarize(alignment.score, &alignment.operations)
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
