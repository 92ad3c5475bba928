//! Alignment oracles
//!
//! An oracle aligns one query window against one subject and reports the best
//! high-scoring segment pair, or `None` when the two share no local alignment.
//! The production oracle shells out to NCBI BLAST+; an in-process
//! Smith-Waterman oracle is available when BLAST+ is not installed.

use serde::{Deserialize, Serialize};

pub use crate::types::{Hsp, Sequence, Window};

pub mod blastp;
pub mod local;

pub use blastp::BlastpOracle;
pub use local::LocalOracle;

/// Result type for oracle calls
pub type OracleResult<T> = Result<T, OracleError>;

/// Errors an oracle can raise. All of them abort a scan; "no alignment" is
/// not an error and is reported as `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("External tool error: {0}")]
    ExternalTool(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid alignment: {0}")]
    InvalidHsp(String),

    #[error("Window {window} lies outside query '{query}' of length {length}")]
    WindowOutOfRange {
        query: String,
        window: Window,
        length: usize,
    },
}

/// Source of best local alignments between a query window and a subject.
pub trait AlignmentOracle: Send + Sync {
    /// Best-scoring HSP between `query[window]` and `subject`.
    fn align(&self, query: &Sequence, window: Window, subject: &Sequence)
        -> OracleResult<Option<Hsp>>;

    /// Get the name/identifier of this oracle
    fn name(&self) -> &'static str;

    /// Check if the oracle can run (e.g., external tools installed)
    fn is_available(&self) -> bool {
        true
    }
}

impl<T: AlignmentOracle + ?Sized> AlignmentOracle for Box<T> {
    fn align(&self, query: &Sequence, window: Window, subject: &Sequence)
        -> OracleResult<Option<Hsp>> {
        (**self).align(query, window, subject)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}

/// Available oracle engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleEngine {
    #[default]
    Blastp,
    Local,
}

impl OracleEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            OracleEngine::Blastp => "blastp",
            OracleEngine::Local => "local",
        }
    }
}

/// Keep the first HSP among those sharing the highest score.
pub(crate) fn best_hsp<I: IntoIterator<Item = Hsp>>(hsps: I) -> Option<Hsp> {
    hsps.into_iter().fold(None, |best, hsp| match best {
        Some(current) if current.score() >= hsp.score() => Some(current),
        _ => Some(hsp),
    })
}

pub(crate) fn window_residues<'a>(query: &'a Sequence, window: Window) -> OracleResult<&'a [u8]> {
    query
        .window(window)
        .ok_or_else(|| OracleError::WindowOutOfRange {
            query: query.id.clone(),
            window,
            length: query.len(),
        })
}
