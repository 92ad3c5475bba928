//! Shared data types: sequences, windows, alignment statistics and candidates.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::oracle::{OracleError, OracleResult};

/// A single loaded sequence. Residues are kept exactly as read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    pub id: String,
    pub description: Option<String>,
    pub residues: Vec<u8>,
}

impl Sequence {
    pub fn new(id: impl Into<String>, residues: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            description: None,
            residues: residues.into(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    /// Residues covered by a window, or `None` if the window falls outside the sequence.
    pub fn window(&self, window: Window) -> Option<&[u8]> {
        if window.start == 0 || window.start > window.end || window.end > self.len() {
            return None;
        }
        Some(&self.residues[window.start - 1..window.end])
    }
}

/// 1-indexed, inclusive residue range over the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Window {
    pub start: usize,
    pub end: usize,
}

impl Window {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of residues covered (`end - start + 1`).
    pub fn len(&self) -> usize {
        (self.end + 1).saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl From<(usize, usize)> for Window {
    fn from((start, end): (usize, usize)) -> Self {
        Self { start, end }
    }
}

/// Best high-scoring segment pair reported by an alignment oracle.
///
/// `aligned_query_length` counts the aligned query string including gap
/// columns and is never zero; a zero-length alignment is reported as "no
/// alignment" instead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsp {
    score: f64,
    identity_count: u32,
    aligned_query_length: u32,
}

impl Hsp {
    pub fn new(score: f64, identity_count: u32, aligned_query_length: u32) -> OracleResult<Self> {
        if aligned_query_length == 0 {
            return Err(OracleError::InvalidHsp(
                "aligned query length is zero".to_string(),
            ));
        }
        if identity_count > aligned_query_length {
            return Err(OracleError::InvalidHsp(format!(
                "{} identities exceed aligned length {}",
                identity_count, aligned_query_length
            )));
        }
        Ok(Self {
            score,
            identity_count,
            aligned_query_length,
        })
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn identity_count(&self) -> u32 {
        self.identity_count
    }

    pub fn aligned_query_length(&self) -> u32 {
        self.aligned_query_length
    }

    /// Identities relative to aligned query length, in `[0, 1]`.
    pub fn identity_ratio(&self) -> f64 {
        self.identity_count as f64 / self.aligned_query_length as f64
    }
}

/// A window that satisfied every subject's constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EpitopeCandidate {
    pub length: usize,
    pub query_id: String,
    pub start: usize,
    pub end: usize,
}

impl EpitopeCandidate {
    pub fn new(length: usize, query_id: impl Into<String>, window: Window) -> Self {
        Self {
            length,
            query_id: query_id.into(),
            start: window.start,
            end: window.end,
        }
    }

    pub fn window(&self) -> Window {
        Window::new(self.start, self.end)
    }
}

impl fmt::Display for EpitopeCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}:{}-{}", self.length, self.query_id, self.start, self.end)
    }
}
