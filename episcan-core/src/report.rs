//! Scan reports
//!
//! The text form is one line per candidate, `"<length> - <query_id>:<start>-<end>"`,
//! in discovery order. JSON and TSV renderings carry the same candidates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;

use crate::scan::ScanParams;
use crate::types::{EpitopeCandidate, Sequence};

/// Output encodings for a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
    Tsv,
}

/// Ordered candidates of one scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub query_id: String,
    pub query_length: usize,
    pub params: ScanParams,
    pub candidates: Vec<EpitopeCandidate>,
}

impl ScanReport {
    pub fn new(query: &Sequence, params: ScanParams, candidates: Vec<EpitopeCandidate>) -> Self {
        Self {
            query_id: query.id.clone(),
            query_length: query.len(),
            params,
            candidates,
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Report lines in the text format.
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.candidates.iter().map(ToString::to_string)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn write<W: Write>(&self, writer: &mut W, format: ReportFormat) -> std::io::Result<()> {
        match format {
            ReportFormat::Text => write!(writer, "{}", self)?,
            ReportFormat::Json => {
                serde_json::to_writer_pretty(&mut *writer, self)?;
                writeln!(writer)?;
            }
            ReportFormat::Tsv => self.write_tsv(writer)?,
        }
        writer.flush()
    }

    fn write_tsv<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "length\tquery_id\tstart\tend")?;
        for c in &self.candidates {
            writeln!(writer, "{}\t{}\t{}\t{}", c.length, c.query_id, c.start, c.end)?;
        }
        Ok(())
    }
}

impl fmt::Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for candidate in &self.candidates {
            writeln!(f, "{}", candidate)?;
        }
        Ok(())
    }
}
