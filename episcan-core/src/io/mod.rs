//! Sequence file I/O

pub mod fasta;

pub use fasta::{FastaError, FastaParser, FastaResult};
