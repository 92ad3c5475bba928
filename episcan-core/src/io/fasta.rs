//! Single-record FASTA loading
//!
//! Query and subject sequences each live in their own FASTA file. Parsing is
//! delegated to needletail; gzip-compressed files are decoded with flate2.
//! A file must contain exactly one record.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use needletail::parse_fastx_reader;
use thiserror::Error;

use crate::types::Sequence;

#[derive(Debug, Error)]
pub enum FastaError {
    #[error("FASTA file not found: {}", path.display())]
    NotFound { path: PathBuf },
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Parse error in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
    #[error("No sequence records found in {}", path.display())]
    EmptyFile { path: PathBuf },
    #[error("Expected exactly one record in {}, found {count}", path.display())]
    MultipleRecords { path: PathBuf, count: usize },
    #[error("Record '{id}' in {} has no residues", path.display())]
    EmptySequence { path: PathBuf, id: String },
}

pub type FastaResult<T> = Result<T, FastaError>;

/// Loader for single-record FASTA files
pub struct FastaParser;

impl FastaParser {
    /// Load the one and only record of a FASTA file.
    pub fn load_single<P: AsRef<Path>>(path: P) -> FastaResult<Sequence> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FastaError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let file = File::open(path).map_err(|source| FastaError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut sequences = if path.to_string_lossy().ends_with(".gz") {
            Self::parse_reader(BufReader::new(GzDecoder::new(file)), path)?
        } else {
            Self::parse_reader(BufReader::new(file), path)?
        };

        match sequences.len() {
            0 => Err(FastaError::EmptyFile {
                path: path.to_path_buf(),
            }),
            1 => {
                let sequence = sequences.remove(0);
                if sequence.is_empty() {
                    return Err(FastaError::EmptySequence {
                        path: path.to_path_buf(),
                        id: sequence.id,
                    });
                }
                log::debug!(
                    "Loaded {} ({} residues) from {}",
                    sequence.id,
                    sequence.len(),
                    path.display()
                );
                Ok(sequence)
            }
            count => Err(FastaError::MultipleRecords {
                path: path.to_path_buf(),
                count,
            }),
        }
    }

    /// Parse every record from a reader. `origin` is only used in error messages.
    pub fn parse_reader<R: std::io::Read + Send>(
        reader: R,
        origin: &Path,
    ) -> FastaResult<Vec<Sequence>> {
        let parse_error = |e: needletail::errors::ParseError| FastaError::Parse {
            path: origin.to_path_buf(),
            message: e.to_string(),
        };

        let mut fastx_reader = match parse_fastx_reader(reader) {
            Ok(reader) => reader,
            Err(e) if matches!(e.kind, needletail::errors::ParseErrorKind::EmptyFile) => {
                return Err(FastaError::EmptyFile {
                    path: origin.to_path_buf(),
                })
            }
            Err(e) => return Err(parse_error(e)),
        };

        let mut sequences = Vec::new();
        while let Some(record) = fastx_reader.next() {
            let record = record.map_err(parse_error)?;
            sequences.push(Self::record_to_sequence(&record));
        }
        Ok(sequences)
    }

    /// The header is split at the first whitespace into id and description.
    fn record_to_sequence(record: &needletail::parser::SequenceRecord) -> Sequence {
        let header = String::from_utf8_lossy(record.id()).to_string();
        let mut parts = header.splitn(2, char::is_whitespace);
        let id = parts.next().unwrap_or_default().to_string();
        let description = parts
            .next()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        let sequence = Sequence::new(id, record.seq().to_vec());
        match description {
            Some(desc) => sequence.with_description(desc),
            None => sequence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::{Cursor, Write};
    use tempfile::{Builder, NamedTempFile};

    fn fasta_file(content: &str) -> NamedTempFile {
        let mut file = Builder::new().suffix(".fasta").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_single_record() {
        let file = fasta_file(">sp|Q16875|F263_HUMAN 6-phosphofructo-2-kinase\nMPLELTQSRV\nQKIWVPVDHR\n");
        let seq = FastaParser::load_single(file.path()).unwrap();

        assert_eq!(seq.id, "sp|Q16875|F263_HUMAN");
        assert_eq!(seq.description.as_deref(), Some("6-phosphofructo-2-kinase"));
        assert_eq!(seq.residues, b"MPLELTQSRVQKIWVPVDHR");
        assert_eq!(seq.len(), 20);
    }

    #[test]
    fn test_missing_file() {
        let result = FastaParser::load_single("/nonexistent/query.fasta");
        assert!(matches!(result, Err(FastaError::NotFound { .. })));
    }

    #[test]
    fn test_multiple_records_rejected() {
        let file = fasta_file(">a\nMKV\n>b\nMKL\n");
        let result = FastaParser::load_single(file.path());
        assert!(matches!(result, Err(FastaError::MultipleRecords { count: 2, .. })));
    }

    #[test]
    fn test_empty_file_rejected() {
        let file = fasta_file("");
        let result = FastaParser::load_single(file.path());
        assert!(matches!(result, Err(FastaError::EmptyFile { .. })));
    }

    #[test]
    fn test_malformed_file_rejected() {
        let file = fasta_file("this is not a fasta file\n");
        assert!(FastaParser::load_single(file.path()).is_err());
    }

    #[test]
    fn test_gzipped_file() {
        let mut file = Builder::new().suffix(".fasta.gz").tempfile().unwrap();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b">gz_seq\nMKTAYIAKQR\n").unwrap();
        file.write_all(&encoder.finish().unwrap()).unwrap();
        file.flush().unwrap();

        let seq = FastaParser::load_single(file.path()).unwrap();
        assert_eq!(seq.id, "gz_seq");
        assert_eq!(seq.residues, b"MKTAYIAKQR");
    }

    #[test]
    fn test_parse_reader_multiline() {
        let data = ">seq1\nMKTA\nYIAK\nQR\n";
        let sequences = FastaParser::parse_reader(Cursor::new(data), Path::new("inline")).unwrap();
        assert_eq!(sequences.len(), 1);
        assert_eq!(sequences[0].residues, b"MKTAYIAKQR");
        assert_eq!(sequences[0].description, None);
    }
}
