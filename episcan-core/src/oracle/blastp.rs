//! NCBI BLAST+ `blastp` oracle
//!
//! The query and every subject are written once to scratch FASTA files that
//! the oracle reuses across calls. Each call runs `blastp` restricted to the
//! window with `-query_loc` and reads tabular output from its own scratch
//! file, so concurrent calls never share an output path. Scratch files live in
//! a caller-chosen directory (the system temp dir by default) and are removed
//! once the oracle is dropped.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};

use tempfile::NamedTempFile;

use super::{
    best_hsp, window_residues, AlignmentOracle, Hsp, OracleError, OracleResult, Sequence, Window,
};

/// Tabular columns requested from blastp.
pub const OUTPUT_FORMAT: &str = "6 sseqid score nident qseq";

/// Scratch FASTA file together with the residues it was written from.
#[derive(Debug)]
struct ScratchFasta {
    residues: Vec<u8>,
    file: NamedTempFile,
}

type FastaCache = Arc<Mutex<HashMap<String, Arc<ScratchFasta>>>>;

/// blastp engine
#[derive(Debug, Clone)]
pub struct BlastpOracle {
    binary_path: PathBuf,
    task: String,
    extra_args: Vec<String>,
    scratch_dir: Option<PathBuf>,
    fasta_cache: FastaCache,
}

impl BlastpOracle {
    pub fn new() -> Self {
        Self {
            binary_path: PathBuf::from("blastp"),
            task: "blastp-short".to_string(),
            extra_args: Vec::new(),
            scratch_dir: None,
            fasta_cache: FastaCache::default(),
        }
    }

    /// Create oracle with custom binary path
    pub fn with_binary_path<P: Into<PathBuf>>(binary_path: P) -> Self {
        Self {
            binary_path: binary_path.into(),
            ..Self::new()
        }
    }

    /// Locate `blastp` on `PATH`.
    pub fn locate() -> OracleResult<Self> {
        which::which("blastp")
            .map(Self::with_binary_path)
            .map_err(|e| OracleError::ExternalTool(format!("blastp not found on PATH: {}", e)))
    }

    pub fn with_task<S: Into<String>>(mut self, task: S) -> Self {
        self.task = task.into();
        self
    }

    pub fn with_extra_args(mut self, extra_args: Vec<String>) -> Self {
        self.extra_args = extra_args;
        self
    }

    /// Directory for per-call scratch files.
    pub fn with_scratch_dir<P: Into<PathBuf>>(mut self, scratch_dir: P) -> Self {
        self.scratch_dir = Some(scratch_dir.into());
        self.fasta_cache = FastaCache::default();
        self
    }

    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    /// Check if blastp binary is available
    fn check_binary_available(&self) -> bool {
        Command::new(&self.binary_path)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn scratch_file(&self, prefix: &str, suffix: &str) -> OracleResult<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix).suffix(suffix);
        let file = match &self.scratch_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        Ok(file)
    }

    /// Write sequence to a scratch FASTA file
    fn write_fasta_file(&self, sequence: &Sequence) -> OracleResult<NamedTempFile> {
        let mut temp_file = self.scratch_file("episcan-", ".fasta")?;

        writeln!(temp_file, ">{}", sequence.id)?;
        for chunk in sequence.residues.chunks(80) {
            temp_file.write_all(chunk)?;
            temp_file.write_all(b"\n")?;
        }

        temp_file.flush()?;
        Ok(temp_file)
    }

    /// Scratch FASTA for `sequence`, written on first use and rewritten only
    /// when a sequence with the same id but different residues shows up.
    fn cached_fasta(&self, sequence: &Sequence) -> OracleResult<Arc<ScratchFasta>> {
        let mut cache = self
            .fasta_cache
            .lock()
            .map_err(|_| OracleError::ExternalTool("scratch file cache is poisoned".to_string()))?;

        if let Some(entry) = cache.get(&sequence.id) {
            if entry.residues == sequence.residues {
                return Ok(Arc::clone(entry));
            }
        }

        let entry = Arc::new(ScratchFasta {
            residues: sequence.residues.clone(),
            file: self.write_fasta_file(sequence)?,
        });
        log::trace!("scratch FASTA for {}: {}", sequence.id, entry.file.path().display());
        cache.insert(sequence.id.clone(), Arc::clone(&entry));
        Ok(entry)
    }

    /// Build blastp command arguments
    fn build_command_args(
        &self,
        query_path: &Path,
        window: Window,
        subject_path: &Path,
        out_path: &Path,
    ) -> Vec<String> {
        let mut args = vec![
            "-query".to_string(),
            query_path.to_string_lossy().to_string(),
            "-query_loc".to_string(),
            window.to_string(),
            "-subject".to_string(),
            subject_path.to_string_lossy().to_string(),
        ];

        if !self.task.is_empty() {
            args.push("-task".to_string());
            args.push(self.task.clone());
        }

        args.push("-outfmt".to_string());
        args.push(OUTPUT_FORMAT.to_string());
        args.push("-out".to_string());
        args.push(out_path.to_string_lossy().to_string());

        args.extend(self.extra_args.iter().cloned());
        args
    }

    /// Parse one tabular line into subject id and HSP.
    fn parse_tabular_line(line: &str) -> OracleResult<(String, Hsp)> {
        let fields: Vec<&str> = line.trim_end_matches('\r').split('\t').collect();
        if fields.len() != 4 {
            return Err(OracleError::Parse(format!(
                "expected 4 tab-separated fields, got {}: {:?}",
                fields.len(),
                line
            )));
        }

        let score = fields[1]
            .trim()
            .parse::<f64>()
            .map_err(|_| OracleError::Parse(format!("invalid score: {:?}", fields[1])))?;
        let identities = fields[2]
            .trim()
            .parse::<u32>()
            .map_err(|_| OracleError::Parse(format!("invalid identity count: {:?}", fields[2])))?;
        let aligned_query_length = fields[3].trim().len() as u32;

        Ok((
            fields[0].to_string(),
            Hsp::new(score, identities, aligned_query_length)?,
        ))
    }

    /// Best HSP of the first reported subject. Empty output means no alignment.
    fn parse_tabular<R: BufRead>(reader: R) -> OracleResult<Option<Hsp>> {
        let mut first_subject: Option<String> = None;
        let mut hsps = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            let (subject_id, hsp) = Self::parse_tabular_line(&line)?;
            match &first_subject {
                None => first_subject = Some(subject_id),
                Some(first) if *first != subject_id => continue,
                Some(_) => {}
            }
            hsps.push(hsp);
        }

        Ok(best_hsp(hsps))
    }
}

impl Default for BlastpOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl AlignmentOracle for BlastpOracle {
    fn align(
        &self,
        query: &Sequence,
        window: Window,
        subject: &Sequence,
    ) -> OracleResult<Option<Hsp>> {
        window_residues(query, window)?;

        let query_fasta = self.cached_fasta(query)?;
        let subject_fasta = self.cached_fasta(subject)?;
        let out_file = self.scratch_file("episcan-", ".tsv")?;

        let args = self.build_command_args(
            query_fasta.file.path(),
            window,
            subject_fasta.file.path(),
            out_file.path(),
        );
        log::trace!("{} {}", self.binary_path.display(), args.join(" "));

        let output = Command::new(&self.binary_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                OracleError::ExternalTool(format!(
                    "Failed to start {}: {}",
                    self.binary_path.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OracleError::ExternalTool(format!(
                "blastp failed with exit code {:?}: {}",
                output.status.code(),
                stderr.trim()
            )));
        }

        let reader = BufReader::new(out_file.reopen()?);
        Self::parse_tabular(reader)
    }

    fn name(&self) -> &'static str {
        "blastp"
    }

    fn is_available(&self) -> bool {
        self.check_binary_available()
    }
}
