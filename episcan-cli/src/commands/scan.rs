//! Scan command implementation - load sequences, run the scan, write the report

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use episcan_core::{
    AlignmentOracle, BlastpOracle, EpitopeCandidate, EpitopeScanner, FastaParser, FinalWindow,
    LocalOracle, OracleEngine, ReportFormat, ScanObserver, ScanParams, SimilarityConstraint,
    Subject, DEFAULT_TOLERANCE,
};

use crate::config::{Config, SubjectConfig};
use crate::error::{CliError, CliResult};
use crate::{EngineType, OutputFormat};

/// Subject given on the command line as `PATH:IDENTITY[:TOLERANCE]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectSpec {
    pub path: PathBuf,
    pub identity: f64,
    pub tolerance: f64,
}

impl FromStr for SubjectSpec {
    type Err = CliError;

    fn from_str(s: &str) -> CliResult<Self> {
        let invalid = || CliError::validation(format!("invalid subject '{}', expected PATH:IDENTITY[:TOLERANCE]", s));
        let parts: Vec<&str> = s.rsplitn(3, ':').collect();

        let (path, identity, tolerance) = match parts.as_slice() {
            [last, middle, rest] => match (middle.parse::<f64>(), last.parse::<f64>()) {
                (Ok(identity), Ok(tolerance)) => (rest.to_string(), identity, tolerance),
                (Err(_), Ok(identity)) => (format!("{}:{}", rest, middle), identity, DEFAULT_TOLERANCE),
                _ => return Err(invalid()),
            },
            [last, rest] => {
                let identity = last.parse::<f64>().map_err(|_| invalid())?;
                (rest.to_string(), identity, DEFAULT_TOLERANCE)
            }
            _ => return Err(invalid()),
        };

        if path.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            path: PathBuf::from(path),
            identity,
            tolerance,
        })
    }
}

impl From<&SubjectConfig> for SubjectSpec {
    fn from(config: &SubjectConfig) -> Self {
        Self {
            path: config.path.clone(),
            identity: config.identity,
            tolerance: config.tolerance,
        }
    }
}

/// Command-line values for `episcan scan`; `None` falls back to the configuration.
pub struct ScanArgs {
    pub query: Option<PathBuf>,
    pub subjects: Vec<SubjectSpec>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub step: Option<usize>,
    pub engine: Option<EngineType>,
    pub blastp: Option<PathBuf>,
    pub scratch_dir: Option<PathBuf>,
    pub reference_final_window: bool,
    pub parallel: bool,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
    pub show_progress: bool,
}

/// Progress over the outer (epitope length) loop.
struct LengthProgress {
    bar: ProgressBar,
    min_length: usize,
}

impl LengthProgress {
    fn new(params: &ScanParams, query_length: usize) -> Result<Self> {
        let bar = ProgressBar::new(params.scanned_lengths(query_length).count() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .context("Invalid progress bar template")?,
        );
        Ok(Self {
            bar,
            min_length: params.min_length,
        })
    }
}

impl ScanObserver for LengthProgress {
    fn on_length(&mut self, epitope_len: usize) {
        self.bar.set_message(format!("length {}", epitope_len));
    }

    fn on_length_done(&mut self, epitope_len: usize) {
        self.bar.set_position((epitope_len - self.min_length + 1) as u64);
    }

    fn on_candidate(&mut self, candidate: &EpitopeCandidate) {
        self.bar.println(format!("candidate {}", candidate));
    }
}

pub fn execute(config: &Config, args: ScanArgs) -> Result<()> {
    let query_path = args
        .query
        .clone()
        .or_else(|| config.query.as_ref().map(|q| q.path.clone()))
        .ok_or_else(|| CliError::validation("no query given; use --query or [query] in episcan.toml"))?;

    let subject_specs: Vec<SubjectSpec> = if args.subjects.is_empty() {
        config.subjects.iter().map(SubjectSpec::from).collect()
    } else {
        args.subjects.clone()
    };
    if subject_specs.is_empty() {
        return Err(CliError::validation(
            "no subjects given; at least one subject is needed for a meaningful scan",
        )
        .into());
    }

    log::info!("Query: {}", query_path.display());
    let query = FastaParser::load_single(&query_path).map_err(CliError::from)?;
    let subjects = load_subjects(&subject_specs)?;

    let params = build_scan_params(config, &args);
    let oracle = build_oracle(config, &args)?;
    if !oracle.is_available() {
        return Err(CliError::external_tool(
            oracle.name().to_string(),
            "alignment engine is not available".to_string(),
        )
        .into());
    }

    let scanner = EpitopeScanner::new(query, subjects, params);
    let plan = scanner.plan().context("Invalid scan configuration")?;
    log::info!(
        "Plan: {} length(s), {} window(s), up to {} oracle call(s)",
        plan.lengths,
        plan.windows,
        plan.max_oracle_calls()
    );

    let outcome = if args.show_progress {
        let mut progress = LengthProgress::new(&params, scanner.query().len())?;
        let outcome = scanner.run_with_observer(oracle.as_ref(), &mut progress);
        progress.bar.finish_and_clear();
        outcome
    } else {
        scanner.run_with_observer(oracle.as_ref(), &mut ())
    };
    let report = outcome.context("Scan failed")?;

    let format = match args.format {
        OutputFormat::Text => ReportFormat::Text,
        OutputFormat::Json => ReportFormat::Json,
        OutputFormat::Tsv => ReportFormat::Tsv,
    };
    write_report(&report, format, args.output.as_deref())?;

    log::info!("Scan completed: {} candidate(s)", report.len());
    Ok(())
}

fn load_subjects(specs: &[SubjectSpec]) -> Result<Vec<Subject>> {
    specs
        .iter()
        .map(|spec| -> Result<Subject> {
            let constraint = SimilarityConstraint::new(spec.identity, spec.tolerance)
                .map_err(|e| CliError::validation(format!("subject {}: {}", spec.path.display(), e)))?;
            let subject = Subject::load(&spec.path, constraint).map_err(CliError::from)?;
            log::info!(
                "Subject: {} ({}), identity {:.2} ± {:.2}",
                subject.id(),
                spec.path.display(),
                spec.identity,
                spec.tolerance
            );
            Ok(subject)
        })
        .collect()
}

fn build_scan_params(config: &Config, args: &ScanArgs) -> ScanParams {
    // Use CLI args, then config, then defaults
    let mut params = config.scan.to_params();
    if let Some(min_length) = args.min_length {
        params.min_length = min_length;
    }
    if let Some(max_length) = args.max_length {
        params.max_length = max_length;
    }
    if let Some(step) = args.step {
        params.step = step;
    }
    if args.reference_final_window {
        params.final_window = FinalWindow::Reference;
    }
    if args.parallel {
        params.parallel = true;
    }
    params
}

fn build_oracle(config: &Config, args: &ScanArgs) -> Result<Box<dyn AlignmentOracle>> {
    let engine = match args.engine {
        Some(EngineType::Blastp) => OracleEngine::Blastp,
        Some(EngineType::Local) => OracleEngine::Local,
        None => config.oracle.engine,
    };
    log::info!("Alignment engine: {}", engine.as_str());

    let oracle: Box<dyn AlignmentOracle> = match engine {
        OracleEngine::Blastp => {
            let binary = args.blastp.clone().or_else(|| config.oracle.blastp.clone());
            let mut oracle = match binary {
                Some(path) => BlastpOracle::with_binary_path(path),
                None => BlastpOracle::locate().unwrap_or_else(|e| {
                    log::debug!("{}; falling back to 'blastp'", e);
                    BlastpOracle::new()
                }),
            }
            .with_task(config.oracle.task.clone())
            .with_extra_args(config.oracle.extra_args.clone());

            if let Some(dir) = args.scratch_dir.as_ref().or(config.oracle.scratch_dir.as_ref()) {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create scratch directory: {}", dir.display()))?;
                oracle = oracle.with_scratch_dir(dir);
            }
            log::debug!("blastp binary: {}", oracle.binary_path().display());
            Box::new(oracle)
        }
        OracleEngine::Local => Box::new(LocalOracle::with_gap_penalties(
            config.oracle.gap_open,
            config.oracle.gap_extend,
        )),
    };

    Ok(oracle)
}

fn write_report(report: &episcan_core::ScanReport, format: ReportFormat, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            let mut writer = std::io::BufWriter::new(file);
            report
                .write(&mut writer, format)
                .with_context(|| format!("Failed to write report: {}", path.display()))?;
            log::info!("Report written to {}", path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            report.write(&mut handle, format).context("Failed to write report")?;
            handle.flush()?;
        }
    }
    Ok(())
}
