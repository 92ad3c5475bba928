//! Configuration handling for the episcan CLI
//!
//! Supports loading configuration from episcan.toml files with CLI argument overrides.

use anyhow::{Context, Result};
use episcan_core::{FinalWindow, OracleEngine, ScanParams, DEFAULT_TOLERANCE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file picked up from the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "episcan.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    /// Query sequence, unless given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<QueryConfig>,
    /// Subject panel, unless given on the command line
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<SubjectConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default number of threads to use
    #[serde(default = "default_threads")]
    pub threads: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Shortest epitope length
    #[serde(default = "default_min_length")]
    pub min_length: usize,

    /// Longest epitope length
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    /// Stride between windows
    #[serde(default = "default_step")]
    pub step: usize,

    /// Placement of the last window ("anchored" or "reference")
    #[serde(default)]
    pub final_window: FinalWindow,

    /// Run oracle calls of one length in parallel
    #[serde(default)]
    pub parallel: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Alignment engine ("blastp" or "local")
    #[serde(default)]
    pub engine: OracleEngine,

    /// Path to the blastp binary; looked up on PATH when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blastp: Option<PathBuf>,

    /// blastp task
    #[serde(default = "default_task")]
    pub task: String,

    /// Additional blastp arguments
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// Directory for per-call scratch files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,

    /// Gap open penalty for the local engine
    #[serde(default = "default_gap_open")]
    pub gap_open: i32,

    /// Gap extend penalty for the local engine
    #[serde(default = "default_gap_extend")]
    pub gap_extend: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectConfig {
    pub path: PathBuf,
    pub identity: f64,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

// Default value functions
fn default_threads() -> usize { num_cpus::get() }
fn default_min_length() -> usize { ScanParams::default().min_length }
fn default_max_length() -> usize { ScanParams::default().max_length }
fn default_step() -> usize { ScanParams::default().step }
fn default_task() -> String { "blastp-short".to_string() }
fn default_gap_open() -> i32 { episcan_core::oracle::local::DEFAULT_GAP_OPEN }
fn default_gap_extend() -> i32 { episcan_core::oracle::local::DEFAULT_GAP_EXTEND }
fn default_tolerance() -> f64 { DEFAULT_TOLERANCE }

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            min_length: default_min_length(),
            max_length: default_max_length(),
            step: default_step(),
            final_window: FinalWindow::default(),
            parallel: false,
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            engine: OracleEngine::default(),
            blastp: None,
            task: default_task(),
            extra_args: Vec::new(),
            scratch_dir: None,
            gap_open: default_gap_open(),
            gap_extend: default_gap_extend(),
        }
    }
}

impl ScanConfig {
    pub fn to_params(&self) -> ScanParams {
        ScanParams::default()
            .with_range(self.min_length, self.max_length)
            .with_step(self.step)
            .with_final_window(self.final_window)
            .with_parallel(self.parallel)
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                Self::load_from_file(path)?
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    log::info!("Loading configuration from: {}", DEFAULT_CONFIG_FILE);
                    Self::load_from_file(&default_path)?
                } else {
                    log::debug!("Using default configuration");
                    Self::default()
                }
            }
        };

        Ok(config)
    }

    /// Load configuration from a specific TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration file: {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write configuration file: {}", path.display()))?;

        Ok(())
    }

    /// Example configuration with a query and a small subject panel
    pub fn example() -> Self {
        Self {
            query: Some(QueryConfig {
                path: PathBuf::from("seqs/query.fasta"),
            }),
            subjects: vec![
                SubjectConfig {
                    path: PathBuf::from("seqs/subject_1.fasta"),
                    identity: 0.66,
                    tolerance: DEFAULT_TOLERANCE,
                },
                SubjectConfig {
                    path: PathBuf::from("seqs/subject_2.fasta"),
                    identity: 1.0,
                    tolerance: DEFAULT_TOLERANCE,
                },
            ],
            ..Self::default()
        }
    }

    /// Generate example configuration file content
    pub fn example_toml() -> Result<String> {
        toml::to_string_pretty(&Self::example()).context("Failed to serialize example configuration")
    }
}
