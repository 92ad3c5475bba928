use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod commands;
mod config;
mod error;

use commands::scan::SubjectSpec;
use config::Config;
use error::{print_error_and_exit, CliError};

#[derive(Parser)]
#[command(name = "episcan")]
#[command(about = "episcan - find query windows that reproduce known identities to a subject panel")]
#[command(version)]
#[command(long_about = "
episcan slides windows of several lengths along a protein query, aligns each
window against every subject, and reports the windows whose identity to each
subject falls inside that subject's expected interval.

Examples:
  episcan scan --query q.fasta --subject pfkfb1.fasta:0.66 --subject pfkfb3.fasta:1.0
  episcan scan --config episcan.toml --engine local --format json --output hits.json
  episcan windows --query-length 120 --length 10 --step 5
  episcan config > episcan.toml
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Number of threads to use for parallel scans
    #[arg(short, long, global = true)]
    pub threads: Option<usize>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a query against a subject panel and report candidate epitopes
    Scan {
        /// Query FASTA file (single record)
        #[arg(long)]
        query: Option<PathBuf>,

        /// Subject as PATH:IDENTITY[:TOLERANCE]; repeat for each subject
        #[arg(short, long = "subject", value_name = "PATH:IDENTITY[:TOLERANCE]")]
        subjects: Vec<SubjectSpec>,

        /// Shortest epitope length
        #[arg(long)]
        min_length: Option<usize>,

        /// Longest epitope length
        #[arg(long)]
        max_length: Option<usize>,

        /// Stride between windows
        #[arg(long)]
        step: Option<usize>,

        /// Alignment engine
        #[arg(long)]
        engine: Option<EngineType>,

        /// Path to the blastp binary
        #[arg(long)]
        blastp: Option<PathBuf>,

        /// Directory for per-call scratch files
        #[arg(long)]
        scratch_dir: Option<PathBuf>,

        /// Place the last window with the legacy arithmetic (one residue longer)
        #[arg(long)]
        reference_final_window: bool,

        /// Align windows of one length in parallel
        #[arg(long)]
        parallel: bool,

        /// Report format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Disable the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Print the windows a scan would evaluate for one length
    Windows {
        /// Query length in residues
        #[arg(long)]
        query_length: usize,

        /// Window length
        #[arg(short, long)]
        length: usize,

        /// Stride between windows
        #[arg(long, default_value = "5")]
        step: usize,

        /// Place the last window with the legacy arithmetic
        #[arg(long)]
        reference_final_window: bool,
    },

    /// Print an example episcan.toml
    Config {
        /// Write the example to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum EngineType {
    Blastp,
    Local,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}

fn setup_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn run(cli: Cli) -> Result<()> {
    setup_logging(cli.verbose, cli.quiet);

    let config = Config::load(cli.config.as_deref())?;

    let threads = cli.threads.unwrap_or(config.general.threads);
    if threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .map_err(|e| CliError::config(format!("Failed to set thread count: {}", e)))?;
    }

    match cli.command {
        Commands::Scan {
            query,
            subjects,
            min_length,
            max_length,
            step,
            engine,
            blastp,
            scratch_dir,
            reference_final_window,
            parallel,
            format,
            output,
            no_progress,
        } => {
            commands::scan::execute(
                &config,
                commands::scan::ScanArgs {
                    query,
                    subjects,
                    min_length,
                    max_length,
                    step,
                    engine,
                    blastp,
                    scratch_dir,
                    reference_final_window,
                    parallel,
                    format,
                    output,
                    show_progress: !(no_progress || cli.quiet),
                },
            )?;
        }

        Commands::Windows {
            query_length,
            length,
            step,
            reference_final_window,
        } => {
            commands::windows::execute(query_length, length, step, reference_final_window)?;
        }

        Commands::Config { output } => {
            commands::config::execute(output)?;
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        match err.downcast_ref::<CliError>() {
            Some(cli_err) => print_error_and_exit(cli_err),
            None => {
                eprintln!("Error: {:#}", err);
                std::process::exit(1);
            }
        }
    }
}
