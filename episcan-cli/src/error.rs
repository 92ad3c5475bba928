//! Error handling for the episcan CLI

use episcan_core::FastaError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for episcan CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Input/Output error: {message}")]
    Io { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid input: {message}")]
    Input { message: String },

    #[error("External tool error: {tool} - {message}")]
    ExternalTool { tool: String, message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },
}

impl CliError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into() }
    }

    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io { message: message.into() }
    }

    pub fn file_not_found(path: PathBuf) -> Self {
        Self::FileNotFound { path }
    }

    pub fn input<S: Into<String>>(message: S) -> Self {
        Self::Input { message: message.into() }
    }

    pub fn external_tool<S: Into<String>>(tool: S, message: S) -> Self {
        Self::ExternalTool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into() }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<FastaError> for CliError {
    fn from(err: FastaError) -> Self {
        match err {
            FastaError::NotFound { path } => Self::file_not_found(path),
            other => Self::input(other.to_string()),
        }
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Provide helpful error messages and suggestions
pub fn format_error_with_suggestions(error: &CliError) -> String {
    let mut message = error.to_string();

    match error {
        CliError::FileNotFound { path } => {
            message.push_str(&format!(
                "\n\nSuggestions:\n\
                 • Check that the file path is correct: {}\n\
                 • Ensure you have read permissions for the file\n\
                 • Paths in episcan.toml are resolved from the working directory",
                path.display()
            ));
        }

        CliError::Input { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Each FASTA file must hold exactly one sequence record\n\
                 • Split multi-record files into one file per sequence\n\
                 • Ensure the file is not corrupted or truncated",
            );
        }

        CliError::ExternalTool { tool, .. } => match tool.as_str() {
            "blastp" => {
                message.push_str(
                    "\n\nSuggestions:\n\
                     • Install NCBI BLAST+: https://blast.ncbi.nlm.nih.gov/doc/blast-help/downloadblastdata.html\n\
                     • Ensure blastp is in your PATH or set [oracle] blastp in episcan.toml\n\
                     • Use the built-in aligner with --engine local",
                );
            }
            _ => {
                message.push_str(&format!(
                    "\n\nSuggestions:\n\
                     • Install {}\n\
                     • Ensure {} is in your PATH",
                    tool, tool
                ));
            }
        },

        CliError::Validation { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Give subjects as --subject PATH:IDENTITY[:TOLERANCE], e.g. --subject pfkfb4.fasta:0.66\n\
                 • Or list them as [[subjects]] entries in episcan.toml\n\
                 • Use 'episcan config' to print a sample configuration",
            );
        }

        CliError::Config { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Check your episcan.toml configuration file\n\
                 • Use 'episcan config' to generate a sample configuration\n\
                 • Verify that all configuration values are valid",
            );
        }

        _ => {}
    }

    message
}

/// Print error with helpful suggestions and exit
pub fn print_error_and_exit(error: &CliError) -> ! {
    eprintln!("Error: {}", format_error_with_suggestions(error));
    std::process::exit(1);
}
