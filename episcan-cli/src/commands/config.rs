//! Config command - print or write an example episcan.toml

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::config::Config;

pub fn execute(output: Option<PathBuf>) -> Result<()> {
    let content = Config::example_toml()?;

    match output {
        Some(path) => {
            if path.exists() {
                log::warn!("Overwriting existing file: {}", path.display());
            }
            std::fs::write(&path, content)
                .with_context(|| format!("Failed to write configuration file: {}", path.display()))?;
            log::info!("Example configuration written to {}", path.display());
        }
        None => print!("{}", content),
    }

    Ok(())
}
