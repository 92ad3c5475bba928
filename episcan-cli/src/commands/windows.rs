//! Windows command - list the windows a scan visits for one length

use anyhow::{Context, Result};
use std::io::Write;

use episcan_core::{FinalWindow, Window, WindowGenerator};

fn windows(query_length: usize, length: usize, step: usize, reference: bool) -> Result<Vec<Window>> {
    let final_window = if reference {
        FinalWindow::Reference
    } else {
        FinalWindow::Anchored
    };

    let generator = WindowGenerator::new(length, query_length, step)
        .context("Invalid window parameters")?
        .with_final_window(final_window);
    Ok(generator.iter().collect())
}

pub fn execute(query_length: usize, length: usize, step: usize, reference: bool) -> Result<()> {
    if length > query_length {
        log::warn!(
            "Window length {} exceeds query length {}; a scan skips this length",
            length,
            query_length
        );
        return Ok(());
    }

    let windows = windows(query_length, length, step, reference)?;
    log::debug!("{} window(s) of length {}", windows.len(), length);

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    for window in &windows {
        writeln!(handle, "{}\t{}\t{}", window.start, window.end, window.len())?;
    }
    handle.flush()?;
    Ok(())
}
