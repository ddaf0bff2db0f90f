use std::fs;
use std::path::Path;
use log::info;
use spi_core::{run_source, RunOptions, RunOutcome};

pub fn run(path: &Path, options: &RunOptions, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let source = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
    info!("Loaded {} ({} bytes)", path.display(), source.len());

    let outcome = run_source(&source, options)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print!("{}", render_memory(&outcome));
    }
    Ok(())
}

/// One `name = value` line per global, sorted by name.
pub fn render_memory(outcome: &RunOutcome) -> String {
    outcome
        .memory
        .iter()
        .map(|(name, value)| format!("{} = {}\n", name, value))
        .collect()
}
