use std::fs;
use std::path::Path;
use spi_core::format_source;

pub fn fmt(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let source = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
    print!("{}", format_source(&source)?);
    Ok(())
}
