//! Output-file persistence and diagnostic snapshots.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::ScraperError;
use crate::offer::Offer;

const DIAGNOSTIC_FILENAME: &str = "debug.html";

/// Write the full offer sequence as pretty-printed JSON, fully replacing
/// any existing file. Parent directories are created as needed.
pub fn persist(offers: &[Offer], path: &Path) -> Result<(), ScraperError> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(offers)?;
    fs::write(path, json)?;
    Ok(())
}

/// Read the just-written output file back. Callers observe exactly what
/// was persisted, not the in-memory list.
pub fn read_back(path: &Path) -> Result<Vec<Offer>, ScraperError> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

/// Capture raw page markup next to the output file. Fixed filename:
/// successive failing runs overwrite, diagnostics are consumed right after
/// a run.
pub fn write_diagnostic(html: &str, output_path: &Path) -> Result<PathBuf, ScraperError> {
    let diag_path = diagnostic_path(output_path);
    ensure_parent_dir(&diag_path)?;
    fs::write(&diag_path, html)?;
    info!("Saved debug HTML to {}", diag_path.display());
    Ok(diag_path)
}

pub fn diagnostic_path(output_path: &Path) -> PathBuf {
    output_path
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(DIAGNOSTIC_FILENAME)
}

fn ensure_parent_dir(path: &Path) -> Result<(), ScraperError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
