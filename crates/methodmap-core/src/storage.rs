//! Read/write saved analysis reports from disk.

use crate::schema::{self, AnalysisReport};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const DATA_DIR: &str = ".methodmap";
const REPORT_FILE: &str = "report.json";

/// Directory holding config and saved reports for a project root.
pub fn data_dir(project_root: &Path) -> PathBuf {
    project_root.join(DATA_DIR)
}

pub fn report_file(project_root: &Path) -> PathBuf {
    data_dir(project_root).join(REPORT_FILE)
}

pub fn report_exists(project_root: &Path) -> bool {
    report_file(project_root).exists()
}

/// Load a saved report from disk.
pub fn load(project_root: &Path) -> Result<AnalysisReport> {
    let path = report_file(project_root);
    let json = fs::read_to_string(&path)
        .with_context(|| format!("failed to read report from {}", path.display()))?;
    schema::from_json(&json)
}

/// Save a report to disk, creating the data directory if needed.
pub fn save(project_root: &Path, report: &AnalysisReport) -> Result<()> {
    let dir = data_dir(project_root);
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create directory {}", dir.display()))?;

    let path = report_file(project_root);
    let json = schema::to_json(report)?;
    fs::write(&path, json)
        .with_context(|| format!("failed to write report to {}", path.display()))?;

    Ok(())
}
