use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use super::{ImportMode, ImportRequest};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportReportFile<'a> {
    generated_at: String,
    source_path: String,
    primary_type: &'a str,
    mode: ImportMode,
    row_count: usize,
    warnings: Vec<String>,
    request: &'a ImportRequest,
}

/// Writes the request plus a readable header to
/// `<reports_dir>/import-<timestamp>.json` and returns the file path.
pub fn write_import_report(
    reports_dir: &Path,
    source_path: &Path,
    request: &ImportRequest,
) -> Result<PathBuf> {
    fs::create_dir_all(reports_dir)
        .with_context(|| format!("create reports directory {}", reports_dir.display()))?;

    let now = Utc::now();
    let path = reports_dir.join(now.format("import-%Y%m%d-%H%M%S%.3f.json").to_string());
    let payload = ImportReportFile {
        generated_at: now.to_rfc3339(),
        source_path: source_path.display().to_string(),
        primary_type: &request.primary_type,
        mode: request.mode_for(&request.primary_type),
        row_count: request.rows.len(),
        warnings: request.coercion_summary.lines(),
        request,
    };
    let json = serde_json::to_string_pretty(&payload).context("serialize import report")?;
    fs::write(&path, json).with_context(|| format!("write import report {}", path.display()))?;

    tracing::info!(
        target: "kennel_import",
        event = "import_report_written",
        path = %path.display(),
        rows = payload.row_count,
    );
    Ok(path)
}
