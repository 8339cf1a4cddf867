//! Immutable apply-run reports.
//!
//! Every apply invocation, whether it executed, simulated, or was stopped
//! by the safety cap, persists one JSON report keyed by run id. Reports
//! live in a `reports/` directory next to the staging store and are never
//! rewritten; the run id embeds a UTC timestamp so lexicographic filename
//! order is chronological.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Outcome of one candidate within a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApplyItem {
    pub track_id: i64,
    pub path: String,
    /// "move" | "delete"
    pub action: String,
    /// "pending" | "applied" | "failed" | "skipped"
    pub status: String,
    pub error: Option<String>,
}

/// Complete record of one apply run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApplyRunReport {
    pub run_id: String,
    pub started_at: String,
    pub finished_at: String,
    pub dry_run: bool,
    pub permanent_authorized: bool,
    pub max_delete: Option<u32>,
    pub total_candidates: usize,
    pub delete_success_count: usize,
    pub delete_failed_count: usize,
    pub delete_skipped_count: usize,
    pub items: Vec<ApplyItem>,
}

static RUN_SEQ: AtomicU64 = AtomicU64::new(0);

/// New run id: UTC stamp, pid, and a per-process sequence number.
/// Unique across processes (pid) and within one (sequence, since two
/// back-to-back runs can share a millisecond), and lexicographically
/// chronological.
pub fn new_run_id() -> String {
    let seq = RUN_SEQ.fetch_add(1, Ordering::Relaxed);
    format!(
        "{}-{}-{seq:04}",
        chrono::Utc::now().format("%Y%m%dT%H%M%S%3f"),
        std::process::id()
    )
}

/// Where reports for the given store live.
pub fn reports_dir(store_path: &Path) -> PathBuf {
    store_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("reports")
}

fn report_path(dir: &Path, run_id: &str) -> PathBuf {
    dir.join(format!("apply-{run_id}.json"))
}

/// Persist a report. Refuses to overwrite: reports are append-only.
pub fn persist(dir: &Path, report: &ApplyRunReport) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = report_path(dir, &report.run_id);
    if path.exists() {
        return Err(Error::internal(format!(
            "report already exists: {}",
            path.display()
        )));
    }
    let contents = serde_json::to_string_pretty(report)
        .map_err(|e| Error::internal(format!("failed to serialize report: {e}")))?;
    std::fs::write(&path, contents)?;
    tracing::info!(target: "apply", run_id = %report.run_id, path = %path.display(), "run report written");
    Ok(path)
}

/// Load one report by run id.
pub fn load(dir: &Path, run_id: &str) -> Result<ApplyRunReport> {
    let path = report_path(dir, run_id);
    if !path.exists() {
        return Err(Error::precondition(format!("no report for run {run_id}")));
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_json::from_str(&contents)
        .map_err(|e| Error::internal(format!("corrupt report {}: {e}", path.display())))
}

/// The most recent report, if any. Filenames sort chronologically, so
/// this is simply the lexicographic maximum.
pub fn last_report(dir: &Path) -> Result<Option<ApplyRunReport>> {
    if !dir.is_dir() {
        return Ok(None);
    }
    let mut latest: Option<PathBuf> = None;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with("apply-") || !name.ends_with(".json") {
            continue;
        }
        let path = entry.path();
        if latest.as_ref().is_none_or(|l| path > *l) {
            latest = Some(path);
        }
    }
    let Some(path) = latest else {
        return Ok(None);
    };
    let contents = std::fs::read_to_string(&path)?;
    let report = serde_json::from_str(&contents)
        .map_err(|e| Error::internal(format!("corrupt report {}: {e}", path.display())))?;
    Ok(Some(report))
}
