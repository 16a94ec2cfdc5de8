//! Run history persistence.
//!
//! Every completed run leaves one JSON record under `.belay/history/`,
//! named after its start timestamp so lexical order is chronological.
//! History describes finished runs only; it carries no resumable state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::Result;
use crate::runner::{CompositeResult, OverallStatus};
use crate::step::StepStatus;

/// Default number of run records to keep.
pub const DEFAULT_RETENTION: usize = 50;

/// Record of one completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Identifier derived from the start timestamp.
    pub id: String,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// Plan file the run executed.
    pub plan: PathBuf,

    /// Terminal verdict for the run.
    pub overall: OverallStatus,

    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,

    /// Per-step outcomes, in declaration order.
    pub steps: Vec<StepRecord>,
}

/// Per-step entry within a run record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub id: String,
    pub status: StepStatus,
    pub duration_ms: u64,
    pub attempts: u32,
}

impl RunRecord {
    /// Build a record from an aggregated run outcome.
    pub fn new(
        plan: impl Into<PathBuf>,
        started_at: DateTime<Utc>,
        outcome: &CompositeResult,
    ) -> Self {
        Self {
            id: started_at.format("%Y%m%dT%H%M%S%3fZ").to_string(),
            started_at,
            plan: plan.into(),
            overall: outcome.overall,
            duration_ms: outcome.duration.as_millis() as u64,
            steps: outcome
                .results
                .iter()
                .map(|r| StepRecord {
                    id: r.step_id.clone(),
                    status: r.status,
                    duration_ms: r.duration.as_millis() as u64,
                    attempts: r.attempts,
                })
                .collect(),
        }
    }

    /// File name for this record within the history directory.
    pub fn file_name(&self) -> String {
        format!("{}.json", self.id)
    }
}

/// History directory for a project root.
pub fn history_dir(root: &Path) -> PathBuf {
    root.join(".belay").join("history")
}

/// Append a run record, creating the history directory if needed.
///
/// Writes to a temp file and renames so a crash never leaves a
/// half-written record behind.
pub fn append(root: &Path, record: &RunRecord) -> Result<PathBuf> {
    let dir = history_dir(root);
    fs::create_dir_all(&dir)?;

    let path = dir.join(record.file_name());
    let content = serde_json::to_string_pretty(record)
        .map_err(|e| anyhow::anyhow!("Failed to serialize run record: {}", e))?;

    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, &content)?;
    fs::rename(&temp_path, &path)?;

    Ok(path)
}

/// Load all run records, most recent first.
///
/// A missing history directory yields an empty list. Records that no
/// longer parse are skipped with a warning.
pub fn list(root: &Path) -> Result<Vec<RunRecord>> {
    let dir = history_dir(root);
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(&dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();
    paths.reverse();

    let mut records = Vec::with_capacity(paths.len());
    for path in paths {
        let content = fs::read_to_string(&path)?;
        match serde_json::from_str::<RunRecord>(&content) {
            Ok(record) => records.push(record),
            Err(e) => warn!("Skipping unreadable run record {}: {}", path.display(), e),
        }
    }

    Ok(records)
}

/// Remove the oldest records beyond `keep`. Returns how many were removed.
pub fn prune(root: &Path, keep: usize) -> Result<usize> {
    let dir = history_dir(root);
    if !dir.exists() {
        return Ok(0);
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(&dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    if paths.len() <= keep {
        return Ok(0);
    }

    let excess = paths.len() - keep;
    for path in &paths[..excess] {
        fs::remove_file(path)?;
    }

    Ok(excess)
}
