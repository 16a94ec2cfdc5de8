//! Per-step outcome types.
//!
//! A [`StepResult`] is the record one worker produces for one step. Results
//! are data, not control flow: a failing step is recorded here and never
//! raised as an error past the scheduler.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Terminal status of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Step ran and succeeded.
    Succeeded,

    /// Step ran (possibly several attempts) and failed.
    Failed,

    /// Step's predicate did not hold; the operation never ran.
    Skipped,

    /// An upstream strict failure meant the step was never dispatched.
    Cancelled,
}

impl StepStatus {
    /// Get a display character for this status.
    pub fn display_char(&self) -> char {
        match self {
            StepStatus::Succeeded => '✓',
            StepStatus::Failed => '✗',
            StepStatus::Skipped => '⊘',
            StepStatus::Cancelled => '○',
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StepStatus::Succeeded => "succeeded",
            StepStatus::Failed => "failed",
            StepStatus::Skipped => "skipped",
            StepStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// Kind-specific detail carried by a step outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeDetail {
    /// Command kinds: exit status and captured output.
    Command {
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// File kinds: the paths the operation touched.
    Files { paths: Vec<PathBuf> },

    /// Free-form note (skip reasons, barrier steps).
    Note { message: String },

    /// Nothing to report.
    None,
}

/// Result of one step's execution (or non-execution).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// Step id.
    pub step_id: String,

    /// Terminal status.
    pub status: StepStatus,

    /// Kind-specific detail.
    pub detail: OutcomeDetail,

    /// Error message, present iff the step failed.
    pub error: Option<String>,

    /// Number of tries made. At least 1 for any step that reached a worker;
    /// 0 for cancelled steps, which never did.
    pub attempts: u32,

    /// Wall-clock time spent on the step, across all attempts.
    pub duration: Duration,

    /// Whether the step's failure was tolerated by policy. Copied from the
    /// step so aggregation is a pure function of the outcomes alone.
    pub allow_failure: bool,
}

impl StepResult {
    /// Create a success result.
    pub fn succeeded(
        step_id: &str,
        detail: OutcomeDetail,
        attempts: u32,
        duration: Duration,
    ) -> Self {
        Self {
            step_id: step_id.to_string(),
            status: StepStatus::Succeeded,
            detail,
            error: None,
            attempts,
            duration,
            allow_failure: false,
        }
    }

    /// Create a failure result.
    pub fn failed(
        step_id: &str,
        detail: OutcomeDetail,
        error: String,
        attempts: u32,
        duration: Duration,
    ) -> Self {
        Self {
            step_id: step_id.to_string(),
            status: StepStatus::Failed,
            detail,
            error: Some(error),
            attempts,
            duration,
            allow_failure: false,
        }
    }

    /// Create a skipped result (predicate did not hold).
    pub fn skipped(step_id: &str, reason: impl Into<String>) -> Self {
        Self {
            step_id: step_id.to_string(),
            status: StepStatus::Skipped,
            detail: OutcomeDetail::Note {
                message: reason.into(),
            },
            error: None,
            attempts: 1,
            duration: Duration::ZERO,
            allow_failure: false,
        }
    }

    /// Create a cancelled result (upstream strict failure).
    pub fn cancelled(step_id: &str) -> Self {
        Self {
            step_id: step_id.to_string(),
            status: StepStatus::Cancelled,
            detail: OutcomeDetail::None,
            error: None,
            attempts: 0,
            duration: Duration::ZERO,
            allow_failure: false,
        }
    }

    /// A failure that policy does not tolerate.
    pub fn is_fatal(&self) -> bool {
        self.status == StepStatus::Failed && !self.allow_failure
    }

    /// Whether a dependent of this step may still run.
    pub fn unblocks_dependents(&self) -> bool {
        match self.status {
            StepStatus::Succeeded | StepStatus::Skipped => true,
            StepStatus::Failed => self.allow_failure,
            StepStatus::Cancelled => false,
        }
    }

    /// Generate a summary line for display.
    pub fn summary_line(&self) -> String {
        let glyph = self.status.display_char();
        match self.status {
            StepStatus::Succeeded => {
                if self.attempts > 1 {
                    format!(
                        "{} {} ({}, attempt {})",
                        glyph,
                        self.step_id,
                        format_duration(self.duration),
                        self.attempts
                    )
                } else {
                    format!(
                        "{} {} ({})",
                        glyph,
                        self.step_id,
                        format_duration(self.duration)
                    )
                }
            }
            StepStatus::Failed => {
                let error = self.error.as_deref().unwrap_or("unknown error");
                format!("{} {} - {}", glyph, self.step_id, error)
            }
            StepStatus::Skipped => match &self.detail {
                OutcomeDetail::Note { message } => {
                    format!("{} {} (skipped: {})", glyph, self.step_id, message)
                }
                _ => format!("{} {} (skipped)", glyph, self.step_id),
            },
            StepStatus::Cancelled => format!("{} {} (cancelled)", glyph, self.step_id),
        }
    }
}

/// Render a duration the way the summary table shows it.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if secs == 0 {
        format!("{}ms", millis)
    } else if secs < 60 {
        format!("{}.{}s", secs, millis / 100)
    } else {
        let mins = secs / 60;
        let secs = secs % 60;
        format!("{}m {}s", mins, secs)
    }
}
