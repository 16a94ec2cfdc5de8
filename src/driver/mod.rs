//! The boundary between the scheduler and the operations it runs.
//!
//! The scheduler never performs work itself; it hands each step to a
//! [`Driver`] and records the outcome. [`LocalDriver`] is the production
//! implementation; tests substitute scripted drivers.

pub mod local;

use async_trait::async_trait;

use crate::step::{OutcomeDetail, Step};

pub use local::LocalDriver;

/// What one driver call produced.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Whether the operation succeeded.
    pub success: bool,

    /// Kind-specific detail (exit status and output for command kinds,
    /// touched paths for file kinds).
    pub detail: OutcomeDetail,

    /// Error message, present iff the operation failed.
    pub error: Option<String>,
}

impl StepOutcome {
    /// Create a success outcome.
    pub fn success(detail: OutcomeDetail) -> Self {
        Self {
            success: true,
            detail,
            error: None,
        }
    }

    /// Create a failure outcome.
    pub fn failure(detail: OutcomeDetail, error: impl Into<String>) -> Self {
        Self {
            success: false,
            detail,
            error: Some(error.into()),
        }
    }
}

/// Performs one step's operation.
///
/// Called once per attempt. Implementations must tolerate concurrent calls
/// for different steps; a non-thread-safe backend has to serialize
/// internally. A driver reports failure through the outcome and never
/// panics on bad input.
#[async_trait]
pub trait Driver: Send + Sync {
    async fn perform(&self, step: &Step) -> StepOutcome;
}
