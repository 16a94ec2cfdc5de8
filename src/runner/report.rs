//! Run-level result aggregation.
//!
//! [`aggregate`] is a pure merge over per-step outcomes: no I/O, no clock,
//! same input always yields byte-identical serialized output.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::step::{format_duration, StepResult, StepStatus};

/// Terminal verdict for a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    /// Every step succeeded or was skipped.
    Succeeded,
    /// The only failures were tolerated by `allow_failure`.
    PartialFailure,
    /// At least one strict failure occurred.
    Failed,
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OverallStatus::Succeeded => "succeeded",
            OverallStatus::PartialFailure => "partial failure",
            OverallStatus::Failed => "failed",
        };
        write!(f, "{}", label)
    }
}

/// Immutable merge of every step's terminal result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeResult {
    /// Per-step results in declaration order.
    pub results: Vec<StepResult>,
    pub overall: OverallStatus,
    /// Lowest-declaration-index strict failure, if any.
    pub first_fatal_step_id: Option<String>,
    /// Wall-clock duration of the run.
    pub duration: Duration,
}

impl CompositeResult {
    pub fn succeeded(&self) -> bool {
        self.overall == OverallStatus::Succeeded
    }

    /// Number of results with the given status.
    pub fn count(&self, status: StepStatus) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == status)
            .count()
    }

    /// One-line run summary for display.
    pub fn summary_line(&self) -> String {
        let mut parts = Vec::new();
        for status in [
            StepStatus::Succeeded,
            StepStatus::Failed,
            StepStatus::Skipped,
            StepStatus::Cancelled,
        ] {
            let n = self.count(status);
            if n > 0 {
                parts.push(format!("{} {}", n, status));
            }
        }
        if parts.is_empty() {
            parts.push("no steps".to_string());
        }
        format!(
            "{} in {}",
            parts.join(", "),
            format_duration(self.duration)
        )
    }
}

/// Merge per-step outcomes into a [`CompositeResult`].
///
/// `results` must be in declaration order; the scheduler produces them that
/// way by filling one slot per node. An empty run is vacuously `Succeeded`.
pub fn aggregate(results: Vec<StepResult>, duration: Duration) -> CompositeResult {
    let first_fatal_step_id = results
        .iter()
        .find(|r| r.is_fatal())
        .map(|r| r.step_id.clone());

    let overall = if first_fatal_step_id.is_some() {
        OverallStatus::Failed
    } else if results
        .iter()
        .any(|r| r.status == StepStatus::Failed && r.allow_failure)
    {
        OverallStatus::PartialFailure
    } else {
        OverallStatus::Succeeded
    };

    CompositeResult {
        results,
        overall,
        first_fatal_step_id,
        duration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::OutcomeDetail;

    fn ok(id: &str) -> StepResult {
        StepResult::succeeded(id, OutcomeDetail::None, 1, Duration::from_millis(10))
    }

    fn fail(id: &str) -> StepResult {
        StepResult::failed(
            id,
            OutcomeDetail::None,
            "boom".to_string(),
            1,
            Duration::from_millis(10),
        )
    }

    fn tolerated_fail(id: &str) -> StepResult {
        let mut result = fail(id);
        result.allow_failure = true;
        result
    }

    #[test]
    fn all_success_is_succeeded() {
        let composite = aggregate(vec![ok("a"), ok("b")], Duration::from_secs(1));
        assert_eq!(composite.overall, OverallStatus::Succeeded);
        assert!(composite.succeeded());
        assert_eq!(composite.first_fatal_step_id, None);
    }

    #[test]
    fn empty_run_is_succeeded() {
        let composite = aggregate(vec![], Duration::ZERO);
        assert_eq!(composite.overall, OverallStatus::Succeeded);
        assert!(composite.results.is_empty());
    }

    #[test]
    fn strict_failure_is_failed() {
        let composite = aggregate(vec![ok("a"), fail("b")], Duration::ZERO);
        assert_eq!(composite.overall, OverallStatus::Failed);
        assert_eq!(composite.first_fatal_step_id.as_deref(), Some("b"));
    }

    #[test]
    fn first_fatal_is_lowest_declaration_index() {
        let composite = aggregate(vec![ok("a"), fail("b"), fail("c")], Duration::ZERO);
        assert_eq!(composite.first_fatal_step_id.as_deref(), Some("b"));
    }

    #[test]
    fn tolerated_failures_alone_are_partial() {
        let composite = aggregate(vec![ok("a"), tolerated_fail("b")], Duration::ZERO);
        assert_eq!(composite.overall, OverallStatus::PartialFailure);
        assert_eq!(composite.first_fatal_step_id, None);
    }

    #[test]
    fn strict_failure_outranks_tolerated_ones() {
        let composite = aggregate(
            vec![tolerated_fail("a"), fail("b"), tolerated_fail("c")],
            Duration::ZERO,
        );
        assert_eq!(composite.overall, OverallStatus::Failed);
        assert_eq!(composite.first_fatal_step_id.as_deref(), Some("b"));
    }

    #[test]
    fn skips_do_not_affect_overall() {
        let composite = aggregate(
            vec![ok("a"), StepResult::skipped("b", "guard not met")],
            Duration::ZERO,
        );
        assert_eq!(composite.overall, OverallStatus::Succeeded);
    }

    #[test]
    fn cancelled_steps_accompany_a_failed_run() {
        let composite = aggregate(
            vec![fail("a"), StepResult::cancelled("b")],
            Duration::ZERO,
        );
        assert_eq!(composite.overall, OverallStatus::Failed);
        assert_eq!(composite.count(StepStatus::Cancelled), 1);
    }

    #[test]
    fn aggregate_is_idempotent() {
        let results = vec![ok("a"), tolerated_fail("b"), StepResult::cancelled("c")];
        let first = aggregate(results.clone(), Duration::from_millis(1500));
        let second = aggregate(results, Duration::from_millis(1500));

        assert_eq!(first, second);
        let first_json = serde_json::to_string(&first).unwrap();
        let second_json = serde_json::to_string(&second).unwrap();
        assert_eq!(first_json, second_json);
    }

    #[test]
    fn summary_line_counts_statuses() {
        let composite = aggregate(
            vec![ok("a"), ok("b"), fail("c"), StepResult::cancelled("d")],
            Duration::from_millis(1500),
        );
        let line = composite.summary_line();
        assert!(line.contains("2 succeeded"));
        assert!(line.contains("1 failed"));
        assert!(line.contains("1 cancelled"));
        assert!(line.contains("1.5s"));
    }

    #[test]
    fn summary_line_for_empty_run() {
        let composite = aggregate(vec![], Duration::ZERO);
        assert!(composite.summary_line().contains("no steps"));
    }
}
