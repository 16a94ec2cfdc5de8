//! Bounded concurrent execution of an [`ExecutionGraph`].
//!
//! One scheduler loop owns all node state; workers only run their own step
//! and report back through the join set, so no two tasks ever race on a
//! node. Cancellation is cooperative: running steps always finish, only
//! never-started nodes are cancelled.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::driver::Driver;
use crate::graph::ExecutionGraph;
use crate::runner::report::{aggregate, CompositeResult};
use crate::step::{format_duration, OutcomeDetail, RetryPolicy, Step, StepResult};

/// What happens to the rest of the graph when a step fails strictly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    /// Cancel only the failed step's transitive dependents; independent
    /// branches keep running.
    #[default]
    CancelDependents,

    /// Cancel every not-yet-started node on the first strict failure.
    AbortAll,
}

/// Knobs for a single run.
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Upper bound on simultaneously running steps. Minimum 1; 1 degenerates
    /// to sequential execution.
    pub max_parallelism: usize,

    /// Run-wide default retry policy; a step's own policy wins.
    pub default_retry: RetryPolicy,

    pub failure_mode: FailureMode,

    /// Directory predicate paths resolve against.
    pub root: PathBuf,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            max_parallelism: 4,
            default_retry: RetryPolicy::default(),
            failure_mode: FailureMode::default(),
            root: PathBuf::from("."),
        }
    }
}

/// Run every step of the graph, honoring precedence edges, the parallelism
/// bound, and the failure mode. Always returns a complete result; step
/// failures are data in it, not errors.
pub async fn execute(
    graph: &ExecutionGraph,
    driver: Arc<dyn Driver>,
    options: &ExecuteOptions,
) -> CompositeResult {
    let start = Instant::now();
    let node_count = graph.len();
    let max_parallel = options.max_parallelism.max(1);

    let mut in_degree: Vec<usize> = (0..node_count)
        .map(|idx| graph.dependencies_of(idx).len())
        .collect();
    let mut results: Vec<Option<StepResult>> = vec![None; node_count];
    let mut ready: BTreeSet<usize> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &deg)| deg == 0)
        .map(|(idx, _)| idx)
        .collect();
    let mut in_flight: BTreeSet<usize> = BTreeSet::new();
    let mut tasks: JoinSet<(usize, StepResult)> = JoinSet::new();

    loop {
        // Dispatch in declaration order while a slot is free.
        while tasks.len() < max_parallel {
            let Some(&idx) = ready.iter().next() else { break };
            ready.remove(&idx);
            in_flight.insert(idx);

            let step = graph.step(idx).clone();
            let driver = Arc::clone(&driver);
            let retry = step.retry.unwrap_or(options.default_retry);
            let root = options.root.clone();
            debug!("Dispatching step '{}' ({})", step.id, step.kind.label());
            tasks.spawn(async move { (idx, run_step(step, driver, retry, root).await) });
        }

        let Some(joined) = tasks.join_next().await else {
            // Nothing running and nothing ready; the run has quiesced.
            break;
        };
        let (idx, result) = match joined {
            Ok(completed) => completed,
            Err(err) => {
                warn!("Worker task failed: {}", err);
                continue;
            }
        };
        in_flight.remove(&idx);
        debug!(
            "Step '{}' finished: {} in {}",
            result.step_id,
            result.status,
            format_duration(result.duration)
        );

        let fatal = result.is_fatal();
        let unblocks = result.unblocks_dependents();
        results[idx] = Some(result);

        if fatal {
            match options.failure_mode {
                FailureMode::AbortAll => {
                    for node in 0..node_count {
                        if results[node].is_none() && !in_flight.contains(&node) {
                            results[node] = Some(StepResult::cancelled(&graph.step(node).id));
                        }
                    }
                    ready.clear();
                }
                FailureMode::CancelDependents => {
                    for node in graph.transitive_dependents(idx) {
                        if results[node].is_none() && !in_flight.contains(&node) {
                            results[node] = Some(StepResult::cancelled(&graph.step(node).id));
                            ready.remove(&node);
                        }
                    }
                }
            }
        } else if unblocks {
            for &dep in graph.dependents_of(idx) {
                if results[dep].is_some() {
                    continue;
                }
                in_degree[dep] -= 1;
                if in_degree[dep] == 0 {
                    ready.insert(dep);
                }
            }
        }
    }

    // Any slot still empty at quiesce belonged to a node whose predecessors
    // never unblocked it.
    let results: Vec<StepResult> = results
        .into_iter()
        .enumerate()
        .map(|(idx, slot)| slot.unwrap_or_else(|| StepResult::cancelled(&graph.step(idx).id)))
        .collect();

    aggregate(results, start.elapsed())
}

/// One worker: evaluate the guard, then drive the step through its attempts.
/// Dependents only ever see the final state; retries are internal.
async fn run_step(
    step: Step,
    driver: Arc<dyn Driver>,
    retry: RetryPolicy,
    root: PathBuf,
) -> StepResult {
    let start = Instant::now();

    if let Some(predicate) = step.predicate.clone() {
        let eval_root = root.clone();
        let evaluated =
            tokio::task::spawn_blocking(move || predicate.evaluate(&eval_root)).await;
        match evaluated {
            Ok(Ok(outcome)) if !outcome.holds => {
                debug!("Step '{}' skipped: {}", step.id, outcome.description);
                let mut result = StepResult::skipped(&step.id, outcome.description);
                result.duration = start.elapsed();
                result.allow_failure = step.allow_failure;
                return result;
            }
            Ok(Ok(_)) => {}
            Ok(Err(err)) => {
                warn!("Step '{}' predicate errored: {}", step.id, err);
                let mut result = StepResult::failed(
                    &step.id,
                    OutcomeDetail::None,
                    format!("predicate evaluation failed: {}", err),
                    1,
                    start.elapsed(),
                );
                result.allow_failure = step.allow_failure;
                return result;
            }
            Err(err) => {
                let mut result = StepResult::failed(
                    &step.id,
                    OutcomeDetail::None,
                    format!("predicate task failed: {}", err),
                    1,
                    start.elapsed(),
                );
                result.allow_failure = step.allow_failure;
                return result;
            }
        }
    }

    let max_attempts = retry.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        let outcome = driver.perform(&step).await;
        if outcome.success {
            let mut result =
                StepResult::succeeded(&step.id, outcome.detail, attempt, start.elapsed());
            result.allow_failure = step.allow_failure;
            return result;
        }

        let error = outcome
            .error
            .unwrap_or_else(|| "step failed without detail".to_string());
        if attempt >= max_attempts {
            warn!("Step '{}' failed after {} attempt(s): {}", step.id, attempt, error);
            let mut result =
                StepResult::failed(&step.id, outcome.detail, error, attempt, start.elapsed());
            result.allow_failure = step.allow_failure;
            return result;
        }

        let delay = retry.delay_before_retry(attempt);
        warn!(
            "Step '{}' attempt {} failed ({}), retrying in {}",
            step.id,
            attempt,
            error,
            format_duration(delay)
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        attempt += 1;
    }
}
