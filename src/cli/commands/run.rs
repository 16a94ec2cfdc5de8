//! Run command implementation.
//!
//! The `belay run` command executes the plan.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;

use crate::cli::args::RunArgs;
use crate::driver::{Driver, LocalDriver};
use crate::error::{BelayError, Result};
use crate::graph::ExecutionGraph;
use crate::history::{self, RunRecord};
use crate::plan::{find_plan, load_steps, PlanSettings};
use crate::runner::{execute, CompositeResult, ExecuteOptions, OverallStatus};
use crate::step::{format_duration, OutcomeDetail, StepStatus};
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};

/// The run command implementation.
pub struct RunCommand {
    root: PathBuf,
    plan: Option<PathBuf>,
    args: RunArgs,
}

impl RunCommand {
    /// Create a new run command.
    pub fn new(root: &Path, plan: Option<PathBuf>, args: RunArgs) -> Self {
        Self {
            root: root.to_path_buf(),
            plan,
            args,
        }
    }

    /// Get the project root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve the plan path from the override or the default locations.
    fn plan_path(&self) -> Option<PathBuf> {
        self.plan.clone().or_else(|| find_plan(&self.root))
    }

    /// Build execution options from plan settings and CLI overrides.
    fn build_options(&self, settings: &PlanSettings) -> ExecuteOptions {
        let max_parallelism = if self.args.sequential {
            1
        } else {
            self.args.max_parallel.unwrap_or(settings.max_parallel)
        };

        ExecuteOptions {
            max_parallelism,
            default_retry: settings.retry_policy(),
            failure_mode: settings.failure_mode(),
            root: self.root.clone(),
        }
    }

    /// Print the execution plan without running it.
    fn show_plan(&self, graph: &ExecutionGraph, ui: &mut dyn UserInterface) {
        ui.message(&format!(
            "Order: {}",
            graph.topological_order().join(", ")
        ));
        ui.message("Batches:");
        for (index, batch) in graph.parallel_batches().iter().enumerate() {
            ui.message(&format!("  {}: {}", index + 1, batch.join(", ")));
        }
    }

    /// Print per-step outcome lines.
    fn show_results(&self, outcome: &CompositeResult, ui: &mut dyn UserInterface) {
        for result in &outcome.results {
            let duration = format_duration(result.duration);
            match result.status {
                StepStatus::Succeeded => {
                    ui.success(&format!("{} ({})", result.step_id, duration));
                }
                StepStatus::Failed => {
                    let reason = result.error.as_deref().unwrap_or("unknown failure");
                    if result.allow_failure {
                        ui.warning(&format!(
                            "{} failed ({}, allowed): {}",
                            result.step_id, duration, reason
                        ));
                    } else {
                        ui.error(&format!(
                            "{} failed ({}): {}",
                            result.step_id, duration, reason
                        ));
                    }
                    if let OutcomeDetail::Command { stderr, .. } = &result.detail {
                        for line in stderr.trim_end().lines() {
                            ui.message(&format!("    {}", line));
                        }
                    }
                }
                StepStatus::Skipped => {
                    ui.skipped(&format!("{} skipped", result.step_id));
                }
                StepStatus::Cancelled => {
                    ui.skipped(&format!("{} cancelled", result.step_id));
                }
            }
        }
    }
}

impl Command for RunCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let plan_path = match self.plan_path() {
            Some(path) => path,
            None => {
                ui.error("No plan found. Create belay.yml first.");
                return Ok(CommandResult::failure(2));
            }
        };

        let (config, steps) = match load_steps(&plan_path) {
            Ok(loaded) => loaded,
            Err(BelayError::PlanNotFound { path }) => {
                ui.error(&format!("Plan not found: {}", path.display()));
                return Ok(CommandResult::failure(2));
            }
            Err(e) => return Err(e),
        };

        let graph = ExecutionGraph::from_steps(steps)?;

        ui.show_header(&format!("Running {}", plan_path.display()));

        if self.args.dry_run {
            ui.message("Dry run - no steps will be executed");
            self.show_plan(&graph, ui);
            return Ok(CommandResult::success());
        }

        let options = self.build_options(&config.settings);
        let driver: Arc<dyn Driver> = Arc::new(LocalDriver::new(&self.root));

        let started_at = Utc::now();
        let runtime = tokio::runtime::Runtime::new()?;
        let outcome = runtime.block_on(execute(&graph, driver, &options));

        if ui.output_mode().shows_detail() {
            self.show_results(&outcome, ui);
        }

        let record = RunRecord::new(&plan_path, started_at, &outcome);
        history::append(&self.root, &record)?;
        history::prune(&self.root, history::DEFAULT_RETENTION)?;

        match outcome.overall {
            OverallStatus::Succeeded => {
                ui.success(&outcome.summary_line());
                Ok(CommandResult::success())
            }
            OverallStatus::PartialFailure => {
                ui.warning(&format!("Run partially failed: {}", outcome.summary_line()));
                Ok(CommandResult::failure(1))
            }
            OverallStatus::Failed => {
                let fatal = outcome.first_fatal_step_id.as_deref().unwrap_or("unknown");
                ui.error(&format!(
                    "Run failed at '{}': {}",
                    fatal,
                    outcome.summary_line()
                ));
                Ok(CommandResult::failure(1))
            }
        }
    }
}
