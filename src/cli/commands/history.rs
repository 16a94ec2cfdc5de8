//! History command implementation.
//!
//! The `belay history` command lists recent run records.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::args::HistoryArgs;
use crate::error::Result;
use crate::history;
use crate::step::format_duration;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};

/// Default number of runs shown without `--limit`.
const DEFAULT_LIMIT: usize = 10;

/// The history command implementation.
pub struct HistoryCommand {
    root: PathBuf,
    args: HistoryArgs,
}

impl HistoryCommand {
    /// Create a new history command.
    pub fn new(root: &Path, args: HistoryArgs) -> Self {
        Self {
            root: root.to_path_buf(),
            args,
        }
    }
}

impl Command for HistoryCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let records = history::list(&self.root)?;

        if records.is_empty() {
            ui.message("No runs recorded yet.");
            return Ok(CommandResult::success());
        }

        let limit = self.args.limit.unwrap_or(DEFAULT_LIMIT);
        for record in records.iter().take(limit) {
            let duration = format_duration(Duration::from_millis(record.duration_ms));
            let step_label = if record.steps.len() == 1 {
                "step"
            } else {
                "steps"
            };
            ui.message(&format!(
                "{}  {:<15}  {} ({} {}, {})",
                record.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
                record.overall.to_string(),
                record.plan.display(),
                record.steps.len(),
                step_label,
                duration
            ));
        }

        Ok(CommandResult::success())
    }
}
