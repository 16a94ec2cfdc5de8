//! Graph command implementation.
//!
//! The `belay graph` command prints the derived execution graph without
//! running anything.

use std::path::{Path, PathBuf};

use crate::cli::args::GraphArgs;
use crate::error::{BelayError, Result};
use crate::graph::{EdgeReason, ExecutionGraph};
use crate::plan::{find_plan, load_steps};
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};

/// The graph command implementation.
pub struct GraphCommand {
    root: PathBuf,
    plan: Option<PathBuf>,
    args: GraphArgs,
}

impl GraphCommand {
    /// Create a new graph command.
    pub fn new(root: &Path, plan: Option<PathBuf>, args: GraphArgs) -> Self {
        Self {
            root: root.to_path_buf(),
            plan,
            args,
        }
    }

    fn plan_path(&self) -> Option<PathBuf> {
        self.plan.clone().or_else(|| find_plan(&self.root))
    }

    fn show_edges(&self, graph: &ExecutionGraph, ui: &mut dyn UserInterface) {
        if graph.edges().is_empty() {
            ui.message("No ordering constraints.");
            return;
        }

        ui.message("Edges:");
        for edge in graph.edges() {
            let from = &graph.step(edge.from).id;
            let to = &graph.step(edge.to).id;
            let reason = match &edge.reason {
                EdgeReason::Explicit => "explicit".to_string(),
                EdgeReason::Conflict { kind, resource } => {
                    format!("{} on {}", kind, resource)
                }
            };
            ui.message(&format!("  {} -> {} ({})", from, to, reason));
        }
    }
}

impl Command for GraphCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let plan_path = match self.plan_path() {
            Some(path) => path,
            None => {
                ui.error("No plan found. Create belay.yml first.");
                return Ok(CommandResult::failure(2));
            }
        };

        let (_, steps) = match load_steps(&plan_path) {
            Ok(loaded) => loaded,
            Err(BelayError::PlanNotFound { path }) => {
                ui.error(&format!("Plan not found: {}", path.display()));
                return Ok(CommandResult::failure(2));
            }
            Err(e) => return Err(e),
        };

        let graph = ExecutionGraph::from_steps(steps)?;

        ui.message(&format!(
            "{} steps from {}",
            graph.len(),
            plan_path.display()
        ));

        self.show_edges(&graph, ui);

        if !self.args.edges_only {
            ui.message(&format!(
                "Order: {}",
                graph.topological_order().join(", ")
            ));
            ui.message("Batches:");
            for (index, batch) in graph.parallel_batches().iter().enumerate() {
                ui.message(&format!("  {}: {}", index + 1, batch.join(", ")));
            }
        }

        Ok(CommandResult::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::MockUI;
    use std::fs;
    use tempfile::TempDir;

    fn setup_project(plan_content: &str) -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("belay.yml"), plan_content).unwrap();
        temp
    }

    #[test]
    fn graph_shows_explicit_and_conflict_edges() {
        let plan = r#"
steps:
  - id: prepare
    kind: create_dir
    path: out
  - id: write-a
    kind: touch
    path: out/a.txt
    writes: [shared.txt]
    after: [prepare]
  - id: write-b
    kind: touch
    path: out/b.txt
    writes: [shared.txt]
    after: [prepare]
"#;
        let temp = setup_project(plan);
        let cmd = GraphCommand::new(temp.path(), None, GraphArgs::default());
        let mut ui = MockUI::new();

        let result = cmd.execute(&mut ui).unwrap();

        assert!(result.success);
        assert!(ui.has_message("prepare -> write-a (explicit)"));
        assert!(ui.has_message("write-a -> write-b (write-write on shared.txt)"));
        assert!(ui.has_message("Order: prepare, write-a, write-b"));
    }

    #[test]
    fn graph_without_constraints_says_so() {
        let plan = r#"
steps:
  - id: lone
    kind: barrier
"#;
        let temp = setup_project(plan);
        let cmd = GraphCommand::new(temp.path(), None, GraphArgs::default());
        let mut ui = MockUI::new();

        cmd.execute(&mut ui).unwrap();

        assert!(ui.has_message("No ordering constraints."));
    }

    #[test]
    fn edges_only_omits_order_and_batches() {
        let plan = r#"
steps:
  - id: first
    kind: barrier
  - id: second
    kind: barrier
    after: [first]
"#;
        let temp = setup_project(plan);
        let args = GraphArgs { edges_only: true };
        let cmd = GraphCommand::new(temp.path(), None, args);
        let mut ui = MockUI::new();

        cmd.execute(&mut ui).unwrap();

        assert!(ui.has_message("first -> second (explicit)"));
        assert!(!ui.has_message("Order:"));
    }

    #[test]
    fn graph_with_no_plan_returns_exit_2() {
        let temp = TempDir::new().unwrap();
        let cmd = GraphCommand::new(temp.path(), None, GraphArgs::default());
        let mut ui = MockUI::new();

        let result = cmd.execute(&mut ui).unwrap();

        assert_eq!(result.exit_code, 2);
    }
}
