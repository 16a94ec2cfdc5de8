//! Command dispatching.
//!
//! This module provides the core command infrastructure:
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`CommandDispatcher`] for routing CLI subcommands

use std::path::{Path, PathBuf};

use crate::cli::args::{Cli, Commands};
use crate::error::Result;
use crate::ui::UserInterface;

/// Trait for command implementations.
///
/// Each CLI subcommand implements this trait to provide its execution logic.
pub trait Command {
    /// Execute the command.
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    /// Whether the command succeeded.
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    /// Create a failure result.
    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    root: PathBuf,
    plan: Option<PathBuf>,
}

impl CommandDispatcher {
    /// Create a new dispatcher for the given project root.
    pub fn new(root: PathBuf, plan: Option<PathBuf>) -> Self {
        Self { root, plan }
    }

    /// Get the project root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Dispatch and execute a command.
    pub fn dispatch(&self, cli: &Cli, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        match &cli.command {
            Some(Commands::Run(args)) => {
                let cmd = super::run::RunCommand::new(&self.root, self.plan.clone(), args.clone());
                cmd.execute(ui)
            }
            Some(Commands::Graph(args)) => {
                let cmd =
                    super::graph::GraphCommand::new(&self.root, self.plan.clone(), args.clone());
                cmd.execute(ui)
            }
            Some(Commands::Schema) => {
                let cmd = super::schema::SchemaCommand::new();
                cmd.execute(ui)
            }
            Some(Commands::History(args)) => {
                let cmd = super::history::HistoryCommand::new(&self.root, args.clone());
                cmd.execute(ui)
            }
            None => {
                // Default to run with default args
                let cmd = super::run::RunCommand::new(
                    &self.root,
                    self.plan.clone(),
                    crate::cli::args::RunArgs::default(),
                );
                cmd.execute(ui)
            }
        }
    }
}
