//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Belay - Dependency-aware workflow runner.
#[derive(Debug, Parser)]
#[command(name = "belay")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to plan file (overrides default belay.yml)
    #[arg(short = 'f', long, global = true)]
    pub plan: Option<PathBuf>,

    /// Path to project root (overrides current directory)
    #[arg(short, long, global = true)]
    pub root: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Execute the plan (default if no command specified)
    Run(RunArgs),

    /// Show the derived execution graph
    Graph(GraphArgs),

    /// Print the plan file JSON schema
    Schema,

    /// Show recent run records
    History(HistoryArgs),
}

/// Arguments for the `run` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct RunArgs {
    /// Maximum steps to run in parallel (overrides plan settings)
    #[arg(long, value_name = "N")]
    pub max_parallel: Option<usize>,

    /// Run steps one at a time
    #[arg(long, conflicts_with = "max_parallel")]
    pub sequential: bool,

    /// Show the execution plan without running anything
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `graph` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct GraphArgs {
    /// Show only the derived edges
    #[arg(long)]
    pub edges_only: bool,
}

/// Arguments for the `history` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct HistoryArgs {
    /// Number of runs to show
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_invocation_as_no_command() {
        let cli = Cli::try_parse_from(["belay"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.quiet);
    }

    #[test]
    fn parses_run_with_overrides() {
        let cli = Cli::try_parse_from(["belay", "run", "--max-parallel", "8", "--dry-run"]).unwrap();
        match cli.command {
            Some(Commands::Run(args)) => {
                assert_eq!(args.max_parallel, Some(8));
                assert!(args.dry_run);
                assert!(!args.sequential);
            }
            other => panic!("expected run command, got {:?}", other),
        }
    }

    #[test]
    fn sequential_conflicts_with_max_parallel() {
        let result = Cli::try_parse_from(["belay", "run", "--sequential", "--max-parallel", "2"]);
        assert!(result.is_err());
    }

    #[test]
    fn global_flags_apply_after_subcommand() {
        let cli = Cli::try_parse_from(["belay", "run", "--root", "/tmp/project", "--quiet"]).unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("/tmp/project")));
        assert!(cli.quiet);
    }

    #[test]
    fn history_limit_parses() {
        let cli = Cli::try_parse_from(["belay", "history", "--limit", "5"]).unwrap();
        match cli.command {
            Some(Commands::History(args)) => assert_eq!(args.limit, Some(5)),
            other => panic!("expected history command, got {:?}", other),
        }
    }
}
