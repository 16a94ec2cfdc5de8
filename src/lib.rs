//! Belay - Dependency-aware workflow runner.
//!
//! Belay executes declarative YAML plans: a flat list of steps with
//! explicit ordering, declared resource footprints, and per-step policies.
//! Steps whose footprints overlap are serialized automatically; everything
//! else runs in parallel up to a configured bound.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`driver`] - Step execution boundary (filesystem, processes, HTTP)
//! - [`error`] - Error types and result aliases
//! - [`graph`] - Conflict analysis and execution graph construction
//! - [`history`] - Run record persistence
//! - [`plan`] - Plan file schema, discovery, and resolution
//! - [`runner`] - Concurrent scheduling and result aggregation
//! - [`shell`] - Shell command execution
//! - [`step`] - Step model, predicates, and results
//! - [`ui`] - Terminal output
//!
//! # Example
//!
//! ```
//! use belay::graph::ExecutionGraph;
//! use belay::step::{Step, StepKind};
//!
//! let steps = vec![
//!     Step::new("prepare", StepKind::CreateDir { path: "out".into() }),
//!     Step::new("done", StepKind::Barrier).after(["prepare"]),
//! ];
//! let graph = ExecutionGraph::from_steps(steps).unwrap();
//! assert_eq!(graph.topological_order(), vec!["prepare", "done"]);
//! ```

pub mod cli;
pub mod driver;
pub mod error;
pub mod graph;
pub mod history;
pub mod plan;
pub mod runner;
pub mod shell;
pub mod step;
pub mod ui;

pub use error::{BelayError, Result};
