//! The step model: units of work, guards, and per-step outcomes.
//!
//! - [`Step`] - one declared unit of work with its resource footprint and
//!   failure/retry policies
//! - [`StepKind`] - the closed set of operation kinds
//! - [`Predicate`] - dispatch-time guard evaluated just before a step runs
//! - [`StepResult`] / [`StepStatus`] - the outcome record one worker produces
//!
//! # Example
//!
//! ```
//! use belay::step::{Step, StepKind};
//! use std::path::PathBuf;
//!
//! let step = Step::new(
//!     "copy-input",
//!     StepKind::Copy {
//!         from: PathBuf::from("cases/1.in"),
//!         to: PathBuf::from("work/1.in"),
//!     },
//! )
//! .after(["prepare-workdir"]);
//!
//! // The kind implies the resource footprint used for conflict analysis.
//! assert!(step.reads.contains("cases/1.in"));
//! assert!(step.writes.contains("work/1.in"));
//! ```

pub mod model;
pub mod predicate;
pub mod result;

pub use model::{RetryPolicy, Step, StepKind};
pub use predicate::{Predicate, PredicateOutcome};
pub use result::{format_duration, OutcomeDetail, StepResult, StepStatus};
