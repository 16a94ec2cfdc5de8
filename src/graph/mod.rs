//! Dependency graph construction.
//!
//! [`conflict`] derives precedence from overlapping resource footprints;
//! [`build`] merges those edges with explicit `after` declarations into a
//! validated [`ExecutionGraph`].

pub mod build;
pub mod conflict;

pub use build::{Edge, EdgeReason, ExecutionGraph};
pub use conflict::{analyze, ConflictEdge, ConflictKind};
