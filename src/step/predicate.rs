//! Dispatch-time guards.
//!
//! A predicate is evaluated by the worker immediately before a step's driver
//! call. A predicate that holds lets the step run; one that does not marks
//! the step Skipped without touching the driver. A predicate that cannot be
//! evaluated at all (unreadable path, unspawnable check command) is a broken
//! guard, and the step is treated as Failed rather than silently skipped.

use std::io::ErrorKind;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::shell::execute_check;

/// Boolean guard over runtime filesystem/environment state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Predicate {
    /// Holds when a file or directory exists.
    PathExists { path: String },

    /// Holds when a path does not exist.
    PathMissing { path: String },

    /// Holds when an environment variable is set and non-empty.
    EnvSet { name: String },

    /// Holds when a command exits with status 0.
    CommandSucceeds { command: String },

    /// Holds when every inner predicate holds.
    All { predicates: Vec<Predicate> },

    /// Holds when at least one inner predicate holds.
    Any { predicates: Vec<Predicate> },
}

/// Result of evaluating a predicate, with a user-visible description.
///
/// The description shows up in skip messages and the run summary
/// (e.g. "skipped (path missing: build/)").
#[derive(Debug, Clone)]
pub struct PredicateOutcome {
    /// Whether the predicate holds.
    pub holds: bool,

    /// Description of what was checked.
    pub description: String,
}

impl PredicateOutcome {
    fn holds(description: impl Into<String>) -> Self {
        Self {
            holds: true,
            description: description.into(),
        }
    }

    fn fails(description: impl Into<String>) -> Self {
        Self {
            holds: false,
            description: description.into(),
        }
    }
}

impl Predicate {
    /// Evaluate against the filesystem/environment, relative paths resolved
    /// under `root`. Read-only; the only side effect is running the check
    /// command of [`Predicate::CommandSucceeds`].
    pub fn evaluate(&self, root: &Path) -> Result<PredicateOutcome> {
        match self {
            Predicate::PathExists { path } => {
                let exists = probe_path(path, root)?;
                Ok(if exists {
                    PredicateOutcome::holds(format!("path exists: {path}"))
                } else {
                    PredicateOutcome::fails(format!("path missing: {path}"))
                })
            }
            Predicate::PathMissing { path } => {
                let exists = probe_path(path, root)?;
                Ok(if exists {
                    PredicateOutcome::fails(format!("path exists: {path}"))
                } else {
                    PredicateOutcome::holds(format!("path missing: {path}"))
                })
            }
            Predicate::EnvSet { name } => {
                let set = std::env::var_os(name).is_some_and(|v| !v.is_empty());
                Ok(if set {
                    PredicateOutcome::holds(format!("env set: {name}"))
                } else {
                    PredicateOutcome::fails(format!("env unset: {name}"))
                })
            }
            Predicate::CommandSucceeds { command } => {
                let ok = execute_check(command, Some(root))?;
                Ok(if ok {
                    PredicateOutcome::holds(format!("command succeeded: {}", truncate(command, 50)))
                } else {
                    PredicateOutcome::fails(format!("command failed: {}", truncate(command, 50)))
                })
            }
            Predicate::All { predicates } => {
                for predicate in predicates {
                    let outcome = predicate.evaluate(root)?;
                    if !outcome.holds {
                        return Ok(PredicateOutcome::fails(outcome.description));
                    }
                }
                Ok(PredicateOutcome::holds(format!(
                    "all {} predicates hold",
                    predicates.len()
                )))
            }
            Predicate::Any { predicates } => {
                for predicate in predicates {
                    let outcome = predicate.evaluate(root)?;
                    if outcome.holds {
                        return Ok(PredicateOutcome::holds(outcome.description));
                    }
                }
                Ok(PredicateOutcome::fails(format!(
                    "none of {} predicates hold",
                    predicates.len()
                )))
            }
        }
    }
}

/// Existence probe that distinguishes "not there" from "cannot tell".
fn probe_path(path: &str, root: &Path) -> Result<bool> {
    let full = if Path::new(path).is_absolute() {
        Path::new(path).to_path_buf()
    } else {
        root.join(path)
    };
    match std::fs::symlink_metadata(&full) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len - 3])
    }
}
