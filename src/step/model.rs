//! The step model: one immutable unit of work handed to the engine.
//!
//! A [`Step`] pairs an operation kind (with its fully-expanded payload) with
//! the scheduling metadata the engine cares about: declared resource
//! footprints, explicit ordering hints, a dispatch-time guard, and the
//! failure/retry policy. The engine never interprets the payload itself;
//! that is the driver's job.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::time::Duration;

use crate::step::Predicate;

/// Operation kind together with its kind-specific payload.
///
/// The set of kinds is closed: adding a new operation means adding a variant
/// here and teaching the driver about it, not probing attributes at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum StepKind {
    /// Create a directory (parents included).
    CreateDir { path: PathBuf },

    /// Remove a directory and everything under it.
    RemoveDir { path: PathBuf },

    /// Copy a file.
    Copy { from: PathBuf, to: PathBuf },

    /// Move (rename) a file, falling back to copy+remove across devices.
    Move { from: PathBuf, to: PathBuf },

    /// Remove a single file.
    Remove { path: PathBuf },

    /// Create an empty file, or update its mtime if it exists.
    Touch { path: PathBuf },

    /// Run a command through the platform shell.
    ShellCommand {
        command: String,
        cwd: Option<PathBuf>,
        env: HashMap<String, String>,
    },

    /// Run a command inside a container (`docker run --rm`).
    ContainerCommand {
        image: String,
        command: String,
        /// Volume mounts in `host:container` form.
        mounts: Vec<String>,
        workdir: Option<String>,
    },

    /// Invoke an interpreter on a script with arguments.
    InterpreterCommand {
        interpreter: String,
        script: PathBuf,
        args: Vec<String>,
    },

    /// Fetch an artifact over HTTP into a local file.
    DownloadArtifact { url: String, dest: PathBuf },

    /// Post a local file to an HTTP endpoint.
    SubmitArtifact { url: String, file: PathBuf },

    /// No-op synchronization point for explicit sequencing.
    Barrier,
}

impl StepKind {
    /// Short lowercase label for logs and graph listings.
    pub fn label(&self) -> &'static str {
        match self {
            StepKind::CreateDir { .. } => "create_dir",
            StepKind::RemoveDir { .. } => "remove_dir",
            StepKind::Copy { .. } => "copy",
            StepKind::Move { .. } => "move",
            StepKind::Remove { .. } => "remove",
            StepKind::Touch { .. } => "touch",
            StepKind::ShellCommand { .. } => "shell",
            StepKind::ContainerCommand { .. } => "container",
            StepKind::InterpreterCommand { .. } => "interpreter",
            StepKind::DownloadArtifact { .. } => "download",
            StepKind::SubmitArtifact { .. } => "submit",
            StepKind::Barrier => "barrier",
        }
    }

    /// Resource paths this operation reads by construction.
    ///
    /// Command kinds imply nothing; their footprints come from explicit
    /// declarations on the step.
    pub fn implied_reads(&self) -> Vec<String> {
        match self {
            StepKind::Copy { from, .. } => vec![path_resource(from)],
            StepKind::SubmitArtifact { file, .. } => vec![path_resource(file)],
            _ => Vec::new(),
        }
    }

    /// Resource paths this operation writes by construction.
    ///
    /// A move consumes its source, so the source counts as written, not
    /// merely read: a concurrent reader of the same path must be ordered.
    pub fn implied_writes(&self) -> Vec<String> {
        match self {
            StepKind::CreateDir { path }
            | StepKind::RemoveDir { path }
            | StepKind::Remove { path }
            | StepKind::Touch { path } => vec![path_resource(path)],
            StepKind::Copy { to, .. } => vec![path_resource(to)],
            StepKind::Move { from, to } => vec![path_resource(from), path_resource(to)],
            StepKind::DownloadArtifact { dest, .. } => vec![path_resource(dest)],
            _ => Vec::new(),
        }
    }
}

fn path_resource(path: &PathBuf) -> String {
    path.to_string_lossy().into_owned()
}

/// Retry policy for a single step's own execution.
///
/// Retries are invisible to the rest of the graph: dependents only ever see
/// the step's final state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of tries, including the first. Minimum 1.
    pub max_attempts: u32,

    /// Delay before the first retry; doubled after each further failure.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Delay to wait before the given retry (1 = first retry).
    pub fn delay_before_retry(&self, retry_number: u32) -> Duration {
        if retry_number <= 1 {
            self.backoff
        } else {
            self.backoff * 2u32.saturating_pow(retry_number - 1)
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }
}

/// One declared unit of work, immutable once handed to the engine.
#[derive(Debug, Clone)]
pub struct Step {
    /// Unique id, stable across a single run.
    pub id: String,

    /// Operation kind with payload.
    pub kind: StepKind,

    /// Resource paths/patterns this step reads. Every entry participates in
    /// conflict analysis.
    pub reads: BTreeSet<String>,

    /// Resource paths/patterns this step writes. Every entry participates in
    /// conflict analysis.
    pub writes: BTreeSet<String>,

    /// Ids of steps that must complete before this one may start.
    pub explicit_after: BTreeSet<String>,

    /// Optional guard evaluated immediately before dispatch.
    pub predicate: Option<Predicate>,

    /// Keep the run going (and dependents eligible) if this step fails.
    pub allow_failure: bool,

    /// Per-step retry policy; `None` means the run default applies.
    pub retry: Option<RetryPolicy>,
}

impl Step {
    /// Create a step with the kind's implied resource footprint and default
    /// policies.
    pub fn new(id: impl Into<String>, kind: StepKind) -> Self {
        let reads = kind.implied_reads().into_iter().collect();
        let writes = kind.implied_writes().into_iter().collect();
        Self {
            id: id.into(),
            kind,
            reads,
            writes,
            explicit_after: BTreeSet::new(),
            predicate: None,
            allow_failure: false,
            retry: None,
        }
    }

    /// Add declared read resources on top of the implied ones.
    pub fn with_reads<I, S>(mut self, reads: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reads.extend(reads.into_iter().map(Into::into));
        self
    }

    /// Add declared write resources on top of the implied ones.
    pub fn with_writes<I, S>(mut self, writes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.writes.extend(writes.into_iter().map(Into::into));
        self
    }

    /// Require the given step ids to complete before this step starts.
    pub fn after<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.explicit_after.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Guard dispatch behind a predicate.
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Let the run continue past a failure of this step.
    pub fn with_allow_failure(mut self, allow: bool) -> Self {
        self.allow_failure = allow;
        self
    }

    /// Override the run-default retry policy for this step.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }
}
