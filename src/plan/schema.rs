//! Plan file schema.
//!
//! The raw, serde-facing shape of a plan. Steps are a list so file order is
//! declaration order. Resolution into engine steps (with per-kind field
//! validation) lives in the loader.

use std::collections::HashMap;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::runner::FailureMode;
use crate::step::{Predicate, RetryPolicy};

/// Top-level plan file.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PlanConfig {
    /// Plan schema version. Currently 1.
    #[serde(default = "default_version")]
    pub version: u32,

    /// Run-wide settings.
    #[serde(default)]
    pub settings: PlanSettings,

    /// Steps in declaration order.
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            settings: PlanSettings::default(),
            steps: Vec::new(),
        }
    }
}

/// Run-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PlanSettings {
    /// Upper bound on simultaneously running steps.
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,

    /// Default retry policy; a step's own `retry` block wins.
    #[serde(default)]
    pub retry: RetryConfig,

    /// What happens to the rest of the plan when a step fails strictly.
    #[serde(default)]
    pub on_failure: FailureConfig,
}

impl Default for PlanSettings {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
            retry: RetryConfig::default(),
            on_failure: FailureConfig::default(),
        }
    }
}

impl PlanSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.policy()
    }

    pub fn failure_mode(&self) -> FailureMode {
        match self.on_failure {
            FailureConfig::CancelDependents => FailureMode::CancelDependents,
            FailureConfig::Abort => FailureMode::AbortAll,
        }
    }
}

/// Failure handling for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureConfig {
    /// Cancel only the dependents of a failed step.
    #[default]
    CancelDependents,

    /// Cancel everything not yet started on the first strict failure.
    Abort,
}

/// Retry policy as declared in the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RetryConfig {
    /// Total tries including the first. Minimum 1.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds; doubles per retry.
    #[serde(default)]
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: 0,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.backoff_ms))
    }
}

/// Operation kind names as written in plan files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StepKindName {
    CreateDir,
    RemoveDir,
    Copy,
    Move,
    Remove,
    Touch,
    Shell,
    Container,
    Interpreter,
    Download,
    Submit,
    Barrier,
}

impl StepKindName {
    /// The name as written in plan files.
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKindName::CreateDir => "create_dir",
            StepKindName::RemoveDir => "remove_dir",
            StepKindName::Copy => "copy",
            StepKindName::Move => "move",
            StepKindName::Remove => "remove",
            StepKindName::Touch => "touch",
            StepKindName::Shell => "shell",
            StepKindName::Container => "container",
            StepKindName::Interpreter => "interpreter",
            StepKindName::Download => "download",
            StepKindName::Submit => "submit",
            StepKindName::Barrier => "barrier",
        }
    }
}

/// One step as declared in the plan. Which payload fields are required
/// depends on `kind`; the loader enforces that.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StepConfig {
    /// Unique step id.
    pub id: String,

    /// Operation kind.
    pub kind: StepKindName,

    /// Target path (create_dir, remove_dir, remove, touch).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Source path (copy, move).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    /// Destination path (copy, move).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,

    /// Command line (shell, container).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Working directory for shell commands.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,

    /// Extra environment for shell commands.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,

    /// Container image (container).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Volume mounts in `host:container` form (container).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mounts: Vec<String>,

    /// Working directory inside the container (container).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workdir: Option<String>,

    /// Interpreter binary (interpreter).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<String>,

    /// Script path (interpreter).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,

    /// Script arguments (interpreter).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Endpoint (download, submit).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Download destination (download).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<String>,

    /// File to submit (submit).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Declared read resources (paths or glob patterns).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reads: Vec<String>,

    /// Declared write resources (paths or glob patterns).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub writes: Vec<String>,

    /// Ids of steps that must complete first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<String>,

    /// Guard; when it does not hold the step is skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<Predicate>,

    /// Tolerate failure of this step.
    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_failure: bool,

    /// Per-step retry override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,
}

fn default_version() -> u32 {
    1
}

fn default_max_parallel() -> usize {
    4
}

fn default_max_attempts() -> u32 {
    1
}

fn is_false(value: &bool) -> bool {
    !value
}
