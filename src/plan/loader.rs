//! Plan discovery, parsing, and resolution into engine steps.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{BelayError, Result};
use crate::plan::schema::{PlanConfig, StepConfig, StepKindName};
use crate::step::{Step, StepKind};

/// Find the plan file for a root directory.
///
/// `belay.yml` at the root wins; `.belay/plan.yml` is the fallback.
pub fn find_plan(root: &Path) -> Option<PathBuf> {
    let direct = root.join("belay.yml");
    if direct.exists() {
        return Some(direct);
    }
    let nested = root.join(".belay").join("plan.yml");
    if nested.exists() {
        return Some(nested);
    }
    None
}

/// Load and parse a plan file.
pub fn load_plan_file(path: &Path) -> Result<PlanConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            BelayError::PlanNotFound {
                path: path.to_path_buf(),
            }
        } else {
            BelayError::Io(e)
        }
    })?;

    parse_plan(&content, path)
}

/// Parse YAML content into a [`PlanConfig`].
pub fn parse_plan(content: &str, source_path: &Path) -> Result<PlanConfig> {
    serde_yaml::from_str(content).map_err(|e| BelayError::PlanParseError {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Resolve a parsed plan into engine steps, in declaration order.
///
/// Enforces the per-kind required fields the schema cannot express, and
/// rejects unresolved `${...}` placeholders; plans are expected to arrive
/// fully expanded.
pub fn resolve(config: &PlanConfig) -> Result<Vec<Step>> {
    if config.version != 1 {
        return Err(BelayError::PlanValidationError {
            message: format!("unsupported plan version {}", config.version),
        });
    }

    config.steps.iter().map(resolve_step).collect()
}

fn resolve_step(config: &StepConfig) -> Result<Step> {
    if config.id.trim().is_empty() {
        return Err(BelayError::PlanValidationError {
            message: "step id must not be empty".to_string(),
        });
    }

    let kind = build_kind(config)?;
    reject_placeholders(config)?;

    let mut step = Step::new(&config.id, kind)
        .with_reads(config.reads.iter().cloned())
        .with_writes(config.writes.iter().cloned())
        .after(config.after.iter().cloned())
        .with_allow_failure(config.allow_failure);
    if let Some(when) = &config.when {
        step = step.with_predicate(when.clone());
    }
    if let Some(retry) = &config.retry {
        step = step.with_retry(retry.policy());
    }
    Ok(step)
}

fn build_kind(config: &StepConfig) -> Result<StepKind> {
    let kind = match config.kind {
        StepKindName::CreateDir => StepKind::CreateDir {
            path: require_path(config, "path", &config.path)?,
        },
        StepKindName::RemoveDir => StepKind::RemoveDir {
            path: require_path(config, "path", &config.path)?,
        },
        StepKindName::Copy => StepKind::Copy {
            from: require_path(config, "from", &config.from)?,
            to: require_path(config, "to", &config.to)?,
        },
        StepKindName::Move => StepKind::Move {
            from: require_path(config, "from", &config.from)?,
            to: require_path(config, "to", &config.to)?,
        },
        StepKindName::Remove => StepKind::Remove {
            path: require_path(config, "path", &config.path)?,
        },
        StepKindName::Touch => StepKind::Touch {
            path: require_path(config, "path", &config.path)?,
        },
        StepKindName::Shell => StepKind::ShellCommand {
            command: require(config, "command", &config.command)?.to_string(),
            cwd: config.cwd.as_ref().map(PathBuf::from),
            env: config.env.clone(),
        },
        StepKindName::Container => StepKind::ContainerCommand {
            image: require(config, "image", &config.image)?.to_string(),
            command: require(config, "command", &config.command)?.to_string(),
            mounts: config.mounts.clone(),
            workdir: config.workdir.clone(),
        },
        StepKindName::Interpreter => StepKind::InterpreterCommand {
            interpreter: require(config, "interpreter", &config.interpreter)?.to_string(),
            script: require_path(config, "script", &config.script)?,
            args: config.args.clone(),
        },
        StepKindName::Download => StepKind::DownloadArtifact {
            url: require(config, "url", &config.url)?.to_string(),
            dest: require_path(config, "dest", &config.dest)?,
        },
        StepKindName::Submit => StepKind::SubmitArtifact {
            url: require(config, "url", &config.url)?.to_string(),
            file: require_path(config, "file", &config.file)?,
        },
        StepKindName::Barrier => StepKind::Barrier,
    };
    Ok(kind)
}

fn require<'a>(config: &StepConfig, field: &str, value: &'a Option<String>) -> Result<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| BelayError::PlanValidationError {
            message: format!(
                "step '{}': kind '{}' requires '{}'",
                config.id,
                config.kind.as_str(),
                field
            ),
        })
}

fn require_path(config: &StepConfig, field: &str, value: &Option<String>) -> Result<PathBuf> {
    require(config, field, value).map(PathBuf::from)
}

/// Plans arrive fully expanded; a surviving `${...}` means an upstream
/// templating pass did not run.
fn reject_placeholders(config: &StepConfig) -> Result<()> {
    let mut candidates: Vec<&str> = Vec::new();
    for value in [
        &config.path,
        &config.from,
        &config.to,
        &config.command,
        &config.cwd,
        &config.image,
        &config.workdir,
        &config.interpreter,
        &config.script,
        &config.url,
        &config.dest,
        &config.file,
    ]
    .into_iter()
    .flatten()
    {
        candidates.push(value);
    }
    candidates.extend(config.mounts.iter().map(String::as_str));
    candidates.extend(config.args.iter().map(String::as_str));
    candidates.extend(config.reads.iter().map(String::as_str));
    candidates.extend(config.writes.iter().map(String::as_str));
    candidates.extend(config.env.values().map(String::as_str));

    for value in candidates {
        if value.contains("${") {
            return Err(BelayError::PlanValidationError {
                message: format!(
                    "step '{}': unresolved placeholder in '{}'",
                    config.id, value
                ),
            });
        }
    }
    Ok(())
}

/// Convenience: load a plan file and resolve it in one go.
pub fn load_steps(path: &Path) -> Result<(PlanConfig, Vec<Step>)> {
    let config = load_plan_file(path)?;
    let steps = resolve(&config)?;
    Ok((config, steps))
}
