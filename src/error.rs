//! Error types for Belay operations.
//!
//! This module defines [`BelayError`], the primary error type used throughout
//! the application, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Use `BelayError` for domain-specific errors that need distinct handling
//! - Use `anyhow::Error` (via [`BelayError::Other`]) for unexpected errors
//! - Structural graph errors (duplicate ids, unknown dependencies, cycles)
//!   are raised before any step executes; step failures are never errors at
//!   this level — they are recorded in the run result instead

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for Belay operations.
#[derive(Debug, Error)]
pub enum BelayError {
    /// Plan file not found at expected location.
    #[error("Plan not found: {path}")]
    PlanNotFound { path: PathBuf },

    /// Failed to parse plan file.
    #[error("Failed to parse plan at {path}: {message}")]
    PlanParseError { path: PathBuf, message: String },

    /// Invalid plan structure or values.
    #[error("Invalid plan: {message}")]
    PlanValidationError { message: String },

    /// Two steps declared with the same id.
    #[error("Duplicate step id: '{step_id}'")]
    DuplicateStepId { step_id: String },

    /// A step's `after` list references an id that does not exist.
    #[error("Step '{step_id}' depends on unknown step '{missing_id}'")]
    UnknownDependency { step_id: String, missing_id: String },

    /// The merged dependency graph contains a cycle.
    #[error("Dependency cycle detected: {}", step_ids.join(" -> "))]
    CycleDetected { step_ids: Vec<String> },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for Belay operations.
pub type Result<T> = std::result::Result<T, BelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_not_found_displays_path() {
        let err = BelayError::PlanNotFound {
            path: PathBuf::from("/foo/plan.yml"),
        };
        assert!(err.to_string().contains("/foo/plan.yml"));
    }

    #[test]
    fn plan_parse_error_displays_path_and_message() {
        let err = BelayError::PlanParseError {
            path: PathBuf::from("/plan.yml"),
            message: "invalid syntax".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/plan.yml"));
        assert!(msg.contains("invalid syntax"));
    }

    #[test]
    fn plan_validation_error_displays_message() {
        let err = BelayError::PlanValidationError {
            message: "missing required field".into(),
        };
        assert!(err.to_string().contains("missing required field"));
    }

    #[test]
    fn duplicate_step_id_displays_id() {
        let err = BelayError::DuplicateStepId {
            step_id: "compile".into(),
        };
        assert!(err.to_string().contains("compile"));
    }

    #[test]
    fn unknown_dependency_displays_both_ids() {
        let err = BelayError::UnknownDependency {
            step_id: "test".into(),
            missing_id: "compile".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("test"));
        assert!(msg.contains("compile"));
    }

    #[test]
    fn cycle_detected_joins_participants() {
        let err = BelayError::CycleDetected {
            step_ids: vec!["a".into(), "b".into(), "a".into()],
        };
        assert!(err.to_string().contains("a -> b -> a"));
    }

    #[test]
    fn io_error_converts_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: BelayError = io_err.into();
        assert!(matches!(err, BelayError::Io(_)));
    }

    #[test]
    fn result_type_alias_works() {
        fn returns_error() -> Result<()> {
            Err(BelayError::PlanValidationError {
                message: "test".into(),
            })
        }
        assert!(returns_error().is_err());
    }
}
