//! Step execution orchestration.

pub mod report;
pub mod scheduler;

pub use report::{aggregate, CompositeResult, OverallStatus};
pub use scheduler::{execute, ExecuteOptions, FailureMode};
