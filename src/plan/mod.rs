//! Plan files: schema, discovery, and resolution into engine steps.

pub mod loader;
pub mod schema;

pub use loader::{find_plan, load_plan_file, load_steps, parse_plan, resolve};
pub use schema::{FailureConfig, PlanConfig, PlanSettings, RetryConfig, StepConfig, StepKindName};
