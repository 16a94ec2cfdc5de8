//! Schema command implementation.
//!
//! The `belay schema` command prints the JSON schema for plan files,
//! suitable for editor integration and plan validation tooling.

use crate::error::Result;
use crate::plan::PlanConfig;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};

/// The schema command implementation.
pub struct SchemaCommand;

impl SchemaCommand {
    /// Create a new schema command.
    pub fn new() -> Self {
        Self
    }

    /// Render the plan schema as pretty JSON.
    pub fn render() -> Result<String> {
        let schema = schemars::schema_for!(PlanConfig);
        let rendered = serde_json::to_string_pretty(&schema)
            .map_err(|e| anyhow::anyhow!("Failed to serialize schema: {}", e))?;
        Ok(rendered)
    }
}

impl Default for SchemaCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl Command for SchemaCommand {
    fn execute(&self, _ui: &mut dyn UserInterface) -> Result<CommandResult> {
        // Schema output is machine-readable; it goes to stdout unstyled.
        println!("{}", Self::render()?);
        Ok(CommandResult::success())
    }
}
