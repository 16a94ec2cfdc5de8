//! Process execution helpers.

pub mod command;

pub use command::{execute, execute_check, execute_program, CommandOptions, CommandResult};
