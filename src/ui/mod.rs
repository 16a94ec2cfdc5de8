//! Terminal output components.
//!
//! This module provides:
//! - [`UserInterface`] trait for output abstraction
//! - [`TerminalUI`] for styled terminal output
//! - [`MockUI`] for capturing output in tests
//!
//! # Example
//!
//! ```
//! use belay::ui::{create_ui, OutputMode};
//!
//! let mut ui = create_ui(OutputMode::Quiet);
//! ui.show_header("My plan");
//! ui.success("Run complete!");
//! ```

pub mod mock;
pub mod terminal;
pub mod theme;

pub use mock::MockUI;
pub use terminal::{create_ui, TerminalUI};
pub use theme::{should_use_colors, BelayTheme};

/// Output verbosity mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Show per-step progress and status.
    #[default]
    Normal,
    /// Show final status and errors only.
    Quiet,
}

impl OutputMode {
    /// Check if this mode shows per-step detail.
    pub fn shows_detail(&self) -> bool {
        matches!(self, Self::Normal)
    }
}

/// Trait for terminal output.
///
/// This trait allows capturing output in tests.
pub trait UserInterface {
    /// Get the current output mode.
    fn output_mode(&self) -> OutputMode;

    /// Display a plain message.
    fn message(&mut self, msg: &str);

    /// Display a success message.
    fn success(&mut self, msg: &str);

    /// Display a warning message.
    fn warning(&mut self, msg: &str);

    /// Display an error message.
    fn error(&mut self, msg: &str);

    /// Display a skipped-step message.
    fn skipped(&mut self, msg: &str);

    /// Show a header/banner.
    fn show_header(&mut self, title: &str);
}
