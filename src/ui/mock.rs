//! Mock UI for testing.

use super::{OutputMode, UserInterface};

/// Mock UI that records all output for assertions.
#[derive(Debug, Default)]
pub struct MockUI {
    mode: OutputMode,
    messages: Vec<String>,
    successes: Vec<String>,
    warnings: Vec<String>,
    errors: Vec<String>,
    skipped: Vec<String>,
    headers: Vec<String>,
}

impl MockUI {
    /// Create a new mock UI.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock UI with a specific output mode.
    pub fn with_mode(mode: OutputMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// All plain messages, in order.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// All error messages, in order.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Check if any success message contains the substring.
    pub fn has_success(&self, substring: &str) -> bool {
        self.successes.iter().any(|m| m.contains(substring))
    }

    /// Check if any warning message contains the substring.
    pub fn has_warning(&self, substring: &str) -> bool {
        self.warnings.iter().any(|m| m.contains(substring))
    }

    /// Check if any error message contains the substring.
    pub fn has_error(&self, substring: &str) -> bool {
        self.errors.iter().any(|m| m.contains(substring))
    }

    /// Check if any skipped message contains the substring.
    pub fn has_skipped(&self, substring: &str) -> bool {
        self.skipped.iter().any(|m| m.contains(substring))
    }

    /// Check if any plain message contains the substring.
    pub fn has_message(&self, substring: &str) -> bool {
        self.messages.iter().any(|m| m.contains(substring))
    }

    /// Check if any header contains the substring.
    pub fn has_header(&self, substring: &str) -> bool {
        self.headers.iter().any(|m| m.contains(substring))
    }
}

impl UserInterface for MockUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn message(&mut self, msg: &str) {
        self.messages.push(msg.to_string());
    }

    fn success(&mut self, msg: &str) {
        self.successes.push(msg.to_string());
    }

    fn warning(&mut self, msg: &str) {
        self.warnings.push(msg.to_string());
    }

    fn error(&mut self, msg: &str) {
        self.errors.push(msg.to_string());
    }

    fn skipped(&mut self, msg: &str) {
        self.skipped.push(msg.to_string());
    }

    fn show_header(&mut self, title: &str) {
        self.headers.push(title.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_records_all_output_kinds() {
        let mut ui = MockUI::new();
        ui.message("plain");
        ui.success("done");
        ui.warning("careful");
        ui.error("broken");
        ui.skipped("not needed");
        ui.show_header("title");

        assert!(ui.has_message("plain"));
        assert!(ui.has_success("done"));
        assert!(ui.has_warning("careful"));
        assert!(ui.has_error("broken"));
        assert!(ui.has_skipped("not needed"));
        assert!(ui.has_header("title"));
    }

    #[test]
    fn substring_matching_does_not_require_full_message() {
        let mut ui = MockUI::new();
        ui.success("3 succeeded in 1.2s");

        assert!(ui.has_success("succeeded"));
        assert!(!ui.has_success("failed"));
    }
}
