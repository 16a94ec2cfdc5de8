//! Styled terminal output.

use console::Term;
use std::io::Write;

use super::{should_use_colors, BelayTheme, OutputMode, UserInterface};

/// Terminal UI implementation.
///
/// Status output goes to stdout; errors go to stderr so they survive
/// piping and `--quiet`.
pub struct TerminalUI {
    out: Term,
    err: Term,
    theme: BelayTheme,
    mode: OutputMode,
}

impl TerminalUI {
    /// Create a new terminal UI.
    pub fn new(mode: OutputMode) -> Self {
        let theme = if should_use_colors() {
            BelayTheme::new()
        } else {
            BelayTheme::plain()
        };

        Self {
            out: Term::stdout(),
            err: Term::stderr(),
            theme,
            mode,
        }
    }
}

impl UserInterface for TerminalUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn message(&mut self, msg: &str) {
        if self.mode.shows_detail() {
            writeln!(self.out, "{}", msg).ok();
        }
    }

    fn success(&mut self, msg: &str) {
        writeln!(self.out, "{}", self.theme.format_success(msg)).ok();
    }

    fn warning(&mut self, msg: &str) {
        writeln!(self.out, "{}", self.theme.format_warning(msg)).ok();
    }

    fn error(&mut self, msg: &str) {
        writeln!(self.err, "{}", self.theme.format_error(msg)).ok();
    }

    fn skipped(&mut self, msg: &str) {
        if self.mode.shows_detail() {
            writeln!(self.out, "{}", self.theme.format_skipped(msg)).ok();
        }
    }

    fn show_header(&mut self, title: &str) {
        if self.mode.shows_detail() {
            writeln!(self.out, "\n{}\n", self.theme.format_header(title)).ok();
        }
    }
}

/// Create the UI for the given output mode.
pub fn create_ui(mode: OutputMode) -> Box<dyn UserInterface> {
    Box::new(TerminalUI::new(mode))
}
