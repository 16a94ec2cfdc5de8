//! Process execution for command-shaped steps.
//!
//! Driver calls run async through `tokio::process` so the scheduler keeps
//! dispatching other branches while a command is outstanding. Predicate
//! guards use the small synchronous [`execute_check`] instead.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;

use crate::error::Result;

/// Result of executing a command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit code (None if killed by signal).
    pub exit_code: Option<i32>,

    /// Captured standard output.
    pub stdout: String,

    /// Captured standard error.
    pub stderr: String,

    /// Execution duration.
    pub duration: Duration,

    /// Whether the command exited zero.
    pub success: bool,
}

impl CommandResult {
    pub fn success(stdout: String, stderr: String, duration: Duration) -> Self {
        Self {
            exit_code: Some(0),
            stdout,
            stderr,
            duration,
            success: true,
        }
    }

    pub fn failure(
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
        duration: Duration,
    ) -> Self {
        Self {
            exit_code,
            stdout,
            stderr,
            duration,
            success: false,
        }
    }
}

/// Options for command execution. Output is always captured; step results
/// carry it, nothing streams to the terminal mid-run.
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    /// Working directory.
    pub cwd: Option<PathBuf>,

    /// Environment variables (merged with the parent environment).
    pub env: HashMap<String, String>,
}

/// Execute a command line through the platform shell.
pub async fn execute(command: &str, options: &CommandOptions) -> Result<CommandResult> {
    let (shell, flag) = shell_invocation();
    let mut cmd = Command::new(shell);
    cmd.arg(flag).arg(command);
    run(cmd, options).await
}

/// Execute a program with explicit arguments, bypassing the shell.
pub async fn execute_program(
    program: &str,
    args: &[String],
    options: &CommandOptions,
) -> Result<CommandResult> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    run(cmd, options).await
}

async fn run(mut cmd: Command, options: &CommandOptions) -> Result<CommandResult> {
    let start = Instant::now();

    if let Some(cwd) = &options.cwd {
        cmd.current_dir(cwd);
    }
    for (key, value) in &options.env {
        cmd.env(key, value);
    }
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let output = cmd.output().await?;
    let duration = start.elapsed();

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if output.status.success() {
        Ok(CommandResult::success(stdout, stderr, duration))
    } else {
        Ok(CommandResult::failure(
            output.status.code(),
            stdout,
            stderr,
            duration,
        ))
    }
}

/// Run a command synchronously and report whether it exited zero.
///
/// Used by predicate guards, which evaluate off the async path. A spawn
/// failure is an error, not a clean `false`; the caller decides how a
/// broken guard surfaces.
pub fn execute_check(command: &str, cwd: Option<&Path>) -> Result<bool> {
    let (shell, flag) = shell_invocation();
    let mut cmd = std::process::Command::new(shell);
    cmd.arg(flag).arg(command);
    if let Some(cwd) = cwd {
        cmd.current_dir(cwd);
    }
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::null());
    cmd.stderr(Stdio::null());

    let status = cmd.status()?;
    Ok(status.success())
}

/// The shell and its command flag.
///
/// Plan commands run under `/bin/sh -c` on Unix rather than the user's
/// login shell, so a plan behaves the same on every machine that runs it.
fn shell_invocation() -> (String, &'static str) {
    if cfg!(target_os = "windows") {
        (
            std::env::var("COMSPEC").unwrap_or_else(|_| "cmd.exe".to_string()),
            "/C",
        )
    } else {
        ("/bin/sh".to_string(), "-c")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn execute_successful_command() {
        let result = execute("echo hello", &CommandOptions::default())
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.exit_code, Some(0));
        assert!(result.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn execute_failing_command_reports_code() {
        let result = execute("exit 7", &CommandOptions::default())
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.exit_code, Some(7));
    }

    #[tokio::test]
    async fn execute_with_env() {
        let mut options = CommandOptions::default();
        options
            .env
            .insert("MY_VAR".to_string(), "my_value".to_string());

        let cmd = if cfg!(target_os = "windows") {
            "echo %MY_VAR%"
        } else {
            "echo $MY_VAR"
        };
        let result = execute(cmd, &options).await.unwrap();

        assert!(result.success);
        assert!(result.stdout.contains("my_value"));
    }

    #[tokio::test]
    async fn execute_with_cwd() {
        let temp = tempfile::TempDir::new().unwrap();
        let options = CommandOptions {
            cwd: Some(temp.path().to_path_buf()),
            ..Default::default()
        };

        let cmd = if cfg!(target_os = "windows") { "cd" } else { "pwd" };
        let result = execute(cmd, &options).await.unwrap();

        assert!(result.success);
    }

    #[tokio::test]
    async fn execute_captures_stderr() {
        let cmd = if cfg!(target_os = "windows") {
            "echo oops 1>&2"
        } else {
            "echo oops >&2"
        };
        let result = execute(cmd, &CommandOptions::default()).await.unwrap();

        assert!(result.stderr.contains("oops"));
    }

    #[tokio::test]
    async fn execute_program_bypasses_shell() {
        let (program, args): (&str, Vec<String>) = if cfg!(target_os = "windows") {
            ("cmd.exe", vec!["/C".into(), "echo direct".into()])
        } else {
            ("/bin/sh", vec!["-c".into(), "echo direct".into()])
        };

        let result = execute_program(program, &args, &CommandOptions::default())
            .await
            .unwrap();

        assert!(result.success);
        assert!(result.stdout.contains("direct"));
    }

    #[tokio::test]
    async fn command_result_tracks_duration() {
        let result = execute("echo fast", &CommandOptions::default())
            .await
            .unwrap();

        assert!(result.duration.as_millis() < 5000);
    }

    #[test]
    fn execute_check_distinguishes_exit_codes() {
        assert!(execute_check("exit 0", None).unwrap());
        assert!(!execute_check("exit 1", None).unwrap());
    }

    #[test]
    fn execute_check_honors_cwd() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("marker"), "x").unwrap();

        let cmd = if cfg!(target_os = "windows") {
            "if exist marker (exit 0) else (exit 1)"
        } else {
            "test -f marker"
        };
        assert!(execute_check(cmd, Some(temp.path())).unwrap());
    }
}
