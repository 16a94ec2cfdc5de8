//! The production driver: filesystem, process, container, and HTTP
//! operations against the local machine.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs;

use crate::driver::{Driver, StepOutcome};
use crate::shell::{self, CommandOptions, CommandResult};
use crate::step::{OutcomeDetail, Step, StepKind};

/// Executes steps against the local filesystem and process table.
///
/// Relative payload paths resolve against `root`; absolute paths are taken
/// as-is, matching how plan files are written.
pub struct LocalDriver {
    root: PathBuf,
    http: reqwest::Client,
}

impl LocalDriver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            http: reqwest::Client::builder()
                .user_agent("belay")
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    async fn create_dir(&self, path: &Path) -> StepOutcome {
        match fs::create_dir_all(self.resolve(path)).await {
            Ok(()) => files_outcome([path]),
            Err(err) => file_failure("create_dir", path, err),
        }
    }

    /// Removes a directory tree. A file at the path is removed too, and a
    /// missing path counts as done.
    async fn remove_dir(&self, path: &Path) -> StepOutcome {
        let target = self.resolve(path);
        let result = match fs::metadata(&target).await {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(&target).await,
            Ok(_) => fs::remove_file(&target).await,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        };
        match result {
            Ok(()) => files_outcome([path]),
            Err(err) => file_failure("remove_dir", path, err),
        }
    }

    async fn copy(&self, from: &Path, to: &Path) -> StepOutcome {
        let src = self.resolve(from);
        let dst = self.resolve(to);
        if let Err(err) = ensure_parent(&dst).await {
            return file_failure("copy", to, err);
        }
        match fs::copy(&src, &dst).await {
            Ok(_) => files_outcome([from, to]),
            Err(err) => file_failure("copy", from, err),
        }
    }

    async fn rename(&self, from: &Path, to: &Path) -> StepOutcome {
        let src = self.resolve(from);
        let dst = self.resolve(to);
        if let Err(err) = ensure_parent(&dst).await {
            return file_failure("move", to, err);
        }
        match fs::rename(&src, &dst).await {
            Ok(()) => files_outcome([from, to]),
            // Rename cannot cross filesystems; fall back for plain files.
            Err(_) => match fs::copy(&src, &dst).await {
                Ok(_) => match fs::remove_file(&src).await {
                    Ok(()) => files_outcome([from, to]),
                    Err(err) => file_failure("move", from, err),
                },
                Err(err) => file_failure("move", from, err),
            },
        }
    }

    /// Removes a file; a missing path counts as done.
    async fn remove(&self, path: &Path) -> StepOutcome {
        match fs::remove_file(self.resolve(path)).await {
            Ok(()) => files_outcome([path]),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => files_outcome([path]),
            Err(err) => file_failure("remove", path, err),
        }
    }

    async fn touch(&self, path: &Path) -> StepOutcome {
        let target = self.resolve(path);
        if let Err(err) = ensure_parent(&target).await {
            return file_failure("touch", path, err);
        }
        let result = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&target)
            .await;
        match result {
            Ok(_) => files_outcome([path]),
            Err(err) => file_failure("touch", path, err),
        }
    }

    async fn shell_command(
        &self,
        command: &str,
        cwd: Option<&Path>,
        env: &HashMap<String, String>,
    ) -> StepOutcome {
        let options = CommandOptions {
            cwd: Some(cwd.map(|c| self.resolve(c)).unwrap_or_else(|| self.root.clone())),
            env: env.clone(),
        };
        match shell::execute(command, &options).await {
            Ok(result) => command_outcome(result),
            Err(err) => StepOutcome::failure(
                OutcomeDetail::None,
                format!("failed to spawn shell: {}", err),
            ),
        }
    }

    /// Composes `docker run --rm` with the declared mounts and workdir, then
    /// runs the inner command under `/bin/sh -c` inside the container.
    async fn container_command(
        &self,
        image: &str,
        command: &str,
        mounts: &[String],
        workdir: Option<&str>,
    ) -> StepOutcome {
        let mut args: Vec<String> = vec!["run".into(), "--rm".into()];
        for mount in mounts {
            args.push("-v".into());
            args.push(mount.clone());
        }
        if let Some(dir) = workdir {
            args.push("-w".into());
            args.push(dir.to_string());
        }
        args.push(image.to_string());
        args.push("/bin/sh".into());
        args.push("-c".into());
        args.push(command.to_string());

        let options = CommandOptions {
            cwd: Some(self.root.clone()),
            env: HashMap::new(),
        };
        match shell::execute_program("docker", &args, &options).await {
            Ok(result) => command_outcome(result),
            Err(err) => StepOutcome::failure(
                OutcomeDetail::None,
                format!("failed to spawn docker: {}", err),
            ),
        }
    }

    async fn interpreter_command(
        &self,
        interpreter: &str,
        script: &Path,
        args: &[String],
    ) -> StepOutcome {
        let mut full_args = vec![self.resolve(script).to_string_lossy().into_owned()];
        full_args.extend(args.iter().cloned());

        let options = CommandOptions {
            cwd: Some(self.root.clone()),
            env: HashMap::new(),
        };
        match shell::execute_program(interpreter, &full_args, &options).await {
            Ok(result) => command_outcome(result),
            Err(err) => StepOutcome::failure(
                OutcomeDetail::None,
                format!("failed to spawn {}: {}", interpreter, err),
            ),
        }
    }

    async fn download(&self, url: &str, dest: &Path) -> StepOutcome {
        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(err) => {
                return StepOutcome::failure(OutcomeDetail::None, format!("GET {}: {}", url, err))
            }
        };
        if !response.status().is_success() {
            return StepOutcome::failure(
                OutcomeDetail::None,
                format!("GET {}: HTTP {}", url, response.status()),
            );
        }
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(err) => {
                return StepOutcome::failure(OutcomeDetail::None, format!("GET {}: {}", url, err))
            }
        };

        let target = self.resolve(dest);
        if let Err(err) = ensure_parent(&target).await {
            return file_failure("download", dest, err);
        }
        match fs::write(&target, &body).await {
            Ok(()) => files_outcome([dest]),
            Err(err) => file_failure("download", dest, err),
        }
    }

    async fn submit(&self, url: &str, file: &Path) -> StepOutcome {
        let body = match fs::read(self.resolve(file)).await {
            Ok(body) => body,
            Err(err) => return file_failure("submit", file, err),
        };
        let response = match self.http.post(url).body(body).send().await {
            Ok(response) => response,
            Err(err) => {
                return StepOutcome::failure(OutcomeDetail::None, format!("POST {}: {}", url, err))
            }
        };
        if response.status().is_success() {
            files_outcome([file])
        } else {
            StepOutcome::failure(
                OutcomeDetail::None,
                format!("POST {}: HTTP {}", url, response.status()),
            )
        }
    }
}

#[async_trait]
impl Driver for LocalDriver {
    async fn perform(&self, step: &Step) -> StepOutcome {
        match &step.kind {
            StepKind::CreateDir { path } => self.create_dir(path).await,
            StepKind::RemoveDir { path } => self.remove_dir(path).await,
            StepKind::Copy { from, to } => self.copy(from, to).await,
            StepKind::Move { from, to } => self.rename(from, to).await,
            StepKind::Remove { path } => self.remove(path).await,
            StepKind::Touch { path } => self.touch(path).await,
            StepKind::ShellCommand { command, cwd, env } => {
                self.shell_command(command, cwd.as_deref(), env).await
            }
            StepKind::ContainerCommand {
                image,
                command,
                mounts,
                workdir,
            } => {
                self.container_command(image, command, mounts, workdir.as_deref())
                    .await
            }
            StepKind::InterpreterCommand {
                interpreter,
                script,
                args,
            } => self.interpreter_command(interpreter, script, args).await,
            StepKind::DownloadArtifact { url, dest } => self.download(url, dest).await,
            StepKind::SubmitArtifact { url, file } => self.submit(url, file).await,
            StepKind::Barrier => StepOutcome::success(OutcomeDetail::None),
        }
    }
}

fn files_outcome<'a>(paths: impl IntoIterator<Item = &'a Path>) -> StepOutcome {
    StepOutcome::success(OutcomeDetail::Files {
        paths: paths.into_iter().map(Path::to_path_buf).collect(),
    })
}

fn file_failure(op: &str, path: &Path, err: std::io::Error) -> StepOutcome {
    StepOutcome::failure(
        OutcomeDetail::None,
        format!("{} {}: {}", op, path.display(), err),
    )
}

fn command_outcome(result: CommandResult) -> StepOutcome {
    let detail = OutcomeDetail::Command {
        exit_code: result.exit_code,
        stdout: result.stdout,
        stderr: result.stderr,
    };
    if result.success {
        StepOutcome::success(detail)
    } else {
        let error = match result.exit_code {
            Some(code) => format!("command exited with code {}", code),
            None => "command terminated by signal".to_string(),
        };
        StepOutcome::failure(detail, error)
    }
}

async fn ensure_parent(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    Ok(())
}
