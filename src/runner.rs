//! External command execution.
//!
//! Every interaction with the outside world goes through the
//! [`CommandExecutor`] trait so the controller can be driven by a fake in
//! tests. [`ProcessRunner`] is the production implementation over
//! `tokio::process`.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tracing::debug;

use crate::error::{Error, Result};

/// Outcome of a finished external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitResult {
    /// Exit code, or `None` if the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ExitResult {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Seam between the controller and the operating system.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run a command to completion and collect its output. A non-zero exit is
    /// not an error here; callers inspect the [`ExitResult`].
    async fn run(&self, argv: &[String], cwd: &Path) -> Result<ExitResult>;

    /// Spawn a command and hand back a [`ManagedProcess`] the caller awaits.
    /// `env` entries are added on top of the inherited environment.
    async fn spawn(
        &self,
        argv: &[String],
        cwd: &Path,
        env: &[(String, String)],
    ) -> Result<ManagedProcess>;

    /// Run a command and return its trimmed stdout, failing on non-zero exit.
    async fn capture(&self, argv: &[String]) -> Result<String>;
}

/// Spawned child tracked by the controller until it is awaited.
#[derive(Debug)]
pub struct ManagedProcess {
    argv: Vec<String>,
    working_dir: PathBuf,
    handle: Handle,
    exit: Option<ExitResult>,
}

#[derive(Debug)]
enum Handle {
    /// Live child process.
    Child(Child),
    /// Pre-computed outcome, used by test fakes.
    Resolved(ExitResult),
    /// Already awaited.
    Done,
}

impl ManagedProcess {
    fn from_child(argv: Vec<String>, working_dir: PathBuf, child: Child) -> Self {
        Self {
            argv,
            working_dir,
            handle: Handle::Child(child),
            exit: None,
        }
    }

    /// Build a process whose outcome is already known. Exists so fakes can
    /// satisfy [`CommandExecutor::spawn`] without touching the OS.
    pub fn resolved(argv: Vec<String>, working_dir: PathBuf, exit: ExitResult) -> Self {
        Self {
            argv,
            working_dir,
            handle: Handle::Resolved(exit),
            exit: None,
        }
    }

    /// Wait for the process to finish, caching the result. Idempotent.
    pub async fn wait(&mut self) -> Result<ExitResult> {
        if let Some(exit) = &self.exit {
            return Ok(exit.clone());
        }
        let handle = std::mem::replace(&mut self.handle, Handle::Done);
        let exit = match handle {
            Handle::Child(child) => {
                let output = child.wait_with_output().await?;
                ExitResult {
                    code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                }
            }
            Handle::Resolved(exit) => exit,
            Handle::Done => {
                return Err(Error::Validation(format!(
                    "Process '{}' was already consumed",
                    self.command_line()
                )))
            }
        };
        self.exit = Some(exit.clone());
        Ok(exit)
    }

    /// Exit code if the process has been awaited, `None` otherwise.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit.as_ref().and_then(|e| e.code)
    }

    pub fn command_line(&self) -> String {
        self.argv.join(" ")
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }
}

/// Production executor backed by `tokio::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }

    fn command(argv: &[String]) -> Result<Command> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| Error::Validation("Empty command line".to_string()))?;
        let mut cmd = Command::new(program);
        cmd.args(args);
        Ok(cmd)
    }
}

#[async_trait]
impl CommandExecutor for ProcessRunner {
    async fn run(&self, argv: &[String], cwd: &Path) -> Result<ExitResult> {
        let mut cmd = Self::command(argv)?;
        debug!(command = %argv.join(" "), cwd = %cwd.display(), "running command");
        let output = cmd.current_dir(cwd).output().await.map_err(|e| {
            Error::Process {
                command: argv.join(" "),
                exit_code: None,
                stderr: e.to_string(),
            }
        })?;
        Ok(ExitResult {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn spawn(
        &self,
        argv: &[String],
        cwd: &Path,
        env: &[(String, String)],
    ) -> Result<ManagedProcess> {
        let mut cmd = Self::command(argv)?;
        cmd.current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in env {
            cmd.env(key, value);
        }
        debug!(command = %argv.join(" "), cwd = %cwd.display(), "spawning command");
        let child = cmd.spawn().map_err(|e| Error::Process {
            command: argv.join(" "),
            exit_code: None,
            stderr: e.to_string(),
        })?;
        Ok(ManagedProcess::from_child(
            argv.to_vec(),
            cwd.to_path_buf(),
            child,
        ))
    }

    async fn capture(&self, argv: &[String]) -> Result<String> {
        let result = self.run(argv, Path::new(".")).await?;
        if result.success() {
            Ok(result.stdout.trim().to_string())
        } else {
            Err(Error::Process {
                command: argv.join(" "),
                exit_code: result.code,
                stderr: result.stderr.trim().to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolved_process_waits_to_its_outcome() {
        let mut proc = ManagedProcess::resolved(
            vec!["docker".into(), "compose".into(), "up".into()],
            PathBuf::from("/tmp"),
            ExitResult {
                code: Some(0),
                stdout: String::new(),
                stderr: String::new(),
            },
        );
        assert_eq!(proc.exit_code(), None);
        let exit = proc.wait().await.unwrap();
        assert!(exit.success());
        assert_eq!(proc.exit_code(), Some(0));
        // second wait returns the cached result
        assert!(proc.wait().await.unwrap().success());
    }

    #[tokio::test]
    async fn empty_argv_is_rejected() {
        let runner = ProcessRunner::new();
        assert!(runner.run(&[], Path::new(".")).await.is_err());
    }

    #[test]
    fn command_line_joins_argv() {
        let proc = ManagedProcess::resolved(
            vec!["docker".into(), "ps".into()],
            PathBuf::from("."),
            ExitResult {
                code: Some(0),
                stdout: String::new(),
                stderr: String::new(),
            },
        );
        assert_eq!(proc.command_line(), "docker ps");
    }
}
