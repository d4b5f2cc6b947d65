//! Shared test doubles: a scriptable command executor and a recording
//! observer.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use dockhand::error::{Error, Result};
use dockhand::observer::LauncherObserver;
use dockhand::runner::{CommandExecutor, ExitResult, ManagedProcess};
use dockhand::state::LifecycleState;

/// Scriptable [`CommandExecutor`]. Records every argv it sees; behavior is
/// configured per test through the public fields.
#[derive(Default)]
pub struct FakeExecutor {
    /// Every argv passed to run/spawn/capture, in order.
    pub calls: Mutex<Vec<Vec<String>>>,
    /// Output returned for `ls`/`ps` captures.
    pub ls_output: Mutex<String>,
    /// Successive answers for the address query; each capture pops one.
    /// `Err` entries simulate a failing `docker exec`.
    pub addresses: Mutex<VecDeque<Result<String>>>,
    /// Spawned commands whose argv contains one of these substrings exit
    /// non-zero.
    pub fail_contains: Mutex<Vec<String>>,
    /// Artificial delay before each spawned command resolves. Lets tests
    /// overlap two operations.
    pub spawn_delay: Mutex<Option<Duration>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ls_output(&self, output: &str) {
        *self.ls_output.lock().unwrap() = output.to_string();
    }

    pub fn push_address(&self, answer: Result<String>) {
        self.addresses.lock().unwrap().push_back(answer);
    }

    pub fn fail_commands_containing(&self, marker: &str) {
        self.fail_contains.lock().unwrap().push(marker.to_string());
    }

    pub fn set_spawn_delay(&self, delay: Duration) {
        *self.spawn_delay.lock().unwrap() = Some(delay);
    }

    pub fn recorded_calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    /// Recorded argvs joined to strings, for substring assertions.
    pub fn recorded_lines(&self) -> Vec<String> {
        self.recorded_calls().iter().map(|c| c.join(" ")).collect()
    }

    pub fn remaining_addresses(&self) -> usize {
        self.addresses.lock().unwrap().len()
    }

    fn record(&self, argv: &[String]) {
        self.calls.lock().unwrap().push(argv.to_vec());
    }

    fn should_fail(&self, argv: &[String]) -> bool {
        let line = argv.join(" ");
        self.fail_contains
            .lock()
            .unwrap()
            .iter()
            .any(|marker| line.contains(marker))
    }
}

#[async_trait]
impl CommandExecutor for FakeExecutor {
    async fn run(&self, argv: &[String], _cwd: &Path) -> Result<ExitResult> {
        self.record(argv);
        let code = if self.should_fail(argv) { Some(1) } else { Some(0) };
        Ok(ExitResult {
            code,
            stdout: String::new(),
            stderr: String::new(),
        })
    }

    async fn spawn(
        &self,
        argv: &[String],
        cwd: &Path,
        _env: &[(String, String)],
    ) -> Result<ManagedProcess> {
        self.record(argv);
        // copy the delay out so no lock is held across the await
        let delay = *self.spawn_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let exit = if self.should_fail(argv) {
            ExitResult {
                code: Some(1),
                stdout: String::new(),
                stderr: "simulated failure".to_string(),
            }
        } else {
            ExitResult {
                code: Some(0),
                stdout: String::new(),
                stderr: String::new(),
            }
        };
        Ok(ManagedProcess::resolved(
            argv.to_vec(),
            cwd.to_path_buf(),
            exit,
        ))
    }

    async fn capture(&self, argv: &[String]) -> Result<String> {
        self.record(argv);
        let line = argv.join(" ");
        if line.contains(" ls") || line.contains(" ps") {
            return Ok(self.ls_output.lock().unwrap().clone());
        }
        match self.addresses.lock().unwrap().pop_front() {
            Some(answer) => answer,
            None => Ok(String::new()),
        }
    }
}

/// Records every observer notification for later assertions.
#[derive(Default)]
pub struct RecordingObserver {
    pub states: Mutex<Vec<LifecycleState>>,
    pub commands: Mutex<Vec<Vec<String>>>,
    pub errors: Mutex<Vec<(String, String)>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state_labels(&self) -> Vec<&'static str> {
        self.states.lock().unwrap().iter().map(|s| s.label()).collect()
    }

    pub fn error_kinds(&self) -> Vec<String> {
        self.errors
            .lock()
            .unwrap()
            .iter()
            .map(|(kind, _)| kind.clone())
            .collect()
    }
}

impl LauncherObserver for RecordingObserver {
    fn on_state_changed(&self, state: &LifecycleState) {
        self.states.lock().unwrap().push(state.clone());
    }

    fn on_command_issued(&self, argv: &[String]) {
        self.commands.lock().unwrap().push(argv.to_vec());
    }

    fn on_error(&self, kind: &str, message: &str) {
        self.errors
            .lock()
            .unwrap()
            .push((kind.to_string(), message.to_string()));
    }
}

/// A canned process error for scripting failed address queries.
pub fn process_error(stderr: &str) -> Error {
    Error::Process {
        command: "docker exec".to_string(),
        exit_code: Some(1),
        stderr: stderr.to_string(),
    }
}
