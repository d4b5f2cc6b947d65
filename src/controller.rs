//! Deployment lifecycle controller.
//!
//! Owns the single lifecycle state machine and drives the whole launch and
//! teardown sequence: seeding the env file, the overlay credential gate,
//! compose up/stop, address discovery, and the post-discovery recreate of the
//! application service. Every side effect flows through the injected
//! [`CommandExecutor`] and every observable event through the injected
//! [`LauncherObserver`].

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::compose::{self, ComposeCli};
use crate::config::LauncherConfig;
use crate::discovery::AddressDiscoverer;
use crate::env_store::EnvStore;
use crate::error::{Error, Result};
use crate::observer::LauncherObserver;
use crate::runner::{CommandExecutor, ManagedProcess};
use crate::state::{DeploymentMode, LifecycleState};

pub struct LifecycleController {
    config: LauncherConfig,
    store: EnvStore,
    executor: Arc<dyn CommandExecutor>,
    observer: Arc<dyn LauncherObserver>,
    state: Mutex<LifecycleState>,
    compose_cli: OnceCell<ComposeCli>,
    launched: Mutex<Vec<ManagedProcess>>,
    cancel: CancellationToken,
}

impl LifecycleController {
    pub fn new(
        config: LauncherConfig,
        executor: Arc<dyn CommandExecutor>,
        observer: Arc<dyn LauncherObserver>,
    ) -> Self {
        let store = EnvStore::new(config.env_file_path());
        Self {
            config,
            store,
            executor,
            observer,
            state: Mutex::new(LifecycleState::Idle),
            compose_cli: OnceCell::new(),
            launched: Mutex::new(Vec::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.state.lock().clone()
    }

    pub fn env_store(&self) -> &EnvStore {
        &self.store
    }

    /// Launch the deployment in the given mode. Returns the URL it is
    /// reachable at.
    ///
    /// Accepted only from `Idle` or `Failed`; a second caller racing in while
    /// a start is in flight gets `InvalidState` without side effects. On
    /// failure the containers are left as they are for inspection.
    pub async fn start(&self, mode: DeploymentMode, rebuild: bool) -> Result<String> {
        self.begin("start", LifecycleState::Starting)?;
        info!(%mode, rebuild, "starting deployment");

        match self.run_start(mode, rebuild).await {
            Ok(url) => {
                self.set_state(LifecycleState::Running(url.clone()));
                info!(url, "deployment running");
                Ok(url)
            }
            Err(e) => {
                self.observer.on_error(e.kind(), &e.to_string());
                // a rejected precondition leaves nothing half-started
                if matches!(e, Error::MissingCredential) {
                    self.set_state(LifecycleState::Idle);
                } else {
                    self.set_state(LifecycleState::Failed(e.to_string()));
                }
                Err(e)
            }
        }
    }

    async fn run_start(&self, mode: DeploymentMode, rebuild: bool) -> Result<String> {
        let local_address = self.config.local_address();
        self.store.seed_defaults(&[
            (self.config.address_key.as_str(), local_address.as_str()),
            (self.config.auth_key_name.as_str(), ""),
        ])?;

        // the credential gate runs before any external command
        let auth_key = if mode.requires_credential() {
            match self.store.get(&self.config.auth_key_name)? {
                Some(key) if !key.trim().is_empty() => Some(key),
                _ => return Err(Error::MissingCredential),
            }
        } else {
            None
        };

        let cli = self.compose_cli().await?;
        self.stop_leftovers(cli).await;

        if mode == DeploymentMode::Local {
            self.store
                .set(&self.config.address_key, &self.config.local_address())?;
        }

        let env: Vec<(String, String)> = auth_key
            .into_iter()
            .map(|key| (self.config.auth_key_name.clone(), key))
            .collect();
        let compose_file = self.config.compose_file(mode);
        self.spawn_and_wait(compose::up_args(cli, &compose_file, rebuild), &env)
            .await?;

        let url = if mode.requires_discovery() {
            let discoverer = AddressDiscoverer::new(
                Arc::clone(&self.executor),
                self.config.discovery,
                self.cancel.clone(),
            );
            let address = discoverer.discover(&self.config.overlay_container).await?;
            self.store.set(
                &self.config.address_key,
                &format!("{}:{}", address, self.config.port),
            )?;
            // recreate so the app re-reads the env file with the real address
            self.spawn_and_wait(
                compose::recreate_args(cli, &compose_file, &self.config.app_service),
                &env,
            )
            .await?;
            format!("http://{}:{}", address, self.config.port)
        } else {
            format!("http://localhost:{}", self.config.port)
        };

        Ok(url)
    }

    /// Tear down the deployment. Both compose groups are stopped so a mode
    /// switch never strands the other mode's containers.
    ///
    /// Rejected only while another stop is in flight. The state always ends
    /// at `Idle`, even if some stop commands failed; failures are surfaced in
    /// the returned error.
    pub async fn stop(&self) -> Result<()> {
        self.begin("stop", LifecycleState::Stopping)?;
        info!("stopping deployment");

        let result = self.run_stop().await;
        if let Err(e) = &result {
            self.observer.on_error(e.kind(), &e.to_string());
        }
        self.set_state(LifecycleState::Idle);
        result
    }

    async fn run_stop(&self) -> Result<()> {
        let cli = self.compose_cli().await?;
        if self.active_groups(cli).await?.is_empty() {
            debug!("no active project groups, nothing to stop");
            return Ok(());
        }

        let mut failures = Vec::new();
        for mode in [DeploymentMode::Local, DeploymentMode::Overlay] {
            let compose_file = self.config.compose_file(mode);
            if let Err(e) = self
                .spawn_and_wait(compose::stop_args(cli, &compose_file), &[])
                .await
            {
                warn!(%mode, error = %e, "stop command failed, continuing");
                failures.push(e);
            }
        }

        match failures.len() {
            0 => Ok(()),
            1 => Err(failures.swap_remove(0)),
            _ => Err(Error::Multiple(failures)),
        }
    }

    /// Persist the overlay auth key. No state transition; the key is only
    /// consulted at the next overlay start.
    pub fn save_credential(&self, value: &str) -> Result<()> {
        let trimmed = value.trim();
        let result = if trimmed.is_empty() {
            Err(Error::Validation("Auth key must not be empty".to_string()))
        } else {
            self.store.set(&self.config.auth_key_name, trimmed)
        };
        match result {
            Ok(()) => {
                info!("auth key saved");
                Ok(())
            }
            Err(e) => {
                self.observer.on_error(e.kind(), &e.to_string());
                Err(e)
            }
        }
    }

    /// Cancel in-flight waits and report any process that was never awaited.
    /// Processes are reported, not killed; the deployment outlives the
    /// launcher on purpose.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        let launched = self.launched.lock();
        for proc in launched.iter() {
            if proc.exit_code().is_none() {
                warn!(
                    command = %proc.command_line(),
                    cwd = %proc.working_dir().display(),
                    "process not awaited at shutdown"
                );
                self.observer.on_error(
                    "process",
                    &format!("'{}' was still running at shutdown", proc.command_line()),
                );
            }
        }
    }

    /// Guarded entry into an operation. Checks the transition under the lock
    /// and commits it atomically. The notification is delivered while the
    /// lock is held so observers see transitions in commit order; observers
    /// must not call back into the controller.
    fn begin(&self, operation: &str, to: LifecycleState) -> Result<()> {
        let current = {
            let mut state = self.state.lock();
            if state.is_valid_transition(&to) {
                *state = to.clone();
                self.observer.on_state_changed(&to);
                return Ok(());
            }
            state.label()
        };
        let err = Error::InvalidState {
            operation: operation.to_string(),
            state: current.to_string(),
        };
        self.observer.on_error(err.kind(), &err.to_string());
        Err(err)
    }

    fn set_state(&self, to: LifecycleState) {
        let mut state = self.state.lock();
        *state = to.clone();
        self.observer.on_state_changed(&to);
    }

    async fn compose_cli(&self) -> Result<ComposeCli> {
        self.compose_cli
            .get_or_try_init(|| async { ComposeCli::detect(self.executor.as_ref()).await })
            .await
            .map(|cli| *cli)
    }

    /// Project groups currently known to compose, filtered to this
    /// deployment.
    async fn active_groups(&self, cli: ComposeCli) -> Result<Vec<String>> {
        let output = self
            .executor
            .capture(&compose::ls_args(cli, &self.config.project_filter))
            .await?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Best-effort stop of whatever a previous run left behind, so `up` never
    /// collides with a half-alive group. Failures here only warn.
    async fn stop_leftovers(&self, cli: ComposeCli) {
        let groups = match self.active_groups(cli).await {
            Ok(groups) => groups,
            Err(e) => {
                warn!(error = %e, "could not list active groups, skipping pre-start stop");
                return;
            }
        };
        if groups.is_empty() {
            return;
        }
        debug!(count = groups.len(), "stopping leftover project groups");
        for mode in [DeploymentMode::Local, DeploymentMode::Overlay] {
            let compose_file = self.config.compose_file(mode);
            if let Err(e) = self
                .spawn_and_wait(compose::stop_args(cli, &compose_file), &[])
                .await
            {
                warn!(%mode, error = %e, "pre-start stop failed, continuing");
            }
        }
    }

    /// Spawn a command, track its handle, and wait for it. Waits are
    /// interruptible by [`Self::shutdown`]; a non-zero exit becomes
    /// [`Error::Process`].
    async fn spawn_and_wait(&self, argv: Vec<String>, env: &[(String, String)]) -> Result<()> {
        self.observer.on_command_issued(&argv);
        let mut proc = self
            .executor
            .spawn(&argv, &self.config.work_dir, env)
            .await?;
        let waited = tokio::select! {
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            result = proc.wait() => result,
        };
        let command_line = proc.command_line();
        self.launched.lock().push(proc);
        let exit = waited?;
        if exit.success() {
            Ok(())
        } else {
            Err(Error::Process {
                command: command_line,
                exit_code: exit.code,
                stderr: exit.stderr.trim().to_string(),
            })
        }
    }
}
