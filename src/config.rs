//! Launcher configuration.
//!
//! Everything deployment-specific lives here: compose file names, the env
//! file path, the well-known env keys, the service port, and the discovery
//! retry policy. All fields have serde defaults so an empty (or absent)
//! config file yields a working configuration; a YAML file and CLI flags
//! override individual fields.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Retry policy for overlay address discovery.
///
/// The overlay sidecar assigns its address asynchronously after the container
/// group is up, so readiness is only observable by polling. The interval is
/// fixed, not exponential: the expected wait is dominated by sidecar
/// authentication, and backing off would only stretch the common case.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DiscoveryPolicy {
    /// Maximum number of address queries before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between attempts (in milliseconds).
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// One-time delay before the first attempt (in milliseconds). The sidecar
    /// needs a moment to initialize its network state before any query is
    /// meaningful.
    #[serde(default = "default_post_start_delay_ms")]
    pub post_start_delay_ms: u64,
}

impl Default for DiscoveryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval_ms: default_interval_ms(),
            post_start_delay_ms: default_post_start_delay_ms(),
        }
    }
}

impl DiscoveryPolicy {
    /// Get the inter-attempt delay as a Duration.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Get the initial delay as a Duration.
    pub fn post_start_delay(&self) -> Duration {
        Duration::from_millis(self.post_start_delay_ms)
    }

    /// Validate the policy and return errors if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::Validation(
                "discovery max_attempts must be at least 1".to_string(),
            ));
        }
        if self.interval_ms > 60_000 {
            return Err(Error::Validation(
                "discovery interval_ms should not exceed 60 seconds".to_string(),
            ));
        }
        Ok(())
    }
}

/// Main launcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LauncherConfig {
    /// Directory containing the compose files; all external commands run here.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Env file consumed by the deployment, relative to `work_dir` unless
    /// absolute.
    #[serde(default = "default_env_file")]
    pub env_file: PathBuf,

    /// Compose file used in local mode.
    #[serde(default = "default_local_compose_file")]
    pub local_compose_file: String,

    /// Compose file used in overlay mode.
    #[serde(default = "default_overlay_compose_file")]
    pub overlay_compose_file: String,

    /// The application service inside the compose files; recreated after the
    /// overlay address lands so it re-reads the env file.
    #[serde(default = "default_app_service")]
    pub app_service: String,

    /// Container running the overlay sidecar, target of the address query.
    #[serde(default = "default_overlay_container")]
    pub overlay_container: String,

    /// Substring used to filter `compose ls` output down to this deployment's
    /// project groups. Empty means no filter.
    #[serde(default = "default_project_filter")]
    pub project_filter: String,

    /// Env key holding the host:port the deployment binds to.
    #[serde(default = "default_address_key")]
    pub address_key: String,

    /// Env key holding the overlay auth key.
    #[serde(default = "default_auth_key_name")]
    pub auth_key_name: String,

    /// Port the deployment listens on; part of every produced URL.
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub discovery: DiscoveryPolicy,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            env_file: default_env_file(),
            local_compose_file: default_local_compose_file(),
            overlay_compose_file: default_overlay_compose_file(),
            app_service: default_app_service(),
            overlay_container: default_overlay_container(),
            project_filter: default_project_filter(),
            address_key: default_address_key(),
            auth_key_name: default_auth_key_name(),
            port: default_port(),
            discovery: DiscoveryPolicy::default(),
        }
    }
}

impl LauncherConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: LauncherConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Absolute-or-workdir-relative path of the env file.
    pub fn env_file_path(&self) -> PathBuf {
        if self.env_file.is_absolute() {
            self.env_file.clone()
        } else {
            self.work_dir.join(&self.env_file)
        }
    }

    /// Compose file for the given mode, resolved against `work_dir`.
    pub fn compose_file(&self, mode: crate::state::DeploymentMode) -> PathBuf {
        let name = match mode {
            crate::state::DeploymentMode::Local => &self.local_compose_file,
            crate::state::DeploymentMode::Overlay => &self.overlay_compose_file,
        };
        self.work_dir.join(name)
    }

    /// The address value written to the env file for local mode.
    pub fn local_address(&self) -> String {
        format!("localhost:{}", self.port)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(Error::Validation("port must be non-zero".to_string()));
        }
        if self.local_compose_file.is_empty() || self.overlay_compose_file.is_empty() {
            return Err(Error::Validation(
                "compose file names must not be empty".to_string(),
            ));
        }
        if self.app_service.is_empty() {
            return Err(Error::Validation(
                "app_service must not be empty".to_string(),
            ));
        }
        if self.overlay_container.is_empty() {
            return Err(Error::Validation(
                "overlay_container must not be empty".to_string(),
            ));
        }
        self.discovery.validate()
    }
}

// Default value functions for serde
fn default_work_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_env_file() -> PathBuf {
    PathBuf::from(".env")
}
fn default_local_compose_file() -> String {
    "docker-compose-local.yml".to_string()
}
fn default_overlay_compose_file() -> String {
    "docker-compose-tailscale.yml".to_string()
}
fn default_app_service() -> String {
    "app".to_string()
}
fn default_overlay_container() -> String {
    "tailscale".to_string()
}
fn default_project_filter() -> String {
    "assetatlas".to_string()
}
fn default_address_key() -> String {
    "IP".to_string()
}
fn default_auth_key_name() -> String {
    "TS_AUTH_KEY".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_max_attempts() -> u32 {
    20
}
fn default_interval_ms() -> u64 {
    3_000
}
fn default_post_start_delay_ms() -> u64 {
    5_000
}
