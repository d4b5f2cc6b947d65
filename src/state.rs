use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Network exposure mode for the deployment.
///
/// Determines which compose file is used, whether an auth key is required,
/// and whether overlay address discovery runs after startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    /// Reachable only on this machine (`http://localhost:<port>`).
    Local,
    /// Exposed on the overlay network via the tailnet sidecar container.
    Overlay,
}

impl DeploymentMode {
    /// Whether this mode requires a saved auth key before anything is started.
    pub fn requires_credential(&self) -> bool {
        matches!(self, DeploymentMode::Overlay)
    }

    /// Whether the runtime-assigned overlay address must be discovered.
    pub fn requires_discovery(&self) -> bool {
        matches!(self, DeploymentMode::Overlay)
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentMode::Local => write!(f, "local"),
            DeploymentMode::Overlay => write!(f, "overlay"),
        }
    }
}

impl FromStr for DeploymentMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(DeploymentMode::Local),
            "overlay" => Ok(DeploymentMode::Overlay),
            other => Err(Error::Validation(format!(
                "Unknown mode '{}' (expected 'local' or 'overlay')",
                other
            ))),
        }
    }
}

/// Current lifecycle state of the deployment.
///
/// Exactly one instance exists, owned by the controller; observers only ever
/// see it through notifications. `Idle` is both the initial state and the
/// state after any `stop`. `Failed` is transient: the next `start` treats it
/// as `Idle`.
///
/// ```text
/// Idle ──► Starting ──► Running
///   ▲          │           │
///   │          ▼           ▼
///   └───── Stopping ◄── Failed
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleState {
    /// Nothing running (as far as this controller is concerned).
    Idle,
    /// A `start` operation is in flight.
    Starting,
    /// Deployment is up; carries the URL it is reachable at.
    Running(String),
    /// A `stop` operation is in flight.
    Stopping,
    /// The last operation failed; carries the reason.
    Failed(String),
}

impl LifecycleState {
    /// Short label without the URL/reason payload, for error messages.
    pub fn label(&self) -> &'static str {
        match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Starting => "starting",
            LifecycleState::Running(_) => "running",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Failed(_) => "failed",
        }
    }

    /// Check whether a transition is valid according to the state machine.
    ///
    /// `start` is only accepted from `Idle` or `Failed`; `stop` from anything
    /// except `Stopping`. A failed start may fall back to `Idle` directly
    /// (credential gate) or land in `Failed` (external process failure).
    pub fn is_valid_transition(&self, to: &LifecycleState) -> bool {
        use LifecycleState::*;
        match (self, to) {
            (Idle, Starting) | (Failed(_), Starting) => true,
            (Starting, Running(_)) | (Starting, Failed(_)) | (Starting, Idle) => true,
            (Stopping, Idle) => true,
            // stop is accepted from every state except an in-flight stop
            (Stopping, Stopping) => false,
            (_, Stopping) => true,
            _ => false,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Idle => write!(f, "idle"),
            LifecycleState::Starting => write!(f, "starting"),
            LifecycleState::Running(url) => write!(f, "running ({})", url),
            LifecycleState::Stopping => write!(f, "stopping"),
            LifecycleState::Failed(reason) => write!(f, "failed ({})", reason),
        }
    }
}
