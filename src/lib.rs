//! dockhand: launch and tear down a multi-container deployment in local or
//! overlay-network mode.
//!
//! The core is [`controller::LifecycleController`], which drives compose
//! against an injected [`runner::CommandExecutor`] and reports progress
//! through a [`observer::LauncherObserver`]. The binary in `main.rs` wires
//! the production implementations together; tests drive the controller with
//! fakes.

pub mod cli;
pub mod compose;
pub mod config;
pub mod controller;
pub mod discovery;
pub mod env_store;
pub mod error;
pub mod observer;
pub mod runner;
pub mod state;

pub use config::{DiscoveryPolicy, LauncherConfig};
pub use controller::LifecycleController;
pub use error::{Error, Result};
pub use state::{DeploymentMode, LifecycleState};
