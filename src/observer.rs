//! Observer seam for lifecycle progress.
//!
//! The controller reports state changes, issued commands, and errors through
//! this trait instead of printing directly, so the same core drives the CLI
//! today and could drive another frontend later.

use crate::state::LifecycleState;

/// Notifications are delivered synchronously in transition commit order,
/// while the controller holds its state lock; implementations must return
/// promptly and must not call back into the controller.
pub trait LauncherObserver: Send + Sync {
    /// The lifecycle state changed. Called after the transition is committed.
    fn on_state_changed(&self, state: &LifecycleState);

    /// An external command is about to run.
    fn on_command_issued(&self, argv: &[String]);

    /// An error occurred. `kind` is a short machine-readable tag
    /// (see [`crate::error::Error::kind`]).
    fn on_error(&self, kind: &str, message: &str);
}

/// Prints progress to stdout and errors to stderr.
pub struct CliObserver;

impl LauncherObserver for CliObserver {
    fn on_state_changed(&self, state: &LifecycleState) {
        println!("deployment: {}", state);
    }

    fn on_command_issued(&self, argv: &[String]) {
        println!("  $ {}", argv.join(" "));
    }

    fn on_error(&self, kind: &str, message: &str) {
        eprintln!("\x1b[31merror [{}]: {}\x1b[0m", kind, message);
    }
}

/// Discards everything. For embedding and tests.
pub struct NullObserver;

impl LauncherObserver for NullObserver {
    fn on_state_changed(&self, _state: &LifecycleState) {}
    fn on_command_issued(&self, _argv: &[String]) {}
    fn on_error(&self, _kind: &str, _message: &str) {}
}
