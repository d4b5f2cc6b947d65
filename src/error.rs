use miette::Diagnostic;
use std::io;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("Command '{command}' failed{}: {stderr}", .exit_code.map(|c| format!(" (exit code {})", c)).unwrap_or_default())]
    #[diagnostic(
        code(dockhand::process::error),
        help("Check that Docker is running with `docker ps` and that the command exists")
    )]
    Process {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("No overlay address after {attempts_made} attempts")]
    #[diagnostic(
        code(dockhand::discovery::timeout),
        help("The overlay sidecar may still be authenticating. Check its logs with `docker logs <container>`; the containers were left running for inspection")
    )]
    DiscoveryTimeout { attempts_made: u32 },

    #[error("No overlay auth key saved")]
    #[diagnostic(
        code(dockhand::credential::missing),
        help("Save a key first with: dockhand save-key <value>")
    )]
    MissingCredential,

    #[error("Cannot {operation} while the deployment is {state}")]
    #[diagnostic(code(dockhand::lifecycle::invalid_state))]
    InvalidState { operation: String, state: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Multiple errors occurred:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Multiple(Vec<Error>),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Short machine-readable kind, used when reporting through an observer.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Process { .. } => "process",
            Error::DiscoveryTimeout { .. } => "discovery-timeout",
            Error::MissingCredential => "missing-credential",
            Error::InvalidState { .. } => "invalid-state",
            Error::Io(_) => "io",
            Error::Validation(_) => "validation",
            Error::Yaml(_) => "config",
            Error::Cancelled => "cancelled",
            Error::Multiple(_) => "multiple",
        }
    }

    /// Returns a helpful suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Error::Process { stderr, .. }
                if stderr.contains("Cannot connect to the Docker daemon") =>
            {
                Some("Docker daemon is not running. Start Docker and retry.".to_string())
            }
            Error::Process { .. } => Some(
                "Check that Docker and the compose plugin are installed and on PATH".to_string(),
            ),
            Error::DiscoveryTimeout { .. } => Some(
                "The containers were left running. Inspect the overlay sidecar logs, then run `dockhand stop` when done.".to_string(),
            ),
            Error::MissingCredential => {
                Some("Save an auth key first with: dockhand save-key <value>".to_string())
            }
            Error::InvalidState { state, .. } => Some(format!(
                "Wait for the current operation to finish (deployment is {})",
                state
            )),
            _ => None,
        }
    }

    /// Formats the error with its suggestion (if any) for user-friendly display.
    pub fn with_suggestion(&self) -> String {
        match self.suggestion() {
            Some(suggestion) => format!("{}\n\nHint: {}", self, suggestion),
            None => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_error_includes_exit_code_and_stderr() {
        let err = Error::Process {
            command: "docker compose up".to_string(),
            exit_code: Some(1),
            stderr: "no such file".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("docker compose up"));
        assert!(display.contains("exit code 1"));
        assert!(display.contains("no such file"));
    }

    #[test]
    fn process_error_without_exit_code() {
        let err = Error::Process {
            command: "docker".to_string(),
            exit_code: None,
            stderr: "not found".to_string(),
        };
        assert!(!err.to_string().contains("exit code"));
    }

    #[test]
    fn discovery_timeout_reports_attempts() {
        let err = Error::DiscoveryTimeout { attempts_made: 20 };
        assert!(err.to_string().contains("20 attempts"));
        assert_eq!(err.kind(), "discovery-timeout");
    }

    #[test]
    fn multiple_errors_are_listed() {
        let err = Error::Multiple(vec![
            Error::Validation("first".to_string()),
            Error::Validation("second".to_string()),
        ]);
        let display = err.to_string();
        assert!(display.contains("first"));
        assert!(display.contains("second"));
    }

    #[test]
    fn suggestions_exist_for_operator_facing_errors() {
        assert!(Error::MissingCredential.suggestion().is_some());
        assert!(Error::DiscoveryTimeout { attempts_made: 3 }
            .suggestion()
            .is_some());
        assert!(Error::Cancelled.suggestion().is_none());
    }
}
