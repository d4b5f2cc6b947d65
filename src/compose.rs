//! Compose CLI detection and argv assembly.
//!
//! Docker ships compose either as the `docker compose` plugin (v2) or as the
//! standalone `docker-compose` binary (v1). Detection runs once per
//! controller and the result is cached; every compose invocation is built
//! from the detected flavor so a host with only one of the two still works.

use std::path::Path;

use crate::error::{Error, Result};
use crate::runner::CommandExecutor;

/// Which compose CLI flavor is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeCli {
    /// `docker compose` plugin.
    V2,
    /// Standalone `docker-compose` binary.
    V1,
}

impl ComposeCli {
    /// Probe for an installed compose CLI, preferring the v2 plugin.
    pub async fn detect(executor: &dyn CommandExecutor) -> Result<Self> {
        let v2_probe = argv(&["docker", "compose", "version"]);
        if let Ok(result) = executor.run(&v2_probe, Path::new(".")).await {
            if result.success() {
                return Ok(ComposeCli::V2);
            }
        }
        let v1_probe = argv(&["docker-compose", "--version"]);
        if let Ok(result) = executor.run(&v1_probe, Path::new(".")).await {
            if result.success() {
                return Ok(ComposeCli::V1);
            }
        }
        Err(Error::Process {
            command: "docker compose version".to_string(),
            exit_code: None,
            stderr: "Neither `docker compose` nor `docker-compose` is available".to_string(),
        })
    }

    fn base(&self, compose_file: &Path) -> Vec<String> {
        let mut args = match self {
            ComposeCli::V2 => vec!["docker".to_string(), "compose".to_string()],
            ComposeCli::V1 => vec!["docker-compose".to_string()],
        };
        args.push("-f".to_string());
        args.push(compose_file.display().to_string());
        args
    }
}

/// `up -d` for the whole group, optionally with `--build`.
pub fn up_args(cli: ComposeCli, compose_file: &Path, build: bool) -> Vec<String> {
    let mut args = cli.base(compose_file);
    args.push("up".to_string());
    args.push("-d".to_string());
    if build {
        args.push("--build".to_string());
    }
    args
}

/// `up -d --force-recreate <service>`. Recreating the service makes it
/// re-read the env file after the overlay address lands.
pub fn recreate_args(cli: ComposeCli, compose_file: &Path, service: &str) -> Vec<String> {
    let mut args = cli.base(compose_file);
    args.push("up".to_string());
    args.push("-d".to_string());
    args.push("--force-recreate".to_string());
    args.push(service.to_string());
    args
}

/// `stop` for the whole group.
pub fn stop_args(cli: ComposeCli, compose_file: &Path) -> Vec<String> {
    let mut args = cli.base(compose_file);
    args.push("stop".to_string());
    args
}

/// List active project groups, quietly. v1 has no `ls`, so it falls back to
/// listing matching containers instead; either way an empty result means
/// nothing to stop.
pub fn ls_args(cli: ComposeCli, filter: &str) -> Vec<String> {
    match cli {
        ComposeCli::V2 => {
            let mut args = vec!["docker".to_string(), "compose".to_string(), "ls".to_string()];
            if !filter.is_empty() {
                args.push("--filter".to_string());
                args.push(format!("name={}", filter));
            }
            args.push("-q".to_string());
            args
        }
        ComposeCli::V1 => {
            let mut args = vec!["docker".to_string(), "ps".to_string()];
            if !filter.is_empty() {
                args.push("--filter".to_string());
                args.push(format!("name={}", filter));
            }
            args.push("-q".to_string());
            args
        }
    }
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn v2_up_with_build() {
        let file = PathBuf::from("docker-compose.yml");
        assert_eq!(
            up_args(ComposeCli::V2, &file, true),
            argv(&["docker", "compose", "-f", "docker-compose.yml", "up", "-d", "--build"])
        );
        assert_eq!(
            up_args(ComposeCli::V2, &file, false),
            argv(&["docker", "compose", "-f", "docker-compose.yml", "up", "-d"])
        );
    }

    #[test]
    fn v1_uses_standalone_binary() {
        let file = PathBuf::from("docker-compose-tailscale.yml");
        let args = stop_args(ComposeCli::V1, &file);
        assert_eq!(args[0], "docker-compose");
        assert!(args.contains(&"stop".to_string()));
    }

    #[test]
    fn recreate_targets_single_service() {
        let file = PathBuf::from("docker-compose-tailscale.yml");
        let args = recreate_args(ComposeCli::V2, &file, "app");
        assert_eq!(args.last().map(String::as_str), Some("app"));
        assert!(args.contains(&"--force-recreate".to_string()));
    }

    #[test]
    fn ls_filter_is_optional() {
        assert_eq!(
            ls_args(ComposeCli::V2, "assetatlas"),
            argv(&["docker", "compose", "ls", "--filter", "name=assetatlas", "-q"])
        );
        assert_eq!(ls_args(ComposeCli::V2, ""), argv(&["docker", "compose", "ls", "-q"]));
        assert_eq!(
            ls_args(ComposeCli::V1, "assetatlas"),
            argv(&["docker", "ps", "--filter", "name=assetatlas", "-q"])
        );
    }
}
