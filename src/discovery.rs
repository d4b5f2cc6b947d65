//! Overlay address discovery.
//!
//! The tailnet sidecar gets its address some time after its container is up,
//! and the only way to observe it is to ask the sidecar itself. This module
//! polls `tailscale ip -4` inside the container on a fixed interval until a
//! non-empty answer arrives or the attempt budget runs out.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::DiscoveryPolicy;
use crate::error::{Error, Result};
use crate::runner::CommandExecutor;

pub struct AddressDiscoverer {
    executor: Arc<dyn CommandExecutor>,
    policy: DiscoveryPolicy,
    cancel: CancellationToken,
}

impl AddressDiscoverer {
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        policy: DiscoveryPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            executor,
            policy,
            cancel,
        }
    }

    /// Poll the sidecar container until it reports an IPv4 address.
    ///
    /// Query failures count as attempts like empty answers do: while the
    /// sidecar is still coming up, `docker exec` itself can fail, and that is
    /// the same "not ready yet" condition. The attempt budget is the only
    /// thing that turns persistent failure into an error.
    pub async fn discover(&self, container: &str) -> Result<String> {
        let query: Vec<String> = ["docker", "exec", container, "tailscale", "ip", "-4"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        self.sleep(self.policy.post_start_delay()).await?;

        for attempt in 1..=self.policy.max_attempts {
            match self.executor.capture(&query).await {
                Ok(output) => {
                    let address = output.lines().next().unwrap_or("").trim();
                    if !address.is_empty() {
                        info!(address, attempt, "overlay address discovered");
                        return Ok(address.to_string());
                    }
                    debug!(attempt, "sidecar has no address yet");
                }
                Err(e) => {
                    debug!(attempt, error = %e, "address query failed, retrying");
                }
            }
            if attempt < self.policy.max_attempts {
                self.sleep(self.policy.interval()).await?;
            }
        }

        Err(Error::DiscoveryTimeout {
            attempts_made: self.policy.max_attempts,
        })
    }

    async fn sleep(&self, duration: Duration) -> Result<()> {
        if duration.is_zero() {
            return Ok(());
        }
        tokio::select! {
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}
