//! Reboot execution
//!
//! Launches the configured reboot command as a detached child process. The
//! acknowledgement reply is sent before this runs, so the host going down
//! mid-poll is the expected outcome, not a failure.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{error, info};

use crate::core::RebootExecutor;

pub struct ProcessReboot {
    argv: Vec<String>,
}

impl ProcessReboot {
    pub fn new(argv: Vec<String>) -> Result<Self> {
        if argv.is_empty() {
            bail!("reboot command must not be empty");
        }
        Ok(Self { argv })
    }
}

#[async_trait]
impl RebootExecutor for ProcessReboot {
    async fn launch_reboot(&self) -> Result<()> {
        info!(command = ?self.argv, "Launching reboot command");

        let mut child = Command::new(&self.argv[0])
            .args(&self.argv[1..])
            .spawn()
            .with_context(|| format!("failed to spawn reboot command {:?}", self.argv))?;

        // Reap in the background. A reboot that works never reports back,
        // so only failures are worth logging.
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => {
                    info!("Reboot command exited cleanly");
                }
                Ok(status) => {
                    error!(%status, "Reboot command failed");
                }
                Err(e) => {
                    error!(error = %e, "Could not wait on reboot command");
                }
            }
        });

        Ok(())
    }
}
