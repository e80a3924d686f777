//! Subprocess executor for the Snowflake CLI.

use super::{CommandExecutor, CommandOutput, ExecOptions};
use crate::error::{GuardError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs the warehouse CLI as a child process.
#[derive(Debug, Clone)]
pub struct SnowCli {
    binary: PathBuf,
}

impl SnowCli {
    /// Creates an executor for the given CLI binary (e.g. `snow`).
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn build_command(&self, args: &[String], options: &ExecOptions) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .args(options.to_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl Default for SnowCli {
    fn default() -> Self {
        Self::new("snow")
    }
}

#[async_trait]
impl CommandExecutor for SnowCli {
    async fn execute(
        &self,
        args: &[String],
        options: &ExecOptions,
        timeout: Duration,
    ) -> Result<CommandOutput> {
        let child = self.build_command(args, options).spawn().map_err(|e| {
            GuardError::cli(format!(
                "Failed to spawn {}: {e}",
                self.binary.display()
            ))
        })?;

        // Dropping the pending future on expiry drops the child, which kills it.
        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let exit_code = output.status.code().unwrap_or(-1);
                debug!(exit_code, "Warehouse CLI finished");
                Ok(CommandOutput {
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    exit_code,
                })
            }
            Ok(Err(e)) => Err(GuardError::cli(format!(
                "Failed to wait for {}: {e}",
                self.binary.display()
            ))),
            Err(_elapsed) => {
                warn!(
                    "{} timed out after {:?}; process killed",
                    self.binary.display(),
                    timeout
                );
                Ok(CommandOutput::timed_out(timeout))
            }
        }
    }
}
