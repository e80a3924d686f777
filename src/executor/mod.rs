//! Warehouse CLI execution layer.
//!
//! Provides a trait-based interface over the underlying command-line client
//! so the guardrail and repository engines can be driven by a real
//! subprocess or by an in-memory mock.

mod mock;
mod snow_cli;

pub use mock::MockExecutor;
pub use snow_cli::SnowCli;

use crate::config::CliConfig;
use crate::error::{GuardError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Exit code reserved for commands killed by the timeout.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Raw output of one CLI invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    /// Creates a successful output with the given stdout.
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
        }
    }

    /// Creates a failed output with the given stderr and exit code.
    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    /// Synthetic result for a command killed after `timeout`.
    pub fn timed_out(timeout: Duration) -> Self {
        Self::failure(
            TIMEOUT_EXIT_CODE,
            format!("Command timed out after {}ms", timeout.as_millis()),
        )
    }

    /// Returns true if the command exited with status 0.
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns true if the command was killed by the timeout.
    pub fn is_timeout(&self) -> bool {
        self.exit_code == TIMEOUT_EXIT_CODE
    }

    /// Best available description of a failure: stderr, then stdout.
    pub fn failure_detail(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        format!("exited with code {}", self.exit_code)
    }
}

/// Connection selectors forwarded to the CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOptions {
    pub connection: Option<String>,
    pub warehouse: Option<String>,
    pub role: Option<String>,
}

impl ExecOptions {
    /// Appends the selectors as CLI flags.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        for (flag, value) in [
            ("--connection", &self.connection),
            ("--warehouse", &self.warehouse),
            ("--role", &self.role),
        ] {
            if let Some(value) = value {
                args.push(flag.to_string());
                args.push(value.clone());
            }
        }
        args
    }
}

/// Trait defining the interface for warehouse CLI executors.
///
/// Implementations must never retry and must turn a timeout into a
/// [`CommandOutput`] with [`TIMEOUT_EXIT_CODE`] instead of an error.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Runs the CLI with `args`, killing it once `timeout` elapses.
    async fn execute(
        &self,
        args: &[String],
        options: &ExecOptions,
        timeout: Duration,
    ) -> Result<CommandOutput>;
}

/// Builds the argument vector for running one SQL statement with JSON output.
pub fn sql_args(sql: &str) -> Vec<String> {
    vec![
        "sql".to_string(),
        "-q".to_string(),
        sql.to_string(),
        "--format".to_string(),
        "json".to_string(),
    ]
}

/// An executor bound to connection options and a timeout.
///
/// Every warehouse round-trip in the crate goes through a session so the
/// options and timeout are applied uniformly.
#[derive(Clone)]
pub struct Session {
    executor: Arc<dyn CommandExecutor>,
    options: ExecOptions,
    timeout: Duration,
}

impl Session {
    /// Creates a session with explicit options.
    pub fn new(executor: Arc<dyn CommandExecutor>, options: ExecOptions, timeout: Duration) -> Self {
        Self {
            executor,
            options,
            timeout,
        }
    }

    /// Creates a session from the `[cli]` configuration section.
    pub fn from_config(executor: Arc<dyn CommandExecutor>, config: &CliConfig) -> Self {
        Self::new(executor, config.exec_options(), config.timeout())
    }

    /// Runs a SQL statement and returns the raw output, whatever its exit code.
    pub async fn run_sql_raw(&self, sql: &str) -> Result<CommandOutput> {
        debug!(sql, "Running SQL through warehouse CLI");
        self.executor
            .execute(&sql_args(sql), &self.options, self.timeout)
            .await
    }

    /// Runs a SQL statement, mapping a nonzero exit onto [`GuardError`].
    pub async fn run_sql(&self, sql: &str) -> Result<String> {
        let output = self.run_sql_raw(sql).await?;
        if output.is_success() {
            Ok(output.stdout)
        } else {
            Err(GuardError::from_cli_output(&output))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_detail_prefers_stderr() {
        let output = CommandOutput {
            stdout: "partial".to_string(),
            stderr: "  boom \n".to_string(),
            exit_code: 1,
        };
        assert_eq!(output.failure_detail(), "boom");

        let output = CommandOutput::failure(3, "");
        assert_eq!(output.failure_detail(), "exited with code 3");
    }

    #[test]
    fn test_timed_out_uses_reserved_code() {
        let output = CommandOutput::timed_out(Duration::from_millis(1500));
        assert!(output.is_timeout());
        assert!(!output.is_success());
        assert_eq!(output.stderr, "Command timed out after 1500ms");
    }

    #[test]
    fn test_exec_options_to_args() {
        let options = ExecOptions {
            connection: Some("dev".to_string()),
            warehouse: None,
            role: Some("ANALYST".to_string()),
        };
        assert_eq!(
            options.to_args(),
            vec!["--connection", "dev", "--role", "ANALYST"]
        );
        assert!(ExecOptions::default().to_args().is_empty());
    }

    #[test]
    fn test_command_output_json_shape() {
        let json = serde_json::to_value(CommandOutput::success("[]")).unwrap();
        assert_eq!(json["exitCode"], 0);
        assert_eq!(json["stdout"], "[]");
    }

    #[tokio::test]
    async fn test_session_maps_failures() {
        let mock = MockExecutor::new().on("FORBIDDEN", CommandOutput::failure(1, "Insufficient privileges"));
        let session = Session::new(Arc::new(mock), ExecOptions::default(), DEFAULT_TIMEOUT);

        let err = session.run_sql("SELECT * FROM FORBIDDEN").await.unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::PermissionDenied);

        let ok = session.run_sql("SHOW DATABASES").await.unwrap();
        assert_eq!(ok, "[]");
    }
}
