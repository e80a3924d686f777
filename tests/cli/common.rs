//! Common test utilities for binary tests.

use std::path::Path;
use std::process::Command;

/// Runs snowguard with `args` and the config at `config`; returns the exit
/// code, stdout and stderr.
pub fn run(config: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_snowguard"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env_remove("SNOWGUARD_CONFIG")
        .env_remove("SNOWGUARD_CONNECTION")
        .env_remove("SNOWGUARD_WAREHOUSE")
        .env_remove("SNOWGUARD_ROLE")
        .env("RUST_LOG", "error")
        .output()
        .expect("Failed to execute command");

    let exit_code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    (exit_code, stdout, stderr)
}
