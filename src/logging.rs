//! Logging configuration for snowguard.
//!
//! stdout is reserved for JSON responses, so logs go to stderr by default or
//! to a file with `--log-file`. Policy decisions (blocked queries, skipped
//! objects) are emitted on [`AUDIT_TARGET`] so they can be filtered on their
//! own, e.g. `RUST_LOG=warn,snowguard::audit=info`.

use std::fs::{self, File};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Target for audit events.
pub const AUDIT_TARGET: &str = "snowguard::audit";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initializes logging to the log file returned by [`get_log_path`].
///
/// Falls back to stderr if the file cannot be created.
pub fn init_file_logging() {
    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!("Warning: Could not create log directory: {e}");
            init_stderr_logging();
            return;
        }
    }

    let log_file = match File::options().create(true).append(true).open(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not open log file: {e}");
            init_stderr_logging();
            return;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(log_file)
        .with_ansi(false)
        .init();
}

/// Initializes logging to stderr.
pub fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

/// Returns the path for the log file.
///
/// `~/.local/state/snowguard/snowguard.log` on Linux, the config directory
/// elsewhere, the temp directory as a last resort.
pub fn get_log_path() -> PathBuf {
    if let Some(state_dir) = dirs::state_dir() {
        return state_dir.join("snowguard").join("snowguard.log");
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("snowguard").join("snowguard.log");
    }

    std::env::temp_dir().join("snowguard.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_path_is_absolute() {
        let path = get_log_path();
        assert!(path.is_absolute());
    }

    #[test]
    fn test_log_path_ends_with_snowguard_log() {
        let path = get_log_path();
        assert!(path.ends_with("snowguard.log"));
    }

    #[test]
    fn test_audit_target_is_under_crate() {
        assert!(AUDIT_TARGET.starts_with("snowguard::"));
    }
}
