//! Error types for snowguard.
//!
//! Defines the main error enum, the stable machine-readable error codes, and
//! the `{error, message, code}` envelope every caller-facing failure is
//! rendered into.

use crate::executor::{CommandOutput, TIMEOUT_EXIT_CODE};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stderr fragments that indicate the warehouse rejected the caller's role.
const PERMISSION_MARKERS: &[&str] = &[
    "insufficient privileges",
    "not authorized",
    "access denied",
    "permission denied",
];

/// Stderr fragments that indicate the referenced object is missing.
const NOT_FOUND_MARKERS: &[&str] = &["does not exist", "not found"];

/// Stable machine-readable error identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidInput,
    ExcludedObject,
    CliError,
    ObjectNotFound,
    PermissionDenied,
    SyncError,
    StalenessCheckError,
}

impl ErrorCode {
    /// Returns the wire form of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::ExcludedObject => "EXCLUDED_OBJECT",
            Self::CliError => "CLI_ERROR",
            Self::ObjectNotFound => "OBJECT_NOT_FOUND",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::SyncError => "SYNC_ERROR",
            Self::StalenessCheckError => "STALENESS_CHECK_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for snowguard operations.
#[derive(Error, Debug)]
pub enum GuardError {
    /// Malformed request or configuration caught by local validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The request touches an object forbidden by an exclusion rule.
    #[error("Excluded object: {0}")]
    ExcludedObject(String),

    /// The warehouse CLI exited with a nonzero status (or timed out).
    #[error("CLI error: {0}")]
    Cli(String),

    /// The requested object does not exist remotely.
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    /// The warehouse refused the operation for the current role.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Fatal failure that aborts a whole repository sync.
    #[error("Sync error: {0}")]
    Sync(String),

    /// Failure while comparing remote DDL with a local copy.
    #[error("Staleness check error: {0}")]
    Staleness(String),
}

impl GuardError {
    /// Creates an invalid input error with the given message.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Creates an excluded object error with the given message.
    pub fn excluded(msg: impl Into<String>) -> Self {
        Self::ExcludedObject(msg.into())
    }

    /// Creates a CLI error with the given message.
    pub fn cli(msg: impl Into<String>) -> Self {
        Self::Cli(msg.into())
    }

    /// Creates an object not found error with the given message.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::ObjectNotFound(msg.into())
    }

    /// Creates a permission denied error with the given message.
    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    /// Creates a sync error with the given message.
    pub fn sync(msg: impl Into<String>) -> Self {
        Self::Sync(msg.into())
    }

    /// Creates a staleness check error with the given message.
    pub fn staleness(msg: impl Into<String>) -> Self {
        Self::Staleness(msg.into())
    }

    /// Maps a failed executor result onto the error taxonomy.
    ///
    /// Timeouts stay `CLI_ERROR`; privilege and missing-object failures are
    /// recognised from stderr text, everything else passes stderr through.
    pub fn from_cli_output(output: &CommandOutput) -> Self {
        let detail = output.failure_detail();

        if output.exit_code == TIMEOUT_EXIT_CODE {
            return Self::cli(format!("Command timed out: {detail}"));
        }

        let lowered = detail.to_lowercase();
        if PERMISSION_MARKERS.iter().any(|m| lowered.contains(m)) {
            Self::permission_denied(detail)
        } else if NOT_FOUND_MARKERS.iter().any(|m| lowered.contains(m)) {
            Self::not_found(detail)
        } else {
            Self::cli(detail)
        }
    }

    /// Returns the stable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidInput(_) => ErrorCode::InvalidInput,
            Self::ExcludedObject(_) => ErrorCode::ExcludedObject,
            Self::Cli(_) => ErrorCode::CliError,
            Self::ObjectNotFound(_) => ErrorCode::ObjectNotFound,
            Self::PermissionDenied(_) => ErrorCode::PermissionDenied,
            Self::Sync(_) => ErrorCode::SyncError,
            Self::Staleness(_) => ErrorCode::StalenessCheckError,
        }
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "Invalid input",
            Self::ExcludedObject(_) => "Excluded object",
            Self::Cli(_) => "CLI error",
            Self::ObjectNotFound(_) => "Object not found",
            Self::PermissionDenied(_) => "Permission denied",
            Self::Sync(_) => "Sync error",
            Self::Staleness(_) => "Staleness check error",
        }
    }

    /// Returns the detail message without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidInput(m)
            | Self::ExcludedObject(m)
            | Self::Cli(m)
            | Self::ObjectNotFound(m)
            | Self::PermissionDenied(m)
            | Self::Sync(m)
            | Self::Staleness(m) => m,
        }
    }

    /// Renders the error into the caller-facing envelope.
    pub fn to_envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            error: self.category().to_string(),
            message: self.message().to_string(),
            code: self.code(),
        }
    }
}

/// Structured failure payload: `{error, message, code}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub message: String,
    pub code: ErrorCode,
}

/// Result type alias using GuardError.
pub type Result<T> = std::result::Result<T, GuardError>;
