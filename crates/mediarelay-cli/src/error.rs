//! CLI-specific error types and mappings.
//!
//! Maps relay, history and file errors to exit codes and user-facing
//! messages.

use mediarelay_core::{HistoryError, RelayError};
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// The relay job failed.
    #[error("{0}")]
    Relay(String),

    /// Argument error (e.g. an unknown destination id).
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// IO error (file not found, permission denied, etc.).
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error (unreadable destinations file, bad client settings).
    #[error("Configuration error: {0}")]
    Config(String),

    /// History file error.
    #[error("History error: {0}")]
    History(String),
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow Unix conventions:
    /// - 0: Success
    /// - 1: General error (the relay itself failed)
    /// - 2: Misuse of shell command (invalid arguments)
    /// - 64-78: Reserved for specific error categories (see sysexits.h)
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Relay(_) => 1,
            Self::Arguments(_) => 2, // EX_USAGE
            Self::Io(_) => 74,       // EX_IOERR
            Self::Config(_) => 78,   // EX_CONFIG
            Self::History(_) => 73,  // EX_CANTCREAT (closest fit)
        }
    }
}

impl From<RelayError> for CliError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::InvalidRequest { message } => Self::Arguments(message),
            RelayError::History { message } => Self::History(message),
            other => Self::Relay(other.user_message()),
        }
    }
}

impl From<HistoryError> for CliError {
    fn from(err: HistoryError) -> Self {
        Self::History(err.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
