//! Application error types with rich context

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Backend Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Backend daemon not found. Ensure 'dbenchd' is in your PATH.")]
    BackendNotFound,

    #[error("Backend error: {message}")]
    Backend { message: String },

    #[error("Backend process error: {message}")]
    Process { message: String },

    #[error("Failed to spawn backend process: {reason}")]
    ProcessSpawn { reason: String },

    #[error("Backend process exited unexpectedly with code: {code:?}")]
    ProcessExit { code: Option<i32> },

    #[error("RPC protocol error: {message}")]
    Protocol { message: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    // ─────────────────────────────────────────────────────────────
    // Channel/Communication Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Channel send error: {message}")]
    ChannelSend { message: String },

    #[error("Channel closed unexpectedly")]
    ChannelClosed,
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    pub fn process(message: impl Into<String>) -> Self {
        Self::Process {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn channel_send(message: impl Into<String>) -> Self {
        Self::ChannelSend {
            message: message.into(),
        }
    }

    /// Check if this is a recoverable error
    ///
    /// Recoverable errors degrade state (logged, shown in the console)
    /// instead of terminating the shell.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Backend { .. }
                | Error::Protocol { .. }
                | Error::Process { .. }
                | Error::ChannelSend { .. }
        )
    }

    /// Check if this error should trigger application exit
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::BackendNotFound | Error::ProcessSpawn { .. } | Error::ConfigNotFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = Error::backend("device unauthorized");
        assert_eq!(err.to_string(), "Backend error: device unauthorized");

        let err = Error::BackendNotFound;
        assert!(err.to_string().contains("dbenchd"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_is_fatal() {
        assert!(Error::BackendNotFound.is_fatal());
        assert!(Error::ProcessSpawn {
            reason: "denied".into()
        }
        .is_fatal());
        assert!(!Error::backend("test").is_fatal());
    }

    #[test]
    fn test_error_is_recoverable() {
        assert!(Error::backend("test").is_recoverable());
        assert!(Error::protocol("parse error").is_recoverable());
        assert!(!Error::BackendNotFound.is_recoverable());
    }

    #[test]
    fn test_error_constructors() {
        let _ = Error::backend("test");
        let _ = Error::process("test");
        let _ = Error::protocol("test");
        let _ = Error::config("test");
        let _ = Error::channel_send("test");
    }
}
