//! Error taxonomy and telemetry reporting.

use serde::Serialize;
use thiserror::Error;

/// Broad classification used when deciding how a failure is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Connection refused, dropped, or failing mid-session. Retried.
    Transport,
    /// Malformed or unrecognized inbound message. Dropped.
    Protocol,
    /// Render or mutation failure. Abandoned and reported.
    Application,
    /// Rejected credential. Terminal.
    Authorization,
}

/// Errors raised by the synchronization layer.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SyncError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Gave up after {attempts} reconnect attempts")]
    RetriesExhausted { attempts: u32 },
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl SyncError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Transport(_) | SyncError::RetriesExhausted { .. } | SyncError::InvalidUrl(_) => {
                ErrorKind::Transport
            }
            SyncError::Protocol(_) => ErrorKind::Protocol,
            SyncError::Unauthorized(_) => ErrorKind::Authorization,
        }
    }
}

/// Top-level error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Mutation failed: {0}")]
    Mutation(String),
}

impl CoreError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Sync(e) => e.kind(),
            CoreError::Config(_) | CoreError::Io(_) | CoreError::Mutation(_) => ErrorKind::Application,
            CoreError::Serialization(_) => ErrorKind::Protocol,
        }
    }
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// How loudly a report should be treated by the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
    Critical,
}

/// A single error report handed to the telemetry collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    pub error_type: ErrorKind,
    pub severity: Severity,
    pub message: String,
    /// Free-form context such as the board id or the operation name.
    pub context: String,
}

impl ErrorReport {
    pub fn new(error_type: ErrorKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            error_type,
            severity,
            message: message.into(),
            context: String::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }
}

/// External error collector.
pub trait Telemetry {
    fn report(&self, report: &ErrorReport);
}

/// Telemetry sink that only writes to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTelemetry;

impl Telemetry for LogTelemetry {
    fn report(&self, report: &ErrorReport) {
        match report.severity {
            Severity::Warning => log::warn!("[{:?}] {} ({})", report.error_type, report.message, report.context),
            Severity::Error | Severity::Critical => {
                log::error!("[{:?}] {} ({})", report.error_type, report.message, report.context)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(SyncError::Transport("refused".into()).kind(), ErrorKind::Transport);
        assert_eq!(SyncError::RetriesExhausted { attempts: 3 }.kind(), ErrorKind::Transport);
        assert_eq!(SyncError::Unauthorized("401".into()).kind(), ErrorKind::Authorization);
        assert_eq!(CoreError::Mutation("x".into()).kind(), ErrorKind::Application);
        let bad = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(CoreError::from(bad).kind(), ErrorKind::Protocol);
    }

    #[test]
    fn test_report_serializes_snake_case() {
        let report = ErrorReport::new(ErrorKind::Application, Severity::Error, "boom").with_context("frame");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["error_type"], "application");
        assert_eq!(json["severity"], "error");
        assert_eq!(json["context"], "frame");
    }
}
