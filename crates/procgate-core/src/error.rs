//! Error types for procgate.
//!
//! Expected failures (a vanished pid, a denied target, a bad pattern) are
//! ordinary variants here. The facade in [`crate::api`] turns them into
//! user-facing messages; only transport faults reach a JSON-RPC error.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for procgate.
#[derive(Debug, Error)]
pub enum ProcgateError {
    // Process table errors
    #[error("No such process with PID: {pid}")]
    NoSuchProcess { pid: u32 },

    #[error("Access denied to process {pid}: {message}")]
    AccessDenied { pid: u32, message: String },

    // Query errors
    #[error("Invalid regex pattern: {message}")]
    InvalidPattern { message: String },

    // Policy errors
    #[error("{reason}")]
    PolicyDenied { reason: String },

    // Identity errors
    #[error("Failed to resolve current user: {message}")]
    Identity { message: String },

    // Request errors
    #[error("Invalid params: {message}")]
    InvalidParams { message: String },

    #[error("Method not found: {method}")]
    MethodNotFound { method: String },

    #[error("{operation} is not supported on this platform")]
    Unsupported { operation: String },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for procgate operations.
pub type Result<T> = std::result::Result<T, ProcgateError>;

impl From<std::io::Error> for ProcgateError {
    fn from(err: std::io::Error) -> Self {
        ProcgateError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for ProcgateError {
    fn from(err: serde_json::Error) -> Self {
        ProcgateError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl ProcgateError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        ProcgateError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Stable name of the variant, used when reporting unexpected faults.
    pub fn kind(&self) -> &'static str {
        match self {
            ProcgateError::NoSuchProcess { .. } => "NoSuchProcess",
            ProcgateError::AccessDenied { .. } => "AccessDenied",
            ProcgateError::InvalidPattern { .. } => "InvalidPattern",
            ProcgateError::PolicyDenied { .. } => "PolicyDenied",
            ProcgateError::Identity { .. } => "Identity",
            ProcgateError::InvalidParams { .. } => "InvalidParams",
            ProcgateError::MethodNotFound { .. } => "MethodNotFound",
            ProcgateError::Unsupported { .. } => "Unsupported",
            ProcgateError::Io { .. } => "Io",
            ProcgateError::Json { .. } => "Json",
            ProcgateError::Other(_) => "Other",
        }
    }

    /// Whether the error is an expected outcome of reading another process.
    ///
    /// A process can exit or hide its sockets between enumeration and the
    /// detail fetch. Scans skip every failing process; these errors are
    /// skipped quietly and the rest are logged as warnings.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            ProcgateError::NoSuchProcess { .. }
                | ProcgateError::AccessDenied { .. }
                | ProcgateError::Unsupported { .. }
        )
    }

    /// Convert to a JSON-RPC error code.
    ///
    /// Expected failures are tool results, so only request faults get a
    /// specific code:
    /// - -32601: Method not found
    /// - -32602: Invalid params
    /// - -32603: Internal error
    pub fn to_rpc_error_code(&self) -> i32 {
        match self {
            ProcgateError::MethodNotFound { .. } => -32601,
            ProcgateError::InvalidParams { .. } => -32602,

            // All other errors are internal errors
            _ => -32603,
        }
    }
}
