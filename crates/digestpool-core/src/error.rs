//! Error types for hashing, scheduling and configuration.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::summary::RunPhase;

/// Errors that can occur while hashing a single file.
#[derive(Debug, Error)]
pub enum HashError {
    /// Path not found (including files removed after enumeration).
    #[error("Not found: {path}")]
    NotFound { path: PathBuf },

    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The run was cancelled while this file was being read.
    #[error("Cancelled")]
    Cancelled,
}

impl HashError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// The reportable failure kind, or `None` for cancellation.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::NotFound { .. } => Some(FailureKind::NotFound),
            Self::PermissionDenied { .. } => Some(FailureKind::PermissionDenied),
            Self::Io { source, .. } => Some(FailureKind::Io(source.to_string())),
            Self::Cancelled => None,
        }
    }
}

/// Closed set of per-file failures shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// The file does not exist (anymore).
    NotFound,
    /// The file could not be opened or read due to permissions.
    PermissionDenied,
    /// Any other I/O failure, with the OS detail.
    Io(String),
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "Not found"),
            Self::PermissionDenied => write!(f, "Permission denied"),
            Self::Io(detail) => write!(f, "I/O error: {detail}"),
        }
    }
}

/// Errors returned synchronously by the scheduler's control surface.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A run is already in progress.
    #[error("A run is already in progress ({phase})")]
    AlreadyRunning { phase: RunPhase },

    /// The coordinator or worker threads could not be started.
    #[error("Failed to start workers: {message}")]
    Spawn { message: String },

    /// The run's coordinator thread panicked before producing a summary.
    #[error("Run coordinator panicked")]
    CoordinatorPanicked,
}

/// Errors that can occur while building or loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration value is out of range.
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    /// The configuration file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for this schema.
    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_error_io_mapping() {
        let err = HashError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, HashError::PermissionDenied { .. }));

        let err = HashError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, HashError::NotFound { .. }));

        let err = HashError::io("/test/path", std::io::Error::other("disk on fire"));
        assert!(matches!(err, HashError::Io { .. }));
    }

    #[test]
    fn test_failure_kind_labels() {
        let err = HashError::io("/x", std::io::Error::other("bad sector"));
        let kind = err.failure_kind().unwrap();
        assert_eq!(kind.to_string(), "I/O error: bad sector");

        assert_eq!(FailureKind::NotFound.to_string(), "Not found");
        assert_eq!(FailureKind::PermissionDenied.to_string(), "Permission denied");
        assert!(HashError::Cancelled.failure_kind().is_none());
    }
}
