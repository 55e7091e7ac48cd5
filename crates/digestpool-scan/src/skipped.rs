//! Entries left out of an enumeration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Why an entry was left out of the enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// Input path does not exist.
    Missing,
    /// Permission was denied.
    PermissionDenied,
    /// Symbolic link target does not exist.
    BrokenSymlink,
    /// Error reading a file, directory or its metadata.
    ReadError,
}

impl SkipReason {
    /// Classify an I/O error.
    pub fn from_io(err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::Missing,
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::ReadError,
        }
    }
}

/// Non-fatal entry skipped during enumeration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedEntry {
    /// Path that could not be read.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of failure.
    pub reason: SkipReason,
}

impl SkippedEntry {
    /// Create a skipped entry.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, reason: SkipReason) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            reason,
        }
    }

    /// Create a skipped entry from an I/O error.
    pub fn from_io(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        Self::new(path, error.to_string(), SkipReason::from_io(error))
    }

    /// Create a broken symlink entry.
    pub fn broken_symlink(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            message: format!("Broken symlink: {}", path.display()),
            path,
            reason: SkipReason::BrokenSymlink,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_reason_from_io() {
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(SkipReason::from_io(&err), SkipReason::PermissionDenied);

        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(SkipReason::from_io(&err), SkipReason::Missing);

        let err = std::io::Error::other("weird");
        assert_eq!(SkipReason::from_io(&err), SkipReason::ReadError);
    }

    #[test]
    fn test_broken_symlink_entry() {
        let entry = SkippedEntry::broken_symlink("/data/dangling");
        assert_eq!(entry.reason, SkipReason::BrokenSymlink);
        assert!(entry.message.contains("/data/dangling"));
    }
}
