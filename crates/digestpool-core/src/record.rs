//! Work items and per-file result records.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::FailureKind;

/// A single file queued for hashing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkItem {
    path: PathBuf,
    sequence_index: usize,
}

impl WorkItem {
    /// Create a work item for an absolute path at its enumeration position.
    pub fn new(path: impl Into<PathBuf>, sequence_index: usize) -> Self {
        Self {
            path: path.into(),
            sequence_index,
        }
    }

    /// Path of the file to hash.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Position assigned at enumeration time.
    pub fn sequence_index(&self) -> usize {
        self.sequence_index
    }
}

/// Raw digest bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub Vec<u8>);

impl ContentHash {
    /// Create a new ContentHash from raw bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Get the hash as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Terminal status of one work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashStatus {
    /// The digest was computed.
    Success,
    /// Hashing failed; the kind carries the user-facing message.
    Failed(FailureKind),
    /// The run was cancelled while this item was in flight.
    Cancelled,
}

impl HashStatus {
    /// Check if this is a successful outcome.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Check if the item was cancelled mid-read.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl fmt::Display for HashStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "Success"),
            Self::Failed(kind) => write!(f, "{kind}"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Outcome of hashing one work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRecord {
    /// Path of the hashed file.
    pub path: PathBuf,
    /// Enumeration position of the work item.
    pub sequence_index: usize,
    /// File size in bytes (success only).
    pub size_bytes: Option<u64>,
    /// Lowercase hex digest (success only).
    pub digest_hex: Option<String>,
    /// Wall time spent on this file.
    #[serde(rename = "duration_millis", serialize_with = "serialize_millis")]
    pub duration: Duration,
    /// Terminal status.
    pub status: HashStatus,
}

fn serialize_millis<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
}

impl ResultRecord {
    /// Record a successfully hashed item.
    pub fn success(item: &WorkItem, digest: &ContentHash, size_bytes: u64, duration: Duration) -> Self {
        Self {
            path: item.path.clone(),
            sequence_index: item.sequence_index,
            size_bytes: Some(size_bytes),
            digest_hex: Some(digest.to_hex()),
            duration,
            status: HashStatus::Success,
        }
    }

    /// Record a failed item.
    pub fn failed(item: &WorkItem, kind: FailureKind, duration: Duration) -> Self {
        Self::without_digest(item, HashStatus::Failed(kind), duration)
    }

    /// Record an item that observed cancellation mid-read.
    pub fn cancelled(item: &WorkItem, duration: Duration) -> Self {
        Self::without_digest(item, HashStatus::Cancelled, duration)
    }

    fn without_digest(item: &WorkItem, status: HashStatus, duration: Duration) -> Self {
        Self {
            path: item.path.clone(),
            sequence_index: item.sequence_index,
            size_bytes: None,
            digest_hex: None,
            duration,
            status,
        }
    }

    /// Elapsed time in whole milliseconds.
    pub fn duration_millis(&self) -> u128 {
        self.duration.as_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_hex() {
        let hash = ContentHash::new(vec![0x00, 0xab, 0x0f]);
        assert_eq!(hash.to_hex(), "00ab0f");
        assert_eq!(hash.to_string(), "00ab0f");
    }

    #[test]
    fn test_record_constructors() {
        let item = WorkItem::new("/data/a.bin", 3);
        let hash = ContentHash::new(vec![0xde, 0xad]);

        let ok = ResultRecord::success(&item, &hash, 42, Duration::from_millis(5));
        assert!(ok.status.is_success());
        assert_eq!(ok.digest_hex.as_deref(), Some("dead"));
        assert_eq!(ok.size_bytes, Some(42));
        assert_eq!(ok.sequence_index, 3);
        assert_eq!(ok.duration_millis(), 5);

        let failed = ResultRecord::failed(&item, FailureKind::NotFound, Duration::ZERO);
        assert_eq!(failed.status.to_string(), "Not found");
        assert!(failed.digest_hex.is_none());
        assert!(failed.size_bytes.is_none());

        let cancelled = ResultRecord::cancelled(&item, Duration::ZERO);
        assert!(cancelled.status.is_cancelled());
        assert_eq!(cancelled.status.to_string(), "Cancelled");
    }
}
