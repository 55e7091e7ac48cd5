//! Run lifecycle phases and terminal summaries.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle phase of a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    Idle,
    Enumerating,
    Running,
    Completed,
    Cancelled,
}

impl RunPhase {
    /// Check if this is a terminal phase of a run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Enumerating => write!(f, "enumerating"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Accounting for a finished run.
///
/// `completed + cancelled + skipped == total` holds for every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Terminal phase (`Completed` or `Cancelled`).
    pub outcome: RunPhase,
    /// Number of files enumerated.
    pub total: usize,
    /// Records with a final hash or failure.
    pub completed: usize,
    /// Of `completed`, how many were hashed successfully.
    pub succeeded: usize,
    /// Of `completed`, how many failed.
    pub failed: usize,
    /// Dispatched items that observed cancellation mid-read.
    pub cancelled: usize,
    /// Items never dispatched because cancellation came first.
    pub skipped: usize,
    /// Enumeration entries that could not be read.
    pub unreadable: usize,
    /// Worker count used for the run.
    pub workers: usize,
    /// Total bytes hashed successfully.
    pub bytes_hashed: u64,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Wall time from start to drained.
    pub elapsed: Duration,
}

impl RunSummary {
    /// Summary for a run that had nothing to hash.
    pub fn empty(unreadable: usize, workers: usize, started_at: DateTime<Utc>) -> Self {
        Self {
            outcome: RunPhase::Completed,
            total: 0,
            completed: 0,
            succeeded: 0,
            failed: 0,
            cancelled: 0,
            skipped: 0,
            unreadable,
            workers,
            bytes_hashed: 0,
            started_at,
            elapsed: Duration::ZERO,
        }
    }

    /// Check if the run ended by cancellation.
    pub fn was_cancelled(&self) -> bool {
        self.outcome == RunPhase::Cancelled
    }

    /// Check that every enumerated file is accounted for.
    pub fn is_balanced(&self) -> bool {
        self.completed + self.cancelled + self.skipped == self.total
            && self.succeeded + self.failed == self.completed
    }

    /// Hashing throughput in bytes per second.
    pub fn bytes_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.bytes_hashed as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}
