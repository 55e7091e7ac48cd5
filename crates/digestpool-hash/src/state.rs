//! Per-run accounting.

use std::sync::atomic::{AtomicUsize, Ordering};

use digestpool_core::{HashStatus, ResultRecord};

use crate::cancel::CancelFlag;

/// State of a single run, created by [`Scheduler::start`](crate::Scheduler::start)
/// and never reused.
///
/// Counters are written only by the run's coordinator thread; the atomics
/// let other threads read consistent progress while the run is active.
#[derive(Debug)]
pub struct RunState {
    total_count: usize,
    worker_count: usize,
    completed_count: AtomicUsize,
    cancelled_count: AtomicUsize,
    cancel: CancelFlag,
}

impl RunState {
    pub(crate) fn new(total_count: usize, worker_count: usize) -> Self {
        Self {
            total_count,
            worker_count,
            completed_count: AtomicUsize::new(0),
            cancelled_count: AtomicUsize::new(0),
            cancel: CancelFlag::new(),
        }
    }

    /// Files enumerated for this run.
    pub fn total_count(&self) -> usize {
        self.total_count
    }

    /// Worker threads used by this run.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Records with a final hash or failure so far.
    pub fn completed_count(&self) -> usize {
        self.completed_count.load(Ordering::Acquire)
    }

    /// In-flight items that ended as cancelled so far.
    pub fn cancelled_count(&self) -> usize {
        self.cancelled_count.load(Ordering::Acquire)
    }

    /// Records delivered so far.
    pub fn delivered_count(&self) -> usize {
        self.completed_count() + self.cancelled_count()
    }

    /// Check if cancellation was requested for this run.
    pub fn cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    /// Account for a delivered record and return the delivered count.
    pub(crate) fn record_delivered(&self, record: &ResultRecord) -> usize {
        match record.status {
            HashStatus::Cancelled => self.cancelled_count.fetch_add(1, Ordering::AcqRel),
            _ => self.completed_count.fetch_add(1, Ordering::AcqRel),
        };
        self.delivered_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use digestpool_core::{FailureKind, WorkItem};
    use std::time::Duration;

    #[test]
    fn test_record_delivered_counts() {
        let state = RunState::new(3, 2);
        let item = WorkItem::new("/a", 0);

        let failed = ResultRecord::failed(&item, FailureKind::NotFound, Duration::ZERO);
        assert_eq!(state.record_delivered(&failed), 1);

        let cancelled = ResultRecord::cancelled(&item, Duration::ZERO);
        assert_eq!(state.record_delivered(&cancelled), 2);

        assert_eq!(state.completed_count(), 1);
        assert_eq!(state.cancelled_count(), 1);
        assert_eq!(state.total_count(), 3);
        assert!(!state.cancel_requested());
    }
}
