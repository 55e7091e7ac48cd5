//! Fixed-size worker pool over a shared work queue.

use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};
use md5::{Digest, Md5};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, warn};

use digestpool_core::{FailureKind, HashError, HashStatus, ResultRecord, SchedulerError, WorkItem};

use crate::cancel::CancelFlag;
use crate::digester::Digester;

/// Counts for a drained pool run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolReport {
    /// Items handed to a worker.
    pub dispatched: usize,
    /// Items hashed successfully.
    pub succeeded: usize,
    /// Items that failed.
    pub failed: usize,
    /// In-flight items that observed cancellation.
    pub cancelled: usize,
    /// Items left in the queue after cancellation.
    pub skipped: usize,
    /// Bytes hashed by successful items.
    pub bytes_hashed: u64,
}

impl PoolReport {
    /// Items with a final hash or failure.
    pub fn completed(&self) -> usize {
        self.succeeded + self.failed
    }

    fn tally(&mut self, record: &ResultRecord) {
        self.dispatched += 1;
        match &record.status {
            HashStatus::Success => {
                self.succeeded += 1;
                self.bytes_hashed += record.size_bytes.unwrap_or(0);
            }
            HashStatus::Failed(_) => self.failed += 1,
            HashStatus::Cancelled => self.cancelled += 1,
        }
    }
}

/// Runs `workers` threads that pull work items one at a time.
///
/// There is no pre-partitioning: each idle worker takes the next queued item,
/// so large and small files balance across workers. Records are handed to the
/// sink on the calling thread, one at a time, as soon as a worker produces them.
pub struct WorkerPool<D = Md5> {
    workers: usize,
    digester: Digester<D>,
    threads: ThreadPool,
}

impl<D: Digest> WorkerPool<D> {
    /// Build a pool with `workers` threads (at least one).
    pub fn new(workers: usize, digester: Digester<D>) -> Result<Self, SchedulerError> {
        let workers = workers.max(1);
        let threads = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("digestpool-worker-{i}"))
            .build()
            .map_err(|e| SchedulerError::Spawn {
                message: e.to_string(),
            })?;

        Ok(Self {
            workers,
            digester,
            threads,
        })
    }

    /// Number of worker threads.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Hash every item until the queue is empty or `cancel` is observed.
    ///
    /// Returns once drained: every dispatched item has produced exactly one
    /// record and no worker will take another item.
    pub fn run<F>(&self, items: Vec<WorkItem>, cancel: &CancelFlag, mut sink: F) -> PoolReport
    where
        F: FnMut(ResultRecord),
    {
        let mut report = PoolReport::default();
        if items.is_empty() {
            return report;
        }

        let (queue_tx, queue_rx) = crossbeam_channel::unbounded();
        for item in items {
            // The receiver is alive, so sending cannot fail.
            let _ = queue_tx.send(item);
        }
        drop(queue_tx);

        let (result_tx, result_rx) = crossbeam_channel::unbounded();
        let digester = &self.digester;

        self.threads.in_place_scope(|scope| {
            for _ in 0..self.workers {
                let queue = queue_rx.clone();
                let results = result_tx.clone();
                scope.spawn(move |_| worker_loop(digester, &queue, &results, cancel));
            }
            drop(result_tx);

            for record in result_rx.iter() {
                report.tally(&record);
                sink(record);
            }
        });

        report.skipped = queue_rx.len();
        debug!(
            dispatched = report.dispatched,
            skipped = report.skipped,
            "Worker pool drained"
        );
        report
    }
}

fn worker_loop<D: Digest>(
    digester: &Digester<D>,
    queue: &Receiver<WorkItem>,
    results: &Sender<ResultRecord>,
    cancel: &CancelFlag,
) {
    loop {
        if cancel.is_cancelled() {
            break;
        }
        let Ok(item) = queue.try_recv() else {
            break;
        };
        if results.send(hash_item(digester, &item, cancel)).is_err() {
            break;
        }
    }
}

/// Hash one item into its result record.
fn hash_item<D: Digest>(digester: &Digester<D>, item: &WorkItem, cancel: &CancelFlag) -> ResultRecord {
    let start = Instant::now();
    match digester.digest(item.path(), cancel) {
        Ok(digest) => ResultRecord::success(item, &digest.hash, digest.size_bytes, digest.duration),
        Err(HashError::Cancelled) => ResultRecord::cancelled(item, start.elapsed()),
        Err(err) => {
            warn!(path = %item.path().display(), error = %err, "Failed to hash file");
            let kind = err
                .failure_kind()
                .unwrap_or_else(|| FailureKind::Io(err.to_string()));
            ResultRecord::failed(item, kind, start.elapsed())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn items_for(temp: &TempDir, count: usize) -> Vec<WorkItem> {
        (0..count)
            .map(|i| {
                let path = temp.path().join(format!("file{i}.txt"));
                fs::write(&path, format!("content {i}")).unwrap();
                WorkItem::new(path, i)
            })
            .collect()
    }

    #[test]
    fn test_every_item_produces_one_record() {
        let temp = TempDir::new().unwrap();
        let items = items_for(&temp, 25);
        let pool = WorkerPool::new(4, Digester::<Md5>::new()).unwrap();

        let mut records = Vec::new();
        let report = pool.run(items, &CancelFlag::new(), |r| records.push(r));

        assert_eq!(records.len(), 25);
        assert_eq!(report.succeeded, 25);
        assert_eq!(report.skipped, 0);
        let mut indices: Vec<_> = records.iter().map(|r| r.sequence_index).collect();
        indices.sort_unstable();
        assert_eq!(indices, (0..25).collect::<Vec<_>>());
    }

    #[test]
    fn test_failure_does_not_abort_siblings() {
        let temp = TempDir::new().unwrap();
        let mut items = items_for(&temp, 3);
        items.push(WorkItem::new(temp.path().join("vanished.txt"), 3));
        let pool = WorkerPool::new(2, Digester::<Md5>::new()).unwrap();

        let mut records = Vec::new();
        let report = pool.run(items, &CancelFlag::new(), |r| records.push(r));

        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failed, 1);
        let missing = records.iter().find(|r| r.sequence_index == 3).unwrap();
        assert_eq!(missing.status, HashStatus::Failed(FailureKind::NotFound));
    }

    #[test]
    fn test_cancelled_before_start_skips_everything() {
        let temp = TempDir::new().unwrap();
        let items = items_for(&temp, 10);
        let pool = WorkerPool::new(3, Digester::<Md5>::new()).unwrap();
        let cancel = CancelFlag::new();
        cancel.cancel();

        let mut records = Vec::new();
        let report = pool.run(items, &cancel, |r| records.push(r));

        assert!(records.is_empty());
        assert_eq!(report.skipped, 10);
        assert_eq!(report.dispatched, 0);
    }

    #[test]
    fn test_zero_workers_means_one() {
        let pool = WorkerPool::new(0, Digester::<Md5>::new()).unwrap();
        assert_eq!(pool.workers(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_in_flight_item_reports_cancelled() {
        // An endless stream can only finish through cancellation.
        let items = vec![WorkItem::new("/dev/zero", 0)];
        let pool = WorkerPool::new(1, Digester::<Md5>::new()).unwrap();
        let cancel = CancelFlag::new();

        let canceller = {
            let cancel = cancel.clone();
            std::thread::spawn(move || {
                std::thread::sleep(std::time::Duration::from_millis(50));
                cancel.cancel();
            })
        };

        let mut records = Vec::new();
        let report = pool.run(items, &cancel, |r| records.push(r));
        canceller.join().unwrap();

        assert_eq!(report.cancelled, 1);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.completed(), 0);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, HashStatus::Cancelled);
        assert!(records[0].size_bytes.is_none());
        assert!(records[0].digest_hex.is_none());
    }
}
