//! Concurrent, cancellable file hashing for digestpool.
//!
//! This crate runs MD5 over every file a [`PathEnumerator`](digestpool_scan::PathEnumerator)
//! produces, using a fixed-size pool of worker threads:
//!
//! - **Pull-based scheduling** - each idle worker takes the next queued file
//! - **Streaming digests** - files are read in bounded chunks
//! - **Cooperative cancellation** - checked before each dequeue and each chunk
//! - **Exact accounting** - every enumerated file ends up completed, cancelled
//!   or skipped, and the run summary is always the last event
//!
//! # Running a job
//!
//! ```rust,no_run
//! use digestpool_hash::{HashConfig, HashEvent, Scheduler};
//!
//! let scheduler = Scheduler::new(HashConfig::default());
//! scheduler.on_progress(|event| {
//!     if let HashEvent::Record(update) = event {
//!         println!("{} {}", update.record.status, update.record.path.display());
//!     }
//! });
//!
//! let handle = scheduler.start(["/path/to/dir"]).unwrap();
//! // handle.cancel() stops the run early
//! let summary = handle.wait().unwrap();
//!
//! println!("{} of {} files hashed", summary.succeeded, summary.total);
//! ```

mod cancel;
mod digester;
mod pool;
mod scheduler;
mod state;

pub use cancel::CancelFlag;
pub use digester::{Digester, FileDigest};
pub use pool::{PoolReport, WorkerPool};
pub use scheduler::{ProgressListener, RunHandle, Scheduler, detected_parallelism};
pub use state::RunState;

// Re-export core types
pub use digestpool_core::{
    ContentHash, FailureKind, HashConfig, HashEvent, HashStatus, ProgressUpdate, ResultRecord,
    RunPhase, RunSummary, SchedulerError, WorkItem,
};
