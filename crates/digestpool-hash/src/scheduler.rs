//! Run orchestration: enumerate, dispatch, account, report.

use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use md5::Md5;
use tokio::sync::mpsc;
use tracing::{info, warn};

use digestpool_core::{
    HashConfig, HashEvent, ProgressUpdate, RunPhase, RunSummary, SchedulerError, WorkItem,
};
use digestpool_scan::PathEnumerator;

use crate::digester::Digester;
use crate::pool::WorkerPool;
use crate::state::RunState;

/// Callback receiving every event of every run.
pub type ProgressListener = Arc<dyn Fn(&HashEvent) + Send + Sync>;

/// Parallelism reported by the OS, or 1 when unknown.
pub fn detected_parallelism() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Drives hashing runs through `Idle -> Enumerating -> Running -> {Completed | Cancelled} -> Idle`.
///
/// One run at a time: `start` while a run is active fails with
/// [`SchedulerError::AlreadyRunning`]. Listeners are invoked from the run's
/// coordinator thread, once per record and once with the final summary.
pub struct Scheduler {
    config: HashConfig,
    available_parallelism: usize,
    shared: Arc<Shared>,
}

impl Scheduler {
    /// Create a scheduler using the machine's available parallelism.
    pub fn new(config: HashConfig) -> Self {
        Self {
            config,
            available_parallelism: detected_parallelism(),
            shared: Arc::new(Shared {
                phase: Mutex::new(RunPhase::Idle),
                current: Mutex::new(None),
                listeners: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Override the parallelism the worker-count policy is applied to.
    pub fn with_available_parallelism(mut self, available: usize) -> Self {
        self.available_parallelism = available;
        self
    }

    /// Configuration used for every run.
    pub fn config(&self) -> &HashConfig {
        &self.config
    }

    /// Worker count the next run will use.
    pub fn worker_count(&self) -> usize {
        self.config.effective_workers(self.available_parallelism)
    }

    /// Register a listener for record and summary events.
    pub fn on_progress<F>(&self, callback: F)
    where
        F: Fn(&HashEvent) + Send + Sync + 'static,
    {
        write_lock(&self.shared.listeners).push(Arc::new(callback));
    }

    /// Receive events through a channel instead of a callback.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<HashEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.on_progress(move |event| {
            let _ = tx.send(event.clone());
        });
        rx
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> RunPhase {
        *self.shared.lock_phase()
    }

    /// Check if a run is active.
    pub fn is_running(&self) -> bool {
        self.phase() != RunPhase::Idle
    }

    /// State of the active run, if any.
    pub fn current_run(&self) -> Option<Arc<RunState>> {
        lock(&self.shared.current).clone()
    }

    /// Start a run over the given files and directories.
    ///
    /// Enumeration happens on the calling thread; hashing continues in the
    /// background once this returns.
    pub fn start<I, P>(&self, inputs: I) -> Result<RunHandle, SchedulerError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        {
            let mut phase = self.shared.lock_phase();
            if *phase != RunPhase::Idle {
                return Err(SchedulerError::AlreadyRunning { phase: *phase });
            }
            *phase = RunPhase::Enumerating;
        }
        // Back to Idle on any early return or panic before the coordinator owns the run.
        let idle = ResetOnDrop::new(&self.shared);

        let started_at = Utc::now();
        let started = Instant::now();

        let enumeration = PathEnumerator::with_config(&self.config).enumerate(inputs);
        let items = enumeration.work_items();
        let workers = self.worker_count();

        let digester = Digester::<Md5>::with_chunk_size(self.config.chunk_size);
        let pool = WorkerPool::new(workers, digester)?;

        let state = Arc::new(RunState::new(items.len(), workers));
        *lock(&self.shared.current) = Some(Arc::clone(&state));
        *self.shared.lock_phase() = RunPhase::Running;

        info!(
            files = items.len(),
            unreadable = enumeration.unreadable(),
            workers,
            "Starting hash run"
        );

        let coordinator = Coordinator {
            shared: Arc::clone(&self.shared),
            state: Arc::clone(&state),
            pool,
            items,
            unreadable: enumeration.unreadable(),
            started_at,
            started,
        };

        let thread = thread::Builder::new()
            .name("digestpool-coordinator".to_string())
            .spawn(move || coordinator.execute())
            .map_err(|err| SchedulerError::Spawn {
                message: err.to_string(),
            })?;

        idle.disarm();
        Ok(RunHandle { state, thread })
    }

    /// Start a run and block until it is drained.
    pub fn run<I, P>(&self, inputs: I) -> Result<RunSummary, SchedulerError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.start(inputs)?.wait()
    }

    /// Request cancellation of the active run.
    ///
    /// No-op unless a run is in the `Running` phase. Returns `true` if this
    /// call set the cancellation flag.
    pub fn cancel(&self) -> bool {
        let phase = self.shared.lock_phase();
        if *phase != RunPhase::Running {
            return false;
        }

        let requested = lock(&self.shared.current)
            .as_ref()
            .is_some_and(|state| state.cancel_flag().cancel());
        if requested {
            info!("Cancellation requested");
        }
        requested
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(HashConfig::default())
    }
}

/// Handle to a started run.
pub struct RunHandle {
    state: Arc<RunState>,
    thread: JoinHandle<RunSummary>,
}

impl RunHandle {
    /// Live counters of this run.
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Request cancellation of this run.
    pub fn cancel(&self) -> bool {
        self.state.cancel_flag().cancel()
    }

    /// Check if the run has finished (summary already emitted).
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Block until the run is drained and return its summary.
    pub fn wait(self) -> Result<RunSummary, SchedulerError> {
        self.thread
            .join()
            .map_err(|_| SchedulerError::CoordinatorPanicked)
    }
}

struct Shared {
    phase: Mutex<RunPhase>,
    current: Mutex<Option<Arc<RunState>>>,
    listeners: RwLock<Vec<ProgressListener>>,
}

impl Shared {
    fn lock_phase(&self) -> MutexGuard<'_, RunPhase> {
        lock(&self.phase)
    }

    fn emit(&self, event: &HashEvent) {
        // Snapshot so listeners may register further listeners.
        let listeners: Vec<ProgressListener> = read_lock(&self.listeners).clone();
        for listener in listeners {
            listener(event);
        }
    }

    /// Drop the finished run and return to `Idle`.
    fn reset(&self) {
        lock(&self.current).take();
        *self.lock_phase() = RunPhase::Idle;
    }
}

/// Everything the background coordinator owns for one run.
struct Coordinator {
    shared: Arc<Shared>,
    state: Arc<RunState>,
    pool: WorkerPool<Md5>,
    items: Vec<WorkItem>,
    unreadable: usize,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl Coordinator {
    fn execute(self) -> RunSummary {
        let Self {
            shared,
            state,
            pool,
            items,
            unreadable,
            started_at,
            started,
        } = self;
        let _idle = ResetOnDrop::new(&shared);
        let total = state.total_count();

        let mut summary = if total == 0 {
            RunSummary::empty(unreadable, state.worker_count(), started_at)
        } else {
            let report = pool.run(items, state.cancel_flag(), |record| {
                let delivered = state.record_delivered(&record);
                shared.emit(&HashEvent::Record(ProgressUpdate {
                    record,
                    delivered,
                    total,
                }));
            });

            RunSummary {
                outcome: if state.cancel_requested() {
                    RunPhase::Cancelled
                } else {
                    RunPhase::Completed
                },
                total,
                completed: report.completed(),
                succeeded: report.succeeded,
                failed: report.failed,
                cancelled: report.cancelled,
                skipped: report.skipped,
                unreadable,
                workers: state.worker_count(),
                bytes_hashed: report.bytes_hashed,
                started_at,
                elapsed: Duration::ZERO,
            }
        };
        summary.elapsed = started.elapsed();
        *shared.lock_phase() = summary.outcome;

        if !summary.is_balanced() {
            warn!(?summary, "Run accounting does not add up");
        }
        info!(
            outcome = %summary.outcome,
            completed = summary.completed,
            failed = summary.failed,
            cancelled = summary.cancelled,
            skipped = summary.skipped,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Hash run finished"
        );

        shared.emit(&HashEvent::Finished(summary.clone()));
        summary
    }
}

/// Returns the scheduler to `Idle` when dropped, including during unwinding.
struct ResetOnDrop<'a> {
    shared: &'a Shared,
    armed: bool,
}

impl<'a> ResetOnDrop<'a> {
    fn new(shared: &'a Shared) -> Self {
        Self {
            shared,
            armed: true,
        }
    }

    /// Hand the reset over to someone else.
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.shared.reset();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
