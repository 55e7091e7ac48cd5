//! Core types and configuration for digestpool.
//!
//! This crate provides the data model shared by the digestpool crates:
//! work items, per-file result records, run summaries, progress events,
//! the error taxonomy and the hashing configuration.

mod config;
mod error;
mod event;
mod record;
mod summary;

pub use config::{
    DEFAULT_CHUNK_SIZE, DEFAULT_MAX_WORKERS, DEFAULT_MIN_WORKERS, HashConfig, HashConfigBuilder,
    clamp_workers,
};
pub use error::{ConfigError, FailureKind, HashError, SchedulerError};
pub use event::{HashEvent, ProgressUpdate};
pub use record::{ContentHash, HashStatus, ResultRecord, WorkItem};
pub use summary::{RunPhase, RunSummary};
