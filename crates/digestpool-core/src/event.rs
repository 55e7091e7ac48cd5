//! Progress events delivered to listeners.

use serde::Serialize;

use crate::record::ResultRecord;
use crate::summary::RunSummary;

/// A result record together with the run's progress counters.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressUpdate {
    /// The record just produced.
    pub record: ResultRecord,
    /// Records delivered so far in this run, including this one.
    pub delivered: usize,
    /// Number of files enumerated for this run.
    pub total: usize,
}

impl ProgressUpdate {
    /// Progress as a percentage (0.0 to 100.0).
    pub fn percentage(&self) -> f64 {
        if self.total > 0 {
            (self.delivered as f64 / self.total as f64) * 100.0
        } else {
            100.0
        }
    }
}

/// Event emitted by a run: one per record, then exactly one summary.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HashEvent {
    Record(ProgressUpdate),
    Finished(RunSummary),
}

impl HashEvent {
    /// Check if this is the terminal summary event.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished(_))
    }
}
