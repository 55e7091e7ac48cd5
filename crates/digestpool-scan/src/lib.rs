//! Input path enumeration for digestpool.
//!
//! This crate turns the paths a user picked (files and directories, mixed)
//! into the flat, ordered list of regular files a hashing run works on.
//!
//! - **Deterministic order** - inputs in the order given, directories walked
//!   depth-first with entries sorted by name
//! - **Deduplication** by canonical path
//! - **Cycle safety** - symlinked directories are followed once per target
//! - **Non-fatal errors** - unreadable entries are counted, never thrown
//!
//! # Example
//!
//! ```rust,no_run
//! use digestpool_scan::PathEnumerator;
//!
//! let enumeration = PathEnumerator::new().enumerate(["/path/to/dir", "/path/to/file.iso"]);
//!
//! println!("{} files", enumeration.len());
//! println!("{} unreadable entries skipped", enumeration.unreadable());
//! ```

mod enumerator;
mod skipped;
mod visited;

pub use enumerator::{Enumeration, PathEnumerator};
pub use skipped::{SkipReason, SkippedEntry};
pub use visited::VisitedDirs;

// Re-export core types for convenience
pub use digestpool_core::{HashConfig, WorkItem};
