//! Visited-directory tracking for symlink cycle avoidance.

use std::path::PathBuf;

use dashmap::DashSet;

/// Tracks canonical directory paths already descended into.
///
/// A symlinked directory is followed at most once per canonical target,
/// so a link pointing back at an ancestor cannot loop the walk. The set is
/// concurrent because the walker's read-dir callback must be `Sync`.
#[derive(Debug, Default)]
pub struct VisitedDirs {
    seen: DashSet<PathBuf>,
}

impl VisitedDirs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a canonical directory as visited. Returns `true` on first visit.
    pub fn visit(&self, canonical: PathBuf) -> bool {
        self.seen.insert(canonical)
    }
}
