//! Expansion of file and directory inputs into an ordered file list.

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;
use jwalk::{Parallelism, WalkDir};
use tracing::{debug, info, warn};

use digestpool_core::{HashConfig, WorkItem};

use crate::skipped::{SkipReason, SkippedEntry};
use crate::visited::VisitedDirs;

/// Ordered, deduplicated result of an enumeration.
#[derive(Debug, Clone, Default)]
pub struct Enumeration {
    /// Absolute file paths in enumeration order.
    pub paths: Vec<PathBuf>,
    /// Entries skipped because they could not be read.
    pub skipped: Vec<SkippedEntry>,
}

impl Enumeration {
    /// Number of files collected.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Check if no files were collected.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Number of unreadable entries skipped.
    pub fn unreadable(&self) -> usize {
        self.skipped.len()
    }

    /// Turn the collected paths into work items, indexed by position.
    pub fn work_items(&self) -> Vec<WorkItem> {
        self.paths
            .iter()
            .enumerate()
            .map(|(index, path)| WorkItem::new(path.clone(), index))
            .collect()
    }
}

/// Expands mixed file/directory inputs into regular files.
///
/// Directories are walked depth-first with entries sorted by name, so the
/// output order is stable for an unchanged tree. Files are deduplicated by
/// canonical path and symlinked directories are descended at most once per
/// canonical target.
pub struct PathEnumerator {
    follow_symlinks: bool,
    include_hidden: bool,
}

impl PathEnumerator {
    /// Create an enumerator with default options.
    pub fn new() -> Self {
        Self::with_config(&HashConfig::default())
    }

    /// Create an enumerator using the walk options of a config.
    pub fn with_config(config: &HashConfig) -> Self {
        Self {
            follow_symlinks: config.follow_symlinks,
            include_hidden: config.include_hidden,
        }
    }

    /// Expand the inputs, in order, into a flat list of files.
    pub fn enumerate<I, P>(&self, inputs: I) -> Enumeration
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut run = EnumerationRun {
            files: IndexMap::new(),
            skipped: Vec::new(),
            visited: Arc::new(VisitedDirs::new()),
        };
        let started = Instant::now();
        let mut input_count = 0usize;

        for input in inputs {
            let input = input.as_ref();
            if input.as_os_str().is_empty() {
                continue;
            }
            input_count += 1;

            let path = match std::path::absolute(input) {
                Ok(p) => p,
                Err(err) => {
                    run.skip(SkippedEntry::from_io(input, &err));
                    continue;
                }
            };

            let metadata = match self.metadata(&path) {
                Ok(m) => m,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "Input is not accessible");
                    run.skip(SkippedEntry::from_io(&path, &err));
                    continue;
                }
            };

            if metadata.is_file() {
                self.collect_file(&mut run, path);
            } else if metadata.is_dir() {
                self.walk_directory(&mut run, &path);
            } else {
                debug!(path = %path.display(), "Skipping input that is neither file nor directory");
            }
        }

        info!(
            files = run.files.len(),
            inputs = input_count,
            unreadable = run.skipped.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Enumeration finished"
        );

        Enumeration {
            paths: run.files.into_values().collect(),
            skipped: run.skipped,
        }
    }

    fn metadata(&self, path: &Path) -> std::io::Result<Metadata> {
        if self.follow_symlinks {
            std::fs::metadata(path)
        } else {
            std::fs::symlink_metadata(path)
        }
    }

    /// Add a file unless its canonical path was already collected.
    fn collect_file(&self, run: &mut EnumerationRun, path: PathBuf) {
        let canonical = match path.canonicalize() {
            Ok(c) => c,
            Err(err) => {
                run.skip(SkippedEntry::from_io(&path, &err));
                return;
            }
        };

        if run.files.contains_key(&canonical) {
            return;
        }

        run.files.insert(canonical, path);
    }

    /// Walk a directory input and collect every regular file below it.
    fn walk_directory(&self, run: &mut EnumerationRun, root: &Path) {
        let canonical_root = match root.canonicalize() {
            Ok(c) => c,
            Err(err) => {
                run.skip(SkippedEntry::from_io(root, &err));
                return;
            }
        };

        if !run.visited.visit(canonical_root) {
            debug!(path = %root.display(), "Directory already enumerated");
            return;
        }

        debug!(path = %root.display(), "Scanning directory");

        let visited = Arc::clone(&run.visited);
        let walker = WalkDir::new(root)
            .parallelism(Parallelism::Serial)
            .sort(true)
            .skip_hidden(!self.include_hidden)
            .follow_links(self.follow_symlinks)
            .process_read_dir(move |depth, _path, _state, children| {
                // The root itself is passed first with no depth; it is already marked.
                if depth.is_none() {
                    return;
                }
                for entry in children.iter_mut().flatten() {
                    if entry.read_children_path.is_none() {
                        continue;
                    }
                    // Canonicalize failures are left to the walker to report.
                    if let Ok(canonical) = entry.path().canonicalize() {
                        if !visited.visit(canonical) {
                            entry.read_children_path = None;
                        }
                    }
                }
            });

        for entry_result in walker {
            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                    if err.loop_ancestor().is_some() {
                        // Link back to an ancestor: the ancestor's files are already collected.
                        debug!(path = %path.display(), "Not following directory loop");
                        continue;
                    }
                    let reason = err.io_error().map(SkipReason::from_io).unwrap_or(SkipReason::ReadError);
                    run.skip(SkippedEntry::new(path, err.to_string(), reason));
                    continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_file() {
                self.collect_file(run, entry.path());
            } else if file_type.is_symlink() && self.follow_symlinks {
                // A link the walker could not resolve.
                run.skip(SkippedEntry::broken_symlink(entry.path()));
            }
        }
    }
}

impl Default for PathEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Mutable state of one `enumerate` call.
struct EnumerationRun {
    /// Canonical path -> emitted path, in collection order.
    files: IndexMap<PathBuf, PathBuf>,
    skipped: Vec<SkippedEntry>,
    visited: Arc<VisitedDirs>,
}

impl EnumerationRun {
    fn skip(&mut self, entry: SkippedEntry) {
        warn!(path = %entry.path.display(), reason = ?entry.reason, "Skipping unreadable entry: {}", entry.message);
        self.skipped.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::create_dir(root.join("dir1")).unwrap();
        fs::create_dir(root.join("dir2")).unwrap();
        fs::create_dir(root.join("dir1/subdir")).unwrap();

        fs::write(root.join("file1.txt"), "hello").unwrap();
        fs::write(root.join("dir1/file2.txt"), "world world world").unwrap();
        fs::write(root.join("dir1/subdir/file3.txt"), "test").unwrap();
        fs::write(root.join("dir2/file4.txt"), "another file here").unwrap();
        fs::write(root.join(".hidden"), "secret").unwrap();

        temp
    }

    fn names(enumeration: &Enumeration, root: &Path) -> Vec<String> {
        enumeration
            .paths
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_directory_is_expanded_in_sorted_order() {
        let temp = create_test_tree();
        let enumeration = PathEnumerator::new().enumerate([temp.path()]);

        assert_eq!(
            names(&enumeration, temp.path()),
            vec![
                ".hidden",
                "dir1/file2.txt",
                "dir1/subdir/file3.txt",
                "dir2/file4.txt",
                "file1.txt"
            ]
        );
        assert_eq!(enumeration.unreadable(), 0);
    }

    #[test]
    fn test_skip_hidden() {
        let temp = create_test_tree();
        let config = HashConfig::builder().include_hidden(false).build().unwrap();
        let enumeration = PathEnumerator::with_config(&config).enumerate([temp.path()]);

        assert_eq!(enumeration.len(), 4);
        assert!(!names(&enumeration, temp.path()).contains(&".hidden".to_string()));
    }

    #[test]
    fn test_duplicate_inputs_emitted_once() {
        let temp = create_test_tree();
        let file = temp.path().join("file1.txt");
        let enumeration =
            PathEnumerator::new().enumerate([file.clone(), temp.path().to_path_buf(), file]);

        assert_eq!(enumeration.len(), 5);
        assert!(enumeration.paths[0].ends_with("file1.txt"));
    }

    #[test]
    fn test_missing_input_is_counted() {
        let temp = create_test_tree();
        let enumeration = PathEnumerator::new()
            .enumerate([temp.path().join("does-not-exist"), temp.path().join("file1.txt")]);

        assert_eq!(enumeration.len(), 1);
        assert_eq!(enumeration.unreadable(), 1);
        assert_eq!(enumeration.skipped[0].reason, SkipReason::Missing);
    }

    #[test]
    fn test_work_items_are_indexed() {
        let temp = create_test_tree();
        let items = PathEnumerator::new().enumerate([temp.path()]).work_items();

        assert_eq!(items.len(), 5);
        for (index, item) in items.iter().enumerate() {
            assert_eq!(item.sequence_index(), index);
            assert!(item.path().is_absolute());
        }
    }

    #[test]
    fn test_directory_input_yields_nested_files() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();
        fs::write(temp.path().join("a.txt"), "a").unwrap();
        fs::write(temp.path().join("sub/b.txt"), "b").unwrap();

        let enumeration = PathEnumerator::new().enumerate([temp.path()]);

        assert_eq!(names(&enumeration, temp.path()), vec!["a.txt", "sub/b.txt"]);
        assert_eq!(enumeration.unreadable(), 0);
    }
}
