//! Sequential directory iterator
//!
//! A single-threaded compatibility surface that yields one directory at
//! a time as `(dir_path, dir_names, file_names)`, parent before
//! children. Traversal pruning goes through a pre-expansion filter
//! callback rather than mutation of an already-yielded list: the
//! callback runs before a subdirectory is enqueued, and a `false` return
//! prunes that subtree. Unreadable directories invoke the error callback
//! and yield an empty listing.

use crate::config::SNAPSHOT_DIR_NAME;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

/// Pre-expansion filter: `(parent_dir, subdir_name) -> descend?`
type PruneFn = Box<dyn FnMut(&Path, &str) -> bool>;

/// Listing-error callback
type ErrorFn = Box<dyn FnMut(&Path, &io::Error)>;

/// Sequential depth-first directory iterator
pub struct Walk {
    stack: Vec<PathBuf>,
    follow_symlinks: bool,
    skip_snapshot_dirs: bool,
    prune: Option<PruneFn>,
    on_error: Option<ErrorFn>,
    // Directories already expanded, for cycle safety when following links
    visited: HashSet<(u64, u64)>,
}

/// Iterate a subtree one directory at a time, parent before children.
pub fn walk(top: impl Into<PathBuf>) -> Walk {
    Walk {
        stack: vec![top.into()],
        follow_symlinks: false,
        skip_snapshot_dirs: true,
        prune: None,
        on_error: None,
        visited: HashSet::new(),
    }
}

impl Walk {
    /// Follow symbolic links to directories (cycle-safe)
    pub fn follow_symlinks(mut self, yes: bool) -> Self {
        self.follow_symlinks = yes;
        self
    }

    /// Skip directories literally named `.snapshot` (default true)
    pub fn skip_snapshot_dirs(mut self, yes: bool) -> Self {
        self.skip_snapshot_dirs = yes;
        self
    }

    /// Install a pre-expansion filter; returning `false` prunes the
    /// subtree before it is enqueued.
    pub fn prune<F>(mut self, f: F) -> Self
    where
        F: FnMut(&Path, &str) -> bool + 'static,
    {
        self.prune = Some(Box::new(f));
        self
    }

    /// Install a callback invoked when a directory cannot be listed
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: FnMut(&Path, &io::Error) + 'static,
    {
        self.on_error = Some(Box::new(f));
        self
    }

    fn report_error(&mut self, path: &Path, error: &io::Error) {
        if let Some(cb) = self.on_error.as_mut() {
            cb(path, error);
        }
    }

    /// True if this directory should be expanded (cycle check)
    fn mark_visited(&mut self, path: &Path) -> bool {
        if !self.follow_symlinks {
            return true;
        }
        match fs::metadata(path) {
            Ok(meta) => self.visited.insert((meta.dev(), meta.ino())),
            Err(_) => true,
        }
    }
}

impl Iterator for Walk {
    type Item = (PathBuf, Vec<String>, Vec<String>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let dir = self.stack.pop()?;

            if !self.mark_visited(&dir) {
                continue;
            }

            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) => {
                    self.report_error(&dir, &e);
                    continue;
                }
            };

            let mut dir_names = Vec::new();
            let mut file_names = Vec::new();

            for dent in entries {
                let dent = match dent {
                    Ok(dent) => dent,
                    Err(e) => {
                        self.report_error(&dir, &e);
                        continue;
                    }
                };

                let name = dent.file_name().to_string_lossy().into_owned();
                let is_dir = match dent.file_type() {
                    Ok(ftype) => {
                        if ftype.is_dir() {
                            true
                        } else if ftype.is_symlink() && self.follow_symlinks {
                            fs::metadata(dent.path())
                                .map(|m| m.is_dir())
                                .unwrap_or(false)
                        } else {
                            false
                        }
                    }
                    Err(_) => false,
                };

                if is_dir {
                    if self.skip_snapshot_dirs && name == SNAPSHOT_DIR_NAME {
                        continue;
                    }
                    if let Some(prune) = self.prune.as_mut() {
                        if !prune(&dir, &name) {
                            continue;
                        }
                    }
                    dir_names.push(name);
                } else {
                    file_names.push(name);
                }
            }

            // Reverse push so subdirectories come off the stack in
            // listing order
            for name in dir_names.iter().rev() {
                self.stack.push(dir.join(name));
            }

            return Some((dir, dir_names, file_names));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn build_tree(root: &Path) {
        fs::create_dir(root.join("dir1")).unwrap();
        fs::create_dir(root.join("dir2")).unwrap();
        fs::create_dir(root.join("dir2/subdir")).unwrap();
        File::create(root.join("file0.txt"))
            .unwrap()
            .write_all(b"root file")
            .unwrap();
        File::create(root.join("dir1/file1.txt"))
            .unwrap()
            .write_all(b"file in dir1")
            .unwrap();
        File::create(root.join("dir2/subdir/file3.log"))
            .unwrap()
            .write_all(b"log entry")
            .unwrap();
    }

    #[test]
    fn test_walk_yields_parent_before_children() {
        let tmp = tempfile::tempdir().unwrap();
        build_tree(tmp.path());

        let paths: Vec<PathBuf> = walk(tmp.path()).map(|(dir, _, _)| dir).collect();

        let pos = |suffix: &str| paths.iter().position(|p| p.ends_with(suffix)).unwrap();

        assert_eq!(paths[0], tmp.path());
        assert!(pos("dir2") < pos("dir2/subdir"));
        assert_eq!(paths.len(), 4);
    }

    #[test]
    fn test_walk_partitions_entries() {
        let tmp = tempfile::tempdir().unwrap();
        build_tree(tmp.path());

        let (root, dirs, files) = walk(tmp.path()).next().unwrap();
        assert_eq!(root, tmp.path());

        let mut dirs = dirs;
        dirs.sort();
        assert_eq!(dirs, vec!["dir1", "dir2"]);
        assert_eq!(files, vec!["file0.txt"]);
    }

    #[test]
    fn test_walk_prune_callback() {
        let tmp = tempfile::tempdir().unwrap();
        build_tree(tmp.path());

        let paths: Vec<PathBuf> = walk(tmp.path())
            .prune(|_, name| name != "dir2")
            .map(|(dir, _, _)| dir)
            .collect();

        assert!(paths.iter().any(|p| p.ends_with("dir1")));
        assert!(!paths.iter().any(|p| p.ends_with("dir2")));
        assert!(!paths.iter().any(|p| p.ends_with("subdir")));
    }

    #[test]
    fn test_walk_skips_snapshot_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        build_tree(tmp.path());
        fs::create_dir(tmp.path().join(".snapshot")).unwrap();

        let default_paths: Vec<PathBuf> = walk(tmp.path()).map(|(d, _, _)| d).collect();
        assert!(!default_paths.iter().any(|p| p.ends_with(".snapshot")));

        let all_paths: Vec<PathBuf> = walk(tmp.path())
            .skip_snapshot_dirs(false)
            .map(|(d, _, _)| d)
            .collect();
        assert!(all_paths.iter().any(|p| p.ends_with(".snapshot")));
    }

    #[test]
    fn test_walk_missing_top_reports_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("gone");

        let hits = std::rc::Rc::new(std::cell::RefCell::new(0));
        let hits_cb = std::rc::Rc::clone(&hits);

        let results: Vec<_> = walk(&missing)
            .on_error(move |_, _| *hits_cb.borrow_mut() += 1)
            .collect();

        assert!(results.is_empty());
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn test_walk_symlink_cycle_terminates() {
        let tmp = tempfile::tempdir().unwrap();
        let inner = tmp.path().join("inner");
        fs::create_dir(&inner).unwrap();
        std::os::unix::fs::symlink(tmp.path(), inner.join("loop")).unwrap();

        let results: Vec<_> = walk(tmp.path()).follow_symlinks(true).collect();

        // Finite, and each real directory expanded once
        assert!(results.len() <= 3);
    }
}
