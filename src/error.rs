//! Error types for pwalk
//!
//! This module defines the error hierarchy for the scanner:
//! - Configuration errors (bad selectors, bad paths) that fail a request
//!   before any traversal starts
//! - Entry-level errors (stat/listing failures, symlink cycles) that are
//!   collected and never abort a scan
//! - Sink errors (report write/compression failures) that are fatal
//! - Worker thread errors
//!
//! Design philosophy:
//! - Use thiserror for structured error types in library code
//! - Errors should be actionable - include the path and the cause
//! - Entry-level errors accumulate in the [`ErrorCollector`] and are
//!   returned alongside the scan result

use parking_lot::Mutex;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Top-level error type for the pwalk application
#[derive(Error, Debug)]
pub enum WalkerError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Per-entry errors (also surfaced in the scan's error list)
    #[error("Entry error: {0}")]
    Entry(#[from] EntryError),

    /// Report sink errors
    #[error("Report error: {0}")]
    Sink(#[from] SinkError),

    /// Worker/concurrency errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Interrupted by signal before the scan completed
    #[error("Scan interrupted before completion")]
    Interrupted,
}

/// Configuration and request validation errors
///
/// All of these fail the request before traversal begins; nothing is
/// written to the output path.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Unknown report format selector
    #[error("Invalid format '{value}': expected 'text' or 'columnar'")]
    InvalidFormat { value: String },

    /// Unknown compression selector
    #[error("Invalid compress '{value}': expected 'none' or 'zstd'")]
    InvalidCompression { value: String },

    /// Compression selector is valid but not compiled into this build
    #[error("Compression '{value}' requested but not available in this build")]
    CompressionUnavailable { value: String },

    /// Scan root does not exist or cannot be statted
    #[error("Scan root '{path}' is not accessible: {reason}")]
    RootNotAccessible { path: PathBuf, reason: String },

    /// Scan root exists but is not a directory
    #[error("Scan root '{path}' is not a directory")]
    RootNotADirectory { path: PathBuf },

    /// Output path resolves to an existing directory
    #[error("Output path '{path}' is a directory")]
    OutputIsDirectory { path: PathBuf },

    /// Invalid worker count
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },
}

/// Per-entry errors collected during traversal
///
/// These never unwind the scan; the affected subtree's aggregate simply
/// omits the unreadable entries.
#[derive(Error, Debug)]
pub enum EntryError {
    /// Status syscall failed for one entry
    #[error("Failed to stat '{path}': {source}")]
    Stat { path: PathBuf, source: io::Error },

    /// Directory listing failed (permission denied, vanished, I/O error)
    #[error("Failed to list directory '{path}': {source}")]
    List { path: PathBuf, source: io::Error },

    /// Symlink loop detected while following links
    #[error("Symlink cycle at '{path}': target already expanded on this path")]
    SymlinkCycle { path: PathBuf },
}

impl EntryError {
    /// Returns the path associated with this error
    pub fn path(&self) -> &Path {
        match self {
            EntryError::Stat { path, .. } => path,
            EntryError::List { path, .. } => path,
            EntryError::SymlinkCycle { path } => path,
        }
    }
}

/// Report sink errors
///
/// A sink error is fatal: it sets the scan-wide abort flag and whatever
/// was already flushed is left in place.
#[derive(Error, Debug)]
pub enum SinkError {
    /// Failed to create the output file
    #[error("Failed to create report '{path}': {reason}")]
    Create { path: PathBuf, reason: String },

    /// Write failure during serialization
    #[error("Failed to write report: {0}")]
    Write(#[from] io::Error),

    /// Arrow error while assembling a columnar batch
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet writer error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Report channel closed unexpectedly
    #[error("Report channel closed unexpectedly")]
    ChannelClosed,
}

/// Worker thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker initialization failed
    #[error("Failed to spawn worker {id}: {reason}")]
    SpawnFailed { id: usize, reason: String },

    /// Worker panicked
    #[error("Worker {id} panicked")]
    Panicked { id: usize },
}

/// Result type alias for WalkerError
pub type Result<T> = std::result::Result<T, WalkerError>;

/// Shared collector for per-entry failures
///
/// Workers push errors as they hit them; the coordinator drains the
/// collector into the scan outcome. Pushing never blocks traversal.
#[derive(Debug, Default)]
pub struct ErrorCollector {
    errors: Mutex<Vec<EntryError>>,
}

impl ErrorCollector {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one entry-level failure
    pub fn push(&self, error: EntryError) {
        tracing::debug!(path = %error.path().display(), error = %error, "Entry error");
        self.errors.lock().push(error);
    }

    /// Number of errors collected so far
    pub fn len(&self) -> usize {
        self.errors.lock().len()
    }

    /// True if no errors have been collected
    pub fn is_empty(&self) -> bool {
        self.errors.lock().is_empty()
    }

    /// Take all collected errors, leaving the collector empty
    pub fn drain(&self) -> Vec<EntryError> {
        std::mem::take(&mut *self.errors.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_error_path() {
        let err = EntryError::Stat {
            path: PathBuf::from("/data/file"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.path(), Path::new("/data/file"));
    }

    #[test]
    fn test_error_conversion() {
        let entry = EntryError::SymlinkCycle {
            path: PathBuf::from("/loop"),
        };
        let walker: WalkerError = entry.into();
        assert!(matches!(walker, WalkerError::Entry(_)));
    }

    #[test]
    fn test_collector_drain() {
        let collector = ErrorCollector::new();
        assert!(collector.is_empty());

        collector.push(EntryError::List {
            path: PathBuf::from("/a"),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        });
        collector.push(EntryError::SymlinkCycle {
            path: PathBuf::from("/b"),
        });

        assert_eq!(collector.len(), 2);
        let drained = collector.drain();
        assert_eq!(drained.len(), 2);
        assert!(collector.is_empty());
    }
}
