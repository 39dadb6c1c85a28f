//! pwalk - Parallel Filesystem Inventory Walker
//!
//! Scans a filesystem subtree with a fixed pool of worker threads and
//! writes one report row per entry: identity, ownership, size,
//! timestamps, hard-link status, and - for directories - the recursive
//! file count and byte sum of the subtree, computed during the same
//! single pass that lists it.
//!
//! # Features
//!
//! - **Parallel traversal**: a shared work queue of directory tasks
//!   feeds N worker threads that expand directories and stat entries.
//!
//! - **Inline aggregation**: each open directory owns a node in a
//!   shared tree; finished children fold their totals upward the moment
//!   they finalize, so there is no second bottom-up pass.
//!
//! - **Hard-link detection**: a scan-scoped registry of (device, inode)
//!   pairs flags duplicate directory entries for the same object.
//!
//! - **Streaming reports**: a single writer thread serializes finalized
//!   records to a pwalk-compatible CSV (optionally zstd-compressed) or
//!   a fixed-schema Parquet file.
//!
//! - **Degraded-scan semantics**: per-entry failures are collected and
//!   returned next to the report path; only request-level
//!   misconfiguration fails a scan outright.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────────────────────────────────────────────────────────┐
//!  │                       Worker Threads                         │
//!  │  ┌─────────┐  ┌─────────┐  ┌─────────┐       ┌─────────┐    │
//!  │  │Worker 1 │  │Worker 2 │  │Worker 3 │  ...  │Worker N │    │
//!  │  │ readdir │  │ readdir │  │ readdir │       │ readdir │    │
//!  │  │ + lstat │  │ + lstat │  │ + lstat │       │ + lstat │    │
//!  │  └────┬────┘  └────┬────┘  └────┬────┘       └────┬────┘    │
//!  │       │            │            │                 │         │
//!  │       └────────────┴─────┬──────┴─────────────────┘         │
//!  │                          │                                  │
//!  │        ┌─────────────────▼────────────────┐                 │
//!  │        │            Work Queue            │                 │
//!  │        │     (directory expansion tasks)  │                 │
//!  │        └─────────────────┬────────────────┘                 │
//!  │                          │                                  │
//!  │        ┌─────────────────▼────────────────┐                 │
//!  │        │     NodeTree (fold-up engine)    │                 │
//!  │        │  open dirs, counters, dir sums   │                 │
//!  │        └─────────────────┬────────────────┘                 │
//!  └──────────────────────────┼──────────────────────────────────┘
//!                             │ finalized records
//!                             ▼
//!                  ┌─────────────────────┐
//!                  │    ReportWriter     │
//!                  │  CSV / Parquet      │
//!                  │  (+ optional zstd)  │
//!                  └─────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use pwalk::{report, ScanRequest};
//!
//! let mut request = ScanRequest::new("/data");
//! request.format = "columnar".into();
//! request.output = Some("/tmp/data.parquet".into());
//!
//! let outcome = report(request).unwrap();
//! println!(
//!     "{} rows -> {} ({} errors)",
//!     outcome.summary.rows_written,
//!     outcome.output_path.display(),
//!     outcome.errors.len()
//! );
//! ```

pub mod config;
pub mod error;
pub mod hardlink;
pub mod probe;
pub mod record;
pub mod report;
pub mod walk;
pub mod walker;

pub use config::{CliArgs, Compression, ReportFormat, ScanConfig, ScanRequest};
pub use error::{ConfigError, EntryError, Result, SinkError, WalkerError};
pub use record::{EntryKind, Record};
pub use walk::{walk, Walk};
pub use walker::{ScanCoordinator, ScanOutcome, ScanSummary};

/// Run a scan request end to end and return the outcome.
///
/// Validates the request, runs the parallel traversal, and streams the
/// report to the resolved output path. Individual entry failures never
/// fail the call; they are returned in [`ScanOutcome::errors`].
pub fn report(request: ScanRequest) -> Result<ScanOutcome> {
    let config = ScanConfig::from_request(request)?;
    let coordinator = ScanCoordinator::new(config)?;
    coordinator.run()
}
