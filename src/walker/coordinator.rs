//! Scan coordinator - orchestrates the parallel traversal
//!
//! The coordinator is responsible for:
//! - Wiring up the work queue, node tree, hardlink tracker, error
//!   collector, report writer, and workers
//! - Seeding the root task
//! - Watching for completion (root finalized) or abort
//! - Joining workers, finishing the writer, and assembling the outcome

use crate::config::ScanConfig;
use crate::error::{ErrorCollector, Result, WalkerError};
use crate::hardlink::HardlinkTracker;
use crate::probe::probe;
use crate::report::ReportWriter;
use crate::walker::queue::{DirTask, WorkQueue};
use crate::walker::tree::NodeTree;
use crate::walker::worker::{aggregate_stats, Worker, WorkerContext};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Totals for a completed (or aborted) scan
#[derive(Debug)]
pub struct ScanSummary {
    /// Directories expanded
    pub dirs: u64,

    /// Non-directory entries recorded
    pub files: u64,

    /// Total bytes (sum of non-directory sizes)
    pub bytes: u64,

    /// Rows serialized to the report
    pub rows_written: u64,

    /// Wall-clock time for the scan
    pub duration: Duration,

    /// Whether the scan ran to completion (vs. aborted/interrupted)
    pub completed: bool,
}

/// Result of a scan request
///
/// A scan always returns an outcome; per-entry failures land in `errors`
/// rather than unwinding the scan. Callers inspect the list to detect
/// degraded (partial) results.
#[derive(Debug)]
pub struct ScanOutcome {
    /// Resolved report path
    pub output_path: PathBuf,

    /// Per-entry errors, plus the fatal cause if the scan aborted
    pub errors: Vec<WalkerError>,

    /// Scan totals
    pub summary: ScanSummary,
}

impl ScanOutcome {
    /// True when the scan completed with no errors of any kind
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.summary.completed
    }
}

/// Coordinates the parallel scan
pub struct ScanCoordinator {
    config: Arc<ScanConfig>,
    queue: WorkQueue,
    tree: Arc<NodeTree>,
    hardlinks: Arc<HardlinkTracker>,
    errors: Arc<ErrorCollector>,
    writer: Option<ReportWriter>,
    workers: Vec<Worker>,
    abort: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
}

impl ScanCoordinator {
    /// Create a coordinator from a validated configuration.
    ///
    /// This opens the report output, so it runs only after configuration
    /// validation has passed.
    pub fn new(config: ScanConfig) -> Result<Self> {
        let abort = Arc::new(AtomicBool::new(false));
        let writer = ReportWriter::new(&config, Arc::clone(&abort))?;

        Ok(Self {
            config: Arc::new(config),
            queue: WorkQueue::new(),
            tree: Arc::new(NodeTree::new()),
            hardlinks: Arc::new(HardlinkTracker::new()),
            errors: Arc::new(ErrorCollector::new()),
            writer: Some(writer),
            workers: Vec::new(),
            abort,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Get a clone of the abort flag (for signal handlers)
    pub fn abort_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort)
    }

    /// Run the scan
    pub fn run(mut self) -> Result<ScanOutcome> {
        let start = Instant::now();

        info!(
            root = %self.config.root.display(),
            workers = self.config.worker_count,
            format = self.config.format.as_str(),
            output = %self.config.output_path.display(),
            "Starting scan"
        );

        let writer = self.writer.take().ok_or(WalkerError::Interrupted)?;
        let writer_handle = writer.handle();

        // Seed the root node and task
        let root_record = probe(&self.config.root, 0, 0, true, &self.hardlinks)
            .map_err(WalkerError::Entry)?;
        let root_node = self.tree.alloc(None, root_record);
        self.queue
            .seed(DirTask::new(root_node.id(), self.config.root.clone(), 0));

        self.spawn_workers(&writer)?;

        let completed = self.wait_for_completion();

        self.shutdown.store(true, Ordering::SeqCst);
        let (dirs, files, bytes) = self.join_workers();

        let sink_result = writer.finish();
        let rows_written = writer_handle.stats().rows_written();

        let mut errors: Vec<WalkerError> = self
            .errors
            .drain()
            .into_iter()
            .map(WalkerError::Entry)
            .collect();

        match sink_result {
            Ok(()) => {
                if !completed {
                    errors.push(WalkerError::Interrupted);
                }
            }
            Err(e) => errors.push(WalkerError::Sink(e)),
        }

        let duration = start.elapsed();

        info!(
            dirs = dirs,
            files = files,
            bytes = bytes,
            rows = rows_written,
            errors = errors.len(),
            duration_ms = duration.as_millis() as u64,
            completed = completed,
            "Scan finished"
        );

        Ok(ScanOutcome {
            output_path: self.config.output_path.clone(),
            errors,
            summary: ScanSummary {
                dirs,
                files,
                bytes,
                rows_written,
                duration,
                completed,
            },
        })
    }

    /// Spawn the worker pool
    fn spawn_workers(&mut self, writer: &ReportWriter) -> Result<()> {
        let ctx = WorkerContext {
            config: Arc::clone(&self.config),
            tree: Arc::clone(&self.tree),
            queue_tx: self.queue.sender(),
            writer: writer.handle(),
            hardlinks: Arc::clone(&self.hardlinks),
            errors: Arc::clone(&self.errors),
            abort: Arc::clone(&self.abort),
            shutdown: Arc::clone(&self.shutdown),
        };

        for id in 0..self.config.worker_count {
            match Worker::spawn(id, ctx.clone(), self.queue.receiver()) {
                Ok(worker) => self.workers.push(worker),
                Err(e) => {
                    self.shutdown.store(true, Ordering::SeqCst);
                    return Err(e.into());
                }
            }
        }

        info!(count = self.workers.len(), "Workers spawned");
        Ok(())
    }

    /// Wait until the root finalizes, the abort flag trips, or the pool
    /// goes stably idle without completion.
    fn wait_for_completion(&self) -> bool {
        let check_interval = Duration::from_millis(50);
        let stable_checks_required = 3;
        let mut stable_count = 0;

        loop {
            if self.tree.is_root_done() {
                return true;
            }

            if self.abort.load(Ordering::SeqCst) {
                info!("Abort flag set, stopping scan");
                return false;
            }

            if self.queue.is_idle() {
                stable_count += 1;
                if stable_count >= stable_checks_required {
                    warn!(
                        open_nodes = self.tree.open_nodes(),
                        "Traversal went idle without finalizing the root"
                    );
                    return false;
                }
            } else {
                stable_count = 0;
            }

            thread::sleep(check_interval);
        }
    }

    /// Join all worker threads and collect final stats
    fn join_workers(&mut self) -> (u64, u64, u64) {
        let stats = aggregate_stats(&self.workers);

        let workers = std::mem::take(&mut self.workers);
        for worker in workers {
            if let Err(e) = worker.join() {
                warn!(error = %e, "Worker failed to join cleanly");
            }
        }

        stats
    }
}
