//! Worker thread logic for parallel directory traversal
//!
//! Each worker:
//! - Pulls directory-expansion tasks from the shared work queue
//! - Lists the directory and probes every child entry exactly once
//! - Accumulates file children into the directory's node inline
//! - Creates nodes and tasks for subdirectories
//! - Finalizes the node when the listing is exhausted, which may chain
//!   fold-ups through completed ancestors
//!
//! Abort and shutdown flags are checked between tasks; a started listing
//! always runs to completion so its node finalizes exactly once.

use crate::config::ScanConfig;
use crate::error::{EntryError, ErrorCollector};
use crate::hardlink::HardlinkTracker;
use crate::probe::probe;
use crate::record::Record;
use crate::report::WriterHandle;
use crate::walker::queue::{DirTask, WorkGuard, WorkQueueReceiver, WorkQueueSender};
use crate::walker::tree::{DirNode, NodeTree};
use std::fs;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// Statistics collected by a worker
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Directories processed
    pub dirs_processed: AtomicU64,

    /// Non-directory entries recorded
    pub files_found: AtomicU64,

    /// Bytes found (sum of non-directory sizes)
    pub bytes_found: AtomicU64,
}

impl WorkerStats {
    fn record_dir(&self) {
        self.dirs_processed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_file(&self) {
        self.files_found.fetch_add(1, Ordering::Relaxed);
    }

    fn record_bytes(&self, bytes: u64) {
        self.bytes_found.fetch_add(bytes, Ordering::Relaxed);
    }
}

/// Everything a worker thread needs, cloneable per worker
#[derive(Clone)]
pub struct WorkerContext {
    /// Validated scan configuration
    pub config: Arc<ScanConfig>,

    /// Shared directory node tree
    pub tree: Arc<NodeTree>,

    /// Task producer side of the work queue
    pub queue_tx: WorkQueueSender,

    /// Record sink handle
    pub writer: WriterHandle,

    /// Scan-scoped hardlink registry
    pub hardlinks: Arc<HardlinkTracker>,

    /// Shared entry-error collector
    pub errors: Arc<ErrorCollector>,

    /// Fatal-abort flag (sink failure, interrupt)
    pub abort: Arc<AtomicBool>,

    /// Orderly shutdown flag set by the coordinator
    pub shutdown: Arc<AtomicBool>,
}

/// A worker thread that processes directory tasks
pub struct Worker {
    id: usize,
    handle: Option<JoinHandle<()>>,
    stats: Arc<WorkerStats>,
}

impl Worker {
    /// Spawn a new worker thread
    pub fn spawn(
        id: usize,
        ctx: WorkerContext,
        queue_rx: WorkQueueReceiver,
    ) -> Result<Self, crate::error::WorkerError> {
        let stats = Arc::new(WorkerStats::default());
        let stats_clone = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name(format!("walker-{}", id))
            .spawn(move || worker_loop(id, ctx, queue_rx, stats_clone))
            .map_err(|e| crate::error::WorkerError::SpawnFailed {
                id,
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            handle: Some(handle),
            stats,
        })
    }

    /// Worker id
    pub fn id(&self) -> usize {
        self.id
    }

    /// Worker statistics
    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    /// Wait for the worker to finish
    pub fn join(mut self) -> Result<(), crate::error::WorkerError> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| crate::error::WorkerError::Panicked { id: self.id })?;
        }
        Ok(())
    }
}

/// Main worker loop
fn worker_loop(
    id: usize,
    ctx: WorkerContext,
    queue_rx: WorkQueueReceiver,
    stats: Arc<WorkerStats>,
) {
    debug!(worker = id, "Worker starting");

    while !ctx.shutdown.load(Ordering::Relaxed) {
        if ctx.abort.load(Ordering::Relaxed) {
            break;
        }

        let Some(task) = queue_rx.recv_timeout(Duration::from_millis(100)) else {
            continue;
        };

        let _guard = WorkGuard::new(&queue_rx);
        process_directory(&ctx, &stats, &task);
    }

    debug!(
        worker = id,
        dirs = stats.dirs_processed.load(Ordering::Relaxed),
        files = stats.files_found.load(Ordering::Relaxed),
        "Worker shutting down"
    );
}

/// Expand one directory: list, probe children, finalize.
fn process_directory(ctx: &WorkerContext, stats: &WorkerStats, task: &DirTask) {
    let Some(node) = ctx.tree.get(task.node_id) else {
        warn!(node = task.node_id, path = %task.path.display(), "Task for unknown node");
        return;
    };

    stats.record_dir();

    match fs::read_dir(&task.path) {
        Ok(entries) => {
            for dent in entries {
                match dent {
                    Ok(dent) => process_entry(ctx, stats, task, &node, dent),
                    Err(e) => ctx.errors.push(EntryError::List {
                        path: task.path.clone(),
                        source: e,
                    }),
                }
            }
        }
        // An unreadable directory contributes an empty listing; its
        // partial aggregate still finalizes normally.
        Err(e) => ctx.errors.push(EntryError::List {
            path: task.path.clone(),
            source: e,
        }),
    }

    if let Err(e) = ctx.tree.finish_listing(&node, &ctx.writer) {
        warn!(error = %e, "Record sink unavailable, aborting");
        ctx.abort.store(true, Ordering::SeqCst);
    }
}

/// Handle one directory entry from a listing.
fn process_entry(
    ctx: &WorkerContext,
    stats: &WorkerStats,
    task: &DirTask,
    node: &Arc<DirNode>,
    dent: fs::DirEntry,
) {
    let path = dent.path();

    let ftype = match dent.file_type() {
        Ok(t) => t,
        Err(e) => {
            ctx.errors.push(EntryError::Stat { path, source: e });
            return;
        }
    };

    let follow_link = ctx.config.follow_symlinks && ftype.is_symlink();

    // Name-based skipping applies to directories only
    if ctx.config.skip_name(&dent.file_name()) {
        if ftype.is_dir() {
            return;
        }
        if follow_link && fs::metadata(&path).map(|m| m.is_dir()).unwrap_or(false) {
            return;
        }
    }

    let record = match probe(
        &path,
        node.inode(),
        task.depth + 1,
        follow_link,
        &ctx.hardlinks,
    ) {
        Ok(record) => record,
        Err(e) => {
            ctx.errors.push(e);
            return;
        }
    };

    if record.kind.is_dir() {
        if follow_link && ctx.tree.on_path(task.node_id, record.device, record.inode) {
            ctx.errors.push(EntryError::SymlinkCycle { path: path.clone() });
            // The loop-closing link is recorded as a leaf instead
            match probe(&path, node.inode(), task.depth + 1, false, &ctx.hardlinks) {
                Ok(leaf) => emit_leaf(ctx, stats, node, leaf),
                Err(e) => ctx.errors.push(e),
            }
            return;
        }

        let child = ctx.tree.alloc(Some(node), record);
        ctx.queue_tx
            .send(DirTask::new(child.id(), path, task.depth + 1));
    } else {
        emit_leaf(ctx, stats, node, record);
    }
}

/// Fold a non-directory record into its parent and ship it to the sink.
fn emit_leaf(ctx: &WorkerContext, stats: &WorkerStats, node: &Arc<DirNode>, record: Record) {
    stats.record_file();
    stats.record_bytes(record.size);
    node.accumulate_leaf(&record);

    if ctx.writer.send(record).is_err() {
        ctx.abort.store(true, Ordering::SeqCst);
    }
}

/// Aggregate statistics from multiple workers
pub fn aggregate_stats(workers: &[Worker]) -> (u64, u64, u64) {
    let mut dirs = 0u64;
    let mut files = 0u64;
    let mut bytes = 0u64;

    for worker in workers {
        dirs += worker.stats.dirs_processed.load(Ordering::Relaxed);
        files += worker.stats.files_found.load(Ordering::Relaxed);
        bytes += worker.stats.bytes_found.load(Ordering::Relaxed);
    }

    (dirs, files, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_stats() {
        let stats = WorkerStats::default();

        stats.record_dir();
        stats.record_file();
        stats.record_file();
        stats.record_bytes(1024);

        assert_eq!(stats.dirs_processed.load(Ordering::Relaxed), 1);
        assert_eq!(stats.files_found.load(Ordering::Relaxed), 2);
        assert_eq!(stats.bytes_found.load(Ordering::Relaxed), 1024);
    }
}
