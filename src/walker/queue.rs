//! Work queue for directory expansion tasks
//!
//! Workers both consume expansion tasks and produce new ones for the
//! subdirectories they discover, so the task channel is unbounded: a
//! bounded queue could leave every worker blocked on `send` with nobody
//! left to drain it. Queue occupancy stays proportional to the number of
//! currently open directories.

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::walker::tree::NodeId;

/// A task to expand one directory
#[derive(Debug, Clone)]
pub struct DirTask {
    /// Node id of this directory in the node tree
    pub node_id: NodeId,

    /// Full path to the directory
    pub path: PathBuf,

    /// Depth from root (0 = root)
    pub depth: u32,
}

impl DirTask {
    /// Create a new directory task
    pub fn new(node_id: NodeId, path: PathBuf, depth: u32) -> Self {
        Self {
            node_id,
            path,
            depth,
        }
    }
}

/// Statistics for the work queue
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Total tasks enqueued
    pub enqueued: AtomicU64,

    /// Total tasks dequeued
    pub dequeued: AtomicU64,
}

/// Work queue shared by all traversal workers
pub struct WorkQueue {
    sender: Sender<DirTask>,
    receiver: Receiver<DirTask>,
    active_workers: Arc<AtomicUsize>,
    stats: Arc<QueueStats>,
}

impl WorkQueue {
    /// Create a new work queue
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();

        Self {
            sender,
            receiver,
            active_workers: Arc::new(AtomicUsize::new(0)),
            stats: Arc::new(QueueStats::default()),
        }
    }

    /// Get a sender for this queue (clone for each worker)
    pub fn sender(&self) -> WorkQueueSender {
        WorkQueueSender {
            sender: self.sender.clone(),
            stats: Arc::clone(&self.stats),
        }
    }

    /// Get a receiver for this queue (clone for each worker)
    pub fn receiver(&self) -> WorkQueueReceiver {
        WorkQueueReceiver {
            receiver: self.receiver.clone(),
            active_workers: Arc::clone(&self.active_workers),
            stats: Arc::clone(&self.stats),
        }
    }

    /// Get queue statistics
    pub fn stats(&self) -> Arc<QueueStats> {
        Arc::clone(&self.stats)
    }

    /// Seed the queue with the root task
    pub fn seed(&self, task: DirTask) {
        self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
        // Receiver lives on self, so the channel cannot be disconnected
        let _ = self.sender.send(task);
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Current queue length
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// True when no tasks are queued and no worker is mid-task
    pub fn is_idle(&self) -> bool {
        self.receiver.is_empty() && self.active_workers.load(Ordering::SeqCst) == 0
    }
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for pushing tasks onto the queue
#[derive(Clone)]
pub struct WorkQueueSender {
    sender: Sender<DirTask>,
    stats: Arc<QueueStats>,
}

impl WorkQueueSender {
    /// Push a task. Returns false if the queue is disconnected.
    pub fn send(&self, task: DirTask) -> bool {
        match self.sender.send(task) {
            Ok(()) => {
                self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(_) => false,
        }
    }
}

/// Handle for popping tasks from the queue
#[derive(Clone)]
pub struct WorkQueueReceiver {
    receiver: Receiver<DirTask>,
    active_workers: Arc<AtomicUsize>,
    stats: Arc<QueueStats>,
}

impl WorkQueueReceiver {
    /// Receive with timeout
    pub fn recv_timeout(&self, timeout: Duration) -> Option<DirTask> {
        match self.receiver.recv_timeout(timeout) {
            Ok(task) => {
                self.stats.dequeued.fetch_add(1, Ordering::Relaxed);
                Some(task)
            }
            Err(_) => None,
        }
    }

    /// Try to receive without blocking
    pub fn try_recv(&self) -> Option<DirTask> {
        match self.receiver.try_recv() {
            Ok(task) => {
                self.stats.dequeued.fetch_add(1, Ordering::Relaxed);
                Some(task)
            }
            Err(_) => None,
        }
    }

    /// Mark this worker as mid-task
    pub fn begin_work(&self) {
        self.active_workers.fetch_add(1, Ordering::SeqCst);
    }

    /// Mark this worker as idle
    pub fn end_work(&self) {
        self.active_workers.fetch_sub(1, Ordering::SeqCst);
    }
}

/// RAII guard for marking work as active
pub struct WorkGuard<'a> {
    receiver: &'a WorkQueueReceiver,
}

impl<'a> WorkGuard<'a> {
    /// Create a new work guard (marks worker as active)
    pub fn new(receiver: &'a WorkQueueReceiver) -> Self {
        receiver.begin_work();
        Self { receiver }
    }
}

impl<'a> Drop for WorkGuard<'a> {
    fn drop(&mut self) {
        self.receiver.end_work();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_basic() {
        let queue = WorkQueue::new();

        queue.seed(DirTask::new(0, "/test".into(), 0));
        assert!(!queue.is_empty());
        assert_eq!(queue.len(), 1);

        let receiver = queue.receiver();
        let task = receiver.try_recv().unwrap();
        assert_eq!(task.path, PathBuf::from("/test"));
        assert_eq!(task.depth, 0);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_queue_idle_tracking() {
        let queue = WorkQueue::new();
        let receiver = queue.receiver();

        // Empty queue with no active workers = idle
        assert!(queue.is_idle());

        queue.seed(DirTask::new(0, "/test".into(), 0));
        assert!(!queue.is_idle());

        let _guard = WorkGuard::new(&receiver);
        let _task = receiver.try_recv().unwrap();

        // Queue empty but worker active
        assert!(!queue.is_idle());

        drop(_guard);
        assert!(queue.is_idle());
    }

    #[test]
    fn test_queue_stats() {
        let queue = WorkQueue::new();
        let sender = queue.sender();
        let receiver = queue.receiver();

        assert!(sender.send(DirTask::new(1, "/a".into(), 1)));
        assert!(sender.send(DirTask::new(2, "/b".into(), 1)));

        receiver.try_recv().unwrap();
        receiver.try_recv().unwrap();

        let stats = queue.stats();
        assert_eq!(stats.enqueued.load(Ordering::Relaxed), 2);
        assert_eq!(stats.dequeued.load(Ordering::Relaxed), 2);
    }
}
