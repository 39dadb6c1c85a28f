//! Directory node tree and bottom-up aggregation
//!
//! An in-memory tree mirrors the portion of the filesystem currently
//! being aggregated. Nodes live in an arena keyed by a numeric id with
//! parent back-references by id, so finalization chains are explicit
//! loops rather than call-stack recursion and depth is bounded only by
//! available memory.
//!
//! Every node keeps its accumulators, outstanding-children counter, and
//! listing flag behind a single mutex: a fold (accumulate + decrement +
//! completion check) is one atomic step, so two children finalizing into
//! the same parent concurrently cannot lose an update. A node finalizes
//! the instant its listing is exhausted and its last outstanding child
//! has folded; the finalized record is emitted, the node is dropped from
//! the arena, and its totals fold one level up. The chain stops at a
//! node that still has outstanding children, or at the root - root
//! finalization is the scan's completion signal.

use crate::error::SinkError;
use crate::record::Record;
use crate::report::WriterHandle;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Identifier of a node in the arena
pub type NodeId = u64;

/// Mutable per-node aggregation state
#[derive(Debug)]
struct NodeState {
    /// Partial record, taken exactly once at finalization
    record: Option<Record>,

    /// Subdirectory children not yet finalized
    pending_children: usize,

    /// Set when the directory listing has been exhausted
    listing_done: bool,

    /// Running count of non-directory descendants
    file_count: i64,

    /// Running byte sum of non-directory descendants
    dir_sum: i64,
}

/// One open directory being aggregated
#[derive(Debug)]
pub struct DirNode {
    id: NodeId,
    parent: Option<NodeId>,
    device: u64,
    inode: u64,
    state: Mutex<NodeState>,
}

impl DirNode {
    /// Node id in the arena
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Inode of this directory (parent inode for its children)
    pub fn inode(&self) -> u64 {
        self.inode
    }

    /// Fold one non-directory child into this node's running totals
    pub fn accumulate_leaf(&self, record: &Record) {
        let mut state = self.state.lock();
        state.file_count += 1;
        state.dir_sum += record.size as i64;
    }
}

/// Arena of open directory nodes
pub struct NodeTree {
    nodes: DashMap<NodeId, Arc<DirNode>>,
    next_id: AtomicU64,
    root_done: AtomicBool,
}

impl NodeTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self {
            nodes: DashMap::new(),
            next_id: AtomicU64::new(0),
            root_done: AtomicBool::new(false),
        }
    }

    /// Create a node for a directory that is about to be expanded.
    ///
    /// The node holds the directory's partial record until finalization.
    /// Passing the parent registers one more outstanding child there;
    /// the caller owns the parent's listing, so the parent cannot
    /// finalize concurrently.
    pub fn alloc(&self, parent: Option<&Arc<DirNode>>, record: Record) -> Arc<DirNode> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let node = Arc::new(DirNode {
            id,
            parent: parent.map(|p| p.id),
            device: record.device,
            inode: record.inode,
            state: Mutex::new(NodeState {
                record: Some(record),
                pending_children: 0,
                listing_done: false,
                file_count: 0,
                dir_sum: 0,
            }),
        });

        if let Some(parent) = parent {
            parent.state.lock().pending_children += 1;
        }

        self.nodes.insert(id, Arc::clone(&node));
        node
    }

    /// Look up an open node by id
    pub fn get(&self, id: NodeId) -> Option<Arc<DirNode>> {
        self.nodes.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Number of currently open nodes
    pub fn open_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// True once the root node has finalized
    pub fn is_root_done(&self) -> bool {
        self.root_done.load(Ordering::Acquire)
    }

    /// True if `(device, inode)` matches this node or any of its
    /// ancestors - the cycle check for followed symlinks. Ancestors stay
    /// in the arena while any descendant is open, so the walk upward is
    /// always complete.
    pub fn on_path(&self, start: NodeId, device: u64, inode: u64) -> bool {
        let mut current = self.get(start);
        while let Some(node) = current {
            if node.device == device && node.inode == inode {
                return true;
            }
            current = node.parent.and_then(|id| self.get(id));
        }
        false
    }

    /// Mark a directory's listing as exhausted, finalizing it (and its
    /// completed ancestors) if no children are outstanding.
    pub fn finish_listing(
        &self,
        node: &Arc<DirNode>,
        writer: &WriterHandle,
    ) -> Result<(), SinkError> {
        let ready = {
            let mut state = node.state.lock();
            state.listing_done = true;
            state.pending_children == 0
        };

        if ready {
            self.complete_chain(node, writer)
        } else {
            Ok(())
        }
    }

    /// Finalize `start` and fold upward until a node with outstanding
    /// children or the root. The caller must have observed the node as
    /// ready (listing done, zero outstanding children).
    fn complete_chain(
        &self,
        start: &Arc<DirNode>,
        writer: &WriterHandle,
    ) -> Result<(), SinkError> {
        let mut current = Arc::clone(start);

        loop {
            let record = {
                let mut state = current.state.lock();
                let mut record = match state.record.take() {
                    Some(record) => record,
                    // Already finalized by another observer of the same
                    // transition; nothing left to do.
                    None => return Ok(()),
                };
                record.file_count = state.file_count;
                record.dir_sum = state.dir_sum;
                record.size = state.dir_sum as u64;
                record
            };

            let file_count = record.file_count;
            let dir_sum = record.dir_sum;

            self.nodes.remove(&current.id);
            writer.send(record)?;

            let Some(parent_id) = current.parent else {
                self.root_done.store(true, Ordering::Release);
                return Ok(());
            };

            let Some(parent) = self.get(parent_id) else {
                tracing::warn!(node = parent_id, "Parent node missing during fold");
                return Ok(());
            };

            let ready = {
                let mut state = parent.state.lock();
                state.file_count += file_count;
                state.dir_sum += dir_sum;
                state.pending_children -= 1;
                state.pending_children == 0 && state.listing_done
            };

            if !ready {
                return Ok(());
            }
            current = parent;
        }
    }
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{EntryKind, Record};
    use crate::report::SinkMessage;

    fn dir_record(inode: u64, parent_inode: u64, depth: u32, name: &str) -> Record {
        Record {
            kind: EntryKind::Directory,
            inode,
            parent_inode,
            depth,
            filename: name.to_string(),
            extension: String::new(),
            uid: 0,
            gid: 0,
            size: 4096,
            device: 1,
            blocks_allocated: 8,
            link_count: 2,
            mode: 0o40755,
            atime: 0,
            mtime: 0,
            ctime: 0,
            file_count: 0,
            dir_sum: 0,
            is_hardlink: false,
        }
    }

    fn file_record(inode: u64, parent_inode: u64, depth: u32, name: &str, size: u64) -> Record {
        Record {
            kind: EntryKind::File,
            inode,
            parent_inode,
            depth,
            filename: name.to_string(),
            extension: String::new(),
            uid: 0,
            gid: 0,
            size,
            device: 1,
            blocks_allocated: 8,
            link_count: 1,
            mode: 0o100644,
            atime: 0,
            mtime: 0,
            ctime: 0,
            file_count: -1,
            dir_sum: 0,
            is_hardlink: false,
        }
    }

    #[test]
    fn test_single_node_finalizes_on_listing_end() {
        let tree = NodeTree::new();
        let (writer, rx) = WriterHandle::for_tests();

        let root = tree.alloc(None, dir_record(1, 0, 0, "root"));
        root.accumulate_leaf(&file_record(2, 1, 1, "a", 10));
        root.accumulate_leaf(&file_record(3, 1, 1, "b", 5));

        tree.finish_listing(&root, &writer).unwrap();

        assert!(tree.is_root_done());
        assert_eq!(tree.open_nodes(), 0);

        let SinkMessage::Record(record) = rx.try_recv().unwrap() else {
            panic!("expected a record");
        };
        assert_eq!(record.file_count, 2);
        assert_eq!(record.dir_sum, 15);
        assert_eq!(record.size, 15);
    }

    #[test]
    fn test_child_fold_chains_to_root() {
        let tree = NodeTree::new();
        let (writer, rx) = WriterHandle::for_tests();

        let root = tree.alloc(None, dir_record(1, 0, 0, "root"));
        let child = tree.alloc(Some(&root), dir_record(10, 1, 1, "child"));

        // Root's listing ends first; it must wait for the child.
        tree.finish_listing(&root, &writer).unwrap();
        assert!(!tree.is_root_done());

        child.accumulate_leaf(&file_record(11, 10, 2, "f", 9));
        tree.finish_listing(&child, &writer).unwrap();

        assert!(tree.is_root_done());

        // Child record first, then root.
        let SinkMessage::Record(first) = rx.try_recv().unwrap() else {
            panic!("expected a record");
        };
        let SinkMessage::Record(second) = rx.try_recv().unwrap() else {
            panic!("expected a record");
        };
        assert_eq!(first.filename, "child");
        assert_eq!(first.file_count, 1);
        assert_eq!(first.dir_sum, 9);
        assert_eq!(second.filename, "root");
        assert_eq!(second.file_count, 1);
        assert_eq!(second.dir_sum, 9);
    }

    #[test]
    fn test_directory_children_do_not_count_as_files() {
        let tree = NodeTree::new();
        let (writer, rx) = WriterHandle::for_tests();

        let root = tree.alloc(None, dir_record(1, 0, 0, "root"));
        let d1 = tree.alloc(Some(&root), dir_record(10, 1, 1, "d1"));
        let d2 = tree.alloc(Some(&root), dir_record(20, 1, 1, "d2"));

        d1.accumulate_leaf(&file_record(11, 10, 2, "x", 12));
        d1.accumulate_leaf(&file_record(12, 10, 2, "y", 11));
        d2.accumulate_leaf(&file_record(21, 20, 2, "z", 9));

        tree.finish_listing(&root, &writer).unwrap();
        tree.finish_listing(&d1, &writer).unwrap();
        tree.finish_listing(&d2, &writer).unwrap();

        let mut by_name = std::collections::HashMap::new();
        while let Ok(SinkMessage::Record(record)) = rx.try_recv() {
            by_name.insert(record.filename.clone(), record);
        }

        assert_eq!(by_name["d1"].file_count, 2);
        assert_eq!(by_name["d1"].dir_sum, 23);
        assert_eq!(by_name["d2"].file_count, 1);
        assert_eq!(by_name["root"].file_count, 3);
        assert_eq!(by_name["root"].dir_sum, 32);
    }

    #[test]
    fn test_on_path_ancestry() {
        let tree = NodeTree::new();

        let mut root_rec = dir_record(1, 0, 0, "root");
        root_rec.device = 7;
        let root = tree.alloc(None, root_rec);

        let mut child_rec = dir_record(2, 1, 1, "child");
        child_rec.device = 7;
        let child = tree.alloc(Some(&root), child_rec);

        assert!(tree.on_path(child.id(), 7, 1));
        assert!(tree.on_path(child.id(), 7, 2));
        assert!(!tree.on_path(child.id(), 7, 3));
        assert!(!tree.on_path(child.id(), 8, 1));
    }

    #[test]
    fn test_concurrent_folds_lose_nothing() {
        let tree = Arc::new(NodeTree::new());
        let (writer, rx) = WriterHandle::for_tests();

        let root = tree.alloc(None, dir_record(1, 0, 0, "root"));
        let children: Vec<_> = (0..32)
            .map(|i| tree.alloc(Some(&root), dir_record(100 + i, 1, 1, &format!("c{}", i))))
            .collect();
        tree.finish_listing(&root, &writer).unwrap();

        let handles: Vec<_> = children
            .into_iter()
            .map(|child| {
                let tree = Arc::clone(&tree);
                let writer = writer.clone();
                std::thread::spawn(move || {
                    child.accumulate_leaf(&file_record(child.inode() + 1000, child.inode(), 2, "f", 3));
                    tree.finish_listing(&child, &writer).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(tree.is_root_done());

        let mut last = None;
        let mut count = 0;
        while let Ok(SinkMessage::Record(record)) = rx.try_recv() {
            count += 1;
            last = Some(record);
        }
        assert_eq!(count, 33);

        let root_record = last.unwrap();
        assert_eq!(root_record.filename, "root");
        assert_eq!(root_record.file_count, 32);
        assert_eq!(root_record.dir_sum, 96);
    }
}
