//! Hardlink detection
//!
//! Tracks `(device, inode)` pairs seen during one scan so that duplicate
//! directory entries pointing at the same storage object can be flagged.
//! The tracker is scoped to a single scan instance; concurrent scans do
//! not share state.

use dashmap::DashSet;

/// Concurrent registry of observed `(device, inode)` pairs.
///
/// Check-then-insert is a single atomic operation, so under concurrent
/// calls exactly one caller observes the first occurrence of a pair.
#[derive(Debug, Default)]
pub struct HardlinkTracker {
    seen: DashSet<(u64, u64)>,
}

impl HardlinkTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe one entry. Returns `true` iff `link_count > 1` and this
    /// `(device, inode)` pair was registered by a prior call.
    ///
    /// Entries with a single link are never registered: no other
    /// directory entry can reference them, so the set stays proportional
    /// to the number of actually hard-linked files.
    pub fn observe(&self, device: u64, inode: u64, link_count: u64) -> bool {
        if link_count <= 1 {
            return false;
        }
        !self.seen.insert((device, inode))
    }

    /// Number of multi-link objects registered so far
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// True if nothing has been registered
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
