//! Entry prober
//!
//! Issues exactly one status syscall per filesystem entry and normalizes
//! the result into a [`Record`]. With `follow` set the lookup traverses a
//! final symlink (`stat` semantics); otherwise the link itself is
//! described (`lstat` semantics). Retry policy, if any, belongs to the
//! caller.

use crate::error::EntryError;
use crate::hardlink::HardlinkTracker;
use crate::record::{display_name, split_extension, EntryKind, Record, FILE_COUNT_SENTINEL};
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

/// Probe one entry and build its record.
///
/// `parent_inode` is the inode of the containing directory (0 for the
/// scan root) and `depth` the distance from the root. The hardlink
/// tracker is consulted for non-directory entries only; directories
/// always report `is_hardlink = false`.
pub fn probe(
    path: &Path,
    parent_inode: u64,
    depth: u32,
    follow: bool,
    hardlinks: &HardlinkTracker,
) -> Result<Record, EntryError> {
    let meta = if follow {
        fs::metadata(path)
    } else {
        fs::symlink_metadata(path)
    }
    .map_err(|source| EntryError::Stat {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(record_from_metadata(path, &meta, parent_inode, depth, hardlinks))
}

/// Normalize an already-fetched stat result into a record.
pub fn record_from_metadata(
    path: &Path,
    meta: &fs::Metadata,
    parent_inode: u64,
    depth: u32,
    hardlinks: &HardlinkTracker,
) -> Record {
    let kind = EntryKind::from_file_type(&meta.file_type());
    let filename = display_name(path);
    let extension = split_extension(&filename).to_string();

    let is_hardlink = if kind.is_dir() {
        false
    } else {
        hardlinks.observe(meta.dev(), meta.ino(), meta.nlink())
    };

    let (file_count, dir_sum) = if kind.is_dir() {
        (0, 0)
    } else {
        (FILE_COUNT_SENTINEL, 0)
    };

    Record {
        kind,
        inode: meta.ino(),
        parent_inode,
        depth,
        filename,
        extension,
        uid: meta.uid(),
        gid: meta.gid(),
        size: meta.size(),
        device: meta.dev(),
        blocks_allocated: meta.blocks(),
        link_count: meta.nlink(),
        mode: meta.mode(),
        atime: meta.atime(),
        mtime: meta.mtime(),
        ctime: meta.ctime(),
        file_count,
        dir_sum,
        is_hardlink,
    }
}
