//! Record model for filesystem entries
//!
//! One [`Record`] is produced per filesystem entry encountered during a
//! scan. File records are complete as soon as the entry is probed;
//! directory records additionally carry the recursive aggregate fields
//! (`file_count`, `dir_sum`), which are stamped when the directory
//! finalizes.

use std::path::Path;

/// Sentinel written to `file_count` for non-directory rows
pub const FILE_COUNT_SENTINEL: i64 = -1;

/// Kind of filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symbolic link (recorded as a leaf when links are not followed)
    Symlink,
    /// Anything else (fifo, socket, device node)
    Other,
}

impl EntryKind {
    /// Classify from a stat result
    pub fn from_file_type(ft: &std::fs::FileType) -> Self {
        if ft.is_dir() {
            EntryKind::Directory
        } else if ft.is_file() {
            EntryKind::File
        } else if ft.is_symlink() {
            EntryKind::Symlink
        } else {
            EntryKind::Other
        }
    }

    /// True for directories
    pub fn is_dir(&self) -> bool {
        matches!(self, EntryKind::Directory)
    }
}

/// One row of the inventory report
///
/// Field semantics follow the report formats: for directories, `size`
/// carries the finalized `dir_sum` so the size column and the aggregate
/// column agree; for non-directories `file_count` is [`FILE_COUNT_SENTINEL`]
/// and `dir_sum` is 0.
#[derive(Debug, Clone)]
pub struct Record {
    /// Entry kind (not serialized; drives aggregation)
    pub kind: EntryKind,

    /// Inode number
    pub inode: u64,

    /// Inode of the containing directory (0 for the scan root)
    pub parent_inode: u64,

    /// Distance from the scan root (root = 0)
    pub depth: u32,

    /// Final path component
    pub filename: String,

    /// Substring after the last `.` of the filename; empty if none
    pub extension: String,

    /// Owner user id
    pub uid: u32,

    /// Owner group id
    pub gid: u32,

    /// Apparent byte length; for finalized directories, the subtree sum
    pub size: u64,

    /// Device id
    pub device: u64,

    /// 512-byte blocks allocated
    pub blocks_allocated: u64,

    /// Hard link count
    pub link_count: u64,

    /// Raw mode bits (type + permissions)
    pub mode: u32,

    /// Access time, epoch seconds
    pub atime: i64,

    /// Modification time, epoch seconds
    pub mtime: i64,

    /// Status change time, epoch seconds
    pub ctime: i64,

    /// Directories: recursive count of non-directory descendants;
    /// files: -1
    pub file_count: i64,

    /// Directories: recursive byte sum of non-directory descendants;
    /// files: 0
    pub dir_sum: i64,

    /// True if this entry's (device, inode) was already observed
    /// elsewhere in the scan
    pub is_hardlink: bool,
}

/// Split the extension off a filename.
///
/// The extension is the substring after the last `.`; a filename without
/// a dot, or whose only dot is the leading character (`.bashrc`), has an
/// empty extension.
pub fn split_extension(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(pos) if pos > 0 => &filename[pos + 1..],
        _ => "",
    }
}

/// Final path component as a string, falling back to the whole path for
/// roots like `/` or `.` that have no file name.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("report.csv"), "csv");
        assert_eq!(split_extension("archive.tar.gz"), "gz");
        assert_eq!(split_extension("Makefile"), "");
        assert_eq!(split_extension(".bashrc"), "");
        assert_eq!(split_extension("trailing."), "");
        assert_eq!(split_extension("a.b"), "b");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(Path::new("/data/file.txt")), "file.txt");
        assert_eq!(display_name(Path::new("/")), "/");
        assert_eq!(display_name(&PathBuf::from("dir/sub")), "sub");
    }

    #[test]
    fn test_entry_kind() {
        assert!(EntryKind::Directory.is_dir());
        assert!(!EntryKind::File.is_dir());
        assert!(!EntryKind::Symlink.is_dir());
    }
}
