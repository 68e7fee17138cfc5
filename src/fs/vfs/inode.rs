//! Node Metadata Types
//!
//! File mode bits, the stat record handed across the boundary, directory
//! entries and the attribute template used when creating nodes.

use alloc::string::String;

/// POSIX file mode bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct FileMode(pub u32);

impl FileMode {
    // File types
    pub const S_IFMT: u32 = 0o170000; // File type mask
    pub const S_IFREG: u32 = 0o100000; // Regular file
    pub const S_IFDIR: u32 = 0o040000; // Directory

    // Permissions
    pub const S_IRUSR: u32 = 0o0400;
    pub const S_IWUSR: u32 = 0o0200;
    pub const S_IXUSR: u32 = 0o0100;
    pub const S_IRGRP: u32 = 0o0040;
    pub const S_IXGRP: u32 = 0o0010;
    pub const S_IROTH: u32 = 0o0004;
    pub const S_IXOTH: u32 = 0o0001;

    /// rw-r--r--
    pub const FILE_DEFAULT: u32 = Self::S_IRUSR | Self::S_IWUSR | Self::S_IRGRP | Self::S_IROTH;
    /// rwxr-xr-x
    pub const DIR_DEFAULT: u32 = Self::FILE_DEFAULT | Self::S_IXUSR | Self::S_IXGRP | Self::S_IXOTH;

    /// Create a new FileMode
    pub const fn new(mode: u32) -> Self {
        Self(mode)
    }

    /// Regular file with the given mode, as `mknod` builds it
    pub const fn regular(mode: u32) -> Self {
        Self(mode | Self::S_IFREG | Self::FILE_DEFAULT)
    }

    /// Directory with the given mode, as `mkdir` builds it
    pub const fn directory(mode: u32) -> Self {
        Self(mode | Self::S_IFDIR | Self::DIR_DEFAULT)
    }

    /// Get the file type
    pub const fn file_type(&self) -> u32 {
        self.0 & Self::S_IFMT
    }

    /// Get the permission bits
    pub const fn permissions(&self) -> u32 {
        self.0 & 0o7777
    }

    /// Check if this is a regular file
    pub const fn is_file(&self) -> bool {
        self.file_type() == Self::S_IFREG
    }

    /// Check if this is a directory
    pub const fn is_dir(&self) -> bool {
        self.file_type() == Self::S_IFDIR
    }
}

/// Attributes a new node starts with
///
/// The bridge fills in owner and mode; size, link count and timestamps are
/// set by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateAttr {
    pub mode: FileMode,
    pub uid: u32,
    pub gid: u32,
}

impl CreateAttr {
    pub const fn new(mode: FileMode, uid: u32, gid: u32) -> Self {
        Self { mode, uid, gid }
    }

    /// Link count a fresh node of this kind carries
    pub const fn initial_nlink(&self) -> u32 {
        if self.mode.is_dir() {
            2
        } else {
            1
        }
    }
}

/// Linux-compatible stat structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stat {
    pub st_ino: u64,        // Node sequence number
    pub st_mode: u32,       // File type and mode
    pub st_nlink: u32,      // Number of hard links
    pub st_uid: u32,        // User ID
    pub st_gid: u32,        // Group ID
    pub st_size: u64,       // Total size in bytes
    pub st_blksize: u32,    // Block size for I/O
    pub st_blocks: u64,     // Number of 512B blocks held by the chain
    pub st_atime_sec: i64,  // Access time seconds
    pub st_atime_nsec: i64, // Access time nanoseconds
    pub st_mtime_sec: i64,  // Modification time seconds
    pub st_mtime_nsec: i64, // Modification time nanoseconds
    pub st_ctime_sec: i64,  // Status change time seconds
    pub st_ctime_nsec: i64, // Status change time nanoseconds
}

impl Stat {
    pub fn mode(&self) -> FileMode {
        FileMode(self.st_mode)
    }

    /// Store a nanosecond timestamp into a (sec, nsec) pair
    pub(crate) fn split_time(ns: u64) -> (i64, i64) {
        ((ns / 1_000_000_000) as i64, (ns % 1_000_000_000) as i64)
    }
}

/// Directory entry produced by enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEnt {
    pub name: String,
    /// `None` for the synthetic `.` and `..` entries
    pub stat: Option<Stat>,
}

impl DirEnt {
    pub fn new(name: String, stat: Option<Stat>) -> Self {
        Self { name, stat }
    }

    pub fn is_synthetic(&self) -> bool {
        self.name == "." || self.name == ".."
    }
}
