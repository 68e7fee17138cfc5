//! Superblock Trait and Types
//!
//! This module defines the SuperBlock and FsType traits a mounted ChainFS
//! instance provides, along with mount options, statistics and the error type
//! shared by every layer of the engine.

use alloc::string::String;
use alloc::sync::Arc;
use core::fmt;

use crate::config::FsConfig;

/// Filesystem type trait for mounting
pub trait FsType: Send + Sync {
    /// Mounted instance produced by this type
    type Super: SuperBlock;

    /// Returns the filesystem type name (e.g., "chainfs")
    fn name(&self) -> &'static str;

    /// Mount a filesystem instance
    ///
    /// # Arguments
    /// * `opts` - Mount options
    ///
    /// # Returns
    /// A new SuperBlock instance on success
    fn mount(&self, opts: MountOpts) -> FsResult<Arc<Self::Super>>;
}

/// Superblock trait representing a mounted filesystem instance
pub trait SuperBlock: Send + Sync {
    /// Get filesystem statistics
    fn statfs(&self) -> StatFs;

    /// Sync all dirty data and metadata to storage
    fn sync(&self) -> FsResult<()>;
}

/// Mount options
#[derive(Debug, Clone, Default)]
pub struct MountOpts {
    pub flags: MountFlags,
    /// Comma-separated `key=value` list: `block_size`, `block_count`, `name_max`
    pub data: Option<String>,
}

impl MountOpts {
    pub fn new(flags: MountFlags, data: Option<String>) -> Self {
        Self { flags, data }
    }

    /// Build the instance configuration from the option string
    ///
    /// Keys that are not given keep their defaults.
    pub fn config(&self) -> FsResult<FsConfig> {
        let mut config = FsConfig::default();
        let data = match &self.data {
            Some(data) => data,
            None => return Ok(config),
        };

        for option in data.split(',').map(str::trim).filter(|o| !o.is_empty()) {
            let (key, value) = option.split_once('=').ok_or(FsError::InvalidArgument)?;
            let value: usize = value.trim().parse().map_err(|_| {
                log::warn!("[CHAINFS] bad value in mount option '{}'", option);
                FsError::InvalidArgument
            })?;
            match key.trim() {
                "block_size" => config.block_size = value,
                "block_count" => config.block_count = value,
                "name_max" => config.name_max = value,
                other => {
                    log::warn!("[CHAINFS] unknown mount option '{}'", other);
                    return Err(FsError::InvalidArgument);
                }
            }
        }

        config.validate()?;
        Ok(config)
    }
}

bitflags::bitflags! {
    /// Mount flags
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct MountFlags: u64 {
        /// Reject every operation that would mutate the store
        const RDONLY = 1 << 0;
    }
}

/// Filesystem statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatFs {
    /// Filesystem type
    pub f_type: u64,
    /// Block size
    pub f_bsize: u64,
    /// Total blocks in the store
    pub f_blocks: u64,
    /// Free blocks in the store
    pub f_bfree: u64,
    /// Free blocks available to unprivileged user
    pub f_bavail: u64,
    /// Nodes currently in the table
    pub f_files: u64,
    /// Nodes that could still be created (one record block each)
    pub f_ffree: u64,
    /// Maximum length of filenames
    pub f_namelen: u64,
}

/// Result type for filesystem operations
pub type FsResult<T> = Result<T, FsError>;

/// Filesystem error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// No free block left, or a write's growth cannot be satisfied
    Exhausted,
    /// Name absent, or the handle's node was deleted
    NotFound,
    /// Name longer than the configured limit
    NameTooLong,
    /// Read past the recorded size, or a seek ran off the end of a chain
    InvalidOffset,
    /// Name already present in the table
    AlreadyExists,
    /// Invalid argument
    InvalidArgument,
    /// Content operation on a directory node
    IsADirectory,
    /// Mutation on a read-only mount
    ReadOnlyFilesystem,
    /// A chain link points at a free block
    IoError,
}

impl FsError {
    pub const fn as_str(&self) -> &'static str {
        match self {
            FsError::Exhausted => "no free block available",
            FsError::NotFound => "no such node",
            FsError::NameTooLong => "name too long",
            FsError::InvalidOffset => "offset outside of file",
            FsError::AlreadyExists => "node already exists",
            FsError::InvalidArgument => "invalid argument",
            FsError::IsADirectory => "is a directory",
            FsError::ReadOnlyFilesystem => "read-only filesystem",
            FsError::IoError => "corrupted block chain",
        }
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FsError {}
