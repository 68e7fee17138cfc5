//! Configuration for ChainFS instances

use crate::fs::vfs::superblock::{FsError, FsResult};

/// Size of one block in bytes, header included
pub const BLOCK_SIZE: usize = 4096;

/// Number of blocks in a store (1 << 20 blocks * 4 KiB = 4 GiB ceiling)
pub const BLOCK_COUNT: usize = 1 << 20;

/// Maximum length of a node name in bytes
pub const NAME_MAX: usize = 255;

/// Bytes reserved at the start of every block for the next-link
pub const HEADER_SIZE: usize = core::mem::size_of::<u64>();

/// Parameters fixed when a filesystem instance is mounted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsConfig {
    /// Bytes per block, including the link header
    pub block_size: usize,
    /// Number of blocks in the store
    pub block_count: usize,
    /// Longest accepted node name, in bytes
    pub name_max: usize,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            block_size: BLOCK_SIZE,
            block_count: BLOCK_COUNT,
            name_max: NAME_MAX,
        }
    }
}

impl FsConfig {
    pub const fn new(block_size: usize, block_count: usize, name_max: usize) -> Self {
        Self {
            block_size,
            block_count,
            name_max,
        }
    }

    pub const fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub const fn with_block_count(mut self, block_count: usize) -> Self {
        self.block_count = block_count;
        self
    }

    pub const fn with_name_max(mut self, name_max: usize) -> Self {
        self.name_max = name_max;
        self
    }

    /// Usable content bytes per block; 0 for a block too small to hold any
    pub const fn payload_capacity(&self) -> usize {
        self.block_size.saturating_sub(HEADER_SIZE)
    }

    /// Hard ceiling on bytes held by the store, headers included
    pub const fn total_bytes(&self) -> u64 {
        self.block_size as u64 * self.block_count as u64
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> FsResult<()> {
        if self.block_size <= HEADER_SIZE {
            log::warn!(
                "[CHAINFS] block_size {} leaves no payload (header is {} bytes)",
                self.block_size,
                HEADER_SIZE
            );
            return Err(FsError::InvalidArgument);
        }
        if self.block_count == 0 {
            log::warn!("[CHAINFS] block_count must be non-zero");
            return Err(FsError::InvalidArgument);
        }
        if self.name_max == 0 {
            log::warn!("[CHAINFS] name_max must be non-zero");
            return Err(FsError::InvalidArgument);
        }
        Ok(())
    }
}
