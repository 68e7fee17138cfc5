//! ChainFS Node Implementation
//!
//! One metadata record per table entry. The record owns its content chain and
//! one record block in the store; both go back to the store on delete.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};
use spin::RwLock;

use crate::config::HEADER_SIZE;
use crate::fs::chain::block::{BlockNo, BlockStore};
use crate::fs::chain::content::{blocks_for, ContentChain};
use crate::fs::vfs::inode::{CreateAttr, FileMode, Stat};
use crate::fs::vfs::superblock::{FsError, FsResult};

/// Shared handle to a node, valid until the node is deleted
pub type NodeHandle = Arc<FileNode>;

/// Node data protected by the node lock
pub struct NodeState {
    /// File mode (type and permissions)
    pub mode: FileMode,
    /// User ID
    pub uid: u32,
    /// Group ID
    pub gid: u32,
    /// Number of hard links
    pub nlink: u32,
    /// Modification time (ns since the epoch)
    pub mtime: u64,
    /// Change time
    pub ctime: u64,
    /// File content
    pub chain: ContentChain,
    /// Block charged for this record; `None` once the node is deleted
    pub record: Option<BlockNo>,
}

impl NodeState {
    fn check_live(&self) -> FsResult<()> {
        match self.record {
            Some(_) => Ok(()),
            None => Err(FsError::NotFound),
        }
    }

    fn check_file(&self) -> FsResult<()> {
        self.check_live()?;
        if self.mode.is_dir() {
            return Err(FsError::IsADirectory);
        }
        Ok(())
    }
}

/// Metadata record of one file or directory
pub struct FileNode {
    /// Creation sequence number
    ino: u64,
    name: String,
    /// Access time, kept outside the lock so readers can share it
    atime: AtomicU64,
    pub(crate) state: RwLock<NodeState>,
}

impl FileNode {
    pub(crate) fn new(ino: u64, name: String, attr: &CreateAttr, record: BlockNo) -> Self {
        let now = current_time();
        Self {
            ino,
            name,
            atime: AtomicU64::new(now),
            state: RwLock::new(NodeState {
                mode: attr.mode,
                uid: attr.uid,
                gid: attr.gid,
                nlink: attr.initial_nlink(),
                mtime: now,
                ctime: now,
                chain: ContentChain::new(),
                record: Some(record),
            }),
        }
    }

    pub fn ino(&self) -> u64 {
        self.ino
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the node is still in the table
    pub fn is_live(&self) -> bool {
        self.state.read().record.is_some()
    }

    pub fn size(&self) -> u64 {
        self.state.read().chain.size()
    }

    /// Snapshot of the node's attributes
    pub fn stat(&self, block_size: usize) -> Stat {
        let state = self.state.read();
        let size = state.chain.size();
        let blocks = blocks_for(size, block_size - HEADER_SIZE) as u64;
        let (atime_sec, atime_nsec) = Stat::split_time(self.atime.load(Ordering::Relaxed));
        let (mtime_sec, mtime_nsec) = Stat::split_time(state.mtime);
        let (ctime_sec, ctime_nsec) = Stat::split_time(state.ctime);

        Stat {
            st_ino: self.ino,
            st_mode: state.mode.0,
            st_nlink: state.nlink,
            st_uid: state.uid,
            st_gid: state.gid,
            st_size: size,
            st_blksize: block_size as u32,
            st_blocks: blocks * block_size as u64 / 512,
            st_atime_sec: atime_sec,
            st_atime_nsec: atime_nsec,
            st_mtime_sec: mtime_sec,
            st_mtime_nsec: mtime_nsec,
            st_ctime_sec: ctime_sec,
            st_ctime_nsec: ctime_nsec,
        }
    }

    /// Read up to `len` bytes at `off`
    pub(crate) fn read_at(
        &self,
        store: &RwLock<BlockStore>,
        off: u64,
        len: usize,
    ) -> FsResult<Vec<u8>> {
        let state = self.state.read();
        state.check_file()?;
        let data = state.chain.read(&store.read(), off, len)?;
        self.atime.store(current_time(), Ordering::Relaxed);
        Ok(data)
    }

    /// Fill `dst` from `off`
    pub(crate) fn read_into(
        &self,
        store: &RwLock<BlockStore>,
        off: u64,
        dst: &mut [u8],
    ) -> FsResult<usize> {
        let state = self.state.read();
        state.check_file()?;
        let read = state.chain.read_into(&store.read(), off, dst)?;
        self.atime.store(current_time(), Ordering::Relaxed);
        Ok(read)
    }

    /// Write `src` at `off`
    pub(crate) fn write_at(
        &self,
        store: &RwLock<BlockStore>,
        off: u64,
        src: &[u8],
    ) -> FsResult<usize> {
        let mut state = self.state.write();
        state.check_file()?;
        let written = state.chain.write(&mut store.write(), off, src)?;

        let now = current_time();
        state.mtime = now;
        state.ctime = now;
        self.atime.store(now, Ordering::Relaxed);
        Ok(written)
    }

    /// Shrink the content to `new_size`; growing is a no-op
    pub(crate) fn truncate(&self, store: &RwLock<BlockStore>, new_size: u64) -> FsResult<()> {
        let mut state = self.state.write();
        state.check_file()?;
        let old_size = state.chain.size();
        if state.chain.truncate(&mut store.write(), new_size)? {
            let now = current_time();
            state.mtime = now;
            state.ctime = now;
            log::debug!(
                "[CHAINFS] truncated '{}' from {} to {} bytes",
                self.name,
                old_size,
                new_size
            );
        }
        Ok(())
    }

    /// Free the content chain and the record block, retiring the node
    ///
    /// Returns the number of blocks given back to the store.
    pub(crate) fn release(&self, store: &RwLock<BlockStore>) -> FsResult<usize> {
        let mut state = self.state.write();
        let record = state.record.ok_or(FsError::NotFound)?;
        let mut store = store.write();
        if !store.is_allocated(record) {
            return Err(FsError::IoError);
        }
        let freed = state.chain.release(&mut store)?;
        store.free(record)?;
        state.record = None;
        state.nlink = 0;
        Ok(freed + 1)
    }

    /// Retire the node without touching the store, which is being wiped
    pub(crate) fn forget(&self) {
        let mut state = self.state.write();
        state.chain = ContentChain::new();
        state.record = None;
        state.nlink = 0;
    }
}

/// Current time in nanoseconds since the Unix epoch
#[cfg(feature = "std")]
pub(crate) fn current_time() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// No clock without `std`; timestamps read as 0
#[cfg(not(feature = "std"))]
pub(crate) fn current_time() -> u64 {
    0
}
