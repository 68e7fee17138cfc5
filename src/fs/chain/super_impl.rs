//! ChainFS Superblock Implementation
//!
//! The mounted instance: composes table lookups with chain operations to
//! serve the boundary operations of the filesystem bridge.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::RwLock;

use crate::config::FsConfig;
use crate::fs::chain::block::BlockStore;
use crate::fs::chain::node::{current_time, NodeHandle};
use crate::fs::chain::table::{FileTable, ROOT_INO};
use crate::fs::vfs::inode::{CreateAttr, DirEnt, FileMode, Stat};
use crate::fs::vfs::superblock::{
    FsError, FsResult, FsType, MountFlags, MountOpts, StatFs, SuperBlock,
};

/// ChainFS filesystem type
pub struct ChainFsType;

impl FsType for ChainFsType {
    type Super = ChainFs;

    fn name(&self) -> &'static str {
        "chainfs"
    }

    fn mount(&self, opts: MountOpts) -> FsResult<Arc<ChainFs>> {
        let config = opts.config()?;
        Ok(Arc::new(ChainFs::new(config, opts.flags)?))
    }
}

/// Mounted ChainFS instance
///
/// Lock order is table, then node, then store.
pub struct ChainFs {
    config: FsConfig,
    flags: MountFlags,
    /// Attributes reported for the root directory, which is not a table entry
    root: Stat,
    table: RwLock<FileTable>,
    store: RwLock<BlockStore>,
}

impl ChainFs {
    /// Magic number for chainfs
    const MAGIC: u64 = 0x4348_4149_4E46_5300; // "CHAINFS\0"

    /// Create a new, empty instance
    pub fn new(config: FsConfig, flags: MountFlags) -> FsResult<Self> {
        config.validate()?;

        let (sec, nsec) = Stat::split_time(current_time());
        let root = Stat {
            st_ino: ROOT_INO,
            st_mode: FileMode::directory(0).0,
            st_nlink: 2,
            st_blksize: config.block_size as u32,
            st_atime_sec: sec,
            st_atime_nsec: nsec,
            st_mtime_sec: sec,
            st_mtime_nsec: nsec,
            st_ctime_sec: sec,
            st_ctime_nsec: nsec,
            ..Stat::default()
        };

        log::info!(
            "[CHAINFS] mounted: {} blocks of {} bytes, names up to {} bytes{}",
            config.block_count,
            config.block_size,
            config.name_max,
            if flags.contains(MountFlags::RDONLY) { ", read-only" } else { "" }
        );

        Ok(Self {
            config,
            flags,
            root,
            table: RwLock::new(FileTable::new(config.name_max)),
            store: RwLock::new(BlockStore::new(&config)?),
        })
    }

    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    pub fn free_blocks(&self) -> usize {
        self.store.read().free_count()
    }

    pub fn used_blocks(&self) -> usize {
        self.store.read().used_count()
    }

    /// Number of blocks in a node's content chain
    pub fn chain_blocks(&self, handle: &NodeHandle) -> usize {
        let state = handle.state.read();
        state.chain.block_count(&self.store.read())
    }

    fn check_writable(&self) -> FsResult<()> {
        if self.flags.contains(MountFlags::RDONLY) {
            return Err(FsError::ReadOnlyFilesystem);
        }
        Ok(())
    }

    /// Create a node named `name` with the attributes in `attr`
    pub fn create_node(&self, name: &str, attr: CreateAttr) -> FsResult<NodeHandle> {
        self.check_writable()?;

        let mut table = self.table.write();
        table.check_new(name)?;

        let record = self
            .store
            .write()
            .allocate_next()
            .inspect_err(|_| log::warn!("[CHAINFS] no block left for node '{}'", name))?;
        let node = match table.insert(name, &attr, record) {
            Ok(node) => node,
            Err(e) => {
                self.store.write().free(record)?;
                return Err(e);
            }
        };

        log::debug!("[CHAINFS] created '{}' (ino {}, mode {:o})", name, node.ino(), attr.mode.0);
        Ok(node)
    }

    /// Create a regular file
    pub fn mknod(&self, name: &str, mode: u32, uid: u32, gid: u32) -> FsResult<NodeHandle> {
        self.create_node(name, CreateAttr::new(FileMode::regular(mode), uid, gid))
    }

    /// Create a directory entry (the namespace stays flat)
    pub fn mkdir(&self, name: &str, mode: u32, uid: u32, gid: u32) -> FsResult<NodeHandle> {
        self.create_node(name, CreateAttr::new(FileMode::directory(mode), uid, gid))
    }

    /// Handle for an existing node
    pub fn open(&self, name: &str) -> FsResult<NodeHandle> {
        self.table.read().lookup(name).cloned()
    }

    /// Attributes of `name`; the empty name is the root directory
    pub fn stat(&self, name: &str) -> FsResult<Stat> {
        if name.is_empty() {
            return Ok(self.root);
        }
        let table = self.table.read();
        Ok(table.lookup(name)?.stat(self.config.block_size))
    }

    /// Directory enumeration: `.` and `..`, then every node newest first
    pub fn list(&self) -> Vec<DirEnt> {
        let table = self.table.read();
        let nodes = table.list();
        let mut entries = Vec::with_capacity(nodes.len() + 2);
        entries.push(DirEnt::new(String::from("."), None));
        entries.push(DirEnt::new(String::from(".."), None));
        entries.extend(nodes.iter().map(|node| {
            DirEnt::new(String::from(node.name()), Some(node.stat(self.config.block_size)))
        }));
        entries
    }

    /// Read up to `len` bytes at `offset`
    pub fn read(&self, handle: &NodeHandle, offset: u64, len: usize) -> FsResult<Vec<u8>> {
        handle.read_at(&self.store, offset, len)
    }

    /// Fill `buf` from `offset`, returning the number of bytes read
    pub fn read_into(&self, handle: &NodeHandle, offset: u64, buf: &mut [u8]) -> FsResult<usize> {
        handle.read_into(&self.store, offset, buf)
    }

    /// Write `data` at `offset`; the offset may not lie past the end of file
    pub fn write(&self, handle: &NodeHandle, offset: u64, data: &[u8]) -> FsResult<usize> {
        self.check_writable()?;
        handle.write_at(&self.store, offset, data)
    }

    /// Shrink a node to `new_size`; growing is a no-op
    pub fn resize(&self, handle: &NodeHandle, new_size: u64) -> FsResult<()> {
        self.check_writable()?;
        handle.truncate(&self.store, new_size)
    }

    /// Remove `name` and reclaim every block it held
    pub fn delete(&self, name: &str) -> FsResult<()> {
        self.check_writable()?;

        let mut table = self.table.write();
        let node = table.lookup(name)?.clone();
        let freed = node.release(&self.store)?;
        table.remove(name)?;

        log::debug!("[CHAINFS] deleted '{}' ({} blocks freed)", name, freed);
        Ok(())
    }

    /// Drop every node and release the whole store
    ///
    /// Outstanding handles see `NotFound` afterwards. Returns the number of
    /// blocks released.
    pub fn unmount(&self) -> usize {
        let mut table = self.table.write();
        let nodes = table.drain();
        nodes.iter().for_each(|node| node.forget());
        let released = self.store.write().release_all();

        log::info!("[CHAINFS] unmounted: {} nodes, {} blocks released", nodes.len(), released);
        released
    }
}

impl SuperBlock for ChainFs {
    fn statfs(&self) -> StatFs {
        let files = self.table.read().len() as u64;
        let store = self.store.read();
        let free = store.free_count() as u64;

        StatFs {
            f_type: Self::MAGIC,
            f_bsize: store.block_size() as u64,
            f_blocks: store.capacity() as u64,
            f_bfree: free,
            f_bavail: free,
            f_files: files,
            f_ffree: free,
            f_namelen: self.config.name_max as u64,
        }
    }

    fn sync(&self) -> FsResult<()> {
        // Nothing to flush, everything lives in memory
        Ok(())
    }
}
