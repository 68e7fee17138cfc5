//! ChainFS Block Store
//!
//! Fixed-capacity arena of fixed-size blocks. A slot is either free or holds
//! one block; the first `HEADER_SIZE` bytes of a block carry the index of the
//! next block in its chain (little-endian, `u64::MAX` for none) and the rest
//! is payload. The store knows nothing about files.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;

use crate::config::{FsConfig, HEADER_SIZE};
use crate::fs::vfs::superblock::{FsError, FsResult};

/// Index of a block slot in the store
pub type BlockNo = usize;

/// On-block encoding of "no next block"
const NO_BLOCK: u64 = u64::MAX;

/// Block arena
pub struct BlockStore {
    /// Block slots; `None` means free
    slots: Vec<Option<Box<[u8]>>>,
    /// Bytes per block, header included
    block_size: usize,
    /// Number of allocated slots
    used: usize,
    /// Most recently allocated slot, where the next free-slot search starts
    last: BlockNo,
}

impl BlockStore {
    /// Create an empty store sized by `config`
    ///
    /// Fails with `InvalidArgument` for a config that leaves no payload.
    pub fn new(config: &FsConfig) -> FsResult<Self> {
        config.validate()?;
        let mut slots = Vec::new();
        slots.resize_with(config.block_count, || None);
        Ok(Self {
            slots,
            block_size: config.block_size,
            used: 0,
            last: 0,
        })
    }

    /// Bytes per block, header included
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Usable content bytes per block
    pub fn payload_capacity(&self) -> usize {
        self.block_size - HEADER_SIZE
    }

    /// Total number of slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn used_count(&self) -> usize {
        self.used
    }

    pub fn free_count(&self) -> usize {
        self.slots.len() - self.used
    }

    pub fn is_allocated(&self, no: BlockNo) -> bool {
        matches!(self.slots.get(no), Some(Some(_)))
    }

    /// Allocate the first free slot at or after `hint`, wrapping once
    ///
    /// The new block's header is reset to "none".
    pub fn allocate(&mut self, hint: BlockNo) -> FsResult<BlockNo> {
        let count = self.slots.len();
        if self.used == count {
            log::warn!("[CHAINFS] block store exhausted ({} blocks)", count);
            return Err(FsError::Exhausted);
        }

        let start = hint % count;
        let no = (start..count)
            .chain(0..start)
            .find(|&i| self.slots[i].is_none())
            .ok_or(FsError::Exhausted)?;

        let mut block = vec![0u8; self.block_size].into_boxed_slice();
        block[..HEADER_SIZE].copy_from_slice(&NO_BLOCK.to_le_bytes());
        self.slots[no] = Some(block);
        self.used += 1;
        self.last = no;

        log::trace!("[CHAINFS] allocated block {} ({} in use)", no, self.used);
        Ok(no)
    }

    /// Allocate starting from the most recently allocated slot
    pub fn allocate_next(&mut self) -> FsResult<BlockNo> {
        self.allocate(self.last)
    }

    /// Return a block to the free pool
    pub fn free(&mut self, no: BlockNo) -> FsResult<()> {
        match self.slots.get_mut(no) {
            Some(slot @ Some(_)) => {
                *slot = None;
                self.used -= 1;
                log::trace!("[CHAINFS] freed block {} ({} in use)", no, self.used);
                Ok(())
            }
            _ => {
                log::warn!("[CHAINFS] free of unallocated block {}", no);
                Err(FsError::IoError)
            }
        }
    }

    /// Next block in the chain, if any
    pub fn header(&self, no: BlockNo) -> FsResult<Option<BlockNo>> {
        let block = self.block(no)?;
        let mut raw = [0u8; HEADER_SIZE];
        raw.copy_from_slice(&block[..HEADER_SIZE]);
        match u64::from_le_bytes(raw) {
            NO_BLOCK => Ok(None),
            next => Ok(Some(next as BlockNo)),
        }
    }

    /// Point a block at its successor
    pub fn set_header(&mut self, no: BlockNo, next: Option<BlockNo>) -> FsResult<()> {
        let raw = next.map_or(NO_BLOCK, |n| n as u64).to_le_bytes();
        self.block_mut(no)?[..HEADER_SIZE].copy_from_slice(&raw);
        Ok(())
    }

    /// Content window of a block
    pub fn payload(&self, no: BlockNo) -> FsResult<&[u8]> {
        Ok(&self.block(no)?[HEADER_SIZE..])
    }

    /// Writable content window of a block
    pub fn payload_mut(&mut self, no: BlockNo) -> FsResult<&mut [u8]> {
        Ok(&mut self.block_mut(no)?[HEADER_SIZE..])
    }

    /// Free every slot; returns how many were in use
    pub fn release_all(&mut self) -> usize {
        let released = self.used;
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.used = 0;
        self.last = 0;
        released
    }

    fn block(&self, no: BlockNo) -> FsResult<&[u8]> {
        match self.slots.get(no) {
            Some(Some(block)) => Ok(block),
            _ => Err(FsError::IoError),
        }
    }

    fn block_mut(&mut self, no: BlockNo) -> FsResult<&mut [u8]> {
        match self.slots.get_mut(no) {
            Some(Some(block)) => Ok(block),
            _ => Err(FsError::IoError),
        }
    }
}
