//! ChainFS Content Chains
//!
//! A node's bytes live in a chain of blocks reached from its head block by
//! following next-links. Byte `off` of the file sits in hop `off / cap` at
//! payload offset `off % cap`, where `cap` is the payload capacity. The chain
//! of a node of size `n` always holds exactly `ceil(n / cap)` blocks.

use alloc::vec;
use alloc::vec::Vec;

use crate::fs::chain::block::{BlockNo, BlockStore};
use crate::fs::vfs::superblock::{FsError, FsResult};

/// Number of blocks a chain of `size` bytes holds
pub fn blocks_for(size: u64, cap: usize) -> usize {
    size.div_ceil(cap as u64) as usize
}

/// Locate byte `offset` without extending the chain
///
/// Returns the block holding the byte and the offset inside its payload.
/// Running off the end of the chain is `InvalidOffset`.
pub fn seek(store: &BlockStore, head: Option<BlockNo>, offset: u64) -> FsResult<(BlockNo, usize)> {
    let cap = store.payload_capacity() as u64;
    let mut block = head.ok_or(FsError::InvalidOffset)?;
    for _ in 0..offset / cap {
        block = store.header(block)?.ok_or(FsError::InvalidOffset)?;
    }
    Ok((block, (offset % cap) as usize))
}

/// Locate byte `offset`, linking fresh blocks onto the tail as needed
fn seek_extend(store: &mut BlockStore, head: BlockNo, offset: u64) -> FsResult<(BlockNo, usize)> {
    let cap = store.payload_capacity() as u64;
    let mut block = head;
    for _ in 0..offset / cap {
        block = next_or_extend(store, block)?;
    }
    Ok((block, (offset % cap) as usize))
}

/// Successor of `block`, allocating and linking one if it is the tail
fn next_or_extend(store: &mut BlockStore, block: BlockNo) -> FsResult<BlockNo> {
    match store.header(block)? {
        Some(next) => Ok(next),
        None => {
            let next = store.allocate_next()?;
            store.set_header(block, Some(next))?;
            Ok(next)
        }
    }
}

/// Free `first` and every block after it; returns how many were freed
///
/// The whole chain is walked before anything is freed, so a broken or cyclic
/// chain fails with `IoError` and leaves the store untouched.
pub fn release_from(store: &mut BlockStore, first: Option<BlockNo>) -> FsResult<usize> {
    let mut blocks = Vec::new();
    let mut next = first;
    while let Some(no) = next {
        if blocks.len() == store.used_count() {
            log::warn!("[CHAINFS] chain from block {:?} loops", first);
            return Err(FsError::IoError);
        }
        next = store.header(no)?;
        blocks.push(no);
    }
    for &no in &blocks {
        store.free(no)?;
    }
    Ok(blocks.len())
}

/// Head block and logical length of one node's content
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ContentChain {
    head: Option<BlockNo>,
    size: u64,
}

impl ContentChain {
    pub const fn new() -> Self {
        Self { head: None, size: 0 }
    }

    pub fn head(&self) -> Option<BlockNo> {
        self.head
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn block_count(&self, store: &BlockStore) -> usize {
        blocks_for(self.size, store.payload_capacity())
    }

    /// Read up to `len` bytes starting at `offset`
    pub fn read(&self, store: &BlockStore, offset: u64, len: usize) -> FsResult<Vec<u8>> {
        self.check_readable(offset, len)?;
        let mut buf = vec![0u8; len.min((self.size - offset) as usize)];
        let read = self.read_into(store, offset, &mut buf)?;
        buf.truncate(read);
        Ok(buf)
    }

    /// Fill `buf` from `offset`, clamped to the end of the content
    pub fn read_into(&self, store: &BlockStore, offset: u64, buf: &mut [u8]) -> FsResult<usize> {
        self.check_readable(offset, buf.len())?;
        if buf.is_empty() {
            return Ok(0);
        }

        let cap = store.payload_capacity();
        let len = buf.len().min((self.size - offset) as usize);
        let (mut block, mut intra) = seek(store, self.head, offset)?;
        let mut done = 0;
        loop {
            let n = (len - done).min(cap - intra);
            buf[done..done + n].copy_from_slice(&store.payload(block)?[intra..intra + n]);
            done += n;
            if done == len {
                break;
            }
            block = store.header(block)?.ok_or(FsError::InvalidOffset)?;
            intra = 0;
        }
        Ok(len)
    }

    /// Write `bytes` at `offset`, growing the chain if the write ends past it
    ///
    /// Capacity for the whole write is checked before any block is touched,
    /// so `Exhausted` leaves the chain as it was.
    pub fn write(&mut self, store: &mut BlockStore, offset: u64, bytes: &[u8]) -> FsResult<usize> {
        if offset > self.size {
            return Err(FsError::InvalidOffset);
        }
        if bytes.is_empty() {
            return Ok(0);
        }

        let cap = store.payload_capacity();
        let end = offset
            .checked_add(bytes.len() as u64)
            .ok_or(FsError::InvalidOffset)?;
        let extra = blocks_for(end, cap).saturating_sub(blocks_for(self.size, cap));
        if extra > store.free_count() {
            log::warn!(
                "[CHAINFS] write of {} bytes at {} needs {} blocks, {} free",
                bytes.len(),
                offset,
                extra,
                store.free_count()
            );
            return Err(FsError::Exhausted);
        }

        let head = match self.head {
            Some(head) => head,
            None => {
                let head = store.allocate_next()?;
                self.head = Some(head);
                head
            }
        };

        let (mut block, mut intra) = seek_extend(store, head, offset)?;
        let mut done = 0;
        loop {
            let n = (bytes.len() - done).min(cap - intra);
            store.payload_mut(block)?[intra..intra + n].copy_from_slice(&bytes[done..done + n]);
            done += n;
            if done == bytes.len() {
                break;
            }
            block = next_or_extend(store, block)?;
            intra = 0;
        }

        self.size = self.size.max(end);
        Ok(done)
    }

    /// Shrink the content to `new_size` bytes, freeing blocks past the cut
    ///
    /// Growing is not supported; a `new_size` at or past the current size
    /// leaves the chain alone and returns `false`.
    pub fn truncate(&mut self, store: &mut BlockStore, new_size: u64) -> FsResult<bool> {
        if new_size >= self.size {
            return Ok(false);
        }

        if new_size == 0 {
            release_from(store, self.head)?;
            self.head = None;
        } else {
            // last kept block holds byte new_size - 1
            let (last, _) = seek(store, self.head, new_size - 1)?;
            let tail = store.header(last)?;
            release_from(store, tail)?;
            store.set_header(last, None)?;
        }

        self.size = new_size;
        Ok(true)
    }

    /// Free the whole chain, leaving an empty one; returns blocks freed
    pub fn release(&mut self, store: &mut BlockStore) -> FsResult<usize> {
        let freed = release_from(store, self.head)?;
        self.head = None;
        self.size = 0;
        Ok(freed)
    }

    fn check_readable(&self, offset: u64, len: usize) -> FsResult<()> {
        if offset > self.size || (len > 0 && offset == self.size) {
            return Err(FsError::InvalidOffset);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FsConfig;

    /// 16-byte blocks: 8 bytes of payload each
    fn small_store(count: usize) -> BlockStore {
        BlockStore::new(&FsConfig::new(16, count, 255)).unwrap()
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_blocks_for() {
        assert_eq!(blocks_for(0, 8), 0);
        assert_eq!(blocks_for(1, 8), 1);
        assert_eq!(blocks_for(8, 8), 1);
        assert_eq!(blocks_for(9, 8), 2);
    }

    #[test]
    fn test_write_read_across_blocks() {
        let mut store = small_store(16);
        let mut chain = ContentChain::new();
        let data = pattern(20);
        assert_eq!(chain.write(&mut store, 0, &data), Ok(20));
        assert_eq!(chain.size(), 20);
        assert_eq!(chain.block_count(&store), 3);
        assert_eq!(store.used_count(), 3);
        assert_eq!(chain.read(&store, 0, 20).unwrap(), data);
        assert_eq!(chain.read(&store, 5, 10).unwrap(), &data[5..15]);
    }

    #[test]
    fn test_read_clamps_to_size() {
        let mut store = small_store(4);
        let mut chain = ContentChain::new();
        chain.write(&mut store, 0, b"hello").unwrap();
        assert_eq!(chain.read(&store, 2, 100).unwrap(), b"llo");
        let mut buf = [0u8; 64];
        assert_eq!(chain.read_into(&store, 0, &mut buf), Ok(5));
        assert_eq!(&buf[..5], b"hello");
    }

    #[test]
    fn test_read_past_end_is_invalid() {
        let mut store = small_store(4);
        let mut chain = ContentChain::new();
        chain.write(&mut store, 0, b"abc").unwrap();
        assert_eq!(chain.read(&store, 4, 1), Err(FsError::InvalidOffset));
        assert_eq!(chain.read(&store, 3, 1), Err(FsError::InvalidOffset));
        assert_eq!(chain.read(&store, 3, 0), Ok(Vec::new()));
        assert_eq!(chain.read(&store, 4, 0), Err(FsError::InvalidOffset));
    }

    #[test]
    fn test_append_at_block_boundary() {
        let mut store = small_store(8);
        let mut chain = ContentChain::new();
        chain.write(&mut store, 0, &pattern(8)).unwrap();
        assert_eq!(store.used_count(), 1);
        chain.write(&mut store, 8, b"xy").unwrap();
        assert_eq!(store.used_count(), 2);
        assert_eq!(chain.read(&store, 6, 4).unwrap(), &[6, 7, b'x', b'y']);
    }

    #[test]
    fn test_overwrite_in_place_allocates_nothing() {
        let mut store = small_store(8);
        let mut chain = ContentChain::new();
        chain.write(&mut store, 0, &pattern(24)).unwrap();
        let used = store.used_count();
        chain.write(&mut store, 7, b"ZZ").unwrap();
        assert_eq!(store.used_count(), used);
        assert_eq!(chain.size(), 24);
        assert_eq!(chain.read(&store, 6, 4).unwrap(), &[6, b'Z', b'Z', 9]);
    }

    #[test]
    fn test_sparse_write_rejected() {
        let mut store = small_store(4);
        let mut chain = ContentChain::new();
        chain.write(&mut store, 0, b"ab").unwrap();
        assert_eq!(chain.write(&mut store, 3, b"c"), Err(FsError::InvalidOffset));
        assert_eq!(chain.size(), 2);
    }

    #[test]
    fn test_empty_write_allocates_nothing() {
        let mut store = small_store(4);
        let mut chain = ContentChain::new();
        assert_eq!(chain.write(&mut store, 0, &[]), Ok(0));
        assert_eq!(chain.head(), None);
        assert_eq!(store.used_count(), 0);
    }

    #[test]
    fn test_exhausted_write_leaves_chain_untouched() {
        let mut store = small_store(4);
        let mut chain = ContentChain::new();
        chain.write(&mut store, 0, &pattern(10)).unwrap();
        let before = chain;
        let free = store.free_count();
        // 10 + 30 bytes needs 5 blocks, only 4 exist
        assert_eq!(chain.write(&mut store, 10, &pattern(30)), Err(FsError::Exhausted));
        assert_eq!(chain, before);
        assert_eq!(store.free_count(), free);
        assert_eq!(chain.read(&store, 0, 10).unwrap(), pattern(10));
    }

    #[test]
    fn test_truncate_frees_tail() {
        let mut store = small_store(8);
        let mut chain = ContentChain::new();
        chain.write(&mut store, 0, &pattern(30)).unwrap();
        assert_eq!(store.used_count(), 4);

        assert_eq!(chain.truncate(&mut store, 16), Ok(true));
        assert_eq!(chain.block_count(&store), 2);
        assert_eq!(store.used_count(), 2);
        assert_eq!(chain.read(&store, 16, 1), Err(FsError::InvalidOffset));
        assert_eq!(chain.read(&store, 0, 16).unwrap(), pattern(16));

        assert_eq!(chain.truncate(&mut store, 3), Ok(true));
        assert_eq!(store.used_count(), 1);
        assert_eq!(chain.truncate(&mut store, 0), Ok(true));
        assert_eq!(chain.head(), None);
        assert_eq!(store.used_count(), 0);
    }

    #[test]
    fn test_truncate_never_grows() {
        let mut store = small_store(4);
        let mut chain = ContentChain::new();
        chain.write(&mut store, 0, b"abc").unwrap();
        assert_eq!(chain.truncate(&mut store, 100), Ok(false));
        assert_eq!(chain.size(), 3);
        assert_eq!(store.used_count(), 1);
    }

    #[test]
    fn test_write_after_truncate_reuses_chain() {
        let mut store = small_store(8);
        let mut chain = ContentChain::new();
        chain.write(&mut store, 0, &pattern(20)).unwrap();
        chain.truncate(&mut store, 4).unwrap();
        chain.write(&mut store, 4, b"abcdefgh").unwrap();
        assert_eq!(chain.size(), 12);
        assert_eq!(store.used_count(), 2);
        assert_eq!(chain.read(&store, 0, 12).unwrap(), b"\x00\x01\x02\x03abcdefgh");
    }

    #[test]
    fn test_release() {
        let mut store = small_store(8);
        let mut chain = ContentChain::new();
        chain.write(&mut store, 0, &pattern(40)).unwrap();
        assert_eq!(chain.release(&mut store), Ok(5));
        assert_eq!(chain, ContentChain::new());
        assert_eq!(store.free_count(), 8);
    }

    #[test]
    fn test_release_of_broken_chain_frees_nothing() {
        let mut store = small_store(8);
        let mut chain = ContentChain::new();
        chain.write(&mut store, 0, &pattern(24)).unwrap();
        let head = chain.head().unwrap();
        let second = store.header(head).unwrap().unwrap();
        let third = store.header(second).unwrap().unwrap();

        // loop the last block back to the head
        store.set_header(third, Some(head)).unwrap();
        assert_eq!(chain.release(&mut store), Err(FsError::IoError));
        assert_eq!(store.used_count(), 3);
        assert_eq!(chain.head(), Some(head));

        // a dangling link
        store.set_header(third, None).unwrap();
        store.free(third).unwrap();
        assert_eq!(chain.truncate(&mut store, 0), Err(FsError::IoError));
        assert_eq!(store.used_count(), 2);
        assert_eq!(chain.size(), 24);
    }
}
