//! ChainFS File Table
//!
//! The flat namespace: every node of the filesystem, keyed by its full name.
//! Names that look like paths are ordinary names here.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::cmp::Reverse;

use crate::fs::chain::block::BlockNo;
use crate::fs::chain::node::{FileNode, NodeHandle};
use crate::fs::vfs::inode::CreateAttr;
use crate::fs::vfs::superblock::{FsError, FsResult};

/// Sequence number reserved for the root directory
pub const ROOT_INO: u64 = 1;

/// Name -> node map
pub struct FileTable {
    nodes: BTreeMap<String, NodeHandle>,
    name_max: usize,
    /// Sequence number of the next node; also gives enumeration order
    next_ino: u64,
}

impl FileTable {
    pub fn new(name_max: usize) -> Self {
        Self {
            nodes: BTreeMap::new(),
            name_max,
            next_ino: ROOT_INO + 1,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Validate a name for a new entry
    pub fn validate_name(&self, name: &str) -> FsResult<()> {
        if name.is_empty() || name == "." || name == ".." || name.contains('\0') {
            return Err(FsError::InvalidArgument);
        }
        if name.len() > self.name_max {
            return Err(FsError::NameTooLong);
        }
        Ok(())
    }

    /// Check that `name` could be inserted right now
    pub fn check_new(&self, name: &str) -> FsResult<()> {
        self.validate_name(name)?;
        if self.nodes.contains_key(name) {
            return Err(FsError::AlreadyExists);
        }
        Ok(())
    }

    /// Look up a name in the table
    pub fn lookup(&self, name: &str) -> FsResult<&NodeHandle> {
        self.nodes.get(name).ok_or(FsError::NotFound)
    }

    /// Insert a new node charged to block `record`
    pub fn insert(
        &mut self,
        name: &str,
        attr: &CreateAttr,
        record: BlockNo,
    ) -> FsResult<NodeHandle> {
        self.check_new(name)?;
        let ino = self.next_ino;
        self.next_ino += 1;

        let node = Arc::new(FileNode::new(ino, String::from(name), attr, record));
        self.nodes.insert(String::from(name), node.clone());
        Ok(node)
    }

    /// Remove a node, handing it back so its blocks can be reclaimed
    pub fn remove(&mut self, name: &str) -> FsResult<NodeHandle> {
        self.nodes.remove(name).ok_or(FsError::NotFound)
    }

    /// All nodes, newest first
    pub fn list(&self) -> Vec<NodeHandle> {
        let mut nodes: Vec<NodeHandle> = self.nodes.values().cloned().collect();
        nodes.sort_unstable_by_key(|node| Reverse(node.ino()));
        nodes
    }

    /// Empty the table, returning every node it held
    pub fn drain(&mut self) -> Vec<NodeHandle> {
        core::mem::take(&mut self.nodes).into_values().collect()
    }
}
