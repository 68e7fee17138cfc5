//! Boundary Types
//!
//! Types the filesystem bridge exchanges with the engine: node metadata,
//! mount options, statistics and errors.

pub mod inode;
pub mod superblock;
