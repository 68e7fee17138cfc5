//! ChainFS Storage Engine
//!
//! In-memory filesystem backed by a fixed arena of blocks.
//! Features:
//! - Block store with wrap-around free-slot search
//! - File content as linked block chains, grown and shrunk in place
//! - Flat name table with O(log N) lookups using BTreeMap
//! - SMP-safe: table, per-node and store locks

pub mod block;
pub mod content;
pub mod node;
pub mod super_impl;
pub mod table;

pub use node::{FileNode, NodeHandle};
pub use super_impl::{ChainFs, ChainFsType};
