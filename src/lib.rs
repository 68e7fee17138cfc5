//! ChainFS
//!
//! Ephemeral in-memory file storage engine meant to sit behind a userspace
//! filesystem bridge. File content lives in fixed-size blocks linked into
//! chains; names live in one flat table.
//!
//! The engine itself is `no_std` + `alloc`. The `std` feature only adds a
//! wall clock for node timestamps.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod config;
pub mod fs;

pub use config::FsConfig;
pub use fs::chain::{ChainFs, ChainFsType, NodeHandle};
pub use fs::vfs::inode::{CreateAttr, DirEnt, FileMode, Stat};
pub use fs::vfs::superblock::{FsError, FsResult, FsType, MountFlags, MountOpts, StatFs, SuperBlock};
