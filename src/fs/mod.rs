//! Filesystem Support
//!
//! `vfs` holds the boundary types; `chain` is the block-chain storage engine.

pub mod chain;
pub mod vfs;
