//! Storage engine for OrynDB.
//!
//! This crate provides:
//! - File-backed disk manager for page-level I/O
//! - Generic fixed-width index keys with lexicographic ordering
//! - B+ tree internal page layout and rebalancing primitives

mod disk;
mod index;

pub use disk::{DiskManagerConfig, FileDiskManager};
pub use index::{
    GenericKey, IndexPageHeader, InternalNode, Key16, Key32, Key4, Key64, Key8,
};
