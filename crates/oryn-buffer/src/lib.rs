//! Buffer pool management for OrynDB.
//!
//! This crate provides in-memory page caching with:
//! - Fixed-size buffer pool with configurable page count
//! - LRU eviction policy for cache management
//! - Extendible hash page table for resident-page lookup
//! - Pin counting for concurrent access
//! - Dirty page tracking for write-back

mod disk;
mod frame;
mod hash_table;
mod pool;
mod replacer;

pub use disk::DiskManager;
pub use frame::{BufferFrame, FrameId};
pub use hash_table::{ExtendibleHashTable, HashKey};
pub use pool::{BufferPoolConfig, BufferPoolManager, BufferPoolStats};
pub use replacer::{LruReplacer, Replacer};
