//! Page constants and identifiers for OrynDB storage.

use serde::{Deserialize, Serialize};

/// Page size in bytes (4 KB).
pub const PAGE_SIZE: usize = 4096;

/// Unique identifier for a page within the data file.
///
/// Page ids are allocated by the disk manager and index directly into the
/// data file. `PageId::INVALID` is the reserved sentinel for "no page".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageId(pub u32);

impl PageId {
    /// Sentinel value meaning "no page".
    pub const INVALID: PageId = PageId(u32::MAX);

    /// Creates a new PageId.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns true if this is not the invalid sentinel.
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// Returns the PageId widened to u64 for packed storage.
    pub fn as_u64(&self) -> u64 {
        self.0 as u64
    }

    /// Creates a PageId from the lower 32 bits of a u64 representation.
    pub fn from_u64(value: u64) -> Self {
        Self(value as u32)
    }
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_valid() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "invalid")
        }
    }
}

/// Page types in OrynDB storage.
///
/// Stored in the first byte of every index page header so that a raw page
/// buffer can be interpreted as the right node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum PageType {
    /// Unallocated or discarded page.
    Invalid = 0,
    /// B+ tree leaf page.
    BTreeLeaf = 1,
    /// B+ tree internal page.
    BTreeInternal = 2,
}

impl PageType {
    /// Decodes a page type from its on-disk byte, treating unknown values
    /// as `Invalid`.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => PageType::BTreeLeaf,
            2 => PageType::BTreeInternal,
            _ => PageType::Invalid,
        }
    }
}
