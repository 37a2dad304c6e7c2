//! Disk manager contract consumed by the buffer pool.

use oryn_common::page::{PageId, PAGE_SIZE};
use oryn_common::Result;

/// Interface to the page-level disk storage backing the buffer pool.
///
/// The buffer pool is the only component that performs page I/O, and it
/// does so exclusively through this trait. Implementations must be safe to
/// call from multiple threads; the pool never holds its own latch across
/// `read_page`/`write_page`.
pub trait DiskManager: Send + Sync {
    /// Reads a page from disk into the buffer.
    fn read_page(&self, page_id: PageId, buf: &mut [u8; PAGE_SIZE]) -> Result<()>;

    /// Persists a page buffer to disk.
    fn write_page(&self, page_id: PageId, buf: &[u8; PAGE_SIZE]) -> Result<()>;

    /// Allocates a fresh page id.
    fn allocate_page(&self) -> Result<PageId>;

    /// Marks a page id as free on disk.
    fn deallocate_page(&self, page_id: PageId) -> Result<()>;
}
