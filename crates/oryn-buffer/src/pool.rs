//! Buffer pool manager.

use crate::disk::DiskManager;
use crate::frame::{BufferFrame, FrameId};
use crate::hash_table::ExtendibleHashTable;
use crate::replacer::{LruReplacer, Replacer};
use oryn_common::page::{PageId, PAGE_SIZE};
use oryn_common::{OrynError, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use sysinfo::System;

/// Bucket capacity for the page table's extendible hash directory.
const BUCKET_SIZE: usize = 64;

/// Configuration for the buffer pool.
#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    /// Number of frames in the pool.
    pub pool_size: usize,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self { pool_size: 1024 }
    }
}

/// Buffer pool manager.
///
/// Owns a fixed set of page frames and mediates all page I/O between the
/// disk manager and the rest of the engine:
/// - Page id to frame mapping through an extendible hash page table
/// - Free frame list for pages that have never been loaded
/// - LRU replacement for eviction
/// - Pin counting and dirty tracking per frame
///
/// A frame is always in exactly one of three states: on the free list, in
/// the page table with pin > 0, or in the page table with pin 0 and
/// registered in the replacer.
pub struct BufferPoolManager {
    /// Configuration.
    config: BufferPoolConfig,
    /// Array of buffer frames, created once and reused across page ids.
    frames: Vec<BufferFrame>,
    /// Page id to frame id mapping for resident pages.
    page_table: ExtendibleHashTable<PageId, FrameId>,
    /// Page replacement policy.
    replacer: LruReplacer,
    /// Pool latch. The free list lives inside it; the page table and
    /// replacer carry their own locks but every compound state transition
    /// (pin 0<->1, residency changes) happens while this latch is held.
    latch: Mutex<VecDeque<FrameId>>,
    /// Backing page storage.
    disk: Arc<dyn DiskManager>,
}

impl BufferPoolManager {
    /// Creates a new buffer pool with all frames on the free list.
    pub fn new(config: BufferPoolConfig, disk: Arc<dyn DiskManager>) -> Self {
        let pool_size = config.pool_size;

        let frames: Vec<_> = (0..pool_size)
            .map(|i| BufferFrame::new(FrameId(i as u32)))
            .collect();
        let free_list: VecDeque<_> = (0..pool_size).map(|i| FrameId(i as u32)).collect();

        Self {
            config,
            frames,
            page_table: ExtendibleHashTable::new(BUCKET_SIZE),
            replacer: LruReplacer::new(),
            latch: Mutex::new(free_list),
            disk,
        }
    }

    /// Creates a buffer pool sized to 25% of available system RAM.
    ///
    /// Minimum 1,000 frames to ensure useful caching even on low-memory
    /// systems.
    pub fn auto_sized(disk: Arc<dyn DiskManager>) -> Self {
        let mut sys = System::new_all();
        sys.refresh_memory();

        let available_bytes = sys.available_memory() as usize;
        let target_bytes = available_bytes / 4;
        let pool_size = (target_bytes / PAGE_SIZE).max(1_000);

        Self::new(BufferPoolConfig { pool_size }, disk)
    }

    /// Returns the number of frames in the pool.
    pub fn pool_size(&self) -> usize {
        self.config.pool_size
    }

    /// Returns the number of free frames.
    pub fn free_count(&self) -> usize {
        self.latch.lock().len()
    }

    /// Returns the number of pages currently resident in the pool.
    pub fn page_count(&self) -> usize {
        self.page_table.len()
    }

    /// Checks if a page is resident in the buffer pool.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.page_table.contains(&page_id)
    }

    /// Picks a replacement frame: free list front first, then the replacer.
    fn take_victim(&self, free_list: &mut VecDeque<FrameId>) -> Result<FrameId> {
        if let Some(frame_id) = free_list.pop_front() {
            return Ok(frame_id);
        }
        self.replacer.victim().ok_or(OrynError::BufferPoolFull)
    }

    /// Fetches a page, reading it from disk if it is not resident.
    ///
    /// The returned frame is pinned; every successful fetch must be matched
    /// by exactly one `unpin_page`. Fails with `BufferPoolFull` when every
    /// frame is pinned.
    pub fn fetch_page(&self, page_id: PageId) -> Result<&BufferFrame> {
        if !page_id.is_valid() {
            return Err(OrynError::InvalidPageId);
        }

        let mut free_list = self.latch.lock();

        if let Some(frame_id) = self.page_table.find(&page_id) {
            let frame = &self.frames[frame_id.0 as usize];
            if frame.pin() == 0 {
                // Pin transition 0 -> 1: the frame is no longer a candidate.
                self.replacer.erase(frame_id);
            }
            return Ok(frame);
        }

        let frame_id = self.take_victim(&mut free_list)?;
        let frame = &self.frames[frame_id.0 as usize];
        if frame.is_pinned() {
            // Invariants keep pinned frames out of the replacer; bail
            // rather than clobber a page somebody is using.
            self.replacer.insert(frame_id);
            return Err(OrynError::BufferPoolFull);
        }

        let old_page_id = frame.page_id();
        let old_dirty = frame.is_dirty();
        if let Some(old) = old_page_id {
            self.page_table.remove(&old);
        }
        self.page_table.insert(page_id, frame_id);
        frame.set_page_id(Some(page_id));
        frame.pin();
        frame.set_dirty(false);

        // Hold the frame latch across the fill so concurrent fetchers of
        // this page block on the data instead of reading a partial frame,
        // then release the pool latch before touching the disk.
        let mut data = frame.write_data();
        drop(free_list);

        if old_dirty {
            if let Some(old) = old_page_id {
                tracing::debug!(page_id = %old, "writing back dirty page on eviction");
                self.disk.write_page(old, &data)?;
            }
        }
        self.disk.read_page(page_id, &mut data)?;
        drop(data);

        Ok(frame)
    }

    /// Allocates a new page on disk and pins a zeroed frame for it.
    ///
    /// Returns the new page id together with the frame. Fails with
    /// `BufferPoolFull` when every frame is pinned.
    pub fn new_page(&self) -> Result<(PageId, &BufferFrame)> {
        let mut free_list = self.latch.lock();

        let frame_id = self.take_victim(&mut free_list)?;
        let frame = &self.frames[frame_id.0 as usize];
        if frame.is_pinned() {
            self.replacer.insert(frame_id);
            return Err(OrynError::BufferPoolFull);
        }

        let page_id = match self.disk.allocate_page() {
            Ok(page_id) => page_id,
            Err(e) => {
                // Put the victim back where it came from.
                if frame.page_id().is_some() {
                    self.replacer.insert(frame_id);
                } else {
                    free_list.push_front(frame_id);
                }
                return Err(e);
            }
        };

        let old_page_id = frame.page_id();
        let old_dirty = frame.is_dirty();
        if let Some(old) = old_page_id {
            self.page_table.remove(&old);
        }
        self.page_table.insert(page_id, frame_id);
        frame.set_page_id(Some(page_id));
        frame.pin();
        frame.set_dirty(false);

        let mut data = frame.write_data();
        drop(free_list);

        if old_dirty {
            if let Some(old) = old_page_id {
                tracing::debug!(page_id = %old, "writing back dirty page on eviction");
                self.disk.write_page(old, &data)?;
            }
        }
        data.fill(0);
        drop(data);

        Ok((page_id, frame))
    }

    /// Unpins a page, optionally marking it dirty.
    ///
    /// The dirty flag is ORed in, never cleared. When the pin count drops
    /// to zero the frame becomes an eviction candidate. Returns false if
    /// the page is not resident or was not pinned.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        if !page_id.is_valid() {
            return false;
        }

        let _free_list = self.latch.lock();

        let Some(frame_id) = self.page_table.find(&page_id) else {
            return false;
        };
        let frame = &self.frames[frame_id.0 as usize];
        if frame.pin_count() == 0 {
            return false;
        }

        if is_dirty {
            frame.set_dirty(true);
        }
        if frame.unpin() == 0 {
            self.replacer.insert(frame_id);
        }
        true
    }

    /// Writes a resident page's bytes to disk and clears its dirty flag.
    ///
    /// Returns Ok(false) if the page is not resident.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        if !page_id.is_valid() {
            return Ok(false);
        }

        let free_list = self.latch.lock();
        let Some(frame_id) = self.page_table.find(&page_id) else {
            return Ok(false);
        };
        let frame = &self.frames[frame_id.0 as usize];

        let data = frame.write_data();
        drop(free_list);

        self.disk.write_page(page_id, &data)?;
        frame.set_dirty(false);
        Ok(true)
    }

    /// Flushes every dirty resident page.
    ///
    /// Returns the number of pages written.
    pub fn flush_all_pages(&self) -> Result<usize> {
        // Snapshot the dirty residents under the latch, flush without it.
        let dirty: Vec<(FrameId, PageId)> = {
            let _free_list = self.latch.lock();
            self.frames
                .iter()
                .filter(|f| f.is_dirty())
                .filter_map(|f| f.page_id().map(|pid| (f.frame_id(), pid)))
                .collect()
        };

        let mut flushed = 0;
        for (frame_id, page_id) in dirty {
            let frame = &self.frames[frame_id.0 as usize];
            let data = frame.write_data();
            // Skip frames that were recycled for another page meanwhile.
            if frame.page_id() != Some(page_id) || !frame.is_dirty() {
                continue;
            }
            self.disk.write_page(page_id, &data)?;
            frame.set_dirty(false);
            flushed += 1;
        }
        tracing::debug!(flushed, "flushed dirty pages");
        Ok(flushed)
    }

    /// Deletes a page from the pool and deallocates it on disk.
    ///
    /// A page that is not resident counts as already deleted. Returns
    /// Ok(false) if the page is resident and pinned.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool> {
        if !page_id.is_valid() {
            return Ok(false);
        }

        let mut free_list = self.latch.lock();

        let Some(frame_id) = self.page_table.find(&page_id) else {
            return Ok(true);
        };
        let frame = &self.frames[frame_id.0 as usize];
        if frame.pin_count() != 0 {
            return Ok(false);
        }

        self.page_table.remove(&page_id);
        self.replacer.erase(frame_id);
        frame.reset();
        free_list.push_back(frame_id);
        drop(free_list);

        self.disk.deallocate_page(page_id)?;
        Ok(true)
    }

    /// Returns statistics about the buffer pool.
    pub fn stats(&self) -> BufferPoolStats {
        let mut used_frames = 0;
        let mut pinned_frames = 0;
        let mut dirty_frames = 0;

        for frame in &self.frames {
            if frame.page_id().is_some() {
                used_frames += 1;
                if frame.is_pinned() {
                    pinned_frames += 1;
                }
                if frame.is_dirty() {
                    dirty_frames += 1;
                }
            }
        }

        BufferPoolStats {
            total_frames: self.config.pool_size,
            free_frames: self.free_count(),
            used_frames,
            pinned_frames,
            dirty_frames,
        }
    }
}

/// Statistics about the buffer pool.
#[derive(Debug, Clone)]
pub struct BufferPoolStats {
    /// Total number of frames.
    pub total_frames: usize,
    /// Number of free frames.
    pub free_frames: usize,
    /// Number of frames holding pages.
    pub used_frames: usize,
    /// Number of pinned frames.
    pub pinned_frames: usize,
    /// Number of dirty frames.
    pub dirty_frames: usize,
}
