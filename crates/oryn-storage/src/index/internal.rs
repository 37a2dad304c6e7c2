//! B+ tree internal page.

use super::key::GenericKey;
use super::types::IndexPageHeader;
use oryn_buffer::BufferPoolManager;
use oryn_common::page::{PageId, PageType, PAGE_SIZE};
use oryn_common::{OrynError, Result};

/// Maps pool exhaustion to the index-layer error; a tree operation cannot
/// make progress once every frame is pinned.
fn index_fetch_err(e: OrynError) -> OrynError {
    match e {
        OrynError::BufferPoolFull => OrynError::AllPagesPinned,
        other => other,
    }
}

/// Rewrites a child page's parent back-link through the buffer pool.
///
/// Only the shared header is touched, so this works for internal and leaf
/// children alike.
fn reparent(pool: &BufferPoolManager, child_id: PageId, new_parent: PageId) -> Result<()> {
    let frame = pool.fetch_page(child_id).map_err(index_fetch_err)?;
    {
        let mut data = frame.write_data();
        let mut header = IndexPageHeader::load(&data);
        header.parent_page_id = new_parent;
        header.store(&mut data);
    }
    pool.unpin_page(child_id, true);
    Ok(())
}

/// Typed view over the bytes of an internal B+ tree page.
///
/// Layout: the shared index header followed by a packed array of
/// (key, child page id) mappings. Slot 0 holds only a child id; its key is
/// invalid by convention. `size` counts valid mappings including slot 0,
/// so a page with k keys has size k+1. Keys in slots 1..size-1 are
/// strictly increasing; the child at slot i (i > 0) covers keys >= key[i],
/// and the child at slot 0 covers keys < key[1].
///
/// All mutations are performed by higher layers holding the page's write
/// latch; this type provides the invariant-preserving primitives.
pub struct InternalNode<'a, const N: usize> {
    data: &'a mut [u8; PAGE_SIZE],
}

impl<'a, const N: usize> InternalNode<'a, N> {
    /// Bytes per (key, child id) mapping.
    const MAPPING_SIZE: usize = N + 4;

    /// Maximum number of mappings that fit in a page.
    pub fn max_mappings() -> usize {
        (PAGE_SIZE - IndexPageHeader::SIZE) / Self::MAPPING_SIZE
    }

    /// Initializes a fresh internal page over the buffer.
    ///
    /// The page starts with size 1 (a single child slot, no keys) and its
    /// maximum size derived from the page and mapping sizes.
    pub fn init(data: &'a mut [u8; PAGE_SIZE], page_id: PageId, parent_page_id: PageId) -> Self {
        let mut header = IndexPageHeader::new(PageType::BTreeInternal, page_id, parent_page_id);
        header.size = 1;
        header.max_size = Self::max_mappings() as u32;
        header.store(data);

        let mut node = Self { data };
        node.write_value(0, PageId::INVALID);
        node
    }

    /// Attaches a view to an existing internal page buffer.
    pub fn view(data: &'a mut [u8; PAGE_SIZE]) -> Result<Self> {
        if IndexPageHeader::load(data).page_type != PageType::BTreeInternal {
            return Err(OrynError::InvalidNodeType);
        }
        Ok(Self { data })
    }

    fn header(&self) -> IndexPageHeader {
        IndexPageHeader::load(self.data)
    }

    fn set_header(&mut self, header: &IndexPageHeader) {
        header.store(self.data);
    }

    /// Returns this page's id.
    pub fn page_id(&self) -> PageId {
        self.header().page_id
    }

    /// Returns the parent page id.
    pub fn parent_page_id(&self) -> PageId {
        self.header().parent_page_id
    }

    /// Sets the parent page id.
    pub fn set_parent_page_id(&mut self, parent: PageId) {
        let mut header = self.header();
        header.parent_page_id = parent;
        self.set_header(&header);
    }

    /// Returns the number of valid mappings, including slot 0.
    pub fn size(&self) -> usize {
        self.header().size as usize
    }

    fn set_size(&mut self, size: usize) {
        let mut header = self.header();
        header.size = size as u32;
        self.set_header(&header);
    }

    /// Returns the maximum number of mappings this page holds.
    pub fn max_size(&self) -> usize {
        self.header().max_size as usize
    }

    /// Returns the minimum occupancy for a non-root page.
    pub fn min_size(&self) -> usize {
        (self.max_size() + 1) / 2
    }

    fn entry_offset(index: usize) -> usize {
        IndexPageHeader::SIZE + index * Self::MAPPING_SIZE
    }

    fn read_key(&self, index: usize) -> GenericKey<N> {
        let off = Self::entry_offset(index);
        GenericKey::from_bytes(&self.data[off..off + N])
    }

    fn write_key(&mut self, index: usize, key: GenericKey<N>) {
        let off = Self::entry_offset(index);
        self.data[off..off + N].copy_from_slice(key.as_bytes());
    }

    fn read_value(&self, index: usize) -> PageId {
        let off = Self::entry_offset(index) + N;
        PageId::new(u32::from_le_bytes([
            self.data[off],
            self.data[off + 1],
            self.data[off + 2],
            self.data[off + 3],
        ]))
    }

    fn write_value(&mut self, index: usize, value: PageId) {
        let off = Self::entry_offset(index) + N;
        self.data[off..off + 4].copy_from_slice(&value.0.to_le_bytes());
    }

    /// Returns the key at a slot. Slot 0's key is invalid by convention.
    pub fn key_at(&self, index: usize) -> GenericKey<N> {
        assert!(index < self.size(), "key index {index} out of bounds");
        self.read_key(index)
    }

    /// Sets the key at a slot.
    pub fn set_key_at(&mut self, index: usize, key: GenericKey<N>) {
        assert!(index < self.size(), "key index {index} out of bounds");
        self.write_key(index, key);
    }

    /// Returns the child page id at a slot.
    pub fn value_at(&self, index: usize) -> PageId {
        assert!(index < self.size(), "value index {index} out of bounds");
        self.read_value(index)
    }

    /// Returns the first slot whose child equals `value`.
    pub fn value_index(&self, value: PageId) -> Option<usize> {
        (0..self.size()).find(|&i| self.read_value(i) == value)
    }

    /// Finds the child covering `key`.
    ///
    /// Binary search over slots 1..size-1; a key equal to a separator goes
    /// right (the separator's own subtree).
    pub fn lookup(&self, key: &GenericKey<N>) -> PageId {
        let size = self.size();
        assert!(size > 1, "lookup on an internal page without keys");

        let mut lo = 1;
        let mut hi = size;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.read_key(mid) <= *key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        self.read_value(lo - 1)
    }

    /// Populates a freshly created root after the tree grows in height.
    ///
    /// `old_value` becomes the slot-0 child and (`new_key`, `new_value`)
    /// the first separator mapping.
    pub fn populate_new_root(&mut self, old_value: PageId, new_key: GenericKey<N>, new_value: PageId) {
        assert_eq!(self.size(), 1, "new root must hold a single child slot");
        self.write_value(0, old_value);
        self.write_key(1, new_key);
        self.write_value(1, new_value);
        self.set_size(2);
    }

    /// Inserts (`new_key`, `new_value`) immediately after the slot whose
    /// child equals `old_value`. Returns the new size.
    pub fn insert_node_after(
        &mut self,
        old_value: PageId,
        new_key: GenericKey<N>,
        new_value: PageId,
    ) -> usize {
        let size = self.size();
        assert!(size < self.max_size(), "internal page overflow");
        let index = self
            .value_index(old_value)
            .expect("insert_node_after: old child not in page");

        let src = Self::entry_offset(index + 1);
        let end = Self::entry_offset(size);
        self.data.copy_within(src..end, src + Self::MAPPING_SIZE);

        self.write_key(index + 1, new_key);
        self.write_value(index + 1, new_value);
        self.set_size(size + 1);
        size + 1
    }

    /// Removes the mapping at `index`, shifting later slots left.
    pub fn remove(&mut self, index: usize) {
        let size = self.size();
        assert!(index < size, "remove index {index} out of bounds");

        let src = Self::entry_offset(index + 1);
        let end = Self::entry_offset(size);
        self.data.copy_within(src..end, Self::entry_offset(index));
        self.set_size(size - 1);
    }

    /// Removes the last remaining child and marks the page invalid.
    ///
    /// Used only when the root collapses to a single child.
    pub fn remove_and_return_only_child(&mut self) -> PageId {
        assert_eq!(self.size(), 1, "page still holds separator keys");
        let child = self.read_value(0);

        let mut header = self.header();
        header.page_type = PageType::Invalid;
        self.set_header(&header);
        child
    }

    /// Moves the last half of the mappings to an empty recipient page.
    ///
    /// Every moved child is reparented to the recipient.
    pub fn move_half_to(
        &mut self,
        recipient: &mut InternalNode<'_, N>,
        pool: &BufferPoolManager,
    ) -> Result<()> {
        let size = self.size();
        let move_count = (size + 1) / 2;
        let start = size - move_count;

        let src_start = Self::entry_offset(start);
        let src_end = Self::entry_offset(size);
        let dst = Self::entry_offset(0);
        recipient.data[dst..dst + (src_end - src_start)]
            .copy_from_slice(&self.data[src_start..src_end]);
        recipient.set_size(move_count);

        let recipient_id = recipient.page_id();
        for i in start..size {
            reparent(pool, self.read_value(i), recipient_id)?;
        }
        self.set_size(start);
        Ok(())
    }

    /// Moves all mappings to the recipient, collapsing the separator.
    ///
    /// The parent's key at `index_in_parent` is reified into this page's
    /// slot-0 key so the merged run carries a valid first key, then that
    /// parent entry is removed. Every moved child is reparented to the
    /// recipient. This page ends at size 1, ready to be freed.
    pub fn move_all_to(
        &mut self,
        recipient: &mut InternalNode<'_, N>,
        index_in_parent: usize,
        pool: &BufferPoolManager,
    ) -> Result<()> {
        let parent_id = self.parent_page_id();
        let parent_frame = pool.fetch_page(parent_id).map_err(index_fetch_err)?;
        {
            let mut parent_data = parent_frame.write_data();
            let mut parent = InternalNode::<N>::view(&mut parent_data)?;
            let separator = parent.key_at(index_in_parent);
            self.write_key(0, separator);
            parent.remove(index_in_parent);
        }
        pool.unpin_page(parent_id, true);

        let count = self.size();
        let dst_index = recipient.size();
        assert!(
            dst_index + count <= recipient.max_size(),
            "merge would overflow recipient"
        );

        let src_start = Self::entry_offset(0);
        let src_end = Self::entry_offset(count);
        let dst = Self::entry_offset(dst_index);
        recipient.data[dst..dst + (src_end - src_start)]
            .copy_from_slice(&self.data[src_start..src_end]);
        recipient.set_size(dst_index + count);

        let recipient_id = recipient.page_id();
        for i in 0..count {
            reparent(pool, self.read_value(i), recipient_id)?;
        }
        self.set_size(1);
        Ok(())
    }

    /// Redistribution: moves this page's first mapping to the recipient's
    /// tail, rotating the separator through the parent.
    ///
    /// The parent's separator for this page becomes the moved pair's key,
    /// and the parent is updated to this page's next key.
    pub fn move_first_to_end_of(
        &mut self,
        recipient: &mut InternalNode<'_, N>,
        pool: &BufferPoolManager,
    ) -> Result<()> {
        let self_id = self.page_id();
        let parent_id = self.parent_page_id();
        let parent_frame = pool.fetch_page(parent_id).map_err(index_fetch_err)?;
        {
            let mut parent_data = parent_frame.write_data();
            let mut parent = InternalNode::<N>::view(&mut parent_data)?;
            let index = parent
                .value_index(self_id)
                .ok_or_else(|| OrynError::BTreeCorrupted("page missing from its parent".into()))?;
            let separator = parent.key_at(index);
            self.write_key(0, separator);
            parent.set_key_at(index, self.key_at(1));
        }
        pool.unpin_page(parent_id, true);

        let moved_key = self.key_at(0);
        let moved_child = self.value_at(0);
        let recipient_size = recipient.size();
        assert!(recipient_size < recipient.max_size(), "recipient overflow");
        recipient.write_key(recipient_size, moved_key);
        recipient.write_value(recipient_size, moved_child);
        recipient.set_size(recipient_size + 1);
        reparent(pool, moved_child, recipient.page_id())?;

        let size = self.size();
        self.data.copy_within(
            Self::entry_offset(1)..Self::entry_offset(size),
            Self::entry_offset(0),
        );
        self.set_size(size - 1);
        Ok(())
    }

    /// Redistribution: moves this page's last mapping to the recipient's
    /// front, updating the parent's separator for this page.
    pub fn move_last_to_front_of(
        &mut self,
        recipient: &mut InternalNode<'_, N>,
        pool: &BufferPoolManager,
    ) -> Result<()> {
        let size = self.size();
        let moved_key = self.key_at(size - 1);
        let moved_child = self.value_at(size - 1);

        let self_id = self.page_id();
        let parent_id = self.parent_page_id();
        let parent_frame = pool.fetch_page(parent_id).map_err(index_fetch_err)?;
        {
            let mut parent_data = parent_frame.write_data();
            let mut parent = InternalNode::<N>::view(&mut parent_data)?;
            let index = parent
                .value_index(self_id)
                .ok_or_else(|| OrynError::BTreeCorrupted("page missing from its parent".into()))?;
            parent.set_key_at(index, moved_key);
        }
        pool.unpin_page(parent_id, true);

        let recipient_size = recipient.size();
        assert!(recipient_size < recipient.max_size(), "recipient overflow");
        recipient.data.copy_within(
            Self::entry_offset(0)..Self::entry_offset(recipient_size),
            Self::entry_offset(1),
        );
        recipient.write_key(0, moved_key);
        recipient.write_value(0, moved_child);
        recipient.set_size(recipient_size + 1);
        reparent(pool, moved_child, recipient.page_id())?;

        self.set_size(size - 1);
        Ok(())
    }
}

impl<const N: usize> std::fmt::Debug for InternalNode<'_, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut entries = f.debug_list();
        for i in 0..self.size() {
            if i == 0 {
                entries.entry(&("_", self.read_value(i)));
            } else {
                entries.entry(&(self.read_key(i), self.read_value(i)));
            }
        }
        entries.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::{DiskManagerConfig, FileDiskManager};
    use crate::index::key::Key8;
    use oryn_buffer::BufferPoolConfig;
    use std::sync::Arc;

    fn key(v: u64) -> Key8 {
        Key8::from_u64(v)
    }

    fn create_test_pool(pool_size: usize) -> (BufferPoolManager, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let disk = Arc::new(
            FileDiskManager::new(DiskManagerConfig {
                path: dir.path().join("index.db"),
                fsync_enabled: false,
            })
            .unwrap(),
        );
        (BufferPoolManager::new(BufferPoolConfig { pool_size }, disk), dir)
    }

    /// Allocates and initializes an internal page, returning its id.
    fn make_internal_page(pool: &BufferPoolManager, parent: PageId) -> PageId {
        let (page_id, frame) = pool.new_page().unwrap();
        {
            let mut data = frame.write_data();
            InternalNode::<8>::init(&mut data, page_id, parent);
        }
        pool.unpin_page(page_id, true);
        page_id
    }

    fn parent_of(pool: &BufferPoolManager, page_id: PageId) -> PageId {
        let frame = pool.fetch_page(page_id).unwrap();
        let parent = IndexPageHeader::load(&frame.read_data()).parent_page_id;
        pool.unpin_page(page_id, false);
        parent
    }

    #[test]
    fn test_init() {
        let mut data = [0u8; PAGE_SIZE];
        let node = InternalNode::<8>::init(&mut data, PageId::new(5), PageId::new(2));

        assert_eq!(node.page_id(), PageId::new(5));
        assert_eq!(node.parent_page_id(), PageId::new(2));
        assert_eq!(node.size(), 1);
        assert_eq!(node.max_size(), (PAGE_SIZE - IndexPageHeader::SIZE) / 12);
        assert_eq!(node.max_size(), 339);
        assert_eq!(node.min_size(), 170);
    }

    #[test]
    fn test_max_size_per_key_width() {
        assert_eq!(InternalNode::<4>::max_mappings(), 4072 / 8);
        assert_eq!(InternalNode::<8>::max_mappings(), 4072 / 12);
        assert_eq!(InternalNode::<16>::max_mappings(), 4072 / 20);
        assert_eq!(InternalNode::<32>::max_mappings(), 4072 / 36);
        assert_eq!(InternalNode::<64>::max_mappings(), 4072 / 68);
    }

    #[test]
    fn test_view_rejects_wrong_type() {
        let mut data = [0u8; PAGE_SIZE];
        assert!(matches!(
            InternalNode::<8>::view(&mut data),
            Err(OrynError::InvalidNodeType)
        ));

        InternalNode::<8>::init(&mut data, PageId::new(1), PageId::INVALID);
        assert!(InternalNode::<8>::view(&mut data).is_ok());
    }

    #[test]
    fn test_populate_new_root() {
        let mut data = [0u8; PAGE_SIZE];
        let mut node = InternalNode::<8>::init(&mut data, PageId::new(1), PageId::INVALID);

        node.populate_new_root(PageId::new(10), key(7), PageId::new(11));

        assert_eq!(node.size(), 2);
        assert_eq!(node.value_at(0), PageId::new(10));
        assert_eq!(node.key_at(1), key(7));
        assert_eq!(node.value_at(1), PageId::new(11));
    }

    #[test]
    fn test_insert_node_after_keeps_order() {
        let mut data = [0u8; PAGE_SIZE];
        let mut node = InternalNode::<8>::init(&mut data, PageId::new(1), PageId::INVALID);

        node.populate_new_root(PageId::new(10), key(20), PageId::new(12));
        assert_eq!(node.insert_node_after(PageId::new(10), key(10), PageId::new(11)), 3);
        assert_eq!(node.insert_node_after(PageId::new(12), key(30), PageId::new(13)), 4);

        assert_eq!(node.value_at(0), PageId::new(10));
        for (i, expected) in [(1, 10u64), (2, 20), (3, 30)] {
            assert_eq!(node.key_at(i), key(expected));
            assert_eq!(node.value_at(i), PageId::new(10 + i as u32));
        }
        // Keys in slots 1..size-1 strictly increasing.
        for i in 2..node.size() {
            assert!(node.key_at(i - 1) < node.key_at(i));
        }
    }

    #[test]
    fn test_value_index() {
        let mut data = [0u8; PAGE_SIZE];
        let mut node = InternalNode::<8>::init(&mut data, PageId::new(1), PageId::INVALID);
        node.populate_new_root(PageId::new(10), key(5), PageId::new(11));

        assert_eq!(node.value_index(PageId::new(10)), Some(0));
        assert_eq!(node.value_index(PageId::new(11)), Some(1));
        assert_eq!(node.value_index(PageId::new(99)), None);
    }

    #[test]
    fn test_lookup_tie_break() {
        let mut data = [0u8; PAGE_SIZE];
        let mut node = InternalNode::<8>::init(&mut data, PageId::new(1), PageId::INVALID);

        let (c0, c1, c2, c3) = (
            PageId::new(100),
            PageId::new(101),
            PageId::new(102),
            PageId::new(103),
        );
        node.populate_new_root(c0, key(10), c1);
        node.insert_node_after(c1, key(20), c2);
        node.insert_node_after(c2, key(30), c3);

        assert_eq!(node.lookup(&key(5)), c0);
        assert_eq!(node.lookup(&key(10)), c1); // equal goes right
        assert_eq!(node.lookup(&key(15)), c1);
        assert_eq!(node.lookup(&key(20)), c2);
        assert_eq!(node.lookup(&key(35)), c3);
    }

    #[test]
    fn test_remove_shifts_left() {
        let mut data = [0u8; PAGE_SIZE];
        let mut node = InternalNode::<8>::init(&mut data, PageId::new(1), PageId::INVALID);

        node.populate_new_root(PageId::new(10), key(10), PageId::new(11));
        node.insert_node_after(PageId::new(11), key(20), PageId::new(12));
        node.insert_node_after(PageId::new(12), key(30), PageId::new(13));

        node.remove(2);

        assert_eq!(node.size(), 3);
        assert_eq!(node.value_at(0), PageId::new(10));
        assert_eq!(node.key_at(1), key(10));
        assert_eq!(node.key_at(2), key(30));
        assert_eq!(node.value_at(2), PageId::new(13));

        // Removing the last slot only shrinks the page.
        node.remove(2);
        assert_eq!(node.size(), 2);
        assert_eq!(node.key_at(1), key(10));
    }

    #[test]
    fn test_remove_and_return_only_child() {
        let mut data = [0u8; PAGE_SIZE];
        let mut node = InternalNode::<8>::init(&mut data, PageId::new(1), PageId::INVALID);
        node.populate_new_root(PageId::new(10), key(10), PageId::new(11));
        node.remove(1);

        assert_eq!(node.size(), 1);
        let child = node.remove_and_return_only_child();
        assert_eq!(child, PageId::new(10));
        assert_eq!(IndexPageHeader::load(node.data).page_type, PageType::Invalid);
    }

    #[test]
    fn test_move_half_to_reparents_children() {
        let (pool, _dir) = create_test_pool(32);

        let left_id = make_internal_page(&pool, PageId::INVALID);
        let right_id = make_internal_page(&pool, PageId::INVALID);
        let children: Vec<PageId> = (0..6)
            .map(|_| make_internal_page(&pool, left_id))
            .collect();

        let left_frame = pool.fetch_page(left_id).unwrap();
        let right_frame = pool.fetch_page(right_id).unwrap();
        {
            let mut left_data = left_frame.write_data();
            let mut right_data = right_frame.write_data();
            let mut left = InternalNode::<8>::view(&mut left_data).unwrap();
            let mut right = InternalNode::<8>::view(&mut right_data).unwrap();

            left.populate_new_root(children[0], key(10), children[1]);
            for i in 2..6 {
                left.insert_node_after(children[i - 1], key(10 * i as u64), children[i]);
            }
            assert_eq!(left.size(), 6);

            left.move_half_to(&mut right, &pool).unwrap();

            assert_eq!(left.size(), 3);
            assert_eq!(right.size(), 3);
            // Moved tail lands at the recipient's prefix.
            assert_eq!(right.value_at(0), children[3]);
            assert_eq!(right.key_at(1), key(40));
            assert_eq!(right.value_at(1), children[4]);
            assert_eq!(right.key_at(2), key(50));
            assert_eq!(right.value_at(2), children[5]);
        }
        pool.unpin_page(left_id, true);
        pool.unpin_page(right_id, true);

        // Moved children point at the recipient; kept children are untouched.
        for &child in &children[3..] {
            assert_eq!(parent_of(&pool, child), right_id);
        }
        for &child in &children[..3] {
            assert_eq!(parent_of(&pool, child), left_id);
        }
    }

    #[test]
    fn test_move_all_to_merges_and_reparents() {
        let (pool, _dir) = create_test_pool(32);

        let root_id = make_internal_page(&pool, PageId::INVALID);
        let left_id = make_internal_page(&pool, root_id);
        let right_id = make_internal_page(&pool, root_id);
        let left_children: Vec<PageId> =
            (0..2).map(|_| make_internal_page(&pool, left_id)).collect();
        let right_children: Vec<PageId> =
            (0..2).map(|_| make_internal_page(&pool, right_id)).collect();

        // Root separates left and right at key 50.
        {
            let root_frame = pool.fetch_page(root_id).unwrap();
            {
                let mut root_data = root_frame.write_data();
                let mut root = InternalNode::<8>::view(&mut root_data).unwrap();
                root.populate_new_root(left_id, key(50), right_id);
            }
            pool.unpin_page(root_id, true);
        }

        let left_frame = pool.fetch_page(left_id).unwrap();
        let right_frame = pool.fetch_page(right_id).unwrap();
        {
            let mut left_data = left_frame.write_data();
            let mut right_data = right_frame.write_data();
            let mut left = InternalNode::<8>::view(&mut left_data).unwrap();
            let mut right = InternalNode::<8>::view(&mut right_data).unwrap();

            left.populate_new_root(left_children[0], key(20), left_children[1]);
            right.populate_new_root(right_children[0], key(70), right_children[1]);

            right.move_all_to(&mut left, 1, &pool).unwrap();

            assert_eq!(left.size(), 4);
            // The separator key 50 was reified onto the moved run's head.
            assert_eq!(left.key_at(2), key(50));
            assert_eq!(left.value_at(2), right_children[0]);
            assert_eq!(left.key_at(3), key(70));
            assert_eq!(left.value_at(3), right_children[1]);
            assert_eq!(right.size(), 1);
        }
        pool.unpin_page(left_id, true);
        pool.unpin_page(right_id, true);

        // Parent lost the separator entry.
        {
            let root_frame = pool.fetch_page(root_id).unwrap();
            {
                let mut root_data = root_frame.write_data();
                let root = InternalNode::<8>::view(&mut root_data).unwrap();
                assert_eq!(root.size(), 1);
                assert_eq!(root.value_at(0), left_id);
            }
            pool.unpin_page(root_id, false);
        }

        for &child in right_children.iter() {
            assert_eq!(parent_of(&pool, child), left_id);
        }
    }

    #[test]
    fn test_move_first_to_end_of() {
        let (pool, _dir) = create_test_pool(32);

        let root_id = make_internal_page(&pool, PageId::INVALID);
        let left_id = make_internal_page(&pool, root_id);
        let right_id = make_internal_page(&pool, root_id);
        let left_children: Vec<PageId> =
            (0..2).map(|_| make_internal_page(&pool, left_id)).collect();
        let right_children: Vec<PageId> =
            (0..3).map(|_| make_internal_page(&pool, right_id)).collect();

        {
            let root_frame = pool.fetch_page(root_id).unwrap();
            {
                let mut root_data = root_frame.write_data();
                let mut root = InternalNode::<8>::view(&mut root_data).unwrap();
                root.populate_new_root(left_id, key(50), right_id);
            }
            pool.unpin_page(root_id, true);
        }

        let left_frame = pool.fetch_page(left_id).unwrap();
        let right_frame = pool.fetch_page(right_id).unwrap();
        {
            let mut left_data = left_frame.write_data();
            let mut right_data = right_frame.write_data();
            let mut left = InternalNode::<8>::view(&mut left_data).unwrap();
            let mut right = InternalNode::<8>::view(&mut right_data).unwrap();

            left.populate_new_root(left_children[0], key(20), left_children[1]);
            right.populate_new_root(right_children[0], key(60), right_children[1]);
            right.insert_node_after(right_children[1], key(70), right_children[2]);

            right.move_first_to_end_of(&mut left, &pool).unwrap();

            // Left grew by the (separator, first child) pair.
            assert_eq!(left.size(), 3);
            assert_eq!(left.key_at(2), key(50));
            assert_eq!(left.value_at(2), right_children[0]);

            // Right shifted left by one.
            assert_eq!(right.size(), 2);
            assert_eq!(right.value_at(0), right_children[1]);
            assert_eq!(right.key_at(1), key(70));
        }
        pool.unpin_page(left_id, true);
        pool.unpin_page(right_id, true);

        // Parent's separator rotated to right's old first key.
        {
            let root_frame = pool.fetch_page(root_id).unwrap();
            {
                let mut root_data = root_frame.write_data();
                let root = InternalNode::<8>::view(&mut root_data).unwrap();
                assert_eq!(root.key_at(1), key(60));
            }
            pool.unpin_page(root_id, false);
        }

        assert_eq!(parent_of(&pool, right_children[0]), left_id);
        assert_eq!(parent_of(&pool, right_children[1]), right_id);
    }

    #[test]
    fn test_move_last_to_front_of() {
        let (pool, _dir) = create_test_pool(32);

        let root_id = make_internal_page(&pool, PageId::INVALID);
        let left_id = make_internal_page(&pool, root_id);
        let right_id = make_internal_page(&pool, root_id);
        let left_children: Vec<PageId> =
            (0..3).map(|_| make_internal_page(&pool, left_id)).collect();
        let right_children: Vec<PageId> =
            (0..2).map(|_| make_internal_page(&pool, right_id)).collect();

        {
            let root_frame = pool.fetch_page(root_id).unwrap();
            {
                let mut root_data = root_frame.write_data();
                let mut root = InternalNode::<8>::view(&mut root_data).unwrap();
                root.populate_new_root(left_id, key(50), right_id);
            }
            pool.unpin_page(root_id, true);
        }

        let left_frame = pool.fetch_page(left_id).unwrap();
        let right_frame = pool.fetch_page(right_id).unwrap();
        {
            let mut left_data = left_frame.write_data();
            let mut right_data = right_frame.write_data();
            let mut left = InternalNode::<8>::view(&mut left_data).unwrap();
            let mut right = InternalNode::<8>::view(&mut right_data).unwrap();

            left.populate_new_root(left_children[0], key(20), left_children[1]);
            left.insert_node_after(left_children[1], key(30), left_children[2]);
            right.populate_new_root(right_children[0], key(70), right_children[1]);

            left.move_last_to_front_of(&mut right, &pool).unwrap();

            assert_eq!(left.size(), 2);

            // Right gained the pair at its front; old slots shifted right.
            assert_eq!(right.size(), 3);
            assert_eq!(right.key_at(0), key(30));
            assert_eq!(right.value_at(0), left_children[2]);
            assert_eq!(right.value_at(1), right_children[0]);
            assert_eq!(right.key_at(2), key(70));
            assert_eq!(right.value_at(2), right_children[1]);
        }
        pool.unpin_page(left_id, true);
        pool.unpin_page(right_id, true);

        // Parent's separator for the donor page became the moved key.
        {
            let root_frame = pool.fetch_page(root_id).unwrap();
            {
                let mut root_data = root_frame.write_data();
                let root = InternalNode::<8>::view(&mut root_data).unwrap();
                assert_eq!(root.key_at(0), key(30));
            }
            pool.unpin_page(root_id, false);
        }

        assert_eq!(parent_of(&pool, left_children[2]), right_id);
    }

    #[test]
    fn test_move_ops_fail_when_pool_exhausted() {
        // A pool too small to fetch children surfaces AllPagesPinned.
        let (pool, _dir) = create_test_pool(3);

        let left_id = make_internal_page(&pool, PageId::INVALID);
        let right_id = make_internal_page(&pool, PageId::INVALID);
        let child_a = make_internal_page(&pool, left_id);
        let child_b = make_internal_page(&pool, left_id);

        // Pin a third page so the pool has no spare frame for the child.
        let left_frame = pool.fetch_page(left_id).unwrap();
        let right_frame = pool.fetch_page(right_id).unwrap();
        let (_, spare) = pool.new_page().unwrap();
        {
            let mut data = spare.write_data();
            InternalNode::<8>::init(&mut data, spare.page_id().unwrap(), PageId::INVALID);
        }

        {
            let mut left_data = left_frame.write_data();
            let mut right_data = right_frame.write_data();
            let mut left = InternalNode::<8>::view(&mut left_data).unwrap();
            let mut right = InternalNode::<8>::view(&mut right_data).unwrap();
            left.populate_new_root(child_a, key(10), child_b);

            let err = left.move_half_to(&mut right, &pool).unwrap_err();
            assert!(matches!(err, OrynError::AllPagesPinned));
        }
        pool.unpin_page(left_id, false);
        pool.unpin_page(right_id, false);
    }
}
