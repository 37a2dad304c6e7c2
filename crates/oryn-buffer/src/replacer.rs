//! Page replacement policies for the buffer pool.

use crate::frame::FrameId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::ptr::NonNull;

/// Trait for page replacement algorithms.
pub trait Replacer: Send + Sync {
    /// Registers a frame as an eviction candidate.
    ///
    /// Re-inserting a frame refreshes its position in the eviction order.
    fn insert(&self, frame_id: FrameId);

    /// Selects and removes a victim frame for eviction.
    ///
    /// Returns None if no frames are evictable.
    fn victim(&self) -> Option<FrameId>;

    /// Removes a frame from the replacer.
    ///
    /// Returns true if the frame was present.
    fn erase(&self, frame_id: FrameId) -> bool;

    /// Returns the number of evictable frames.
    fn size(&self) -> usize;
}

/// A node in the LRU linked list.
struct Node {
    value: FrameId,
    prev: Option<NonNull<Node>>,
    next: Option<NonNull<Node>>,
}

/// Internal state: a doubly-linked list ordered from head (next victim,
/// least recently inserted) to tail (most recently inserted), plus a map
/// from frame id to node for O(1) erase.
///
/// Invariant: the map's key set equals the list's value set.
struct LruInner {
    map: HashMap<FrameId, NonNull<Node>>,
    head: Option<NonNull<Node>>,
    tail: Option<NonNull<Node>>,
}

impl LruInner {
    /// Appends a new node at the tail.
    fn push_tail(&mut self, value: FrameId) {
        let node = Box::new(Node {
            value,
            prev: self.tail,
            next: None,
        });
        let node = NonNull::from(Box::leak(node));
        match self.tail {
            Some(mut tail) => unsafe { tail.as_mut().next = Some(node) },
            None => self.head = Some(node),
        }
        self.tail = Some(node);
        self.map.insert(value, node);
    }

    /// Unlinks a node from the list, removes its map entry, and frees it.
    fn unlink(&mut self, node: NonNull<Node>) {
        unsafe {
            let Node { value, prev, next } = *Box::from_raw(node.as_ptr());
            match prev {
                Some(mut p) => p.as_mut().next = next,
                None => self.head = next,
            }
            match next {
                Some(mut n) => n.as_mut().prev = prev,
                None => self.tail = prev,
            }
            self.map.remove(&value);
        }
    }
}

impl Drop for LruInner {
    fn drop(&mut self) {
        let mut cur = self.head;
        while let Some(node) = cur {
            unsafe {
                let boxed = Box::from_raw(node.as_ptr());
                cur = boxed.next;
            }
        }
    }
}

// Safety: LruInner owns its nodes exclusively; the raw pointers never
// escape the Mutex that wraps it.
unsafe impl Send for LruInner {}

/// LRU replacement policy.
///
/// Victims are chosen FIFO by most-recent insertion: the head of the list
/// is the frame least recently registered as a candidate. All operations
/// run under a single mutex; a re-insert unlinks the old node and appends
/// a fresh one within the same lock acquisition.
pub struct LruReplacer {
    inner: Mutex<LruInner>,
}

impl LruReplacer {
    /// Creates a new empty LRU replacer.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(LruInner {
                map: HashMap::new(),
                head: None,
                tail: None,
            }),
        }
    }
}

impl Default for LruReplacer {
    fn default() -> Self {
        Self::new()
    }
}

impl Replacer for LruReplacer {
    fn insert(&self, frame_id: FrameId) {
        let mut inner = self.inner.lock();
        if let Some(&node) = inner.map.get(&frame_id) {
            inner.unlink(node);
        }
        inner.push_tail(frame_id);
    }

    fn victim(&self) -> Option<FrameId> {
        let mut inner = self.inner.lock();
        let head = inner.head?;
        let value = unsafe { head.as_ref().value };
        inner.unlink(head);
        Some(value)
    }

    fn erase(&self, frame_id: FrameId) -> bool {
        let mut inner = self.inner.lock();
        match inner.map.get(&frame_id) {
            Some(&node) => {
                inner.unlink(node);
                true
            }
            None => false,
        }
    }

    fn size(&self) -> usize {
        self.inner.lock().map.len()
    }
}
