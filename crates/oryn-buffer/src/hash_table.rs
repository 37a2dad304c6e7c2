//! Extendible hash table used as the buffer pool's page table.

use oryn_common::page::PageId;
use parking_lot::RwLock;

/// Capability trait for hash-table keys.
///
/// Implementors supply a uniform hash that must stay stable for the
/// lifetime of a directory. Page ids hash to their numeric value: they are
/// allocated densely, so the identity already distributes well across the
/// directory's low bits and keeps splits deterministic.
pub trait HashKey {
    /// Returns the stable hash of this key.
    fn hash_key(&self) -> u64;
}

impl HashKey for PageId {
    #[inline]
    fn hash_key(&self) -> u64 {
        self.as_u64()
    }
}

impl HashKey for u32 {
    #[inline]
    fn hash_key(&self) -> u64 {
        *self as u64
    }
}

impl HashKey for u64 {
    #[inline]
    fn hash_key(&self) -> u64 {
        *self
    }
}

/// A fixed-capacity bucket holding (key, value) pairs.
struct Bucket<K, V> {
    /// Number of hash bits this bucket discriminates.
    local_depth: u32,
    entries: Vec<(K, V)>,
}

struct Inner<K, V> {
    global_depth: u32,
    /// Bucket records; directory slots index into this vec. Multiple slots
    /// reference the same record when their low `local_depth` bits agree.
    buckets: Vec<Bucket<K, V>>,
    directory: Vec<usize>,
}

/// Directory-doubling extendible hash table.
///
/// The directory holds `2^global_depth` references to bucket records.
/// Inserting into a full bucket either doubles the directory (when the
/// bucket's local depth has caught up with the global depth) or splits the
/// bucket by the next hash bit. The directory never shrinks on removal.
///
/// Lookups take a shared lock; `insert` and `remove` take the exclusive
/// lock, and the retry after a doubling or split happens without dropping
/// it.
pub struct ExtendibleHashTable<K, V> {
    bucket_capacity: usize,
    inner: RwLock<Inner<K, V>>,
}

impl<K, V> ExtendibleHashTable<K, V>
where
    K: HashKey + Eq + Copy,
    V: Copy,
{
    /// Creates a table with the given fixed bucket capacity.
    ///
    /// The directory starts at global depth 0 with a single bucket.
    pub fn new(bucket_capacity: usize) -> Self {
        assert!(bucket_capacity > 0, "bucket capacity must be positive");
        Self {
            bucket_capacity,
            inner: RwLock::new(Inner {
                global_depth: 0,
                buckets: vec![Bucket {
                    local_depth: 0,
                    entries: Vec::new(),
                }],
                directory: vec![0],
            }),
        }
    }

    /// Returns the directory slot for a key at the current global depth.
    #[inline]
    fn slot_of(hash: u64, global_depth: u32) -> usize {
        (hash & ((1u64 << global_depth) - 1)) as usize
    }

    /// Looks up the value associated with a key.
    pub fn find(&self, key: &K) -> Option<V> {
        let inner = self.inner.read();
        let slot = Self::slot_of(key.hash_key(), inner.global_depth);
        let bucket = &inner.buckets[inner.directory[slot]];
        bucket
            .entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|&(_, v)| v)
    }

    /// Returns true if the key is present.
    pub fn contains(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Removes a key. Returns true if it was present.
    pub fn remove(&self, key: &K) -> bool {
        let mut inner = self.inner.write();
        let slot = Self::slot_of(key.hash_key(), inner.global_depth);
        let bucket_idx = inner.directory[slot];
        let bucket = &mut inner.buckets[bucket_idx];
        match bucket.entries.iter().position(|(k, _)| k == key) {
            Some(pos) => {
                bucket.entries.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Inserts a (key, value) pair, growing the directory as needed.
    ///
    /// An existing key has its value updated in place. A full bucket with
    /// `local_depth == global_depth` doubles the directory; a full bucket
    /// with `local_depth < global_depth` is split by the next hash bit and
    /// the insert retries against the rewritten directory.
    pub fn insert(&self, key: K, value: V) {
        let hash = key.hash_key();
        let mut inner = self.inner.write();

        loop {
            let global_depth = inner.global_depth;
            let slot = Self::slot_of(hash, global_depth);
            let bucket_idx = inner.directory[slot];

            {
                let bucket = &mut inner.buckets[bucket_idx];
                if let Some(entry) = bucket.entries.iter_mut().find(|(k, _)| *k == key) {
                    entry.1 = value;
                    return;
                }
                if bucket.entries.len() < self.bucket_capacity {
                    bucket.entries.push((key, value));
                    return;
                }
            }

            let local_depth = inner.buckets[bucket_idx].local_depth;
            if local_depth == global_depth {
                // Mirror the existing slots into the upper half.
                let old_len = inner.directory.len();
                inner.directory.extend_from_within(0..old_len);
                inner.global_depth += 1;
                continue;
            }

            // local_depth < global_depth: split by the next hash bit.
            let split_bit = local_depth;
            let entries = std::mem::take(&mut inner.buckets[bucket_idx].entries);
            let mut low = Vec::new();
            let mut high = Vec::new();
            for (k, v) in entries {
                if (k.hash_key() >> split_bit) & 1 == 1 {
                    high.push((k, v));
                } else {
                    low.push((k, v));
                }
            }

            // The old record becomes the bit=0 bucket; the bit=1 bucket is
            // appended and the matching directory slots are repointed.
            inner.buckets[bucket_idx].local_depth = split_bit + 1;
            inner.buckets[bucket_idx].entries = low;
            inner.buckets.push(Bucket {
                local_depth: split_bit + 1,
                entries: high,
            });
            let high_idx = inner.buckets.len() - 1;
            for (i, slot_ref) in inner.directory.iter_mut().enumerate() {
                if *slot_ref == bucket_idx && (i >> split_bit) & 1 == 1 {
                    *slot_ref = high_idx;
                }
            }
        }
    }

    /// Returns the global depth of the directory.
    pub fn global_depth(&self) -> u32 {
        self.inner.read().global_depth
    }

    /// Returns the local depth of the bucket referenced by a directory slot.
    pub fn local_depth(&self, slot: usize) -> u32 {
        let inner = self.inner.read();
        inner.buckets[inner.directory[slot]].local_depth
    }

    /// Returns the number of directory slots (`2^global_depth`).
    pub fn num_buckets(&self) -> usize {
        1 << self.inner.read().global_depth
    }

    /// Returns the number of stored entries.
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .buckets
            .iter()
            .map(|b| b.entries.len())
            .sum()
    }

    /// Returns true if the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
