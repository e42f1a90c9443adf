//! Bounded least-recently-used cache
//!
//! [`BoundedCache`] memoizes expensive work such as decompressed blocks keyed by their
//! block start offset. It keeps entries in a recency list stored in an arena:
//!
//! ```text
//!   head (least recent)                           tail (most recent)
//!   ┌──────┐   next   ┌──────┐   next   ┌──────┐
//!   │ slot │ ───────► │ slot │ ───────► │ slot │
//!   │      │ ◄─────── │      │ ◄─────── │      │
//!   └──────┘   prev   └──────┘   prev   └──────┘
//! ```
//!
//! Slots live contiguously in a `Vec` and link to each other by index; a hash index maps
//! each key to its slot. Every touch unlinks a slot and relinks it at the tail, and
//! eviction pops from the head, so all operations are O(1) on average.
//!
//! The cache is not internally synchronized. Wrap it in a mutex to share it between
//! threads.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use crate::DEFAULT_CACHE_CAPACITY;

/// Sentinel for a missing link
const NIL: usize = usize::MAX;

struct Slot<K, V> {
    key: K,
    value: V,
    prev: usize,
    next: usize,
}

/// A key-value cache that evicts the least recently used entry on overflow
///
/// A capacity of zero makes the cache unbounded: it never evicts.
///
/// # Examples
///
/// ```
/// # use bamnav::BoundedCache;
/// let mut cache = BoundedCache::new(2);
/// cache.put("a", 1);
/// cache.put("b", 2);
/// cache.get(&"a");
/// cache.put("c", 3);
///
/// assert!(cache.contains(&"a"));
/// assert!(!cache.contains(&"b"));
/// assert!(cache.contains(&"c"));
/// ```
pub struct BoundedCache<K, V> {
    slots: Vec<Slot<K, V>>,
    index: HashMap<K, usize>,

    /// Least recently used slot
    head: usize,

    /// Most recently used slot
    tail: usize,

    capacity: usize,
}

impl<K: Hash + Eq + Clone, V> BoundedCache<K, V> {
    /// Creates an empty cache holding at most `capacity` entries (0 = unbounded)
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
            head: NIL,
            tail: NIL,
            capacity,
        }
    }

    /// Creates an empty cache that never evicts
    #[must_use]
    pub fn unbounded() -> Self {
        Self::new(0)
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.capacity == 0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns the value for `key` and marks it as most recently used
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.index.get(key)?;
        self.touch(idx);
        Some(&self.slots[idx].value)
    }

    /// Mutable variant of [`get`](Self::get) with the same recency semantics
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.index.get(key)?;
        self.touch(idx);
        Some(&mut self.slots[idx].value)
    }

    /// Returns the value for `key` without affecting recency
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.get(key).map(|&idx| &self.slots[idx].value)
    }

    /// Checks for `key` without affecting recency
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.contains_key(key)
    }

    /// Inserts or overwrites an entry, making it the most recently used
    ///
    /// If the cache is bounded and now holds more than `capacity` entries, the least
    /// recently used entries are evicted until it holds exactly `capacity`.
    pub fn put(&mut self, key: K, value: V) {
        if let Some(&idx) = self.index.get(&key) {
            self.slots[idx].value = value;
            self.touch(idx);
        } else {
            let idx = self.slots.len();
            self.slots.push(Slot {
                key: key.clone(),
                value,
                prev: NIL,
                next: NIL,
            });
            self.index.insert(key, idx);
            self.link_tail(idx);
        }
        self.cull();
    }

    /// Returns the cached value for `key`, loading and inserting it on a miss
    ///
    /// The loader runs only on a miss. If it fails nothing is inserted and the error is
    /// returned unchanged.
    pub fn get_or_insert_with<F, E>(&mut self, key: K, load: F) -> Result<&V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(&idx) = self.index.get(&key) {
            self.touch(idx);
            return Ok(&self.slots[idx].value);
        }
        let value = load()?;
        self.put(key, value);

        // a fresh entry is the most recent one and survives culling
        Ok(&self.slots[self.tail].value)
    }

    /// Removes an entry, returning its value
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.index.get(key)?;
        Some(self.remove_slot(idx).1)
    }

    /// Removes and returns the least recently used entry
    pub fn pop_lru(&mut self) -> Option<(K, V)> {
        if self.head == NIL {
            None
        } else {
            Some(self.remove_slot(self.head))
        }
    }

    /// Changes the capacity, evicting immediately if the cache shrinks below its size
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.cull();
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.index.clear();
        self.head = NIL;
        self.tail = NIL;
    }

    /// Iterates from the least to the most recently used entry without touching them
    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: &self.slots,
            cursor: self.head,
        }
    }

    /// Evicts least recently used entries until the capacity is respected
    fn cull(&mut self) {
        if self.is_unbounded() {
            return;
        }
        let mut evicted = 0;
        while self.slots.len() > self.capacity {
            self.pop_lru();
            evicted += 1;
        }
        if evicted > 0 {
            log::trace!(
                "Evicted {evicted} cache entries (capacity: {})",
                self.capacity
            );
        }
    }

    fn touch(&mut self, idx: usize) {
        if idx != self.tail {
            self.unlink(idx);
            self.link_tail(idx);
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.slots[idx].prev, self.slots[idx].next);
        if prev == NIL {
            self.head = next;
        } else {
            self.slots[prev].next = next;
        }
        if next == NIL {
            self.tail = prev;
        } else {
            self.slots[next].prev = prev;
        }
    }

    fn link_tail(&mut self, idx: usize) {
        self.slots[idx].prev = self.tail;
        self.slots[idx].next = NIL;
        if self.tail == NIL {
            self.head = idx;
        } else {
            self.slots[self.tail].next = idx;
        }
        self.tail = idx;
    }

    /// Unlinks and drops a slot, moving the last slot into the hole
    fn remove_slot(&mut self, idx: usize) -> (K, V) {
        self.unlink(idx);
        let slot = self.slots.swap_remove(idx);
        self.index.remove(&slot.key);

        if idx < self.slots.len() {
            let (prev, next) = (self.slots[idx].prev, self.slots[idx].next);
            if prev == NIL {
                self.head = idx;
            } else {
                self.slots[prev].next = idx;
            }
            if next == NIL {
                self.tail = idx;
            } else {
                self.slots[next].prev = idx;
            }
            if let Some(pos) = self.index.get_mut(&self.slots[idx].key) {
                *pos = idx;
            }
        }
        (slot.key, slot.value)
    }
}

impl<K: Hash + Eq + Clone, V> Default for BoundedCache<K, V> {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for BoundedCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = Iter {
            slots: &self.slots,
            cursor: self.head,
        };
        f.debug_struct("BoundedCache")
            .field("capacity", &self.capacity)
            .field("entries", &DebugEntries(entries))
            .finish()
    }
}

struct DebugEntries<'a, K, V>(Iter<'a, K, V>);
impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for DebugEntries<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.clone()).finish()
    }
}

/// Iterator over cache entries in recency order, see [`BoundedCache::iter`]
pub struct Iter<'a, K, V> {
    slots: &'a [Slot<K, V>],
    cursor: usize,
}
impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots,
            cursor: self.cursor,
        }
    }
}
impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == NIL {
            None
        } else {
            let slot = &self.slots[self.cursor];
            self.cursor = slot.next;
            Some((&slot.key, &slot.value))
        }
    }
}

impl<'a, K: Hash + Eq + Clone, V> IntoIterator for &'a BoundedCache<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
