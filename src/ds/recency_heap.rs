//! Indexed binary min-heap ordered by last-access time.
//!
//! Each shard keeps one [`RecencyHeap`] alongside its entry map. The heap
//! answers "which entry is the oldest?" in O(1) and removes it in O(log n).
//! Unlike [`std::collections::BinaryHeap`], it also tracks every key's slot
//! in a position index, so a cache hit can re-prioritise an entry in place
//! and TTL expiry can remove an entry from the middle of the heap.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                        RecencyHeap Layout                            │
//! │                                                                      │
//! │   entries: Vec<Slot<K, T>>          (implicit binary tree)           │
//! │                                                                      │
//! │        [0] ("c", t-10)                                               │
//! │         /            \                                               │
//! │   [1] ("b", t)    [2] ("a", t+10)                                    │
//! │                                                                      │
//! │   index: FxHashMap<K, usize>        (key -> slot position)           │
//! │                                                                      │
//! │     "c" -> 0    "b" -> 1    "a" -> 2                                 │
//! └──────────────────────────────────────────────────────────────────────┘
//!
//! Every swap performed while repairing heap order rewrites the index
//! entries of both moved keys, so index[key] == position always holds
//! between operations.
//! ```
//!
//! ## Operations
//!
//! | Operation  | Description                              | Complexity |
//! |------------|------------------------------------------|------------|
//! | `push`     | Insert (or re-prioritise) a key          | O(log n)   |
//! | `pop`      | Remove and return the oldest entry       | O(log n)   |
//! | `peek`     | Inspect the oldest entry                 | O(1)       |
//! | `update`   | Re-prioritise a key in place             | O(log n)   |
//! | `remove`   | Remove an arbitrary key                  | O(log n)   |
//!
//! ## Example Usage
//!
//! ```
//! use std::time::{Duration, Instant};
//!
//! use shardcache::ds::RecencyHeap;
//!
//! let now = Instant::now();
//! let mut heap = RecencyHeap::new();
//! heap.push("a", now + Duration::from_secs(10));
//! heap.push("b", now);
//! heap.push("c", now - Duration::from_secs(10));
//!
//! // "b" was just touched: it moves behind "a"
//! heap.update(&"b", now + Duration::from_secs(20));
//!
//! assert_eq!(heap.pop().map(|(k, _)| k), Some("c"));
//! assert_eq!(heap.pop().map(|(k, _)| k), Some("a"));
//! assert_eq!(heap.pop().map(|(k, _)| k), Some("b"));
//! ```
//!
//! ## Thread Safety
//!
//! `RecencyHeap` is not thread-safe; shards guard it with their
//! [`UpgradableRwLock`](crate::sync::UpgradableRwLock).
//!
//! ## Implementation Notes
//!
//! - Ties between equal priorities are broken arbitrarily.
//! - `check_invariants()` validates heap order and index consistency.

use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::error::InvariantError;

#[derive(Debug, Clone)]
struct Slot<K, T> {
    key: K,
    priority: T,
}

/// Min-heap keyed by `K` and ordered by priority `T` (oldest first).
///
/// # Type Parameters
///
/// - `K`: Key type (must be `Eq + Hash + Clone`)
/// - `T`: Priority type, normally an [`Instant`](std::time::Instant)
///
/// # Example
///
/// ```
/// use shardcache::ds::RecencyHeap;
///
/// let mut heap: RecencyHeap<&str, u64> = RecencyHeap::new();
/// heap.push("x", 30);
/// heap.push("y", 10);
/// heap.push("z", 20);
///
/// // Arbitrary removal keeps the remaining order intact
/// assert_eq!(heap.remove(&"z"), Some(20));
/// assert_eq!(heap.pop(), Some(("y", 10)));
/// assert_eq!(heap.pop(), Some(("x", 30)));
/// assert!(heap.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct RecencyHeap<K, T> {
    entries: Vec<Slot<K, T>>,
    index: FxHashMap<K, usize>,
}

impl<K, T> RecencyHeap<K, T>
where
    K: Eq + Hash + Clone,
    T: Ord,
{
    /// Creates an empty heap.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    /// Creates an empty heap with room for `capacity` keys.
    ///
    /// # Example
    ///
    /// ```
    /// use shardcache::ds::RecencyHeap;
    ///
    /// let heap: RecencyHeap<u64, u64> = RecencyHeap::with_capacity(64);
    /// assert!(heap.is_empty());
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Returns the number of keys in the heap.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the heap holds no keys.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if `key` is in the heap.
    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Returns the current priority of `key`, if present.
    pub fn priority_of(&self, key: &K) -> Option<&T> {
        self.index.get(key).map(|&pos| &self.entries[pos].priority)
    }

    /// Inserts `key` with `priority`.
    ///
    /// If `key` is already present its priority is replaced in place and the
    /// previous priority is returned.
    pub fn push(&mut self, key: K, priority: T) -> Option<T> {
        if let Some(&pos) = self.index.get(&key) {
            let previous = std::mem::replace(&mut self.entries[pos].priority, priority);
            self.repair(pos);
            return Some(previous);
        }

        let pos = self.entries.len();
        self.index.insert(key.clone(), pos);
        self.entries.push(Slot { key, priority });
        self.sift_up(pos);
        None
    }

    /// Returns the oldest `(key, priority)` without removing it.
    pub fn peek(&self) -> Option<(&K, &T)> {
        self.entries.first().map(|slot| (&slot.key, &slot.priority))
    }

    /// Removes and returns the oldest `(key, priority)`.
    pub fn pop(&mut self) -> Option<(K, T)> {
        if self.entries.is_empty() {
            return None;
        }
        let last = self.entries.len() - 1;
        self.swap(0, last);
        let slot = self.entries.pop()?;
        self.index.remove(&slot.key);
        if !self.entries.is_empty() {
            self.sift_down(0);
        }
        Some((slot.key, slot.priority))
    }

    /// Changes the priority of an existing key and restores heap order from
    /// its known position.
    ///
    /// Returns `false` (and does nothing) if `key` is not present.
    ///
    /// # Example
    ///
    /// ```
    /// use shardcache::ds::RecencyHeap;
    ///
    /// let mut heap = RecencyHeap::new();
    /// heap.push("a", 1);
    /// heap.push("b", 2);
    ///
    /// assert!(heap.update(&"a", 3));
    /// assert!(!heap.update(&"missing", 0));
    /// assert_eq!(heap.peek(), Some((&"b", &2)));
    /// ```
    pub fn update(&mut self, key: &K, priority: T) -> bool {
        match self.index.get(key) {
            Some(&pos) => {
                self.entries[pos].priority = priority;
                self.repair(pos);
                true
            },
            None => false,
        }
    }

    /// Removes `key` from anywhere in the heap and returns its priority.
    pub fn remove(&mut self, key: &K) -> Option<T> {
        let pos = *self.index.get(key)?;
        let last = self.entries.len() - 1;
        self.swap(pos, last);
        let slot = self.entries.pop()?;
        self.index.remove(&slot.key);
        if pos < self.entries.len() {
            self.repair(pos);
        }
        Some(slot.priority)
    }

    /// Removes every key.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    /// Iterates over `(key, priority)` pairs in heap (not sorted) order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &T)> {
        self.entries.iter().map(|slot| (&slot.key, &slot.priority))
    }

    /// Validates heap order and position-index consistency.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.index.len() != self.entries.len() {
            return Err(InvariantError::new(format!(
                "heap index holds {} keys but heap holds {}",
                self.index.len(),
                self.entries.len()
            )));
        }
        for (pos, slot) in self.entries.iter().enumerate() {
            match self.index.get(&slot.key) {
                Some(&indexed) if indexed == pos => {},
                Some(&indexed) => {
                    return Err(InvariantError::new(format!(
                        "heap slot {pos} is indexed at {indexed}"
                    )));
                },
                None => {
                    return Err(InvariantError::new(format!(
                        "heap slot {pos} missing from index"
                    )));
                },
            }
            if pos > 0 && self.entries[(pos - 1) / 2].priority > slot.priority {
                return Err(InvariantError::new(format!(
                    "heap order violated between slot {} and its parent",
                    pos
                )));
            }
        }
        Ok(())
    }

    fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.entries.swap(a, b);
        if let Some(pos) = self.index.get_mut(&self.entries[a].key) {
            *pos = a;
        }
        if let Some(pos) = self.index.get_mut(&self.entries[b].key) {
            *pos = b;
        }
    }

    fn repair(&mut self, pos: usize) {
        if self.sift_up(pos) == pos {
            self.sift_down(pos);
        }
    }

    fn sift_up(&mut self, mut pos: usize) -> usize {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if self.entries[pos].priority < self.entries[parent].priority {
                self.swap(pos, parent);
                pos = parent;
            } else {
                break;
            }
        }
        pos
    }

    fn sift_down(&mut self, mut pos: usize) {
        let len = self.entries.len();
        loop {
            let left = 2 * pos + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let mut smallest = left;
            if right < len && self.entries[right].priority < self.entries[left].priority {
                smallest = right;
            }
            if self.entries[smallest].priority < self.entries[pos].priority {
                self.swap(pos, smallest);
                pos = smallest;
            } else {
                break;
            }
        }
    }
}

impl<K, T> Default for RecencyHeap<K, T>
where
    K: Eq + Hash + Clone,
    T: Ord,
{
    fn default() -> Self {
        Self::new()
    }
}
