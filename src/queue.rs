//! The open-set priority queue: an ordered multimap from two-component
//! keys to cells, paired with a reverse index so any cell can be located,
//! updated, or removed without a linear scan.
//!
//! Backed by a `BinaryHeap<Entry<Id>>` plus a `HashMap<Id, u64>` of
//! "current generation" numbers: updating or removing a cell just bumps
//! its generation, which silently invalidates any stale heap entry still
//! carrying the old one. This gives amortized O(log n) update/remove
//! while keeping `peek`/`contains` O(1), without needing a `BTreeMap`.

use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::hash::Hash;

use crate::num::{approx_eq, approx_lt};

/// The two-component priority key. Ordering is lexicographic on
/// `(k1, k2)` under tolerant float comparison: values within epsilon of
/// each other are tied on that component.
#[derive(Debug, Clone, Copy)]
pub struct Key {
    pub k1: f64,
    pub k2: f64,
}

impl Key {
    pub fn new(k1: f64, k2: f64) -> Self {
        Key { k1, k2 }
    }

    fn cmp_component(a: f64, b: f64) -> Ordering {
        if approx_eq(a, b) {
            Ordering::Equal
        } else if approx_lt(a, b) {
            Ordering::Less
        } else {
            Ordering::Greater
        }
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Key {}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        Key::cmp_component(self.k1, other.k1).then_with(|| Key::cmp_component(self.k2, other.k2))
    }
}

/// Is `a` strictly less than `b` under the queue's tolerant ordering?
pub fn key_less_than(a: Key, b: Key) -> bool {
    a.cmp(&b) == Ordering::Less
}

struct Entry<Id> {
    key: Key,
    id: Id,
    generation: u64,
}

impl<Id> PartialEq for Entry<Id> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}
impl<Id> Eq for Entry<Id> {}

impl<Id> PartialOrd for Entry<Id> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<Id> Ord for Entry<Id> {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the smallest key surfaces first.
        other.key.cmp(&self.key)
    }
}

/// The planner's open set: cells currently locally inconsistent (or not
/// yet processed), ordered by [`Key`].
pub struct OpenQueue<Id> {
    heap: BinaryHeap<Entry<Id>>,
    generations: FxHashMap<Id, u64>,
    next_generation: u64,
}

impl<Id: Copy + Eq + Hash> OpenQueue<Id> {
    pub fn new() -> Self {
        OpenQueue {
            heap: BinaryHeap::new(),
            generations: FxHashMap::default(),
            next_generation: 0,
        }
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.generations.clear();
        self.next_generation = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.generations.is_empty()
    }

    pub fn contains(&self, id: Id) -> bool {
        self.generations.contains_key(&id)
    }

    fn push(&mut self, id: Id, key: Key) {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.generations.insert(id, generation);
        self.heap.push(Entry { key, id, generation });
    }

    /// Adds `id` with key `key`. Precondition: `id` is not already present.
    pub fn insert(&mut self, id: Id, key: Key) {
        debug_assert!(!self.contains(id), "insert of already-queued cell");
        self.push(id, key);
    }

    /// Removes the unique entry for `id`. Precondition: `id` is present.
    pub fn remove(&mut self, id: Id) {
        debug_assert!(self.contains(id), "remove of cell not in queue");
        self.generations.remove(&id);
    }

    /// Replaces the key of `id`. Behaves as [`Self::insert`] if absent.
    pub fn update(&mut self, id: Id, key: Key) {
        self.push(id, key);
    }

    /// The `(key, id)` pair with the smallest key, without removing it.
    /// Lazily discards stale entries left behind by `update`/`remove`.
    pub fn peek(&mut self) -> Option<(Key, Id)> {
        loop {
            let top_generation = match self.heap.peek() {
                Some(entry) => entry.generation,
                None => return None,
            };
            // Borrow-split: read the id before deciding whether to pop.
            let top_id = self.heap.peek().unwrap().id;
            if self.generations.get(&top_id) == Some(&top_generation) {
                return Some((self.heap.peek().unwrap().key, top_id));
            }
            self.heap.pop();
        }
    }
}

impl<Id: Copy + Eq + Hash> Default for OpenQueue<Id> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peek_returns_smallest_key_first() {
        let mut q: OpenQueue<u32> = OpenQueue::new();
        q.insert(1, Key::new(5.0, 0.0));
        q.insert(2, Key::new(1.0, 0.0));
        q.insert(3, Key::new(3.0, 0.0));
        assert_eq!(q.peek(), Some((Key::new(1.0, 0.0), 2)));
    }

    #[test]
    fn update_replaces_key_and_reorders() {
        let mut q: OpenQueue<u32> = OpenQueue::new();
        q.insert(1, Key::new(5.0, 0.0));
        q.insert(2, Key::new(1.0, 0.0));
        q.update(1, Key::new(0.0, 0.0));
        assert_eq!(q.peek(), Some((Key::new(0.0, 0.0), 1)));
        assert!(q.contains(1));
        assert!(q.contains(2));
    }

    #[test]
    fn remove_drops_the_entry() {
        let mut q: OpenQueue<u32> = OpenQueue::new();
        q.insert(1, Key::new(1.0, 0.0));
        q.insert(2, Key::new(2.0, 0.0));
        q.remove(1);
        assert!(!q.contains(1));
        assert_eq!(q.peek(), Some((Key::new(2.0, 0.0), 2)));
    }

    #[test]
    fn update_of_absent_cell_behaves_as_insert() {
        let mut q: OpenQueue<u32> = OpenQueue::new();
        q.update(1, Key::new(1.0, 0.0));
        assert!(q.contains(1));
        assert_eq!(q.peek(), Some((Key::new(1.0, 0.0), 1)));
    }

    #[test]
    fn empty_queue_reports_empty_and_no_peek() {
        let mut q: OpenQueue<u32> = OpenQueue::new();
        assert!(q.is_empty());
        assert_eq!(q.peek(), None);
    }

    #[test]
    fn keys_within_epsilon_are_tied() {
        use crate::num::EPSILON;
        let a = Key::new(1.0, 0.0);
        let b = Key::new(1.0 + EPSILON / 2.0, 0.0);
        assert_eq!(a.cmp(&b), Ordering::Equal);
        assert!(!key_less_than(a, b));
        assert!(!key_less_than(b, a));
    }
}
