//! A capacity-bounded log that drops its oldest entries on overflow.

use std::collections::VecDeque;

// ============================================================================
// BoundedLog
// ============================================================================

/// Ordered collection (oldest first) holding at most `capacity` elements.
///
/// Pushing into a full log evicts the oldest element. Used for terminal
/// history, the recall command log and per-file revision history.
#[derive(Clone, PartialEq)]
pub struct BoundedLog<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedLog<T> {
    /// Creates an empty log.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "BoundedLog capacity must be greater than 0");
        Self {
            items: VecDeque::with_capacity(capacity.min(64)),
            capacity,
        }
    }

    /// Builds a log from existing items, keeping only the newest `capacity`.
    pub fn from_vec(items: Vec<T>, capacity: usize) -> Self {
        let mut log = Self::new(capacity);
        log.extend(items);
        log
    }

    /// Appends an element, evicting the oldest one when full.
    pub fn push(&mut self, item: T) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn extend(&mut self, iter: impl IntoIterator<Item = T>) {
        for item in iter {
            self.push(item);
        }
    }

    /// Element at a logical index (0 is the oldest).
    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    #[inline]
    pub fn last(&self) -> Option<&T> {
        self.items.back()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Iterates oldest to newest.
    pub fn iter(&self) -> std::collections::vec_deque::Iter<'_, T> {
        self.items.iter()
    }

    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.items.iter().cloned().collect()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for BoundedLog<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedLog")
            .field("len", &self.items.len())
            .field("capacity", &self.capacity)
            .field("items", &self.items)
            .finish()
    }
}

impl<'a, T> IntoIterator for &'a BoundedLog<T> {
    type Item = &'a T;
    type IntoIter = std::collections::vec_deque::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "capacity must be greater than 0")]
    fn test_zero_capacity_panics() {
        let _: BoundedLog<u8> = BoundedLog::new(0);
    }

    #[test]
    fn test_push_within_capacity() {
        let mut log = BoundedLog::new(3);
        log.push(1);
        log.push(2);
        assert_eq!(log.len(), 2);
        assert_eq!(log.get(0), Some(&1));
        assert_eq!(log.last(), Some(&2));
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let mut log = BoundedLog::new(3);
        log.extend([1, 2, 3, 4, 5]);
        assert_eq!(log.to_vec(), vec![3, 4, 5]);
        assert_eq!(log.capacity(), 3);
    }

    #[test]
    fn test_from_vec_keeps_newest() {
        let log = BoundedLog::from_vec((0..60).collect(), 50);
        assert_eq!(log.len(), 50);
        assert_eq!(log.get(0), Some(&10));
        assert_eq!(log.last(), Some(&59));
    }

    #[test]
    fn test_clear_and_iterate() {
        let mut log = BoundedLog::new(2);
        log.extend(["a", "b", "c"]);
        let collected: Vec<_> = log.iter().rev().collect();
        assert_eq!(collected, vec![&"c", &"b"]);
        log.clear();
        assert!(log.is_empty());
    }
}
