use std::collections::VecDeque;
use std::fmt;

/// Bounded newest-first window. Pushing into a full ring evicts the oldest
/// element; histories can also be aged explicitly from the old end.
pub(crate) struct Ring<T> {
    deque: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> Clone for Ring<T> {
    fn clone(&self) -> Self {
        Self {
            deque: self.deque.clone(),
            capacity: self.capacity,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Ring<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.deque.fmt(f)
    }
}

impl<T> Ring<T> {
    #[inline]
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            deque: VecDeque::with_capacity(cap),
            capacity: cap,
        }
    }

    /// Prepend an element, returning the evicted oldest one when full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.deque.len() == self.capacity {
            self.deque.pop_back()
        } else {
            None
        };

        self.deque.push_front(item);

        evicted
    }

    #[inline]
    pub fn drop_oldest(&mut self) -> Option<T> {
        self.deque.pop_back()
    }

    #[inline]
    pub fn newest(&self) -> Option<&T> {
        self.deque.front()
    }

    #[inline]
    pub fn newest_mut(&mut self) -> Option<&mut T> {
        self.deque.front_mut()
    }

    /// Element at `idx` steps back from the newest one.
    #[inline]
    pub fn get(&self, idx: usize) -> Option<&T> {
        self.deque.get(idx)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.deque.is_empty()
    }

    /// Newest-first iteration.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &'_ T> {
        self.deque.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_evicts_oldest_when_full() {
        let mut ring = Ring::with_capacity(3);

        assert_eq!(ring.push(1), None);
        assert_eq!(ring.push(2), None);
        assert_eq!(ring.push(3), None);
        assert_eq!(ring.push(4), Some(1));

        assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![4, 3, 2]);
        assert_eq!(ring.newest(), Some(&4));
    }

    #[test]
    fn drop_oldest_ages_the_window() {
        let mut ring = Ring::with_capacity(3);
        ring.push(1);
        ring.push(2);

        assert_eq!(ring.drop_oldest(), Some(1));
        assert_eq!(ring.drop_oldest(), Some(2));
        assert!(ring.is_empty());
        assert_eq!(ring.drop_oldest(), None);
    }

    #[test]
    fn get_counts_back_from_newest() {
        let mut ring = Ring::with_capacity(4);
        ring.push(10);
        ring.push(20);

        assert_eq!(ring.get(0), Some(&20));
        assert_eq!(ring.get(1), Some(&10));
        assert_eq!(ring.get(2), None);
    }
}
