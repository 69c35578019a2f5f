//! FIFO queue shared between concurrent callers.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Cloneable handle to a mutex-guarded deque.
///
/// Clones share the same queue. Each operation takes the lock for its own
/// duration only, so callers never hold it across a batch.
pub struct FifoQueue<T> {
    inner: Arc<Mutex<VecDeque<T>>>,
}

impl<T> FifoQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub fn push(&self, item: T) {
        self.lock().push_back(item);
    }

    /// Remove the oldest item.
    pub fn pop(&self) -> Option<T> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Clone for FifoQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for FifoQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<Vec<T>> for FifoQueue<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(VecDeque::from(items))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let queue = FifoQueue::from(vec![1, 2]);
        queue.push(3);

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.pop(), Some(3));
        assert_eq!(queue.pop(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_clones_share_state() {
        let queue = FifoQueue::new();
        let other = queue.clone();

        queue.push("a");
        assert_eq!(other.len(), 1);
        assert_eq!(other.pop(), Some("a"));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_concurrent_push_pop() {
        let queue = FifoQueue::new();

        let producers: Vec<_> = (0..4)
            .map(|t| {
                let q = queue.clone();
                std::thread::spawn(move || {
                    for i in 0..500 {
                        q.push(t * 1000 + i);
                    }
                })
            })
            .collect();
        for handle in producers {
            handle.join().unwrap();
        }
        assert_eq!(queue.len(), 2000);

        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let q = queue.clone();
                std::thread::spawn(move || {
                    let mut taken = 0;
                    while q.pop().is_some() {
                        taken += 1;
                    }
                    taken
                })
            })
            .collect();
        let taken: usize = consumers.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(taken, 2000);
        assert!(queue.is_empty());
    }
}
