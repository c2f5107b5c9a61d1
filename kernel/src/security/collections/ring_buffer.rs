//! Ring Buffer
//!
//! Fixed-capacity buffer that overwrites its oldest entry when full.
//! Used for the audit trail, where losing old records beats blocking.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

pub struct RingBuffer<T> {
    buffer: VecDeque<T>,
    capacity: usize,
    /// Entries overwritten since creation
    dropped: u64,
}

impl<T: Clone> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    /// Push, evicting the oldest entry when full
    pub fn push(&mut self, item: T) {
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
            self.dropped += 1;
        }
        self.buffer.push_back(item);
    }

    /// Last `count` entries, oldest first
    pub fn recent(&self, count: usize) -> Vec<T> {
        let skip = self.buffer.len().saturating_sub(count);
        self.buffer.iter().skip(skip).cloned().collect()
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.buffer.iter().cloned().collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overwrites_oldest() {
        let mut ring = RingBuffer::new(3);
        for i in 0..5u32 {
            ring.push(i);
        }
        assert_eq!(ring.snapshot(), alloc::vec![2, 3, 4]);
        assert_eq!(ring.dropped(), 2);
        assert_eq!(ring.recent(2), alloc::vec![3, 4]);
        assert_eq!(ring.len(), 3);
    }
}
