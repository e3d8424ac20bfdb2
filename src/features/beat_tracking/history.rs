//! Fixed-capacity per-hop history
//!
//! Backs the onset detection function history and the cumulative score. The
//! buffer is always full: it starts out filled with initial values and every
//! push drops the oldest entry.

use ringbuffer::{AllocRingBuffer, RingBuffer};

/// Rolling window of per-hop values, index 0 is the oldest
#[derive(Debug, Clone)]
pub struct HopHistory {
    buffer: AllocRingBuffer<f64>,
}

impl HopHistory {
    /// History of `capacity` zeros
    pub fn new(capacity: usize) -> Self {
        Self::from_fn(capacity, |_| 0.0)
    }

    /// History whose entry `i` (oldest first) is `init(i)`
    pub fn from_fn(capacity: usize, init: impl Fn(usize) -> f64) -> Self {
        let mut buffer = AllocRingBuffer::new(capacity.max(1));
        for i in 0..buffer.capacity() {
            buffer.push(init(i));
        }
        Self { buffer }
    }

    /// Number of entries, always the capacity
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Always false, the history is prefilled
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Append a value, dropping the oldest
    pub fn push(&mut self, value: f64) {
        self.buffer.push(value);
    }

    /// Entry `index`, counted from the oldest
    #[inline]
    pub fn get(&self, index: usize) -> f64 {
        self.buffer[index]
    }

    /// Most recent entry
    pub fn latest(&self) -> f64 {
        self.buffer.back().copied().unwrap_or(0.0)
    }

    /// Replace every entry, `init(i)` giving entry `i` oldest first
    pub fn refill(&mut self, init: impl Fn(usize) -> f64) {
        for i in 0..self.buffer.capacity() {
            self.buffer.push(init(i));
        }
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &f64> + '_ {
        self.buffer.iter()
    }

    /// Copy the entries into a vector, oldest first
    pub fn to_vec(&self) -> Vec<f64> {
        self.buffer.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefilled() {
        let history = HopHistory::new(8);
        assert_eq!(history.len(), 8);
        assert!(history.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_push_drops_oldest() {
        let mut history = HopHistory::from_fn(4, |i| i as f64);
        history.push(10.0);
        assert_eq!(history.to_vec(), vec![1.0, 2.0, 3.0, 10.0]);
        assert_eq!(history.get(0), 1.0);
        assert_eq!(history.latest(), 10.0);
    }

    #[test]
    fn test_refill() {
        let mut history = HopHistory::new(3);
        history.push(5.0);
        history.refill(|i| (i * 2) as f64);
        assert_eq!(history.to_vec(), vec![0.0, 2.0, 4.0]);
    }
}
