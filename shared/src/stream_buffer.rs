use std::{collections::VecDeque, time::Duration};

use log::trace;

/// Bounded FIFO that keeps only the most recent `capacity` items. Pushing
/// into a full buffer evicts the oldest entry
pub struct StreamBuffer<T> {
    capacity: usize,
    items: VecDeque<T>,
    dropped: u64,
}

impl<T> StreamBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity),
            dropped: 0,
        }
    }

    /// Returns the evicted item, if the buffer was full
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() == self.capacity {
            self.dropped += 1;
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total number of items evicted because the buffer was full
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// Consumer side of a streamed value: buffers snapshots as they arrive and
/// releases one per playback interval, trading a fixed latency for smooth
/// cadence. An empty buffer holds the last released snapshot rather than
/// stalling
pub struct StreamPlayback<T> {
    buffer: StreamBuffer<T>,
    interval: Duration,
    accumulator: Duration,
    current: Option<T>,
}

impl<T> StreamPlayback<T> {
    pub fn new(capacity: usize, interval: Duration) -> Self {
        Self {
            buffer: StreamBuffer::new(capacity),
            interval,
            accumulator: Duration::ZERO,
            current: None,
        }
    }

    pub fn receive(&mut self, snapshot: T) {
        if self.buffer.push(snapshot).is_some() {
            trace!("playback buffer full, dropped oldest snapshot");
        }
    }

    /// Advances playback by `elapsed`, releasing at most one snapshot per
    /// whole interval. Returns whether the current snapshot changed
    pub fn advance(&mut self, elapsed: Duration) -> bool {
        self.accumulator += elapsed;
        let mut changed = false;
        while self.accumulator >= self.interval {
            self.accumulator -= self.interval;
            match self.buffer.pop() {
                Some(next) => {
                    self.current = Some(next);
                    changed = true;
                }
                None => {
                    // starved, do not bank the time
                    self.accumulator = Duration::ZERO;
                    break;
                }
            }
        }
        changed
    }

    pub fn current(&self) -> Option<&T> {
        self.current.as_ref()
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn buffer(&self) -> &StreamBuffer<T> {
        &self.buffer
    }
}
