//! Fixed-Size Circular Buffer for Per-Beacon Sample History
//!
//! ## Overview
//!
//! Each beacon keeps its last few RSSI samples in a ring buffer whose
//! storage is sized at compile time (`N`) while the active window length is
//! chosen at runtime (`capacity <= N`). Pushing into a full window evicts
//! the oldest sample, so the window always holds the most recent
//! `capacity` samples in arrival order.
//!
//! ```text
//! CircularBuffer<T, 5>, capacity 3, after pushing a b c d:
//! ┌─────┬─────┬─────┬─────┬─────┐
//! │  d  │  b  │  c  │  -  │  -  │  ← physical slots
//! └─────┴─────┴─────┴─────┴─────┘
//!          ↑
//!          oldest (write_pos = 1)
//! logical order: b c d
//! ```
//!
//! All operations are O(1) except iteration; nothing allocates.
//!
//! ## Usage Example
//!
//! ```rust
//! use beaconloc_core::buffer::CircularBuffer;
//!
//! let mut window: CircularBuffer<i16, 8> = CircularBuffer::with_capacity(3);
//! for rssi in [-70, -71, -69, -72] {
//!     window.push(rssi);
//! }
//!
//! let samples: Vec<i16> = window.iter().copied().collect();
//! assert_eq!(samples, vec![-71, -69, -72]);
//! assert_eq!(window.newest(), Some(&-72));
//! ```

/// Ring buffer with compile-time storage and a runtime window length
///
/// ## Internal Invariants
///
/// - `1 <= capacity <= N`
/// - `write_pos < capacity`
/// - `len <= capacity`
///
/// Not thread-safe; the engine owns every buffer from a single context.
#[derive(Clone, Debug)]
pub struct CircularBuffer<T: Copy, const N: usize> {
    /// Storage, `None` until a slot is first written
    data: [Option<T>; N],

    /// Index where the next write will occur
    write_pos: usize,

    /// Current number of valid items
    len: usize,

    /// Active window length
    capacity: usize,
}

impl<T: Copy, const N: usize> CircularBuffer<T, N> {
    /// Empty buffer using the full storage as its window
    pub const fn new() -> Self {
        Self {
            data: [None; N],
            write_pos: 0,
            len: 0,
            capacity: N,
        }
    }

    /// Empty buffer with a window of `capacity` items, clamped into `1..=N`
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.clamp(1, N),
            ..Self::new()
        }
    }

    /// Append an item, evicting the oldest when the window is full
    pub fn push(&mut self, item: T) {
        self.data[self.write_pos] = Some(item);
        self.write_pos = (self.write_pos + 1) % self.capacity;

        if self.len < self.capacity {
            self.len += 1;
        }
    }

    /// Number of stored items
    pub fn len(&self) -> usize {
        self.len
    }

    /// Active window length
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check if the window is full
    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    /// Most recently pushed item
    pub fn newest(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        self.get(self.len - 1)
    }

    /// Iterate oldest to newest; `.rev()` walks newest first
    pub fn iter(&self) -> CircularBufferIter<'_, T, N> {
        CircularBufferIter {
            buffer: self,
            front: 0,
            back: self.len,
        }
    }

    /// Drop all items, keeping the window length
    pub fn clear(&mut self) {
        self.write_pos = 0;
        self.len = 0;
    }

    /// Item by logical index (0 = oldest)
    ///
    /// Until the window fills, logical and physical indices match. Once full,
    /// the oldest item sits at `write_pos`.
    fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }

        let physical = if self.len < self.capacity {
            index
        } else {
            (self.write_pos + index) % self.capacity
        };

        self.data[physical].as_ref()
    }
}

impl<T: Copy, const N: usize> Default for CircularBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over buffer contents in arrival order
pub struct CircularBufferIter<'a, T: Copy, const N: usize> {
    buffer: &'a CircularBuffer<T, N>,
    front: usize,
    back: usize,
}

impl<'a, T: Copy, const N: usize> Iterator for CircularBufferIter<'a, T, N> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let item = self.buffer.get(self.front)?;
        self.front += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl<'a, T: Copy, const N: usize> DoubleEndedIterator for CircularBufferIter<'a, T, N> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        self.buffer.get(self.back)
    }
}

impl<'a, T: Copy, const N: usize> ExactSizeIterator for CircularBufferIter<'a, T, N> {}
