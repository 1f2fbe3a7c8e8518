//! Multi-Producer Event Queue Feeding the Engine
//!
//! ## Overview
//!
//! Scan, orientation and step callbacks may arrive on different threads or
//! interrupt contexts. Rather than locking the engine's state, every
//! callback pushes its event into one bounded lock-free queue and a single
//! consumer, the engine, drains it:
//!
//! ```text
//! BLE callback ────────┐
//! Orientation sensor ──┼─→ EventQueue ─→ PositioningEngine::drain
//! Step detector ───────┘
//! ```
//!
//! Storage is `heapless::mpmc::MpMcQueue`, so pushes and pops never block
//! and never allocate. A full queue drops the new event and counts it.
//!
//! ## Capacity
//!
//! `N` must be a power of two no larger than 128. Scans arrive at roughly
//! 10 Hz per beacon; [`EVENT_QUEUE_CAPACITY`] covers a few hundred
//! milliseconds of backlog from a full registry.
//!
//! ## Example Usage
//!
//! ```rust
//! use beaconloc_core::queue::EventQueue;
//! use beaconloc_core::{ScanEvent, SensorEvent};
//!
//! static QUEUE: EventQueue<64> = EventQueue::new();
//!
//! // Producer (scan callback)
//! let scan = ScanEvent::new("AA:00:00:00:00:01", -70, 1_000).unwrap();
//! if !QUEUE.push(SensorEvent::Scan(scan)) {
//!     // Consumer fell behind
//! }
//!
//! // Consumer
//! while let Some(event) = QUEUE.pop() {
//!     assert_eq!(event.kind(), "scan");
//! }
//! ```
//!
//! [`EVENT_QUEUE_CAPACITY`]: crate::constants::buffers::EVENT_QUEUE_CAPACITY

use core::sync::atomic::{AtomicU32, Ordering};

use heapless::mpmc::MpMcQueue;

use crate::{
    errors::{PositioningError, PositioningResult},
    events::SensorEvent,
};

/// Queue health counters
///
/// Updated with relaxed atomics; they never gate correctness.
#[derive(Debug)]
pub struct QueueStats {
    /// Total events pushed
    pub pushed: AtomicU32,
    /// Total events popped
    pub popped: AtomicU32,
    /// Events dropped due to full queue
    pub dropped: AtomicU32,
    /// Maximum queue depth seen
    pub max_depth: AtomicU32,
}

impl QueueStats {
    const fn new() -> Self {
        Self {
            pushed: AtomicU32::new(0),
            popped: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
            max_depth: AtomicU32::new(0),
        }
    }

    /// Events currently queued, as far as the counters know
    pub fn depth(&self) -> u32 {
        let pushed = self.pushed.load(Ordering::Relaxed);
        pushed.saturating_sub(self.popped.load(Ordering::Relaxed))
    }

    fn update_max_depth(&self) {
        self.max_depth.fetch_max(self.depth(), Ordering::Relaxed);
    }
}

/// Bounded lock-free queue of sensor events
pub struct EventQueue<const N: usize> {
    inner: MpMcQueue<SensorEvent, N>,
    stats: QueueStats,
}

impl<const N: usize> EventQueue<N> {
    /// Create new empty queue, usable in a `static`
    pub const fn new() -> Self {
        Self {
            inner: MpMcQueue::new(),
            stats: QueueStats::new(),
        }
    }

    /// Hand the event back if the queue is full, without counting a drop
    ///
    /// For producers that retry.
    pub fn try_push(&self, event: SensorEvent) -> Result<(), SensorEvent> {
        self.inner.enqueue(event)?;
        self.stats.pushed.fetch_add(1, Ordering::Relaxed);
        self.stats.update_max_depth();
        Ok(())
    }

    /// Push from any context
    ///
    /// Returns false and counts a drop if the queue is full.
    pub fn push(&self, event: SensorEvent) -> bool {
        match self.try_push(event) {
            Ok(()) => true,
            Err(event) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                log_warn!("Event queue full, dropped {} event", event.kind());
                false
            }
        }
    }

    /// Push, reporting a full queue as `QueueFull`
    pub fn send(&self, event: SensorEvent) -> PositioningResult<()> {
        if self.push(event) {
            Ok(())
        } else {
            Err(PositioningError::QueueFull)
        }
    }

    /// Oldest queued event
    pub fn pop(&self) -> Option<SensorEvent> {
        let event = self.inner.dequeue()?;
        self.stats.popped.fetch_add(1, Ordering::Relaxed);
        Some(event)
    }

    /// Drain all events from queue
    pub fn drain(&self) -> QueueDrain<'_, N> {
        QueueDrain { queue: self }
    }

    /// Approximate number of queued events
    pub fn len(&self) -> usize {
        self.stats.depth() as usize
    }

    /// Check if queue is empty (approximate under concurrent pushes)
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Storage capacity
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Get queue statistics
    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }
}

impl<const N: usize> Default for EventQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator popping until the queue is empty
pub struct QueueDrain<'a, const N: usize> {
    queue: &'a EventQueue<N>,
}

impl<'a, const N: usize> Iterator for QueueDrain<'a, N> {
    type Item = SensorEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.queue.pop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ScanEvent, StepEvent};

    fn scan(ts: u64) -> SensorEvent {
        SensorEvent::Scan(ScanEvent::new("AA:00:00:00:00:01", -70, ts).unwrap())
    }

    #[test]
    fn queue_basic() {
        let queue = EventQueue::<16>::new();

        assert!(queue.push(scan(1)));
        assert!(queue.push(SensorEvent::Step(StepEvent::new(2))));
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.pop().map(|e| e.timestamp()), Some(1));
        assert_eq!(queue.pop().map(|e| e.timestamp()), Some(2));
        assert!(queue.pop().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn queue_full_drops_and_counts() {
        let queue = EventQueue::<4>::new();

        let mut accepted = 0;
        for ts in 0..10 {
            if queue.push(scan(ts)) {
                accepted += 1;
            }
        }

        assert_eq!(accepted, 4);
        assert_eq!(queue.stats().dropped.load(Ordering::Relaxed), 6);
        assert_eq!(queue.stats().max_depth.load(Ordering::Relaxed), 4);
        assert_eq!(queue.send(scan(11)), Err(PositioningError::QueueFull));

        // try_push returns the event without counting a drop
        let rejected = queue.try_push(scan(12)).unwrap_err();
        assert_eq!(rejected.timestamp(), 12);
        assert_eq!(queue.stats().dropped.load(Ordering::Relaxed), 7);
    }

    #[test]
    fn drain_preserves_order() {
        let queue = EventQueue::<8>::new();
        for ts in 0..5 {
            queue.push(scan(ts));
        }

        let order: Vec<u64> = queue.drain().map(|e| e.timestamp()).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
        assert_eq!(queue.stats().popped.load(Ordering::Relaxed), 5);
    }
}
