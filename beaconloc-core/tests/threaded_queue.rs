//! Producers on separate threads, one consuming engine
//!
//! Mirrors the deployment shape: scan, orientation and step callbacks fire
//! from their own threads and only the engine's thread mutates state.

mod common;

use std::{
    sync::atomic::{AtomicUsize, Ordering},
    thread,
};

use beaconloc_core::{
    EventQueue, OrientationEvent, Point2D, PositionUpdate, PositioningConfig, PositioningEngine, SensorEvent,
    StepEvent,
};

use common::{registry, SignalGenerator, TRIANGLE_FLOOR};

const SWEEPS: u64 = 200;

fn push_retrying<const N: usize>(queue: &EventQueue<N>, mut event: SensorEvent) {
    loop {
        match queue.try_push(event) {
            Ok(()) => return,
            Err(rejected) => {
                event = rejected;
                thread::yield_now();
            }
        }
    }
}

#[test]
fn concurrent_producers_lose_nothing() {
    let floor = registry(TRIANGLE_FLOOR);
    let queue = EventQueue::<32>::new();
    let finished = AtomicUsize::new(0);
    let truth = Point2D::new(5.0, 5.0);

    let mut engine = PositioningEngine::new(&floor, PositioningConfig::default()).unwrap();
    let mut updates: Vec<PositionUpdate> = Vec::new();
    let mut processed = 0;

    thread::scope(|scope| {
        scope.spawn(|| {
            let mut signal = SignalGenerator::new(&floor, 2.0);
            for sweep in 0..SWEEPS {
                for event in signal.sweep(truth, sweep * 100) {
                    push_retrying(&queue, event);
                }
            }
            finished.fetch_add(1, Ordering::Release);
        });

        scope.spawn(|| {
            for i in 0..SWEEPS {
                push_retrying(&queue, OrientationEvent::new(i as f32, 0.0, 0.0, i * 100).into());
            }
            finished.fetch_add(1, Ordering::Release);
        });

        scope.spawn(|| {
            for i in 0..50u64 {
                push_retrying(&queue, StepEvent::new(i * 400).into());
            }
            finished.fetch_add(1, Ordering::Release);
        });

        let mut sink = |update: &PositionUpdate| updates.push(update.clone());
        loop {
            let done = finished.load(Ordering::Acquire) == 3;
            processed += engine.drain(&queue, &mut sink);
            if done && queue.is_empty() {
                break;
            }
            thread::yield_now();
        }
    });

    let expected = (SWEEPS * 3 + SWEEPS + 50) as usize;
    assert_eq!(processed, expected);

    let stats = queue.stats();
    assert_eq!(stats.pushed.load(Ordering::Relaxed) as usize, expected);
    assert_eq!(stats.popped.load(Ordering::Relaxed) as usize, expected);
    assert_eq!(stats.dropped.load(Ordering::Relaxed), 0);

    assert_eq!(engine.stats().scans as u64, SWEEPS * 3);
    assert!(!updates.is_empty());

    let position = engine.position().unwrap();
    assert!(position.distance_to(&truth) < 0.5, "fix {} too far from {}", position, truth);
}

#[test]
fn overflow_is_counted_not_blocking() {
    let floor = registry(TRIANGLE_FLOOR);
    let queue = EventQueue::<8>::new();

    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let mut signal = SignalGenerator::new(&floor, 2.0);
                for sweep in 0..10u64 {
                    for event in signal.sweep(Point2D::new(5.0, 5.0), sweep * 100) {
                        queue.push(event);
                    }
                }
            });
        }
    });

    let stats = queue.stats();
    let pushed = stats.pushed.load(Ordering::Relaxed);
    let dropped = stats.dropped.load(Ordering::Relaxed);
    assert_eq!(pushed + dropped, 4 * 10 * 3);
    assert_eq!(pushed, 8);
    assert_eq!(queue.drain().count(), 8);
}
