//! Simulated Walk Through a Four-Beacon Room
//!
//! Walks a receiver around a 20 m square room with a beacon in each corner
//! and prints the engine's fixes next to the true position.
//!
//! ## What You'll See
//!
//! - Fixes appear once three beacons have been heard
//! - The Kalman filters lag the receiver slightly while it moves
//! - Step integration carries the position between fixes
//!
//! ## Running the Example
//!
//! ```bash
//! cargo run --example simulated_walk
//! ```

use beaconloc_core::{
    BeaconRegistry, DeadReckoningMode, EventQueue, OrientationEvent, Point2D, PositionUpdate, PositioningConfig,
    PositioningEngine, RangeClamp, ScanEvent, SensorEvent, StepEvent, UpdateTrigger,
};
use beaconloc_core::time::{ManualClock, TimeSource};

const ROOM: &str = "\
# address,uuid,major,minor,power,x,y,color
AA:00:00:00:00:11,fda50693-a4e2-4fb1-afcf-c6eb07647825,2,1,-62,0.0,0.0,red
AA:00:00:00:00:12,fda50693-a4e2-4fb1-afcf-c6eb07647825,2,2,-62,20.0,0.0,green
AA:00:00:00:00:13,fda50693-a4e2-4fb1-afcf-c6eb07647825,2,3,-62,20.0,20.0,blue
AA:00:00:00:00:14,fda50693-a4e2-4fb1-afcf-c6eb07647825,2,4,-62,0.0,20.0,yellow
";

const EXPONENT: f32 = 2.0;
const STEP_LENGTH: f32 = 0.7;

fn rssi_at(reference: f32, distance: f32) -> i16 {
    (reference - 10.0 * EXPONENT * distance.max(0.1).log10()).round() as i16
}

fn main() {
    println!("BLE Beacon Positioning: Simulated Walk");
    println!("======================================\n");

    let registry = BeaconRegistry::parse(ROOM).expect("room metadata");
    for record in registry.iter() {
        println!("  {} at {} ({} dBm @ 1 m)", record.id, record.location, record.reference_power);
    }
    println!();

    let config = PositioningConfig::default()
        .with_dead_reckoning(DeadReckoningMode::StepIntegration { step_length: STEP_LENGTH })
        .with_range_clamp(RangeClamp::square(20.0));
    let mut engine = PositioningEngine::new(&registry, config).expect("valid config");
    let queue = EventQueue::<64>::new();

    // Walk east along y = 5, then north along x = 15
    let mut truth = Point2D::new(3.0, 5.0);
    let mut heading = 0.0f32;
    let clock = ManualClock::new(0);

    let mut print = |update: &PositionUpdate| {
        let label = match update.trigger {
            UpdateTrigger::Fix(method) => method.as_str(),
            UpdateTrigger::Step => "step",
        };
        println!("  t={:>6} ms  {:<13} fix {}", update.timestamp, label, update.position);
    };

    for step in 0..36 {
        if truth.x >= 15.0 && heading == 0.0 {
            heading = 90.0;
            println!("\n-- turning north --\n");
        }

        // Ten advertisements per beacon between steps
        for _ in 0..10 {
            for record in registry.iter() {
                let rssi = rssi_at(record.reference_power, record.location.distance_to(&truth));
                let scan = ScanEvent::new(record.address.as_str(), rssi, clock.advance(10)).expect("valid scan");
                queue.push(SensorEvent::Scan(scan));
            }
            engine.drain(&queue, &mut |_: &PositionUpdate| {});
        }

        queue.push(OrientationEvent::new(heading, 0.0, 0.0, clock.now()).into());
        queue.push(StepEvent::new(clock.advance(1)).into());
        engine.drain(&queue, &mut print);

        truth = truth.advanced(heading, STEP_LENGTH);
        if step % 6 == 5 {
            if let Some(position) = engine.position() {
                println!("  truth {}  error {:.2} m", truth, position.distance_to(&truth));
            }
        }
    }

    let stats = engine.stats();
    println!("\nScans: {}  Fixes: {}  Steps: {}", stats.scans, stats.fixes, stats.steps);
    println!("Queue drops: {}", queue.stats().dropped.load(std::sync::atomic::Ordering::Relaxed));
}
