//! Shared fixtures for the integration tests
//!
//! - A three-beacon floor and a four-beacon floor with known geometry
//! - A signal generator that inverts the path-loss model, with optional noise
//! - A deterministic RNG so noisy runs are reproducible

#![allow(dead_code)]

use beaconloc_core::{
    constants::signal::CALIBRATED_RSSI_AT_ONE_METER_DBM, BeaconRegistry, Point2D, ScanEvent, SensorEvent,
};

/// Reference power of every fixture beacon (dBm at 1 m)
pub const REFERENCE_POWER: f32 = CALIBRATED_RSSI_AT_ONE_METER_DBM;

/// Triangle floor: beacons at (0,0), (10,0), (5,10)
pub const TRIANGLE_FLOOR: &str = "\
# address,uuid,major,minor,power,x,y,color
AA:00:00:00:00:01,fda50693-a4e2-4fb1-afcf-c6eb07647825,1,1,-62,0.0,0.0,#FF0000
AA:00:00:00:00:02,fda50693-a4e2-4fb1-afcf-c6eb07647825,1,2,-62,10.0,0.0,#00FF00
AA:00:00:00:00:03,fda50693-a4e2-4fb1-afcf-c6eb07647825,1,3,-62,5.0,10.0,#0000FF
";

/// Square floor: beacons at the corners of a 20 m room
pub const SQUARE_FLOOR: &str = "\
AA:00:00:00:00:11,fda50693-a4e2-4fb1-afcf-c6eb07647825,2,1,-62,0.0,0.0,red
AA:00:00:00:00:12,fda50693-a4e2-4fb1-afcf-c6eb07647825,2,2,-62,20.0,0.0,green
AA:00:00:00:00:13,fda50693-a4e2-4fb1-afcf-c6eb07647825,2,3,-62,20.0,20.0,blue
AA:00:00:00:00:14,fda50693-a4e2-4fb1-afcf-c6eb07647825,2,4,-62,0.0,20.0,yellow
";

/// Parse a fixture floor
pub fn registry(floor: &str) -> BeaconRegistry {
    BeaconRegistry::parse(floor).expect("fixture metadata parses")
}

/// RSSI a receiver at `distance` meters would report, rounded to whole dBm
pub fn rssi_at(distance: f32, exponent: f32) -> i16 {
    let rssi = REFERENCE_POWER - 10.0 * exponent * distance.max(0.01).log10();
    rssi.round() as i16
}

/// Deterministic random number generator for tests
pub struct TestRng {
    state: u32,
}

impl TestRng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed.max(1) }
    }

    pub fn next_u32(&mut self) -> u32 {
        // Xorshift
        self.state ^= self.state << 13;
        self.state ^= self.state >> 17;
        self.state ^= self.state << 5;
        self.state
    }

    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / 16_777_216.0
    }

    pub fn gen_range(&mut self, min: f32, max: f32) -> f32 {
        min + self.next_f32() * (max - min)
    }
}

/// Produces scan events for a receiver walking the floor
pub struct SignalGenerator<'a> {
    registry: &'a BeaconRegistry,
    exponent: f32,
    noise_db: f32,
    rng: TestRng,
}

impl<'a> SignalGenerator<'a> {
    pub fn new(registry: &'a BeaconRegistry, exponent: f32) -> Self {
        Self {
            registry,
            exponent,
            noise_db: 0.0,
            rng: TestRng::new(42),
        }
    }

    /// Add uniform noise of ±`noise_db` to every sample
    pub fn with_noise(mut self, noise_db: f32, seed: u32) -> Self {
        self.noise_db = noise_db;
        self.rng = TestRng::new(seed);
        self
    }

    /// One scan from every beacon, 1 ms apart starting at `timestamp`
    pub fn sweep(&mut self, receiver: Point2D, timestamp: u64) -> Vec<SensorEvent> {
        let mut beacons: Vec<_> = self.registry.iter().collect();
        beacons.sort_by(|a, b| a.address.as_str().cmp(b.address.as_str()));

        beacons
            .into_iter()
            .enumerate()
            .map(|(i, record)| {
                let distance = record.location.distance_to(&receiver);
                let noise = if self.noise_db > 0.0 {
                    self.rng.gen_range(-self.noise_db, self.noise_db).round() as i16
                } else {
                    0
                };
                let rssi = rssi_at(distance, self.exponent) + noise;
                let scan = ScanEvent::new(record.address.as_str(), rssi, timestamp + i as u64)
                    .expect("generated scan is valid");
                SensorEvent::Scan(scan)
            })
            .collect()
    }
}

#[macro_export]
macro_rules! assert_within_tolerance {
    ($actual:expr, $expected:expr, $tolerance:expr) => {
        let diff = ($actual - $expected).abs();
        if diff > $tolerance {
            panic!(
                "Value {} not within tolerance {} of expected {} (diff: {})",
                $actual, $tolerance, $expected, diff
            );
        }
    };
}
