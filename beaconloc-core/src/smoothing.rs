//! Per-beacon RSSI smoothing
//!
//! Each beacon gets a bounded window of its most recent raw samples,
//! created on first sighting. `observe` appends a sample and returns the
//! smoothed RSSI for that beacon.
//!
//! ## Policies
//!
//! ```text
//! SimpleMean:        Σ rssiᵢ / n
//! ExponentialDecay:  Σ wᵢ·rssiᵢ / Σ wᵢ,   w_newest = 1, w_older = w_newer · decay
//! ```
//!
//! Both are convex combinations of the window, so the result always lies
//! between the smallest and largest sample held.

use heapless::FnvIndexMap;

use crate::{
    buffer::CircularBuffer,
    constants::{
        buffers::{MAX_BEACONS, MAX_WINDOW_SIZE},
        signal::{DEFAULT_WINDOW_SIZE, EXPONENTIAL_DECAY_FACTOR},
    },
    errors::{PositioningError, PositioningResult},
    registry::BeaconId,
    time::Timestamp,
};

/// How the window collapses into one value
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SmoothingPolicy {
    /// Unweighted mean of the window
    SimpleMean,
    /// Newest sample weighted 1, each older one `decay` times the next
    ExponentialDecay {
        /// Weight multiplier per step of age, in (0, 1]
        decay: f32,
    },
}

impl Default for SmoothingPolicy {
    fn default() -> Self {
        Self::ExponentialDecay {
            decay: EXPONENTIAL_DECAY_FACTOR,
        }
    }
}

impl SmoothingPolicy {
    /// Check the decay factor is usable
    pub fn is_valid(&self) -> bool {
        match *self {
            Self::SimpleMean => true,
            Self::ExponentialDecay { decay } => decay.is_finite() && decay > 0.0 && decay <= 1.0,
        }
    }

    fn apply<const N: usize>(&self, window: &CircularBuffer<RssiSample, N>) -> Option<f32> {
        if window.is_empty() {
            return None;
        }

        match *self {
            Self::SimpleMean => {
                let sum: f32 = window.iter().map(|s| s.rssi as f32).sum();
                Some(sum / window.len() as f32)
            }
            Self::ExponentialDecay { decay } => {
                let mut weight = 1.0f32;
                let mut weighted_sum = 0.0f32;
                let mut weight_sum = 0.0f32;

                for sample in window.iter().rev() {
                    weighted_sum += weight * sample.rssi as f32;
                    weight_sum += weight;
                    weight *= decay;
                }

                Some(weighted_sum / weight_sum)
            }
        }
    }
}

/// One raw reading held in a smoothing window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RssiSample {
    /// Raw RSSI (dBm)
    pub rssi: i16,
    /// When the advertisement was received
    pub timestamp: Timestamp,
}

/// Bounded-history smoother keyed by beacon
#[derive(Debug, Clone)]
pub struct SignalSmoother {
    window_size: usize,
    policy: SmoothingPolicy,
    windows: FnvIndexMap<BeaconId, CircularBuffer<RssiSample, MAX_WINDOW_SIZE>, MAX_BEACONS>,
}

impl Default for SignalSmoother {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            policy: SmoothingPolicy::default(),
            windows: FnvIndexMap::new(),
        }
    }
}

impl SignalSmoother {
    /// Smoother keeping `window_size` samples per beacon
    pub fn new(window_size: usize, policy: SmoothingPolicy) -> PositioningResult<Self> {
        if window_size == 0 || window_size > MAX_WINDOW_SIZE {
            return Err(PositioningError::InvalidConfig {
                reason: "window size out of range",
            });
        }
        if !policy.is_valid() {
            return Err(PositioningError::InvalidConfig {
                reason: "decay must be in (0, 1]",
            });
        }

        Ok(Self {
            window_size,
            policy,
            windows: FnvIndexMap::new(),
        })
    }

    /// Append a raw sample and return the beacon's smoothed RSSI
    pub fn observe(&mut self, id: &BeaconId, rssi: i16, timestamp: Timestamp) -> PositioningResult<f32> {
        if !self.windows.contains_key(id) {
            let window = CircularBuffer::with_capacity(self.window_size);
            self.windows
                .insert(id.clone(), window)
                .map_err(|_| PositioningError::CapacityExceeded { capacity: MAX_BEACONS })?;
        }

        let window = self
            .windows
            .get_mut(id)
            .ok_or(PositioningError::CapacityExceeded { capacity: MAX_BEACONS })?;
        window.push(RssiSample { rssi, timestamp });

        self.policy.apply(window).ok_or(PositioningError::InvalidMeasurement)
    }

    /// Current smoothed RSSI without adding a sample
    pub fn smoothed(&self, id: &BeaconId) -> Option<f32> {
        self.windows.get(id).and_then(|window| self.policy.apply(window))
    }

    /// Samples currently held for a beacon
    pub fn window_len(&self, id: &BeaconId) -> usize {
        self.windows.get(id).map_or(0, |window| window.len())
    }

    /// Newest sample for a beacon
    pub fn latest(&self, id: &BeaconId) -> Option<RssiSample> {
        self.windows.get(id).and_then(|window| window.newest().copied())
    }

    /// Configured window length
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Number of beacons seen so far
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Check if no beacon has been seen
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> BeaconId {
        BeaconId::new(name).unwrap()
    }

    #[test]
    fn simple_mean_over_window() {
        let mut smoother = SignalSmoother::new(3, SmoothingPolicy::SimpleMean).unwrap();
        let a = id("a");

        assert_eq!(smoother.observe(&a, -60, 0).unwrap(), -60.0);
        assert_eq!(smoother.observe(&a, -70, 1).unwrap(), -65.0);
        assert_eq!(smoother.observe(&a, -80, 2).unwrap(), -70.0);
        // -60 evicted
        assert_eq!(smoother.observe(&a, -90, 3).unwrap(), -80.0);
        assert_eq!(smoother.window_len(&a), 3);
    }

    #[test]
    fn exponential_weights_newest_highest() {
        let mut smoother = SignalSmoother::new(10, SmoothingPolicy::default()).unwrap();
        let a = id("a");

        smoother.observe(&a, -80, 0).unwrap();
        let smoothed = smoother.observe(&a, -60, 1).unwrap();

        // (1.0·-60 + 0.9·-80) / 1.9
        let expected = (-60.0 - 0.9 * 80.0) / 1.9;
        assert!((smoothed - expected).abs() < 1e-4);
        assert!(smoothed > -70.0);
    }

    #[test]
    fn beacons_are_independent() {
        let mut smoother = SignalSmoother::new(5, SmoothingPolicy::SimpleMean).unwrap();
        let (a, b) = (id("a"), id("b"));

        smoother.observe(&a, -50, 0).unwrap();
        smoother.observe(&b, -90, 0).unwrap();

        assert_eq!(smoother.smoothed(&a), Some(-50.0));
        assert_eq!(smoother.smoothed(&b), Some(-90.0));
        assert_eq!(smoother.len(), 2);
        assert_eq!(smoother.latest(&b).map(|s| s.rssi), Some(-90));
        assert!(smoother.smoothed(&id("c")).is_none());
    }

    #[test]
    fn rejects_bad_configuration() {
        assert!(SignalSmoother::new(0, SmoothingPolicy::SimpleMean).is_err());
        assert!(SignalSmoother::new(MAX_WINDOW_SIZE + 1, SmoothingPolicy::SimpleMean).is_err());
        assert!(SignalSmoother::new(10, SmoothingPolicy::ExponentialDecay { decay: 0.0 }).is_err());
        assert!(SignalSmoother::new(10, SmoothingPolicy::ExponentialDecay { decay: 1.5 }).is_err());
    }
}
