//! Per-beacon distance filtering
//!
//! ## Overview
//!
//! Raw path-loss distances jump by meters between consecutive
//! advertisements. [`StateEstimator`] keeps one recursive filter per beacon,
//! created on first use and kept for the life of the engine, and turns the
//! raw stream into a filtered distance per beacon.
//!
//! ```text
//! raw distance ──→ StateEstimator ──→ filtered distance
//!                   │
//!                   ├── beacon A: ScalarKalman     [d]
//!                   ├── beacon B: ScalarKalman     [d]
//!                   └── beacon C: ScalarKalman     [d]
//! ```
//!
//! ## Strategies
//!
//! [`FilterKind`] selects the model for every beacon:
//! - **Scalar**: stationary distance, `K = P / (P + R)`. Starts from zero
//!   or from the first measurement.
//! - **RangeRate**: `[distance, range_rate]` driven by a radial
//!   acceleration control, with a 2-D measurement and full matrix update.
//!
//! Both implement [`DistanceEstimator`], so a new model only needs a new
//! variant.
//!
//! ## Failure Handling
//!
//! Non-finite or negative measurements are rejected before any filter is
//! touched. A singular or non-finite update resets that beacon's filter and
//! reports `SingularMatrix`; the next sample starts it afresh.

pub mod kalman;
pub mod matrix;
pub mod range_rate;
pub mod scalar;

pub use kalman::{KalmanConfig, KalmanFilter};
pub use range_rate::RangeRateKalman;
pub use scalar::ScalarKalman;

use heapless::FnvIndexMap;

use crate::{
    config::FilterConfig,
    constants::buffers::MAX_BEACONS,
    errors::{PositioningError, PositioningResult},
    registry::BeaconId,
};

/// Recursive estimator of one beacon's distance
pub trait DistanceEstimator {
    /// Run one predict and update cycle, returning the filtered distance
    fn predict_and_update(&mut self, measured: f32, control: ControlInput) -> PositioningResult<f32>;

    /// Current filtered distance, `None` before the first update
    fn estimate(&self) -> Option<f32>;

    /// Variance of the distance estimate
    fn variance(&self) -> f32;

    /// Discard all state
    fn reset(&mut self);
}

/// Known motion fed into the prediction step
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControlInput {
    /// Acceleration along the line to the beacon, per timestep squared
    pub radial_acceleration: f32,
}

impl ControlInput {
    /// No known motion
    pub const NONE: Self = Self { radial_acceleration: 0.0 };

    /// Control with a radial acceleration; non-finite values count as none
    pub fn new(radial_acceleration: f32) -> Self {
        if radial_acceleration.is_finite() {
            Self { radial_acceleration }
        } else {
            Self::NONE
        }
    }
}

/// Starting point of a scalar filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Initialization {
    /// `x = 0`, `P = P0`
    #[default]
    Zero,
    /// `x = z`, `P = R` on the first sample
    FirstMeasurement,
}

/// Filter model used for every beacon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FilterKind {
    /// Stationary-distance 1-D filter
    Scalar {
        /// Starting point
        init: Initialization,
    },
    /// Distance plus range rate, 2-D measurement
    RangeRate,
}

impl Default for FilterKind {
    fn default() -> Self {
        Self::Scalar {
            init: Initialization::Zero,
        }
    }
}

/// One beacon's filter
#[derive(Debug, Clone)]
enum FilterInstance {
    Scalar(ScalarKalman),
    RangeRate(RangeRateKalman),
}

impl FilterInstance {
    fn new(config: &FilterConfig) -> Self {
        match config.kind {
            FilterKind::Scalar { init } => Self::Scalar(ScalarKalman::new(config, init)),
            FilterKind::RangeRate => Self::RangeRate(RangeRateKalman::new(config)),
        }
    }
}

impl DistanceEstimator for FilterInstance {
    fn predict_and_update(&mut self, measured: f32, control: ControlInput) -> PositioningResult<f32> {
        match self {
            Self::Scalar(filter) => filter.predict_and_update(measured, control),
            Self::RangeRate(filter) => filter.predict_and_update(measured, control),
        }
    }

    fn estimate(&self) -> Option<f32> {
        match self {
            Self::Scalar(filter) => filter.estimate(),
            Self::RangeRate(filter) => filter.estimate(),
        }
    }

    fn variance(&self) -> f32 {
        match self {
            Self::Scalar(filter) => filter.variance(),
            Self::RangeRate(filter) => filter.variance(),
        }
    }

    fn reset(&mut self) {
        match self {
            Self::Scalar(filter) => filter.reset(),
            Self::RangeRate(filter) => filter.reset(),
        }
    }
}

/// Filters keyed by beacon, created lazily
#[derive(Debug, Clone)]
pub struct StateEstimator {
    config: FilterConfig,
    filters: FnvIndexMap<BeaconId, FilterInstance, MAX_BEACONS>,
    resets: u32,
}

impl StateEstimator {
    /// Estimator applying `config` to every beacon
    pub fn new(config: FilterConfig) -> PositioningResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            filters: FnvIndexMap::new(),
            resets: 0,
        })
    }

    /// Filter a raw distance for one beacon
    ///
    /// With `double_update` the cycle runs twice on the same measurement.
    pub fn predict_and_update(
        &mut self,
        id: &BeaconId,
        measured: f32,
        control: ControlInput,
    ) -> PositioningResult<f32> {
        if !measured.is_finite() || measured < 0.0 {
            return Err(PositioningError::InvalidMeasurement);
        }

        if !self.filters.contains_key(id) {
            self.filters
                .insert(id.clone(), FilterInstance::new(&self.config))
                .map_err(|_| PositioningError::CapacityExceeded { capacity: MAX_BEACONS })?;
        }
        let filter = self
            .filters
            .get_mut(id)
            .ok_or(PositioningError::CapacityExceeded { capacity: MAX_BEACONS })?;

        let passes = if self.config.double_update { 2 } else { 1 };
        let mut result = Err(PositioningError::SingularMatrix);
        for _ in 0..passes {
            result = filter.predict_and_update(measured, control);
            if result.is_err() {
                break;
            }
        }

        match result {
            Ok(distance) if distance.is_finite() => Ok(distance),
            Ok(_) | Err(PositioningError::SingularMatrix) => {
                filter.reset();
                self.resets = self.resets.saturating_add(1);
                log_warn!("Filter for {} reset after singular update", id);
                Err(PositioningError::SingularMatrix)
            }
            Err(err) => Err(err),
        }
    }

    /// Filtered distance for a beacon
    pub fn estimate(&self, id: &BeaconId) -> Option<f32> {
        self.filters.get(id).and_then(|filter| filter.estimate())
    }

    /// Variance of a beacon's distance estimate
    pub fn variance(&self, id: &BeaconId) -> Option<f32> {
        self.filters.get(id).map(|filter| filter.variance())
    }

    /// Drop a beacon's filter state
    pub fn reset(&mut self, id: &BeaconId) {
        if let Some(filter) = self.filters.get_mut(id) {
            filter.reset();
        }
    }

    /// Filters reset after singular updates so far
    pub fn resets(&self) -> u32 {
        self.resets
    }

    /// Configuration in use
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Number of beacons with a filter
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Check if no filter exists yet
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> BeaconId {
        BeaconId::new(name).unwrap()
    }

    #[test]
    fn constant_measurement_converges() {
        let mut estimator = StateEstimator::new(FilterConfig::default()).unwrap();
        let a = id("a");

        let mut last_variance = f32::INFINITY;
        let mut distance = 0.0;
        for _ in 0..20 {
            distance = estimator.predict_and_update(&a, 3.0, ControlInput::NONE).unwrap();
            let variance = estimator.variance(&a).unwrap();
            assert!(variance <= last_variance);
            last_variance = variance;
        }

        assert!((distance - 3.0).abs() < 1e-3);
        assert_eq!(estimator.estimate(&a), Some(distance));
    }

    #[test]
    fn filters_are_per_beacon() {
        let mut estimator = StateEstimator::new(FilterConfig::default()).unwrap();
        estimator.predict_and_update(&id("a"), 1.0, ControlInput::NONE).unwrap();
        estimator.predict_and_update(&id("b"), 8.0, ControlInput::NONE).unwrap();

        assert_eq!(estimator.len(), 2);
        assert!(estimator.estimate(&id("a")).unwrap() < 2.0);
        assert!(estimator.estimate(&id("b")).unwrap() > 7.0);
        assert!(estimator.estimate(&id("c")).is_none());
    }

    #[test]
    fn double_update_converges_faster() {
        let single = FilterConfig::default()
            .with_kind(FilterKind::Scalar { init: Initialization::Zero })
            .with_initial_covariance(0.01);
        let double = single.with_double_update(true);

        let mut a = StateEstimator::new(single).unwrap();
        let mut b = StateEstimator::new(double).unwrap();
        let beacon = id("a");

        let once = a.predict_and_update(&beacon, 5.0, ControlInput::NONE).unwrap();
        let twice = b.predict_and_update(&beacon, 5.0, ControlInput::NONE).unwrap();
        assert!(twice > once);
        assert!(twice <= 5.0);
    }

    #[test]
    fn invalid_measurements_leave_filters_alone() {
        let mut estimator = StateEstimator::new(FilterConfig::default()).unwrap();
        let a = id("a");

        for bad in [f32::NAN, f32::INFINITY, -1.0] {
            assert_eq!(
                estimator.predict_and_update(&a, bad, ControlInput::NONE),
                Err(PositioningError::InvalidMeasurement)
            );
        }
        assert!(estimator.is_empty());
    }

    #[test]
    fn singular_update_resets_filter() {
        // Noise so small the innovation covariance has no usable pivot
        let config = FilterConfig::default()
            .with_kind(FilterKind::RangeRate)
            .with_process_noise(1e-20)
            .with_measurement_noise(1e-20)
            .with_initial_covariance(1e-20);
        let mut estimator = StateEstimator::new(config).unwrap();
        let a = id("a");

        let result = estimator.predict_and_update(&a, 1.0, ControlInput::NONE);
        assert_eq!(result, Err(PositioningError::SingularMatrix));
        assert_eq!(estimator.resets(), 1);
        assert!(estimator.estimate(&a).is_none());
        assert_eq!(estimator.len(), 1);
    }

    #[test]
    fn range_rate_kind_is_selectable() {
        let config = FilterConfig::default().with_kind(FilterKind::RangeRate);
        let mut estimator = StateEstimator::new(config).unwrap();
        let a = id("a");

        let mut distance = 0.0;
        for _ in 0..30 {
            distance = estimator.predict_and_update(&a, 6.0, ControlInput::NONE).unwrap();
        }
        assert!((distance - 6.0).abs() < 1e-2);
    }
}
