//! Stationary-distance filter
//!
//! One state, identity transition, distance observed directly. The update
//! collapses to `K = P / (P + R)`.

use crate::{
    config::FilterConfig,
    errors::PositioningResult,
    filter::{
        kalman::{KalmanConfig, KalmanFilter},
        ControlInput, DistanceEstimator, Initialization,
    },
};

/// 1-D Kalman filter over a beacon's distance
#[derive(Debug, Clone)]
pub struct ScalarKalman {
    filter: KalmanFilter<1, 1>,
    init: Initialization,
    measurement_noise: f32,
}

impl ScalarKalman {
    /// Filter using the noise settings from `config`
    pub fn new(config: &FilterConfig, init: Initialization) -> Self {
        let kalman = KalmanConfig::<1, 1>::default()
            .with_process_noise(config.process_noise)
            .with_measurement_noise([config.measurement_noise])
            .with_initial_covariance(config.initial_covariance);

        Self {
            filter: KalmanFilter::new(kalman),
            init,
            measurement_noise: config.measurement_noise,
        }
    }
}

impl DistanceEstimator for ScalarKalman {
    fn predict_and_update(&mut self, measured: f32, _control: ControlInput) -> PositioningResult<f32> {
        if self.init == Initialization::FirstMeasurement && self.filter.update_count() == 0 {
            // Trust the first sample as much as any measurement
            self.filter.seed([measured], [[self.measurement_noise]]);
            return Ok(measured);
        }

        self.filter.step(0.0, &[measured])
    }

    fn estimate(&self) -> Option<f32> {
        (self.filter.update_count() > 0).then(|| self.filter.state()[0])
    }

    fn variance(&self) -> f32 {
        self.filter.covariance()[0][0]
    }

    fn reset(&mut self) {
        self.filter.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_start_moves_towards_measurement() {
        let mut filter = ScalarKalman::new(&FilterConfig::default(), Initialization::Zero);
        assert!(filter.estimate().is_none());

        // P' = 1 + 1e-5, K = P'/(P' + 1e-3)
        let first = filter.predict_and_update(4.0, ControlInput::NONE).unwrap();
        let p = 1.0 + 0.00001;
        let expected = 4.0 * p / (p + 0.001);
        assert!((first - expected).abs() < 1e-4);
        // P = P'·R / (P' + R)
        assert!((filter.variance() - 0.000999).abs() < 1e-6);
    }

    #[test]
    fn first_measurement_seeds_state() {
        let mut filter = ScalarKalman::new(&FilterConfig::default(), Initialization::FirstMeasurement);

        assert_eq!(filter.predict_and_update(4.0, ControlInput::NONE).unwrap(), 4.0);
        assert_eq!(filter.variance(), 0.001);
        assert_eq!(filter.estimate(), Some(4.0));

        // P' = R + Q, K = P'/(P' + R) just over one half
        let next = filter.predict_and_update(6.0, ControlInput::NONE).unwrap();
        assert!(next > 5.0 && next < 5.1);
    }

    #[test]
    fn reset_forgets_seed() {
        let mut filter = ScalarKalman::new(&FilterConfig::default(), Initialization::FirstMeasurement);
        filter.predict_and_update(4.0, ControlInput::NONE).unwrap();
        filter.reset();

        assert!(filter.estimate().is_none());
        assert_eq!(filter.predict_and_update(9.0, ControlInput::NONE).unwrap(), 9.0);
    }
}
