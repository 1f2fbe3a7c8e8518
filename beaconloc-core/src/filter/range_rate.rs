//! Distance plus range-rate filter
//!
//! ```text
//! state        x = [d, ḋ]
//! transition   F = [[1, 1], [0, 1]]      unit timestep per sample
//! control      B = [0.5, 1]ᵀ             u = radial acceleration
//! measurement  z = [d, d − d_prev]       H = I
//! noise        R = diag(r, 2r)           the observed rate differences two samples
//! ```
//!
//! The 2-D measurement makes the innovation covariance a full 2×2 matrix,
//! so every update goes through an explicit inversion that can report
//! `SingularMatrix`.

use crate::{
    config::FilterConfig,
    errors::PositioningResult,
    filter::{
        kalman::{KalmanConfig, KalmanFilter},
        ControlInput, DistanceEstimator,
    },
};

/// Two-state Kalman filter over distance and its rate of change
#[derive(Debug, Clone)]
pub struct RangeRateKalman {
    filter: KalmanFilter<2, 2>,
    last_measurement: Option<f32>,
}

impl RangeRateKalman {
    /// Filter using the noise settings from `config`
    pub fn new(config: &FilterConfig) -> Self {
        let r = config.measurement_noise;
        let kalman = KalmanConfig::<2, 2>::default()
            .with_transition([[1.0, 1.0], [0.0, 1.0]])
            .with_control([0.5, 1.0])
            .with_process_noise(config.process_noise)
            .with_measurement_noise([r, 2.0 * r])
            .with_initial_covariance(config.initial_covariance);

        Self {
            filter: KalmanFilter::new(kalman),
            last_measurement: None,
        }
    }

    /// Estimated change in distance per sample
    pub fn range_rate(&self) -> f32 {
        self.filter.state()[1]
    }
}

impl DistanceEstimator for RangeRateKalman {
    fn predict_and_update(&mut self, measured: f32, control: ControlInput) -> PositioningResult<f32> {
        let observed_rate = self.last_measurement.map_or(0.0, |last| measured - last);
        let distance = self
            .filter
            .step(control.radial_acceleration, &[measured, observed_rate])?;
        self.last_measurement = Some(measured);
        Ok(distance)
    }

    fn estimate(&self) -> Option<f32> {
        (self.filter.update_count() > 0).then(|| self.filter.state()[0])
    }

    fn variance(&self) -> f32 {
        self.filter.covariance()[0][0]
    }

    fn reset(&mut self) {
        self.filter.reset();
        self.last_measurement = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converges_on_stationary_distance() {
        let mut filter = RangeRateKalman::new(&FilterConfig::default());
        let mut estimate = 0.0;
        for _ in 0..30 {
            estimate = filter.predict_and_update(5.0, ControlInput::NONE).unwrap();
        }

        assert!((estimate - 5.0).abs() < 1e-2);
        assert!(filter.range_rate().abs() < 1e-2);
    }

    #[test]
    fn tracks_approaching_receiver() {
        let mut filter = RangeRateKalman::new(&FilterConfig::default());
        for i in 0..30 {
            filter
                .predict_and_update(10.0 - 0.2 * i as f32, ControlInput::NONE)
                .unwrap();
        }

        assert!((filter.range_rate() + 0.2).abs() < 0.05);
        assert!((filter.estimate().unwrap() - 4.2).abs() < 0.1);
    }

    #[test]
    fn reset_clears_rate_history() {
        let mut filter = RangeRateKalman::new(&FilterConfig::default());
        filter.predict_and_update(3.0, ControlInput::NONE).unwrap();
        filter.reset();

        assert!(filter.estimate().is_none());
        assert_eq!(filter.range_rate(), 0.0);
    }
}
