//! Fixed-size Kalman filter
//!
//! ## Kalman Filter Theory
//!
//! ### 1. Prediction Step
//! ```text
//! State prediction:      x̂ₖ|ₖ₋₁ = F·xₖ₋₁ + B·uₖ
//! Covariance prediction: Pₖ|ₖ₋₁ = F·Pₖ₋₁·Fᵀ + Q
//! ```
//!
//! ### 2. Update Step
//! ```text
//! Innovation:      yₖ = zₖ - H·x̂ₖ|ₖ₋₁
//! Innovation cov:  Sₖ = H·Pₖ|ₖ₋₁·Hᵀ + R
//! Kalman gain:     Kₖ = Pₖ|ₖ₋₁·Hᵀ·Sₖ⁻¹
//! State update:    x̂ₖ = x̂ₖ|ₖ₋₁ + Kₖ·yₖ
//! Covariance:      Pₖ = (I - Kₖ·H)·Pₖ|ₖ₋₁·(I - Kₖ·H)ᵀ + Kₖ·R·Kₖᵀ
//! ```
//!
//! The covariance uses the Joseph form. It equals `(I - K·H)·P` in exact
//! arithmetic but stays positive semi-definite under rounding. After every
//! step the covariance is symmetrized and its diagonal floored, so a long
//! run of identical measurements cannot collapse it to zero.
//!
//! Each step is computed into locals and committed only when every entry
//! is finite; a failed step leaves the filter untouched.
//!
//! ## Usage Example
//!
//! ```rust
//! use beaconloc_core::filter::kalman::{KalmanConfig, KalmanFilter};
//!
//! // Position + velocity, position observed
//! let config = KalmanConfig::<2, 1>::default()
//!     .with_transition([[1.0, 1.0], [0.0, 1.0]])
//!     .with_measurement_matrix([[1.0, 0.0]])
//!     .with_measurement_noise([0.01]);
//!
//! let mut kf = KalmanFilter::new(config);
//! for t in 0..20 {
//!     kf.step(0.0, &[t as f32 * 0.5]).unwrap();
//! }
//! assert!((kf.state()[1] - 0.5).abs() < 0.1);
//! ```

use crate::{
    constants::filter::{
        CONVERGENCE_VARIANCE, DEFAULT_INITIAL_COVARIANCE, DEFAULT_MEASUREMENT_NOISE,
        DEFAULT_PROCESS_NOISE, MIN_CONVERGENCE_UPDATES, MIN_VARIANCE,
    },
    errors::{PositioningError, PositioningResult},
    filter::matrix::{
        add, floor_diagonal, identity, invert, is_finite, make_symmetric, matvec, multiply,
        scaled_identity, subtract, transpose, Matrix, SquareMatrix, Vector,
    },
};

/// Kalman filter configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KalmanConfig<const N: usize, const M: usize> {
    /// Initial state estimate
    pub initial_state: Vector<N>,
    /// Initial covariance (P0)
    pub initial_covariance: SquareMatrix<N>,
    /// State transition (F)
    pub transition: SquareMatrix<N>,
    /// Control gain (B) for a scalar control input
    pub control: Vector<N>,
    /// Process noise covariance (Q)
    pub process_noise: SquareMatrix<N>,
    /// Measurement matrix (H)
    pub measurement_matrix: Matrix<M, N>,
    /// Measurement noise covariance (R)
    pub measurement_noise: SquareMatrix<M>,
    /// Lowest variance allowed on the covariance diagonal
    pub variance_floor: f32,
}

impl<const N: usize, const M: usize> Default for KalmanConfig<N, M> {
    fn default() -> Self {
        // First M states observed directly
        let mut measurement_matrix = [[0.0; N]; M];
        for (i, row) in measurement_matrix.iter_mut().enumerate().take(N) {
            row[i] = 1.0;
        }

        Self {
            initial_state: [0.0; N],
            initial_covariance: scaled_identity(DEFAULT_INITIAL_COVARIANCE),
            transition: identity(),
            control: [0.0; N],
            process_noise: scaled_identity(DEFAULT_PROCESS_NOISE),
            measurement_matrix,
            measurement_noise: scaled_identity(DEFAULT_MEASUREMENT_NOISE),
            variance_floor: MIN_VARIANCE,
        }
    }
}

impl<const N: usize, const M: usize> KalmanConfig<N, M> {
    /// Set process noise (higher = less trust in model)
    pub fn with_process_noise(mut self, noise: f32) -> Self {
        self.process_noise = scaled_identity(noise);
        self
    }

    /// Set measurement noise variance per measurement component
    pub fn with_measurement_noise(mut self, noise: [f32; M]) -> Self {
        self.measurement_noise = [[0.0; M]; M];
        for (i, variance) in noise.iter().enumerate() {
            self.measurement_noise[i][i] = *variance;
        }
        self
    }

    /// Set initial covariance scale
    pub fn with_initial_covariance(mut self, variance: f32) -> Self {
        self.initial_covariance = scaled_identity(variance);
        self
    }

    /// Set initial state
    pub fn with_initial_state(mut self, state: Vector<N>) -> Self {
        self.initial_state = state;
        self
    }

    /// Set state transition
    pub fn with_transition(mut self, transition: SquareMatrix<N>) -> Self {
        self.transition = transition;
        self
    }

    /// Set control gain
    pub fn with_control(mut self, control: Vector<N>) -> Self {
        self.control = control;
        self
    }

    /// Set measurement matrix
    pub fn with_measurement_matrix(mut self, measurement_matrix: Matrix<M, N>) -> Self {
        self.measurement_matrix = measurement_matrix;
        self
    }
}

/// Kalman filter for optimal state estimation
///
/// ## Type Parameters
/// - `N`: State vector dimension
/// - `M`: Measurement vector dimension
#[derive(Debug, Clone)]
pub struct KalmanFilter<const N: usize, const M: usize> {
    /// Current state estimate
    state: Vector<N>,
    /// Estimation error covariance
    covariance: SquareMatrix<N>,
    /// Configuration
    config: KalmanConfig<N, M>,
    /// Update count for convergence tracking
    update_count: u32,
}

impl<const N: usize, const M: usize> KalmanFilter<N, M> {
    /// Create new Kalman filter with configuration
    pub fn new(config: KalmanConfig<N, M>) -> Self {
        Self {
            state: config.initial_state,
            covariance: config.initial_covariance,
            config,
            update_count: 0,
        }
    }

    /// Propagate state and covariance one timestep
    pub fn predict(&mut self, control: f32) -> PositioningResult<()> {
        let (state, covariance) = self.predicted(&self.state, &self.covariance, control)?;
        self.state = state;
        self.covariance = covariance;
        Ok(())
    }

    /// Fold a measurement into the current state
    pub fn update(&mut self, measurement: &Vector<M>) -> PositioningResult<()> {
        let (state, covariance) = self.corrected(&self.state, &self.covariance, measurement)?;
        self.commit(state, covariance);
        Ok(())
    }

    /// Predict then update, committing only if both succeed
    ///
    /// Returns the first state component.
    pub fn step(&mut self, control: f32, measurement: &Vector<M>) -> PositioningResult<f32> {
        let (state, covariance) = self.predicted(&self.state, &self.covariance, control)?;
        let (state, covariance) = self.corrected(&state, &covariance, measurement)?;
        self.commit(state, covariance);
        Ok(self.state[0])
    }

    /// Overwrite state and covariance, counting it as an update
    pub fn seed(&mut self, state: Vector<N>, covariance: SquareMatrix<N>) {
        self.commit(state, covariance);
    }

    /// Get current state estimate
    pub fn state(&self) -> &Vector<N> {
        &self.state
    }

    /// Get current covariance
    pub fn covariance(&self) -> &SquareMatrix<N> {
        &self.covariance
    }

    /// Diagonal of the covariance
    pub fn uncertainty(&self) -> Vector<N> {
        let mut variances = [0.0; N];
        for (i, variance) in variances.iter_mut().enumerate() {
            *variance = self.covariance[i][i];
        }
        variances
    }

    /// Updates since creation or the last reset
    pub fn update_count(&self) -> u32 {
        self.update_count
    }

    /// Configuration in use
    pub fn config(&self) -> &KalmanConfig<N, M> {
        &self.config
    }

    /// Back to the initial state and covariance
    pub fn reset(&mut self) {
        self.state = self.config.initial_state;
        self.covariance = self.config.initial_covariance;
        self.update_count = 0;
    }

    /// Every variance small and enough updates seen
    pub fn has_converged(&self) -> bool {
        let max_uncertainty = self.uncertainty().iter().fold(0.0f32, |max, &u| max.max(u));
        max_uncertainty < CONVERGENCE_VARIANCE && self.update_count >= MIN_CONVERGENCE_UPDATES
    }

    fn commit(&mut self, state: Vector<N>, covariance: SquareMatrix<N>) {
        self.state = state;
        self.covariance = covariance;
        self.update_count = self.update_count.saturating_add(1);
    }

    fn predicted(
        &self,
        state: &Vector<N>,
        covariance: &SquareMatrix<N>,
        control: f32,
    ) -> PositioningResult<(Vector<N>, SquareMatrix<N>)> {
        let cfg = &self.config;

        // x̂ = F·x + B·u
        let mut next_state = matvec(&cfg.transition, state);
        for (x, b) in next_state.iter_mut().zip(cfg.control.iter()) {
            *x += b * control;
        }

        // P = F·P·Fᵀ + Q
        let fp = multiply(&cfg.transition, covariance);
        let mut next_cov = add(&multiply(&fp, &transpose(&cfg.transition)), &cfg.process_noise);
        make_symmetric(&mut next_cov);

        if !next_state.iter().all(|v| v.is_finite()) || !is_finite(&next_cov) {
            return Err(PositioningError::SingularMatrix);
        }
        Ok((next_state, next_cov))
    }

    fn corrected(
        &self,
        state: &Vector<N>,
        covariance: &SquareMatrix<N>,
        measurement: &Vector<M>,
    ) -> PositioningResult<(Vector<N>, SquareMatrix<N>)> {
        let cfg = &self.config;
        let h = &cfg.measurement_matrix;
        let h_t = transpose(h);

        // y = z - H·x̂
        let predicted_measurement = matvec(h, state);
        let mut innovation = [0.0; M];
        for i in 0..M {
            innovation[i] = measurement[i] - predicted_measurement[i];
        }

        // S = H·P·Hᵀ + R
        let s = add(&multiply(&multiply(h, covariance), &h_t), &cfg.measurement_noise);
        let s_inv = invert(&s).ok_or(PositioningError::SingularMatrix)?;

        // K = P·Hᵀ·S⁻¹
        let gain: Matrix<N, M> = multiply(&multiply(covariance, &h_t), &s_inv);

        // x̂ = x̂ + K·y
        let correction = matvec(&gain, &innovation);
        let mut next_state = *state;
        for (x, dx) in next_state.iter_mut().zip(correction.iter()) {
            *x += dx;
        }

        // P = (I - K·H)·P·(I - K·H)ᵀ + K·R·Kᵀ
        let i_kh = subtract(&identity::<N>(), &multiply(&gain, h));
        let joseph = multiply(&multiply(&i_kh, covariance), &transpose(&i_kh));
        let krk = multiply(&multiply(&gain, &cfg.measurement_noise), &transpose(&gain));
        let mut next_cov = add(&joseph, &krk);
        make_symmetric(&mut next_cov);
        floor_diagonal(&mut next_cov, cfg.variance_floor);

        if !next_state.iter().all(|v| v.is_finite()) || !is_finite(&next_cov) {
            return Err(PositioningError::SingularMatrix);
        }
        Ok((next_state, next_cov))
    }
}
