//! Filter Constants
//!
//! Noise defaults and numerical guards for the per-beacon Kalman filters.

// ===== NOISE DEFAULTS =====

/// Default process noise (Q) for the distance filters.
///
/// Small because a stationary beacon's distance changes slowly compared to
/// the scan rate.
///
/// Source: Field tuning of the stationary-distance model
pub const DEFAULT_PROCESS_NOISE: f32 = 0.00001;

/// Default measurement noise (R) for the distance filters.
///
/// Source: Field tuning of the stationary-distance model
pub const DEFAULT_MEASUREMENT_NOISE: f32 = 0.001;

/// Default initial covariance (P0) scale.
///
/// Source: Unit uncertainty, the filter forgets it within a few samples
pub const DEFAULT_INITIAL_COVARIANCE: f32 = 1.0;

// ===== NUMERICAL GUARDS =====

/// Lowest variance the filter covariance diagonal may reach.
///
/// Repeated identical measurements drive P towards zero, after which the
/// filter ignores new data and can lose positive definiteness to rounding.
///
/// Source: Well above f32 epsilon at unit scale
pub const MIN_VARIANCE: f32 = 1e-9;

/// Pivot magnitude below which a matrix is treated as singular.
///
/// Source: Gauss-Jordan elimination with partial pivoting, f32 precision
pub const SINGULAR_PIVOT_EPSILON: f32 = 1e-10;

/// Variance below which a filter counts as converged.
pub const CONVERGENCE_VARIANCE: f32 = 0.01;

/// Minimum updates before a filter may report convergence.
///
/// Source: Control system practice, prevents declaring victory on sample one
pub const MIN_CONVERGENCE_UPDATES: u32 = 5;
