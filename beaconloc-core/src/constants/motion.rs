//! Motion Constants
//!
//! Defaults for heading and step dead reckoning.

/// Default step length for step integration (meters).
///
/// Source: Average adult walking stride
pub const DEFAULT_STEP_LENGTH_M: f32 = 0.78;

/// Degrees in a full turn, used to normalize azimuth into [0, 360).
pub const FULL_TURN_DEG: f32 = 360.0;
