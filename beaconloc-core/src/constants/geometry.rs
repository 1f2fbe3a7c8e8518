//! Geometry Constants
//!
//! Thresholds for the multilateration solvers.

/// Number of beacons combined into each position fix.
///
/// Three circles are the minimum that determine a point in the plane.
///
/// Source: Trilateration in 2-D
pub const BEACONS_PER_FIX: usize = 3;

/// Relative determinant threshold for the 2×2 multilateration systems.
///
/// A system is rejected when `|det| <= GEOMETRY_EPSILON * scale²`, where
/// `scale` is the largest coefficient magnitude. Relative so the test works
/// in meters and in grid units alike.
///
/// Source: f32 has ~7 significant digits; 1e-6 leaves headroom for rounding
pub const GEOMETRY_EPSILON: f32 = 1e-6;
