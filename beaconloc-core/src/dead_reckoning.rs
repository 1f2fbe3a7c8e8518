//! Heading and step correction of solved positions
//!
//! Two modes share one position state:
//!
//! ```text
//! VelocityProjection   on each fix    p = fix + speed·(cos az, sin az)
//! StepIntegration      on each step   p = p + step_length·(cos az, sin az)
//! ```
//!
//! Step integration runs on the step detector's cadence, independent of
//! beacon fixes; a fix simply replaces the position. Orientation is
//! last-known-value: before the first sensor reading it is 0° heading and
//! zero speed, which makes every fix pure multilateration.

use crate::{
    constants::motion::{DEFAULT_STEP_LENGTH_M, FULL_TURN_DEG},
    geometry::{Point2D, RangeClamp},
};

/// Which correction is applied
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeadReckoningMode {
    /// Fixes pass through unchanged
    #[default]
    Disabled,
    /// Project each fix along the heading by the current speed
    VelocityProjection,
    /// Advance by one step length along the heading per step event
    StepIntegration {
        /// Distance covered per step
        step_length: f32,
    },
}

impl DeadReckoningMode {
    /// Step integration with the default stride
    pub const fn default_steps() -> Self {
        Self::StepIntegration {
            step_length: DEFAULT_STEP_LENGTH_M,
        }
    }

    /// Step length is positive and finite
    pub fn is_valid(&self) -> bool {
        match *self {
            Self::StepIntegration { step_length } => step_length.is_finite() && step_length > 0.0,
            _ => true,
        }
    }
}

/// Normalize an angle in degrees into [0, 360)
pub fn normalize_azimuth(degrees: f32) -> f32 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let wrapped = libm::fmodf(libm::fmodf(degrees, FULL_TURN_DEG) + FULL_TURN_DEG, FULL_TURN_DEG);
    // -1e-9 + 360 rounds to 360
    if wrapped >= FULL_TURN_DEG {
        0.0
    } else {
        wrapped
    }
}

/// Last known device orientation and motion
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrientationState {
    /// Heading in [0, 360), 0° along +x
    pub azimuth_deg: f32,
    /// Pitch or tilt angle
    pub pitch_deg: f32,
    /// Displacement per fix for velocity projection
    pub speed: f32,
}

impl OrientationState {
    /// Sanitized orientation; non-finite fields fall back to zero
    pub fn new(azimuth_deg: f32, pitch_deg: f32, speed: f32) -> Self {
        let finite_or_zero = |v: f32| if v.is_finite() { v } else { 0.0 };
        Self {
            azimuth_deg: normalize_azimuth(azimuth_deg),
            pitch_deg: finite_or_zero(pitch_deg),
            speed: finite_or_zero(speed),
        }
    }
}

/// Applies dead reckoning and owns the current position
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeadReckoningFuser {
    mode: DeadReckoningMode,
    clamp: Option<RangeClamp>,
    position: Option<Point2D>,
}

impl DeadReckoningFuser {
    /// Fuser in `mode`, clamping into `clamp` when set
    pub fn new(mode: DeadReckoningMode, clamp: Option<RangeClamp>) -> Self {
        Self {
            mode,
            clamp,
            position: None,
        }
    }

    /// Mode in use
    pub fn mode(&self) -> DeadReckoningMode {
        self.mode
    }

    /// Current fused position, `None` before the first fix
    pub fn position(&self) -> Option<Point2D> {
        self.position
    }

    /// Combine a fresh multilateration fix with the orientation
    pub fn fuse(&mut self, solved: Point2D, orientation: &OrientationState) -> Point2D {
        let adjusted = match self.mode {
            DeadReckoningMode::VelocityProjection => solved.advanced(orientation.azimuth_deg, orientation.speed),
            DeadReckoningMode::Disabled | DeadReckoningMode::StepIntegration { .. } => solved,
        };
        self.commit(adjusted, solved)
    }

    /// Advance one step along the heading
    ///
    /// `None` unless in step mode with a prior position.
    pub fn on_step(&mut self, orientation: &OrientationState) -> Option<Point2D> {
        let DeadReckoningMode::StepIntegration { step_length } = self.mode else {
            return None;
        };
        let prior = self.position?;
        let advanced = prior.advanced(orientation.azimuth_deg, step_length);
        Some(self.commit(advanced, prior))
    }

    /// Forget the position
    pub fn reset(&mut self) {
        self.position = None;
    }

    fn commit(&mut self, candidate: Point2D, fallback: Point2D) -> Point2D {
        let point = if candidate.is_finite() { candidate } else { fallback };
        let point = match self.clamp {
            Some(clamp) => clamp.apply(point),
            None => point,
        };
        self.position = Some(point);
        point
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point2D, b: Point2D) -> bool {
        a.distance_to(&b) < 1e-4
    }

    #[test]
    fn azimuth_normalization() {
        assert_eq!(normalize_azimuth(0.0), 0.0);
        assert_eq!(normalize_azimuth(360.0), 0.0);
        assert_eq!(normalize_azimuth(-90.0), 270.0);
        assert_eq!(normalize_azimuth(725.0), 5.0);
        assert_eq!(normalize_azimuth(f32::NAN), 0.0);
        assert!(normalize_azimuth(-1e-9) < 360.0);
    }

    #[test]
    fn stale_orientation_is_pure_multilateration() {
        let mut fuser = DeadReckoningFuser::new(DeadReckoningMode::VelocityProjection, None);
        let fix = Point2D::new(3.0, 4.0);
        assert_eq!(fuser.fuse(fix, &OrientationState::default()), fix);

        let broken = OrientationState::new(f32::NAN, 0.0, f32::INFINITY);
        assert_eq!(broken, OrientationState::default());
        assert_eq!(fuser.fuse(fix, &broken), fix);
    }

    #[test]
    fn velocity_projection() {
        let mut fuser = DeadReckoningFuser::new(DeadReckoningMode::VelocityProjection, None);
        let orientation = OrientationState::new(90.0, 0.0, 1.5);
        let fused = fuser.fuse(Point2D::new(2.0, 2.0), &orientation);

        assert!(close(fused, Point2D::new(2.0, 3.5)));
        assert_eq!(fuser.position(), Some(fused));
    }

    #[test]
    fn disabled_passes_fix_through() {
        let mut fuser = DeadReckoningFuser::default();
        let orientation = OrientationState::new(45.0, 10.0, 5.0);
        assert_eq!(fuser.fuse(Point2D::new(1.0, 1.0), &orientation), Point2D::new(1.0, 1.0));
        assert!(fuser.on_step(&orientation).is_none());
    }

    #[test]
    fn steps_need_a_prior_fix() {
        let mut fuser = DeadReckoningFuser::new(DeadReckoningMode::StepIntegration { step_length: 0.5 }, None);
        let east = OrientationState::new(0.0, 0.0, 0.0);

        assert!(fuser.on_step(&east).is_none());

        fuser.fuse(Point2D::new(1.0, 1.0), &east);
        fuser.on_step(&east).unwrap();
        let after_two = fuser.on_step(&east).unwrap();
        assert!(close(after_two, Point2D::new(2.0, 1.0)));

        let north = OrientationState::new(90.0, 0.0, 0.0);
        let turned = fuser.on_step(&north).unwrap();
        assert!(close(turned, Point2D::new(2.0, 1.5)));
    }

    #[test]
    fn results_are_clamped() {
        let clamp = RangeClamp::square(10.0);
        let mut fuser = DeadReckoningFuser::new(DeadReckoningMode::StepIntegration { step_length: 2.0 }, Some(clamp));
        let west = OrientationState::new(180.0, 0.0, 0.0);

        fuser.fuse(Point2D::new(1.0, 5.0), &west);
        let stepped = fuser.on_step(&west).unwrap();
        assert_eq!(stepped.x, 0.0);
        assert!((stepped.y - 5.0).abs() < 1e-4);
    }

    #[test]
    fn default_step_mode_is_valid() {
        assert!(DeadReckoningMode::default_steps().is_valid());
        assert!(!DeadReckoningMode::StepIntegration { step_length: 0.0 }.is_valid());
    }
}
