//! Planar geometry shared by the solver and the dead-reckoning fuser
//!
//! Coordinates are beacon-relative and unit-agnostic: meters or map grid
//! units both work as long as beacon locations and distances agree.

use core::fmt;

/// Point in the beacon coordinate plane
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point2D {
    /// Horizontal coordinate
    pub x: f32,
    /// Vertical coordinate
    pub y: f32,
}

impl Point2D {
    /// The coordinate origin
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    /// Create a point
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Point2D) -> f32 {
        libm::hypotf(self.x - other.x, self.y - other.y)
    }

    /// Point halfway between two points
    pub fn midpoint(&self, other: &Point2D) -> Point2D {
        Point2D::new((self.x + other.x) * 0.5, (self.y + other.y) * 0.5)
    }

    /// Both coordinates are finite
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Move by a distance along a heading given in degrees
    ///
    /// Heading 0° moves along +x, 90° along +y.
    pub fn advanced(&self, heading_deg: f32, distance: f32) -> Point2D {
        let heading = heading_deg.to_radians();
        Point2D::new(
            self.x + libm::cosf(heading) * distance,
            self.y + libm::sinf(heading) * distance,
        )
    }
}

impl fmt::Display for Point2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Point2D {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "({}, {})", self.x, self.y)
    }
}

/// Plausible operating region `[0, max_x] × [0, max_y]`
///
/// Ill-conditioned beacon geometry can throw a fix far outside the floor
/// plan; clamping keeps the output on the map.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RangeClamp {
    /// Largest valid x
    pub max_x: f32,
    /// Largest valid y
    pub max_y: f32,
}

impl RangeClamp {
    /// Region with separate extents per axis
    pub const fn new(max_x: f32, max_y: f32) -> Self {
        Self { max_x, max_y }
    }

    /// Square region `[0, max_range]²`
    pub const fn square(max_range: f32) -> Self {
        Self { max_x: max_range, max_y: max_range }
    }

    /// Both extents are positive and finite
    pub fn is_valid(&self) -> bool {
        self.max_x.is_finite() && self.max_y.is_finite() && self.max_x > 0.0 && self.max_y > 0.0
    }

    /// Clamp each axis into range
    pub fn apply(&self, point: Point2D) -> Point2D {
        Point2D::new(point.x.clamp(0.0, self.max_x), point.y.clamp(0.0, self.max_y))
    }
}
