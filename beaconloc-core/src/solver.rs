//! Multilateration: three ranged beacons to one position
//!
//! ## Beacon Selection
//!
//! The three beacons with the smallest filtered distance are used, ties
//! broken by which beacon was ranged first. Beacons missing from the
//! registry are never considered.
//!
//! ## Formulations
//!
//! **Trilateration** subtracts circle equations pairwise (1−2, 2−3):
//!
//! ```text
//! A = 2(x₂ − x₁)   B = 2(y₂ − y₁)   C = r₁² − r₂² − x₁² + x₂² − y₁² + y₂²
//! D = 2(x₃ − x₂)   E = 2(y₃ − y₂)   F = r₂² − r₃² − x₂² + x₃² − y₂² + y₃²
//!
//! x = (C·E − F·B) / (E·A − B·D)
//! y = (C·D − A·F) / (B·D − A·E)
//! ```
//!
//! **Triangulation** anchors every offset at beacon 1:
//!
//! ```text
//! A = x₂ − x₁   B = y₂ − y₁   E = (r₁² − r₂² + x₂² − x₁² + y₂² − y₁²) / 2
//! C = x₃ − x₁   D = y₃ − y₁   F = (r₁² − r₃² + x₃² − x₁² + y₃² − y₁²) / 2
//!
//! x = (E·D − B·F) / (A·D − B·C)
//! y = (A·F − E·C) / (A·D − B·C)
//! ```
//!
//! Both determinants vanish when the beacons are collinear. A system is
//! rejected when `|det| ≤ ε·scale²`, `scale` being its largest coefficient,
//! so the test means the same in meters and in map grid units.
//!
//! ## Fusion
//!
//! [`FusionPolicy::Averaged`] returns the midpoint of both solutions. If
//! one formulation is singular the other is used alone, and only when both
//! fail is `SingularGeometry` reported.

use core::fmt;

use heapless::Vec;

use crate::{
    constants::{
        buffers::MAX_BEACONS,
        geometry::{BEACONS_PER_FIX, GEOMETRY_EPSILON},
    },
    errors::{PositioningError, PositioningResult, SolverMethod},
    geometry::{Point2D, RangeClamp},
    ranging::DistanceMap,
    registry::BeaconRegistry,
};

/// How the two formulations combine into a fix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FusionPolicy {
    /// Trilateration alone
    TrilaterationOnly,
    /// Midpoint of trilateration and triangulation
    #[default]
    Averaged,
}

/// Formulation(s) that produced a fix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FixMethod {
    /// Trilateration only
    Trilateration,
    /// Triangulation only, trilateration was singular
    Triangulation,
    /// Midpoint of both
    Averaged,
}

impl FixMethod {
    /// Lower-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trilateration => "trilateration",
            Self::Triangulation => "triangulation",
            Self::Averaged => "averaged",
        }
    }
}

impl fmt::Display for FixMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for FixMethod {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{=str}", self.as_str())
    }
}

/// A beacon location paired with its measured distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    /// Beacon location
    pub location: Point2D,
    /// Distance to the receiver
    pub distance: f32,
}

impl Range {
    /// Pair a location with a distance
    pub const fn new(location: Point2D, distance: f32) -> Self {
        Self { location, distance }
    }
}

/// Solved position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    /// Position after optional clamping
    pub position: Point2D,
    /// Formulation(s) used
    pub method: FixMethod,
}

fn is_singular(det: f32, scale: f32) -> bool {
    !det.is_finite() || libm::fabsf(det) <= GEOMETRY_EPSILON * scale * scale
}

fn max_abs(values: [f32; 4]) -> f32 {
    values.iter().fold(0.0f32, |max, v| max.max(libm::fabsf(*v)))
}

fn finite_or(point: Point2D, method: SolverMethod) -> PositioningResult<Point2D> {
    if point.is_finite() {
        Ok(point)
    } else {
        Err(PositioningError::SingularGeometry { method })
    }
}

/// Position from pairwise circle differences
pub fn trilaterate(ranges: &[Range; 3]) -> PositioningResult<Point2D> {
    let method = SolverMethod::Trilateration;
    let (p1, p2, p3) = (ranges[0].location, ranges[1].location, ranges[2].location);
    let (r1, r2, r3) = (ranges[0].distance, ranges[1].distance, ranges[2].distance);

    let a = 2.0 * p2.x - 2.0 * p1.x;
    let b = 2.0 * p2.y - 2.0 * p1.y;
    let c = r1 * r1 - r2 * r2 - p1.x * p1.x + p2.x * p2.x - p1.y * p1.y + p2.y * p2.y;
    let d = 2.0 * p3.x - 2.0 * p2.x;
    let e = 2.0 * p3.y - 2.0 * p2.y;
    let f = r2 * r2 - r3 * r3 - p2.x * p2.x + p3.x * p3.x - p2.y * p2.y + p3.y * p3.y;

    let det = e * a - b * d;
    if is_singular(det, max_abs([a, b, d, e])) {
        return Err(PositioningError::SingularGeometry { method });
    }

    let x = (c * e - f * b) / det;
    let y = (c * d - a * f) / (b * d - a * e);
    finite_or(Point2D::new(x, y), method)
}

/// Position from offsets anchored at the first beacon
pub fn triangulate(ranges: &[Range; 3]) -> PositioningResult<Point2D> {
    let method = SolverMethod::Triangulation;
    let (p1, p2, p3) = (ranges[0].location, ranges[1].location, ranges[2].location);
    let (r1, r2, r3) = (ranges[0].distance, ranges[1].distance, ranges[2].distance);

    let a = p2.x - p1.x;
    let b = p2.y - p1.y;
    let c = p3.x - p1.x;
    let d = p3.y - p1.y;
    let e = (r1 * r1 - r2 * r2 + p2.x * p2.x - p1.x * p1.x + p2.y * p2.y - p1.y * p1.y) / 2.0;
    let f = (r1 * r1 - r3 * r3 + p3.x * p3.x - p1.x * p1.x + p3.y * p3.y - p1.y * p1.y) / 2.0;

    let det = a * d - b * c;
    if is_singular(det, max_abs([a, b, c, d])) {
        return Err(PositioningError::SingularGeometry { method });
    }

    let x = (e * d - b * f) / det;
    let y = (a * f - e * c) / det;
    finite_or(Point2D::new(x, y), method)
}

/// Selects beacons and solves for a position
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PositionSolver {
    policy: FusionPolicy,
    clamp: Option<RangeClamp>,
}

impl PositionSolver {
    /// Solver with a fusion policy and optional clamp region
    pub fn new(policy: FusionPolicy, clamp: Option<RangeClamp>) -> Self {
        Self { policy, clamp }
    }

    /// Fusion policy in use
    pub fn policy(&self) -> FusionPolicy {
        self.policy
    }

    /// Pick the three nearest registered beacons and solve
    pub fn solve(&self, registry: &BeaconRegistry, distances: &DistanceMap) -> PositioningResult<Fix> {
        let ranges = Self::select_nearest(registry, distances)?;
        self.solve_ranges(&ranges)
    }

    /// Three nearest beacons, ties broken by first sighting
    pub fn select_nearest(registry: &BeaconRegistry, distances: &DistanceMap) -> PositioningResult<[Range; 3]> {
        let mut candidates: Vec<(f32, u64, Point2D), MAX_BEACONS> = Vec::new();
        for (id, entry) in distances.iter() {
            if let Some(location) = registry.location(id) {
                if candidates.push((entry.distance, entry.seq(), location)).is_err() {
                    break;
                }
            }
        }

        if candidates.len() < BEACONS_PER_FIX {
            return Err(PositioningError::InsufficientBeacons {
                required: BEACONS_PER_FIX,
                available: candidates.len(),
            });
        }

        candidates.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        let range = |i: usize| Range::new(candidates[i].2, candidates[i].0);
        Ok([range(0), range(1), range(2)])
    }

    /// Solve an explicit beacon triple under the configured policy
    pub fn solve_ranges(&self, ranges: &[Range; 3]) -> PositioningResult<Fix> {
        let fix = match self.policy {
            FusionPolicy::TrilaterationOnly => Fix {
                position: trilaterate(ranges)?,
                method: FixMethod::Trilateration,
            },
            FusionPolicy::Averaged => match (trilaterate(ranges), triangulate(ranges)) {
                (Ok(tri), Ok(tng)) => Fix {
                    position: tri.midpoint(&tng),
                    method: FixMethod::Averaged,
                },
                (Ok(tri), Err(_)) => Fix {
                    position: tri,
                    method: FixMethod::Trilateration,
                },
                (Err(_), Ok(tng)) => Fix {
                    position: tng,
                    method: FixMethod::Triangulation,
                },
                (Err(err), Err(_)) => return Err(err),
            },
        };

        let position = match self.clamp {
            Some(clamp) => clamp.apply(fix.position),
            None => fix.position,
        };
        Ok(Fix { position, ..fix })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{BeaconId, BeaconRecord, MacAddress};

    fn triangle(receiver: Point2D) -> [Range; 3] {
        [Point2D::new(0.0, 0.0), Point2D::new(10.0, 0.0), Point2D::new(5.0, 10.0)]
            .map(|location| Range::new(location, location.distance_to(&receiver)))
    }

    fn close(a: Point2D, b: Point2D) -> bool {
        a.distance_to(&b) < 1e-3
    }

    fn registry() -> BeaconRegistry {
        let mut builder = BeaconRegistry::builder();
        for (i, (x, y)) in [(0.0, 0.0), (10.0, 0.0), (5.0, 10.0), (20.0, 20.0)].into_iter().enumerate() {
            let record = BeaconRecord::new(
                BeaconId::new(&format!("b{}", i)).unwrap(),
                MacAddress::new(&format!("AA:00:00:00:00:0{}", i)).unwrap(),
                Point2D::new(x, y),
                -62.0,
            );
            builder = builder.add(record).unwrap();
        }
        builder.build()
    }

    #[test]
    fn trilateration_recovers_center() {
        let ranges = triangle(Point2D::new(5.0, 5.0));
        assert!(close(trilaterate(&ranges).unwrap(), Point2D::new(5.0, 5.0)));
    }

    #[test]
    fn triangulation_recovers_center() {
        let ranges = triangle(Point2D::new(5.0, 5.0));
        assert!(close(triangulate(&ranges).unwrap(), Point2D::new(5.0, 5.0)));
    }

    #[test]
    fn averaged_fix_reports_method() {
        let solver = PositionSolver::default();
        let fix = solver.solve_ranges(&triangle(Point2D::new(3.0, 2.0))).unwrap();
        assert_eq!(fix.method, FixMethod::Averaged);
        assert!(close(fix.position, Point2D::new(3.0, 2.0)));

        let solver = PositionSolver::new(FusionPolicy::TrilaterationOnly, None);
        let fix = solver.solve_ranges(&triangle(Point2D::new(3.0, 2.0))).unwrap();
        assert_eq!(fix.method, FixMethod::Trilateration);
    }

    #[test]
    fn collinear_beacons_are_singular() {
        let ranges = [
            Range::new(Point2D::new(0.0, 0.0), 3.0),
            Range::new(Point2D::new(5.0, 0.0), 3.0),
            Range::new(Point2D::new(10.0, 0.0), 3.0),
        ];

        assert_eq!(
            trilaterate(&ranges),
            Err(PositioningError::SingularGeometry { method: SolverMethod::Trilateration })
        );
        assert_eq!(
            triangulate(&ranges),
            Err(PositioningError::SingularGeometry { method: SolverMethod::Triangulation })
        );
        assert!(matches!(
            PositionSolver::default().solve_ranges(&ranges),
            Err(PositioningError::SingularGeometry { .. })
        ));
    }

    #[test]
    fn singularity_test_is_scale_relative() {
        // Same nearly-collinear layout in millimeters and kilometers
        for scale in [1e-3f32, 1e3] {
            let ranges = [
                Range::new(Point2D::new(0.0, 0.0), scale),
                Range::new(Point2D::new(5.0 * scale, 1e-8 * scale), scale),
                Range::new(Point2D::new(10.0 * scale, 0.0), scale),
            ];
            assert!(trilaterate(&ranges).is_err());
        }
    }

    #[test]
    fn clamp_applies_to_fix() {
        let solver = PositionSolver::new(FusionPolicy::Averaged, Some(RangeClamp::square(4.0)));
        let fix = solver.solve_ranges(&triangle(Point2D::new(5.0, 5.0))).unwrap();
        assert_eq!(fix.position, Point2D::new(4.0, 4.0));
    }

    #[test]
    fn needs_three_beacons() {
        let registry = registry();
        let mut distances = DistanceMap::new();
        distances.record(&BeaconId::new("b0").unwrap(), 1.0, 0).unwrap();
        distances.record(&BeaconId::new("b1").unwrap(), 1.0, 0).unwrap();

        assert_eq!(
            PositionSolver::default().solve(&registry, &distances),
            Err(PositioningError::InsufficientBeacons { required: 3, available: 2 })
        );
    }

    #[test]
    fn unregistered_beacons_are_ignored() {
        let registry = registry();
        let mut distances = DistanceMap::new();
        distances.record(&BeaconId::new("b0").unwrap(), 1.0, 0).unwrap();
        distances.record(&BeaconId::new("ghost").unwrap(), 0.5, 0).unwrap();
        distances.record(&BeaconId::new("b1").unwrap(), 1.0, 0).unwrap();

        let err = PositionSolver::default().solve(&registry, &distances).unwrap_err();
        assert_eq!(err, PositioningError::InsufficientBeacons { required: 3, available: 2 });
    }

    #[test]
    fn selects_nearest_with_insertion_ties() {
        let registry = registry();
        let mut distances = DistanceMap::new();
        // b3 is farthest; b1 and b2 tie, b1 seen first
        distances.record(&BeaconId::new("b3").unwrap(), 9.0, 0).unwrap();
        distances.record(&BeaconId::new("b1").unwrap(), 2.0, 0).unwrap();
        distances.record(&BeaconId::new("b2").unwrap(), 2.0, 0).unwrap();
        distances.record(&BeaconId::new("b0").unwrap(), 1.0, 0).unwrap();

        let ranges = PositionSolver::select_nearest(&registry, &distances).unwrap();
        assert_eq!(ranges[0].location, Point2D::new(0.0, 0.0));
        assert_eq!(ranges[1].location, Point2D::new(10.0, 0.0));
        assert_eq!(ranges[2].location, Point2D::new(5.0, 10.0));
    }
}
