//! Error Types for the Positioning Pipeline
//!
//! ## Design Philosophy
//!
//! Every failure in this crate is local and recoverable. The worst outcome
//! of any event is "no updated fix this cycle", so errors are small `Copy`
//! values that can be counted, logged and dropped:
//!
//! 1. **No Heap Allocation**: messages are `&'static str`, identifiers are
//!    logged at the failure site rather than stored in the error.
//! 2. **Copy Semantics**: errors return cheaply from the per-event hot path.
//! 3. **Actionable**: each variant tells the caller what to do next.
//!
//! ## Error Categories
//!
//! ### Per-event
//! - `UnknownBeacon`: scan from an address not in the registry, dropped
//! - `InvalidMeasurement`: RSSI or derived distance is not a usable number
//! - `InsufficientBeacons`: fewer than three ranged beacons, no fix yet
//! - `SingularGeometry`: beacon layout cannot determine a point
//! - `SingularMatrix`: filter covariance could not be inverted, filter reset
//!
//! ### Setup
//! - `InvalidConfig`: rejected before the engine starts
//! - `MalformedMetadata` / `DuplicateBeacon`: beacon metadata is broken
//! - `CapacityExceeded`: more beacons than the fixed-size maps hold
//! - `QueueFull`: producers outrun the consumer
//!
//! ```rust
//! use beaconloc_core::PositioningError;
//!
//! fn on_failed_fix(err: PositioningError) {
//!     match err {
//!         PositioningError::InsufficientBeacons { .. } => {
//!             // keep scanning, the map fills up within a second
//!         }
//!         PositioningError::SingularGeometry { .. } => {
//!             // beacons nearly collinear from here, keep the last fix
//!         }
//!         _ => {}
//!     }
//! }
//! ```

use core::fmt;

use thiserror_no_std::Error;

/// Result type for positioning operations
pub type PositioningResult<T> = Result<T, PositioningError>;

/// Linear formulation that failed a geometry check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverMethod {
    /// Pairwise circle differences
    Trilateration,
    /// Offsets anchored at the first beacon
    Triangulation,
}

impl fmt::Display for SolverMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trilateration => f.write_str("trilateration"),
            Self::Triangulation => f.write_str("triangulation"),
        }
    }
}

/// Positioning errors - kept small and `Copy`
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum PositioningError {
    /// Scan event from an address absent from the registry
    #[error("Unknown beacon address")]
    UnknownBeacon,

    /// Not enough ranged beacons for a fix
    #[error("Insufficient beacons: need {required}, have {available}")]
    InsufficientBeacons {
        /// Beacons needed for a fix
        required: usize,
        /// Beacons currently ranged
        available: usize,
    },

    /// Beacon geometry does not determine a point (collinear, no intersection)
    #[error("Singular geometry in {method}")]
    SingularGeometry {
        /// Formulation whose determinant vanished
        method: SolverMethod,
    },

    /// Filter matrix inversion undefined or state went non-finite
    #[error("Singular matrix in filter update")]
    SingularMatrix,

    /// Measurement is NaN, infinite or outside the plausible range
    #[error("Invalid measurement: not a usable number")]
    InvalidMeasurement,

    /// Configuration rejected at startup
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Which setting is wrong
        reason: &'static str,
    },

    /// Beacon metadata line could not be parsed
    #[error("Malformed beacon metadata on line {line}: {reason}")]
    MalformedMetadata {
        /// 1-based line number
        line: usize,
        /// What was wrong with it
        reason: &'static str,
    },

    /// Beacon id or address appears twice in the metadata
    #[error("Duplicate beacon on line {line}")]
    DuplicateBeacon {
        /// 1-based line number of the second occurrence
        line: usize,
    },

    /// A fixed-capacity collection is full
    #[error("Capacity of {capacity} exceeded")]
    CapacityExceeded {
        /// The collection's capacity
        capacity: usize,
    },

    /// Event queue full, event dropped
    #[error("Event queue full")]
    QueueFull,
}

#[cfg(feature = "defmt")]
impl defmt::Format for SolverMethod {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::Trilateration => defmt::write!(fmt, "trilateration"),
            Self::Triangulation => defmt::write!(fmt, "triangulation"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for PositioningError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::UnknownBeacon =>
                defmt::write!(fmt, "Unknown beacon"),
            Self::InsufficientBeacons { required, available } =>
                defmt::write!(fmt, "Need {} beacons, have {}", required, available),
            Self::SingularGeometry { method } =>
                defmt::write!(fmt, "Singular geometry in {}", method),
            Self::SingularMatrix =>
                defmt::write!(fmt, "Singular matrix"),
            Self::InvalidMeasurement =>
                defmt::write!(fmt, "Invalid measurement"),
            Self::InvalidConfig { reason } =>
                defmt::write!(fmt, "Invalid config: {}", reason),
            Self::MalformedMetadata { line, reason } =>
                defmt::write!(fmt, "Metadata line {}: {}", line, reason),
            Self::DuplicateBeacon { line } =>
                defmt::write!(fmt, "Duplicate beacon on line {}", line),
            Self::CapacityExceeded { capacity } =>
                defmt::write!(fmt, "Capacity {} exceeded", capacity),
            Self::QueueFull =>
                defmt::write!(fmt, "Queue full"),
        }
    }
}
