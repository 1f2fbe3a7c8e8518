//! RSSI to distance conversion
//!
//! Log-distance path loss model:
//!
//! ```text
//! distance = 10 ^ ((reference_power − rssi) / (10 · n))
//! ```
//!
//! `reference_power` is the beacon's calibrated RSSI at one meter and `n`
//! the path-loss exponent of the deployment environment. At
//! `rssi == reference_power` the distance is exactly 1.

use crate::{
    constants::signal::{
        DEFAULT_PATH_LOSS_EXPONENT, PATH_LOSS_HARD_PARTITION_OFFICE, PATH_LOSS_INDOOR_OBSTRUCTED,
        PATH_LOSS_OPEN_SPACE,
    },
    errors::{PositioningError, PositioningResult},
};

/// Deployment environment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Environment {
    /// Line of sight, free-space propagation
    OpenSpace,
    /// Indoors with furniture and people in the way
    IndoorObstructed,
    /// Offices divided by walls and glass partitions
    HardPartitionOffice,
}

impl Environment {
    /// Path-loss exponent for this environment
    pub fn path_loss_exponent(&self) -> PathLossExponent {
        match self {
            Self::OpenSpace => PathLossExponent(PATH_LOSS_OPEN_SPACE),
            Self::IndoorObstructed => PathLossExponent(PATH_LOSS_INDOOR_OBSTRUCTED),
            Self::HardPartitionOffice => PathLossExponent(PATH_LOSS_HARD_PARTITION_OFFICE),
        }
    }
}

/// Positive, finite path-loss exponent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathLossExponent(f32);

impl PathLossExponent {
    /// Validate an exponent
    pub fn new(value: f32) -> PositioningResult<Self> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(PositioningError::InvalidConfig {
                reason: "path-loss exponent must be positive and finite",
            })
        }
    }

    /// Raw exponent
    pub fn value(&self) -> f32 {
        self.0
    }
}

impl Default for PathLossExponent {
    fn default() -> Self {
        Self(DEFAULT_PATH_LOSS_EXPONENT)
    }
}

/// Distance for an RSSI given the beacon's one-meter reference power
pub fn estimate_distance(rssi: f32, reference_power: f32, exponent: PathLossExponent) -> f32 {
    libm::powf(10.0, (reference_power - rssi) / (10.0 * exponent.0))
}

/// One-meter reference power from a calibration taken at another distance
///
/// `rssi + 10·n·log10(d)`, the inverse of [`estimate_distance`].
pub fn reference_power_at_one_meter(
    calibrated_rssi: f32,
    calibrated_distance: f32,
    exponent: PathLossExponent,
) -> PositioningResult<f32> {
    if !calibrated_rssi.is_finite() || !calibrated_distance.is_finite() || calibrated_distance <= 0.0 {
        return Err(PositioningError::InvalidMeasurement);
    }
    Ok(calibrated_rssi + 10.0 * exponent.0 * libm::log10f(calibrated_distance))
}

/// Stateless converter bound to one exponent
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DistanceModel {
    exponent: PathLossExponent,
}

impl DistanceModel {
    /// Model with an explicit exponent
    pub fn new(exponent: PathLossExponent) -> Self {
        Self { exponent }
    }

    /// Model using an environment preset
    pub fn for_environment(environment: Environment) -> Self {
        Self::new(environment.path_loss_exponent())
    }

    /// The configured exponent
    pub fn exponent(&self) -> PathLossExponent {
        self.exponent
    }

    /// Distance for a smoothed RSSI, rejecting unusable inputs or results
    pub fn estimate(&self, rssi: f32, reference_power: f32) -> PositioningResult<f32> {
        if !rssi.is_finite() || !reference_power.is_finite() {
            return Err(PositioningError::InvalidMeasurement);
        }
        let distance = estimate_distance(rssi, reference_power, self.exponent);
        if distance.is_finite() {
            Ok(distance)
        } else {
            Err(PositioningError::InvalidMeasurement)
        }
    }
}
