//! Engine configuration
//!
//! All tunables in one place, validated once before the engine starts.
//! Defaults reproduce the reference deployment: ten-sample exponential
//! smoothing, open-space path loss, a zero-initialized scalar filter with
//! `Q = 1e-5` and `R = 1e-3`, averaged multilateration and no dead
//! reckoning.
//!
//! ```rust
//! use beaconloc_core::{Environment, PositioningConfig, RangeClamp};
//! use beaconloc_core::dead_reckoning::DeadReckoningMode;
//!
//! let config = PositioningConfig::for_environment(Environment::HardPartitionOffice)
//!     .with_window_size(8)
//!     .with_dead_reckoning(DeadReckoningMode::StepIntegration { step_length: 0.7 })
//!     .with_range_clamp(RangeClamp::new(40.0, 25.0));
//!
//! assert!(config.validate().is_ok());
//! ```

use crate::{
    constants::{
        buffers::MAX_WINDOW_SIZE,
        filter::{DEFAULT_INITIAL_COVARIANCE, DEFAULT_MEASUREMENT_NOISE, DEFAULT_PROCESS_NOISE},
        signal::{DEFAULT_PATH_LOSS_EXPONENT, DEFAULT_WINDOW_SIZE},
    },
    dead_reckoning::DeadReckoningMode,
    distance::{Environment, PathLossExponent},
    errors::{PositioningError, PositioningResult},
    filter::FilterKind,
    geometry::RangeClamp,
    smoothing::SmoothingPolicy,
    solver::FusionPolicy,
};

fn positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

/// Distance filter settings shared by every beacon
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FilterConfig {
    /// Filter model
    pub kind: FilterKind,
    /// Process noise Q
    pub process_noise: f32,
    /// Measurement noise R
    pub measurement_noise: f32,
    /// Initial covariance P0
    pub initial_covariance: f32,
    /// Run predict and update twice per measurement
    pub double_update: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            kind: FilterKind::default(),
            process_noise: DEFAULT_PROCESS_NOISE,
            measurement_noise: DEFAULT_MEASUREMENT_NOISE,
            initial_covariance: DEFAULT_INITIAL_COVARIANCE,
            double_update: false,
        }
    }
}

impl FilterConfig {
    /// Set filter model
    pub fn with_kind(mut self, kind: FilterKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set process noise
    pub fn with_process_noise(mut self, noise: f32) -> Self {
        self.process_noise = noise;
        self
    }

    /// Set measurement noise
    pub fn with_measurement_noise(mut self, noise: f32) -> Self {
        self.measurement_noise = noise;
        self
    }

    /// Set initial covariance
    pub fn with_initial_covariance(mut self, variance: f32) -> Self {
        self.initial_covariance = variance;
        self
    }

    /// Enable or disable the double update
    pub fn with_double_update(mut self, enabled: bool) -> Self {
        self.double_update = enabled;
        self
    }

    /// Reject nonpositive or non-finite noise settings
    pub fn validate(&self) -> PositioningResult<()> {
        if !positive(self.process_noise) {
            return Err(PositioningError::InvalidConfig {
                reason: "process noise must be positive",
            });
        }
        if !positive(self.measurement_noise) {
            return Err(PositioningError::InvalidConfig {
                reason: "measurement noise must be positive",
            });
        }
        if !positive(self.initial_covariance) {
            return Err(PositioningError::InvalidConfig {
                reason: "initial covariance must be positive",
            });
        }
        Ok(())
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PositioningConfig {
    /// RSSI samples kept per beacon
    pub window_size: usize,
    /// How each window is averaged
    pub smoothing: SmoothingPolicy,
    /// Log-distance path-loss exponent
    pub path_loss_exponent: f32,
    /// Per-beacon distance filter
    pub filter: FilterConfig,
    /// How trilateration and triangulation combine
    pub fusion: FusionPolicy,
    /// Heading and step correction
    pub dead_reckoning: DeadReckoningMode,
    /// Clamp fixes into a region
    pub range_clamp: Option<RangeClamp>,
    /// Evict beacons not heard from within this many ms; `None` keeps them
    pub stale_after_ms: Option<u64>,
}

impl Default for PositioningConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            smoothing: SmoothingPolicy::default(),
            path_loss_exponent: DEFAULT_PATH_LOSS_EXPONENT,
            filter: FilterConfig::default(),
            fusion: FusionPolicy::default(),
            dead_reckoning: DeadReckoningMode::default(),
            range_clamp: None,
            stale_after_ms: None,
        }
    }
}

impl PositioningConfig {
    /// Defaults with the environment's path-loss exponent
    pub fn for_environment(environment: Environment) -> Self {
        Self::default().with_path_loss_exponent(environment.path_loss_exponent().value())
    }

    /// Set window size
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    /// Set smoothing policy
    pub fn with_smoothing(mut self, smoothing: SmoothingPolicy) -> Self {
        self.smoothing = smoothing;
        self
    }

    /// Set path-loss exponent
    pub fn with_path_loss_exponent(mut self, exponent: f32) -> Self {
        self.path_loss_exponent = exponent;
        self
    }

    /// Set filter settings
    pub fn with_filter(mut self, filter: FilterConfig) -> Self {
        self.filter = filter;
        self
    }

    /// Set fusion policy
    pub fn with_fusion(mut self, fusion: FusionPolicy) -> Self {
        self.fusion = fusion;
        self
    }

    /// Set dead-reckoning mode
    pub fn with_dead_reckoning(mut self, mode: DeadReckoningMode) -> Self {
        self.dead_reckoning = mode;
        self
    }

    /// Clamp fixes into a region
    pub fn with_range_clamp(mut self, clamp: RangeClamp) -> Self {
        self.range_clamp = Some(clamp);
        self
    }

    /// Evict beacons silent for longer than `ms`
    pub fn with_stale_after_ms(mut self, ms: u64) -> Self {
        self.stale_after_ms = Some(ms);
        self
    }

    /// Validated path-loss exponent
    pub fn exponent(&self) -> PositioningResult<PathLossExponent> {
        PathLossExponent::new(self.path_loss_exponent)
    }

    /// Check every setting; the engine refuses to start otherwise
    pub fn validate(&self) -> PositioningResult<()> {
        if self.window_size == 0 || self.window_size > MAX_WINDOW_SIZE {
            return Err(PositioningError::InvalidConfig {
                reason: "window size out of range",
            });
        }
        if !self.smoothing.is_valid() {
            return Err(PositioningError::InvalidConfig {
                reason: "decay must be in (0, 1]",
            });
        }
        self.exponent()?;
        self.filter.validate()?;
        if !self.dead_reckoning.is_valid() {
            return Err(PositioningError::InvalidConfig {
                reason: "step length must be positive",
            });
        }
        if let Some(clamp) = self.range_clamp {
            if !clamp.is_valid() {
                return Err(PositioningError::InvalidConfig {
                    reason: "clamp extents must be positive",
                });
            }
        }
        if self.stale_after_ms == Some(0) {
            return Err(PositioningError::InvalidConfig {
                reason: "stale timeout must be positive",
            });
        }
        Ok(())
    }
}
