//! Constants for the positioning engine
//!
//! Every tunable default and capacity limit lives here with a note on where
//! the value comes from. Grouped by concern:
//! - **Signal**: RSSI smoothing and path-loss calibration
//! - **Filter**: Kalman noise defaults and numerical guards
//! - **Geometry**: multilateration thresholds
//! - **Motion**: dead-reckoning defaults
//! - **Buffers**: fixed capacities for the `heapless` collections
//!
//! Use these instead of magic numbers, and include units in new names.

/// RSSI smoothing and log-distance path-loss parameters.
pub mod signal;

/// Kalman filter defaults and numerical safeguards.
pub mod filter;

/// Multilateration thresholds.
pub mod geometry;

/// Dead-reckoning defaults.
pub mod motion;

/// Fixed capacities for beacon-keyed state and event queues.
pub mod buffers;

pub use signal::{
    DEFAULT_WINDOW_SIZE, EXPONENTIAL_DECAY_FACTOR, DEFAULT_REFERENCE_POWER_DBM,
    PATH_LOSS_OPEN_SPACE, PATH_LOSS_INDOOR_OBSTRUCTED, PATH_LOSS_HARD_PARTITION_OFFICE,
};

pub use filter::{
    DEFAULT_PROCESS_NOISE, DEFAULT_MEASUREMENT_NOISE, DEFAULT_INITIAL_COVARIANCE,
};

pub use geometry::BEACONS_PER_FIX;

pub use motion::DEFAULT_STEP_LENGTH_M;

pub use buffers::{MAX_BEACONS, MAX_WINDOW_SIZE, EVENT_QUEUE_CAPACITY};
