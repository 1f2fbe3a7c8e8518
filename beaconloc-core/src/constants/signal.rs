//! Signal Constants
//!
//! RSSI smoothing windows and log-distance path-loss calibration.

// ===== SMOOTHING =====

/// Default number of RSSI samples kept per beacon.
///
/// Ten advertisements at the typical 100 ms beacon interval cover about a
/// second of signal, enough to average out multipath fades without
/// noticeable lag while walking.
///
/// Source: Field tuning on phone-class BLE receivers
pub const DEFAULT_WINDOW_SIZE: usize = 10;

/// Per-sample weight multiplier for exponentially weighted smoothing.
///
/// The newest sample has weight 1.0, the one before 0.9, then 0.81 and so
/// on. Influence decays monotonically with age.
///
/// Source: Field tuning, matches a ~10 sample effective window
pub const EXPONENTIAL_DECAY_FACTOR: f32 = 0.9;

// ===== PATH LOSS =====

/// Path-loss exponent for open space (free-space propagation).
///
/// Source: Log-distance path loss model, free-space value
pub const PATH_LOSS_OPEN_SPACE: f32 = 2.0;

/// Path-loss exponent for indoor spaces with light obstruction.
///
/// Below 2.0 because corridors and reflective surfaces guide the signal.
///
/// Source: Empirical indoor BLE measurements
pub const PATH_LOSS_INDOOR_OBSTRUCTED: f32 = 1.7;

/// Path-loss exponent for offices with hard partitions.
///
/// Source: Empirical measurements through drywall and glass partitions
pub const PATH_LOSS_HARD_PARTITION_OFFICE: f32 = 3.0;

/// Default path-loss exponent when no environment is configured.
pub const DEFAULT_PATH_LOSS_EXPONENT: f32 = PATH_LOSS_OPEN_SPACE;

// ===== CALIBRATION =====

/// Reference power assumed for beacons whose record carries none (dBm at 1 m).
///
/// Source: Common iBeacon factory calibration
pub const DEFAULT_REFERENCE_POWER_DBM: f32 = -59.0;

/// Measured RSSI at one meter for the reference deployment hardware (dBm).
///
/// Source: Calibration run with the deployment beacons
pub const CALIBRATED_RSSI_AT_ONE_METER_DBM: f32 = -62.0;

/// Plausible RSSI range for BLE receivers (dBm).
///
/// Samples outside this range are hardware glitches, not signal.
///
/// Source: Bluetooth Core Specification, RSSI is a signed 8-bit value
pub const RSSI_MIN_DBM: i16 = -127;

/// Upper bound of the plausible RSSI range (dBm).
pub const RSSI_MAX_DBM: i16 = 20;
