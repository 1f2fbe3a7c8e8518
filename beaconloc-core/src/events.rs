//! Sensor events consumed by the engine
//!
//! Three independent sources feed the engine: BLE scan callbacks,
//! orientation sensor callbacks and the step detector. Each callback wraps
//! its reading in a [`SensorEvent`] and enqueues it; only the engine's
//! context ever mutates positioning state.
//!
//! Inputs are sanitized at construction so the engine never sees an
//! out-of-range RSSI or a non-finite heading.

use crate::{
    constants::signal::{RSSI_MAX_DBM, RSSI_MIN_DBM},
    dead_reckoning::OrientationState,
    errors::{PositioningError, PositioningResult},
    registry::MacAddress,
    time::Timestamp,
};

/// One received advertisement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEvent {
    /// Advertising address, upper case
    pub address: MacAddress,
    /// Raw RSSI (dBm)
    pub rssi: i16,
    /// Receive time
    pub timestamp: Timestamp,
}

impl ScanEvent {
    /// Validate a scan callback's payload
    ///
    /// Fails with `UnknownBeacon` for an unusable address and
    /// `InvalidMeasurement` for an RSSI outside the BLE range.
    pub fn new(address: &str, rssi: i16, timestamp: Timestamp) -> PositioningResult<Self> {
        let address = MacAddress::new(address).ok_or(PositioningError::UnknownBeacon)?;
        if !(RSSI_MIN_DBM..=RSSI_MAX_DBM).contains(&rssi) {
            return Err(PositioningError::InvalidMeasurement);
        }
        Ok(Self {
            address,
            rssi,
            timestamp,
        })
    }
}

/// New orientation reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationEvent {
    /// Sanitized orientation
    pub orientation: OrientationState,
    /// Sensor time
    pub timestamp: Timestamp,
}

impl OrientationEvent {
    /// Orientation from raw sensor values
    pub fn new(azimuth_deg: f32, pitch_deg: f32, speed: f32, timestamp: Timestamp) -> Self {
        Self {
            orientation: OrientationState::new(azimuth_deg, pitch_deg, speed),
            timestamp,
        }
    }
}

/// One detected step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepEvent {
    /// Detection time
    pub timestamp: Timestamp,
}

impl StepEvent {
    /// Step at `timestamp`
    pub const fn new(timestamp: Timestamp) -> Self {
        Self { timestamp }
    }
}

/// Anything the engine reacts to
#[derive(Debug, Clone, PartialEq)]
pub enum SensorEvent {
    /// BLE advertisement
    Scan(ScanEvent),
    /// Heading, pitch and speed
    Orientation(OrientationEvent),
    /// Step detector
    Step(StepEvent),
}

impl SensorEvent {
    /// When the event happened
    pub fn timestamp(&self) -> Timestamp {
        match self {
            Self::Scan(event) => event.timestamp,
            Self::Orientation(event) => event.timestamp,
            Self::Step(event) => event.timestamp,
        }
    }

    /// Short name of the source
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Scan(_) => "scan",
            Self::Orientation(_) => "orientation",
            Self::Step(_) => "step",
        }
    }
}

impl From<ScanEvent> for SensorEvent {
    fn from(event: ScanEvent) -> Self {
        Self::Scan(event)
    }
}

impl From<OrientationEvent> for SensorEvent {
    fn from(event: OrientationEvent) -> Self {
        Self::Orientation(event)
    }
}

impl From<StepEvent> for SensorEvent {
    fn from(event: StepEvent) -> Self {
        Self::Step(event)
    }
}
