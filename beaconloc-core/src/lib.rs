//! Positioning engine for BLE beacon indoor localization
//!
//! Turns noisy RSSI samples from beacons at known coordinates into a 2-D
//! position fix, refined with heading and step dead reckoning.
//! Designed for phones and edge devices alike.
//!
//! Key constraints:
//! - Fixed-capacity state, no heap allocation in the hot path
//! - O(1) work per event
//! - Never panics on sensor input; the worst outcome is "no fix this cycle"
//!
//! ```text
//! scan ─→ SignalSmoother ─→ DistanceModel ─→ StateEstimator ─→ DistanceMap
//!                                                                  │ (≥ 3)
//!                      orientation / steps ─→ DeadReckoningFuser ←─ PositionSolver
//!                                                   │
//!                                                   └─→ PositionUpdate
//! ```
//!
//! ```no_run
//! use beaconloc_core::{BeaconRegistry, PositioningConfig, PositioningEngine, SensorEvent, ScanEvent};
//!
//! let registry = BeaconRegistry::parse(
//!     "AA:00:00:00:00:01,fda50693-a4e2-4fb1-afcf-c6eb07647825,1,1,-62,0.0,0.0,#FF0000\n",
//! ).unwrap();
//! let mut engine = PositioningEngine::new(&registry, PositioningConfig::default()).unwrap();
//!
//! let scan = ScanEvent::new("AA:00:00:00:00:01", -65, 1_000).unwrap();
//! if let Some(update) = engine.handle(SensorEvent::Scan(scan)) {
//!     // hand update.position to the map view
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

#[macro_use]
mod logging;

pub mod buffer;
pub mod config;
pub mod constants;
pub mod dead_reckoning;
pub mod distance;
pub mod engine;
pub mod errors;
pub mod events;
pub mod filter;
pub mod geometry;
pub mod queue;
pub mod ranging;
pub mod registry;
pub mod smoothing;
pub mod solver;
pub mod time;

// Public API
pub use config::{FilterConfig, PositioningConfig};
pub use dead_reckoning::{DeadReckoningFuser, DeadReckoningMode, OrientationState};
pub use distance::{DistanceModel, Environment, PathLossExponent};
pub use engine::{EngineStats, PositionSink, PositionUpdate, PositioningEngine, UpdateTrigger};
pub use errors::{PositioningError, PositioningResult};
pub use events::{OrientationEvent, ScanEvent, SensorEvent, StepEvent};
pub use filter::{ControlInput, FilterKind, Initialization, StateEstimator};
pub use geometry::{Point2D, RangeClamp};
pub use queue::EventQueue;
pub use ranging::{DistanceEntry, DistanceMap};
pub use registry::{BeaconId, BeaconRecord, BeaconRegistry, DisplayColor, MacAddress, RegistryBuilder};
pub use smoothing::{SignalSmoother, SmoothingPolicy};
pub use solver::{Fix, FixMethod, FusionPolicy, PositionSolver, Range};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
