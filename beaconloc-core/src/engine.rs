//! The positioning engine
//!
//! Owns every piece of per-beacon state and processes one event at a time.
//! A scan runs the full pipeline:
//!
//! 1. resolve the advertising address against the registry
//! 2. push the RSSI into the beacon's smoothing window
//! 3. convert the smoothed RSSI to a raw distance
//! 4. filter the distance with the beacon's Kalman filter
//! 5. store it in the distance map, evicting stale beacons if configured
//! 6. with three or more beacons ranged, solve and dead-reckon a fix
//!
//! Orientation events only update the last known orientation. Step events
//! advance the position when step integration is on. Any failure along the
//! way is counted in [`EngineStats`] and the event yields no update.

use heapless::Vec;

use crate::{
    config::PositioningConfig,
    constants::buffers::MAX_BEACONS,
    dead_reckoning::{DeadReckoningFuser, OrientationState},
    distance::DistanceModel,
    errors::{PositioningError, PositioningResult},
    events::{ScanEvent, SensorEvent},
    filter::{ControlInput, StateEstimator},
    geometry::Point2D,
    queue::EventQueue,
    ranging::DistanceMap,
    registry::{BeaconId, BeaconRegistry},
    smoothing::SignalSmoother,
    solver::{FixMethod, PositionSolver},
    time::Timestamp,
};

/// What produced a position update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateTrigger {
    /// A multilateration fix
    Fix(FixMethod),
    /// A step advanced the previous position
    Step,
}

/// Position published to the consumer
#[derive(Debug, Clone, PartialEq)]
pub struct PositionUpdate {
    /// Fused position
    pub position: Point2D,
    /// Timestamp of the event that produced it
    pub timestamp: Timestamp,
    /// Fix or step
    pub trigger: UpdateTrigger,
    /// Snapshot of every ranged beacon's filtered distance
    pub distances: Vec<(BeaconId, f32), MAX_BEACONS>,
}

/// Receives position updates
pub trait PositionSink {
    /// Called once per update, in event order
    fn on_update(&mut self, update: &PositionUpdate);
}

impl<F> PositionSink for F
where
    F: FnMut(&PositionUpdate),
{
    fn on_update(&mut self, update: &PositionUpdate) {
        self(update)
    }
}

/// Engine counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Scan events received
    pub scans: u32,
    /// Scans from addresses absent from the registry
    pub unknown_beacons: u32,
    /// Scans rejected as unusable measurements
    pub rejected_measurements: u32,
    /// Filters reset after a singular update
    pub filter_resets: u32,
    /// Fixes produced
    pub fixes: u32,
    /// Fix attempts rejected for degenerate geometry
    pub failed_fixes: u32,
    /// Steps applied to the position
    pub steps: u32,
    /// Beacons evicted for going quiet
    pub evictions: u32,
}

/// Single-consumer positioning pipeline over a borrowed registry
pub struct PositioningEngine<'r> {
    registry: &'r BeaconRegistry,
    config: PositioningConfig,
    smoother: SignalSmoother,
    model: DistanceModel,
    estimator: StateEstimator,
    distances: DistanceMap,
    solver: PositionSolver,
    fuser: DeadReckoningFuser,
    orientation: OrientationState,
    stats: EngineStats,
}

impl<'r> PositioningEngine<'r> {
    /// Validate `config` and build an engine with empty state
    pub fn new(registry: &'r BeaconRegistry, config: PositioningConfig) -> PositioningResult<Self> {
        config.validate()?;

        let engine = Self {
            registry,
            config,
            smoother: SignalSmoother::new(config.window_size, config.smoothing)?,
            model: DistanceModel::new(config.exponent()?),
            estimator: StateEstimator::new(config.filter)?,
            distances: DistanceMap::new(),
            solver: PositionSolver::new(config.fusion, config.range_clamp),
            fuser: DeadReckoningFuser::new(config.dead_reckoning, config.range_clamp),
            orientation: OrientationState::default(),
            stats: EngineStats::default(),
        };

        log_info!("Positioning engine ready with {} beacons", registry.len());
        Ok(engine)
    }

    /// Process one event, returning the position update it produced
    pub fn handle(&mut self, event: SensorEvent) -> Option<PositionUpdate> {
        match event {
            SensorEvent::Scan(scan) => match self.on_scan(&scan) {
                Ok(update) => Some(update),
                Err(err) => {
                    self.record_failure(&scan, err);
                    None
                }
            },
            SensorEvent::Orientation(event) => {
                self.orientation = event.orientation;
                None
            }
            SensorEvent::Step(event) => {
                let position = self.fuser.on_step(&self.orientation)?;
                self.stats.steps += 1;
                Some(self.update(position, event.timestamp, UpdateTrigger::Step))
            }
        }
    }

    /// Process every queued event, handing updates to `sink`
    ///
    /// Returns the number of events processed.
    pub fn drain<const N: usize>(&mut self, queue: &EventQueue<N>, sink: &mut impl PositionSink) -> usize {
        let mut processed = 0;
        for event in queue.drain() {
            processed += 1;
            if let Some(update) = self.handle(event) {
                sink.on_update(&update);
            }
        }
        processed
    }

    fn on_scan(&mut self, scan: &ScanEvent) -> PositioningResult<PositionUpdate> {
        self.stats.scans += 1;

        let registry = self.registry;
        let id = registry.resolve(&scan.address).ok_or(PositioningError::UnknownBeacon)?;
        let record = registry.get(id).ok_or(PositioningError::UnknownBeacon)?;

        let smoothed = self.smoother.observe(id, scan.rssi, scan.timestamp)?;
        let raw = self.model.estimate(smoothed, record.reference_power)?;
        let filtered = self.estimator.predict_and_update(id, raw, ControlInput::NONE)?;
        self.distances.record(id, filtered, scan.timestamp)?;

        if let Some(max_age) = self.config.stale_after_ms {
            let evicted = self.distances.evict_stale(scan.timestamp, max_age);
            self.stats.evictions += evicted as u32;
        }

        let fix = self.solver.solve(registry, &self.distances)?;
        let position = self.fuser.fuse(fix.position, &self.orientation);
        self.stats.fixes += 1;
        log_debug!("Fix {} via {}", position, fix.method);

        Ok(self.update(position, scan.timestamp, UpdateTrigger::Fix(fix.method)))
    }

    fn record_failure(&mut self, scan: &ScanEvent, err: PositioningError) {
        match err {
            PositioningError::UnknownBeacon => {
                self.stats.unknown_beacons += 1;
                log_debug!("Ignoring scan from unregistered {}", scan.address);
            }
            PositioningError::InvalidMeasurement => {
                self.stats.rejected_measurements += 1;
                log_debug!("Rejected measurement from {}", scan.address);
            }
            PositioningError::SingularMatrix => self.stats.filter_resets += 1,
            PositioningError::InsufficientBeacons { .. } => {}
            PositioningError::SingularGeometry { .. } => {
                self.stats.failed_fixes += 1;
                log_debug!("No fix: {}", err);
            }
            _ => log_warn!("Scan from {} failed: {}", scan.address, err),
        }
    }

    fn update(&self, position: Point2D, timestamp: Timestamp, trigger: UpdateTrigger) -> PositionUpdate {
        let mut distances = Vec::new();
        for (id, entry) in self.distances.iter() {
            if distances.push((id.clone(), entry.distance)).is_err() {
                break;
            }
        }
        PositionUpdate {
            position,
            timestamp,
            trigger,
            distances,
        }
    }

    /// Forget all ranging and position state, keeping configuration
    pub fn reset(&mut self) -> PositioningResult<()> {
        self.smoother = SignalSmoother::new(self.config.window_size, self.config.smoothing)?;
        self.estimator = StateEstimator::new(self.config.filter)?;
        self.distances.clear();
        self.fuser.reset();
        self.orientation = OrientationState::default();
        log_info!("Positioning engine reset");
        Ok(())
    }

    /// Filtered distances
    pub fn distances(&self) -> &DistanceMap {
        &self.distances
    }

    /// Current fused position
    pub fn position(&self) -> Option<Point2D> {
        self.fuser.position()
    }

    /// Last known orientation
    pub fn orientation(&self) -> &OrientationState {
        &self.orientation
    }

    /// Counters since construction
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Active configuration
    pub fn config(&self) -> &PositioningConfig {
        &self.config
    }

    /// Registry in use
    pub fn registry(&self) -> &'r BeaconRegistry {
        self.registry
    }

    /// Smoothed RSSI per beacon
    pub fn smoother(&self) -> &SignalSmoother {
        &self.smoother
    }

    /// Per-beacon filters
    pub fn estimator(&self) -> &StateEstimator {
        &self.estimator
    }
}
