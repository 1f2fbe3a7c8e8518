//! Trace Replay for the Positioning Engine
//!
//! ## Overview
//!
//! Host-side tooling to run recorded sessions through `beaconloc-core`
//! exactly the way a device would: events are pushed into the engine's
//! [`EventQueue`] from a producer thread while the calling thread drains
//! the queue and owns the engine.
//!
//! ```text
//! trace.csv ─→ producer thread ─→ EventQueue ─→ PositioningEngine ─→ fixes.jsonl
//! ```
//!
//! ## Inputs
//!
//! - Beacon metadata, one beacon per line (see `BeaconRegistry::parse`)
//! - A trace, one sensor event per line (see [`trace`])
//! - Optionally a JSON `PositioningConfig`; missing fields take defaults
//!
//! ## Output
//!
//! One JSON object per position update:
//!
//! ```text
//! {"timestamp":1200,"x":5.01,"y":4.98,"trigger":"averaged","distances":{"..._1_1":7.07}}
//! ```

use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path,
    sync::atomic::{AtomicBool, Ordering},
    thread,
};

use beaconloc_core::{
    constants::EVENT_QUEUE_CAPACITY, BeaconRegistry, EventQueue, PositionUpdate, PositioningConfig,
    PositioningEngine, SensorEvent, UpdateTrigger,
};
use serde::Serialize;

pub mod error;
pub mod trace;

pub use error::{ReplayError, ReplayResult};
pub use trace::{read_trace, TraceReader};

/// Load beacon metadata from disk
pub fn load_registry(path: impl AsRef<Path>) -> ReplayResult<BeaconRegistry> {
    let text = fs::read_to_string(path)?;
    let registry = BeaconRegistry::parse(&text)?;
    log::info!("Loaded {} beacons", registry.len());
    Ok(registry)
}

/// Load and validate a JSON engine configuration
pub fn load_config(path: impl AsRef<Path>) -> ReplayResult<PositioningConfig> {
    let text = fs::read_to_string(path)?;
    let config: PositioningConfig = serde_json::from_str(&text)?;
    config.validate()?;
    Ok(config)
}

/// One line of replay output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixRecord {
    pub timestamp: u64,
    pub x: f32,
    pub y: f32,
    pub trigger: &'static str,
    pub distances: BTreeMap<String, f32>,
}

impl From<&PositionUpdate> for FixRecord {
    fn from(update: &PositionUpdate) -> Self {
        let trigger = match update.trigger {
            UpdateTrigger::Fix(method) => method.as_str(),
            UpdateTrigger::Step => "step",
        };
        Self {
            timestamp: update.timestamp,
            x: update.position.x,
            y: update.position.y,
            trigger,
            distances: update
                .distances
                .iter()
                .map(|(id, distance)| (id.as_str().to_owned(), *distance))
                .collect(),
        }
    }
}

/// What a replay did
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReplaySummary {
    /// Events the engine processed
    pub events: usize,
    /// Position updates written
    pub updates: usize,
    pub scans: u32,
    pub fixes: u32,
    pub steps: u32,
    pub unknown_beacons: u32,
    pub rejected_measurements: u32,
    pub failed_fixes: u32,
    /// Last fused position
    pub final_position: Option<[f32; 2]>,
}

fn write_record<W: Write>(writer: &mut W, update: &PositionUpdate) -> ReplayResult<()> {
    serde_json::to_writer(&mut *writer, &FixRecord::from(update))?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Run `events` through a fresh engine, writing each update as a JSON line
///
/// Events are produced on a separate thread and consumed here; a full
/// queue makes the producer wait, so nothing is dropped.
pub fn replay<W: Write>(
    registry: &BeaconRegistry,
    config: PositioningConfig,
    events: Vec<SensorEvent>,
    mut writer: W,
) -> ReplayResult<ReplaySummary> {
    let mut engine = PositioningEngine::new(registry, config)?;
    let queue = EventQueue::<EVENT_QUEUE_CAPACITY>::new();
    let produced = AtomicBool::new(false);

    let mut processed = 0;
    let mut updates = 0;
    let mut write_error = None;

    thread::scope(|scope| {
        scope.spawn(|| {
            for mut event in events {
                while let Err(rejected) = queue.try_push(event) {
                    event = rejected;
                    thread::yield_now();
                }
            }
            produced.store(true, Ordering::Release);
        });

        let mut sink = |update: &PositionUpdate| {
            updates += 1;
            if write_error.is_none() {
                if let Err(err) = write_record(&mut writer, update) {
                    write_error = Some(err);
                }
            }
        };

        loop {
            let finished = produced.load(Ordering::Acquire);
            processed += engine.drain(&queue, &mut sink);
            if finished && queue.is_empty() {
                break;
            }
            thread::yield_now();
        }
    });

    if let Some(err) = write_error {
        return Err(err);
    }
    writer.flush()?;

    let stats = engine.stats();
    let summary = ReplaySummary {
        events: processed,
        updates,
        scans: stats.scans,
        fixes: stats.fixes,
        steps: stats.steps,
        unknown_beacons: stats.unknown_beacons,
        rejected_measurements: stats.rejected_measurements,
        failed_fixes: stats.failed_fixes,
        final_position: engine.position().map(|p| [p.x, p.y]),
    };

    if stats.unknown_beacons > 0 {
        log::warn!("{} scans came from unregistered beacons", stats.unknown_beacons);
    }
    log::info!("Replayed {} events into {} updates", summary.events, summary.updates);
    Ok(summary)
}

/// Replay files on disk into a JSON-lines output file
pub fn replay_files(
    metadata: impl AsRef<Path>,
    trace: impl AsRef<Path>,
    config: Option<&Path>,
    output: impl AsRef<Path>,
) -> ReplayResult<ReplaySummary> {
    let registry = load_registry(metadata)?;
    let config = match config {
        Some(path) => load_config(path)?,
        None => PositioningConfig::default(),
    };
    let events = read_trace(trace)?;
    let writer = BufWriter::new(File::create(output)?);
    replay(&registry, config, events, writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use beaconloc_core::{ScanEvent, StepEvent};

    const FLOOR: &str = "\
AA:00:00:00:00:01,fda50693-a4e2-4fb1-afcf-c6eb07647825,1,1,-62,0.0,0.0,red
AA:00:00:00:00:02,fda50693-a4e2-4fb1-afcf-c6eb07647825,1,2,-62,10.0,0.0,green
AA:00:00:00:00:03,fda50693-a4e2-4fb1-afcf-c6eb07647825,1,3,-62,5.0,10.0,blue
";

    fn sweeps(count: u64) -> Vec<SensorEvent> {
        let mut events = Vec::new();
        for round in 0..count {
            for (i, (address, rssi)) in
                [("AA:00:00:00:00:01", -79), ("AA:00:00:00:00:02", -79), ("AA:00:00:00:00:03", -76)]
                    .into_iter()
                    .enumerate()
            {
                events.push(ScanEvent::new(address, rssi, round * 100 + i as u64).unwrap().into());
            }
        }
        events
    }

    #[test]
    fn replay_writes_one_line_per_update() {
        let registry = BeaconRegistry::parse(FLOOR).unwrap();
        let mut events = sweeps(10);
        events.push(StepEvent::new(5_000).into());

        let mut output = Vec::new();
        let summary = replay(&registry, PositioningConfig::default(), events, &mut output).unwrap();

        assert_eq!(summary.events, 31);
        assert_eq!(summary.updates, 28);
        assert_eq!(summary.fixes, 28);
        assert_eq!(summary.steps, 0);

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 28);

        let last: serde_json::Value = serde_json::from_str(lines[27]).unwrap();
        assert_eq!(last["trigger"], "averaged");
        assert_eq!(last["distances"].as_object().unwrap().len(), 3);
        let x = last["x"].as_f64().unwrap();
        let y = last["y"].as_f64().unwrap();
        assert!((x - 5.0).abs() < 0.5 && (y - 5.0).abs() < 0.5);
    }

    #[test]
    fn invalid_config_fails_before_replay() {
        let registry = BeaconRegistry::parse(FLOOR).unwrap();
        let config = PositioningConfig::default().with_path_loss_exponent(-1.0);
        let result = replay(&registry, config, sweeps(1), std::io::sink());
        assert!(matches!(result, Err(ReplayError::Positioning(_))));
    }
}
