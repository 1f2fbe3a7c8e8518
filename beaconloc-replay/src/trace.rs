//! Recorded sensor traces
//!
//! One event per line, comma separated, first field names the source:
//!
//! ```text
//! scan,<timestamp>,<address>,<rssi>
//! orientation,<timestamp>,<azimuth>,<pitch>,<speed>
//! step,<timestamp>
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use std::{
    fs::File,
    io::{BufRead, BufReader, Lines},
    path::Path,
    str::FromStr,
};

use beaconloc_core::{OrientationEvent, ScanEvent, SensorEvent, StepEvent};

use crate::error::{ReplayError, ReplayResult};

/// Streams events out of a trace
pub struct TraceReader<R> {
    lines: Lines<R>,
    line: usize,
}

impl<R: BufRead> TraceReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
        }
    }
}

impl TraceReader<BufReader<File>> {
    /// Open a trace file
    pub fn open(path: impl AsRef<Path>) -> ReplayResult<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> Iterator for TraceReader<R> {
    type Item = ReplayResult<SensorEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let text = match self.lines.next()? {
                Ok(text) => text,
                Err(err) => return Some(Err(err.into())),
            };
            self.line += 1;

            let trimmed = text.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            return Some(parse_line(trimmed, self.line));
        }
    }
}

fn field<T: FromStr>(fields: &[&str], index: usize, name: &str, line: usize) -> ReplayResult<T> {
    let raw = fields.get(index).ok_or_else(|| ReplayError::Trace {
        line,
        reason: format!("missing {name}"),
    })?;
    raw.parse().map_err(|_| ReplayError::Trace {
        line,
        reason: format!("bad {name} '{raw}'"),
    })
}

/// Parse one trace line; `line` is 1-based
pub fn parse_line(text: &str, line: usize) -> ReplayResult<SensorEvent> {
    let fields: Vec<&str> = text.split(',').map(str::trim).collect();
    let expected = match fields[0] {
        "scan" => 4,
        "orientation" => 5,
        "step" => 2,
        other => {
            return Err(ReplayError::Trace {
                line,
                reason: format!("unknown event kind '{other}'"),
            })
        }
    };
    if fields.len() > expected {
        return Err(ReplayError::Trace {
            line,
            reason: format!("expected {expected} fields, found {}", fields.len()),
        });
    }

    let timestamp: u64 = field(&fields, 1, "timestamp", line)?;
    let event = match fields[0] {
        "scan" => {
            let address: String = field(&fields, 2, "address", line)?;
            let rssi: i16 = field(&fields, 3, "rssi", line)?;
            let scan = ScanEvent::new(&address, rssi, timestamp).map_err(|err| ReplayError::Trace {
                line,
                reason: err.to_string(),
            })?;
            SensorEvent::Scan(scan)
        }
        "orientation" => OrientationEvent::new(
            field(&fields, 2, "azimuth", line)?,
            field(&fields, 3, "pitch", line)?,
            field(&fields, 4, "speed", line)?,
            timestamp,
        )
        .into(),
        _ => StepEvent::new(timestamp).into(),
    };
    Ok(event)
}

/// Read a whole trace file
pub fn read_trace(path: impl AsRef<Path>) -> ReplayResult<Vec<SensorEvent>> {
    let events = TraceReader::open(path)?.collect::<ReplayResult<Vec<_>>>()?;
    log::debug!("Loaded {} trace events", events.len());
    Ok(events)
}
