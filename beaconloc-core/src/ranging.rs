//! Filtered distance per beacon
//!
//! The map the solver reads. An entry is overwritten each time its beacon
//! is ranged and keeps the position in insertion order it got on first
//! sighting, which the solver uses to break distance ties. Entries are
//! never non-finite.

use heapless::{FnvIndexMap, Vec};

use crate::{
    constants::buffers::MAX_BEACONS,
    errors::{PositioningError, PositioningResult},
    registry::BeaconId,
    time::{elapsed_ms, Timestamp},
};

/// Latest filtered distance for one beacon
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceEntry {
    /// Filtered distance
    pub distance: f32,
    /// Timestamp of the scan that produced it
    pub last_seen: Timestamp,
    seq: u64,
}

impl DistanceEntry {
    /// Insertion rank of the beacon, lower was seen first
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// `{BeaconId → filtered distance}` with first-sighting order
#[derive(Debug, Clone, Default)]
pub struct DistanceMap {
    entries: FnvIndexMap<BeaconId, DistanceEntry, MAX_BEACONS>,
    next_seq: u64,
}

impl DistanceMap {
    /// Empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a beacon's distance, keeping its original insertion rank
    pub fn record(&mut self, id: &BeaconId, distance: f32, timestamp: Timestamp) -> PositioningResult<()> {
        if !distance.is_finite() {
            return Err(PositioningError::InvalidMeasurement);
        }

        if let Some(entry) = self.entries.get_mut(id) {
            entry.distance = distance;
            entry.last_seen = timestamp;
            return Ok(());
        }

        let entry = DistanceEntry {
            distance,
            last_seen: timestamp,
            seq: self.next_seq,
        };
        self.entries
            .insert(id.clone(), entry)
            .map_err(|_| PositioningError::CapacityExceeded { capacity: MAX_BEACONS })?;
        self.next_seq += 1;
        Ok(())
    }

    /// Distance for a beacon
    pub fn get(&self, id: &BeaconId) -> Option<f32> {
        self.entries.get(id).map(|entry| entry.distance)
    }

    /// Full entry for a beacon
    pub fn entry(&self, id: &BeaconId) -> Option<&DistanceEntry> {
        self.entries.get(id)
    }

    /// Remove entries not refreshed within `max_age_ms` of `now`
    ///
    /// Returns how many were removed.
    pub fn evict_stale(&mut self, now: Timestamp, max_age_ms: u64) -> usize {
        let stale: Vec<BeaconId, MAX_BEACONS> = self
            .entries
            .iter()
            .filter(|(_, entry)| elapsed_ms(entry.last_seen, now) > max_age_ms)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &stale {
            log_info!("Evicting stale beacon {}", id);
            self.entries.remove(id);
        }
        stale.len()
    }

    /// Entries in map order
    pub fn iter(&self) -> impl Iterator<Item = (&BeaconId, &DistanceEntry)> {
        self.entries.iter()
    }

    /// Number of ranged beacons
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing has been ranged
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> BeaconId {
        BeaconId::new(name).unwrap()
    }

    #[test]
    fn overwrite_keeps_insertion_rank() {
        let mut map = DistanceMap::new();
        map.record(&id("a"), 2.0, 0).unwrap();
        map.record(&id("b"), 3.0, 0).unwrap();
        map.record(&id("a"), 4.0, 10).unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&id("a")), Some(4.0));
        let a = map.entry(&id("a")).unwrap();
        assert_eq!(a.seq(), 0);
        assert_eq!(a.last_seen, 10);
        assert_eq!(map.entry(&id("b")).unwrap().seq(), 1);
    }

    #[test]
    fn non_finite_distances_never_enter() {
        let mut map = DistanceMap::new();
        assert_eq!(map.record(&id("a"), f32::NAN, 0), Err(PositioningError::InvalidMeasurement));
        assert_eq!(map.record(&id("a"), f32::INFINITY, 0), Err(PositioningError::InvalidMeasurement));
        assert!(map.is_empty());
    }

    #[test]
    fn eviction_by_age() {
        let mut map = DistanceMap::new();
        map.record(&id("old"), 1.0, 1_000).unwrap();
        map.record(&id("fresh"), 1.0, 4_500).unwrap();

        assert_eq!(map.evict_stale(5_000, 2_000), 1);
        assert!(map.get(&id("old")).is_none());
        assert!(map.get(&id("fresh")).is_some());

        // Exactly at the limit stays
        assert_eq!(map.evict_stale(6_500, 2_000), 0);
    }

    #[test]
    fn rank_survives_removal() {
        let mut map = DistanceMap::new();
        map.record(&id("a"), 1.0, 0).unwrap();
        map.record(&id("b"), 1.0, 100).unwrap();
        map.record(&id("c"), 1.0, 100).unwrap();
        map.evict_stale(100, 50);

        let mut ranks: std::vec::Vec<u64> = map.iter().map(|(_, e)| e.seq()).collect();
        ranks.sort_unstable();
        assert_eq!(ranks, vec![1, 2]);
    }
}
