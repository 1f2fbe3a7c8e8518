//! Buffer Constants
//!
//! Fixed capacities for the `heapless` collections. Map capacities must be
//! powers of two for `FnvIndexMap`.

/// Maximum number of beacons in a registry.
///
/// Also sizes every per-beacon map (smoothing windows, filters, distances),
/// so no registered beacon can be turned away by a full map.
///
/// Source: A floor plan rarely has more than a dozen beacons in range
pub const MAX_BEACONS: usize = 16;

/// Maximum RSSI smoothing window.
///
/// The configured window size may be anything in `1..=MAX_WINDOW_SIZE`.
pub const MAX_WINDOW_SIZE: usize = 32;

/// Maximum length of a beacon identifier.
///
/// `uuid_major_minor` is 36 + 1 + 5 + 1 + 5 = 48 characters at most.
pub const MAX_BEACON_ID_LEN: usize = 64;

/// Maximum length of a MAC address string (`AA:BB:CC:DD:EE:FF` is 17).
pub const MAX_ADDRESS_LEN: usize = 24;

/// Event queue capacity.
///
/// Must be a power of two and at most 128 for `heapless::mpmc`.
///
/// Source: ~0.6 s of scan callbacks at 100 Hz with headroom for sensor events
pub const EVENT_QUEUE_CAPACITY: usize = 64;
