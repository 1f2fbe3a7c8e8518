//! Beacon registry: identifiers, locations and calibration
//!
//! The registry is built once at startup, either programmatically through
//! [`RegistryBuilder`] or from the line-oriented metadata format, and is
//! read-only afterwards. Components borrow it; nothing mutates it.
//!
//! ## Metadata format
//!
//! One beacon per line, comma separated:
//!
//! ```text
//! macAddress, uuid, major, minor, referencePowerDbm, x, y, colorSpec
//! D0:39:72:A4:00:01,fda50693-a4e2-4fb1-afcf-c6eb07647825,123,456,-62,0.0,0.0,#FF0000
//! ```
//!
//! The beacon id is `uuid_major_minor`. Blank lines and `#` comments are
//! skipped. An empty reference power falls back to
//! [`DEFAULT_REFERENCE_POWER_DBM`].

use core::fmt::{self, Write};

use heapless::{FnvIndexMap, String};

use crate::{
    constants::{
        buffers::{MAX_ADDRESS_LEN, MAX_BEACONS, MAX_BEACON_ID_LEN},
        signal::DEFAULT_REFERENCE_POWER_DBM,
    },
    errors::{PositioningError, PositioningResult},
    geometry::Point2D,
};

/// Stable beacon key, stored inline
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BeaconId(String<MAX_BEACON_ID_LEN>);

impl BeaconId {
    /// Id from an arbitrary key, `None` if too long or empty
    pub fn new(id: &str) -> Option<Self> {
        if id.is_empty() {
            return None;
        }
        let mut inner = String::new();
        inner.push_str(id).ok()?;
        Some(Self(inner))
    }

    /// Id in the `uuid_major_minor` form used by the metadata loader
    pub fn from_ibeacon(uuid: &str, major: u16, minor: u16) -> Option<Self> {
        if uuid.is_empty() {
            return None;
        }
        let mut inner = String::new();
        write!(inner, "{}_{}_{}", uuid, major, minor).ok()?;
        Some(Self(inner))
    }

    /// Borrow as a string slice
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for BeaconId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for BeaconId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for BeaconId {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}", self.as_str())
    }
}

/// Bluetooth device address, normalized to upper case
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MacAddress(String<MAX_ADDRESS_LEN>);

impl MacAddress {
    /// Normalize an address string, `None` if empty or too long
    pub fn new(address: &str) -> Option<Self> {
        let address = address.trim();
        if address.is_empty() {
            return None;
        }
        let mut inner = String::new();
        for c in address.chars() {
            inner.push(c.to_ascii_uppercase()).ok()?;
        }
        Some(Self(inner))
    }

    /// Borrow as a string slice
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for MacAddress {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}", self.as_str())
    }
}

/// Opaque ARGB display color; the engine only carries it for renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayColor(pub u32);

impl DisplayColor {
    /// Opaque black, used when a record has no color
    pub const BLACK: Self = Self(0xFF00_0000);

    const NAMED: [(&'static str, u32); 23] = [
        ("black", 0xFF00_0000),
        ("darkgray", 0xFF44_4444),
        ("darkgrey", 0xFF44_4444),
        ("gray", 0xFF88_8888),
        ("grey", 0xFF88_8888),
        ("lightgray", 0xFFCC_CCCC),
        ("lightgrey", 0xFFCC_CCCC),
        ("silver", 0xFFC0_C0C0),
        ("white", 0xFFFF_FFFF),
        ("red", 0xFFFF_0000),
        ("green", 0xFF00_FF00),
        ("blue", 0xFF00_00FF),
        ("yellow", 0xFFFF_FF00),
        ("cyan", 0xFF00_FFFF),
        ("magenta", 0xFFFF_00FF),
        ("aqua", 0xFF00_FFFF),
        ("fuchsia", 0xFFFF_00FF),
        ("lime", 0xFF00_FF00),
        ("maroon", 0xFF80_0000),
        ("navy", 0xFF00_0080),
        ("olive", 0xFF80_8000),
        ("purple", 0xFF80_0080),
        ("teal", 0xFF00_8080),
    ];

    /// Parse `#RRGGBB`, `#AARRGGBB` or a common color name
    pub fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim();
        if let Some(hex) = spec.strip_prefix('#') {
            let value = u32::from_str_radix(hex, 16).ok()?;
            return match hex.len() {
                6 => Some(Self(0xFF00_0000 | value)),
                8 => Some(Self(value)),
                _ => None,
            };
        }
        Self::NAMED
            .iter()
            .find(|(name, _)| spec.eq_ignore_ascii_case(name))
            .map(|&(_, argb)| Self(argb))
    }

    /// Alpha, red, green, blue components
    pub fn components(&self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

/// Static description of one physical beacon
#[derive(Debug, Clone, PartialEq)]
pub struct BeaconRecord {
    /// Registry key
    pub id: BeaconId,
    /// Advertising address scans arrive from
    pub address: MacAddress,
    /// Fixed position in the floor plan
    pub location: Point2D,
    /// Calibrated RSSI at one meter (dBm)
    pub reference_power: f32,
    /// Color the map view draws this beacon in
    pub color: DisplayColor,
}

impl BeaconRecord {
    /// Record with the default color
    pub fn new(id: BeaconId, address: MacAddress, location: Point2D, reference_power: f32) -> Self {
        Self {
            id,
            address,
            location,
            reference_power,
            color: DisplayColor::BLACK,
        }
    }

    /// Set display color
    pub fn with_color(mut self, color: DisplayColor) -> Self {
        self.color = color;
        self
    }

    /// Parse one metadata line; `line` is the 1-based line number for errors
    pub fn parse_line(text: &str, line: usize) -> PositioningResult<Self> {
        let malformed = |reason| PositioningError::MalformedMetadata { line, reason };

        let mut fields = text.split(',').map(str::trim);
        let mut next = |reason| fields.next().ok_or_else(|| malformed(reason));

        let address = next("missing mac address")?;
        let uuid = next("missing uuid")?;
        let major = next("missing major")?;
        let minor = next("missing minor")?;
        let power = next("missing reference power")?;
        let x = next("missing x")?;
        let y = next("missing y")?;
        let color = next("missing color")?;
        if fields.next().is_some() {
            return Err(malformed("too many fields"));
        }

        let address = MacAddress::new(address).ok_or_else(|| malformed("bad mac address"))?;
        let major: u16 = major.parse().map_err(|_| malformed("bad major"))?;
        let minor: u16 = minor.parse().map_err(|_| malformed("bad minor"))?;
        let id = BeaconId::from_ibeacon(uuid, major, minor).ok_or_else(|| malformed("bad uuid"))?;

        let reference_power = if power.is_empty() {
            DEFAULT_REFERENCE_POWER_DBM
        } else {
            power.parse::<i16>().map_err(|_| malformed("bad reference power"))? as f32
        };

        let x: f32 = x.parse().map_err(|_| malformed("bad x"))?;
        let y: f32 = y.parse().map_err(|_| malformed("bad y"))?;
        let location = Point2D::new(x, y);
        if !location.is_finite() {
            return Err(malformed("location not finite"));
        }

        let color = DisplayColor::parse(color).ok_or_else(|| malformed("bad color"))?;

        Ok(Self::new(id, address, location, reference_power).with_color(color))
    }
}

/// Immutable lookup from beacon id and address to beacon record
#[derive(Debug, Clone, Default)]
pub struct BeaconRegistry {
    records: FnvIndexMap<BeaconId, BeaconRecord, MAX_BEACONS>,
    addresses: FnvIndexMap<MacAddress, BeaconId, MAX_BEACONS>,
}

impl BeaconRegistry {
    /// Start building a registry
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Parse the metadata format, one beacon per line
    pub fn parse(text: &str) -> PositioningResult<Self> {
        let mut builder = Self::builder();
        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let raw = raw.trim();
            if raw.is_empty() || raw.starts_with('#') {
                continue;
            }
            let record = BeaconRecord::parse_line(raw, line)?;
            builder.insert(record, line)?;
        }
        Ok(builder.build())
    }

    /// Record for a beacon id
    pub fn get(&self, id: &BeaconId) -> Option<&BeaconRecord> {
        self.records.get(id)
    }

    /// Beacon id advertised from an address
    pub fn resolve(&self, address: &MacAddress) -> Option<&BeaconId> {
        self.addresses.get(address)
    }

    /// Location of a beacon
    pub fn location(&self, id: &BeaconId) -> Option<Point2D> {
        self.get(id).map(|record| record.location)
    }

    /// Check if a beacon id is registered
    pub fn contains(&self, id: &BeaconId) -> bool {
        self.records.contains_key(id)
    }

    /// Records in load order
    pub fn iter(&self) -> impl Iterator<Item = &BeaconRecord> {
        self.records.values()
    }

    /// Number of beacons
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if no beacons are registered
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// The only way to populate a [`BeaconRegistry`]
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    registry: BeaconRegistry,
}

impl RegistryBuilder {
    /// Add a record, rejecting duplicate ids or addresses
    pub fn add(mut self, record: BeaconRecord) -> PositioningResult<Self> {
        let line = self.registry.len() + 1;
        self.insert(record, line)?;
        Ok(self)
    }

    fn insert(&mut self, record: BeaconRecord, line: usize) -> PositioningResult<()> {
        let registry = &mut self.registry;
        if registry.records.contains_key(&record.id) || registry.addresses.contains_key(&record.address) {
            return Err(PositioningError::DuplicateBeacon { line });
        }
        if !record.location.is_finite() || !record.reference_power.is_finite() {
            return Err(PositioningError::MalformedMetadata {
                line,
                reason: "record not finite",
            });
        }

        let full = PositioningError::CapacityExceeded { capacity: MAX_BEACONS };
        registry
            .addresses
            .insert(record.address.clone(), record.id.clone())
            .map_err(|_| full)?;
        registry.records.insert(record.id.clone(), record).map_err(|_| full)?;
        Ok(())
    }

    /// Freeze the registry
    pub fn build(self) -> BeaconRegistry {
        self.registry
    }
}
