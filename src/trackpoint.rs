//! Codec for the 16-byte trackpoint record shared by all tracklog formats.
//!
//! ```text
//! 0x00 flags      u16
//! 0x02 timestamp  u32, packed
//! 0x06 latitude   i32, 1e-7 degrees
//! 0x0a longitude  i32, 1e-7 degrees
//! 0x0e altitude   i16, meters
//! ```
//! All fields are little-endian.

use time::{Date, Duration, Month, OffsetDateTime, PrimitiveDateTime, Time};

use crate::error::{Result, TkError};

pub const RECORD_LEN: usize = 16;

pub const TRACK_START: u16 = 0x01;
pub const LOG_POINT: u16 = 0x02;
pub const OVER_SPEED: u16 = 0x04;

/// Flag bits only set by loggers writing log version 2.0 (temperature / air pressure).
pub const V2_FLAG_MASK: u16 = 0b1111_1111_1111_1000;

const TEMPERATURE_MASK: u16 = 0b0000_0000_0111_1100;
const PRESSURE_MASK: u16 = 0b1111_1111_1000_0000;

const COORDINATE_SCALE: f64 = 10_000_000.0;

/// The six bitfields of a packed timestamp, exactly as stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedTimestamp {
    pub year: u8,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl PackedTimestamp {
    pub fn from_bits(bits: u32) -> Self {
        PackedTimestamp {
            second: (bits & 0x3f) as u8,
            minute: ((bits >> 6) & 0x3f) as u8,
            hour: ((bits >> 12) & 0x1f) as u8,
            day: ((bits >> 17) & 0x1f) as u8,
            month: ((bits >> 22) & 0x0f) as u8,
            year: ((bits >> 26) & 0x3f) as u8,
        }
    }

    pub fn to_bits(self) -> u32 {
        (self.second as u32 & 0x3f)
            | (self.minute as u32 & 0x3f) << 6
            | (self.hour as u32 & 0x1f) << 12
            | (self.day as u32 & 0x1f) << 17
            | (self.month as u32 & 0x0f) << 22
            | (self.year as u32 & 0x3f) << 26
    }

    /// Packs a UTC instant. Years outside 2000..=2063 wrap into the 6-bit field.
    pub fn from_datetime(datetime: OffsetDateTime) -> Self {
        let utc = datetime.to_offset(time::UtcOffset::UTC);
        PackedTimestamp {
            year: (utc.year() - 2000).rem_euclid(64) as u8,
            month: utc.month() as u8,
            day: utc.day(),
            hour: utc.hour(),
            minute: utc.minute(),
            second: utc.second(),
        }
    }

    /// Converts to a UTC instant without rejecting impossible field values.
    ///
    /// Out-of-range fields roll over arithmetically: day 0 is the last day of the
    /// previous month, month 0 is December of the previous year, minute 61 is one
    /// minute into the next hour and so on.
    pub fn to_datetime(self) -> OffsetDateTime {
        let months = self.month as i32 - 1;
        let year = 2000 + self.year as i32 + months.div_euclid(12);
        let month = Month::try_from(months.rem_euclid(12) as u8 + 1).unwrap_or(Month::January);
        let first_of_month = Date::from_calendar_date(year, month, 1).unwrap_or(Date::MIN);

        PrimitiveDateTime::new(first_of_month, Time::MIDNIGHT).assume_utc()
            + Duration::days(self.day as i64 - 1)
            + Duration::hours(self.hour as i64)
            + Duration::minutes(self.minute as i64)
            + Duration::seconds(self.second as i64)
    }
}

/// Borrowed view over one trackpoint record.
#[derive(Debug, Clone, Copy)]
pub struct Trackpoint<'a> {
    raw: &'a [u8; RECORD_LEN],
}

impl<'a> Trackpoint<'a> {
    pub fn new(bytes: &'a [u8]) -> Result<Self> {
        let raw = bytes
            .try_into()
            .map_err(|_| TkError::MalformedRecord { len: bytes.len() })?;
        Ok(Trackpoint { raw })
    }

    pub fn as_bytes(&self) -> &'a [u8; RECORD_LEN] {
        self.raw
    }

    pub fn flags(&self) -> u16 {
        u16::from_le_bytes([self.raw[0x00], self.raw[0x01]])
    }

    pub fn is_track_start(&self) -> bool {
        self.flags() & TRACK_START != 0
    }

    pub fn is_log_point(&self) -> bool {
        self.flags() & LOG_POINT != 0
    }

    pub fn is_over_speed(&self) -> bool {
        self.flags() & OVER_SPEED != 0
    }

    pub fn packed_timestamp(&self) -> PackedTimestamp {
        PackedTimestamp::from_bits(self.timestamp_bits())
    }

    /// Recording time of the point, always UTC.
    pub fn timestamp(&self) -> OffsetDateTime {
        self.packed_timestamp().to_datetime()
    }

    pub fn latitude(&self) -> f64 {
        self.raw_latitude() as f64 / COORDINATE_SCALE
    }

    pub fn longitude(&self) -> f64 {
        self.raw_longitude() as f64 / COORDINATE_SCALE
    }

    pub fn altitude(&self) -> f64 {
        self.raw_altitude() as f64
    }

    /// Temperature in degrees Celsius. Only meaningful for log version 2.0.
    pub fn temperature(&self) -> i32 {
        let value = ((self.flags() & TEMPERATURE_MASK) >> 2) as i32;
        2 * value - 10
    }

    /// Air pressure in hectopascal. Only meaningful for log version 2.0.
    pub fn air_pressure(&self) -> i32 {
        ((self.flags() & PRESSURE_MASK) >> 7) as i32 + 589
    }

    pub fn record(&self) -> TrackpointRecord {
        TrackpointRecord {
            flags: self.flags(),
            timestamp: self.packed_timestamp(),
            latitude: self.raw_latitude(),
            longitude: self.raw_longitude(),
            altitude: self.raw_altitude(),
        }
    }

    fn timestamp_bits(&self) -> u32 {
        u32::from_le_bytes([self.raw[0x02], self.raw[0x03], self.raw[0x04], self.raw[0x05]])
    }

    fn raw_latitude(&self) -> i32 {
        i32::from_le_bytes([self.raw[0x06], self.raw[0x07], self.raw[0x08], self.raw[0x09]])
    }

    fn raw_longitude(&self) -> i32 {
        i32::from_le_bytes([self.raw[0x0a], self.raw[0x0b], self.raw[0x0c], self.raw[0x0d]])
    }

    fn raw_altitude(&self) -> i16 {
        i16::from_le_bytes([self.raw[0x0e], self.raw[0x0f]])
    }
}

/// Owned, decoded form of a record. Encodes back to the exact bytes it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackpointRecord {
    pub flags: u16,
    pub timestamp: PackedTimestamp,
    /// Latitude in 1e-7 degrees.
    pub latitude: i32,
    /// Longitude in 1e-7 degrees.
    pub longitude: i32,
    pub altitude: i16,
}

impl TrackpointRecord {
    pub fn new(flags: u16, time: OffsetDateTime, lat: f64, lon: f64, altitude: i16) -> Self {
        TrackpointRecord {
            flags,
            timestamp: PackedTimestamp::from_datetime(time),
            latitude: (lat * COORDINATE_SCALE).round() as i32,
            longitude: (lon * COORDINATE_SCALE).round() as i32,
            altitude,
        }
    }

    pub fn encode(&self) -> [u8; RECORD_LEN] {
        let mut out = [0u8; RECORD_LEN];
        out[0x00..0x02].copy_from_slice(&self.flags.to_le_bytes());
        out[0x02..0x06].copy_from_slice(&self.timestamp.to_bits().to_le_bytes());
        out[0x06..0x0a].copy_from_slice(&self.latitude.to_le_bytes());
        out[0x0a..0x0e].copy_from_slice(&self.longitude.to_le_bytes());
        out[0x0e..0x10].copy_from_slice(&self.altitude.to_le_bytes());
        out
    }
}

/// Iterates the records of a whole point buffer.
pub fn trackpoints(buffer: &[u8]) -> Result<impl Iterator<Item = Trackpoint<'_>> + Clone> {
    if buffer.len() % RECORD_LEN != 0 {
        return Err(TkError::MalformedRecord { len: buffer.len() });
    }
    Ok(buffer.chunks_exact(RECORD_LEN).filter_map(|chunk| Trackpoint::new(chunk).ok()))
}

/// Log format version of a point buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogVersion {
    V1,
    /// Written by loggers with temperature and air pressure sensors.
    V2,
}

impl LogVersion {
    /// Scans the flags of every point. The over-speed bit overlaps the temperature
    /// field, so only bits above it count as evidence for version 2.0.
    pub fn detect(buffer: &[u8]) -> LogVersion {
        let v2 = buffer
            .chunks_exact(RECORD_LEN)
            .any(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]) & V2_FLAG_MASK != 0);
        if v2 { LogVersion::V2 } else { LogVersion::V1 }
    }

    pub fn as_f32(self) -> f32 {
        match self {
            LogVersion::V1 => 1.0,
            LogVersion::V2 => 2.0,
        }
    }

    pub fn has_climate_data(self) -> bool {
        self == LogVersion::V2
    }
}
