//! Fixed header layouts of the three tracklog formats.
//!
//! Every format has a 1024 byte header followed by the point buffer. Only the
//! container format has a footer table after the points.

use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use crate::error::{Result, TkError};

pub const HEADER_LEN: usize = 0x0400;

/// Number of marker bytes compared when detecting the format.
pub const MARKER_LEN: usize = 12;

pub const FOOTER_ENTRY_LEN: usize = 24;

const SOFTWARE_VERSION: f32 = 1.0;
const HARDWARE_VERSION: f32 = 1.0;

pub(crate) const LOG_VERSION_OFFSET: usize = 0x10;

/// Byte range of a fixed-width, zero-padded header field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub offset: usize,
    pub len: usize,
}

impl Field {
    const fn new(offset: usize, len: usize) -> Self {
        Field { offset, len }
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// Where the single-track formats keep their track data.
#[derive(Debug, Clone, Copy)]
pub struct SingleTrackFields {
    pub comment: Field,
    pub timezone: usize,
    pub first_date: usize,
    pub last_date: Option<usize>,
    pub duration: Option<usize>,
    pub length: Option<usize>,
    pub push_count: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
pub struct ContainerFields {
    pub footer_offset: usize,
    pub track_count: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct Layout {
    pub marker: &'static [u8],
    pub extension: &'static str,
    pub device_name: Field,
    pub device_info: Field,
    pub device_serial: Field,
    pub export_time: Field,
    pub point_count: usize,
    pub container: Option<ContainerFields>,
    pub single: Option<SingleTrackFields>,
}

pub const CONTAINER: Layout = Layout {
    marker: b"WintecLogFormat",
    extension: "tk1",
    device_name: Field::new(0x0028, 20),
    device_info: Field::new(0x003c, 20),
    device_serial: Field::new(0x0050, 40),
    export_time: Field::new(0x0078, 20),
    point_count: 0x0020,
    container: Some(ContainerFields {
        footer_offset: 0x008c,
        track_count: 0x0090,
    }),
    single: None,
};

pub const SINGLE_TRACK: Layout = Layout {
    marker: b"WintecLogTk2",
    extension: "tk2",
    device_name: Field::new(0x001e, 20),
    device_info: Field::new(0x0032, 20),
    device_serial: Field::new(0x0046, 40),
    export_time: Field::new(0x006e, 20),
    point_count: 0x01cc,
    container: None,
    single: Some(SingleTrackFields {
        comment: Field::new(0x0082, 300),
        timezone: 0x01ae,
        first_date: 0x01b1,
        last_date: None,
        duration: Some(0x01d0),
        length: Some(0x01d4),
        push_count: Some(0x01d8),
    }),
};

pub const PUSH_ONLY: Layout = Layout {
    marker: b"WintecLogTk3",
    extension: "tk3",
    point_count: 0x01ed,
    single: Some(SingleTrackFields {
        comment: Field::new(0x0082, 300),
        timezone: 0x01ae,
        first_date: 0x01b1,
        last_date: Some(0x01cf),
        duration: None,
        length: None,
        push_count: None,
    }),
    ..SINGLE_TRACK
};

/// Comments are stored as UTF-16 and limited to 150 code units.
pub const COMMENT_MAX_UNITS: usize = 150;

/// Little-endian accessors over a header buffer. Out-of-range reads yield zero.
pub(crate) fn read_u32(header: &[u8], offset: usize) -> u32 {
    header
        .get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .unwrap_or(0)
}

pub(crate) fn read_i32(header: &[u8], offset: usize) -> i32 {
    read_u32(header, offset) as i32
}

pub(crate) fn read_f32(header: &[u8], offset: usize) -> f32 {
    f32::from_bits(read_u32(header, offset))
}

/// Reads a zero-padded string field, dropping trailing NUL bytes.
pub(crate) fn read_str(header: &[u8], field: Field) -> String {
    let bytes = header.get(field.range()).unwrap_or_default();
    let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

pub(crate) fn read_utf16(header: &[u8], field: Field) -> String {
    let units: Vec<u16> = header
        .get(field.range())
        .unwrap_or_default()
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let end = units.iter().rposition(|&u| u != 0).map_or(0, |i| i + 1);
    String::from_utf16_lossy(&units[..end])
}

/// Reads the stored (sign, hours, minutes) timezone triple.
pub(crate) fn read_timezone(header: &[u8], offset: usize) -> UtcOffset {
    let Some(&[sign, hours, minutes]) = header.get(offset..offset + 3) else {
        return UtcOffset::UTC;
    };
    let total = (hours as i32 * 60 + minutes as i32) * if sign == 0 { -1 } else { 1 };
    UtcOffset::from_whole_seconds(total * 60).unwrap_or(UtcOffset::UTC)
}

/// Zero-initialized header being filled field by field.
pub(crate) struct HeaderWriter {
    buf: Vec<u8>,
}

impl HeaderWriter {
    pub fn new(marker: &[u8]) -> Self {
        let mut buf = vec![0u8; HEADER_LEN];
        buf[..marker.len()].copy_from_slice(marker);
        HeaderWriter { buf }
    }

    pub fn from_existing(header: Vec<u8>) -> Self {
        HeaderWriter { buf: header }
    }

    pub fn bytes(&mut self, offset: usize, bytes: &[u8]) -> &mut Self {
        self.buf[offset..offset + bytes.len()].copy_from_slice(bytes);
        self
    }

    pub fn u32(&mut self, offset: usize, value: u32) -> &mut Self {
        self.bytes(offset, &value.to_le_bytes())
    }

    pub fn i32(&mut self, offset: usize, value: i32) -> &mut Self {
        self.bytes(offset, &value.to_le_bytes())
    }

    pub fn f32(&mut self, offset: usize, value: f32) -> &mut Self {
        self.bytes(offset, &value.to_le_bytes())
    }

    /// Writes `value` zero-padded into `field`. A value filling the whole field has no terminator.
    pub fn str(&mut self, name: &'static str, field: Field, value: &str) -> Result<&mut Self> {
        if value.len() > field.len {
            return Err(TkError::FieldTooLong {
                field: name,
                max: field.len,
            });
        }
        self.buf[field.range()].fill(0);
        Ok(self.bytes(field.offset, value.as_bytes()))
    }

    pub fn utf16(&mut self, name: &'static str, field: Field, value: &str) -> Result<&mut Self> {
        let units: Vec<u16> = value.encode_utf16().collect();
        if units.len() > COMMENT_MAX_UNITS {
            return Err(TkError::FieldTooLong {
                field: name,
                max: COMMENT_MAX_UNITS * 2,
            });
        }
        self.buf[field.range()].fill(0);
        let bytes: Vec<u8> = units.iter().flat_map(|u| u.to_le_bytes()).collect();
        Ok(self.bytes(field.offset, &bytes))
    }

    pub fn timezone(&mut self, offset: usize, zone: UtcOffset) -> &mut Self {
        let minutes = zone.whole_minutes() as i32;
        let sign = if minutes >= 0 { 1 } else { 0 };
        let minutes = minutes.unsigned_abs();
        self.bytes(offset, &[sign, (minutes / 60) as u8, (minutes % 60) as u8])
    }

    /// Common prefix of every header: log, software and hardware versions.
    pub fn versions(&mut self, log_version: f32) -> &mut Self {
        self.f32(LOG_VERSION_OFFSET, log_version)
            .f32(0x14, SOFTWARE_VERSION)
            .f32(0x18, HARDWARE_VERSION)
    }

    pub fn finish(self) -> Vec<u8> {
        debug_assert_eq!(self.buf.len(), HEADER_LEN);
        self.buf
    }
}

/// Formats a point time the way single-track headers store it, e.g.
/// `2008-08-30T16:12:30Z+02:00` (local time, offset appended).
pub(crate) fn header_date(time: OffsetDateTime, zone: UtcOffset) -> Result<String> {
    let format = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second]Z[offset_hour sign:mandatory]:[offset_minute]"
    );
    Ok(time.to_offset(zone).format(format)?)
}

/// Export timestamp as written by the logger software, e.g. `2008_08_30_18:01:55`.
pub fn export_timestamp(time: OffsetDateTime) -> Result<String> {
    let format = format_description!("[year]_[month]_[day]_[hour]:[minute]:[second]");
    Ok(time.format(format)?)
}
