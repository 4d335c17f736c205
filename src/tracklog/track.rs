use std::cell::OnceCell;

use time::UtcOffset;

use crate::error::Result;
use crate::geodesy::vincenty;
use crate::timezone::{TimezoneResolver, ZoneSetting};
use crate::trackpoint::{RECORD_LEN, Trackpoint, trackpoints};

use super::layout::{FOOTER_ENTRY_LEN, HEADER_LEN};

/// One continuous recording segment, borrowed from its file's point buffer.
#[derive(Debug, Clone)]
pub struct Track<'a> {
    buffer: &'a [u8],
    start: usize,
    count: usize,
    duration_secs: i64,
    length_km: f64,
    zone: ZoneSetting,
    resolved: OnceCell<UtcOffset>,
}

impl<'a> Track<'a> {
    /// `start` and `count` are in records, not bytes.
    pub(crate) fn new(
        buffer: &'a [u8],
        start: usize,
        count: usize,
        duration_secs: i64,
        length_km: f64,
        zone: ZoneSetting,
    ) -> Self {
        Track {
            buffer,
            start,
            count,
            duration_secs,
            length_km,
            zone,
            resolved: OnceCell::new(),
        }
    }

    /// Index of the first record of this track within the file's point buffer.
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn point_count(&self) -> usize {
        self.count
    }

    pub fn duration_secs(&self) -> i64 {
        self.duration_secs
    }

    pub fn length_km(&self) -> f64 {
        self.length_km
    }

    /// Raw records of this track.
    pub fn data(&self) -> &'a [u8] {
        let from = self.start * RECORD_LEN;
        let to = from + self.count * RECORD_LEN;
        self.buffer.get(from..to).unwrap_or_default()
    }

    pub fn trackpoints(&self) -> impl Iterator<Item = Trackpoint<'a>> + Clone + use<'a> {
        self.data()
            .chunks_exact(RECORD_LEN)
            .filter_map(|chunk| Trackpoint::new(chunk).ok())
    }

    pub fn point(&self, index: usize) -> Option<Trackpoint<'a>> {
        if index >= self.count {
            return None;
        }
        let from = index * RECORD_LEN;
        Trackpoint::new(self.data().get(from..from + RECORD_LEN)?).ok()
    }

    pub fn first_point(&self) -> Option<Trackpoint<'a>> {
        self.point(0)
    }

    pub fn last_point(&self) -> Option<Trackpoint<'a>> {
        self.point(self.count.checked_sub(1)?)
    }

    pub fn push_point_count(&self) -> usize {
        self.trackpoints().filter(|p| p.is_log_point()).count()
    }

    pub fn zone_setting(&self) -> ZoneSetting {
        self.zone
    }

    /// Fixed UTC offset of this track. Automatic zones are resolved from the first
    /// point on first use and kept for the lifetime of this view.
    pub fn timezone(&self, resolver: &TimezoneResolver) -> Result<UtcOffset> {
        match self.zone {
            ZoneSetting::Fixed(offset) => Ok(offset),
            ZoneSetting::Auto => {
                if let Some(offset) = self.resolved.get() {
                    return Ok(*offset);
                }
                let offset = match self.first_point() {
                    Some(point) => resolver.resolve(&point)?,
                    None => UtcOffset::UTC,
                };
                Ok(*self.resolved.get_or_init(|| offset))
            }
        }
    }
}

/// Per-track entry of the container footer table.
///
/// ```text
/// 0x00 track number         i32
/// 0x04 offset of first point i32, absolute file offset
/// 0x08 point count          i32
/// 0x0c duration in seconds  i32
/// 0x10 length in kilometers f64
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FooterEntry {
    pub track_number: i32,
    pub offset: i32,
    pub point_count: i32,
    pub duration_secs: i32,
    pub length_km: f64,
}

impl FooterEntry {
    pub fn decode(bytes: &[u8; FOOTER_ENTRY_LEN]) -> Self {
        let i32_at = |at: usize| i32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        let mut length = [0u8; 8];
        length.copy_from_slice(&bytes[0x10..0x18]);
        FooterEntry {
            track_number: i32_at(0x00),
            offset: i32_at(0x04),
            point_count: i32_at(0x08),
            duration_secs: i32_at(0x0c),
            length_km: f64::from_le_bytes(length),
        }
    }

    pub fn encode(&self) -> [u8; FOOTER_ENTRY_LEN] {
        let mut out = [0u8; FOOTER_ENTRY_LEN];
        out[0x00..0x04].copy_from_slice(&self.track_number.to_le_bytes());
        out[0x04..0x08].copy_from_slice(&self.offset.to_le_bytes());
        out[0x08..0x0c].copy_from_slice(&self.point_count.to_le_bytes());
        out[0x0c..0x10].copy_from_slice(&self.duration_secs.to_le_bytes());
        out[0x10..0x18].copy_from_slice(&self.length_km.to_le_bytes());
        out
    }

    /// Index of the first point within the point buffer, if the offset is sane.
    pub fn first_record(&self) -> Option<usize> {
        let relative = usize::try_from(self.offset).ok()?.checked_sub(HEADER_LEN)?;
        (relative % RECORD_LEN == 0).then_some(relative / RECORD_LEN)
    }
}

/// Running totals of the track currently being segmented.
struct Segment<'a> {
    start: usize,
    count: usize,
    first: Trackpoint<'a>,
    last: Trackpoint<'a>,
    length_km: f64,
}

impl Segment<'_> {
    fn entry(&self, track_number: usize) -> FooterEntry {
        let duration = self.last.timestamp() - self.first.timestamp();
        FooterEntry {
            track_number: track_number as i32,
            offset: (HEADER_LEN + self.start * RECORD_LEN) as i32,
            point_count: self.count as i32,
            duration_secs: duration.whole_seconds() as i32,
            length_km: self.length_km,
        }
    }
}

/// Splits a raw point buffer into tracks and computes their footer entries.
///
/// A track starts at the first point and at every point carrying the track-start
/// flag. Length is the sum of geodesic distances between consecutive points of
/// the same track.
pub fn segment(buffer: &[u8]) -> Result<Vec<FooterEntry>> {
    let mut entries = Vec::new();
    let mut current: Option<Segment<'_>> = None;

    for (index, point) in trackpoints(buffer)?.enumerate() {
        if point.is_track_start() {
            if let Some(done) = current.take() {
                entries.push(done.entry(entries.len()));
            }
        }
        match current.as_mut() {
            Some(segment) => {
                segment.length_km += vincenty(
                    segment.last.latitude(),
                    segment.last.longitude(),
                    point.latitude(),
                    point.longitude(),
                )?
                .distance_km;
                segment.last = point;
                segment.count += 1;
            }
            None => {
                current = Some(Segment {
                    start: index,
                    count: 1,
                    first: point,
                    last: point,
                    length_km: 0.0,
                });
            }
        }
    }
    if let Some(done) = current {
        entries.push(done.entry(entries.len()));
    }
    Ok(entries)
}

/// Sum of geodesic distances between consecutive points, in kilometers.
pub fn path_length_km<'a>(points: impl IntoIterator<Item = Trackpoint<'a>>) -> Result<f64> {
    let mut length = 0.0;
    let mut previous: Option<Trackpoint<'a>> = None;
    for point in points {
        if let Some(prev) = previous {
            length += vincenty(prev.latitude(), prev.longitude(), point.latitude(), point.longitude())?
                .distance_km;
        }
        previous = Some(point);
    }
    Ok(length)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trackpoint::{LOG_POINT, TRACK_START, TrackpointRecord};
    use time::Duration;
    use time::macros::datetime;

    fn buffer_with_starts(n: usize, starts: &[usize]) -> Vec<u8> {
        let t0 = datetime!(2009-05-16 23:59:00 UTC);
        (0..n)
            .flat_map(|i| {
                let flags = if starts.contains(&i) { TRACK_START } else { 0 };
                TrackpointRecord::new(
                    flags,
                    t0 + Duration::seconds(10 * i as i64),
                    48.0 + i as f64 * 0.001,
                    11.0,
                    500,
                )
                .encode()
            })
            .collect()
    }

    #[test]
    fn test_segment_at_track_start_flags() {
        let buffer = buffer_with_starts(20, &[0, 5, 12]);
        let entries = segment(&buffer).unwrap();
        let counts: Vec<i32> = entries.iter().map(|e| e.point_count).collect();
        assert_eq!(counts, vec![5, 7, 8]);
        assert_eq!(entries[1].offset as usize, HEADER_LEN + 5 * RECORD_LEN);
        assert_eq!(entries[2].track_number, 2);
        assert_eq!(entries[0].duration_secs, 40);
        // 23:59:50 to 00:00:50
        assert_eq!(entries[1].duration_secs, 60);
        assert_eq!(entries[2].duration_secs, 70);
    }

    #[test]
    fn test_duration_negative_when_clock_goes_back() {
        let t0 = datetime!(2009-05-16 12:00:00 UTC);
        let buffer: Vec<u8> = [(0, TRACK_START), (30, 0), (-60, 0)]
            .into_iter()
            .flat_map(|(minutes, flags)| {
                TrackpointRecord::new(flags, t0 + Duration::minutes(minutes), 48.0, 11.0, 500).encode()
            })
            .collect();
        let entries = segment(&buffer).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].duration_secs, -3600);
    }

    #[test]
    fn test_first_point_starts_track_without_flag() {
        let buffer = buffer_with_starts(6, &[3]);
        let entries = segment(&buffer).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].point_count, 3);
        assert_eq!(entries[1].point_count, 3);
    }

    #[test]
    fn test_segment_length_resets_per_track() {
        let buffer = buffer_with_starts(10, &[0, 5]);
        let entries = segment(&buffer).unwrap();
        // 4 steps of 0.001 degrees latitude, ~111 m each
        for entry in &entries {
            assert!(
                (entry.length_km - 0.4448).abs() < 0.002,
                "Expected ~0.445km, got {}",
                entry.length_km
            );
        }
    }

    #[test]
    fn test_segment_empty_buffer() {
        assert!(segment(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_footer_entry_roundtrip() {
        let entry = FooterEntry {
            track_number: 3,
            offset: 0x0400 + 0x40,
            point_count: 17,
            duration_secs: 3725,
            length_km: 12.345,
        };
        assert_eq!(FooterEntry::decode(&entry.encode()), entry);
        assert_eq!(entry.first_record(), Some(4));

        let misaligned = FooterEntry { offset: 0x0401, ..entry };
        assert_eq!(misaligned.first_record(), None);
    }

    #[test]
    fn test_track_points_are_views() {
        let mut buffer = buffer_with_starts(4, &[0]);
        buffer[2 * RECORD_LEN] |= LOG_POINT as u8;
        let track = Track::new(&buffer, 1, 3, 0, 0.0, ZoneSetting::Fixed(UtcOffset::UTC));
        assert_eq!(track.trackpoints().count(), 3);
        assert_eq!(track.push_point_count(), 1);
        assert_eq!(track.first_point().unwrap().as_bytes(), &buffer[16..32]);
        assert_eq!(track.last_point().unwrap().as_bytes(), &buffer[48..64]);
        assert!(track.point(3).is_none());
        assert!(std::ptr::eq(track.data().as_ptr(), buffer[16..].as_ptr()));
    }
}
