//! Tracklog files: one type for the three on-disk formats, driven by [`Layout`].

pub mod layout;
pub mod track;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use tracing::debug;

use crate::error::{Result, TkError};
use crate::timezone::ZoneSetting;
use crate::trackpoint::{LogVersion, RECORD_LEN, Trackpoint, trackpoints};

pub use layout::{Layout, export_timestamp};
pub use track::{FooterEntry, Track, path_length_km, segment};

use layout::{
    FOOTER_ENTRY_LEN, HEADER_LEN, HeaderWriter, MARKER_LEN, header_date, read_f32, read_i32,
    read_str, read_timezone, read_u32, read_utf16,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `.tk1`: every track of a logger download plus a footer table.
    Container,
    /// `.tk2`: one track.
    SingleTrack,
    /// `.tk3`: one track holding only push-log points.
    PushOnly,
}

impl Format {
    pub fn layout(self) -> &'static Layout {
        match self {
            Format::Container => &layout::CONTAINER,
            Format::SingleTrack => &layout::SINGLE_TRACK,
            Format::PushOnly => &layout::PUSH_ONLY,
        }
    }

    /// Identifies the format from the marker at the start of a file.
    pub fn detect(bytes: &[u8]) -> Result<Format> {
        let marker = bytes.get(..MARKER_LEN).unwrap_or(bytes);
        [Format::Container, Format::SingleTrack, Format::PushOnly]
            .into_iter()
            .find(|format| marker == &format.layout().marker[..MARKER_LEN])
            .ok_or_else(|| TkError::UnsupportedFormat {
                marker: String::from_utf8_lossy(marker).into_owned(),
            })
    }

    pub fn extension(self) -> &'static str {
        self.layout().extension
    }

    pub fn name(self) -> &'static str {
        match self {
            Format::Container => "TK1 container",
            Format::SingleTrack => "TK2 single track",
            Format::PushOnly => "TK3 push log",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Unloaded,
    Loaded,
    Built,
}

/// Device strings and track settings used when building a file from points.
#[derive(Debug, Clone)]
pub struct Metadata {
    pub device_name: String,
    pub device_info: String,
    pub device_serial: String,
    /// `YYYY_mm_dd_HH:MM:SS`. The current time is used when empty.
    pub export_time: String,
    pub comment: String,
    /// Stored by the single-track formats and used for their date strings.
    pub timezone: UtcOffset,
}

impl Default for Metadata {
    fn default() -> Self {
        Metadata {
            device_name: String::new(),
            device_info: String::new(),
            device_serial: String::new(),
            export_time: String::new(),
            comment: String::new(),
            timezone: UtcOffset::UTC,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TracklogFile {
    format: Format,
    state: State,
    header: Vec<u8>,
    points: Vec<u8>,
    footer: Vec<u8>,
    entries: Vec<FooterEntry>,
    zone: ZoneSetting,
    path: Option<PathBuf>,
}

impl TracklogFile {
    pub fn empty(format: Format) -> Self {
        TracklogFile {
            format,
            state: State::Unloaded,
            header: Vec::new(),
            points: Vec::new(),
            footer: Vec::new(),
            entries: Vec::new(),
            zone: ZoneSetting::default(),
            path: None,
        }
    }

    /// Loads and validates the complete contents of a file of this format.
    pub fn read(&mut self, bytes: &[u8]) -> Result<()> {
        let layout = self.format.layout();
        if bytes.len() < HEADER_LEN {
            return Err(TkError::corrupt(
                bytes.len(),
                format!("file ends inside the {HEADER_LEN} byte header"),
            ));
        }
        if bytes[..MARKER_LEN] != layout.marker[..MARKER_LEN] {
            return Err(TkError::UnsupportedFormat {
                marker: String::from_utf8_lossy(&bytes[..MARKER_LEN]).into_owned(),
            });
        }

        let header = &bytes[..HEADER_LEN];
        let point_count = read_u32(header, layout.point_count) as usize;

        let (points, footer, entries) = match layout.container {
            Some(fields) => {
                let footer_offset = read_u32(header, fields.footer_offset) as usize;
                if footer_offset < HEADER_LEN || footer_offset > bytes.len() {
                    return Err(TkError::corrupt(
                        fields.footer_offset,
                        format!("footer offset {footer_offset:#x} outside of file"),
                    ));
                }
                let footer = &bytes[footer_offset..];
                let track_count = read_u32(header, fields.track_count) as usize;
                if Some(footer.len()) != track_count.checked_mul(FOOTER_ENTRY_LEN) {
                    return Err(TkError::corrupt(
                        footer_offset,
                        format!(
                            "footer holds {} bytes, expected {track_count} entries of {FOOTER_ENTRY_LEN}",
                            footer.len()
                        ),
                    ));
                }
                let points = &bytes[HEADER_LEN..footer_offset];
                let entries = decode_footer(footer, footer_offset, point_count)?;
                (points, footer, entries)
            }
            None => (&bytes[HEADER_LEN..], &bytes[bytes.len()..], Vec::new()),
        };

        if Some(points.len()) != point_count.checked_mul(RECORD_LEN) {
            return Err(TkError::corrupt(
                layout.point_count,
                format!(
                    "point count {point_count} does not match {} bytes of point data",
                    points.len()
                ),
            ));
        }

        self.header = header.to_vec();
        self.points = points.to_vec();
        self.footer = footer.to_vec();
        self.entries = entries;
        if let Some(zone) = self.stored_timezone() {
            self.zone = ZoneSetting::Fixed(zone);
        }
        self.state = State::Loaded;
        debug!(
            format = self.format.name(),
            points = point_count,
            tracks = self.track_count(),
            "read tracklog"
        );
        Ok(())
    }

    /// Detects the format from the marker and reads the file.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut file = TracklogFile::empty(Format::detect(bytes)?);
        file.read(bytes)?;
        Ok(file)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| TkError::from(e).in_file(path))?;
        let mut file = TracklogFile::from_bytes(&bytes).map_err(|e| e.in_file(path))?;
        file.path = Some(path.to_path_buf());
        Ok(file)
    }

    /// Writes header, points and footer exactly as held.
    pub fn write<W: Write>(&self, mut sink: W) -> Result<()> {
        if self.state == State::Unloaded {
            return Err(TkError::IllegalState);
        }
        sink.write_all(&self.header)?;
        sink.write_all(&self.points)?;
        sink.write_all(&self.footer)?;
        sink.flush()?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.header.len() + self.points.len() + self.footer.len());
        self.write(&mut out)?;
        Ok(out)
    }

    /// Builds a new file of `format` from a raw point buffer.
    ///
    /// The push-log format keeps only the push-log points of `points`.
    pub fn build(format: Format, metadata: &Metadata, points: &[u8]) -> Result<Self> {
        let layout = format.layout();
        let points: Vec<u8> = match format {
            Format::PushOnly => trackpoints(points)?
                .filter(|p| p.is_log_point())
                .flat_map(|p| *p.as_bytes())
                .collect(),
            _ => trackpoints(points)?.flat_map(|p| *p.as_bytes()).collect(),
        };
        let point_count = points.len() / RECORD_LEN;

        let export_time = if metadata.export_time.is_empty() {
            export_timestamp(OffsetDateTime::now_utc())?
        } else {
            metadata.export_time.clone()
        };

        let mut writer = HeaderWriter::new(layout.marker);
        writer
            .versions(LogVersion::detect(&points).as_f32())
            .str("device name", layout.device_name, &metadata.device_name)?
            .str("device info", layout.device_info, &metadata.device_info)?
            .str("export time", layout.export_time, &export_time)?;
        if format != Format::PushOnly {
            writer.str("device serial", layout.device_serial, &metadata.device_serial)?;
        }

        let mut footer = Vec::new();
        let mut entries = Vec::new();
        if let Some(fields) = layout.container {
            entries = segment(&points)?;
            footer = entries.iter().flat_map(|e| e.encode()).collect();
            writer
                .bytes(0x1c, &[0x41, 0xbf, 0x10, 0x00])
                .u32(layout.point_count, point_count as u32)
                .u32(fields.footer_offset, (HEADER_LEN + points.len()) as u32)
                .u32(fields.track_count, entries.len() as u32);
        }

        if let Some(fields) = layout.single {
            writer
                .bytes(0x1c, &[0x41, 0xbf])
                .utf16("comment", fields.comment, &metadata.comment)?
                .timezone(fields.timezone, metadata.timezone)
                .u32(layout.point_count, point_count as u32);

            let buffer = trackpoints(&points)?;
            let first = buffer.clone().next();
            let last = buffer.clone().last();
            if let (Some(first), Some(last)) = (first, last) {
                writer.bytes(fields.first_date, header_date(first.timestamp(), metadata.timezone)?.as_bytes());
                if let Some(offset) = fields.last_date {
                    writer.bytes(offset, header_date(last.timestamp(), metadata.timezone)?.as_bytes());
                }
                if let Some(offset) = fields.duration {
                    writer.i32(offset, (last.timestamp() - first.timestamp()).whole_seconds() as i32);
                }
            }
            if let Some(offset) = fields.length {
                let meters = path_length_km(buffer.clone())? * 1000.0;
                writer.i32(offset, meters as i32);
            }
            if let Some(offset) = fields.push_count {
                writer.u32(offset, buffer.filter(|p| p.is_log_point()).count() as u32);
            }
        }

        debug!(format = format.name(), points = point_count, "built tracklog");
        Ok(TracklogFile {
            format,
            state: State::Built,
            header: writer.finish(),
            points,
            footer,
            entries,
            zone: ZoneSetting::Fixed(metadata.timezone),
            path: None,
        })
    }

    /// Turns every track of a container into its own single-track file.
    ///
    /// Push-log output skips tracks without push-log points.
    pub fn split(&self, push_only: bool, comment: &str, timezone: UtcOffset) -> Result<Vec<TracklogFile>> {
        if self.state == State::Unloaded {
            return Err(TkError::IllegalState);
        }
        if self.format != Format::Container {
            return Err(self.not_applicable());
        }
        let metadata = Metadata {
            device_name: self.device_name(),
            device_info: self.device_info(),
            device_serial: self.device_serial(),
            export_time: self.export_time(),
            comment: comment.to_string(),
            timezone,
        };
        let format = if push_only { Format::PushOnly } else { Format::SingleTrack };

        let mut files = Vec::new();
        for track in self.tracks() {
            if push_only && track.push_point_count() == 0 {
                debug!(start = track.start(), "track has no push log points, skipping");
                continue;
            }
            files.push(TracklogFile::build(format, &metadata, track.data())?);
        }
        Ok(files)
    }

    /// Restartable iterator over the tracks of this file.
    pub fn tracks(&self) -> Tracks<'_> {
        Tracks { file: self, next: 0 }
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Point buffer without header and footer.
    pub fn point_data(&self) -> &[u8] {
        &self.points
    }

    pub fn device_name(&self) -> String {
        read_str(&self.header, self.format.layout().device_name)
    }

    pub fn device_info(&self) -> String {
        read_str(&self.header, self.format.layout().device_info)
    }

    pub fn device_serial(&self) -> String {
        read_str(&self.header, self.format.layout().device_serial)
    }

    pub fn export_time(&self) -> String {
        read_str(&self.header, self.format.layout().export_time)
    }

    /// Log version derived from the point flags. The header value is not trusted.
    pub fn log_version(&self) -> LogVersion {
        LogVersion::detect(&self.points)
    }

    /// Log version as written in the header.
    pub fn stored_log_version(&self) -> f32 {
        read_f32(&self.header, layout::LOG_VERSION_OFFSET)
    }

    pub fn point_count(&self) -> usize {
        self.points.len() / RECORD_LEN
    }

    pub fn track_count(&self) -> usize {
        match self.format {
            Format::Container => self.entries.len(),
            _ if self.state == State::Unloaded => 0,
            _ => 1,
        }
    }

    pub fn first_trackpoint(&self) -> Option<Trackpoint<'_>> {
        Trackpoint::new(self.points.get(..RECORD_LEN)?).ok()
    }

    pub fn last_trackpoint(&self) -> Option<Trackpoint<'_>> {
        let from = self.points.len().checked_sub(RECORD_LEN)?;
        Trackpoint::new(&self.points[from..]).ok()
    }

    pub fn push_point_count(&self) -> usize {
        match self.format.layout().single.and_then(|s| s.push_count) {
            Some(offset) => read_u32(&self.header, offset) as usize,
            None if self.format == Format::PushOnly => self.point_count(),
            None => trackpoints(&self.points)
                .map(|points| points.filter(|p| p.is_log_point()).count())
                .unwrap_or(0),
        }
    }

    /// Timezone stored in the header of the single-track formats.
    pub fn stored_timezone(&self) -> Option<UtcOffset> {
        let fields = self.format.layout().single?;
        if self.header.is_empty() {
            return None;
        }
        Some(read_timezone(&self.header, fields.timezone))
    }

    /// Replaces the stored timezone and rewrites the local date strings with it.
    pub fn set_stored_timezone(&mut self, zone: UtcOffset) -> Result<()> {
        let fields = self.single_fields()?;
        let first = self.first_trackpoint().map(|p| p.timestamp());
        let last = self.last_trackpoint().map(|p| p.timestamp());

        let first_date = first.map(|t| header_date(t, zone)).transpose()?;
        let last_date = match (fields.last_date, last) {
            (Some(offset), Some(last)) => Some((offset, header_date(last, zone)?)),
            _ => None,
        };

        let mut writer = HeaderWriter::from_existing(std::mem::take(&mut self.header));
        writer.timezone(fields.timezone, zone);
        if let Some(date) = first_date {
            writer.bytes(fields.first_date, date.as_bytes());
        }
        if let Some((offset, date)) = last_date {
            writer.bytes(offset, date.as_bytes());
        }
        self.header = writer.finish();
        self.zone = ZoneSetting::Fixed(zone);
        Ok(())
    }

    pub fn comment(&self) -> Option<String> {
        let fields = self.format.layout().single?;
        Some(read_utf16(&self.header, fields.comment))
    }

    pub fn set_comment(&mut self, comment: &str) -> Result<()> {
        let fields = self.single_fields()?;
        let mut writer = HeaderWriter::from_existing(std::mem::take(&mut self.header));
        let result = writer.utf16("comment", fields.comment, comment).map(|_| ());
        self.header = writer.finish();
        result
    }

    /// Track duration in seconds and length in meters from a single-track header.
    pub fn stored_track_totals(&self) -> Option<(i32, i32)> {
        let fields = self.format.layout().single?;
        Some((
            fields.duration.map_or(0, |o| read_i32(&self.header, o)),
            fields.length.map_or(0, |o| read_i32(&self.header, o)),
        ))
    }

    /// How the tracks of this file choose their UTC offset.
    pub fn set_timezone(&mut self, zone: ZoneSetting) {
        self.zone = zone;
    }

    pub fn zone_setting(&self) -> ZoneSetting {
        self.zone
    }

    /// File name derived from the point times (UTC), e.g. `080830_1412-080831_0915#003.tk1`
    /// or `20080830_141230.tk2`.
    pub fn canonical_filename(&self) -> Result<Option<String>> {
        let Some(first) = self.first_trackpoint() else {
            return Ok(None);
        };
        let name = match self.format {
            Format::Container => {
                let Some(last) = self.last_trackpoint() else {
                    return Ok(None);
                };
                format!(
                    "{}-{}#{:03}.{}",
                    short_time(first.timestamp())?,
                    short_time(last.timestamp())?,
                    self.track_count(),
                    self.format.extension()
                )
            }
            _ => format!("{}.{}", long_time(first.timestamp())?, self.format.extension()),
        };
        Ok(Some(name))
    }

    fn single_fields(&self) -> Result<layout::SingleTrackFields> {
        if self.state == State::Unloaded {
            return Err(TkError::IllegalState);
        }
        self.format.layout().single.ok_or_else(|| self.not_applicable())
    }

    fn not_applicable(&self) -> TkError {
        TkError::UnsupportedFormat {
            marker: String::from_utf8_lossy(&self.format.layout().marker[..MARKER_LEN]).into_owned(),
        }
    }
}

/// `yymmdd_HHMM`, used in container and multi-file names.
pub fn short_time(time: OffsetDateTime) -> Result<String> {
    Ok(time.format(format_description!("[year repr:last_two][month][day]_[hour][minute]"))?)
}

/// `YYYYmmdd_HHMMSS`, used in single-track names.
pub fn long_time(time: OffsetDateTime) -> Result<String> {
    Ok(time.format(format_description!("[year][month][day]_[hour][minute][second]"))?)
}

fn decode_footer(footer: &[u8], footer_offset: usize, point_count: usize) -> Result<Vec<FooterEntry>> {
    footer
        .chunks_exact(FOOTER_ENTRY_LEN)
        .enumerate()
        .map(|(i, chunk)| {
            let mut raw = [0u8; FOOTER_ENTRY_LEN];
            raw.copy_from_slice(chunk);
            let entry = FooterEntry::decode(&raw);
            let fits = entry.first_record().zip(usize::try_from(entry.point_count).ok());
            match fits {
                Some((first, count)) if first + count <= point_count => Ok(entry),
                _ => Err(TkError::corrupt(
                    footer_offset + i * FOOTER_ENTRY_LEN,
                    format!(
                        "track {} ({} points at {:#x}) lies outside the point data",
                        entry.track_number, entry.point_count, entry.offset
                    ),
                )),
            }
        })
        .collect()
}

/// Iterator over the [`Track`]s of a [`TracklogFile`].
#[derive(Debug, Clone)]
pub struct Tracks<'a> {
    file: &'a TracklogFile,
    next: usize,
}

impl<'a> Iterator for Tracks<'a> {
    type Item = Track<'a>;

    fn next(&mut self) -> Option<Track<'a>> {
        let file = self.file;
        if file.state == State::Unloaded {
            return None;
        }
        let index = self.next;
        self.next += 1;

        match file.format {
            Format::Container => {
                let entry = file.entries.get(index)?;
                Some(Track::new(
                    &file.points,
                    entry.first_record()?,
                    usize::try_from(entry.point_count).ok()?,
                    entry.duration_secs as i64,
                    entry.length_km,
                    file.zone,
                ))
            }
            _ if index == 0 => {
                let (duration, meters) = file.stored_track_totals().unwrap_or((0, 0));
                Some(Track::new(
                    &file.points,
                    0,
                    file.point_count(),
                    duration as i64,
                    meters as f64 / 1000.0,
                    file.zone,
                ))
            }
            _ => None,
        }
    }
}
