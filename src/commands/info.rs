use std::error::Error;
use std::io::{self, Write};

use time::macros::format_description;
use tkwrench::timezone::format_offset;
use tkwrench::tracklog::layout::HEADER_LEN;
use tkwrench::trackpoint::RECORD_LEN;
use tkwrench::{Format, TracklogFile, format_duration};
use tracing::warn;

use super::input_paths;

pub fn info_command(patterns: &[String]) -> Result<(), Box<dyn Error>> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut failed = 0;

    for path in input_paths(patterns)? {
        match TracklogFile::open(&path) {
            Ok(file) => {
                writeln!(out, "{}:", path.display())?;
                describe(&file, &mut out)?;
                writeln!(out)?;
            }
            Err(e) => {
                warn!("{e}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(format!("{failed} file(s) could not be read").into());
    }
    Ok(())
}

/// Header and per-track summary of one file.
pub fn describe<W: Write>(file: &TracklogFile, out: &mut W) -> Result<(), Box<dyn Error>> {
    let date_format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

    writeln!(out, "Format: {}", file.format().name())?;
    writeln!(out, "Device name: {}", file.device_name())?;
    writeln!(out, "Device info: {}", file.device_info())?;
    writeln!(out, "Device serial: {}", file.device_serial())?;
    writeln!(out, "Export time: {}", file.export_time())?;
    writeln!(out, "Log version: {:.1}", file.log_version().as_f32())?;
    if let Some(comment) = file.comment() {
        writeln!(out, "User comment: {comment}")?;
    }
    if let Some(zone) = file.stored_timezone() {
        writeln!(out, "Timezone: {}", format_offset(zone))?;
    }
    writeln!(out, "Trackpoint count: {}", file.point_count())?;
    writeln!(out, "Pushpoint count: {}", file.push_point_count())?;
    writeln!(out, "Track count: {}", file.track_count())?;

    for (number, track) in file.tracks().enumerate() {
        writeln!(out, "Track {number}:")?;
        if file.format() == Format::Container {
            writeln!(out, "  Data offset: {:#x}", HEADER_LEN + track.start() * RECORD_LEN)?;
        }
        writeln!(out, "  Trackpoint count: {}", track.point_count())?;
        if let Some(first) = track.first_point() {
            writeln!(out, "  Track start date: {}", first.timestamp().format(date_format)?)?;
        }
        writeln!(out, "  Duration: {}", format_duration(track.duration_secs()))?;
        writeln!(out, "  Length: {:.2}km", track.length_km())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;
    use time::macros::{datetime, offset};
    use tkwrench::Metadata;
    use tkwrench::trackpoint::{LOG_POINT, TRACK_START, TrackpointRecord};

    fn points(starts: &[usize]) -> Vec<u8> {
        (0..6)
            .flat_map(|i| {
                let flags = if starts.contains(&i) { TRACK_START } else { LOG_POINT };
                TrackpointRecord::new(
                    flags,
                    datetime!(2008-08-30 14:12:30 UTC) + Duration::seconds(30 * i as i64),
                    50.6,
                    7.0 + i as f64 * 0.01,
                    95,
                )
                .encode()
            })
            .collect()
    }

    #[test]
    fn test_describe_container() {
        let metadata = Metadata {
            device_name: "WBT-201".to_string(),
            ..Metadata::default()
        };
        let file = TracklogFile::build(Format::Container, &metadata, &points(&[0, 3])).unwrap();
        let mut out = Vec::new();
        describe(&file, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Format: TK1 container"));
        assert!(text.contains("Device name: WBT-201"));
        assert!(text.contains("Log version: 1.0"));
        assert!(text.contains("Track count: 2"));
        assert!(text.contains("Track 1:\n  Data offset: 0x430\n  Trackpoint count: 3"));
        assert!(text.contains("  Track start date: 2008-08-30 14:12:30"));
        assert!(text.contains("  Duration: 0h1m0s"));
        assert!(!text.contains("User comment"));
    }

    #[test]
    fn test_describe_single_track() {
        let metadata = Metadata {
            comment: "Drachenfels".to_string(),
            timezone: offset!(+2),
            ..Metadata::default()
        };
        let file = TracklogFile::build(Format::SingleTrack, &metadata, &points(&[0])).unwrap();
        let mut out = Vec::new();
        describe(&file, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Format: TK2 single track"));
        assert!(text.contains("User comment: Drachenfels"));
        assert!(text.contains("Timezone: +0200"));
        assert!(text.contains("Pushpoint count: 5"));
        assert!(text.contains("Track count: 1"));
        assert!(text.contains("  Duration: 0h2m30s"));
        assert!(!text.contains("Data offset"));
    }
}
