use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use tkwrench::timezone::format_offset;
use tkwrench::tracklog::{long_time, short_time};
use tkwrench::{
    Format, Motion, Result, TimezoneResolver, Track, Trackpoint, TracklogFile, calculate_motion,
    format_duration,
};
use tracing::warn;

const CREATOR: &str = "tkwrench";
const GPX_NS: &str = "http://www.topografix.com/GPX/1/1";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str = "http://www.topografix.com/GPX/1/1 http://www.topografix.com/GPX/1/1/gpx.xsd";
const WINTEC_NS: &str = "http://gps.wintec.tw/xsd/";

#[derive(Debug, Clone, Copy)]
pub struct GpxOptions {
    /// Annotate every `<desc>` with local time and offset.
    pub show_timezone: bool,
    /// Abort when an automatic timezone cannot be resolved.
    pub strict_timezone: bool,
    /// Offset used when an automatic lookup fails outside strict mode.
    pub fallback: UtcOffset,
}

impl Default for GpxOptions {
    fn default() -> Self {
        GpxOptions { show_timezone: false, strict_timezone: false, fallback: UtcOffset::UTC }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl Bounds {
    fn around(point: &Trackpoint) -> Self {
        Bounds {
            min_lat: point.latitude(),
            min_lon: point.longitude(),
            max_lat: point.latitude(),
            max_lon: point.longitude(),
        }
    }

    fn extend(&mut self, point: &Trackpoint) {
        self.min_lat = self.min_lat.min(point.latitude());
        self.min_lon = self.min_lon.min(point.longitude());
        self.max_lat = self.max_lat.max(point.latitude());
        self.max_lon = self.max_lon.max(point.longitude());
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Climate {
    pub temperature: i32,
    pub pressure: i32,
}

/// Everything written for one `<wpt>` or `<trkpt>`.
#[derive(Debug, Clone, PartialEq)]
pub struct PointEntry {
    pub lat: f64,
    pub lon: f64,
    pub ele: f64,
    pub time: OffsetDateTime,
    pub motion: Option<Motion>,
    pub zone: Option<UtcOffset>,
    pub climate: Option<Climate>,
}

impl PointEntry {
    fn new(point: &Trackpoint, motion: Option<Motion>, zone: Option<UtcOffset>, climate: bool) -> Self {
        PointEntry {
            lat: point.latitude(),
            lon: point.longitude(),
            ele: point.altitude(),
            time: point.timestamp(),
            motion,
            zone,
            climate: climate.then(|| Climate {
                temperature: point.temperature(),
                pressure: point.air_pressure(),
            }),
        }
    }

    fn description(&self) -> Result<String> {
        let mut desc = format!(
            "Lat.={:.7}, Long.={:.7}, Alt.={}m",
            self.lat, self.lon, self.ele as i64
        );
        if let Some(motion) = &self.motion {
            desc.push_str(&format!(
                ", Speed={}Km/h, Course={}deg",
                motion.speed_kmh as i64, motion.course
            ));
        }
        if let Some(zone) = self.zone {
            let local = self
                .time
                .to_offset(zone)
                .format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))?;
            desc.push_str(&format!(", Local={local}, TZ={}", format_offset(zone)));
        }
        desc.push('.');
        Ok(desc)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub number: usize,
    pub point: PointEntry,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackSegment {
    pub number: usize,
    pub point_count: usize,
    pub duration_secs: i64,
    pub length_km: f64,
    pub points: Vec<PointEntry>,
}

/// In-memory GPX 1.1 document built from decoded tracklog files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpxDocument {
    bounds: Option<Bounds>,
    waypoints: Vec<Waypoint>,
    tracks: Vec<TrackSegment>,
}

impl GpxDocument {
    /// Collects bounds, push-log waypoints and tracks of `files` in the given order.
    pub fn build(files: &[TracklogFile], resolver: &TimezoneResolver, options: &GpxOptions) -> Result<Self> {
        let mut document = GpxDocument::default();
        for file in files {
            document
                .add_file(file, resolver, options)
                .map_err(|e| match file.path() {
                    Some(path) => e.in_file(path),
                    None => e,
                })?;
        }
        Ok(document)
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn tracks(&self) -> &[TrackSegment] {
        &self.tracks
    }

    fn add_file(&mut self, file: &TracklogFile, resolver: &TimezoneResolver, options: &GpxOptions) -> Result<()> {
        let climate = file.log_version().has_climate_data();
        // waypoint speed is measured against the previous point of the file, across tracks
        let mut previous_in_file: Option<Trackpoint> = None;

        for track in file.tracks() {
            let zone = if options.show_timezone {
                Some(track_zone(&track, resolver, options)?)
            } else {
                None
            };
            let mut segment = TrackSegment {
                number: self.tracks.len() + 1,
                point_count: track.point_count(),
                duration_secs: track.duration_secs(),
                length_km: track.length_km(),
                points: Vec::with_capacity(track.point_count()),
            };
            let mut previous_in_track: Option<Trackpoint> = None;

            for point in track.trackpoints() {
                match self.bounds.as_mut() {
                    Some(bounds) => bounds.extend(&point),
                    None => self.bounds = Some(Bounds::around(&point)),
                }

                if point.is_log_point() {
                    let motion = match &previous_in_file {
                        Some(previous) => calculate_motion(previous, &point)?,
                        None => Motion::default(),
                    };
                    self.waypoints.push(Waypoint {
                        number: self.waypoints.len() + 1,
                        point: PointEntry::new(&point, Some(motion), zone, climate),
                    });
                }

                let motion = previous_in_track
                    .map(|previous| calculate_motion(&previous, &point))
                    .transpose()?;
                segment.points.push(PointEntry::new(&point, motion, zone, climate));

                previous_in_file = Some(point);
                previous_in_track = Some(point);
            }
            self.tracks.push(segment);
        }
        Ok(())
    }

    /// Serializes the whole document.
    pub fn to_xml(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 1);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut gpx = BytesStart::new("gpx");
        gpx.push_attribute(("version", "1.1"));
        gpx.push_attribute(("creator", CREATOR));
        gpx.push_attribute(("xmlns", GPX_NS));
        gpx.push_attribute(("xmlns:xsi", XSI_NS));
        gpx.push_attribute(("xsi:schemaLocation", SCHEMA_LOCATION));
        writer.write_event(Event::Start(gpx))?;

        if let Some(bounds) = &self.bounds {
            writer.write_event(Event::Start(BytesStart::new("metadata")))?;
            let mut element = BytesStart::new("bounds");
            element.push_attribute(("minlat", format!("{:.6}", bounds.min_lat).as_str()));
            element.push_attribute(("minlon", format!("{:.6}", bounds.min_lon).as_str()));
            element.push_attribute(("maxlat", format!("{:.6}", bounds.max_lat).as_str()));
            element.push_attribute(("maxlon", format!("{:.6}", bounds.max_lon).as_str()));
            writer.write_event(Event::Empty(element))?;
            writer.write_event(Event::End(BytesEnd::new("metadata")))?;
        }

        for waypoint in &self.waypoints {
            let point = &waypoint.point;
            let mut element = BytesStart::new("wpt");
            element.push_attribute(("lat", format!("{:.6}", point.lat).as_str()));
            element.push_attribute(("lon", format!("{:.6}", point.lon).as_str()));
            writer.write_event(Event::Start(element))?;
            write_ele_and_time(&mut writer, point)?;
            text_element(&mut writer, "name", &format!("Push Log Point #{}", waypoint.number))?;
            text_element(&mut writer, "desc", &point.description()?)?;
            text_element(&mut writer, "sym", "Waypoint")?;
            text_element(&mut writer, "type", "Other")?;
            write_climate(&mut writer, "Waypoint", point.climate)?;
            writer.write_event(Event::End(BytesEnd::new("wpt")))?;
        }

        for track in &self.tracks {
            writer.write_event(Event::Start(BytesStart::new("trk")))?;
            text_element(&mut writer, "name", &format!("Track {:03}", track.number))?;
            text_element(
                &mut writer,
                "desc",
                &format!(
                    "Total Track Points: {}. Total time: {}. Journey: {:.3}Km",
                    track.point_count,
                    format_duration(track.duration_secs),
                    track.length_km
                ),
            )?;
            writer.write_event(Event::Start(BytesStart::new("trkseg")))?;
            for point in &track.points {
                let mut element = BytesStart::new("trkpt");
                element.push_attribute(("lat", format!("{:.7}", point.lat).as_str()));
                element.push_attribute(("lon", format!("{:.7}", point.lon).as_str()));
                writer.write_event(Event::Start(element))?;
                write_ele_and_time(&mut writer, point)?;
                text_element(&mut writer, "desc", &point.description()?)?;
                write_climate(&mut writer, "TrackPoint", point.climate)?;
                writer.write_event(Event::End(BytesEnd::new("trkpt")))?;
            }
            writer.write_event(Event::End(BytesEnd::new("trkseg")))?;
            writer.write_event(Event::End(BytesEnd::new("trk")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("gpx")))?;
        let mut xml = writer.into_inner();
        xml.push(b'\n');
        Ok(xml)
    }
}

fn track_zone(track: &Track, resolver: &TimezoneResolver, options: &GpxOptions) -> Result<UtcOffset> {
    match track.timezone(resolver) {
        Ok(zone) => Ok(zone),
        Err(e) if !options.strict_timezone => {
            warn!(
                "{e}; using {} for track starting at point {}",
                format_offset(options.fallback),
                track.start()
            );
            Ok(options.fallback)
        }
        Err(e) => Err(e),
    }
}

fn text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_ele_and_time(writer: &mut Writer<Vec<u8>>, point: &PointEntry) -> Result<()> {
    text_element(writer, "ele", &format!("{:.6}", point.ele))?;
    let time = point
        .time
        .format(format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z"))?;
    text_element(writer, "time", &time)
}

/// Temperature and air pressure extension of log version 2.0 points.
fn write_climate(writer: &mut Writer<Vec<u8>>, kind: &str, climate: Option<Climate>) -> Result<()> {
    let Some(climate) = climate else {
        return Ok(());
    };
    let name = format!("gpxx:{kind}Extension");
    writer.write_event(Event::Start(BytesStart::new("extensions")))?;
    let mut extension = BytesStart::new(name.as_str());
    extension.push_attribute(("xmlns:gpxx", WINTEC_NS));
    writer.write_event(Event::Start(extension))?;
    text_element(writer, "gpxx:Temperature", &climate.temperature.to_string())?;
    text_element(writer, "gpxx:Pressure", &climate.pressure.to_string())?;
    writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
    writer.write_event(Event::End(BytesEnd::new("extensions")))?;
    Ok(())
}

/// Stable sort by the time of each file's first point.
pub fn sort_chronologically(files: &mut [TracklogFile]) {
    files.sort_by_key(|file| file.first_trackpoint().map(|p| p.timestamp()));
}

/// Output name when none is given: `first-first#files.gpx` for several files,
/// `first-last#tracks.gpx` for one container, `YYYYmmdd_HHMMSS.gpx` otherwise.
pub fn default_output_name(files: &[TracklogFile]) -> Result<Option<String>> {
    let first_time = |file: &TracklogFile| file.first_trackpoint().map(|p| p.timestamp());

    let name = match files {
        [] => None,
        [file] if file.format() == Format::Container => {
            match (first_time(file), file.last_trackpoint().map(|p| p.timestamp())) {
                (Some(first), Some(last)) => Some(format!(
                    "{}-{}#{:03}.gpx",
                    short_time(first)?,
                    short_time(last)?,
                    file.track_count()
                )),
                _ => None,
            }
        }
        [file] => first_time(file).map(|first| long_time(first).map(|t| format!("{t}.gpx"))).transpose()?,
        [first, .., last] => match (first_time(first), first_time(last)) {
            (Some(a), Some(b)) => Some(format!(
                "{}-{}#{:03}.gpx",
                short_time(a)?,
                short_time(b)?,
                files.len()
            )),
            _ => None,
        },
    };
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;
    use time::macros::{datetime, offset};
    use tkwrench::timezone::ZoneLookup;
    use tkwrench::trackpoint::{LOG_POINT, TRACK_START, TrackpointRecord};
    use tkwrench::{Metadata, TkError, ZoneSetting};

    struct FixedLookup(&'static str);

    impl ZoneLookup for FixedLookup {
        fn zone_id(&self, _lat: f64, _lon: f64) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct FailingLookup;

    impl ZoneLookup for FailingLookup {
        fn zone_id(&self, _lat: f64, _lon: f64) -> Result<String> {
            Err(TkError::TimezoneLookupError("service unavailable".to_string()))
        }
    }

    fn points(start: OffsetDateTime, coords: &[(f64, f64)], starts: &[usize], logs: &[usize]) -> Vec<u8> {
        coords
            .iter()
            .enumerate()
            .flat_map(|(i, &(lat, lon))| {
                let mut flags = 0;
                if starts.contains(&i) {
                    flags |= TRACK_START;
                }
                if logs.contains(&i) {
                    flags |= LOG_POINT;
                }
                TrackpointRecord::new(flags, start + Duration::minutes(i as i64), lat, lon, 100)
                    .encode()
            })
            .collect()
    }

    fn single(start: OffsetDateTime, coords: &[(f64, f64)], logs: &[usize]) -> TracklogFile {
        TracklogFile::build(Format::SingleTrack, &Metadata::default(), &points(start, coords, &[0], logs))
            .unwrap()
    }

    fn utc_resolver() -> TimezoneResolver {
        TimezoneResolver::new(FixedLookup("UTC"))
    }

    /// Tests that files are ordered by first point and bounds cover every point.
    #[test]
    fn test_build_orders_files_and_computes_bounds() {
        let later = single(
            datetime!(2008-09-01 10:00 UTC),
            &[(50.0, 7.0), (50.2, 7.3)],
            &[1],
        );
        let earlier = single(
            datetime!(2008-08-30 10:00 UTC),
            &[(49.5, 7.1), (49.6, 6.8)],
            &[0],
        );
        let mut files = vec![later, earlier];
        sort_chronologically(&mut files);

        let document = GpxDocument::build(&files, &utc_resolver(), &GpxOptions::default()).unwrap();
        assert_eq!(document.tracks().len(), 2);
        assert_eq!(
            document.tracks()[0].points[0].time,
            datetime!(2008-08-30 10:00 UTC)
        );
        assert_eq!(document.tracks()[1].number, 2);

        let bounds = document.bounds().unwrap();
        assert!((bounds.min_lat - 49.5).abs() < 1e-9);
        assert!((bounds.max_lat - 50.2).abs() < 1e-9);
        assert!((bounds.min_lon - 6.8).abs() < 1e-9);
        assert!((bounds.max_lon - 7.3).abs() < 1e-9);

        let numbers: Vec<usize> = document.waypoints().iter().map(|w| w.number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    /// Tests that the first waypoint of a file has zero speed and later ones measure from the previous point.
    #[test]
    fn test_waypoint_motion_uses_previous_point_of_file() {
        let file = single(
            datetime!(2010-05-01 08:00 UTC),
            &[(0.0, 0.0), (0.0, 1.0)],
            &[0, 1],
        );
        let document =
            GpxDocument::build(&[file], &utc_resolver(), &GpxOptions::default()).unwrap();
        let waypoints = document.waypoints();
        assert_eq!(waypoints[0].point.motion, Some(Motion::default()));

        // one degree of longitude on the equator in one minute
        let motion = waypoints[1].point.motion.unwrap();
        assert!(
            (motion.speed_kmh - 6679.2).abs() < 10.0,
            "Expected ~6679km/h, got {}",
            motion.speed_kmh
        );
        assert_eq!(motion.course, 90);

        let track = &document.tracks()[0];
        assert!(track.points[0].motion.is_none());
        assert!(track.points[1].motion.is_some());
    }

    /// Tests that the first point of every track has no motion, even within one container.
    #[test]
    fn test_first_point_of_each_track_has_no_motion() {
        let coords = [(48.0, 11.0), (48.001, 11.0), (48.002, 11.0), (48.003, 11.0)];
        let container = TracklogFile::build(
            Format::Container,
            &Metadata::default(),
            &points(datetime!(2009-01-01 00:00 UTC), &coords, &[0, 2], &[2]),
        )
        .unwrap();
        let document =
            GpxDocument::build(&[container], &utc_resolver(), &GpxOptions::default()).unwrap();
        assert_eq!(document.tracks().len(), 2);
        assert!(document.tracks()[1].points[0].motion.is_none());
        // the waypoint still measures against the last point of the previous track
        assert!(document.waypoints()[0].point.motion.unwrap().speed_kmh > 6.0);
    }

    /// Tests that the serialized document is valid GPX readable by the gpx crate.
    #[test]
    fn test_to_xml_validates_with_gpx_crate() {
        use gpx::{Gpx, read};

        let file = single(
            datetime!(2008-08-30 14:12:30 UTC),
            &[(50.6107712, 7.067208), (50.611, 7.068), (50.612, 7.069)],
            &[1],
        );
        let document =
            GpxDocument::build(&[file], &utc_resolver(), &GpxOptions::default()).unwrap();
        let xml = document.to_xml().unwrap();

        let gpx_result: std::result::Result<Gpx, _> = read(xml.as_slice());
        assert!(gpx_result.is_ok(), "{:?}", gpx_result.err());
        let gpx = gpx_result.unwrap();
        assert_eq!(gpx.waypoints.len(), 1);
        assert_eq!(gpx.waypoints[0].name.as_deref(), Some("Push Log Point #1"));
        assert_eq!(gpx.tracks.len(), 1);
        assert_eq!(gpx.tracks[0].name.as_deref(), Some("Track 001"));
        assert_eq!(gpx.tracks[0].segments[0].points.len(), 3);

        let text = String::from_utf8(xml).unwrap();
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(text.contains("<trkpt lat=\"50.6107712\" lon=\"7.0672080\">"));
        assert!(text.contains("<time>2008-08-30T14:12:30Z</time>"));
        assert!(text.contains("<ele>100.000000</ele>"));
        assert!(text.contains("Total Track Points: 3. Total time: 0h2m0s. Journey: "));
        assert!(text.contains("<desc>Lat.=50.6107712, Long.=7.0672080, Alt.=100m.</desc>"));
        assert!(!text.contains("<extensions>"));
    }

    /// Tests that log version 2.0 points carry temperature and pressure.
    #[test]
    fn test_climate_extension_for_log_version_two() {
        let mut data = points(datetime!(2011-02-03 04:05 UTC), &[(1.0, 1.0), (1.0, 1.001)], &[0], &[1]);
        let flags: u16 = (424 << 7) | (20 << 2) | LOG_POINT;
        data[16..18].copy_from_slice(&flags.to_le_bytes());
        let file = TracklogFile::build(Format::SingleTrack, &Metadata::default(), &data).unwrap();

        let document =
            GpxDocument::build(&[file], &utc_resolver(), &GpxOptions::default()).unwrap();
        assert_eq!(
            document.waypoints()[0].point.climate,
            Some(Climate {
                temperature: 30,
                pressure: 1013
            })
        );
        let text = String::from_utf8(document.to_xml().unwrap()).unwrap();
        assert!(text.contains("<gpxx:WaypointExtension xmlns:gpxx=\"http://gps.wintec.tw/xsd/\">"));
        assert!(text.contains("<gpxx:Temperature>30</gpxx:Temperature>"));
        assert!(text.contains("<gpxx:Pressure>1013</gpxx:Pressure>"));
        assert!(text.contains("<gpxx:TrackPointExtension"));
        assert!(gpx::read(text.as_bytes()).is_ok());
    }

    /// Tests that the automatic zone is resolved per track and shown as local time.
    #[test]
    fn test_auto_timezone_annotates_descriptions() {
        let mut file = single(datetime!(2008-08-30 14:12:30 UTC), &[(50.61, 7.06)], &[]);
        file.set_timezone(ZoneSetting::Auto);
        let resolver = TimezoneResolver::new(FixedLookup("Europe/Berlin"));
        let options = GpxOptions {
            show_timezone: true,
            ..GpxOptions::default()
        };

        let document = GpxDocument::build(&[file], &resolver, &options).unwrap();
        let point = &document.tracks()[0].points[0];
        assert_eq!(point.zone, Some(offset!(+2)));
        assert_eq!(
            point.description().unwrap(),
            "Lat.=50.6100000, Long.=7.0600000, Alt.=100m, Local=2008-08-30 16:12:30, TZ=+0200."
        );
    }

    /// Tests that a failed lookup falls back unless strict mode is requested.
    #[test]
    fn test_lookup_failure_fallback_and_strict_mode() {
        let mut file = single(datetime!(2008-08-30 14:12:30 UTC), &[(50.61, 7.06)], &[]);
        file.set_timezone(ZoneSetting::Auto);
        let resolver = TimezoneResolver::new(FailingLookup);

        let lenient = GpxOptions {
            show_timezone: true,
            strict_timezone: false,
            fallback: offset!(+1),
        };
        let document = GpxDocument::build(std::slice::from_ref(&file), &resolver, &lenient).unwrap();
        assert_eq!(document.tracks()[0].points[0].zone, Some(offset!(+1)));

        let strict = GpxOptions {
            strict_timezone: true,
            ..lenient
        };
        let result = GpxDocument::build(&[file], &resolver, &strict);
        assert!(matches!(result, Err(TkError::TimezoneLookupError(_))));
    }

    /// Tests that a convergence failure aborts the build.
    #[test]
    fn test_convergence_failure_aborts() {
        // near-antipodal points cannot be built, so patch a read file instead
        let file = single(datetime!(2008-08-30 14:12:30 UTC), &[(0.0, 0.0), (0.0, 0.1)], &[]);
        let mut bytes = file.to_bytes().unwrap();
        let second = 0x0400 + 16;
        bytes[second + 6..second + 10].copy_from_slice(&5_000_000i32.to_le_bytes());
        bytes[second + 10..second + 14].copy_from_slice(&1_797_000_000i32.to_le_bytes());
        let file = TracklogFile::from_bytes(&bytes).unwrap();

        let result = GpxDocument::build(&[file], &utc_resolver(), &GpxOptions::default());
        assert!(matches!(result, Err(TkError::ConvergenceError { .. })));
    }

    #[test]
    fn test_default_output_names() {
        let a = single(datetime!(2008-08-30 14:12:30 UTC), &[(1.0, 1.0)], &[]);
        let b = single(datetime!(2008-09-02 07:45:00 UTC), &[(1.0, 1.0)], &[]);
        assert_eq!(
            default_output_name(&[a.clone(), b]).unwrap().as_deref(),
            Some("080830_1412-080902_0745#002.gpx")
        );
        assert_eq!(
            default_output_name(std::slice::from_ref(&a)).unwrap().as_deref(),
            Some("20080830_141230.gpx")
        );

        let container = TracklogFile::build(
            Format::Container,
            &Metadata::default(),
            &points(
                datetime!(2008-08-30 14:12:30 UTC),
                &[(1.0, 1.0), (1.0, 1.0), (1.0, 1.0)],
                &[0, 2],
                &[],
            ),
        )
        .unwrap();
        assert_eq!(
            default_output_name(&[container]).unwrap().as_deref(),
            Some("080830_1412-080830_1414#002.gpx")
        );
        assert_eq!(default_output_name(&[]).unwrap(), None);
    }
}
