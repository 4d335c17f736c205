pub mod error;
pub mod geodesy;
pub mod timezone;
pub mod trackpoint;
pub mod tracklog;

use std::error::Error;
use std::path::PathBuf;

pub use error::{Result, TkError};
pub use timezone::{TimezoneResolver, ZoneSetting, parse_timezone};
pub use trackpoint::{LogVersion, Trackpoint};
pub use tracklog::{Format, Metadata, Track, TracklogFile};

/// Speed and course from one point to the next.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Motion {
    pub distance_km: f64,
    pub speed_kmh: f64,
    /// Initial bearing rounded to whole degrees.
    pub course: i64,
}

/// Geodesic speed between two points in km/h. Zero when no time passed.
pub fn calculate_motion(p1: &Trackpoint, p2: &Trackpoint) -> Result<Motion> {
    let geodesic = geodesy::vincenty(p1.latitude(), p1.longitude(), p2.latitude(), p2.longitude())?;
    let seconds = (p2.timestamp() - p1.timestamp()).whole_seconds();

    let speed_kmh = if seconds != 0 {
        geodesic.distance_km / (seconds as f64 / 3600.0)
    } else {
        0.0
    };

    Ok(Motion {
        distance_km: geodesic.distance_km,
        speed_kmh,
        course: geodesic.rounded_bearing(),
    })
}

/// Formats seconds like `1h2m5s`.
pub fn format_duration(seconds: i64) -> String {
    let minutes = seconds.div_euclid(60);
    let hours = minutes.div_euclid(60);
    format!("{}h{}m{}s", hours, minutes.rem_euclid(60), seconds.rem_euclid(60))
}

/// Expands shell-style patterns. Patterns matching nothing are dropped.
pub fn expand_inputs(patterns: &[String]) -> std::result::Result<Vec<PathBuf>, Box<dyn Error>> {
    let mut paths = Vec::new();
    for pattern in patterns {
        for entry in glob::glob(pattern)? {
            paths.push(entry?);
        }
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trackpoint::TrackpointRecord;
    use time::macros::datetime;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0h0m0s");
        assert_eq!(format_duration(3725), "1h2m5s");
        assert_eq!(format_duration(90061), "25h1m1s");
    }

    #[test]
    fn test_calculate_motion() {
        let a = TrackpointRecord::new(0, datetime!(2020-01-01 12:00:00 UTC), 0.0, 0.0, 0).encode();
        let b = TrackpointRecord::new(0, datetime!(2020-01-01 13:00:00 UTC), 0.0, 1.0, 0).encode();
        let p1 = Trackpoint::new(&a).unwrap();
        let p2 = Trackpoint::new(&b).unwrap();

        let motion = calculate_motion(&p1, &p2).unwrap();
        // 1 degree of longitude on the equator in one hour
        assert!(
            (motion.speed_kmh - 111.32).abs() < 0.2,
            "Expected ~111.32km/h, got {}",
            motion.speed_kmh
        );
        assert_eq!(motion.course, 90);

        let still = calculate_motion(&p1, &p1).unwrap();
        assert_eq!(still.speed_kmh, 0.0);
        assert_eq!(still.course, 0);
    }

    #[test]
    fn test_zero_elapsed_time_has_zero_speed() {
        let a = TrackpointRecord::new(0, datetime!(2020-01-01 12:00:00 UTC), 10.0, 10.0, 0).encode();
        let b = TrackpointRecord::new(0, datetime!(2020-01-01 12:00:00 UTC), 10.1, 10.0, 0).encode();
        let motion =
            calculate_motion(&Trackpoint::new(&a).unwrap(), &Trackpoint::new(&b).unwrap()).unwrap();
        assert_eq!(motion.speed_kmh, 0.0);
        assert!(motion.distance_km > 11.0);
        assert_eq!(motion.course, 0);
    }

    #[test]
    fn test_expand_inputs_drops_unmatched_patterns() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.tk1"), b"").unwrap();
        std::fs::write(dir.path().join("b.tk2"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let pattern = dir.path().join("*.tk?").to_string_lossy().into_owned();
        let missing = dir.path().join("*.gpx").to_string_lossy().into_owned();
        let paths = expand_inputs(&[pattern, missing]).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("a.tk1"));
        assert!(paths[1].ends_with("b.tk2"));
    }
}
