//! Fixed UTC offsets for tracks: explicit, or derived from the first point's coordinates.
//!
//! Automatic zones are frozen into a fixed offset at the first point's instant. A
//! track crossing a daylight saving transition keeps one offset, matching cameras
//! and other devices whose clocks do not adjust themselves.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{Offset, TimeZone};
use quick_xml::Reader;
use quick_xml::events::Event;
use time::{OffsetDateTime, UtcOffset};
use tracing::debug;

use crate::error::{Result, TkError};
use crate::trackpoint::Trackpoint;

pub const GEONAMES_URL: &str = "http://api.geonames.org/timezone";

/// How the offset of a track is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneSetting {
    Fixed(UtcOffset),
    /// Looked up from the first point of each track.
    Auto,
}

impl Default for ZoneSetting {
    fn default() -> Self {
        ZoneSetting::Fixed(UtcOffset::UTC)
    }
}

/// Parses `+hh:mm`, `-hh:mm` or `hh:mm` into a fixed offset.
pub fn parse_timezone(s: &str) -> Result<UtcOffset> {
    let invalid = || TkError::InvalidTimezoneFormat(s.to_string());

    let (sign, rest) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;

    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(hours) || hours.len() > 2 || !all_digits(minutes) || minutes.len() != 2 {
        return Err(invalid());
    }

    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    UtcOffset::from_whole_seconds(sign * (hours * 60 + minutes) * 60).map_err(|_| invalid())
}

/// Formats an offset like `+0200`.
pub fn format_offset(offset: UtcOffset) -> String {
    let minutes = offset.whole_minutes();
    let sign = if minutes < 0 { '-' } else { '+' };
    let minutes = minutes.unsigned_abs();
    format!("{sign}{:02}{:02}", minutes / 60, minutes % 60)
}

/// Source of IANA zone identifiers for coordinates.
pub trait ZoneLookup {
    fn zone_id(&self, lat: f64, lon: f64) -> Result<String>;
}

/// Blocking client for the geonames.org `timezone` web service.
pub struct Geonames {
    agent: ureq::Agent,
    url: String,
    username: String,
}

impl Geonames {
    pub fn new(username: impl Into<String>) -> Self {
        Self::with_url(GEONAMES_URL, username)
    }

    pub fn with_url(url: impl Into<String>, username: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(15))
            .build();
        Geonames {
            agent,
            url: url.into(),
            username: username.into(),
        }
    }
}

impl ZoneLookup for Geonames {
    fn zone_id(&self, lat: f64, lon: f64) -> Result<String> {
        debug!(lat, lon, url = %self.url, "querying timezone service");
        let body = self
            .agent
            .get(&self.url)
            .query("lat", &lat.to_string())
            .query("lng", &lon.to_string())
            .query("username", &self.username)
            .call()
            .map_err(|e| TkError::TimezoneLookupError(e.to_string()))?
            .into_string()
            .map_err(|e| TkError::TimezoneLookupError(e.to_string()))?;
        parse_geonames_response(&body)
    }
}

/// Extracts `<timezoneId>` from a geonames response, or the service's error message.
pub fn parse_geonames_response(body: &str) -> Result<String> {
    let mut reader = Reader::from_reader(body.as_bytes());
    let mut buf = Vec::new();
    let mut in_zone_id = false;
    let mut zone_id = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) if e.name().as_ref() == b"timezoneId" => {
                in_zone_id = true;
            }
            Event::End(ref e) if e.name().as_ref() == b"timezoneId" => {
                in_zone_id = false;
            }
            Event::Text(ref e) if in_zone_id => {
                if let Ok(text) = std::str::from_utf8(e) {
                    zone_id.push_str(text);
                }
            }
            Event::Start(ref e) | Event::Empty(ref e) if e.name().as_ref() == b"status" => {
                let message = e
                    .attributes()
                    .flatten()
                    .find(|attr| attr.key.as_ref() == b"message")
                    .and_then(|attr| std::str::from_utf8(&attr.value).ok().map(str::to_string))
                    .unwrap_or_else(|| "unknown service error".to_string());
                return Err(TkError::TimezoneLookupError(message));
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    let zone_id = zone_id.trim();
    if zone_id.is_empty() {
        return Err(TkError::TimezoneLookupError(
            "response contains no timezoneId".to_string(),
        ));
    }
    Ok(zone_id.to_string())
}

/// Offset in effect for `zone_id` at `instant`, as a fixed offset in whole minutes.
pub fn offset_at(zone_id: &str, instant: OffsetDateTime) -> Result<UtcOffset> {
    let zone: chrono_tz::Tz = zone_id
        .parse()
        .map_err(|_| TkError::TimezoneLookupError(format!("unknown timezone id {zone_id:?}")))?;
    let utc = chrono::DateTime::from_timestamp(instant.unix_timestamp(), 0)
        .ok_or_else(|| TkError::TimezoneLookupError(format!("instant {instant} out of range")))?;
    let seconds = zone.offset_from_utc_datetime(&utc.naive_utc()).fix().local_minus_utc();
    UtcOffset::from_whole_seconds(seconds / 60 * 60)
        .map_err(|e| TkError::TimezoneLookupError(e.to_string()))
}

/// Resolves automatic zones, remembering the zone id of every coordinate it has seen.
pub struct TimezoneResolver {
    lookup: Box<dyn ZoneLookup>,
    cache: Mutex<HashMap<(u64, u64), String>>,
}

impl TimezoneResolver {
    pub fn new(lookup: impl ZoneLookup + 'static) -> Self {
        TimezoneResolver {
            lookup: Box::new(lookup),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Zone id for the exact coordinate, asking the lookup only once per coordinate.
    pub fn zone_id(&self, lat: f64, lon: f64) -> Result<String> {
        let key = (lat.to_bits(), lon.to_bits());
        if let Some(zone_id) = self.cache.lock().unwrap_or_else(|e| e.into_inner()).get(&key) {
            return Ok(zone_id.clone());
        }

        let zone_id = self.lookup.zone_id(lat, lon)?;
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, zone_id.clone());
        Ok(zone_id)
    }

    pub fn resolve(&self, point: &Trackpoint<'_>) -> Result<UtcOffset> {
        let zone_id = self.zone_id(point.latitude(), point.longitude())?;
        let offset = offset_at(&zone_id, point.timestamp())?;
        debug!(zone_id = %zone_id, offset = %format_offset(offset), "resolved timezone");
        Ok(offset)
    }
}
