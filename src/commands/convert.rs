use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use time::UtcOffset;
use tkwrench::timezone::Geonames;
use tkwrench::{Format, TimezoneResolver, TracklogFile, ZoneSetting, parse_timezone};
use tracing::{debug, info, warn};

use super::input_paths;
use crate::gpxxml::{GpxDocument, GpxOptions, default_output_name, sort_chronologically};

#[derive(Args)]
pub struct ConvertArgs {
    #[arg(short = 'd', long = "dir", value_name = "DIR", help = "Directory to write the GPX file to")]
    pub output_dir: Option<PathBuf>,

    #[arg(short = 'o', long = "output", value_name = "NAME", help = "GPX file name instead of one derived from the point times")]
    pub output: Option<String>,

    #[arg(
        short = 't',
        long = "timezone",
        value_name = "+hh:mm",
        allow_hyphen_values = true,
        conflicts_with = "autotz",
        help = "UTC offset for local times of .tk1 tracks (.tk2/.tk3 use their stored timezone)"
    )]
    pub timezone: Option<String>,

    #[arg(
        long,
        requires = "geonames_user",
        help = "Determine the timezone of .tk1 tracks from their first point"
    )]
    pub autotz: bool,

    #[arg(long, requires = "autotz", help = "Fail instead of falling back to UTC when a timezone lookup fails")]
    pub strict_tz: bool,

    #[arg(long, env = "GEONAMES_USERNAME", value_name = "USER", help = "geonames.org account used for timezone lookups")]
    pub geonames_user: Option<String>,

    #[arg(required = true, value_name = "FILES", help = "Tracklog files or glob patterns")]
    pub files: Vec<String>,
}

pub fn convert_command(args: &ConvertArgs) -> Result<(), Box<dyn Error>> {
    if let Some(dir) = &args.output_dir {
        if !dir.is_dir() {
            return Err(format!("Output directory {} doesn't exist", dir.display()).into());
        }
    }
    let timezone = args.timezone.as_deref().map(parse_timezone).transpose()?;

    let mut files = Vec::new();
    for path in input_paths(&args.files)? {
        match TracklogFile::open(&path) {
            Ok(file) => files.push(file),
            Err(e) => warn!("skipping {e}"),
        }
    }
    if files.is_empty() {
        return Err("No readable tracklog files".into());
    }

    for file in files.iter_mut().filter(|f| f.format() == Format::Container) {
        if args.autotz {
            file.set_timezone(ZoneSetting::Auto);
        } else if let Some(zone) = timezone {
            file.set_timezone(ZoneSetting::Fixed(zone));
        }
    }
    sort_chronologically(&mut files);

    let options = GpxOptions {
        show_timezone: args.autotz || timezone.is_some(),
        strict_timezone: args.strict_tz,
        fallback: timezone.unwrap_or(UtcOffset::UTC),
    };
    let resolver = TimezoneResolver::new(Geonames::new(args.geonames_user.clone().unwrap_or_default()));

    let document = GpxDocument::build(&files, &resolver, &options)?;
    debug!(
        waypoints = document.waypoints().len(),
        tracks = document.tracks().len(),
        bounds = ?document.bounds(),
        "built GPX document"
    );
    let xml = document.to_xml()?;

    let name = match &args.output {
        Some(name) => name.clone(),
        None => default_output_name(&files)?.ok_or("Input files contain no trackpoints")?,
    };
    let path = match &args.output_dir {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    };
    fs::write(&path, xml)?;
    info!(files = files.len(), "wrote {}", path.display());
    println!("{}", path.display());

    Ok(())
}
