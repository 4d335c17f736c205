use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use clap::Args;
use time::UtcOffset;
use tkwrench::{Format, TracklogFile, parse_timezone};
use tracing::info;

#[derive(Args)]
pub struct SplitArgs {
    #[arg(short = 'd', long = "dir", value_name = "DIR", help = "Directory to write the track files to")]
    pub output_dir: Option<PathBuf>,

    #[arg(
        short = 't',
        long = "timezone",
        value_name = "+hh:mm",
        allow_hyphen_values = true,
        help = "Timezone stored in the new files"
    )]
    pub timezone: Option<String>,

    #[arg(long, help = "Write .tk3 files with only the push log points")]
    pub push_only: bool,

    #[arg(long, default_value = "", help = "User comment stored in the new files")]
    pub comment: String,

    #[arg(value_name = "FILE", help = "A .tk1 container file")]
    pub file: PathBuf,
}

pub fn split_command(args: &SplitArgs) -> Result<(), Box<dyn Error>> {
    if let Some(dir) = &args.output_dir {
        if !dir.is_dir() {
            return Err(format!("Output directory {} doesn't exist", dir.display()).into());
        }
    }
    let timezone = match &args.timezone {
        Some(s) => parse_timezone(s)?,
        None => UtcOffset::UTC,
    };

    let container = TracklogFile::open(&args.file)?;
    if container.format() != Format::Container {
        return Err(format!(
            "{} is a {} file, expected a TK1 container",
            args.file.display(),
            container.format().name()
        )
        .into());
    }

    let tracks = container.split(args.push_only, &args.comment, timezone)?;
    for track in &tracks {
        let Some(name) = track.canonical_filename()? else {
            continue;
        };
        let path = match &args.output_dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        };
        track.write(BufWriter::new(File::create(&path)?))?;
        info!(points = track.point_count(), "wrote {}", path.display());
        println!("{}", path.display());
    }

    Ok(())
}
