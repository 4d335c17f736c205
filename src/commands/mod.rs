pub mod convert;
pub mod info;
pub mod split;

use std::error::Error;
use std::path::PathBuf;

use tkwrench::expand_inputs;

/// Expanded input paths, or an error naming the patterns when nothing matches.
pub(crate) fn input_paths(patterns: &[String]) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    let paths = expand_inputs(patterns)?;
    if paths.is_empty() {
        return Err(format!("No input files match {}", patterns.join(" ")).into());
    }
    Ok(paths)
}
