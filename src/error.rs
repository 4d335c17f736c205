use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TkError>;

#[derive(Error, Debug)]
pub enum TkError {
    #[error("malformed trackpoint record: expected a multiple of 16 bytes, got {len}")]
    MalformedRecord { len: usize },

    #[error("corrupt file at byte offset {offset:#x}: {reason}")]
    CorruptFile { offset: usize, reason: String },

    #[error("unsupported file format (marker {marker:?})")]
    UnsupportedFormat { marker: String },

    #[error("tracklog has not been read or built yet")]
    IllegalState,

    #[error("Vincenty formula failed to converge for ({lat1}, {lon1}) -> ({lat2}, {lon2})")]
    ConvergenceError {
        lat1: f64,
        lon1: f64,
        lat2: f64,
        lon2: f64,
    },

    #[error("timezone string {0:?} doesn't match pattern +hh:mm")]
    InvalidTimezoneFormat(String),

    #[error("timezone lookup failed: {0}")]
    TimezoneLookupError(String),

    #[error("{field} is longer than {max} bytes")]
    FieldTooLong { field: &'static str, max: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error(transparent)]
    TimeFormat(#[from] time::error::Format),

    #[error("{}: {source}", path.display())]
    InFile {
        path: PathBuf,
        #[source]
        source: Box<TkError>,
    },
}

impl TkError {
    pub(crate) fn corrupt(offset: usize, reason: impl Into<String>) -> Self {
        Self::CorruptFile {
            offset,
            reason: reason.into(),
        }
    }

    /// Attaches the file the error came from.
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        match self {
            already @ Self::InFile { .. } => already,
            other => Self::InFile {
                path: path.into(),
                source: Box::new(other),
            },
        }
    }
}
