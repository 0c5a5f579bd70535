//! The freshness marker: a file holding the Unix timestamp at which the stream
//! producer last confirmed it was alive.
//!
//! The producer owns the file; this crate only ever reads it. Only the first
//! line is considered, and only its leading decimal digits. A line without
//! them is reported as a [`MarkerError`], and [`FreshnessMarker::last_seen`]
//! folds every such error into `0` ("never seen").

use std::{
    fs::File,
    io::{BufRead, BufReader, Read},
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::error::MarkerError;

/// Where the producer writes its heartbeat unless configured otherwise.
pub const DEFAULT_MARKER_PATH: &str = "/tmp/bambu_stream_status";

/// Upper bound on bytes read while looking for the first line.
const MAX_LINE_BYTES: u64 = 256;

/// Read-only handle to the marker file.
#[derive(Debug, Clone)]
pub struct FreshnessMarker {
    path: PathBuf,
}

impl FreshnessMarker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the first line of the marker.
    pub fn read_timestamp(&self) -> Result<i64, MarkerError> {
        let file = File::open(&self.path)?;
        let mut line = String::new();
        BufReader::new(file.take(MAX_LINE_BYTES)).read_line(&mut line)?;
        parse_timestamp(&line)
    }

    /// The last heartbeat timestamp, or `0` when the marker is missing,
    /// unreadable, empty, or malformed.
    pub fn last_seen(&self) -> i64 {
        match self.read_timestamp() {
            Ok(ts) => ts,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "freshness marker rejected");
                0
            }
        }
    }
}

/// Parse one marker line into a timestamp.
///
/// Leading whitespace and an optional `+` are skipped, then the leading run of
/// ASCII digits is taken and anything after it is ignored, so
/// `1700000000.25` (from `date +%s.%N`) reads as `1700000000`. A line with no
/// leading digits, or one whose digits overflow `i64`, is malformed.
pub fn parse_timestamp(line: &str) -> Result<i64, MarkerError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(MarkerError::Empty);
    }

    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let digits_end = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());

    unsigned[..digits_end]
        .parse::<i64>()
        .map_err(|_| MarkerError::Malformed(trimmed.to_string()))
}
