use hound::WavReader;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::capture::backend::SAMPLE_RATE;

/// Smallest file size considered a plausible recording; anything shorter is
/// a truncated header plus a few samples at best.
pub const DEFAULT_MIN_FILE_BYTES: u64 = 1024;

const BYTES_PER_SAMPLE: u64 = 2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("recording file is missing: {}", path.display())]
    Missing { path: PathBuf },

    #[error("recording file is empty: {}", path.display())]
    Empty { path: PathBuf },

    #[error("recording file is too small ({size} of at least {min} bytes): {}", path.display())]
    TooSmall { path: PathBuf, size: u64, min: u64 },

    #[error("recording file is not a readable WAV: {reason}")]
    InvalidFormat { reason: String },
}

/// Check that a finished recording is present, plausibly sized, and carries a
/// parseable WAV header.
pub fn validate(path: &Path, min_bytes: u64) -> Result<(), ValidationError> {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(_) => {
            return Err(ValidationError::Missing {
                path: path.to_path_buf(),
            })
        }
    };

    let size = metadata.len();
    if size == 0 {
        return Err(ValidationError::Empty {
            path: path.to_path_buf(),
        });
    }
    if size < min_bytes {
        return Err(ValidationError::TooSmall {
            path: path.to_path_buf(),
            size,
            min: min_bytes,
        });
    }

    match WavReader::open(path) {
        Ok(_) => Ok(()),
        Err(e) => Err(ValidationError::InvalidFormat {
            reason: e.to_string(),
        }),
    }
}

/// A duration estimate in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DurationEstimate {
    pub seconds: u64,
    /// True when the value came from file-size arithmetic rather than the
    /// WAV header probe. The fallback ignores container overhead, so callers
    /// presenting it should mark it as approximate.
    pub approximate: bool,
}

/// Estimate a recording's duration, rounded to the nearest second.
///
/// Prefers the exact sample count from the WAV header; when the probe fails
/// the size-based fallback assumes the fixed capture format (16 kHz mono,
/// 16-bit) and flags the result as approximate.
pub fn estimate_duration(path: &Path) -> io::Result<DurationEstimate> {
    if let Ok(reader) = WavReader::open(path) {
        let spec = reader.spec();
        let frames = u64::from(reader.duration());
        let rate = u64::from(spec.sample_rate.max(1));
        return Ok(DurationEstimate {
            seconds: (frames + rate / 2) / rate,
            approximate: false,
        });
    }

    let size = fs::metadata(path)?.len();
    let bytes_per_sec = u64::from(SAMPLE_RATE) * BYTES_PER_SAMPLE;
    Ok(DurationEstimate {
        seconds: (size + bytes_per_sec / 2) / bytes_per_sec,
        approximate: true,
    })
}
