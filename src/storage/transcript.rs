use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

/// Transcript sidecar stored next to its recording: same basename, `.json`
/// extension, human-inspectable two-space-indented JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptRecord {
    /// Recognized text.
    pub text: String,
    /// When the transcription completed.
    pub timestamp: DateTime<Utc>,
    /// The recording this transcript was produced from. The audio file may
    /// later be deleted independently of the sidecar.
    pub audio_file: PathBuf,
}

/// Sidecar path for a recording: same basename, `.json` extension.
pub fn transcript_path_for(audio: &Path) -> PathBuf {
    audio.with_extension("json")
}

impl TranscriptRecord {
    pub fn new(text: String, audio_file: PathBuf) -> Self {
        Self {
            text,
            timestamp: Utc::now(),
            audio_file,
        }
    }

    /// Write the sidecar next to its recording, replacing any previous
    /// transcript whole. Returns the sidecar path.
    pub fn write_beside(&self) -> io::Result<PathBuf> {
        let path = transcript_path_for(&self.audio_file);
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        fs::write(&path, json)?;
        info!("transcript written: {}", path.display());
        Ok(path)
    }

    pub fn read(path: &Path) -> io::Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}
