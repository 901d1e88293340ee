use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;

use crate::storage::DEFAULT_MIN_FILE_BYTES;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub recording: RecordingConfig,
    pub capture: CaptureConfig,
    pub transcription: TranscriptionSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Recordings directory; defaults to `~/.voxnote/recordings`.
    pub directory: Option<PathBuf>,
    /// Hard duration cap passed through to the capture tool.
    pub max_duration_secs: u64,
    /// Smallest file size accepted by post-capture validation.
    pub min_file_bytes: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Explicit capture tool path, skipping the well-known-location search.
    pub tool: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    pub api_url: String,
    /// Usually supplied as VOXNOTE_TRANSCRIPTION__API_KEY rather than in the
    /// file. Empty disables the transcription endpoints.
    pub api_key: String,
    pub model: String,
    /// ISO language code, or "auto" to let the service detect.
    pub language: String,
    /// Free-text context passed to the service.
    pub prompt: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "voxnote".to_string(),
            http: HttpConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8738,
        }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            max_duration_secs: 600,
            min_file_bytes: DEFAULT_MIN_FILE_BYTES,
        }
    }
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com/v1/audio/transcriptions".to_string(),
            api_key: String::new(),
            model: "whisper-1".to_string(),
            language: "auto".to_string(),
            prompt: None,
            timeout_secs: 120,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file (extension omitted, config crate
    /// convention), layered under VOXNOTE_-prefixed environment variables,
    /// e.g. `VOXNOTE_TRANSCRIPTION__API_KEY`.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("VOXNOTE").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl RecordingConfig {
    /// Recordings directory with the home-relative default applied.
    pub fn resolved_directory(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".voxnote")
                .join("recordings")
        })
    }
}

impl TranscriptionSettings {
    /// Language code for the request, or None when auto-detecting.
    pub fn language_code(&self) -> Option<&str> {
        let language = self.language.trim();
        if language.is_empty() || language.eq_ignore_ascii_case("auto") {
            None
        } else {
            Some(language)
        }
    }

    /// Whether an API key is configured at all.
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = Config::default();
        assert_eq!(config.service.http.port, 8738);
        assert_eq!(config.recording.max_duration_secs, 600);
        assert!(!config.transcription.is_configured());
    }

    #[test]
    fn auto_language_is_omitted() {
        let mut settings = TranscriptionSettings::default();
        assert_eq!(settings.language_code(), None);

        settings.language = "AUTO".to_string();
        assert_eq!(settings.language_code(), None);

        settings.language = " en ".to_string();
        assert_eq!(settings.language_code(), Some("en"));
    }
}
