use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// Lifecycle of the single recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No capture has run yet (or the last one was torn down).
    Idle,
    /// The capture process is running.
    Recording,
    /// A stop was requested; waiting for the process to exit and the file to
    /// validate.
    Stopping,
    /// The last capture finished and validated; its file path is retained in
    /// the snapshot. Equivalent to `Idle` for starting a new session.
    Stopped,
    /// The last capture failed (pre-flight, abnormal exit, or validation).
    /// Equivalent to `Idle` for starting a new session.
    Failed,
}

impl SessionStatus {
    /// Whether a new session may start from this state.
    pub fn can_start(self) -> bool {
        matches!(self, Self::Idle | Self::Stopped | Self::Failed)
    }
}

/// Observable session record, published through a watch channel on every
/// state change and once per elapsed second while recording.
#[derive(Debug, Clone, Serialize)]
pub struct RecordingSnapshot {
    pub status: SessionStatus,
    /// Output path, set once capture starts.
    pub file_path: Option<PathBuf>,
    pub started_at: Option<DateTime<Utc>>,
    /// Whole seconds since the capture started. Display-only; duration
    /// enforcement belongs to the capture tool's trim argument.
    pub elapsed_secs: u64,
    pub last_error: Option<String>,
}

impl RecordingSnapshot {
    pub fn idle() -> Self {
        Self {
            status: SessionStatus::Idle,
            file_path: None,
            started_at: None,
            elapsed_secs: 0,
            last_error: None,
        }
    }
}
