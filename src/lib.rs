pub mod capture;
pub mod config;
pub mod http;
pub mod session;
pub mod storage;
pub mod transcription;

pub use capture::{CaptureBackend, CaptureError, CaptureExit, CaptureHandle, SoxBackend};
pub use config::Config;
pub use http::{create_router, AppState};
pub use session::{RecordingSnapshot, SessionController, SessionError, SessionStatus};
pub use storage::{
    DurationEstimate, RecordingStore, TranscriptRecord, ValidationError,
};
pub use transcription::{TranscriptionClient, TranscriptionError};
