pub mod store;
pub mod transcript;
pub mod validate;

pub use store::{RecordingStore, RECORDING_EXT, RECORDING_PREFIX};
pub use transcript::{transcript_path_for, TranscriptRecord};
pub use validate::{
    estimate_duration, validate, DurationEstimate, ValidationError, DEFAULT_MIN_FILE_BYTES,
};
