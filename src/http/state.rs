use crate::session::SessionController;
use crate::storage::RecordingStore;
use crate::transcription::TranscriptionClient;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The single recording session controller.
    pub controller: Arc<SessionController>,
    /// Recording directory bookkeeping.
    pub store: RecordingStore,
    /// Transcription client, absent when no API key is configured.
    pub transcriber: Option<Arc<TranscriptionClient>>,
}

impl AppState {
    pub fn new(
        controller: Arc<SessionController>,
        store: RecordingStore,
        transcriber: Option<Arc<TranscriptionClient>>,
    ) -> Self {
        Self {
            controller,
            store,
            transcriber,
        }
    }
}
