use super::state::AppState;
use crate::session::SessionError;
use crate::storage::{self, transcript_path_for, DurationEstimate, TranscriptRecord, ValidationError};
use crate::transcription::TranscriptionError;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub status: String,
    pub file_path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct StopSessionResponse {
    pub status: String,
    pub file_path: PathBuf,
    /// Estimated duration of the finished recording, when it could be probed.
    pub duration: Option<DurationEstimate>,
}

#[derive(Debug, Serialize)]
pub struct RecordingEntry {
    pub path: PathBuf,
    pub duration: Option<DurationEstimate>,
    pub has_transcript: bool,
}

#[derive(Debug, Deserialize)]
pub struct PruneRequest {
    pub max_age_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct PruneResponse {
    pub deleted: usize,
}

#[derive(Debug, Deserialize)]
pub struct TranscribeRequest {
    /// File name within the recordings directory.
    pub file: String,
}

#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub text: String,
    pub transcript_path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /session/start
/// Start a new recording session
pub async fn start_session(State(state): State<AppState>) -> impl IntoResponse {
    match state.controller.start().await {
        Ok(path) => (
            StatusCode::OK,
            Json(StartSessionResponse {
                status: "recording".to_string(),
                file_path: path,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("failed to start recording: {}", e);
            error_response(session_error_status(&e), e)
        }
    }
}

/// POST /session/stop
/// Stop the running recording session and validate the file
pub async fn stop_session(State(state): State<AppState>) -> impl IntoResponse {
    match state.controller.stop().await {
        Ok(path) => {
            let duration = storage::estimate_duration(&path).ok();
            (
                StatusCode::OK,
                Json(StopSessionResponse {
                    status: "stopped".to_string(),
                    file_path: path,
                    duration,
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("failed to stop recording: {}", e);
            error_response(session_error_status(&e), e)
        }
    }
}

/// GET /session
/// Current session snapshot
pub async fn session_status(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.controller.snapshot())).into_response()
}

/// GET /recordings
/// List recordings with estimated durations
pub async fn list_recordings(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.list_recordings() {
        Ok(paths) => {
            let entries: Vec<RecordingEntry> = paths
                .into_iter()
                .map(|path| {
                    let duration = storage::estimate_duration(&path).ok();
                    let has_transcript = transcript_path_for(&path).exists();
                    RecordingEntry {
                        path,
                        duration,
                        has_transcript,
                    }
                })
                .collect();
            (StatusCode::OK, Json(entries)).into_response()
        }
        Err(e) => {
            error!("failed to list recordings: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

/// POST /recordings/prune
/// Delete recordings older than the given age (best-effort)
pub async fn prune_recordings(
    State(state): State<AppState>,
    Json(req): Json<PruneRequest>,
) -> impl IntoResponse {
    match state
        .store
        .prune_older_than(std::time::Duration::from_secs(req.max_age_secs))
    {
        Ok(deleted) => (StatusCode::OK, Json(PruneResponse { deleted })).into_response(),
        Err(e) => {
            error!("failed to prune recordings: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

/// POST /recordings/transcribe
/// Submit an existing recording to the transcription service and write the
/// transcript sidecar next to it
pub async fn transcribe_recording(
    State(state): State<AppState>,
    Json(req): Json<TranscribeRequest>,
) -> impl IntoResponse {
    let Some(transcriber) = state.transcriber.clone() else {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "transcription is not configured (missing API key)",
        );
    };

    // The flat recordings directory is the only namespace.
    if req.file.contains('/') || req.file.contains('\\') {
        return error_response(StatusCode::BAD_REQUEST, "file must be a bare name");
    }

    let path = state.store.directory().join(&req.file);
    if let Err(e) = storage::validate(&path, state.store.min_file_bytes()) {
        let status = match e {
            ValidationError::Missing { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        };
        return error_response(status, e);
    }

    let audio = match tokio::fs::read(&path).await {
        Ok(audio) => audio,
        Err(e) => {
            error!("failed to read {}: {}", path.display(), e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, e);
        }
    };

    match transcriber.transcribe(audio, &req.file).await {
        Ok(text) => {
            let record = TranscriptRecord::new(text.clone(), path);
            match record.write_beside() {
                Ok(transcript_path) => {
                    info!("transcribed {}", req.file);
                    (
                        StatusCode::OK,
                        Json(TranscribeResponse {
                            text,
                            transcript_path,
                        }),
                    )
                        .into_response()
                }
                Err(e) => {
                    error!("failed to write transcript sidecar: {}", e);
                    error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
                }
            }
        }
        Err(e) => {
            error!("transcription failed: {}", e);
            error_response(transcription_error_status(&e), e)
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

// ============================================================================
// Error mapping
// ============================================================================

fn error_response(status: StatusCode, err: impl ToString) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

fn session_error_status(err: &SessionError) -> StatusCode {
    match err {
        SessionError::AlreadyRecording | SessionError::NotRecording => StatusCode::CONFLICT,
        SessionError::ToolNotFound => StatusCode::SERVICE_UNAVAILABLE,
        SessionError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SessionError::LaunchFailed(_)
        | SessionError::UnexpectedProcessExit { .. }
        | SessionError::Filesystem(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn transcription_error_status(err: &TranscriptionError) -> StatusCode {
    match err {
        TranscriptionError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        TranscriptionError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
        TranscriptionError::Service { .. } | TranscriptionError::Network(_) => {
            StatusCode::BAD_GATEWAY
        }
    }
}
