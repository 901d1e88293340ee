//! HTTP API server for external control (the desktop front end)
//!
//! This module provides a REST API for controlling the recording session:
//! - POST /session/start - Start recording
//! - POST /session/stop - Stop recording and validate the file
//! - GET /session - Current session snapshot
//! - GET /recordings - List recordings with estimated durations
//! - POST /recordings/prune - Delete recordings older than a given age
//! - POST /recordings/transcribe - Transcribe a recording, write its sidecar
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
