use reqwest::multipart;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::TranscriptionSettings;

#[derive(Debug, Error)]
pub enum TranscriptionError {
    /// The service signalled a rate limit; resubmit later.
    #[error("transcription service rate limit hit: {0}")]
    RateLimited(String),

    /// The service rejected the audio or request shape.
    #[error("transcription service rejected the request: {0}")]
    InvalidRequest(String),

    #[error("transcription service error (status {status}): {message}")]
    Service { status: u16, message: String },

    #[error("transcription request failed: {0}")]
    Network(#[from] reqwest::Error),
}

/// Response shape shared by OpenAI-compatible transcription APIs.
#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Client for an OpenAI-compatible `/audio/transcriptions` endpoint.
///
/// One multipart POST per call, no retries anywhere: every failure requires
/// an explicit resubmission by the caller. All settings are injected at
/// construction time.
pub struct TranscriptionClient {
    http: reqwest::Client,
    settings: TranscriptionSettings,
}

impl TranscriptionClient {
    pub fn new(settings: TranscriptionSettings) -> Result<Self, TranscriptionError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self { http, settings })
    }

    /// Submit one recording for transcription and return the recognized text.
    pub async fn transcribe(
        &self,
        audio: Vec<u8>,
        file_name: &str,
    ) -> Result<String, TranscriptionError> {
        info!(
            "submitting {} ({} bytes) to {}",
            file_name,
            audio.len(),
            self.settings.api_url
        );

        let mut form = multipart::Form::new()
            .text("model", self.settings.model.clone())
            .part(
                "file",
                multipart::Part::bytes(audio)
                    .file_name(file_name.to_string())
                    .mime_str("audio/wav")?,
            );

        // "auto" means let the service detect; the field is omitted entirely.
        if let Some(language) = self.settings.language_code() {
            form = form.text("language", language.to_string());
        }
        if let Some(prompt) = &self.settings.prompt {
            form = form.text("prompt", prompt.clone());
        }

        let response = self
            .http
            .post(&self.settings.api_url)
            .bearer_auth(&self.settings.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(classify_failure(status, message));
        }

        let body: TranscriptionResponse = response.json().await?;
        Ok(body.text)
    }
}

fn classify_failure(status: StatusCode, message: String) -> TranscriptionError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => TranscriptionError::RateLimited(message),
        StatusCode::BAD_REQUEST
        | StatusCode::PAYLOAD_TOO_LARGE
        | StatusCode::UNSUPPORTED_MEDIA_TYPE
        | StatusCode::UNPROCESSABLE_ENTITY => TranscriptionError::InvalidRequest(message),
        _ => TranscriptionError::Service {
            status: status.as_u16(),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_is_classified() {
        let err = classify_failure(StatusCode::TOO_MANY_REQUESTS, "slow down".to_string());
        assert!(matches!(err, TranscriptionError::RateLimited(_)));
    }

    #[test]
    fn malformed_input_is_classified() {
        for status in [
            StatusCode::BAD_REQUEST,
            StatusCode::PAYLOAD_TOO_LARGE,
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            StatusCode::UNPROCESSABLE_ENTITY,
        ] {
            let err = classify_failure(status, "bad audio".to_string());
            assert!(
                matches!(err, TranscriptionError::InvalidRequest(_)),
                "status {status} should map to InvalidRequest"
            );
        }
    }

    #[test]
    fn other_failures_keep_their_status() {
        let err = classify_failure(StatusCode::BAD_GATEWAY, "upstream".to_string());
        match err {
            TranscriptionError::Service { status, .. } => assert_eq!(status, 502),
            other => panic!("expected Service error, got {other:?}"),
        }
    }
}
