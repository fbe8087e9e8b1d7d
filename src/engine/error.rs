//! Error types for the speech engine

use crate::audio::AudioCaptureError;

/// WebSocket connection timeout in seconds
pub(super) const WS_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Errors that end a recognition session
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Microphone unavailable: {0}")]
    AudioCapture(#[from] AudioCaptureError),

    #[error("Credentials rejected: {0}")]
    NotAllowed(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Connection timeout - service did not respond within {WS_CONNECT_TIMEOUT_SECS} seconds")]
    ConnectionTimeout,

    #[error("Connection lost")]
    ConnectionLost,

    #[error("Service error: {0}")]
    Service(String),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl EngineError {
    /// Short error code reported to the controller
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::AudioCapture(_) => "audio-capture",
            EngineError::NotAllowed(_) => "not-allowed",
            EngineError::Connection(_)
            | EngineError::ConnectionTimeout
            | EngineError::ConnectionLost => "network",
            EngineError::Service(_) => "service",
            EngineError::InvalidEndpoint(_) => "service-not-allowed",
        }
    }
}
