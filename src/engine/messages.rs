//! Realtime transcription wire messages
//!
//! JSON messages exchanged with the OpenAI Realtime API in transcription mode.

use serde::{Deserialize, Serialize};

/// Messages sent to the service
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub(super) enum ClientMessage {
    /// Session configuration sent after connecting
    #[serde(rename = "transcription_session.update")]
    TranscriptionSessionUpdate { session: SessionConfig },
    /// Append base64 PCM16 audio to the input buffer
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend { audio: String },
    /// Commit the audio buffer for processing
    #[serde(rename = "input_audio_buffer.commit")]
    InputAudioBufferCommit,
}

#[derive(Debug, Serialize)]
pub(super) struct SessionConfig {
    pub input_audio_format: String,
    pub input_audio_transcription: TranscriptionConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_noise_reduction: Option<NoiseReduction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_detection: Option<TurnDetection>,
}

#[derive(Debug, Serialize)]
pub(super) struct NoiseReduction {
    /// "near_field" or "far_field"
    #[serde(rename = "type")]
    pub noise_type: String,
}

#[derive(Debug, Serialize)]
pub(super) struct TranscriptionConfig {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct TurnDetection {
    #[serde(rename = "type")]
    pub detection_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix_padding_ms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub silence_duration_ms: Option<u32>,
}

impl SessionConfig {
    pub fn new(model: &str, language: Option<&str>) -> Self {
        Self {
            input_audio_format: "pcm16".to_string(),
            input_audio_transcription: TranscriptionConfig {
                model: model.to_string(),
                language: language.map(String::from),
            },
            input_audio_noise_reduction: Some(NoiseReduction {
                noise_type: "near_field".to_string(),
            }),
            // Short silences commit a segment quickly so the keyword is seen early.
            turn_detection: Some(TurnDetection {
                detection_type: "server_vad".to_string(),
                threshold: Some(0.5),
                prefix_padding_ms: Some(300),
                silence_duration_ms: Some(200),
            }),
        }
    }
}

/// Messages received from the service
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub(super) enum ServerMessage {
    #[serde(rename = "transcription_session.created")]
    TranscriptionSessionCreated,
    #[serde(rename = "transcription_session.updated")]
    TranscriptionSessionUpdated,
    /// Incremental text of the segment being recognized
    #[serde(rename = "conversation.item.input_audio_transcription.delta")]
    TranscriptionDelta { delta: Option<String> },
    /// Final text of a segment
    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    TranscriptionCompleted { transcript: Option<String> },
    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted,
    #[serde(rename = "input_audio_buffer.speech_stopped")]
    SpeechStopped,
    #[serde(rename = "error")]
    Error { error: Option<ServiceError> },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub(super) struct ServiceError {
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    pub code: Option<String>,
    pub message: Option<String>,
}

impl ServiceError {
    /// Authentication failures reported in-band
    pub fn is_auth(&self) -> bool {
        let code = self.code.as_deref().unwrap_or_default();
        let kind = self.error_type.as_deref().unwrap_or_default();
        code == "invalid_api_key" || kind == "authentication_error"
    }

    /// Committing an empty buffer on stop is expected and harmless
    pub fn is_empty_buffer(&self) -> bool {
        self.code.as_deref() == Some("input_audio_buffer_commit_empty")
            || self
                .message
                .as_deref()
                .is_some_and(|m| m.contains("buffer too small"))
    }

    pub fn describe(&self) -> String {
        self.message
            .clone()
            .or_else(|| self.code.clone())
            .unwrap_or_else(|| "unknown error".to_string())
    }
}
