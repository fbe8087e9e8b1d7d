//! Audio types and error definitions

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::info;

/// Mono PCM16 audio ready to stream to the transcription service
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl AudioChunk {
    /// Little-endian PCM16 bytes
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }
}

/// Handle for controlling audio capture from outside the capture thread
///
/// Dropping the handle signals the capture thread to stop without waiting for it.
pub struct AudioCaptureHandle {
    pub(super) is_capturing: Arc<AtomicBool>,
    pub(super) thread_handle: Option<JoinHandle<()>>,
}

impl AudioCaptureHandle {
    /// Stop capturing and wait for the capture thread to exit
    pub fn stop(&mut self) {
        self.is_capturing.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
            info!("Audio capture stopped");
        }
    }
}

impl Drop for AudioCaptureHandle {
    fn drop(&mut self) {
        self.is_capturing.store(false, Ordering::SeqCst);
    }
}

/// Errors that can occur during audio capture
#[derive(Debug, thiserror::Error)]
pub enum AudioCaptureError {
    #[error("No audio input device found")]
    NoInputDevice,

    #[error("Audio configuration error: {0}")]
    ConfigError(String),

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("Audio capture thread ended unexpectedly")]
    StreamClosed,

    #[error("Failed to spawn capture thread: {0}")]
    Thread(#[from] std::io::Error),

    #[error("Audio stream error: {0}")]
    StreamError(#[from] cpal::BuildStreamError),

    #[error("Audio play error: {0}")]
    PlayError(#[from] cpal::PlayStreamError),

    #[error("Default config error: {0}")]
    DefaultConfigError(#[from] cpal::DefaultStreamConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_le_bytes() {
        let chunk = AudioChunk {
            samples: vec![1, -1, 256],
            sample_rate: 24000,
        };
        assert_eq!(chunk.to_le_bytes(), vec![0x01, 0x00, 0xff, 0xff, 0x00, 0x01]);
    }
}
