//! Speech recognition engine
//!
//! The controller only needs fire-and-forget `start`/`stop` requests and a
//! stream of [`EngineEvent`]s. The realtime implementation streams microphone
//! audio to the OpenAI Realtime API in transcription mode.

mod connection;
mod error;
mod messages;
mod session;

use crate::config::RecognitionConfig;
use crate::controller::Event;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

/// One recognized segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechResult {
    pub transcript: String,
    /// False while the segment may still change
    pub is_final: bool,
}

/// Callbacks delivered by a speech engine
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum EngineEvent {
    Start,
    End,
    Error(String),
    /// Every result of the current session so far, in order
    Result(Vec<SpeechResult>),
}

impl From<EngineEvent> for Event {
    fn from(event: EngineEvent) -> Self {
        match event {
            EngineEvent::Start => Event::RecognitionStarted,
            EngineEvent::End => Event::RecognitionEnded,
            EngineEvent::Error(code) => Event::RecognitionError(code),
            EngineEvent::Result(results) => Event::RecognitionResult(results),
        }
    }
}

/// Requests understood by a speech engine
///
/// Both calls return immediately; their effect is observed through events.
pub(crate) trait SpeechEngine {
    fn start(&mut self);
    fn stop(&mut self);
}

/// Session parameters derived from the recognition config
#[derive(Debug, Clone)]
pub(crate) struct EngineSettings {
    pub endpoint: String,
    pub model: String,
    pub language: Option<String>,
    pub continuous: bool,
    pub interim_results: bool,
    pub silence_timeout: Duration,
}

impl EngineSettings {
    pub fn from_config(config: &RecognitionConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            language: config.service_language(),
            continuous: config.continuous,
            interim_results: config.interim_results,
            silence_timeout: Duration::from_secs(config.silence_timeout_secs),
        }
    }
}

/// Speech engine backed by the OpenAI Realtime transcription API
pub(crate) struct RealtimeEngine {
    settings: Arc<EngineSettings>,
    api_key: Zeroizing<String>,
    event_tx: mpsc::UnboundedSender<EngineEvent>,
    running: Arc<AtomicBool>,
    stop_signal: Option<Arc<Notify>>,
}

impl RealtimeEngine {
    /// Create an engine and the receiver its events arrive on
    pub fn new(
        settings: EngineSettings,
        api_key: Zeroizing<String>,
    ) -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let engine = Self {
            settings: Arc::new(settings),
            api_key,
            event_tx,
            running: Arc::new(AtomicBool::new(false)),
            stop_signal: None,
        };
        (engine, event_rx)
    }
}

impl SpeechEngine for RealtimeEngine {
    fn start(&mut self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Recognition already running, ignoring start request");
            return;
        }

        info!("Starting recognition session");
        let stop = Arc::new(Notify::new());
        self.stop_signal = Some(stop.clone());
        tokio::spawn(connection::run_session(
            self.settings.clone(),
            self.api_key.clone(),
            self.event_tx.clone(),
            self.running.clone(),
            stop,
        ));
    }

    fn stop(&mut self) {
        match &self.stop_signal {
            Some(stop) if self.running.load(Ordering::SeqCst) => {
                info!("Stopping recognition session");
                stop.notify_one();
            }
            _ => debug!("Recognition not running, ignoring stop request"),
        }
    }
}
