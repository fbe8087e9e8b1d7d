//! One recognition session over the Realtime WebSocket
//!
//! Captures microphone audio, streams it to the service and turns transcript
//! messages into engine events until the session is stopped, goes silent, or
//! fails.

use super::error::{EngineError, WS_CONNECT_TIMEOUT_SECS};
use super::messages::{ClientMessage, ServerMessage, SessionConfig};
use super::session::TranscriptSession;
use super::{EngineEvent, EngineSettings};
use crate::audio::{self, AudioCaptureError, AudioChunk, SERVICE_SAMPLE_RATE};
use base64::Engine;
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::time::{interval, sleep, timeout, Instant};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, error, info, trace, warn};
use zeroize::Zeroizing;

/// Ping interval in seconds to keep WebSocket connections alive
const PING_INTERVAL_SECS: u64 = 30;

/// How a server message changed the session
#[derive(Debug, PartialEq, Eq)]
pub(super) enum Update {
    /// Nothing the controller needs to hear about
    None,
    /// The service heard speech but has no text yet
    Activity,
    /// The segment in progress changed
    Partial,
    /// A segment was finished
    Committed,
}

/// Why a session loop returned without an error
#[derive(Debug, PartialEq, Eq)]
enum Finish {
    Stopped,
    Silence,
    SingleResult,
    ClosedByServer,
}

/// Run a whole session, reporting its outcome as engine events
///
/// `running` is cleared before `End` is sent so that a start request issued in
/// reaction to `End` opens a fresh session.
pub(super) async fn run_session(
    settings: Arc<EngineSettings>,
    api_key: Zeroizing<String>,
    event_tx: mpsc::UnboundedSender<EngineEvent>,
    running: Arc<AtomicBool>,
    stop: Arc<Notify>,
) {
    let outcome = capture_and_stream(&settings, &api_key, &event_tx, &stop).await;
    match outcome {
        Ok(finish) => info!(?finish, "Recognition session ended"),
        Err(e) => {
            error!(code = e.code(), "Recognition session failed: {}", e);
            let _ = event_tx.send(EngineEvent::Error(e.code().to_string()));
        }
    }

    running.store(false, Ordering::SeqCst);
    let _ = event_tx.send(EngineEvent::End);
}

async fn capture_and_stream(
    settings: &EngineSettings,
    api_key: &str,
    event_tx: &mpsc::UnboundedSender<EngineEvent>,
    stop: &Notify,
) -> Result<Finish, EngineError> {
    let (mut capture, mut audio_rx) = audio::start_capture(SERVICE_SAMPLE_RATE).await?;

    let result = stream_session(settings, api_key, event_tx, stop, &mut audio_rx).await;

    if tokio::task::spawn_blocking(move || capture.stop())
        .await
        .is_err()
    {
        warn!("Audio capture thread panicked while stopping");
    }
    result
}

async fn stream_session(
    settings: &EngineSettings,
    api_key: &str,
    event_tx: &mpsc::UnboundedSender<EngineEvent>,
    stop: &Notify,
    audio_rx: &mut mpsc::Receiver<AudioChunk>,
) -> Result<Finish, EngineError> {
    let request = build_ws_request(&settings.endpoint, api_key)?;
    info!(
        endpoint = %settings.endpoint,
        model = %settings.model,
        language = ?settings.language,
        "Connecting to realtime transcription"
    );

    let ws_stream = tokio::select! {
        _ = stop.notified() => {
            info!("Stop requested before the connection was established");
            return Ok(Finish::Stopped);
        }
        result = timeout(Duration::from_secs(WS_CONNECT_TIMEOUT_SECS), connect_async(request)) => {
            match result {
                Ok(Ok((stream, _response))) => stream,
                Ok(Err(e)) => return Err(map_connect_error(e)),
                Err(_) => return Err(EngineError::ConnectionTimeout),
            }
        }
    };
    info!("Connected to realtime transcription");

    let (mut ws_sink, mut ws_stream) = ws_stream.split();

    let init = ClientMessage::TranscriptionSessionUpdate {
        session: SessionConfig::new(&settings.model, settings.language.as_deref()),
    };
    send_json(&mut ws_sink, &init).await?;
    let _ = event_tx.send(EngineEvent::Start);

    let base64_engine = base64::engine::general_purpose::STANDARD;
    let mut transcript = TranscriptSession::default();
    let mut chunks_sent = 0u64;

    let mut ping_interval = interval(Duration::from_secs(PING_INTERVAL_SECS));
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let silence = sleep(settings.silence_timeout);
    tokio::pin!(silence);

    let finish = loop {
        tokio::select! {
            biased;

            _ = stop.notified() => break Finish::Stopped,
            _ = &mut silence => {
                info!("No speech for {:?}, ending session", settings.silence_timeout);
                break Finish::Silence;
            }
            _ = ping_interval.tick() => {
                ws_sink
                    .send(Message::Ping(Vec::new()))
                    .await
                    .map_err(|_| EngineError::ConnectionLost)?;
                trace!("Sent keepalive ping");
            }
            chunk = audio_rx.recv() => {
                let Some(chunk) = chunk else {
                    return Err(EngineError::AudioCapture(AudioCaptureError::StreamClosed));
                };
                chunks_sent += 1;
                if chunks_sent == 1 || chunks_sent % 100 == 0 {
                    debug!(
                        "Sending audio chunk #{} ({} samples at {} Hz)",
                        chunks_sent,
                        chunk.samples.len(),
                        chunk.sample_rate
                    );
                }
                let append = ClientMessage::InputAudioBufferAppend {
                    audio: base64_engine.encode(chunk.to_le_bytes()),
                };
                send_json(&mut ws_sink, &append).await?;
            }
            msg = ws_stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    trace!("Server message: {}", text);
                    let message = match serde_json::from_str::<ServerMessage>(&text) {
                        Ok(message) => message,
                        Err(e) => {
                            warn!("Failed to parse server message: {} - {}", e, text);
                            continue;
                        }
                    };
                    let update = apply_server_message(message, &mut transcript)?;
                    if update != Update::None {
                        silence.as_mut().reset(Instant::now() + settings.silence_timeout);
                    }
                    if matches!(update, Update::Partial | Update::Committed) {
                        let results = transcript.results(settings.interim_results);
                        if !results.is_empty() {
                            let _ = event_tx.send(EngineEvent::Result(results));
                        }
                    }
                    if update == Update::Committed && !settings.continuous {
                        break Finish::SingleResult;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    info!("WebSocket closed by server: {:?}", frame);
                    return Ok(Finish::ClosedByServer);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!("WebSocket receive error: {}", e);
                    return Err(EngineError::ConnectionLost);
                }
                None => return Err(EngineError::ConnectionLost),
            }
        }
    };

    if let Err(e) = send_json(&mut ws_sink, &ClientMessage::InputAudioBufferCommit).await {
        debug!("Failed to send final commit: {}", e);
    }
    let _ = ws_sink.close().await;
    info!("Session finished after sending {} audio chunks", chunks_sent);
    Ok(finish)
}

/// Fold a server message into the transcript
pub(super) fn apply_server_message(
    message: ServerMessage,
    transcript: &mut TranscriptSession,
) -> Result<Update, EngineError> {
    match message {
        ServerMessage::TranscriptionDelta { delta } => match delta.filter(|d| !d.is_empty()) {
            Some(delta) => {
                transcript.push_delta(&delta);
                Ok(Update::Partial)
            }
            None => Ok(Update::None),
        },
        ServerMessage::TranscriptionCompleted { transcript: text } => {
            match text.filter(|t| !t.is_empty()) {
                Some(text) => {
                    debug!("Committed segment: {}", text);
                    transcript.commit(&text);
                    Ok(Update::Committed)
                }
                None => {
                    transcript.partial_transcript = None;
                    Ok(Update::Activity)
                }
            }
        }
        ServerMessage::SpeechStarted | ServerMessage::SpeechStopped => Ok(Update::Activity),
        ServerMessage::TranscriptionSessionCreated => {
            info!("Transcription session created");
            Ok(Update::None)
        }
        ServerMessage::TranscriptionSessionUpdated => {
            info!("Transcription session updated");
            Ok(Update::None)
        }
        ServerMessage::Error { error: Some(error) } if error.is_auth() => {
            Err(EngineError::NotAllowed(error.describe()))
        }
        ServerMessage::Error { error: Some(error) } if error.is_empty_buffer() => {
            debug!("Empty audio buffer (expected): {}", error.describe());
            Ok(Update::None)
        }
        ServerMessage::Error { error } => Err(EngineError::Service(
            error
                .map(|e| e.describe())
                .unwrap_or_else(|| "unknown error".to_string()),
        )),
        ServerMessage::Other => Ok(Update::None),
    }
}

/// Build the WebSocket upgrade request with Bearer authentication
pub(super) fn build_ws_request(
    ws_url: &str,
    api_key: &str,
) -> Result<http::Request<()>, EngineError> {
    let parsed =
        url::Url::parse(ws_url).map_err(|e| EngineError::InvalidEndpoint(e.to_string()))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| EngineError::InvalidEndpoint("no host".to_string()))?;

    http::Request::builder()
        .uri(ws_url)
        .header("Host", host)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("OpenAI-Beta", "realtime=v1")
        .header("Upgrade", "websocket")
        .header("Connection", "Upgrade")
        .header("Sec-WebSocket-Key", generate_ws_key())
        .header("Sec-WebSocket-Version", "13")
        .body(())
        .map_err(|e| EngineError::InvalidEndpoint(e.to_string()))
}

fn map_connect_error(e: tungstenite::Error) -> EngineError {
    match e {
        tungstenite::Error::Http(response)
            if matches!(response.status().as_u16(), 401 | 403) =>
        {
            EngineError::NotAllowed(format!("HTTP {}", response.status()))
        }
        other => EngineError::Connection(other.to_string()),
    }
}

async fn send_json<S>(ws_sink: &mut S, message: &ClientMessage) -> Result<(), EngineError>
where
    S: SinkExt<Message, Error = tungstenite::Error> + Unpin,
{
    let json =
        serde_json::to_string(message).map_err(|e| EngineError::Service(e.to_string()))?;
    ws_sink
        .send(Message::Text(json))
        .await
        .map_err(|_| EngineError::ConnectionLost)
}

/// Generate a random WebSocket key
fn generate_ws_key() -> String {
    use rand::Rng;
    let mut key = [0u8; 16];
    rand::thread_rng().fill(&mut key);
    base64::engine::general_purpose::STANDARD.encode(key)
}
