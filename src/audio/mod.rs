//! Microphone capture using cpal
//!
//! Captures the default input device on a dedicated thread and delivers mono
//! PCM16 chunks at the sample rate the transcription service expects.

mod resampler;
mod types;

pub use types::{AudioCaptureError, AudioCaptureHandle, AudioChunk};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SupportedStreamConfig};
use resampler::{downmix, ChunkAssembler};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

/// Sample rate of the realtime transcription service (24kHz)
pub const SERVICE_SAMPLE_RATE: u32 = 24000;

/// Start capturing on a dedicated thread
///
/// Resolves once the input stream is running, so a missing or unusable
/// microphone is reported here rather than only in the logs.
pub(crate) async fn start_capture(
    target_sample_rate: u32,
) -> Result<(AudioCaptureHandle, mpsc::Receiver<AudioChunk>), AudioCaptureError> {
    let is_capturing = Arc::new(AtomicBool::new(true));
    let (chunk_tx, chunk_rx) = mpsc::channel(600);
    let (ready_tx, ready_rx) = oneshot::channel();

    let flag = is_capturing.clone();
    let thread_handle = thread::Builder::new()
        .name("audio-capture".to_string())
        .spawn(move || run_capture(flag, chunk_tx, target_sample_rate, ready_tx))?;

    let mut handle = AudioCaptureHandle {
        is_capturing,
        thread_handle: Some(thread_handle),
    };

    match ready_rx.await {
        Ok(Ok(())) => Ok((handle, chunk_rx)),
        Ok(Err(e)) => {
            handle.stop();
            Err(e)
        }
        Err(_) => {
            handle.stop();
            Err(AudioCaptureError::StreamClosed)
        }
    }
}

/// Body of the capture thread; keeps the stream alive until capture is stopped
fn run_capture(
    is_capturing: Arc<AtomicBool>,
    chunk_tx: mpsc::Sender<AudioChunk>,
    target_sample_rate: u32,
    ready: oneshot::Sender<Result<(), AudioCaptureError>>,
) {
    let stream = match open_stream(is_capturing.clone(), chunk_tx, target_sample_rate)
        .and_then(|stream| {
            stream.play()?;
            Ok(stream)
        }) {
        Ok(stream) => stream,
        Err(e) => {
            error!("Audio capture error: {}", e);
            let _ = ready.send(Err(e));
            return;
        }
    };

    info!("Audio capture started");
    let _ = ready.send(Ok(()));

    while is_capturing.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(100));
    }
    drop(stream);
}

fn open_stream(
    is_capturing: Arc<AtomicBool>,
    chunk_tx: mpsc::Sender<AudioChunk>,
    target_sample_rate: u32,
) -> Result<cpal::Stream, AudioCaptureError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(AudioCaptureError::NoInputDevice)?;

    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    info!("Using audio input device: {}", device_name);

    let supported = pick_config(&device, target_sample_rate)?;
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();
    let channels = config.channels as usize;
    info!(
        "Audio config: {} channels, {} Hz, {:?}",
        channels, config.sample_rate.0, sample_format
    );

    let mut assembler = ChunkAssembler::new(config.sample_rate.0, target_sample_rate, chunk_tx)?;
    let err_callback = |err: cpal::StreamError| error!("Audio stream error: {}", err);

    let stream = match sample_format {
        SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                if !is_capturing.load(Ordering::SeqCst) {
                    return;
                }
                let samples: Vec<f32> = data.iter().map(|&s| s as f32 / 32768.0).collect();
                assembler.push(&downmix(&samples, channels));
            },
            err_callback,
            None,
        )?,
        SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if !is_capturing.load(Ordering::SeqCst) {
                    return;
                }
                assembler.push(&downmix(data, channels));
            },
            err_callback,
            None,
        )?,
        other => {
            return Err(AudioCaptureError::UnsupportedFormat(format!("{:?}", other)));
        }
    };

    Ok(stream)
}

/// Prefer a config that runs natively at the target rate
fn pick_config(
    device: &cpal::Device,
    target_sample_rate: u32,
) -> Result<SupportedStreamConfig, AudioCaptureError> {
    let ranges = device
        .supported_input_configs()
        .map_err(|e| AudioCaptureError::ConfigError(e.to_string()))?;

    let mut fallback = None;
    for range in ranges {
        if range.channels() == 0
            || !matches!(range.sample_format(), SampleFormat::I16 | SampleFormat::F32)
        {
            continue;
        }
        if range.min_sample_rate().0 <= target_sample_rate
            && range.max_sample_rate().0 >= target_sample_rate
        {
            return Ok(range.with_sample_rate(cpal::SampleRate(target_sample_rate)));
        }
        if fallback.is_none() {
            fallback = Some(range.with_max_sample_rate());
        }
    }

    match fallback {
        Some(config) => {
            warn!(
                "{}Hz not supported, using {}Hz instead",
                target_sample_rate,
                config.sample_rate().0
            );
            Ok(config)
        }
        None => Ok(device.default_input_config()?),
    }
}
