//! Downmixing, resampling and chunking of captured samples

use super::types::AudioChunk;
use super::AudioCaptureError;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{info, warn};

/// Average interleaved frames down to one channel
pub(super) fn downmix(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0) as i16
}

/// Turns device-rate mono samples into fixed-size chunks at the target rate
///
/// Chunks hold 100 ms of audio. When the channel is full, chunks are dropped
/// rather than blocking the audio callback.
pub(super) struct ChunkAssembler {
    resampler: Option<SincFixedIn<f32>>,
    input: Vec<f32>,
    output: Vec<i16>,
    target_sample_rate: u32,
    chunk_size: usize,
    sender: mpsc::Sender<AudioChunk>,
    dropped: u64,
}

impl ChunkAssembler {
    pub fn new(
        device_sample_rate: u32,
        target_sample_rate: u32,
        sender: mpsc::Sender<AudioChunk>,
    ) -> Result<Self, AudioCaptureError> {
        let chunk_size = (target_sample_rate / 10) as usize;

        let resampler = if device_sample_rate != target_sample_rate {
            info!(
                "Creating resampler: {} Hz -> {} Hz",
                device_sample_rate, target_sample_rate
            );
            let params = SincInterpolationParameters {
                sinc_len: 256,
                f_cutoff: 0.95,
                interpolation: SincInterpolationType::Linear,
                oversampling_factor: 256,
                window: WindowFunction::BlackmanHarris2,
            };
            let input_frames = (chunk_size as f64 * device_sample_rate as f64
                / target_sample_rate as f64)
                .ceil() as usize;
            let resampler = SincFixedIn::<f32>::new(
                target_sample_rate as f64 / device_sample_rate as f64,
                2.0,
                params,
                input_frames,
                1,
            )
            .map_err(|e| AudioCaptureError::ConfigError(e.to_string()))?;
            Some(resampler)
        } else {
            None
        };

        Ok(Self {
            resampler,
            input: Vec::new(),
            output: Vec::with_capacity(chunk_size * 2),
            target_sample_rate,
            chunk_size,
            sender,
            dropped: 0,
        })
    }

    /// Feed mono samples in `[-1.0, 1.0]`
    pub fn push(&mut self, mono: &[f32]) {
        match &mut self.resampler {
            None => self.output.extend(mono.iter().copied().map(to_i16)),
            Some(resampler) => {
                self.input.extend_from_slice(mono);
                loop {
                    let needed = resampler.input_frames_next();
                    if self.input.len() < needed {
                        break;
                    }
                    let block: Vec<f32> = self.input.drain(..needed).collect();
                    match resampler.process(&[block], None) {
                        Ok(mut resampled) => {
                            let channel = resampled.swap_remove(0);
                            self.output.extend(channel.into_iter().map(to_i16));
                        }
                        Err(e) => warn!("Resampling failed: {}", e),
                    }
                }
            }
        }

        while self.output.len() >= self.chunk_size {
            let samples: Vec<i16> = self.output.drain(..self.chunk_size).collect();
            self.send(samples);
        }
    }

    fn send(&mut self, samples: Vec<i16>) {
        let chunk = AudioChunk {
            samples,
            sample_rate: self.target_sample_rate,
        };
        match self.sender.try_send(chunk) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                if self.dropped == 1 || self.dropped % 50 == 0 {
                    warn!("Audio channel full, dropped {} chunks", self.dropped);
                }
            }
            // Receiver is gone; the capture thread is about to be stopped.
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downmix_stereo() {
        let mono = downmix(&[0.5, -0.5, 1.0, 0.0], 2);
        assert_eq!(mono, vec![0.0, 0.5]);
    }

    #[test]
    fn test_downmix_mono_passthrough() {
        assert_eq!(downmix(&[0.1, 0.2], 1), vec![0.1, 0.2]);
    }

    #[test]
    fn test_to_i16_clamps() {
        assert_eq!(to_i16(2.0), 32767);
        assert_eq!(to_i16(-2.0), -32767);
        assert_eq!(to_i16(0.0), 0);
    }

    #[test]
    fn test_chunks_without_resampling() {
        let (tx, mut rx) = mpsc::channel(10);
        let mut assembler = ChunkAssembler::new(24000, 24000, tx).unwrap();
        assembler.push(&vec![0.25; 3000]);

        let chunk = rx.try_recv().unwrap();
        assert_eq!(chunk.samples.len(), 2400);
        assert_eq!(chunk.sample_rate, 24000);
        // 600 samples remain buffered
        assert!(rx.try_recv().is_err());
        assembler.push(&vec![0.25; 1800]);
        assert_eq!(rx.try_recv().unwrap().samples.len(), 2400);
    }

    #[test]
    fn test_chunks_with_resampling() {
        let (tx, mut rx) = mpsc::channel(100);
        let mut assembler = ChunkAssembler::new(48000, 24000, tx).unwrap();
        assembler.push(&vec![0.0; 48000]);

        let mut chunks = 0;
        while let Ok(chunk) = rx.try_recv() {
            assert_eq!(chunk.samples.len(), 2400);
            assert_eq!(chunk.sample_rate, 24000);
            chunks += 1;
        }
        assert!((8..=10).contains(&chunks), "got {} chunks", chunks);
    }

    #[test]
    fn test_full_channel_drops_chunks() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut assembler = ChunkAssembler::new(16000, 16000, tx).unwrap();
        assembler.push(&vec![0.0; 1600 * 3]);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
        assert_eq!(assembler.dropped, 2);
    }
}
