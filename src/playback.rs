//! Video playback through an external player process
//!
//! `play` launches the configured player on the trigger video. The process
//! exiting, for any reason, is the video's `ended` event.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::config::VideoConfig;

/// Events emitted by a video player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PlaybackEvent {
    Ended,
}

/// Errors that can occur while playing the video
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("Failed to launch player {player}: {source}")]
    Spawn {
        player: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Player exited with {0}")]
    Exit(std::process::ExitStatus),
}

/// Requests understood by a video player
pub(crate) trait VideoPlayer {
    /// Start playback; completion is reported as [`PlaybackEvent::Ended`]
    fn play(&mut self);
    fn is_playing(&self) -> bool;
}

pub(crate) struct ProcessPlayer {
    player: String,
    args: Vec<String>,
    video: PathBuf,
    playing: Arc<AtomicBool>,
    event_tx: mpsc::UnboundedSender<PlaybackEvent>,
}

impl ProcessPlayer {
    pub fn new(config: &VideoConfig) -> (Self, mpsc::UnboundedReceiver<PlaybackEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let player = Self {
            player: config.player.clone(),
            args: config.args.clone(),
            video: config.path.clone(),
            playing: Arc::new(AtomicBool::new(false)),
            event_tx,
        };
        (player, event_rx)
    }
}

impl VideoPlayer for ProcessPlayer {
    fn play(&mut self) {
        if self.playing.swap(true, Ordering::SeqCst) {
            warn!("Video already playing, ignoring play request");
            return;
        }

        if !self.video.exists() {
            warn!("Video file {:?} not found, player may fail", self.video);
        }

        let mut command = Command::new(&self.player);
        command
            .args(&self.args)
            .arg(&self.video)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let player = self.player.clone();
        let playing = self.playing.clone();
        let event_tx = self.event_tx.clone();
        tokio::spawn(async move {
            info!(player = %player, "Playing video");
            // A failed launch still ends the video, so listening resumes.
            if let Err(e) = run_player(command, &player).await {
                error!("Video playback failed: {}", e);
            }
            playing.store(false, Ordering::SeqCst);
            let _ = event_tx.send(PlaybackEvent::Ended);
        });
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}

async fn run_player(mut command: Command, player: &str) -> Result<(), PlaybackError> {
    let mut child = command.spawn().map_err(|source| PlaybackError::Spawn {
        player: player.to_string(),
        source,
    })?;
    let status = child.wait().await.map_err(|source| PlaybackError::Spawn {
        player: player.to_string(),
        source,
    })?;

    if status.success() {
        info!("Video ended");
        Ok(())
    } else {
        Err(PlaybackError::Exit(status))
    }
}
