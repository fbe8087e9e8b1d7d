//! Event loop
//!
//! All engine, playback and console events funnel into one loop. Each event
//! is handled to completion by the controller and the resulting commands are
//! executed in order before the next event is taken.

use crate::controller::{Command, Controller, Event};
use crate::engine::{EngineEvent, SpeechEngine};
use crate::input::InputEvent;
use crate::playback::{PlaybackEvent, VideoPlayer};
use crate::presenter::UiPresenter;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Apply a command that only touches the UI; other commands are handed back
fn present<P: UiPresenter>(presenter: &mut P, command: Command) -> Option<Command> {
    match command {
        Command::SetMessage(text) => presenter.set_message(&text),
        Command::SetButtons(buttons) => presenter.set_buttons_enabled(buttons.start, buttons.stop),
        Command::SetOverlayVisible(visible) => presenter.set_overlay_visible(visible),
        Command::ClearTextInput => presenter.clear_text_input(),
        other => return Some(other),
    }
    None
}

/// Render the terminal degraded state when no recognition capability exists
///
/// No handlers are wired afterwards.
pub(crate) fn render_unsupported<P: UiPresenter>(presenter: &mut P, controller: &mut Controller) {
    for command in controller.initialize(false) {
        if let Some(command) = present(presenter, command) {
            warn!(?command, "Ignoring command without a recognition capability");
        }
    }
}

pub(crate) struct App<P, E, V> {
    controller: Controller,
    presenter: P,
    engine: E,
    player: V,
}

impl<P, E, V> App<P, E, V>
where
    P: UiPresenter,
    E: SpeechEngine,
    V: VideoPlayer,
{
    /// Wire up a controller whose capability check succeeded
    pub fn new(mut controller: Controller, presenter: P, engine: E, player: V) -> Self {
        let commands = controller.initialize(true);
        let mut app = Self {
            controller,
            presenter,
            engine,
            player,
        };
        app.execute(commands);
        app
    }

    /// Handle one event and carry out what the controller decided
    pub fn dispatch(&mut self, event: Event) {
        debug!(?event, "Dispatching");
        let commands = self.controller.handle(event);
        self.execute(commands);
    }

    fn execute(&mut self, commands: Vec<Command>) {
        for command in commands {
            let Some(command) = present(&mut self.presenter, command) else {
                continue;
            };
            match command {
                Command::StartRecognition => self.engine.start(),
                Command::StopRecognition => self.engine.stop(),
                Command::PlayVideo => self.player.play(),
                // UI commands were applied by `present`.
                _ => {}
            }
        }
    }

    /// Run until the user quits or input closes
    pub async fn run(
        mut self,
        mut engine_rx: mpsc::UnboundedReceiver<EngineEvent>,
        mut playback_rx: mpsc::UnboundedReceiver<PlaybackEvent>,
        mut input_rx: mpsc::UnboundedReceiver<InputEvent>,
    ) {
        info!(
            keyword = %self.controller.keyword().as_str(),
            "Waiting for input"
        );

        loop {
            let event = tokio::select! {
                Some(event) = engine_rx.recv() => Event::from(event),
                Some(PlaybackEvent::Ended) = playback_rx.recv() => Event::VideoEnded,
                input = input_rx.recv() => match input.and_then(InputEvent::into_event) {
                    Some(event) => event,
                    None => break,
                },
            };
            self.dispatch(event);
        }

        info!("Shutting down");
        if self.controller.state().active {
            self.engine.stop();
        }
        if self.player.is_playing() {
            info!("Video still playing at shutdown");
        }
    }
}
