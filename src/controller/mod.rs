//! Keyword trigger controller
//!
//! Reacts to a closed set of input events (engine callbacks, button clicks,
//! text input, video end) and decides what should happen next. Every handler
//! is a pure state transition that returns the side effects to perform as
//! [`Command`]s; executing them is left to the caller.

mod keyword;
mod state;

pub(crate) use keyword::TriggerKeyword;
pub(crate) use state::{Buttons, ControllerState, StopReason};

use crate::config::Messages;
use crate::engine::SpeechResult;
use tracing::{debug, info};

/// Input events the controller reacts to
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Event {
    RecognitionStarted,
    RecognitionEnded,
    RecognitionError(String),
    RecognitionResult(Vec<SpeechResult>),
    VideoEnded,
    StartClicked,
    StopClicked,
    /// The submit button was pressed with the given input contents
    TextSubmitted(String),
    /// Enter was pressed in the text input holding the given text
    EnterPressed(String),
}

/// Side effects requested by the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    SetMessage(String),
    SetButtons(Buttons),
    SetOverlayVisible(bool),
    StartRecognition,
    StopRecognition,
    PlayVideo,
    ClearTextInput,
}

pub(crate) struct Controller {
    keyword: TriggerKeyword,
    messages: Messages,
    state: ControllerState,
}

impl Controller {
    pub fn new(keyword: TriggerKeyword, messages: Messages) -> Self {
        Self {
            keyword,
            messages,
            state: ControllerState::default(),
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn keyword(&self) -> &TriggerKeyword {
        &self.keyword
    }

    /// Apply the result of the capability check
    ///
    /// Without a recognition capability the controls are disabled for good and
    /// every later event is ignored.
    pub fn initialize(&mut self, supported: bool) -> Vec<Command> {
        if supported {
            self.state.buttons = Buttons::IDLE;
            return vec![Command::SetButtons(Buttons::IDLE)];
        }

        info!("Speech recognition unavailable, controls disabled");
        self.state.supported = false;
        self.state.buttons = Buttons::DISABLED;
        vec![
            Command::SetMessage(self.messages.unsupported.clone()),
            Command::SetButtons(Buttons::DISABLED),
        ]
    }

    /// Handle one event to completion
    pub fn handle(&mut self, event: Event) -> Vec<Command> {
        if !self.state.supported {
            debug!(?event, "Ignoring event, recognition unsupported");
            return Vec::new();
        }

        let mut commands = Vec::new();
        match event {
            Event::RecognitionStarted => self.on_recognition_start(&mut commands),
            Event::RecognitionEnded => self.on_recognition_end(&mut commands),
            Event::RecognitionError(code) => self.on_recognition_error(&code, &mut commands),
            Event::RecognitionResult(results) => {
                self.on_recognition_result(&results, &mut commands)
            }
            Event::VideoEnded => self.on_video_ended(&mut commands),
            Event::StartClicked => self.on_start_clicked(&mut commands),
            Event::StopClicked => self.request_stop(StopReason::User, &mut commands),
            Event::TextSubmitted(text) => self.on_text_submit(&text, &mut commands),
            // Submitting from the keyboard goes through the submit button path.
            Event::EnterPressed(text) => self.on_text_submit(&text, &mut commands),
        }
        commands
    }

    /// Check `text` for the trigger keyword, queueing the trigger effects on a match
    pub fn process_keyword(&mut self, text: &str, commands: &mut Vec<Command>) -> bool {
        if !self.keyword.matches(text) {
            return false;
        }

        info!(keyword = %self.keyword.as_str(), "Trigger keyword matched");
        commands.push(Command::SetMessage(self.messages.matched.clone()));
        self.state.overlay_visible = true;
        commands.push(Command::SetOverlayVisible(true));
        commands.push(Command::PlayVideo);
        if self.state.active {
            self.request_stop(StopReason::Match, commands);
        }
        true
    }

    fn on_recognition_start(&mut self, commands: &mut Vec<Command>) {
        self.state.active = true;
        commands.push(Command::SetMessage(
            self.messages.listening(self.keyword.as_str()),
        ));
        self.set_buttons(Buttons::LISTENING, commands);
    }

    fn on_recognition_end(&mut self, commands: &mut Vec<Command>) {
        self.state.active = false;
        let reason = self.state.stop_reason.take();

        if reason.is_none() && !self.state.overlay_visible {
            debug!("Recognition ended on its own, restarting");
            commands.push(Command::StartRecognition);
            return;
        }

        debug!(?reason, "Recognition ended");
        commands.push(Command::SetMessage(self.messages.stopped.clone()));
        self.set_buttons(Buttons::IDLE, commands);
    }

    fn on_recognition_error(&mut self, code: &str, commands: &mut Vec<Command>) {
        self.state.active = false;
        self.state.stop_reason = Some(StopReason::Error);
        commands.push(Command::SetMessage(self.messages.error(code)));
        self.set_buttons(Buttons::IDLE, commands);
    }

    fn on_recognition_result(&mut self, results: &[SpeechResult], commands: &mut Vec<Command>) {
        if results.is_empty() {
            return;
        }

        let transcript: String = results.iter().map(|r| r.transcript.as_str()).collect();
        debug!(
            segments = results.len(),
            pending = results.iter().filter(|r| !r.is_final).count(),
            "Recognition result"
        );
        if !self.process_keyword(&transcript, commands) {
            commands.push(Command::SetMessage(self.messages.recognized(&transcript)));
        }
    }

    fn on_video_ended(&mut self, commands: &mut Vec<Command>) {
        self.state.overlay_visible = false;
        commands.push(Command::SetOverlayVisible(false));
        self.request_start(commands);
    }

    fn on_start_clicked(&mut self, commands: &mut Vec<Command>) {
        if !self.state.active {
            self.request_start(commands);
        }
    }

    fn on_text_submit(&mut self, text: &str, commands: &mut Vec<Command>) {
        if text.is_empty() {
            return;
        }
        if !self.process_keyword(text, commands) {
            commands.push(Command::SetMessage(self.messages.input_received(text)));
        }
        commands.push(Command::ClearTextInput);
    }

    fn request_start(&mut self, commands: &mut Vec<Command>) {
        self.state.stop_reason = None;
        commands.push(Command::StartRecognition);
    }

    fn request_stop(&mut self, reason: StopReason, commands: &mut Vec<Command>) {
        self.state.stop_reason = Some(reason);
        commands.push(Command::StopRecognition);
    }

    fn set_buttons(&mut self, buttons: Buttons, commands: &mut Vec<Command>) {
        self.state.buttons = buttons;
        commands.push(Command::SetButtons(buttons));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> Controller {
        let mut controller = Controller::new(TriggerKeyword::new("口約束"), Messages::default());
        controller.initialize(true);
        controller
    }

    fn results(parts: &[&str]) -> Event {
        Event::RecognitionResult(
            parts
                .iter()
                .map(|p| SpeechResult {
                    transcript: p.to_string(),
                    is_final: true,
                })
                .collect(),
        )
    }

    fn listening() -> Controller {
        let mut controller = controller();
        controller.handle(Event::StartClicked);
        controller.handle(Event::RecognitionStarted);
        controller
    }

    fn count(commands: &[Command], wanted: &Command) -> usize {
        commands.iter().filter(|c| *c == wanted).count()
    }

    #[test]
    fn test_process_keyword_matches_iff_contains() {
        for (text, expected) in [
            ("口約束", true),
            ("これは口約束だ", true),
            ("約束", false),
            ("", false),
            ("口約", false),
        ] {
            let mut controller = controller();
            let mut commands = Vec::new();
            assert_eq!(controller.process_keyword(text, &mut commands), expected);
            assert_eq!(commands.is_empty(), !expected, "text: {text}");
        }
    }

    #[test]
    fn test_match_while_idle_does_not_stop() {
        let mut controller = controller();
        let mut commands = Vec::new();
        assert!(controller.process_keyword("口約束", &mut commands));
        assert_eq!(
            commands,
            vec![
                Command::SetMessage("口約束ライブ9/28".to_string()),
                Command::SetOverlayVisible(true),
                Command::PlayVideo,
            ]
        );
        assert!(controller.state().overlay_visible);
    }

    #[test]
    fn test_match_while_listening_stops_once() {
        let mut controller = listening();
        let mut commands = Vec::new();
        assert!(controller.process_keyword("口約束", &mut commands));
        assert_eq!(count(&commands, &Command::StopRecognition), 1);
        assert_eq!(count(&commands, &Command::PlayVideo), 1);
        assert_eq!(count(&commands, &Command::SetOverlayVisible(true)), 1);
        assert_eq!(controller.state().stop_reason, Some(StopReason::Match));
    }

    #[test]
    fn test_unsupported_disables_everything() {
        let mut controller = Controller::new(TriggerKeyword::new("口約束"), Messages::default());
        let commands = controller.initialize(false);
        assert_eq!(
            commands,
            vec![
                Command::SetMessage(Messages::default().unsupported),
                Command::SetButtons(Buttons::DISABLED),
            ]
        );

        assert!(controller.handle(Event::StartClicked).is_empty());
        assert!(controller.handle(Event::RecognitionStarted).is_empty());
        assert!(controller
            .handle(Event::TextSubmitted("口約束".to_string()))
            .is_empty());
        assert_eq!(controller.state().buttons, Buttons::DISABLED);
    }

    #[test]
    fn test_start_sets_listening_buttons() {
        let mut controller = controller();
        let commands = controller.handle(Event::RecognitionStarted);
        assert_eq!(
            commands,
            vec![
                Command::SetMessage(
                    "音声認識を開始しました。「口約束」と話しかけてください。".to_string()
                ),
                Command::SetButtons(Buttons::LISTENING),
            ]
        );
        assert!(controller.state().active);
    }

    #[test]
    fn test_unintentional_end_restarts() {
        let mut controller = listening();
        let commands = controller.handle(Event::RecognitionEnded);
        assert_eq!(commands, vec![Command::StartRecognition]);
        assert!(!controller.state().active);
        // Buttons stay as they were while the restart is in flight
        assert_eq!(controller.state().buttons, Buttons::LISTENING);
    }

    #[test]
    fn test_end_after_user_stop_goes_idle() {
        let mut controller = listening();
        assert_eq!(
            controller.handle(Event::StopClicked),
            vec![Command::StopRecognition]
        );
        let commands = controller.handle(Event::RecognitionEnded);
        assert_eq!(
            commands,
            vec![
                Command::SetMessage("音声認識が停止しました。".to_string()),
                Command::SetButtons(Buttons::IDLE),
            ]
        );
        assert_eq!(controller.state().stop_reason, None);
    }

    #[test]
    fn test_end_while_video_plays_does_not_restart() {
        let mut controller = listening();
        controller.handle(results(&["口約束"]));
        let commands = controller.handle(Event::RecognitionEnded);
        assert!(!commands.contains(&Command::StartRecognition));
        assert!(commands.contains(&Command::SetButtons(Buttons::IDLE)));
    }

    #[test]
    fn test_end_with_overlay_but_no_reason_does_not_restart() {
        // Match arrived from the text input while idle, then a stray end
        let mut controller = controller();
        controller.handle(Event::TextSubmitted("口約束".to_string()));
        let commands = controller.handle(Event::RecognitionEnded);
        assert!(!commands.contains(&Command::StartRecognition));
    }

    #[test]
    fn test_user_stop_racing_match_goes_idle() {
        let mut controller = listening();
        controller.handle(results(&["口約束"]));
        controller.handle(Event::StopClicked);
        assert_eq!(controller.state().stop_reason, Some(StopReason::User));
        let commands = controller.handle(Event::RecognitionEnded);
        assert!(!commands.contains(&Command::StartRecognition));
        assert_eq!(controller.state().buttons, Buttons::IDLE);
    }

    #[test]
    fn test_error_goes_idle_without_retry() {
        let mut controller = listening();
        let commands = controller.handle(Event::RecognitionError("not-allowed".to_string()));
        assert_eq!(
            commands,
            vec![
                Command::SetMessage("音声認識中にエラーが発生しました: not-allowed".to_string()),
                Command::SetButtons(Buttons::IDLE),
            ]
        );
        assert!(!controller.state().active);

        // The end that follows an error goes idle instead of restarting
        let commands = controller.handle(Event::RecognitionEnded);
        assert_eq!(
            commands,
            vec![
                Command::SetMessage("音声認識が停止しました。".to_string()),
                Command::SetButtons(Buttons::IDLE),
            ]
        );
    }

    #[test]
    fn test_end_after_no_speech_error_shows_stopped() {
        let mut controller = controller();
        controller.handle(Event::StartClicked);
        controller.handle(Event::RecognitionStarted);
        controller.handle(Event::RecognitionError("no-speech".to_string()));
        let commands = controller.handle(Event::RecognitionEnded);
        assert!(!commands.contains(&Command::StartRecognition));
        assert!(commands.contains(&Command::SetMessage("音声認識が停止しました。".to_string())));
        assert_eq!(controller.state().buttons, Buttons::IDLE);
    }

    #[test]
    fn test_empty_results_are_ignored() {
        let mut controller = listening();
        assert!(controller
            .handle(Event::RecognitionResult(Vec::new()))
            .is_empty());
    }

    #[test]
    fn test_split_results_are_concatenated() {
        let mut controller = listening();
        let commands = controller.handle(results(&["口", "約束"]));
        assert_eq!(
            commands[0],
            Command::SetMessage("口約束ライブ9/28".to_string())
        );
        assert!(!commands
            .iter()
            .any(|c| matches!(c, Command::SetMessage(m) if m.starts_with("認識された言葉"))));
    }

    #[test]
    fn test_results_concatenate_in_order() {
        let mut controller = listening();
        let commands = controller.handle(results(&["約束", "口"]));
        assert_eq!(
            commands,
            vec![Command::SetMessage("認識された言葉: 約束口".to_string())]
        );
    }

    #[test]
    fn test_empty_text_submit_is_noop() {
        let mut controller = controller();
        assert!(controller
            .handle(Event::TextSubmitted(String::new()))
            .is_empty());
    }

    #[test]
    fn test_text_submit_match_clears_input() {
        let mut controller = listening();
        let commands = controller.handle(Event::TextSubmitted("口約束だよ".to_string()));
        assert_eq!(
            commands,
            vec![
                Command::SetMessage("口約束ライブ9/28".to_string()),
                Command::SetOverlayVisible(true),
                Command::PlayVideo,
                Command::StopRecognition,
                Command::ClearTextInput,
            ]
        );
    }

    #[test]
    fn test_text_submit_no_match() {
        let mut controller = controller();
        let commands = controller.handle(Event::TextSubmitted("こんにちは".to_string()));
        assert_eq!(
            commands,
            vec![
                Command::SetMessage("入力された言葉: こんにちは".to_string()),
                Command::ClearTextInput,
            ]
        );
    }

    #[test]
    fn test_enter_key_submits() {
        let mut controller = controller();
        let via_key = controller.handle(Event::EnterPressed("hello".to_string()));
        let via_button = controller.handle(Event::TextSubmitted("hello".to_string()));
        assert_eq!(via_key, via_button);
    }

    #[test]
    fn test_empty_enter_is_noop() {
        let mut controller = controller();
        assert!(controller
            .handle(Event::EnterPressed(String::new()))
            .is_empty());
    }

    #[test]
    fn test_video_end_always_restarts() {
        let mut controller = controller();
        controller.handle(Event::StopClicked);
        let commands = controller.handle(Event::VideoEnded);
        assert_eq!(
            commands,
            vec![Command::SetOverlayVisible(false), Command::StartRecognition]
        );
        assert!(!controller.state().overlay_visible);
        assert_eq!(controller.state().stop_reason, None);
    }

    #[test]
    fn test_start_click_is_idempotent() {
        let mut controller = controller();
        assert_eq!(
            controller.handle(Event::StartClicked),
            vec![Command::StartRecognition]
        );
        controller.handle(Event::RecognitionStarted);
        assert!(controller.handle(Event::StartClicked).is_empty());
    }

    #[test]
    fn test_full_trigger_cycle() {
        let mut controller = listening();
        controller.handle(results(&["口約束"]));
        controller.handle(Event::RecognitionEnded);
        assert_eq!(controller.state().buttons, Buttons::IDLE);
        assert!(controller.state().overlay_visible);

        let commands = controller.handle(Event::VideoEnded);
        assert!(commands.contains(&Command::StartRecognition));
        controller.handle(Event::RecognitionStarted);
        assert!(controller.state().active);
        assert_eq!(controller.state().buttons, Buttons::LISTENING);
        assert!(!controller.state().overlay_visible);
    }

    #[test]
    fn test_buttons_track_active() {
        let mut controller = controller();
        let events = [
            Event::StartClicked,
            Event::RecognitionStarted,
            Event::StopClicked,
            Event::RecognitionEnded,
            Event::StartClicked,
            Event::RecognitionStarted,
            Event::RecognitionError("network".to_string()),
            Event::RecognitionEnded,
        ];
        for event in events {
            controller.handle(event);
            let state = controller.state();
            if state.active {
                assert_eq!(state.buttons, Buttons::LISTENING);
            } else if state.stop_reason.is_none() {
                assert!(state.buttons == Buttons::IDLE || state.buttons == Buttons::LISTENING);
            }
        }
        assert_eq!(controller.state().buttons, Buttons::IDLE);
    }
}
