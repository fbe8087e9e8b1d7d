//! Console input
//!
//! Each stdin line is either a button click or the contents of the text input
//! submitted with Enter.

use crate::controller::Event;
use std::io::BufRead;
use std::thread;
use tokio::sync::mpsc;
use tracing::{debug, error};

/// A user action read from the console
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum InputEvent {
    StartClicked,
    StopClicked,
    /// Submit button pressed with the given text
    Submit(String),
    /// Enter pressed in the text input
    Enter(String),
    Quit,
}

impl InputEvent {
    /// Controller event for this action; `None` for [`InputEvent::Quit`]
    pub fn into_event(self) -> Option<Event> {
        match self {
            InputEvent::StartClicked => Some(Event::StartClicked),
            InputEvent::StopClicked => Some(Event::StopClicked),
            InputEvent::Submit(text) => Some(Event::TextSubmitted(text)),
            InputEvent::Enter(text) => Some(Event::EnterPressed(text)),
            InputEvent::Quit => None,
        }
    }
}

/// Map one line (without its newline) to an action
pub(crate) fn parse_line(line: &str) -> InputEvent {
    let line = line.trim_end_matches('\r');
    match line.trim() {
        "/start" => InputEvent::StartClicked,
        "/stop" => InputEvent::StopClicked,
        "/quit" | "/exit" => InputEvent::Quit,
        "/send" => InputEvent::Submit(String::new()),
        trimmed => match trimmed.strip_prefix("/send ") {
            Some(text) => InputEvent::Submit(text.to_string()),
            None => InputEvent::Enter(line.to_string()),
        },
    }
}

/// Read stdin on a dedicated thread until EOF or `/quit`, forwarding parsed lines
///
/// A plain thread keeps a pending blocking read from holding up runtime
/// shutdown. EOF and read errors are reported as [`InputEvent::Quit`].
pub(crate) fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<InputEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    let spawned = thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let event = match line {
                    Ok(line) => parse_line(&line),
                    Err(e) => {
                        error!("Failed to read stdin: {}", e);
                        InputEvent::Quit
                    }
                };
                debug!(?event, "Console input");
                let quit = event == InputEvent::Quit;
                if tx.send(event).is_err() || quit {
                    return;
                }
            }
            let _ = tx.send(InputEvent::Quit);
        });
    if let Err(e) = spawned {
        // The receiver sees a closed channel and the app shuts down.
        error!("Failed to start stdin reader: {}", e);
    }
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_commands() {
        assert_eq!(parse_line("/start"), InputEvent::StartClicked);
        assert_eq!(parse_line(" /stop "), InputEvent::StopClicked);
        assert_eq!(parse_line("/quit"), InputEvent::Quit);
    }

    #[test]
    fn test_plain_text_is_enter() {
        assert_eq!(
            parse_line("口約束だよ"),
            InputEvent::Enter("口約束だよ".to_string())
        );
        assert_eq!(parse_line("hello\r"), InputEvent::Enter("hello".to_string()));
        assert_eq!(parse_line(""), InputEvent::Enter(String::new()));
    }

    #[test]
    fn test_send_is_submit() {
        assert_eq!(
            parse_line("/send 口約束"),
            InputEvent::Submit("口約束".to_string())
        );
        assert_eq!(parse_line("/send"), InputEvent::Submit(String::new()));
    }

    #[test]
    fn test_into_event() {
        assert_eq!(
            InputEvent::Enter("x".to_string()).into_event(),
            Some(Event::EnterPressed("x".to_string()))
        );
        assert_eq!(InputEvent::Quit.into_event(), None);
    }
}
