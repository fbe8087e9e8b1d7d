//! UI surface the controller drives
//!
//! The console presenter renders status changes as timestamped lines on
//! stdout; logs go to stderr so the two stay apart.

use chrono::Local;
use std::io::Write;
use tracing::warn;

/// Everything the controller can change on screen
pub(crate) trait UiPresenter {
    fn set_message(&mut self, text: &str);
    fn set_buttons_enabled(&mut self, start: bool, stop: bool);
    fn set_overlay_visible(&mut self, visible: bool);
    fn clear_text_input(&mut self);
}

pub(crate) struct ConsolePresenter<W: Write> {
    out: W,
    timestamps: bool,
    buttons: Option<(bool, bool)>,
    overlay_visible: bool,
}

impl ConsolePresenter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout(), true)
    }
}

impl<W: Write> ConsolePresenter<W> {
    pub fn new(out: W, timestamps: bool) -> Self {
        Self {
            out,
            timestamps,
            buttons: None,
            overlay_visible: false,
        }
    }

    /// Print the command help shown at startup
    pub fn show_help(&mut self) {
        self.line("/start, /stop: recognition control | /send <text>: submit | /quit");
        self.line("Anything else is typed into the text input and submitted with Enter");
    }

    fn line(&mut self, text: &str) {
        let result = if self.timestamps {
            writeln!(self.out, "[{}] {}", Local::now().format("%H:%M:%S"), text)
        } else {
            writeln!(self.out, "{}", text)
        };
        if let Err(e) = result.and_then(|_| self.out.flush()) {
            warn!("Failed to write to console: {}", e);
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

fn enabled(flag: bool) -> &'static str {
    if flag {
        "enabled"
    } else {
        "disabled"
    }
}

impl<W: Write> UiPresenter for ConsolePresenter<W> {
    fn set_message(&mut self, text: &str) {
        self.line(text);
    }

    fn set_buttons_enabled(&mut self, start: bool, stop: bool) {
        if self.buttons == Some((start, stop)) {
            return;
        }
        self.buttons = Some((start, stop));
        self.line(&format!(
            "[start: {} | stop: {}]",
            enabled(start),
            enabled(stop)
        ));
    }

    fn set_overlay_visible(&mut self, visible: bool) {
        if self.overlay_visible == visible {
            return;
        }
        self.overlay_visible = visible;
        self.line(if visible {
            "▶ video overlay shown"
        } else {
            "■ video overlay hidden"
        });
    }

    fn clear_text_input(&mut self) {
        // The terminal line is consumed on Enter; nothing is left to clear.
        self.line("> ");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(presenter: ConsolePresenter<Vec<u8>>) -> String {
        String::from_utf8(presenter.into_inner()).unwrap()
    }

    #[test]
    fn test_message_line() {
        let mut presenter = ConsolePresenter::new(Vec::new(), false);
        presenter.set_message("音声認識が停止しました。");
        assert_eq!(output(presenter), "音声認識が停止しました。\n");
    }

    #[test]
    fn test_buttons_only_print_changes() {
        let mut presenter = ConsolePresenter::new(Vec::new(), false);
        presenter.set_buttons_enabled(true, false);
        presenter.set_buttons_enabled(true, false);
        presenter.set_buttons_enabled(false, true);
        assert_eq!(
            output(presenter),
            "[start: enabled | stop: disabled]\n[start: disabled | stop: enabled]\n"
        );
    }

    #[test]
    fn test_overlay_toggle() {
        let mut presenter = ConsolePresenter::new(Vec::new(), false);
        presenter.set_overlay_visible(false);
        presenter.set_overlay_visible(true);
        presenter.set_overlay_visible(false);
        assert_eq!(
            output(presenter),
            "▶ video overlay shown\n■ video overlay hidden\n"
        );
    }

    #[test]
    fn test_timestamped_lines() {
        let mut presenter = ConsolePresenter::new(Vec::new(), true);
        presenter.set_message("hello");
        let out = output(presenter);
        assert!(out.starts_with('['));
        assert!(out.ends_with("] hello\n"));
    }
}
