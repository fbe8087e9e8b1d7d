//! Controller state

/// Why the most recent stop was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StopReason {
    /// The user pressed stop
    User,
    /// The trigger keyword matched and the video took over
    Match,
    /// The engine reported an error
    Error,
}

/// Enabled state of the start/stop controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Buttons {
    pub start: bool,
    pub stop: bool,
}

impl Buttons {
    pub const IDLE: Buttons = Buttons {
        start: true,
        stop: false,
    };

    pub const LISTENING: Buttons = Buttons {
        start: false,
        stop: true,
    };

    pub const DISABLED: Buttons = Buttons {
        start: false,
        stop: false,
    };
}

/// Snapshot of everything the controller tracks
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ControllerState {
    /// A recognition session is running (between start and end/error)
    pub active: bool,
    pub buttons: Buttons,
    /// The video overlay is shown and the video is playing
    pub overlay_visible: bool,
    /// Reason attached to the last stop request, consumed by the next end
    pub stop_reason: Option<StopReason>,
    /// False once the capability check failed; all events are ignored
    pub supported: bool,
}

impl Default for ControllerState {
    fn default() -> Self {
        Self {
            active: false,
            buttons: Buttons::IDLE,
            overlay_visible: false,
            stop_reason: None,
            supported: true,
        }
    }
}
