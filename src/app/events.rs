//! Outbound application events.
//!
//! The [`Controller`](super::service::Controller) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters decide what to
//! do with them: log them, publish them, or record them in a test.

use crate::error::Error;
use crate::line::LineState;

/// Who caused a line transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// The daily scheduler.
    Schedule,
    /// An operator command.
    Operator,
    /// Process shutdown.
    Shutdown,
}

/// Structured events emitted by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The controller was built; carries the number of lines.
    Started(usize),

    /// A valve changed state.
    LineSwitched {
        line: usize,
        state: LineState,
        origin: Origin,
    },

    /// An operator asked to cancel a line's next automatic run.
    SkipRequested(usize),

    /// A line's automatic turn was passed over because of a skip.
    RunSkipped(usize),

    /// Every line has had its turn for the day.
    DayComplete,

    /// A pin write failed; the line keeps its previous state.
    HardwareFault { line: usize, error: Error },

    /// All lines have been forced off for shutdown.
    Shutdown,
}
