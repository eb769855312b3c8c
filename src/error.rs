//! Unified error types for the irrigation controller.
//!
//! A single `Error` enum that every subsystem converts into, so the
//! command surface and the scheduler loop handle failures uniformly.
//! Only configuration and pin-ownership errors are fatal, and only at
//! startup; everything else is local to one command or one line.

use core::fmt;

use crate::pins::PinId;

// ---------------------------------------------------------------------------
// Top-level controller error
// ---------------------------------------------------------------------------

/// Every fallible operation in the controller funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Configuration is invalid; the controller cannot be built.
    Config(ConfigError),
    /// Two lines were configured on the same output pin.
    PinConflict {
        pin: PinId,
        owner: usize,
        claimant: usize,
    },
    /// A command addressed a line outside `0..=N`.
    InvalidLine(i64),
    /// A command named an action other than start / stop / skip.
    InvalidAction(String),
    /// Writing an output pin failed.  The line keeps its previous state.
    HardwareFault { pin: PinId, cause: DriverError },
}

impl Error {
    /// Short machine-readable name of the variant, used in rejections.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "ConfigError",
            Self::PinConflict { .. } => "PinConflict",
            Self::InvalidLine(_) => "InvalidLine",
            Self::InvalidAction(_) => "InvalidAction",
            Self::HardwareFault { .. } => "HardwareFault",
        }
    }

    /// True for errors that must stop the process from starting.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::PinConflict { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::PinConflict {
                pin,
                owner,
                claimant,
            } => write!(
                f,
                "pin {pin} already in use by line {owner} (claimed again by line {claimant})"
            ),
            Self::InvalidLine(line) => write!(f, "bad line selected ({line})"),
            Self::InvalidAction(action) => write!(f, "bad action ({action})"),
            Self::HardwareFault { pin, cause } => write!(f, "pin {pin}: {cause}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::HardwareFault { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The configuration source could not be read.
    Io { path: String, reason: String },
    /// The configuration source is not well-formed.
    Parse(String),
    /// No lines were configured.
    NoLines,
    /// A line entry does not have exactly two tokens (name, pin).
    BadLineEntry { entry: usize, tokens: usize },
    /// A line names a pin that is not in the board's output table.
    UnknownPin(String),
    /// The daily start time could not be parsed.
    BadTime(String),
    /// A duration field could not be parsed.
    BadDuration { field: &'static str, value: String },
    /// `duration` must be strictly positive.
    ZeroRunDuration,
    /// `gap` must not be negative.
    NegativeGap,
    /// One full pass over every line does not fit inside a day.
    ScheduleOverrun { lines: usize },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, reason } => write!(f, "{path}: {reason}"),
            Self::Parse(msg) => write!(f, "parse error: {msg}"),
            Self::NoLines => write!(f, "no lines configured"),
            Self::BadLineEntry { entry, tokens } => write!(
                f,
                "bad line config at entry {entry}: expected 2 tokens, got {tokens}"
            ),
            Self::UnknownPin(name) => write!(f, "unknown pin: {name}"),
            Self::BadTime(value) => write!(f, "illegal time: {value}"),
            Self::BadDuration { field, value } => write!(f, "illegal {field}: {value}"),
            Self::ZeroRunDuration => write!(f, "run duration must be greater than zero"),
            Self::NegativeGap => write!(f, "gap must not be negative"),
            Self::ScheduleOverrun { lines } => {
                write!(f, "running {lines} lines back to back takes longer than a day")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Driver errors
// ---------------------------------------------------------------------------

/// Failure reported by a [`PinDriver`](crate::app::ports::PinDriver).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// The driver has no output bound to this pin.
    Unbound,
    /// The underlying HAL rejected the write.
    WriteFailed(String),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbound => write!(f, "no output bound to pin"),
            Self::WriteFailed(reason) => write!(f, "write failed: {reason}"),
        }
    }
}

impl std::error::Error for DriverError {}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
