//! Inbound operator commands.
//!
//! The transport hands the controller an action name and a line number;
//! [`Command::parse`] turns them into a typed command or a structured
//! rejection before any state is touched.

use core::fmt;
use core::str::FromStr;

use crate::error::Error;

/// What the operator asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Open the line now, outside the daily sequence.
    Start,
    /// Close the line; an automatic run in progress is abandoned.
    Stop,
    /// Cancel the line's next automatic run.
    Skip,
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "skip" => Ok(Self::Skip),
            other => Err(Error::InvalidAction(other.to_string())),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Stop => write!(f, "stop"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

/// Which lines a command or query applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Line number 0 on the wire.
    All,
    /// A 1-based line index.
    Line(usize),
}

impl Target {
    /// Validate a wire line number against a system of `line_count` lines.
    pub fn parse(line: i64, line_count: usize) -> Result<Self, Error> {
        match usize::try_from(line) {
            Ok(0) => Ok(Self::All),
            Ok(i) if i <= line_count => Ok(Self::Line(i)),
            _ => Err(Error::InvalidLine(line)),
        }
    }

    /// Wire line number.
    pub fn number(self) -> usize {
        match self {
            Self::All => 0,
            Self::Line(i) => i,
        }
    }
}

/// A validated operator command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub action: Action,
    pub target: Target,
}

impl Command {
    /// Line number is checked first, so a bad line is reported even when
    /// the action is also unrecognised.
    pub fn parse(action: &str, line: i64, line_count: usize) -> Result<Self, Error> {
        let target = Target::parse(line, line_count)?;
        let action = action.parse()?;
        Ok(Self { action, target })
    }
}
