//! A single irrigation line: one valve on one output pin.
//!
//! ## Transition contract
//!
//! [`Line::set_state`] is idempotent.  Asking for the state the line is
//! already in performs no pin write and still succeeds, so callers never
//! need to pre-check.  A failed write leaves `state` untouched; the next
//! status query reflects what was last *confirmed*, not what was asked for.

use chrono::NaiveDateTime;
use core::fmt;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};

use crate::app::ports::PinDriver;
use crate::error::{Error, Result};
use crate::pins::{Level, PinId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineState {
    Off,
    On,
}

impl LineState {
    pub const fn level(self) -> Level {
        match self {
            Self::On => Level::High,
            Self::Off => Level::Low,
        }
    }
}

impl fmt::Display for LineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => write!(f, "Off"),
            Self::On => write!(f, "On"),
        }
    }
}

pub struct Line {
    index: usize,
    name: String,
    pin: PinId,
    state: LineState,
    /// When the current On period started.
    on_since: Option<NaiveDateTime>,
}

impl Line {
    /// A new line starts Off.  No pin write is made here.
    pub fn new(index: usize, name: impl Into<String>, pin: PinId) -> Self {
        Self {
            index,
            name: name.into(),
            pin,
            state: LineState::Off,
            on_since: None,
        }
    }

    /// Drive the valve to `target`.
    ///
    /// Returns `Ok(true)` when a write happened, `Ok(false)` when the line
    /// was already in `target`.
    pub fn set_state(
        &mut self,
        target: LineState,
        now: NaiveDateTime,
        driver: &mut impl PinDriver,
    ) -> Result<bool> {
        if self.state == target {
            debug!("Line {} ({}) is already {}", self.index, self.name, target);
            return Ok(false);
        }

        info!("Line {} ({}): turning {}", self.index, self.name, target);
        if let Err(cause) = driver.write_pin(self.pin, target.level()) {
            error!(
                "Line {} ({}): {} write on {} failed: {}",
                self.index, self.name, target, self.pin, cause
            );
            return Err(Error::HardwareFault {
                pin: self.pin,
                cause,
            });
        }

        self.state = target;
        self.on_since = match target {
            LineState::On => Some(now),
            LineState::Off => None,
        };
        Ok(true)
    }

    /// Snapshot for the status surface.  The run annotations come from the
    /// scheduler; the line only knows its own On time.
    pub fn status(
        &self,
        now: NaiveDateTime,
        last_run_end: Option<NaiveDateTime>,
        next_run_start: Option<NaiveDateTime>,
    ) -> LineStatus {
        LineStatus {
            index: self.index,
            name: self.name.clone(),
            state: self.state,
            duration: self.on_duration_secs(now),
            last_run_end,
            next_run_start,
        }
    }

    fn on_duration_secs(&self, now: NaiveDateTime) -> u64 {
        self.on_since
            .map_or(0, |since| (now - since).num_seconds().max(0) as u64)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pin(&self) -> PinId {
        self.pin
    }

    pub fn state(&self) -> LineState {
        self.state
    }

    pub fn is_on(&self) -> bool {
        self.state == LineState::On
    }
}

/// Status record rendered by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineStatus {
    #[serde(rename = "line")]
    pub index: usize,
    pub name: String,
    pub state: LineState,
    /// Seconds the line has been On in its current activation.
    pub duration: u64,
    #[serde(rename = "lastrun")]
    pub last_run_end: Option<NaiveDateTime>,
    #[serde(rename = "nextrun")]
    pub next_run_start: Option<NaiveDateTime>,
}
