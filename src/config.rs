//! System configuration.
//!
//! The on-disk shape is a serde struct; [`SystemConfig::line_specs`] and
//! [`SystemConfig::schedule`] validate it into the typed values the
//! controller is built from.  Any malformed entry fails the whole
//! configuration.
//!
//! ```json
//! {
//!   "lines": [["Front", "GPIO17"], ["Back", "GPIO21"]],
//!   "start": "11:00PM",
//!   "duration": "20m",
//!   "gap": "2m"
//! }
//! ```

use chrono::{NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pins::PinId;
use crate::scheduler::ScheduleConfig;

/// Core system configuration, as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// One `[name, pin]` entry per line, in line order.
    pub lines: Vec<Vec<String>>,
    /// Time of day the daily pass begins ("11:00PM" or "23:00").
    pub start: String,
    /// How long each line runs ("20m", "1h 30m", ...).
    pub duration: String,
    /// All-off time between consecutive lines.
    pub gap: String,
    /// Upper bound on how long the scheduler thread sleeps between polls.
    pub poll_interval_ms: u64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            lines: Vec::new(),
            start: "11:00PM".into(),
            duration: "20m".into(),
            gap: "2m".into(),
            poll_interval_ms: 1000,
        }
    }
}

/// A validated line entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSpec {
    pub name: String,
    pub pin: PinId,
}

impl SystemConfig {
    /// Parse the JSON form.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate the line table.  Pin uniqueness is checked later, when
    /// the pins are claimed.
    pub fn line_specs(&self) -> Result<Vec<LineSpec>, ConfigError> {
        if self.lines.is_empty() {
            return Err(ConfigError::NoLines);
        }
        self.lines
            .iter()
            .enumerate()
            .map(|(i, tokens)| match tokens.as_slice() {
                [name, pin] => {
                    let pin =
                        PinId::from_name(pin).ok_or_else(|| ConfigError::UnknownPin(pin.clone()))?;
                    Ok(LineSpec {
                        name: name.clone(),
                        pin,
                    })
                }
                _ => Err(ConfigError::BadLineEntry {
                    entry: i + 1,
                    tokens: tokens.len(),
                }),
            })
            .collect()
    }

    /// Validate the daily-run policy.
    pub fn schedule(&self) -> Result<ScheduleConfig, ConfigError> {
        let start = parse_time_of_day(&self.start)?;
        let duration = parse_duration("duration", &self.duration)?;
        let gap = parse_duration("gap", &self.gap)?;
        ScheduleConfig::new(start, duration, gap)
    }
}

/// Accepts 12-hour ("11:00PM", "7:30am") and 24-hour ("23:00") forms.
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime, ConfigError> {
    let trimmed = value.trim();
    let upper = trimmed.to_ascii_uppercase();
    NaiveTime::parse_from_str(&upper, "%I:%M%p")
        .or_else(|_| NaiveTime::parse_from_str(&upper, "%I:%M %p"))
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .map_err(|_| ConfigError::BadTime(value.to_string()))
}

fn parse_duration(field: &'static str, value: &str) -> Result<TimeDelta, ConfigError> {
    let bad = || ConfigError::BadDuration {
        field,
        value: value.to_string(),
    };
    let std = humantime::parse_duration(value.trim()).map_err(|_| bad())?;
    TimeDelta::from_std(std).map_err(|_| bad())
}
