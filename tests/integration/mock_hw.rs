//! Mock adapters for integration tests.
//!
//! Records every event the controller emits so tests can assert on the
//! full history, and builds the two-line garden used by most scenarios.

use chrono::{NaiveDate, NaiveDateTime};
use sprinkler::app::events::AppEvent;
use sprinkler::app::ports::{ConfigPort, EventSink};
use sprinkler::app::service::Controller;
use sprinkler::config::SystemConfig;
use sprinkler::drivers::sim::SimulatedPins;
use sprinkler::error::ConfigError;
use sprinkler::pins::PinId;

pub const PIN_A: PinId = PinId::new(17);
pub const PIN_B: PinId = PinId::new(21);

// ── Recording sink ────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&mut self) -> Vec<AppEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.contains(event)
    }

    pub fn faults(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AppEvent::HardwareFault { .. }))
            .count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── In-memory config source ───────────────────────────────────

pub struct MockConfig(pub SystemConfig);

impl ConfigPort for MockConfig {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        Ok(self.0.clone())
    }
}

// ── Fixtures ──────────────────────────────────────────────────

pub fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, day)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

/// Lines A (GPIO17) and B (GPIO21); 23:00 start, 20m runs, 2m gap.
pub fn garden_config() -> SystemConfig {
    SystemConfig::from_json(
        r#"{
            "lines": [["A", "GPIO17"], ["B", "GPIO21"]],
            "start": "11:00PM",
            "duration": "20m",
            "gap": "2m"
        }"#,
    )
    .unwrap()
}

/// The garden, built at noon on day 1.
pub fn garden() -> (Controller<SimulatedPins>, RecordingSink) {
    let mut sink = RecordingSink::new();
    let config = MockConfig(garden_config()).load().unwrap();
    let controller =
        Controller::from_config(&config, SimulatedPins::new(), at(1, 12, 0), &mut sink).unwrap();
    (controller, sink)
}
