//! Simulated valve outputs.
//!
//! Used on hosts without a board backend and by the test suites.  Keeps
//! the current level of every pin plus the full write history, and can
//! be told to fail writes on chosen pins to exercise fault handling.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::app::ports::PinDriver;
use crate::error::DriverError;
use crate::pins::{Level, PinId};

#[derive(Debug, Default)]
pub struct SimulatedPins {
    levels: BTreeMap<PinId, Level>,
    history: Vec<(PinId, Level)>,
    failing: BTreeSet<PinId>,
}

impl SimulatedPins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following write to `pin` fail until [`heal`](Self::heal).
    pub fn fail_pin(&mut self, pin: PinId) {
        self.failing.insert(pin);
    }

    pub fn heal(&mut self, pin: PinId) {
        self.failing.remove(&pin);
    }

    /// Last level successfully written, `None` if never written.
    pub fn level(&self, pin: PinId) -> Option<Level> {
        self.levels.get(&pin).copied()
    }

    pub fn is_high(&self, pin: PinId) -> Option<bool> {
        self.level(pin).map(|l| l == Level::High)
    }

    /// Pins currently driven high.
    pub fn high_pins(&self) -> impl Iterator<Item = PinId> + '_ {
        self.levels
            .iter()
            .filter(|(_, l)| **l == Level::High)
            .map(|(p, _)| *p)
    }

    /// Successful writes, oldest first.
    pub fn writes(&self) -> &[(PinId, Level)] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

impl PinDriver for SimulatedPins {
    fn write_pin(&mut self, pin: PinId, level: Level) -> Result<(), DriverError> {
        if self.failing.contains(&pin) {
            return Err(DriverError::WriteFailed(format!("simulated fault on {pin}")));
        }
        debug!("SIM: {} -> {:?}", pin, level);
        self.levels.insert(pin, level);
        self.history.push((pin, level));
        Ok(())
    }
}
