//! `embedded-hal` output pin bank.
//!
//! Binds each [`PinId`] to a HAL output pin, so any board crate that
//! implements [`OutputPin`] drives the valves.  HAL errors are reduced to
//! their [`ErrorKind`](embedded_hal::digital::ErrorKind).

use std::collections::BTreeMap;

use embedded_hal::digital::OutputPin;
use log::info;

use crate::app::ports::PinDriver;
use crate::error::DriverError;
use crate::pins::{Level, PinId};

pub struct GpioBank<P: OutputPin> {
    outputs: BTreeMap<PinId, P>,
}

impl<P: OutputPin> Default for GpioBank<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: OutputPin> GpioBank<P> {
    pub fn new() -> Self {
        Self {
            outputs: BTreeMap::new(),
        }
    }

    /// Attach `output` as the relay for `pin`.  The output is driven low
    /// first so a freshly bound valve starts closed.
    pub fn bind(&mut self, pin: PinId, mut output: P) -> Result<(), DriverError> {
        output.set_low().map_err(|e| hal_error(&e))?;
        info!("GPIO: bound {}", pin);
        self.outputs.insert(pin, output);
        Ok(())
    }

    pub fn is_bound(&self, pin: PinId) -> bool {
        self.outputs.contains_key(&pin)
    }

    pub fn output(&self, pin: PinId) -> Option<&P> {
        self.outputs.get(&pin)
    }
}

impl<P: OutputPin> PinDriver for GpioBank<P> {
    fn write_pin(&mut self, pin: PinId, level: Level) -> Result<(), DriverError> {
        let output = self.outputs.get_mut(&pin).ok_or(DriverError::Unbound)?;
        match level {
            Level::High => output.set_high(),
            Level::Low => output.set_low(),
        }
        .map_err(|e| hal_error(&e))
    }
}

fn hal_error(e: &impl embedded_hal::digital::Error) -> DriverError {
    DriverError::WriteFailed(format!("{:?}", e.kind()))
}
