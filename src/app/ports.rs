//! Port traits: the hexagonal boundary between the controller and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Controller (domain)
//! ```
//!
//! Driven adapters (valve outputs, event sinks, clocks, config files)
//! implement these traits.  The [`Controller`](super::service::Controller)
//! consumes them via generics, so the engine runs identically against
//! real relays and simulated pins.

use chrono::NaiveDateTime;

use crate::config::SystemConfig;
use crate::error::{ConfigError, DriverError};
use crate::pins::{Level, PinId};

// ───────────────────────────────────────────────────────────────
// Pin driver (driven adapter: domain → valve relays)
// ───────────────────────────────────────────────────────────────

/// Write-side port for valve outputs.
///
/// Writes are blocking but fast.  A failed write leaves the physical
/// output in an unknown state; the caller keeps its previous view.
pub trait PinDriver {
    fn write_pin(&mut self, pin: PinId, level: Level) -> Result<(), DriverError>;
}

impl<D: PinDriver + ?Sized> PinDriver for &mut D {
    fn write_pin(&mut self, pin: PinId, level: Level) -> Result<(), DriverError> {
        (**self).write_pin(pin, level)
    }
}

// ───────────────────────────────────────────────────────────────
// Event sink (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &super::events::AppEvent) {}
}

// ───────────────────────────────────────────────────────────────
// Clock (driven adapter: wall time → domain)
// ───────────────────────────────────────────────────────────────

/// Local wall-clock time.  The schedule is expressed as a time of day,
/// so the controller works on naive local timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: config source → domain)
// ───────────────────────────────────────────────────────────────

/// Loads the system configuration from wherever it lives.
///
/// Implementations return the raw [`SystemConfig`]; validation happens
/// when the controller is built from it.
pub trait ConfigPort {
    fn load(&self) -> Result<SystemConfig, ConfigError>;
}
