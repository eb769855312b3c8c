//! Valve output pin assignments and ownership.
//!
//! Single source of truth for which board outputs may drive a valve.
//! Lines name their pin by board label (`GPIO17`); the label is resolved
//! here and nowhere else.
//!
//! [`PinRegistry`] records which line owns each pin.  Ownership is
//! established once while the controller is built and never released
//! while the process runs, mirroring the fact that wiring does not change.

use core::fmt;
use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

use crate::error::Error;

// ---------------------------------------------------------------------------
// Valve relay outputs (Raspberry Pi header, BCM numbering)
// ---------------------------------------------------------------------------

/// Every output that may be wired to a valve relay.
pub const VALVE_OUTPUTS: &[(&str, u8)] = &[
    ("GPIO17", 17),
    ("GPIO21", 21),
    ("GPIO22", 22),
    ("GPIO23", 23),
    ("GPIO24", 24),
    ("GPIO25", 25),
    ("GPIO27", 27),
];

/// Opaque hardware output identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PinId(u8);

impl PinId {
    pub const fn new(gpio: u8) -> Self {
        Self(gpio)
    }

    /// Resolve a board label such as `GPIO17`.
    pub fn from_name(name: &str) -> Option<Self> {
        VALVE_OUTPUTS
            .iter()
            .find(|(label, _)| *label == name)
            .map(|&(_, gpio)| Self(gpio))
    }

    /// Raw GPIO number.
    pub const fn gpio(self) -> u8 {
        self.0
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GPIO{}", self.0)
    }
}

impl Serialize for PinId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Electrical level written to a valve output.  HIGH opens the valve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    High,
    Low,
}

// ---------------------------------------------------------------------------
// Ownership registry
// ---------------------------------------------------------------------------

/// Pin → owning line index.  Entries are only ever added.
#[derive(Debug, Default)]
pub struct PinRegistry {
    owners: BTreeMap<PinId, usize>,
}

impl PinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `line` as the owner of `pin`.
    ///
    /// Claiming a pin the same line already owns is accepted; a pin owned
    /// by another line fails with [`Error::PinConflict`].
    pub fn claim(&mut self, pin: PinId, line: usize) -> Result<(), Error> {
        match self.owners.get(&pin) {
            Some(&owner) if owner != line => Err(Error::PinConflict {
                pin,
                owner,
                claimant: line,
            }),
            Some(_) => Ok(()),
            None => {
                self.owners.insert(pin, line);
                Ok(())
            }
        }
    }

    pub fn is_claimed(&self, pin: PinId) -> bool {
        self.owners.contains_key(&pin)
    }

    /// Line index owning `pin`, if any.
    pub fn owner(&self, pin: PinId) -> Option<usize> {
        self.owners.get(&pin).copied()
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}
