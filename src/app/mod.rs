//! Application core: line control and scheduling, zero I/O.
//!
//! All interaction with relays, clocks and logs happens through the
//! **port traits** in [`ports`], keeping this layer fully testable
//! without real hardware.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
