//! Multi-line irrigation controller library.
//!
//! Exposes the line-control and scheduling engine for the binary, the
//! integration tests and the fuzz target.  Hardware access goes through
//! the [`app::ports::PinDriver`] port; the engine never touches a pin
//! directly.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod line;
pub mod pins;
pub mod runtime;
pub mod scheduler;

pub mod adapters;
pub mod drivers;
