//! Valve output drivers.
//!
//! | Driver     | Backend                                   |
//! |------------|-------------------------------------------|
//! | `gpio`     | any `embedded_hal::digital::OutputPin`    |
//! | `sim`      | in-memory levels, write history, faults   |

pub mod gpio;
pub mod sim;
