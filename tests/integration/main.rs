//! Integration test driver for `tests/integration/`.
//!
//! Each `mod` below maps to a file that exercises the controller against
//! mock adapters.  All tests run on the host with simulated pins and a
//! manual clock; no real hardware or wall time is involved.

mod dispatch_tests;
mod mock_hw;
mod runtime_tests;
mod schedule_scenario_tests;
