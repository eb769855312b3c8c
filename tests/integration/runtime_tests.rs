//! Runtime handle and JSON request adapter, driven by a manual clock.

use std::sync::Arc;
use std::time::Duration;

use super::mock_hw::{PIN_A, PIN_B, RecordingSink, at, garden, garden_config};

use chrono::TimeDelta;
use serde_json::Value;
use sprinkler::adapters::json_api;
use sprinkler::adapters::time::ManualClock;
use sprinkler::app::ports::PinDriver;
use sprinkler::app::service::Controller;
use sprinkler::drivers::sim::SimulatedPins;
use sprinkler::error::DriverError;
use sprinkler::pins::{Level, PinId};
use sprinkler::runtime::Runtime;

type TestRuntime = Runtime<SimulatedPins, Arc<ManualClock>, RecordingSink>;

fn runtime() -> (TestRuntime, Arc<ManualClock>) {
    let (controller, sink) = garden();
    let clock = Arc::new(ManualClock::new(at(1, 12, 0)));
    let rt = Runtime::new(controller, sink, Arc::clone(&clock), Duration::from_millis(2));
    (rt, clock)
}

fn call(rt: &TestRuntime, body: &str) -> Value {
    serde_json::from_str(&json_api::handle(rt, body.as_bytes())).unwrap()
}

#[test]
fn query_all_returns_an_array() {
    let (rt, _) = runtime();
    let v = call(&rt, "{}");
    let lines = v.as_array().unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["name"], "A");
    assert_eq!(lines[0]["state"], "Off");
    assert_eq!(lines[0]["nextrun"], "2024-06-01T23:00:00");
}

#[test]
fn start_then_query_single_line() {
    let (rt, clock) = runtime();
    let v = call(&rt, r#"{"action": "start", "line": 1}"#);
    assert_eq!(v["line"], 1);
    assert_eq!(v["state"], "On");

    clock.advance(TimeDelta::seconds(42));
    let v = call(&rt, r#"{"action": "status", "line": 1}"#);
    assert_eq!(v["duration"], 42);
    assert!(rt.with_controller(|c| c.driver().is_high(PIN_A) == Some(true)));
}

#[test]
fn rejections_are_structured() {
    let (rt, _) = runtime();

    let v = call(&rt, r#"{"action": "start", "line": 5}"#);
    assert_eq!(v["error"], "InvalidLine");

    let v = call(&rt, r#"{"action": "water", "line": 1}"#);
    assert_eq!(v["error"], "InvalidAction");

    let v = call(&rt, "not json");
    assert_eq!(v["error"], "BadRequest");

    assert!(rt.with_controller(|c| c.driver().writes().is_empty()));
}

#[test]
fn hardware_fault_is_reported_to_the_caller() {
    let (controller, sink) = garden();
    let mut controller = controller;
    controller.driver_mut().fail_pin(PIN_B);
    let rt = Runtime::new(
        controller,
        sink,
        ManualClock::new(at(1, 12, 0)),
        Duration::from_millis(2),
    );

    let v: Value =
        serde_json::from_str(&json_api::handle(&rt, br#"{"action": "start", "line": 2}"#))
            .unwrap();
    assert_eq!(v["error"], "HardwareFault");
    assert!(v["message"].as_str().unwrap().contains("GPIO21"));
}

#[test]
fn tick_follows_the_clock() {
    let (rt, clock) = runtime();
    clock.set(at(1, 23, 0));
    rt.tick();
    assert!(rt.with_controller(|c| c.lines()[0].is_on()));

    clock.set(at(1, 23, 22));
    rt.tick();
    assert!(rt.with_controller(|c| !c.lines()[0].is_on() && c.lines()[1].is_on()));
}

#[test]
fn scheduler_thread_applies_due_transitions() {
    let (rt, clock) = runtime();
    let handle = rt.spawn_scheduler().unwrap();

    clock.set(at(1, 23, 0));
    let mut opened = false;
    for _ in 0..500 {
        if rt.with_controller(|c| c.lines()[0].is_on()) {
            opened = true;
            break;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    assert!(opened, "scheduler thread never opened line 1");

    rt.stop().unwrap();
    handle.join().unwrap();
    assert!(!rt.is_running());
    assert!(rt.with_controller(|c| c.driver().high_pins().count() == 0));
}

#[test]
fn stop_is_repeatable() {
    let (rt, _) = runtime();
    call(&rt, r#"{"action": "start", "line": 2}"#);
    rt.stop().unwrap();
    rt.stop().unwrap();
    assert!(rt.with_controller(|c| c.lines().iter().all(|l| !l.is_on())));
}

/// Panics on the first write matching `trip`, then behaves like
/// [`SimulatedPins`].
struct TrippingPins {
    pins: SimulatedPins,
    trip: Option<(PinId, Level)>,
}

impl PinDriver for TrippingPins {
    fn write_pin(&mut self, pin: PinId, level: Level) -> Result<(), DriverError> {
        if self.trip == Some((pin, level)) {
            self.trip = None;
            panic!("relay driver fault on {pin:?}");
        }
        self.pins.write_pin(pin, level)
    }
}

#[test]
fn panicking_tick_closes_every_line() {
    let mut sink = RecordingSink::new();
    let driver = TrippingPins {
        pins: SimulatedPins::new(),
        trip: Some((PIN_A, Level::Low)),
    };
    let controller = Controller::from_config(&garden_config(), driver, at(1, 12, 0), &mut sink).unwrap();
    let clock = Arc::new(ManualClock::new(at(1, 12, 0)));
    let rt = Runtime::new(controller, sink, Arc::clone(&clock), Duration::from_millis(2));
    let handle = rt.spawn_scheduler().unwrap();

    clock.set(at(1, 23, 0));
    let mut opened = false;
    for _ in 0..500 {
        if rt.with_controller(|c| c.driver().pins.is_high(PIN_A) == Some(true)) {
            opened = true;
            break;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    assert!(opened, "scheduler thread never opened line 1");

    // Closing line 1 at the end of its run panics inside the tick.
    clock.set(at(1, 23, 20));
    handle.join().unwrap();

    assert!(!rt.is_running());
    rt.with_controller(|c| {
        assert!(c.lines().iter().all(|l| !l.is_on()));
        assert_eq!(c.driver().pins.is_high(PIN_A), Some(false));
        assert_eq!(c.driver().pins.high_pins().count(), 0);
    });
}
