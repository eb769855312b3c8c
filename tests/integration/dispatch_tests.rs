//! Command dispatch: validation, idempotence and the single-open-valve
//! rule.

use super::mock_hw::{PIN_A, PIN_B, at, garden};

use sprinkler::app::events::AppEvent;
use sprinkler::app::service::StatusReport;
use sprinkler::error::Error;
use sprinkler::line::LineState;

#[test]
fn out_of_range_line_is_rejected_without_side_effects() {
    let (mut c, mut sink) = garden();
    sink.take();

    assert_eq!(
        c.dispatch("start", 5, at(1, 14, 0), &mut sink).unwrap_err(),
        Error::InvalidLine(5)
    );
    assert_eq!(
        c.dispatch("stop", -1, at(1, 14, 0), &mut sink).unwrap_err(),
        Error::InvalidLine(-1)
    );
    assert!(c.driver().writes().is_empty());
    assert!(sink.events.is_empty());
    assert!(c.lines().iter().all(|l| !l.is_on()));
}

#[test]
fn unknown_action_is_rejected() {
    let (mut c, mut sink) = garden();
    let err = c.dispatch("flood", 1, at(1, 14, 0), &mut sink).unwrap_err();
    assert_eq!(err, Error::InvalidAction("flood".into()));
    assert_eq!(err.kind(), "InvalidAction");
    assert!(c.driver().writes().is_empty());
}

#[test]
fn repeated_commands_write_once() {
    let (mut c, mut sink) = garden();

    c.dispatch("stop", 1, at(1, 14, 0), &mut sink).unwrap();
    assert!(c.driver().writes().is_empty());

    c.dispatch("start", 1, at(1, 14, 0), &mut sink).unwrap();
    c.dispatch("start", 1, at(1, 14, 1), &mut sink).unwrap();
    assert_eq!(c.driver().writes().len(), 1);

    c.dispatch("stop", 1, at(1, 14, 2), &mut sink).unwrap();
    c.dispatch("stop", 1, at(1, 14, 3), &mut sink).unwrap();
    assert_eq!(c.driver().writes().len(), 2);
}

#[test]
fn starting_another_line_closes_the_first() {
    let (mut c, mut sink) = garden();
    c.dispatch("start", 1, at(1, 14, 0), &mut sink).unwrap();
    c.dispatch("start", 2, at(1, 14, 5), &mut sink).unwrap();

    assert_eq!(c.driver().is_high(PIN_A), Some(false));
    assert_eq!(c.driver().is_high(PIN_B), Some(true));
    assert_eq!(c.lines().iter().filter(|l| l.is_on()).count(), 1);

    let a = c.status(1, at(1, 14, 6)).unwrap();
    assert_eq!(a.records()[0].last_run_end, Some(at(1, 14, 5)));
}

#[test]
fn failed_close_blocks_the_new_start() {
    let (mut c, mut sink) = garden();
    c.dispatch("start", 1, at(1, 14, 0), &mut sink).unwrap();
    c.driver_mut().fail_pin(PIN_A);

    let err = c.dispatch("start", 2, at(1, 14, 5), &mut sink).unwrap_err();
    assert!(matches!(err, Error::HardwareFault { pin, .. } if pin == PIN_A));
    assert_eq!(c.driver().level(PIN_B), None);
    assert_eq!(c.scheduler().manual_line(), Some(1));
}

#[test]
fn line_zero_applies_to_every_line() {
    let (mut c, mut sink) = garden();
    c.dispatch("skip", 0, at(1, 14, 0), &mut sink).unwrap();
    assert!(sink.contains(&AppEvent::SkipRequested(1)));
    assert!(sink.contains(&AppEvent::SkipRequested(2)));
    assert!(c.scheduler().is_skipped(1) && c.scheduler().is_skipped(2));

    c.tick(at(1, 23, 0), &mut sink);
    assert!(sink.contains(&AppEvent::DayComplete));
    assert!(c.driver().writes().is_empty());
}

#[test]
fn stop_all_reports_first_fault_but_tries_every_line() {
    let (mut c, mut sink) = garden();
    c.dispatch("start", 2, at(1, 14, 0), &mut sink).unwrap();
    c.driver_mut().fail_pin(PIN_B);

    let err = c.dispatch("stop", 0, at(1, 14, 1), &mut sink).unwrap_err();
    assert_eq!(err.kind(), "HardwareFault");
    assert_eq!(sink.faults(), 1);
    assert!(c.lines()[1].is_on());
}

#[test]
fn start_all_runs_the_pass_immediately() {
    let (mut c, mut sink) = garden();
    let report = c.dispatch("start", 0, at(1, 14, 0), &mut sink).unwrap();

    let states: Vec<_> = report.records().iter().map(|s| s.state).collect();
    assert_eq!(states, vec![LineState::On, LineState::Off]);

    c.tick(at(1, 14, 22), &mut sink);
    assert_eq!(c.driver().is_high(PIN_B), Some(true));
    assert_eq!(c.driver().is_high(PIN_A), Some(false));
}

#[test]
fn status_shapes_follow_the_line_number() {
    let (c, _) = garden();

    let all = c.status(0, at(1, 14, 0)).unwrap();
    assert!(matches!(&all, StatusReport::All(v) if v.len() == 2));
    let json = serde_json::to_value(&all).unwrap();
    assert!(json.is_array());
    assert_eq!(json[1]["name"], "B");

    let one = c.status(2, at(1, 14, 0)).unwrap();
    let json = serde_json::to_value(&one).unwrap();
    assert_eq!(json["line"], 2);
    assert_eq!(json["state"], "Off");
    assert_eq!(json["nextrun"], "2024-06-01T23:22:00");

    assert_eq!(c.status(3, at(1, 14, 0)).unwrap_err(), Error::InvalidLine(3));
}

#[test]
fn duration_counts_seconds_on() {
    let (mut c, mut sink) = garden();
    c.dispatch("start", 1, at(1, 14, 0), &mut sink).unwrap();
    let s = c.status(1, at(1, 14, 3)).unwrap();
    assert_eq!(s.records()[0].duration, 180);
}
