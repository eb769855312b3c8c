//! End-to-end scenarios for the nightly pass, driven tick by tick.

use super::mock_hw::{PIN_A, PIN_B, at, garden};

use sprinkler::app::events::{AppEvent, Origin};
use sprinkler::line::LineState;
use sprinkler::pins::Level;
use sprinkler::scheduler::Phase;

fn switched(line: usize, state: LineState, origin: Origin) -> AppEvent {
    AppEvent::LineSwitched {
        line,
        state,
        origin,
    }
}

// ── Nightly pass ──────────────────────────────────────────────

#[test]
fn two_lines_run_in_order_with_a_gap() {
    let (mut c, mut sink) = garden();
    assert_eq!(sink.take(), vec![AppEvent::Started(2)]);

    c.tick(at(1, 22, 59), &mut sink);
    assert!(sink.events.is_empty());

    c.tick(at(1, 23, 0), &mut sink);
    assert_eq!(c.driver().is_high(PIN_A), Some(true));

    c.tick(at(1, 23, 20), &mut sink);
    assert_eq!(c.driver().is_high(PIN_A), Some(false));
    assert_eq!(c.driver().high_pins().count(), 0);

    c.tick(at(1, 23, 22), &mut sink);
    assert_eq!(c.driver().is_high(PIN_B), Some(true));

    c.tick(at(1, 23, 42), &mut sink);
    c.tick(at(1, 23, 44), &mut sink);
    assert_eq!(c.scheduler().phase(), Phase::Done);
    assert_eq!(c.next_fire_time(), at(2, 23, 0));

    assert_eq!(
        sink.take(),
        vec![
            switched(1, LineState::On, Origin::Schedule),
            switched(1, LineState::Off, Origin::Schedule),
            switched(2, LineState::On, Origin::Schedule),
            switched(2, LineState::Off, Origin::Schedule),
            AppEvent::DayComplete,
        ]
    );
    assert_eq!(
        c.driver().writes(),
        &[
            (PIN_A, Level::High),
            (PIN_A, Level::Low),
            (PIN_B, Level::High),
            (PIN_B, Level::Low),
        ]
    );
}

#[test]
fn pass_repeats_the_next_night() {
    let (mut c, mut sink) = garden();
    c.tick(at(1, 23, 50), &mut sink);
    assert_eq!(c.scheduler().phase(), Phase::Done);

    c.tick(at(2, 23, 0), &mut sink);
    assert_eq!(c.driver().is_high(PIN_A), Some(true));
}

// ── Skip ──────────────────────────────────────────────────────

#[test]
fn skip_during_first_run_cancels_second_line() {
    let (mut c, mut sink) = garden();
    c.tick(at(1, 23, 0), &mut sink);
    sink.take();

    c.dispatch("skip", 2, at(1, 23, 10), &mut sink).unwrap();
    assert_eq!(sink.take(), vec![AppEvent::SkipRequested(2)]);
    // Skipping does not touch any pin.
    assert_eq!(c.driver().is_high(PIN_A), Some(true));

    c.tick(at(1, 23, 20), &mut sink);
    c.tick(at(1, 23, 22), &mut sink);
    assert_eq!(
        sink.take(),
        vec![
            switched(1, LineState::Off, Origin::Schedule),
            AppEvent::RunSkipped(2),
            AppEvent::DayComplete,
        ]
    );
    assert_eq!(c.driver().level(PIN_B), None);
    assert_eq!(c.scheduler().phase(), Phase::Done);

    // Only tonight's run is cancelled.
    let status = c.status(2, at(1, 23, 30)).unwrap();
    assert_eq!(status.records()[0].next_run_start, Some(at(2, 23, 22)));
}

// ── Manual start ──────────────────────────────────────────────

#[test]
fn manual_start_preempts_running_line() {
    let (mut c, mut sink) = garden();
    c.tick(at(1, 23, 0), &mut sink);
    sink.take();

    let report = c.dispatch("start", 2, at(1, 23, 5), &mut sink).unwrap();
    assert_eq!(report.records()[0].state, LineState::On);
    assert_eq!(
        sink.take(),
        vec![
            switched(1, LineState::Off, Origin::Operator),
            switched(2, LineState::On, Origin::Operator),
        ]
    );
    assert_eq!(c.driver().high_pins().collect::<Vec<_>>(), vec![PIN_B]);

    // A's interrupted run is not resumed; B is released at A's boundary.
    c.tick(at(1, 23, 20), &mut sink);
    assert_eq!(sink.take(), vec![switched(2, LineState::Off, Origin::Schedule)]);

    // B still gets its own automatic slot.
    c.tick(at(1, 23, 22), &mut sink);
    assert_eq!(sink.take(), vec![switched(2, LineState::On, Origin::Schedule)]);
    assert_eq!(c.scheduler().active_line(), Some(2));
}

#[test]
fn manual_run_outside_the_pass_ends_after_one_run_duration() {
    let (mut c, mut sink) = garden();
    c.dispatch("start", 1, at(1, 14, 0), &mut sink).unwrap();
    assert_eq!(c.next_fire_time(), at(1, 14, 20));

    c.tick(at(1, 14, 19), &mut sink);
    assert_eq!(c.driver().is_high(PIN_A), Some(true));

    c.tick(at(1, 14, 20), &mut sink);
    assert_eq!(c.driver().is_high(PIN_A), Some(false));

    let status = c.status(1, at(1, 15, 0)).unwrap();
    assert_eq!(status.records()[0].last_run_end, Some(at(1, 14, 20)));
    assert_eq!(status.records()[0].next_run_start, Some(at(1, 23, 0)));
}

// ── Hardware faults ───────────────────────────────────────────

#[test]
fn failed_off_write_keeps_line_on_until_retried() {
    let (mut c, mut sink) = garden();
    c.tick(at(1, 23, 0), &mut sink);
    sink.take();

    c.driver_mut().fail_pin(PIN_A);
    c.tick(at(1, 23, 20), &mut sink);
    assert_eq!(sink.faults(), 1);
    let a = c.status(1, at(1, 23, 20)).unwrap();
    assert_eq!(a.records()[0].state, LineState::On);

    c.driver_mut().heal(PIN_A);
    let a = c.dispatch("stop", 1, at(1, 23, 21), &mut sink).unwrap();
    assert_eq!(a.records()[0].state, LineState::Off);
    assert_eq!(c.driver().is_high(PIN_A), Some(false));

    // The sequence carries on.
    c.tick(at(1, 23, 22), &mut sink);
    assert_eq!(c.driver().is_high(PIN_B), Some(true));
}

#[test]
fn failed_activation_abandons_that_run_only() {
    let (mut c, mut sink) = garden();
    c.driver_mut().fail_pin(PIN_A);
    c.tick(at(1, 23, 0), &mut sink);

    assert_eq!(sink.faults(), 1);
    assert_eq!(c.scheduler().active_line(), None);
    assert_eq!(c.driver().high_pins().count(), 0);

    c.tick(at(1, 23, 22), &mut sink);
    assert_eq!(c.driver().is_high(PIN_B), Some(true));
}

// ── Shutdown ──────────────────────────────────────────────────

#[test]
fn shutdown_closes_the_running_line() {
    let (mut c, mut sink) = garden();
    c.tick(at(1, 23, 0), &mut sink);
    sink.take();

    c.shutdown(at(1, 23, 3), &mut sink).unwrap();
    assert_eq!(
        sink.take(),
        vec![
            switched(1, LineState::Off, Origin::Shutdown),
            AppEvent::Shutdown
        ]
    );
    assert_eq!(c.driver().high_pins().count(), 0);
}
