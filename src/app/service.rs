//! Controller: the hexagonal core.
//!
//! [`Controller`] owns the lines, the pin registry, the scheduler and the
//! pin driver.  It is the single place where clock-driven transitions and
//! operator commands meet, and it arbitrates between them so that at most
//! one valve is ever open.
//!
//! ```text
//!   Clock ──tick──▶ ┌──────────────────────────┐ ──▶ EventSink
//!                   │        Controller        │
//! Operator ──cmd──▶ │ Scheduler · Lines · Pins │ ──▶ PinDriver
//!                   └──────────────────────────┘
//! ```
//!
//! The controller is not synchronised itself; callers that share it
//! across threads serialise access with one lock, see
//! [`Runtime`](crate::runtime::Runtime).

use chrono::NaiveDateTime;
use log::{error, info, warn};
use serde::Serialize;

use crate::config::{LineSpec, SystemConfig};
use crate::error::{ConfigError, Result};
use crate::line::{Line, LineState, LineStatus};
use crate::pins::PinRegistry;
use crate::scheduler::{ScheduleConfig, Scheduler, Step};

use super::commands::{Action, Command, Target};
use super::events::{AppEvent, Origin};
use super::ports::{EventSink, PinDriver};

// ───────────────────────────────────────────────────────────────
// Status report
// ───────────────────────────────────────────────────────────────

/// Status for one line, or for all of them in line order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StatusReport {
    One(LineStatus),
    All(Vec<LineStatus>),
}

impl StatusReport {
    pub fn records(&self) -> &[LineStatus] {
        match self {
            Self::One(status) => core::slice::from_ref(status),
            Self::All(all) => all,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Controller
// ───────────────────────────────────────────────────────────────

pub struct Controller<D: PinDriver> {
    lines: Vec<Line>,
    registry: PinRegistry,
    scheduler: Scheduler,
    driver: D,
    /// Most recent time the controller was told about.
    last_now: NaiveDateTime,
}

impl<D: PinDriver> Controller<D> {
    /// Build the controller.  Lines are numbered from 1 in the given order.
    ///
    /// Fails if there are no lines, if two lines share a pin, or if a full
    /// pass does not fit in a day.  No pin is written here.
    pub fn new(
        specs: Vec<LineSpec>,
        schedule: ScheduleConfig,
        driver: D,
        now: NaiveDateTime,
        sink: &mut impl EventSink,
    ) -> Result<Self> {
        if specs.is_empty() {
            return Err(ConfigError::NoLines.into());
        }
        schedule.check_fits(specs.len())?;

        let mut registry = PinRegistry::new();
        let mut lines = Vec::with_capacity(specs.len());
        for (i, spec) in specs.into_iter().enumerate() {
            let index = i + 1;
            registry.claim(spec.pin, index)?;
            info!("New line {}: {} on {}", index, spec.name, spec.pin);
            lines.push(Line::new(index, spec.name, spec.pin));
        }

        let scheduler = Scheduler::new(schedule, lines.len(), now);
        sink.emit(&AppEvent::Started(lines.len()));
        Ok(Self {
            lines,
            registry,
            scheduler,
            driver,
            last_now: now,
        })
    }

    /// Validate `config` and build the controller from it.
    pub fn from_config(
        config: &SystemConfig,
        driver: D,
        now: NaiveDateTime,
        sink: &mut impl EventSink,
    ) -> Result<Self> {
        let specs = config.line_specs()?;
        let schedule = config.schedule()?;
        Self::new(specs, schedule, driver, now, sink)
    }

    // ── Clock ─────────────────────────────────────────────────

    /// Apply every scheduled transition due at or before `now`.
    ///
    /// Hardware faults are reported through `sink` and never abort the
    /// remaining steps.
    pub fn tick(&mut self, now: NaiveDateTime, sink: &mut impl EventSink) {
        self.last_now = now;
        let steps = self.scheduler.poll(now);
        self.apply_steps(steps, now, sink);
    }

    /// The single pending scheduler decision.
    pub fn next_fire_time(&self) -> NaiveDateTime {
        self.scheduler.next_fire_time()
    }

    // ── Commands ──────────────────────────────────────────────

    /// Validate and execute a wire command, returning refreshed status.
    pub fn dispatch(
        &mut self,
        action: &str,
        line: i64,
        now: NaiveDateTime,
        sink: &mut impl EventSink,
    ) -> Result<StatusReport> {
        let cmd = Command::parse(action, line, self.lines.len()).inspect_err(|e| {
            warn!("Rejected command {action:?} on line {line}: {e}");
        })?;
        self.execute(cmd, now, sink)
    }

    /// Execute a validated command.
    ///
    /// Line 0 applies the action to every line.  Every line is attempted
    /// even if one of them faults; the first fault is returned.
    ///
    /// Start on line 0 runs the whole daily sequence now: opening every
    /// line at once is not possible with a single open valve.
    pub fn execute(
        &mut self,
        cmd: Command,
        now: NaiveDateTime,
        sink: &mut impl EventSink,
    ) -> Result<StatusReport> {
        self.last_now = now;
        info!("Command: {} on {}", cmd.action, self.describe(cmd.target));

        let outcome = match (cmd.action, cmd.target) {
            (Action::Start, Target::All) => self.start_pass(now, sink),
            (Action::Start, Target::Line(i)) => self.start_line(i, now, sink),
            (Action::Stop, target) => self.for_each(target, |c, i| c.stop_line(i, now, sink)),
            (Action::Skip, target) => self.for_each(target, |c, i| {
                c.skip_line(i, sink);
                Ok(())
            }),
        };
        outcome.map(|()| self.report(cmd.target, now))
    }

    fn for_each(
        &mut self,
        target: Target,
        mut apply: impl FnMut(&mut Self, usize) -> Result<()>,
    ) -> Result<()> {
        let indices = match target {
            Target::All => 1..=self.lines.len(),
            Target::Line(i) => i..=i,
        };
        let mut first_fault = None;
        for i in indices {
            if let Err(e) = apply(self, i) {
                first_fault.get_or_insert(e);
            }
        }
        first_fault.map_or(Ok(()), Err)
    }

    /// Manual override: close whatever is open, then open `index`.
    fn start_line(
        &mut self,
        index: usize,
        now: NaiveDateTime,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        if self.scheduler.active_line() == Some(index) {
            return self
                .switch(index, LineState::On, now, Origin::Operator, sink)
                .map(|_| ());
        }

        self.close_others(index, now, Origin::Operator, sink)?;
        self.scheduler.begin_manual(index, now);
        if let Err(e) = self.switch(index, LineState::On, now, Origin::Operator, sink) {
            self.scheduler.cancel_manual(index);
            return Err(e);
        }
        Ok(())
    }

    fn stop_line(
        &mut self,
        index: usize,
        now: NaiveDateTime,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        self.scheduler.stop(index, now);
        self.switch(index, LineState::Off, now, Origin::Operator, sink)
            .map(|_| ())
    }

    fn skip_line(&mut self, index: usize, sink: &mut impl EventSink) {
        if self.scheduler.skip(index) {
            sink.emit(&AppEvent::SkipRequested(index));
        }
    }

    fn start_pass(&mut self, now: NaiveDateTime, sink: &mut impl EventSink) -> Result<()> {
        self.close_others(0, now, Origin::Operator, sink)?;
        let steps = self.scheduler.start_pass(now);
        self.apply_steps(steps, now, sink);
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    /// Status of one line, or of every line for `line == 0`.  No side
    /// effect.
    pub fn status(&self, line: i64, now: NaiveDateTime) -> Result<StatusReport> {
        let target = Target::parse(line, self.lines.len())?;
        Ok(self.report(target, now))
    }

    fn report(&self, target: Target, now: NaiveDateTime) -> StatusReport {
        match target {
            Target::All => StatusReport::All(
                (1..=self.lines.len())
                    .map(|i| self.line_status(i, now))
                    .collect(),
            ),
            Target::Line(i) => StatusReport::One(self.line_status(i, now)),
        }
    }

    fn line_status(&self, index: usize, now: NaiveDateTime) -> LineStatus {
        self.lines[index - 1].status(
            now,
            self.scheduler.last_run_end(index),
            self.scheduler.next_run_start(index),
        )
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn registry(&self) -> &PinRegistry {
        &self.registry
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Force every line Off regardless of scheduler state.
    ///
    /// Every line is attempted; the first fault is returned.
    pub fn shutdown(&mut self, now: NaiveDateTime, sink: &mut impl EventSink) -> Result<()> {
        self.last_now = now;
        info!("Shutdown: turning all lines off");
        let result = self.for_each(Target::All, |c, i| {
            c.switch(i, LineState::Off, now, Origin::Shutdown, sink)
                .map(|_| ())
        });
        sink.emit(&AppEvent::Shutdown);
        result
    }

    // ── Internal ──────────────────────────────────────────────

    fn apply_steps(&mut self, steps: Vec<Step>, now: NaiveDateTime, sink: &mut impl EventSink) {
        for step in steps {
            match step {
                Step::Activate(i) => {
                    let opened = self
                        .close_others(i, now, Origin::Schedule, sink)
                        .and_then(|()| self.switch(i, LineState::On, now, Origin::Schedule, sink));
                    if opened.is_err() {
                        warn!("Line {}: automatic run abandoned", i);
                        self.scheduler.abandon(i, now);
                    }
                }
                Step::Deactivate(i) => {
                    // Fault already reported; the operator may retry the stop.
                    let _ = self.switch(i, LineState::Off, now, Origin::Schedule, sink);
                }
                Step::Skipped(i) => sink.emit(&AppEvent::RunSkipped(i)),
                Step::DayComplete => sink.emit(&AppEvent::DayComplete),
            }
        }
    }

    /// Close every open line except `keep`.  Fails without opening
    /// anything if one of them could not be closed.
    fn close_others(
        &mut self,
        keep: usize,
        now: NaiveDateTime,
        origin: Origin,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let open: Vec<usize> = self
            .lines
            .iter()
            .filter(|l| l.is_on() && l.index() != keep)
            .map(Line::index)
            .collect();
        let mut first_fault = None;
        for i in open {
            if let Err(e) = self.switch(i, LineState::Off, now, origin, sink) {
                first_fault.get_or_insert(e);
            }
        }
        first_fault.map_or(Ok(()), Err)
    }

    /// Drive one line and report the outcome.
    fn switch(
        &mut self,
        index: usize,
        state: LineState,
        now: NaiveDateTime,
        origin: Origin,
        sink: &mut impl EventSink,
    ) -> Result<bool> {
        let line = &mut self.lines[index - 1];
        match line.set_state(state, now, &mut self.driver) {
            Ok(true) => {
                if state == LineState::Off {
                    self.scheduler.record_run_end(index, now);
                }
                sink.emit(&AppEvent::LineSwitched {
                    line: index,
                    state,
                    origin,
                });
                Ok(true)
            }
            Ok(false) => Ok(false),
            Err(e) => {
                sink.emit(&AppEvent::HardwareFault {
                    line: index,
                    error: e.clone(),
                });
                Err(e)
            }
        }
    }

    fn describe(&self, target: Target) -> String {
        match target {
            Target::All => "all lines".to_string(),
            Target::Line(i) => format!("line {} ({})", i, self.lines[i - 1].name()),
        }
    }
}

impl<D: PinDriver> Drop for Controller<D> {
    /// Last line of defence: no valve stays open when the controller goes
    /// away, including while unwinding from a panic.
    fn drop(&mut self) {
        let now = self.last_now;
        for line in &mut self.lines {
            if let Err(e) = line.set_state(LineState::Off, now, &mut self.driver) {
                error!("Line {} left open at drop: {}", line.index(), e);
            }
        }
    }
}
