//! Daily run scheduler.
//!
//! Sequences the automatic runs: once a day, starting at `daily_start`,
//! every line is opened in index order for `run_duration`, with `gap`
//! of all-closed time between consecutive lines.
//!
//! ```text
//!            daily_start                run_duration elapses
//!   ┌──────┐ ─────────▶ ┌──────────────┐ ───────────────────▶ ┌─────┐
//!   │ Idle │            │ Running(i)   │                      │ Gap │
//!   └──────┘            └──────────────┘ ◀─────────────────── └─────┘
//!       ▲                      │            gap elapses,         │
//!       │                      │            next unskipped line  │
//!       │   next daily_start   ▼                                 │
//!       └──────────────── ┌──────┐ ◀──── no lines left ──────────┘
//!                         │ Done │
//!                         └──────┘
//! ```
//!
//! The scheduler is pure bookkeeping: it never touches a pin.  It is
//! driven by a single clock through [`Scheduler::poll`], which returns
//! the [`Step`]s the controller must apply, and is informed of operator
//! overrides through [`stop`](Scheduler::stop), [`skip`](Scheduler::skip)
//! and [`begin_manual`](Scheduler::begin_manual).
//!
//! ## Manual overrides
//!
//! A manual run pauses nothing: the scheduler keeps its position and its
//! pending fire time.  If the manual start displaced an automatic run,
//! that run is abandoned (not resumed later).  The manual line is turned
//! off at the scheduler's next natural boundary or after one
//! `run_duration`, whichever comes first, and the sequence continues.

use std::collections::BTreeSet;

use chrono::{NaiveDateTime, NaiveTime, TimeDelta};
use log::info;

use crate::error::ConfigError;

// ═══════════════════════════════════════════════════════════════
//  Schedule policy
// ═══════════════════════════════════════════════════════════════

/// Immutable daily-run policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    daily_start: NaiveTime,
    run_duration: TimeDelta,
    gap: TimeDelta,
}

impl ScheduleConfig {
    pub fn new(
        daily_start: NaiveTime,
        run_duration: TimeDelta,
        gap: TimeDelta,
    ) -> Result<Self, ConfigError> {
        if run_duration <= TimeDelta::zero() {
            return Err(ConfigError::ZeroRunDuration);
        }
        if gap < TimeDelta::zero() {
            return Err(ConfigError::NegativeGap);
        }
        let config = Self {
            daily_start,
            run_duration,
            gap,
        };
        config.check_fits(1)?;
        Ok(config)
    }

    pub fn daily_start(&self) -> NaiveTime {
        self.daily_start
    }

    pub fn run_duration(&self) -> TimeDelta {
        self.run_duration
    }

    pub fn gap(&self) -> TimeDelta {
        self.gap
    }

    /// First occurrence of `daily_start` at or after `now`.
    pub fn start_at_or_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date().and_time(self.daily_start);
        if today >= now {
            today
        } else {
            today + TimeDelta::days(1)
        }
    }

    /// First occurrence of `daily_start` strictly after `at`.
    pub fn next_start_after(&self, at: NaiveDateTime) -> NaiveDateTime {
        let today = at.date().and_time(self.daily_start);
        if today > at {
            today
        } else {
            today + TimeDelta::days(1)
        }
    }

    /// Wall time from `daily_start` to `Done` for `lines` lines.  Every
    /// run, the last one included, is followed by a gap.  `None` if the
    /// length is not representable.
    pub fn pass_length(&self, lines: usize) -> Option<TimeDelta> {
        let n = i32::try_from(lines).ok()?;
        self.run_duration
            .checked_add(&self.gap)?
            .checked_mul(n)
    }

    /// A pass must reach `Done` before the next day's start.
    pub fn check_fits(&self, lines: usize) -> Result<(), ConfigError> {
        match self.pass_length(lines) {
            Some(length) if length < TimeDelta::days(1) => Ok(()),
            _ => Err(ConfigError::ScheduleOverrun { lines }),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler state
// ═══════════════════════════════════════════════════════════════

/// Where the daily sequence currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for today's `daily_start`.
    Idle,
    /// `line` is in its automatic run until `until`.  An `abandoned` run
    /// was cut short by an operator; its remaining time is not resumed.
    Running {
        line: usize,
        until: NaiveDateTime,
        abandoned: bool,
    },
    /// All lines closed until `until`; `after` was the last line's turn.
    Gap { after: usize, until: NaiveDateTime },
    /// Every line has had its turn; waiting for the next day's start.
    Done,
}

/// Action the controller must carry out after a [`Scheduler::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Open this line for its automatic run.
    Activate(usize),
    /// Close this line (end of automatic run, or manual run released).
    Deactivate(usize),
    /// This line's turn was passed over because of a skip request.
    Skipped(usize),
    /// The daily pass finished.
    DayComplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ManualRun {
    line: usize,
    until: NaiveDateTime,
}

/// The scheduler engine.
#[derive(Debug, Clone)]
pub struct Scheduler {
    config: ScheduleConfig,
    line_count: usize,
    phase: Phase,
    /// Next daily pass start; only meaningful while Idle or Done.
    day_start: NaiveDateTime,
    /// Lines whose next automatic turn is cancelled.
    skipped: BTreeSet<usize>,
    manual: Option<ManualRun>,
    /// Indexed by `line - 1`.
    last_run_end: Vec<Option<NaiveDateTime>>,
}

impl Scheduler {
    /// Start Idle, waiting for the first `daily_start` at or after `now`.
    /// A process started mid-pass does not catch up on missed turns.
    pub fn new(config: ScheduleConfig, line_count: usize, now: NaiveDateTime) -> Self {
        let day_start = config.start_at_or_after(now);
        info!(
            "Scheduler: {} lines, first pass at {}, run {}s, gap {}s",
            line_count,
            day_start,
            config.run_duration.num_seconds(),
            config.gap.num_seconds()
        );
        Self {
            config,
            line_count,
            phase: Phase::Idle,
            day_start,
            skipped: BTreeSet::new(),
            manual: None,
            last_run_end: vec![None; line_count],
        }
    }

    // ── Clock-driven transitions ─────────────────────────────

    /// Process every boundary due at or before `now`.
    ///
    /// Boundaries are applied at their scheduled instants, not at `now`,
    /// so a late poll does not stretch runs or gaps.
    pub fn poll(&mut self, now: NaiveDateTime) -> Vec<Step> {
        let mut steps = Vec::new();
        loop {
            let phase_due = self.phase_fire_time();

            if let Some(manual) = self.manual {
                if manual.until < phase_due && manual.until <= now {
                    info!("Scheduler: manual run of line {} ended", manual.line);
                    self.manual = None;
                    self.record_run_end(manual.line, manual.until);
                    steps.push(Step::Deactivate(manual.line));
                    continue;
                }
            }

            if phase_due > now {
                break;
            }

            let mut boundary = self.advance(phase_due);
            if let Some(manual) = self.manual.take() {
                info!(
                    "Scheduler: manual run of line {} released at boundary",
                    manual.line
                );
                if !boundary.contains(&Step::Activate(manual.line)) {
                    self.record_run_end(manual.line, phase_due);
                    boundary.insert(0, Step::Deactivate(manual.line));
                }
            }
            steps.extend(boundary);
        }
        steps
    }

    fn advance(&mut self, at: NaiveDateTime) -> Vec<Step> {
        let mut steps = Vec::new();
        match self.phase {
            Phase::Idle | Phase::Done => self.start_from(1, at, &mut steps),
            Phase::Running {
                line, abandoned, ..
            } => {
                if !abandoned {
                    info!("Scheduler: line {} run complete", line);
                    self.record_run_end(line, at);
                    steps.push(Step::Deactivate(line));
                }
                if self.config.gap.is_zero() {
                    self.start_from(line + 1, at, &mut steps);
                } else {
                    self.phase = Phase::Gap {
                        after: line,
                        until: at + self.config.gap,
                    };
                }
            }
            Phase::Gap { after, .. } => self.start_from(after + 1, at, &mut steps),
        }
        steps
    }

    /// Give the turn to the first unskipped line from `first` on, or
    /// finish the day.  Skip requests are consumed as their turn passes.
    fn start_from(&mut self, first: usize, at: NaiveDateTime, steps: &mut Vec<Step>) {
        for line in first..=self.line_count {
            if self.skipped.remove(&line) {
                info!("Scheduler: line {} skipped", line);
                steps.push(Step::Skipped(line));
                continue;
            }
            info!("Scheduler: line {} automatic run starts", line);
            self.phase = Phase::Running {
                line,
                until: at + self.config.run_duration,
                abandoned: false,
            };
            steps.push(Step::Activate(line));
            return;
        }

        self.phase = Phase::Done;
        self.day_start = self.config.next_start_after(at);
        info!("Scheduler: daily pass done, next at {}", self.day_start);
        steps.push(Step::DayComplete);
    }

    // ── Operator overrides ───────────────────────────────────

    /// Operator stop for `line`.
    ///
    /// Ends the line's automatic run (its remaining time is abandoned and
    /// the gap starts now) or its manual run.  Returns whether anything
    /// changed.
    pub fn stop(&mut self, line: usize, now: NaiveDateTime) -> bool {
        let mut changed = false;
        if self.active_line() == Some(line) {
            info!("Scheduler: line {} run stopped by operator", line);
            self.record_run_end(line, now);
            self.phase = Phase::Gap {
                after: line,
                until: now + self.config.gap,
            };
            changed = true;
        }
        if self.manual_line() == Some(line) {
            info!("Scheduler: manual run of line {} stopped", line);
            self.manual = None;
            self.record_run_end(line, now);
            changed = true;
        }
        changed
    }

    /// Run the whole sequence now instead of waiting for `daily_start`.
    ///
    /// Any automatic or manual run in progress ends first.  The regular
    /// pass still happens at the next `daily_start` after this one ends.
    pub fn start_pass(&mut self, now: NaiveDateTime) -> Vec<Step> {
        info!("Scheduler: pass started by operator");
        let mut steps = Vec::new();
        if let Some(manual) = self.manual.take() {
            self.record_run_end(manual.line, now);
            steps.push(Step::Deactivate(manual.line));
        }
        if let Some(active) = self.active_line() {
            self.record_run_end(active, now);
            steps.push(Step::Deactivate(active));
        }
        self.start_from(1, now, &mut steps);
        steps
    }

    /// Cancel the next automatic turn of `line`.  Returns `false` if a
    /// skip was already pending.
    ///
    /// A skip issued after the line's turn tonight applies to tomorrow.
    pub fn skip(&mut self, line: usize) -> bool {
        let fresh = self.skipped.insert(line);
        if fresh {
            info!("Scheduler: next run of line {} cancelled", line);
        }
        fresh
    }

    /// Record a manual run of `line` starting at `now`.
    ///
    /// Returns the automatic line displaced by it, if any.  Starting the
    /// line that is already in its automatic run changes nothing.
    pub fn begin_manual(&mut self, line: usize, now: NaiveDateTime) -> Option<usize> {
        if self.active_line() == Some(line) {
            return None;
        }

        let mut displaced = None;
        if let Phase::Running {
            line: active,
            abandoned,
            ..
        } = &mut self.phase
        {
            if !*abandoned {
                *abandoned = true;
                displaced = Some(*active);
            }
        }
        if let Some(active) = displaced {
            info!("Scheduler: line {} run abandoned for manual start", active);
            self.record_run_end(active, now);
        }

        let until = now + self.config.run_duration;
        if let Some(prev) = self.manual.replace(ManualRun { line, until }) {
            if prev.line != line {
                self.record_run_end(prev.line, now);
            }
        }
        info!("Scheduler: manual run of line {} until {}", line, until);
        displaced
    }

    /// Forget a manual run that never got its valve open.
    pub fn cancel_manual(&mut self, line: usize) {
        if self.manual_line() == Some(line) {
            self.manual = None;
        }
    }

    /// Mark the automatic run of `line` as abandoned, e.g. because its
    /// valve could not be opened.
    pub fn abandon(&mut self, line: usize, now: NaiveDateTime) {
        if self.active_line() == Some(line) {
            if let Phase::Running { abandoned, .. } = &mut self.phase {
                *abandoned = true;
            }
            self.record_run_end(line, now);
        }
    }

    /// Note that `line` closed at `at` outside of the scheduler's own
    /// transitions (e.g. an operator stop of an unscheduled line).
    pub fn record_run_end(&mut self, line: usize, at: NaiveDateTime) {
        if let Some(slot) = line.checked_sub(1).and_then(|i| self.last_run_end.get_mut(i)) {
            *slot = Some(at);
        }
    }

    // ── Queries ──────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    /// Line currently in an automatic On period.
    pub fn active_line(&self) -> Option<usize> {
        match self.phase {
            Phase::Running {
                line,
                abandoned: false,
                ..
            } => Some(line),
            _ => None,
        }
    }

    /// Line currently in a manual run.
    pub fn manual_line(&self) -> Option<usize> {
        self.manual.map(|m| m.line)
    }

    pub fn is_skipped(&self, line: usize) -> bool {
        self.skipped.contains(&line)
    }

    pub fn skipped(&self) -> impl Iterator<Item = usize> + '_ {
        self.skipped.iter().copied()
    }

    /// The single pending "what happens next" instant.
    pub fn next_fire_time(&self) -> NaiveDateTime {
        let phase_due = self.phase_fire_time();
        match self.manual {
            Some(m) if m.until < phase_due => m.until,
            _ => phase_due,
        }
    }

    fn phase_fire_time(&self) -> NaiveDateTime {
        match self.phase {
            Phase::Idle | Phase::Done => self.day_start,
            Phase::Running { until, .. } | Phase::Gap { until, .. } => until,
        }
    }

    pub fn last_run_end(&self, line: usize) -> Option<NaiveDateTime> {
        line.checked_sub(1)
            .and_then(|i| self.last_run_end.get(i))
            .copied()
            .flatten()
    }

    /// Projected start of the next automatic run of `line`, assuming no
    /// further operator action.  Pending skips are honoured.
    pub fn next_run_start(&self, line: usize) -> Option<NaiveDateTime> {
        if line == 0 || line > self.line_count {
            return None;
        }

        let slot = self.config.run_duration + self.config.gap;
        let (mut cursor, mut at) = match self.phase {
            Phase::Idle | Phase::Done => (1, self.day_start),
            Phase::Running {
                line: active,
                until,
                ..
            } => (active + 1, until + self.config.gap),
            Phase::Gap { after, until } => (after + 1, until),
        };
        let mut skipped = self.skipped.clone();

        // A pending skip consumes at most one turn, so three passes over
        // the lines always reach the answer.
        for _ in 0..3 * (self.line_count + 1) {
            if cursor > self.line_count {
                at = self.config.next_start_after(at);
                cursor = 1;
                continue;
            }
            if skipped.remove(&cursor) {
                cursor += 1;
                continue;
            }
            if cursor == line {
                return Some(at);
            }
            at += slot;
            cursor += 1;
        }
        None
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
