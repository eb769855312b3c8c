//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the `log` facade.  The binary routes those records to stderr; a
//! network publisher would implement the same trait.

use log::{error, info, warn};

use crate::app::events::{AppEvent, Origin};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] as one tagged line.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(lines) => {
                info!("START | lines={}", lines);
            }
            AppEvent::LineSwitched {
                line,
                state,
                origin,
            } => {
                let by = match origin {
                    Origin::Schedule => "schedule",
                    Origin::Operator => "operator",
                    Origin::Shutdown => "shutdown",
                };
                info!("LINE  | {} -> {} | by={}", line, state, by);
            }
            AppEvent::SkipRequested(line) => {
                info!("SCHED | line {} next run cancelled", line);
            }
            AppEvent::RunSkipped(line) => {
                info!("SCHED | line {} skipped", line);
            }
            AppEvent::DayComplete => {
                info!("SCHED | daily pass complete");
            }
            AppEvent::HardwareFault { line, error: e } => {
                error!("FAULT | line {} | {}", line, e);
            }
            AppEvent::Shutdown => {
                warn!("STOP  | all lines off");
            }
        }
    }
}
