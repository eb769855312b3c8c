//! Thread-safe runtime around the [`Controller`].
//!
//! One mutex serialises every read-then-write of controller state, so a
//! clock-fired transition and an operator command can never interleave.
//! The scheduler thread sleeps on a condition variable until the next
//! fire time (capped at the poll interval); commands wake it early so a
//! change of plan is picked up immediately.
//!
//! ```text
//!   operator ──dispatch──┐                  ┌── scheduler thread
//!                        ▼                  ▼
//!                 ┌─────────────────────────────┐
//!                 │ Mutex<Controller + Sink>    │
//!                 └─────────────────────────────┘
//!                        │ notify      wait_timeout ▲
//!                        └────────── Condvar ───────┘
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use log::{error, info, warn};

use crate::app::ports::{Clock, EventSink, PinDriver};
use crate::app::service::{Controller, StatusReport};
use crate::error::Result;

const SCHEDULER_STACK_KB: usize = 64;

struct Inner<D: PinDriver, S> {
    controller: Controller<D>,
    sink: S,
    running: bool,
}

struct Shared<D: PinDriver, C, S> {
    inner: Mutex<Inner<D, S>>,
    wake: Condvar,
    clock: C,
    poll_interval: Duration,
}

/// Cloneable handle; every clone drives the same controller.
pub struct Runtime<D: PinDriver, C: Clock, S: EventSink> {
    shared: Arc<Shared<D, C, S>>,
}

impl<D: PinDriver, C: Clock, S: EventSink> Clone for Runtime<D, C, S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<D: PinDriver, C: Clock, S: EventSink> Runtime<D, C, S> {
    pub fn new(controller: Controller<D>, sink: S, clock: C, poll_interval: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    controller,
                    sink,
                    running: true,
                }),
                wake: Condvar::new(),
                clock,
                poll_interval: poll_interval.max(Duration::from_millis(1)),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<D, S>> {
        self.shared
            .inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    /// Execute an operator command and wake the scheduler thread.
    pub fn dispatch(&self, action: &str, line: i64) -> Result<StatusReport> {
        let mut inner = self.lock();
        let now = self.shared.clock.now();
        let Inner {
            controller, sink, ..
        } = &mut *inner;
        let result = controller.dispatch(action, line, now, sink);
        drop(inner);
        self.shared.wake.notify_all();
        result
    }

    pub fn status(&self, line: i64) -> Result<StatusReport> {
        let inner = self.lock();
        inner.controller.status(line, self.shared.clock.now())
    }

    /// Apply every scheduled transition due now.
    pub fn tick(&self) {
        let mut inner = self.lock();
        let now = self.shared.clock.now();
        let Inner {
            controller, sink, ..
        } = &mut *inner;
        controller.tick(now, sink);
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// Read-only access to the controller under the lock.
    pub fn with_controller<R>(&self, f: impl FnOnce(&Controller<D>) -> R) -> R {
        f(&self.lock().controller)
    }

    /// Force every line Off and end the scheduler thread.  Later calls
    /// only retry lines that failed to close.
    pub fn stop(&self) -> Result<()> {
        let mut inner = self.lock();
        let now = self.shared.clock.now();
        if inner.running {
            info!("Runtime: stopping");
        }
        inner.running = false;
        let Inner {
            controller, sink, ..
        } = &mut *inner;
        let result = controller.shutdown(now, sink);
        drop(inner);
        self.shared.wake.notify_all();
        result
    }

    /// Block the scheduler loop on this thread until [`stop`](Self::stop).
    pub fn run_scheduler(&self) {
        let mut inner = self.lock();
        while inner.running {
            let now = self.shared.clock.now();
            let Inner {
                controller,
                sink,
                running,
            } = &mut *inner;
            let ticked = panic::catch_unwind(AssertUnwindSafe(|| controller.tick(now, &mut *sink)));
            if ticked.is_err() {
                error!("Runtime: scheduler tick panicked, closing all lines");
                *running = false;
                if let Err(e) = controller.shutdown(now, sink) {
                    error!("Runtime: shutdown after panic incomplete: {}", e);
                }
                self.shared.wake.notify_all();
                break;
            }

            let wait = (controller.next_fire_time() - now)
                .to_std()
                .unwrap_or(Duration::ZERO)
                .min(self.shared.poll_interval);
            inner = self
                .shared
                .wake
                .wait_timeout(inner, wait)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|e| e.into_inner().0);
        }
        info!("Runtime: scheduler loop exited");
    }
}

impl<D, C, S> Runtime<D, C, S>
where
    D: PinDriver + Send + 'static,
    C: Clock + 'static,
    S: EventSink + Send + 'static,
{
    /// Run the scheduler loop on its own named thread.
    pub fn spawn_scheduler(&self) -> std::io::Result<JoinHandle<()>> {
        let rt = self.clone();
        info!(
            "Spawning 'scheduler' (poll cap {}ms, stack={}KB)",
            self.shared.poll_interval.as_millis(),
            SCHEDULER_STACK_KB
        );
        std::thread::Builder::new()
            .name("scheduler".into())
            .stack_size(SCHEDULER_STACK_KB * 1024)
            .spawn(move || rt.run_scheduler())
            .inspect_err(|e| warn!("Runtime: scheduler thread failed to start: {e}"))
    }
}
