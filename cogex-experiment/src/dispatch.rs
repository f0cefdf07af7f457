//! The live loop: waits for each onset in short slices, presents, and
//! timestamps everything against the session clock.

use std::time::Duration;

use cogex_core::{AtomicEvent, Input, KeySource, Presenter, StimulusRef};
use cogex_timing::Clock;
use tracing::{info, warn};

use crate::config::DispatchConfig;
use crate::error::{SessionError, SessionResult};
use crate::log::SessionLog;
use crate::queue::EventQueue;

/// Whether a wait ran to its end or the operator aborted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Queue drained
    Completed,
    /// Operator abort; undispatched events stay in the queue
    Interrupted,
}

/// Drains pending input, handing key presses to `on_key` with the time
/// they were observed. Stops at the first abort.
pub fn drain_input<B, C>(backend: &mut B, clock: &C, mut on_key: impl FnMut(u64, &str)) -> Flow
where
    B: KeySource + ?Sized,
    C: Clock + ?Sized,
{
    while let Some(input) = backend.poll_key() {
        match input {
            Input::Key(key) => on_key(clock.now_ms(), &key),
            Input::Abort => return Flow::Abort,
        }
    }
    Flow::Continue
}

/// Sleeps in `slice` steps until the clock reaches `deadline`, polling
/// input after every step
pub fn wait_until<B, C>(
    backend: &mut B,
    clock: &C,
    deadline_ms: u64,
    slice: Duration,
    mut on_key: impl FnMut(u64, &str),
) -> Flow
where
    B: KeySource + ?Sized,
    C: Clock + ?Sized,
{
    loop {
        let now = clock.now_ms();
        if now >= deadline_ms {
            return Flow::Continue;
        }
        let remaining = Duration::from_millis(deadline_ms - now);
        clock.sleep(slice.min(remaining));
        if drain_input(backend, clock, &mut on_key) == Flow::Abort {
            return Flow::Abort;
        }
    }
}

/// Blocks until `key` is pressed. Other keys are ignored.
pub fn wait_for_key<B, C>(backend: &mut B, clock: &C, key: &str, slice: Duration) -> Flow
where
    B: KeySource + ?Sized,
    C: Clock + ?Sized,
{
    loop {
        while let Some(input) = backend.poll_key() {
            match input {
                Input::Key(k) if k == key => return Flow::Continue,
                Input::Key(_) => {}
                Input::Abort => return Flow::Abort,
            }
        }
        clock.sleep(slice);
    }
}

/// Runs the event queue against a backend, logging into a session log
pub struct Dispatcher<'a, B, C> {
    config: &'a DispatchConfig,
    backend: &'a mut B,
    clock: &'a C,
    log: &'a mut SessionLog,
}

impl<'a, B, C> Dispatcher<'a, B, C>
where
    B: KeySource,
    C: Clock,
{
    pub fn new(
        config: &'a DispatchConfig,
        backend: &'a mut B,
        clock: &'a C,
        log: &'a mut SessionLog,
    ) -> Self {
        Self {
            config,
            backend,
            clock,
            log,
        }
    }

    /// Pops and presents every event. Presentation errors abort the run;
    /// the log keeps everything recorded before the failure.
    pub fn run<H>(&mut self, queue: &mut EventQueue<H>) -> SessionResult<DispatchOutcome>
    where
        B: Presenter<H>,
    {
        while let Some(onset_ms) = queue.peek_onset() {
            let present_at = onset_ms.saturating_sub(self.config.lookahead_ms);
            if self.wait_logged(present_at, self.config.poll_interval) == Flow::Abort {
                info!(
                    at_ms = self.clock.now_ms(),
                    remaining = queue.len(),
                    "dispatch interrupted"
                );
                return Ok(DispatchOutcome::Interrupted);
            }

            let Some(event) = queue.pop_min() else {
                break;
            };
            self.present_event(&event)?;

            if self.poll() == Flow::Abort {
                info!(at_ms = self.clock.now_ms(), remaining = queue.len(), "dispatch interrupted");
                return Ok(DispatchOutcome::Interrupted);
            }
        }
        Ok(DispatchOutcome::Completed)
    }

    fn present_event<H>(&mut self, event: &AtomicEvent<H>) -> SessionResult<()>
    where
        B: Presenter<H>,
    {
        self.backend
            .present(event.payload.stimulus())
            .map_err(|source| SessionError::Presentation {
                id: event.id().to_string(),
                target_onset_ms: event.onset_ms,
                source,
            })?;
        let now = self.clock.now_ms();
        self.log.push_presentation(event, now);

        let late_ms = now.saturating_sub(event.onset_ms);
        if late_ms > 2 * self.config.lookahead_ms {
            warn!(
                id = event.id(),
                target_ms = event.onset_ms,
                late_ms,
                "late presentation"
            );
        }
        Ok(())
    }

    /// Presents an unlogged screen (fixation cross, messages)
    pub fn show<H>(&mut self, stimulus: StimulusRef<'_, H>) -> SessionResult<()>
    where
        B: Presenter<H>,
    {
        self.backend.present(stimulus)?;
        Ok(())
    }

    /// Coarse wait until `total_ms`, still logging key presses
    pub fn rest_until(&mut self, total_ms: u64) -> Flow {
        info!(from_ms = self.clock.now_ms(), until_ms = total_ms, "resting");
        self.wait_logged(total_ms, self.config.rest_interval)
    }

    fn poll(&mut self) -> Flow {
        let log = &mut *self.log;
        drain_input(&mut *self.backend, self.clock, |t, key| log.push_keypress(t, key))
    }

    fn wait_logged(&mut self, deadline_ms: u64, slice: Duration) -> Flow {
        let log = &mut *self.log;
        wait_until(&mut *self.backend, self.clock, deadline_ms, slice, |t, key| {
            log.push_keypress(t, key)
        })
    }
}
