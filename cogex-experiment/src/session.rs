use std::path::Path;

use cogex_cache::StimulusCatalog;
use cogex_core::{AssetRequest, KeySource, Presenter, ScriptRow, StimulusLoader, StimulusRef};
use cogex_timing::Clock;
use tracing::info;

use crate::config::SessionConfig;
use crate::dispatch::{wait_for_key, wait_until, DispatchOutcome, Dispatcher, Flow};
use crate::error::{SessionResult, SetupError, SetupResult};
use crate::log::SessionLog;
use crate::queue::EventQueue;
use crate::timeline::TimelineCompiler;

/// A fully loaded acquisition run, ready to wait for the trigger
pub struct Session<H> {
    config: SessionConfig,
    queue: EventQueue<H>,
    waiting: H,
    closing: H,
    log: SessionLog,
    stimuli: usize,
}

impl<H: Clone> Session<H> {
    /// Compiles the script and loads every stimulus, including the waiting
    /// and closing messages. File payloads resolve against `base_dir`.
    pub fn prepare<L>(
        config: SessionConfig,
        script_name: &str,
        rows: &[ScriptRow],
        base_dir: &Path,
        loader: &mut L,
    ) -> SetupResult<Self>
    where
        L: StimulusLoader<Handle = H>,
    {
        let mut catalog = StimulusCatalog::new();
        let queue =
            TimelineCompiler::new(&config.timing, base_dir, &mut catalog, loader).compile(rows)?;

        let waiting = catalog
            .resolve_and_load(loader, &AssetRequest::text(config.waiting_message.as_str()))
            .map_err(|source| SetupError::Builtin {
                what: "waiting message",
                source,
            })?;
        let closing = catalog
            .resolve_and_load(loader, &AssetRequest::text(config.closing_message.as_str()))
            .map_err(|source| SetupError::Builtin {
                what: "closing message",
                source,
            })?;

        info!(
            script = script_name,
            events = queue.len(),
            stimuli = catalog.len(),
            "session prepared"
        );
        Ok(Self {
            log: SessionLog::new(config.subject.as_str(), script_name),
            stimuli: catalog.len(),
            config,
            queue,
            waiting,
            closing,
        })
    }

    /// Waiting message, trigger, fixation, timeline, rest, closing message.
    ///
    /// The closing sequence runs on completion and on operator abort. A
    /// presentation error skips it and propagates; [`Session::log`] still
    /// holds everything recorded up to the failure.
    pub fn run<B, C>(&mut self, backend: &mut B, clock: &mut C) -> SessionResult<DispatchOutcome>
    where
        B: Presenter<H> + KeySource,
        C: Clock,
    {
        backend.present(StimulusRef::Asset(&self.waiting))?;
        info!(key = %self.config.trigger_key, "waiting for trigger");
        let trigger = wait_for_key(
            backend,
            clock,
            &self.config.trigger_key,
            self.config.dispatch.poll_interval,
        );

        let outcome = match trigger {
            Flow::Abort => {
                info!("aborted before trigger");
                DispatchOutcome::Interrupted
            }
            Flow::Continue => {
                clock.reset();
                info!(events = self.queue.len(), "trigger received, session clock started");
                self.dispatch(backend, clock)?
            }
        };

        self.close(backend, clock)?;
        info!(?outcome, records = self.log.len(), "session finished");
        Ok(outcome)
    }

    fn dispatch<B, C>(&mut self, backend: &mut B, clock: &C) -> SessionResult<DispatchOutcome>
    where
        B: Presenter<H> + KeySource,
        C: Clock,
    {
        let mut dispatcher = Dispatcher::new(&self.config.dispatch, backend, clock, &mut self.log);
        dispatcher.show(StimulusRef::<H>::FixationCross)?;
        if dispatcher.run(&mut self.queue)? == DispatchOutcome::Interrupted {
            return Ok(DispatchOutcome::Interrupted);
        }

        dispatcher.show(StimulusRef::<H>::FixationCross)?;
        match self.config.dispatch.total_duration_ms {
            Some(total_ms) if dispatcher.rest_until(total_ms) == Flow::Abort => {
                Ok(DispatchOutcome::Interrupted)
            }
            _ => Ok(DispatchOutcome::Completed),
        }
    }

    fn close<B, C>(&self, backend: &mut B, clock: &C) -> SessionResult<()>
    where
        B: Presenter<H> + KeySource,
        C: Clock,
    {
        backend.present(StimulusRef::Asset(&self.closing))?;
        let until = clock.now_ms().saturating_add(self.config.closing_delay_ms);
        let flow = wait_until(backend, clock, until, self.config.dispatch.poll_interval, |_, _| {});
        if flow == Flow::Abort {
            info!(at_ms = clock.now_ms(), "closing screen cut short");
        }
        Ok(())
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    pub fn into_log(self) -> SessionLog {
        self.log
    }

    /// Events not yet dispatched
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Distinct stimuli loaded during preparation
    pub fn stimuli_loaded(&self) -> usize {
        self.stimuli
    }
}
