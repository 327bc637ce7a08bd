//! Per-mnemonic processing state machine.
//!
//! ```text
//! NotStarted -> QueryPending -> Processing -> Done
//!                   |              |     \-> Skipped
//!                   |              \-------> Failed
//!                   \-> Skipped (nothing pending) / Failed
//! ```
//!
//! With no contributing window the mnemonic is `Skipped` only when every
//! window came back empty; a window that failed to fetch makes it `Failed`.

use edbmon_core::{MnemonicStatus, MonitorError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    QueryPending { windows: usize },
    Processing { remaining: usize },
    Done,
    Skipped,
    Failed(MonitorError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Window planning finished.
    Planned { windows: usize },
    /// A window contributed data.
    WindowDone,
    /// A window yielded no qualifying data.
    WindowSkipped,
    /// A window failed without aborting the mnemonic.
    WindowFailed(MonitorError),
    /// Processing cannot continue.
    Abort(MonitorError),
    /// Emission after `Done` failed fatally.
    EmitFailed(MonitorError),
}

#[derive(Debug)]
pub struct Tracker {
    pub phase: Phase,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    last_failure: Option<MonitorError>,
}

impl Tracker {
    pub const fn new() -> Self {
        Self {
            phase: Phase::NotStarted,
            processed: 0,
            skipped: 0,
            failed: 0,
            last_failure: None,
        }
    }

    pub fn handle(mut self, event: Event) -> Self {
        let prev = std::mem::replace(&mut self.phase, Phase::NotStarted);
        self.phase = match (prev, event) {
            (Phase::NotStarted, Event::Planned { windows: 0 }) => Phase::Skipped,
            (Phase::NotStarted, Event::Planned { windows }) => Phase::QueryPending { windows },
            (Phase::NotStarted | Phase::QueryPending { .. }, Event::Abort(e)) => Phase::Failed(e),
            (
                Phase::QueryPending { windows: remaining } | Phase::Processing { remaining },
                ev @ (Event::WindowDone | Event::WindowSkipped | Event::WindowFailed(_)),
            ) => self.step(remaining, ev),
            (Phase::Processing { .. }, Event::Abort(e)) | (Phase::Done, Event::EmitFailed(e)) => {
                Phase::Failed(e)
            }
            // terminal or out-of-order events leave the phase unchanged
            (phase, _) => phase,
        };
        self
    }

    fn step(&mut self, remaining: usize, event: Event) -> Phase {
        match event {
            Event::WindowDone => self.processed += 1,
            Event::WindowFailed(e) => {
                self.skipped += 1;
                self.failed += 1;
                self.last_failure = Some(e);
            }
            _ => self.skipped += 1,
        }
        match remaining.saturating_sub(1) {
            0 if self.processed > 0 => Phase::Done,
            0 => match self.last_failure.take() {
                Some(e) => Phase::Failed(e),
                None => Phase::Skipped,
            },
            remaining => Phase::Processing { remaining },
        }
    }

    pub const fn is_done(&self) -> bool {
        matches!(self.phase, Phase::Done)
    }

    pub const fn is_failed(&self) -> bool {
        matches!(self.phase, Phase::Failed(_))
    }

    pub fn status(&self) -> MnemonicStatus {
        match &self.phase {
            Phase::Done => MnemonicStatus::Done,
            Phase::Failed(e) => MnemonicStatus::Failed(e.clone()),
            _ => MnemonicStatus::Skipped,
        }
    }
}
