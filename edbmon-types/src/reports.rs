//! Report envelopes produced by the orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MonitorError;
use crate::instrument::Instrument;
use crate::mnemonic::AggregationMode;

/// Terminal state of one mnemonic in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MnemonicStatus {
    /// Trend computed and emitted.
    Done,
    /// Every window came back empty, or nothing was pending.
    Skipped,
    /// Processing aborted with the given error, or no window contributed
    /// and at least one failed.
    Failed(MonitorError),
}

/// Summary of one mnemonic's processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MnemonicOutcome {
    /// Target mnemonic.
    pub name: String,
    /// Aggregation mode it was configured under.
    pub mode: AggregationMode,
    /// Terminal state.
    pub status: MnemonicStatus,
    /// Windows that contributed data.
    pub windows_processed: usize,
    /// Windows skipped for lack of data or because of a non-fatal failure.
    pub windows_skipped: usize,
    /// End of the last planned window, when any window was planned.
    pub latest_query: Option<DateTime<Utc>>,
    /// Non-fatal issues encountered while processing.
    pub warnings: Vec<MonitorError>,
}

impl MnemonicOutcome {
    /// Fresh outcome before any window ran.
    pub fn new(name: impl Into<String>, mode: AggregationMode) -> Self {
        Self {
            name: name.into(),
            mode,
            status: MnemonicStatus::Skipped,
            windows_processed: 0,
            windows_skipped: 0,
            latest_query: None,
            warnings: Vec::new(),
        }
    }

    /// True if the mnemonic reached `Done`.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self.status, MnemonicStatus::Done)
    }
}

/// Summary of one orchestrator run over an instrument's catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Instrument processed.
    pub instrument: Instrument,
    /// One outcome per configured mnemonic, in catalog order.
    pub outcomes: Vec<MnemonicOutcome>,
}

impl RunReport {
    /// Outcome for a mnemonic by name (first match).
    #[must_use]
    pub fn outcome(&self, name: &str) -> Option<&MnemonicOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }

    /// Number of mnemonics that ended in `Failed`.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, MnemonicStatus::Failed(_)))
            .count()
    }
}
